//! Kinship Engine
//!
//! Resolves how two people are related. Each side expands breadth-first up
//! its ancestor DAG (pedigree collapse means one ancestor may be reachable by
//! several paths), keeping the minimum distance to every ancestor. The common
//! ancestor minimizing the combined distance decides the relationship.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::GraphSnapshot;
use crate::person::{PersonId, Sex};

// ============================================================================
// Result Types
// ============================================================================

/// What the second person is to the first.
///
/// `greats` counts the "great-" prefixes: `Grandparent { greats: 0 }` is a
/// grandparent, `AuntUncle { greats: 1 }` a great-aunt or great-uncle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relationship {
    #[serde(rename = "self")]
    SelfRelation,
    Parent,
    Child,
    Sibling,
    Grandparent {
        greats: u32,
    },
    Grandchild {
        greats: u32,
    },
    AuntUncle {
        greats: u32,
    },
    NieceNephew {
        greats: u32,
    },
    Cousin {
        degree: u32,
        removed: u32,
    },
    Spouse,
    Unrelated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InLawSide {
    /// The second person is married to a blood relative of the first
    SpouseOfRelative,
    /// The second person is a blood relative of the first person's spouse
    RelativeOfSpouse,
}

/// Marriage link that turns a blood relationship into an in-law one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InLaw {
    pub via: PersonId,
    pub side: InLawSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinshipResult {
    pub person_a: PersonId,
    pub person_b: PersonId,
    pub common_ancestor: Option<PersonId>,
    /// Ancestor-ward, from the first person (or the connecting spouse) to the
    /// common ancestor inclusive
    pub path_a: Vec<PersonId>,
    pub path_b: Vec<PersonId>,
    /// For in-law results this is the blood relationship along the marriage
    /// link: what the relative is to the first person, or what the second
    /// person is to the spouse
    pub relationship: Relationship,
    pub in_law: Option<InLaw>,
    /// What the second person is to the first, gendered by the second person
    pub label: String,
}

impl KinshipResult {
    pub fn generations_a(&self) -> Option<u32> {
        generations(&self.path_a)
    }

    pub fn generations_b(&self) -> Option<u32> {
        generations(&self.path_b)
    }

    /// Combined generations through the common ancestor; 0 for self
    pub fn distance(&self) -> Option<u32> {
        if self.relationship == Relationship::SelfRelation {
            return Some(0);
        }
        self.common_ancestor?;
        Some(self.generations_a()? + self.generations_b()?)
    }

    pub fn is_related(&self) -> bool {
        self.relationship != Relationship::Unrelated
    }

    fn without_link(a: PersonId, b: PersonId, relationship: Relationship, label: String) -> Self {
        Self {
            person_a: a,
            person_b: b,
            common_ancestor: None,
            path_a: Vec::new(),
            path_b: Vec::new(),
            relationship,
            in_law: None,
            label,
        }
    }
}

fn generations(path: &[PersonId]) -> Option<u32> {
    path.len().checked_sub(1).map(|g| g as u32)
}

// ============================================================================
// Classification
// ============================================================================

/// Classify by generations from each side to the common ancestor.
///
/// The pair (far, near) = (max, min) selects the family of relationship; which
/// side is nearer decides the direction. A (k, 1) pair is an aunt/uncle line,
/// never a "cousin zero times".
pub fn classify(generations_a: u32, generations_b: u32) -> Relationship {
    let far = generations_a.max(generations_b);
    let near = generations_a.min(generations_b);
    let b_is_elder = generations_b < generations_a;
    match (far, near) {
        (0, 0) => Relationship::SelfRelation,
        (1, 0) if b_is_elder => Relationship::Parent,
        (1, 0) => Relationship::Child,
        (k, 0) if b_is_elder => Relationship::Grandparent { greats: k - 2 },
        (k, 0) => Relationship::Grandchild { greats: k - 2 },
        (1, 1) => Relationship::Sibling,
        (k, 1) if b_is_elder => Relationship::AuntUncle { greats: k - 2 },
        (k, 1) => Relationship::NieceNephew { greats: k - 2 },
        (k, j) => Relationship::Cousin { degree: j - 1, removed: k - j },
    }
}

impl Relationship {
    /// English term for a person of sex `sex` holding this relationship
    pub fn label(&self, sex: Sex) -> String {
        self.term(Some(sex))
    }

    /// Gendered term when `sex` is known, neutral otherwise
    fn term(&self, sex: Option<Sex>) -> String {
        let pick = |male: &str, female: &str, neutral: &str| -> String {
            let word = match sex {
                Some(Sex::Male) => male,
                Some(Sex::Female) => female,
                None => neutral,
            };
            word.to_string()
        };
        match *self {
            Relationship::SelfRelation => "self".into(),
            Relationship::Parent => pick("father", "mother", "parent"),
            Relationship::Child => pick("son", "daughter", "child"),
            Relationship::Sibling => pick("brother", "sister", "sibling"),
            Relationship::Grandparent { greats } => {
                greats_prefix(greats) + &pick("grandfather", "grandmother", "grandparent")
            }
            Relationship::Grandchild { greats } => {
                greats_prefix(greats) + &pick("grandson", "granddaughter", "grandchild")
            }
            Relationship::AuntUncle { greats } => {
                greats_prefix(greats) + &pick("uncle", "aunt", "aunt/uncle")
            }
            Relationship::NieceNephew { greats } => {
                greats_prefix(greats) + &pick("nephew", "niece", "niece/nephew")
            }
            Relationship::Cousin { degree, removed } => cousin_label(degree, removed),
            Relationship::Spouse => pick("husband", "wife", "spouse"),
            Relationship::Unrelated => "unrelated".into(),
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.term(None))
    }
}

fn greats_prefix(greats: u32) -> String {
    "great-".repeat(greats as usize)
}

fn cousin_label(degree: u32, removed: u32) -> String {
    const ORDINALS: &[&str] = &[
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];
    let ordinal = ORDINALS
        .get(degree.saturating_sub(1) as usize)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}th", degree));
    let removed = match removed {
        0 => String::new(),
        1 => " once removed".into(),
        2 => " twice removed".into(),
        3 => " thrice removed".into(),
        n => format!(" {} times removed", n),
    };
    format!("{} cousin{}", ordinal, removed)
}

// ============================================================================
// Ancestor Search
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Reach {
    distance: u32,
    /// The descendant through which this ancestor was first reached
    via: Option<PersonId>,
}

/// Minimum distance to every ancestor within `max_depth` generations,
/// including the start person at distance 0.
///
/// In breadth-first order the first visit is already minimal, so revisits are
/// skipped. That also makes corrupt parent cycles harmless.
fn ancestors_within(
    snapshot: &GraphSnapshot,
    start: PersonId,
    max_depth: u32,
) -> HashMap<PersonId, Reach> {
    let mut reached = HashMap::new();
    reached.insert(
        start,
        Reach {
            distance: 0,
            via: None,
        },
    );
    let mut queue = VecDeque::from([(start, 0u32)]);

    while let Some((node, distance)) = queue.pop_front() {
        if distance >= max_depth {
            continue;
        }
        for &parent in snapshot.parents_of(node) {
            if reached.contains_key(&parent) {
                continue;
            }
            reached.insert(
                parent,
                Reach {
                    distance: distance + 1,
                    via: Some(node),
                },
            );
            queue.push_back((parent, distance + 1));
        }
    }

    reached
}

/// Path from the search start up to `ancestor`, both inclusive
fn path_to(reached: &HashMap<PersonId, Reach>, ancestor: PersonId) -> Vec<PersonId> {
    let mut path = vec![ancestor];
    let mut current = ancestor;
    while let Some(next) = reached.get(&current).and_then(|r| r.via) {
        path.push(next);
        current = next;
    }
    path.reverse();
    path
}

#[derive(Debug, Clone)]
struct BloodLink {
    ancestor: PersonId,
    path_a: Vec<PersonId>,
    path_b: Vec<PersonId>,
}

impl BloodLink {
    fn generations(&self) -> (u32, u32) {
        (
            generations(&self.path_a).unwrap_or(0),
            generations(&self.path_b).unwrap_or(0),
        )
    }

    /// Ordering key: combined distance, then the farther side, then ancestor id
    fn rank(&self) -> (u32, u32, PersonId) {
        let (ga, gb) = self.generations();
        (ga + gb, ga.max(gb), self.ancestor)
    }

    fn relationship(&self) -> Relationship {
        let (ga, gb) = self.generations();
        classify(ga, gb)
    }
}

fn blood_link(
    snapshot: &GraphSnapshot,
    a: PersonId,
    b: PersonId,
    max_depth: u32,
) -> Option<BloodLink> {
    let from_a = ancestors_within(snapshot, a, max_depth);
    let from_b = ancestors_within(snapshot, b, max_depth);

    let (ancestor, _, _) = from_a
        .iter()
        .filter_map(|(id, ra)| from_b.get(id).map(|rb| (*id, ra.distance, rb.distance)))
        .min_by_key(|(id, da, db)| (da + db, *da.max(db), *id))?;

    Some(BloodLink {
        ancestor,
        path_a: path_to(&from_a, ancestor),
        path_b: path_to(&from_b, ancestor),
    })
}

// ============================================================================
// Kinship
// ============================================================================

/// Kinship with the default search depth
pub fn kinship(snapshot: &GraphSnapshot, a: PersonId, b: PersonId) -> Result<KinshipResult> {
    kinship_with(snapshot, a, b, &EngineConfig::default())
}

pub fn kinship_with(
    snapshot: &GraphSnapshot,
    a: PersonId,
    b: PersonId,
    config: &EngineConfig,
) -> Result<KinshipResult> {
    let person_a = snapshot.require(a)?;
    let person_b = snapshot.require(b)?;
    let max_depth = config.max_kinship_depth;

    if a == b {
        return Ok(KinshipResult::without_link(
            a,
            b,
            Relationship::SelfRelation,
            "self".into(),
        ));
    }

    if let Some(link) = blood_link(snapshot, a, b, max_depth) {
        let relationship = link.relationship();
        return Ok(KinshipResult {
            person_a: a,
            person_b: b,
            common_ancestor: Some(link.ancestor),
            path_a: link.path_a,
            path_b: link.path_b,
            relationship,
            in_law: None,
            label: relationship.label(person_b.sex),
        });
    }

    // In-law pass, only for blood-unrelated pairs
    if person_a.spouses.contains(&b) {
        return Ok(KinshipResult::without_link(
            a,
            b,
            Relationship::Spouse,
            Relationship::Spouse.label(person_b.sex),
        ));
    }

    let married_to_relative = snapshot.spouses_of(b).iter().filter_map(|&spouse| {
        blood_link(snapshot, a, spouse, max_depth)
            .map(|link| (link, InLaw { via: spouse, side: InLawSide::SpouseOfRelative }))
    });
    let relative_of_spouse = snapshot.spouses_of(a).iter().filter_map(|&spouse| {
        blood_link(snapshot, spouse, b, max_depth)
            .map(|link| (link, InLaw { via: spouse, side: InLawSide::RelativeOfSpouse }))
    });
    let best = married_to_relative
        .chain(relative_of_spouse)
        .min_by_key(|(link, in_law)| (link.rank(), in_law.via));

    if let Some((link, in_law)) = best {
        let relationship = link.relationship();
        return Ok(KinshipResult {
            person_a: a,
            person_b: b,
            common_ancestor: Some(link.ancestor),
            path_a: link.path_a,
            path_b: link.path_b,
            relationship,
            in_law: Some(in_law),
            label: in_law_label(relationship, in_law.side, person_b.sex),
        });
    }

    Ok(KinshipResult::without_link(
        a,
        b,
        Relationship::Unrelated,
        "unrelated".into(),
    ))
}

/// A parent's spouse or a spouse's child is a step relation, everything else
/// is "-in-law".
fn in_law_label(relationship: Relationship, side: InLawSide, sex: Sex) -> String {
    match (side, relationship) {
        (InLawSide::SpouseOfRelative, Relationship::Parent) => {
            format!("step{}", Relationship::Parent.label(sex))
        }
        (InLawSide::RelativeOfSpouse, Relationship::Child) => {
            format!("step{}", Relationship::Child.label(sex))
        }
        (InLawSide::SpouseOfRelative, Relationship::Child) => {
            format!("{}-in-law", Relationship::Child.label(sex))
        }
        (InLawSide::SpouseOfRelative, Relationship::Sibling) => {
            format!("{}-in-law", Relationship::Sibling.label(sex))
        }
        (InLawSide::SpouseOfRelative, other) => {
            // Spouse of a grandparent, aunt or cousin takes that role by marriage
            format!("{} by marriage", other.label(sex))
        }
        (InLawSide::RelativeOfSpouse, other) => format!("{}-in-law", other.label(sex)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_snapshot;
    use crate::person::RawPerson;

    fn man(id: u64) -> RawPerson {
        RawPerson::new(id, Sex::Male, &format!("M{}", id), "Kin")
    }

    fn woman(id: u64) -> RawPerson {
        RawPerson::new(id, Sex::Female, &format!("F{}", id), "Kin")
    }

    /// 1+2 -> 3, 4 ; 3+5 -> 6 ; 4+7 -> 8 ; 6 -> 9 ; 10 unrelated
    fn family() -> GraphSnapshot {
        let records = vec![
            man(1).with_spouses(&[2]),
            woman(2).with_spouses(&[1]),
            man(3).with_parents(Some(1), Some(2)).with_spouses(&[5]),
            woman(4).with_parents(Some(1), Some(2)).with_spouses(&[7]),
            woman(5).with_spouses(&[3]),
            man(6).with_parents(Some(3), Some(5)),
            man(7).with_spouses(&[4]),
            woman(8).with_parents(Some(7), Some(4)),
            woman(9).with_parents(Some(6), None),
            man(10),
        ];
        build_snapshot(records).unwrap().0
    }

    fn rel(snapshot: &GraphSnapshot, a: u64, b: u64) -> KinshipResult {
        kinship(snapshot, PersonId(a), PersonId(b)).unwrap()
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify(0, 0), Relationship::SelfRelation);
        assert_eq!(classify(1, 0), Relationship::Parent);
        assert_eq!(classify(0, 1), Relationship::Child);
        assert_eq!(classify(1, 1), Relationship::Sibling);
        assert_eq!(classify(2, 0), Relationship::Grandparent { greats: 0 });
        assert_eq!(classify(0, 4), Relationship::Grandchild { greats: 2 });
        assert_eq!(classify(2, 1), Relationship::AuntUncle { greats: 0 });
        assert_eq!(classify(1, 2), Relationship::NieceNephew { greats: 0 });
        assert_eq!(classify(3, 1), Relationship::AuntUncle { greats: 1 });
        assert_eq!(classify(2, 2), Relationship::Cousin { degree: 1, removed: 0 });
        assert_eq!(classify(3, 2), Relationship::Cousin { degree: 1, removed: 1 });
        assert_eq!(classify(5, 3), Relationship::Cousin { degree: 2, removed: 2 });
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            Relationship::Grandparent { greats: 2 }.label(Sex::Female),
            "great-great-grandmother"
        );
        assert_eq!(
            Relationship::Cousin { degree: 1, removed: 1 }.label(Sex::Male),
            "first cousin once removed"
        );
        assert_eq!(
            Relationship::Cousin { degree: 2, removed: 4 }.to_string(),
            "second cousin 4 times removed"
        );
        assert_eq!(Relationship::AuntUncle { greats: 1 }.label(Sex::Female), "great-aunt");
        assert_eq!(Relationship::AuntUncle { greats: 1 }.to_string(), "great-aunt/uncle");
        assert_eq!(Relationship::Sibling.to_string(), "sibling");
    }

    #[test]
    fn test_self() {
        let snapshot = family();
        let result = rel(&snapshot, 6, 6);
        assert_eq!(result.relationship, Relationship::SelfRelation);
        assert_eq!(result.distance(), Some(0));
        assert_eq!(result.label, "self");
        assert_eq!(result.common_ancestor, None);
    }

    #[test]
    fn test_siblings_and_parent() {
        let snapshot = family();
        let siblings = rel(&snapshot, 3, 4);
        assert_eq!(siblings.relationship, Relationship::Sibling);
        assert_eq!(siblings.generations_a(), Some(1));
        assert_eq!(siblings.generations_b(), Some(1));
        assert_eq!(siblings.label, "sister");
        // Both parents tie on every key but id
        assert_eq!(siblings.common_ancestor, Some(PersonId(1)));

        let parent = rel(&snapshot, 6, 3);
        assert_eq!(parent.relationship, Relationship::Parent);
        assert_eq!(parent.label, "father");
        assert_eq!(parent.path_a, vec![PersonId(6), PersonId(3)]);
        assert_eq!(parent.path_b, vec![PersonId(3)]);
    }

    #[test]
    fn test_cousins_and_aunts() {
        let snapshot = family();
        assert_eq!(rel(&snapshot, 6, 8).label, "first cousin");
        assert_eq!(rel(&snapshot, 8, 3).label, "uncle");
        assert_eq!(rel(&snapshot, 9, 8).label, "first cousin once removed");
        assert_eq!(rel(&snapshot, 9, 4).label, "great-aunt");
        assert_eq!(rel(&snapshot, 1, 9).label, "great-granddaughter");
    }

    #[test]
    fn test_in_laws() {
        let snapshot = family();
        let brother_in_law = rel(&snapshot, 3, 7);
        assert_eq!(brother_in_law.label, "brother-in-law");
        assert_eq!(
            brother_in_law.in_law,
            Some(InLaw { via: PersonId(4), side: InLawSide::SpouseOfRelative })
        );

        assert_eq!(rel(&snapshot, 7, 1).label, "father-in-law");
        assert_eq!(rel(&snapshot, 1, 5).label, "daughter-in-law");
        assert_eq!(rel(&snapshot, 3, 5).label, "wife");
        assert_eq!(rel(&snapshot, 6, 7).label, "uncle by marriage");
    }

    #[test]
    fn test_unrelated() {
        let snapshot = family();
        let result = rel(&snapshot, 10, 9);
        assert_eq!(result.relationship, Relationship::Unrelated);
        assert!(!result.is_related());
        assert_eq!(result.distance(), None);
    }

    #[test]
    fn test_not_found() {
        let snapshot = family();
        assert!(kinship(&snapshot, PersonId(1), PersonId(404)).is_err());
        assert!(kinship(&snapshot, PersonId(404), PersonId(404)).is_err());
    }

    #[test]
    fn test_depth_bound() {
        let snapshot = family();
        let config = EngineConfig {
            max_kinship_depth: 1,
            ..EngineConfig::default()
        };
        // Cousins need two generations per side
        let result = kinship_with(&snapshot, PersonId(6), PersonId(8), &config).unwrap();
        assert_eq!(result.relationship, Relationship::Unrelated);
    }

    #[test]
    fn test_pedigree_collapse_prefers_shortest_path() {
        // 1+2 -> 3, 4 ; 3+4 -> 5 (parents are siblings) ; 5 -> 6
        let records = vec![
            man(1),
            woman(2),
            man(3).with_parents(Some(1), Some(2)),
            woman(4).with_parents(Some(1), Some(2)),
            man(5).with_parents(Some(3), Some(4)),
            man(6).with_parents(Some(5), None),
        ];
        let snapshot = build_snapshot(records).unwrap().0;
        let result = rel(&snapshot, 6, 4);
        assert_eq!(result.common_ancestor, Some(PersonId(4)));
        assert_eq!(result.relationship, Relationship::Grandparent { greats: 0 });
        assert_eq!(result.path_a, vec![PersonId(6), PersonId(5), PersonId(4)]);
    }

    #[test]
    fn test_equal_sum_prefers_balanced_ancestor() {
        // 10 -> 2, 5 ; 2 -> 4, 8 ; 8 -> 7 ; 5+7 -> 6
        // 10 sits at (2, 2) and 2 at (1, 3): same sum, 10 has the smaller max
        let records = vec![
            man(10),
            man(2).with_parents(Some(10), None),
            man(5).with_parents(Some(10), None),
            woman(4).with_parents(Some(2), None),
            man(8).with_parents(Some(2), None),
            woman(7).with_parents(Some(8), None),
            man(6).with_parents(Some(5), Some(7)),
        ];
        let snapshot = build_snapshot(records).unwrap().0;

        let forward = rel(&snapshot, 4, 6);
        assert_eq!(forward.common_ancestor, Some(PersonId(10)));
        assert_eq!(forward.generations_a(), Some(2));
        assert_eq!(forward.generations_b(), Some(2));
        assert_eq!(forward.label, "first cousin");

        let backward = rel(&snapshot, 6, 4);
        assert_eq!(backward.common_ancestor, Some(PersonId(10)));
        assert_eq!(backward.path_a, forward.path_b);
    }

    #[test]
    fn test_step_relations() {
        // 1+2 -> 3 ; 1 remarried to 11
        let records = vec![
            man(1).with_spouses(&[2, 11]),
            woman(2).with_spouses(&[1]),
            man(3).with_parents(Some(1), Some(2)),
            woman(11).with_spouses(&[1]),
        ];
        let snapshot = build_snapshot(records).unwrap().0;

        let stepmother = rel(&snapshot, 3, 11);
        assert_eq!(stepmother.label, "stepmother");
        assert_eq!(stepmother.relationship, Relationship::Parent);
        assert_eq!(stepmother.in_law.map(|i| i.side), Some(InLawSide::SpouseOfRelative));

        let stepson = rel(&snapshot, 11, 3);
        assert_eq!(stepson.label, "stepson");
        assert_eq!(stepson.in_law.map(|i| i.via), Some(PersonId(1)));
    }
}
