//! Person Graph
//!
//! Turns a flat batch of raw records into an immutable `GraphSnapshot` with
//! parent, child and spouse adjacency. Inconsistent references are repaired
//! and reported; only a duplicate id rejects the batch.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{GenealogyError, Result};
use crate::person::{Person, PersonId, RawPerson, Sex};

// ============================================================================
// Validation Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Record with id 0, dropped
    InvalidId,
    SelfReference,
    /// Reference to an id that is not in the batch, dropped
    DanglingReference,
    /// Same id listed twice in a child or spouse list, collapsed
    DuplicateReference,
    /// Child names a parent who does not list it, added to the parent
    MissingChildLink,
    /// Parent lists a child whose matching parent slot was empty, filled
    MissingParentLink,
    /// Parent lists a child who names someone else in that slot, dropped
    ConflictingParent,
    AsymmetricSpouse,
    DeathBeforeBirth,
    AncestorCycle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub person: PersonId,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn push(&mut self, kind: IssueKind, person: PersonId, message: String) {
        self.issues.push(ValidationIssue { kind, person, message });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

// ============================================================================
// Graph Snapshot
// ============================================================================

/// One immutable, fully indexed view of the population.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    persons: BTreeMap<PersonId, Person>,
    parents: HashMap<PersonId, Vec<PersonId>>,
    children: HashMap<PersonId, Vec<PersonId>>,
    spouses: HashMap<PersonId, Vec<PersonId>>,
    records: Vec<RawPerson>,
    report: ValidationReport,
}

impl GraphSnapshot {
    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id)
    }

    /// Lookup that fails with `NotFound`
    pub fn require(&self, id: PersonId) -> Result<&Person> {
        self.persons.get(&id).ok_or(GenealogyError::NotFound(id))
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.persons.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// All persons in ascending id order
    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    pub fn par_persons(&self) -> impl ParallelIterator<Item = &Person> {
        self.persons.par_iter().map(|(_, person)| person)
    }

    /// Father first, then mother
    pub fn parents_of(&self, id: PersonId) -> &[PersonId] {
        self.parents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self, id: PersonId) -> &[PersonId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn spouses_of(&self, id: PersonId) -> &[PersonId] {
        self.spouses.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Persons sharing at least one parent with `id`, in id order
    pub fn siblings_of(&self, id: PersonId) -> Vec<PersonId> {
        let mut siblings: Vec<PersonId> = self
            .parents_of(id)
            .iter()
            .flat_map(|parent| self.children_of(*parent).iter().copied())
            .filter(|sibling| *sibling != id)
            .collect();
        siblings.sort();
        siblings.dedup();
        siblings
    }

    /// The raw batch this snapshot was built from
    pub fn records(&self) -> &[RawPerson] {
        &self.records
    }

    /// Issues found while this snapshot was built
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}

// ============================================================================
// Snapshot Build
// ============================================================================

/// Build a snapshot from raw records.
///
/// Fails only on a duplicate id. Everything else is repaired or dropped and
/// reported in the returned `ValidationReport`.
pub fn build_snapshot(records: Vec<RawPerson>) -> Result<(GraphSnapshot, ValidationReport)> {
    let mut report = ValidationReport::default();

    // Pass 1: normalize and index
    let mut persons: BTreeMap<PersonId, Person> = BTreeMap::new();
    for raw in &records {
        if raw.id == 0 {
            report.push(IssueKind::InvalidId, PersonId(0), "record with id 0 dropped".into());
            continue;
        }
        let mut person = Person::from_raw(raw);
        for dup in dedupe(&mut person.children) {
            report.push(
                IssueKind::DuplicateReference,
                person.id,
                format!("child {} listed more than once", dup),
            );
        }
        for dup in dedupe(&mut person.spouses) {
            report.push(
                IssueKind::DuplicateReference,
                person.id,
                format!("spouse {} listed more than once", dup),
            );
        }
        match persons.entry(person.id) {
            Entry::Occupied(_) => {
                warn!("Rejecting record batch: duplicate id {}", person.id);
                return Err(GenealogyError::DuplicateId(person.id));
            }
            Entry::Vacant(slot) => {
                slot.insert(person);
            }
        }
    }

    // Pass 2: reconcile declared relationships
    prune_invalid_references(&mut persons, &mut report);
    link_children_to_parents(&mut persons, &mut report);
    link_parents_to_children(&mut persons, &mut report);
    link_spouses(&mut persons, &mut report);
    check_life_dates(&persons, &mut report);

    let mut parents = HashMap::with_capacity(persons.len());
    let mut children = HashMap::with_capacity(persons.len());
    let mut spouses = HashMap::with_capacity(persons.len());
    for person in persons.values() {
        parents.insert(person.id, person.parents().collect::<Vec<_>>());
        children.insert(person.id, person.children.clone());
        spouses.insert(person.id, person.spouses.clone());
    }

    let cycles = detect_ancestor_cycles(&persons, &parents, &mut report);

    info!(
        "Snapshot built: {} people, {} validation issues, {} ancestor cycles",
        persons.len(),
        report.len(),
        cycles
    );
    for issue in &report.issues {
        debug!("{:?} at {}: {}", issue.kind, issue.person, issue.message);
    }

    let snapshot = GraphSnapshot {
        persons,
        parents,
        children,
        spouses,
        records,
        report: report.clone(),
    };
    Ok((snapshot, report))
}

/// Remove repeated ids in place, returning the removed repeats
fn dedupe(list: &mut Vec<PersonId>) -> Vec<PersonId> {
    let mut seen = HashSet::new();
    let mut repeats = Vec::new();
    list.retain(|id| {
        if seen.insert(*id) {
            true
        } else {
            repeats.push(*id);
            false
        }
    });
    repeats
}

/// Drop self references and references to unknown ids
fn prune_invalid_references(
    persons: &mut BTreeMap<PersonId, Person>,
    report: &mut ValidationReport,
) {
    let known: HashSet<PersonId> = persons.keys().copied().collect();

    for person in persons.values_mut() {
        let id = person.id;
        for (slot, role) in [(&mut person.father, "father"), (&mut person.mother, "mother")] {
            match *slot {
                Some(target) if target == id => {
                    report.push(IssueKind::SelfReference, id, format!("listed as own {}", role));
                    *slot = None;
                }
                Some(target) if !known.contains(&target) => {
                    report.push(
                        IssueKind::DanglingReference,
                        id,
                        format!("{} {} does not exist", role, target),
                    );
                    *slot = None;
                }
                _ => {}
            }
        }
        if person.father.is_some() && person.father == person.mother {
            report.push(
                IssueKind::ConflictingParent,
                id,
                "same person recorded as father and mother; mother dropped".into(),
            );
            person.mother = None;
        }

        for (list, role) in [(&mut person.children, "child"), (&mut person.spouses, "spouse")] {
            list.retain(|target| {
                if *target == id {
                    report.push(IssueKind::SelfReference, id, format!("listed as own {}", role));
                    false
                } else if !known.contains(target) {
                    report.push(
                        IssueKind::DanglingReference,
                        id,
                        format!("{} {} does not exist", role, target),
                    );
                    false
                } else {
                    true
                }
            });
        }
    }
}

/// Every named parent must list the child
fn link_children_to_parents(
    persons: &mut BTreeMap<PersonId, Person>,
    report: &mut ValidationReport,
) {
    let mut missing: Vec<(PersonId, PersonId)> = Vec::new();
    for person in persons.values() {
        for parent in person.parents() {
            let listed = persons
                .get(&parent)
                .map(|p| p.children.contains(&person.id))
                .unwrap_or(true);
            if !listed {
                missing.push((parent, person.id));
            }
        }
    }

    for (parent, child) in missing {
        if let Some(p) = persons.get_mut(&parent) {
            p.children.push(child);
            report.push(
                IssueKind::MissingChildLink,
                parent,
                format!("{} names this person as parent; added to children", child),
            );
        }
    }
}

/// Every listed child must name the parent, in the slot matching the parent's sex
fn link_parents_to_children(
    persons: &mut BTreeMap<PersonId, Person>,
    report: &mut ValidationReport,
) {
    let mut unlinked: Vec<(PersonId, Sex, PersonId)> = Vec::new();
    for person in persons.values() {
        for child in &person.children {
            let names_parent = persons
                .get(child)
                .map(|c| c.father == Some(person.id) || c.mother == Some(person.id))
                .unwrap_or(true);
            if !names_parent {
                unlinked.push((person.id, person.sex, *child));
            }
        }
    }

    let mut conflicts: Vec<(PersonId, PersonId)> = Vec::new();
    for (parent, sex, child) in unlinked {
        let Some(c) = persons.get_mut(&child) else {
            continue;
        };
        let (slot, role) = match sex {
            Sex::Male => (&mut c.father, "father"),
            Sex::Female => (&mut c.mother, "mother"),
        };
        if let Some(existing) = *slot {
            report.push(
                IssueKind::ConflictingParent,
                parent,
                format!("lists {} as child but its {} is {}; link dropped", child, role, existing),
            );
            conflicts.push((parent, child));
        } else {
            *slot = Some(parent);
            report.push(
                IssueKind::MissingParentLink,
                child,
                format!("{} lists this person as child; {} set", parent, role),
            );
        }
    }

    for (parent, child) in conflicts {
        if let Some(p) = persons.get_mut(&parent) {
            p.children.retain(|c| *c != child);
        }
    }
}

fn link_spouses(persons: &mut BTreeMap<PersonId, Person>, report: &mut ValidationReport) {
    let mut missing: Vec<(PersonId, PersonId)> = Vec::new();
    for person in persons.values() {
        for spouse in &person.spouses {
            let listed = persons
                .get(spouse)
                .map(|s| s.spouses.contains(&person.id))
                .unwrap_or(true);
            if !listed {
                missing.push((*spouse, person.id));
            }
        }
    }

    for (owner, spouse) in missing {
        if let Some(p) = persons.get_mut(&owner) {
            if !p.spouses.contains(&spouse) {
                p.spouses.push(spouse);
                report.push(
                    IssueKind::AsymmetricSpouse,
                    owner,
                    format!("{} lists this person as spouse; link mirrored", spouse),
                );
            }
        }
    }
}

fn check_life_dates(persons: &BTreeMap<PersonId, Person>, report: &mut ValidationReport) {
    for person in persons.values() {
        if let (Some(birth), Some(death)) = (person.birth, person.death) {
            if death.precedes(&birth) == Some(true) {
                report.push(
                    IssueKind::DeathBeforeBirth,
                    person.id,
                    format!("death {} precedes birth {}", death, birth),
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Iterative DFS over child→parent edges. One issue per back edge.
fn detect_ancestor_cycles(
    persons: &BTreeMap<PersonId, Person>,
    parents: &HashMap<PersonId, Vec<PersonId>>,
    report: &mut ValidationReport,
) -> usize {
    let mut marks: HashMap<PersonId, Mark> = HashMap::with_capacity(persons.len());
    let mut cycles = 0;

    for &start in persons.keys() {
        if marks.contains_key(&start) {
            continue;
        }
        marks.insert(start, Mark::InProgress);
        let mut stack: Vec<(PersonId, usize)> = vec![(start, 0)];

        while let Some(&(node, index)) = stack.last() {
            let next = parents.get(&node).and_then(|ps| ps.get(index)).copied();
            let Some(parent) = next else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            match marks.get(&parent) {
                None => {
                    marks.insert(parent, Mark::InProgress);
                    stack.push((parent, 0));
                }
                Some(Mark::InProgress) => {
                    cycles += 1;
                    report.push(
                        IssueKind::AncestorCycle,
                        node,
                        format!("parent {} is also a descendant of this person", parent),
                    );
                }
                Some(Mark::Done) => {}
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn man(id: u64) -> RawPerson {
        RawPerson::new(id, Sex::Male, &format!("M{}", id), "Test")
    }

    fn woman(id: u64) -> RawPerson {
        RawPerson::new(id, Sex::Female, &format!("F{}", id), "Test")
    }

    #[test]
    fn test_consistent_family_has_no_issues() {
        let records = vec![
            man(1).with_spouses(&[2]).with_children(&[3]),
            woman(2).with_spouses(&[1]).with_children(&[3]),
            man(3).with_parents(Some(1), Some(2)),
        ];
        let (snapshot, report) = build_snapshot(records).unwrap();
        assert!(report.is_empty(), "{:?}", report);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.parents_of(PersonId(3)), &[PersonId(1), PersonId(2)]);
        assert_eq!(snapshot.children_of(PersonId(2)), &[PersonId(3)]);
        assert_eq!(snapshot.spouses_of(PersonId(1)), &[PersonId(2)]);
    }

    #[test]
    fn test_duplicate_id_rejects_batch() {
        let err = build_snapshot(vec![man(1), woman(1)]).unwrap_err();
        assert!(matches!(err, GenealogyError::DuplicateId(PersonId(1))));
    }

    #[test]
    fn test_missing_child_link_is_repaired() {
        let (snapshot, report) =
            build_snapshot(vec![man(1), man(2).with_parents(Some(1), None)]).unwrap();
        assert_eq!(snapshot.children_of(PersonId(1)), &[PersonId(2)]);
        assert_eq!(report.count(IssueKind::MissingChildLink), 1);
    }

    #[test]
    fn test_missing_parent_link_fills_slot_by_sex() {
        let (snapshot, report) =
            build_snapshot(vec![woman(1).with_children(&[2]), man(2)]).unwrap();
        assert_eq!(snapshot.get(PersonId(2)).unwrap().mother, Some(PersonId(1)));
        assert_eq!(report.count(IssueKind::MissingParentLink), 1);
    }

    #[test]
    fn test_conflicting_parent_drops_link() {
        let records = vec![
            man(1).with_children(&[3]),
            man(2).with_children(&[3]),
            man(3).with_parents(Some(1), None),
        ];
        let (snapshot, report) = build_snapshot(records).unwrap();
        assert!(snapshot.children_of(PersonId(2)).is_empty());
        assert_eq!(report.count(IssueKind::ConflictingParent), 1);
    }

    #[test]
    fn test_asymmetric_spouse_is_mirrored() {
        let (snapshot, report) = build_snapshot(vec![man(1).with_spouses(&[2]), woman(2)]).unwrap();
        assert_eq!(snapshot.spouses_of(PersonId(2)), &[PersonId(1)]);
        assert_eq!(report.count(IssueKind::AsymmetricSpouse), 1);
    }

    #[test]
    fn test_self_and_dangling_references_dropped() {
        let records = vec![man(1)
            .with_parents(Some(1), Some(99))
            .with_spouses(&[1])
            .with_children(&[42])];
        let (snapshot, report) = build_snapshot(records).unwrap();
        let person = snapshot.get(PersonId(1)).unwrap();
        assert_eq!(person.father, None);
        assert_eq!(person.mother, None);
        assert!(person.spouses.is_empty());
        assert!(person.children.is_empty());
        assert_eq!(report.count(IssueKind::SelfReference), 2);
        assert_eq!(report.count(IssueKind::DanglingReference), 2);

        let dangling: Vec<_> = report.of_kind(IssueKind::DanglingReference).collect();
        assert!(dangling.iter().all(|issue| issue.person == PersonId(1)));
        assert!(dangling.iter().any(|issue| issue.message.contains("#99")));
        assert!(dangling.iter().any(|issue| issue.message.contains("#42")));
        assert_eq!(snapshot.report(), &report);
    }

    #[test]
    fn test_duplicate_references_collapsed() {
        let records = vec![
            man(1).with_spouses(&[2, 2]).with_children(&[3, 3]),
            woman(2).with_spouses(&[1]),
            man(3).with_parents(Some(1), None),
        ];
        let (snapshot, report) = build_snapshot(records).unwrap();
        assert_eq!(snapshot.children_of(PersonId(1)), &[PersonId(3)]);
        assert_eq!(report.count(IssueKind::DuplicateReference), 2);
    }

    #[test]
    fn test_death_before_birth_is_reported_not_rejected() {
        let (snapshot, report) =
            build_snapshot(vec![man(1).born("01.01.1900").died("01.01.1890")]).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(report.count(IssueKind::DeathBeforeBirth), 1);
    }

    #[test]
    fn test_ancestor_cycle_detected() {
        let records = vec![man(1).with_parents(Some(2), None), man(2).with_parents(Some(1), None)];
        let (snapshot, report) = build_snapshot(records).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(report.count(IssueKind::AncestorCycle), 1);
    }

    #[test]
    fn test_zero_id_dropped() {
        let (snapshot, report) = build_snapshot(vec![man(0), man(1)]).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(report.count(IssueKind::InvalidId), 1);
    }

    #[test]
    fn test_siblings_include_half_siblings() {
        let records = vec![
            man(1),
            woman(2),
            woman(3),
            man(4).with_parents(Some(1), Some(2)),
            man(5).with_parents(Some(1), Some(2)),
            man(6).with_parents(Some(1), Some(3)),
        ];
        let (snapshot, _) = build_snapshot(records).unwrap();
        assert_eq!(snapshot.siblings_of(PersonId(4)), vec![PersonId(5), PersonId(6)]);
    }
}
