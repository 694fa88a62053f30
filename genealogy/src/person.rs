//! Person records
//!
//! `RawPerson` is the loose shape handed over by the storage layer.
//! `Person` is the normalized form held by a snapshot: dates parsed once,
//! references typed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::{self, PartialDate};

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub u64);

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(alias = "M", alias = "male", alias = "m")]
    Male,
    #[serde(alias = "F", alias = "female", alias = "f")]
    Female,
}

// ============================================================================
// Raw Record (ingestion shape)
// ============================================================================

/// One record as supplied by the loader. Field names follow the storage
/// schema; dates are free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPerson {
    pub id: u64,
    pub sex: Sex,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birth: Option<String>,
    #[serde(default)]
    pub death: Option<String>,
    #[serde(default)]
    pub marriage: Option<String>,
    #[serde(default)]
    pub father_id: Option<u64>,
    #[serde(default)]
    pub mother_id: Option<u64>,
    #[serde(default)]
    pub spouse_ids: Vec<u64>,
    #[serde(default)]
    pub children_ids: Vec<u64>,
    #[serde(default)]
    pub order_by_father: i32,
    #[serde(default)]
    pub order_by_mother: i32,
    #[serde(default)]
    pub order_by_spouse: i32,
}

impl RawPerson {
    pub fn new(id: u64, sex: Sex, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            sex,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birth: None,
            death: None,
            marriage: None,
            father_id: None,
            mother_id: None,
            spouse_ids: Vec::new(),
            children_ids: Vec::new(),
            order_by_father: 0,
            order_by_mother: 0,
            order_by_spouse: 0,
        }
    }

    pub fn born(mut self, date: &str) -> Self {
        self.birth = Some(date.to_string());
        self
    }

    pub fn died(mut self, date: &str) -> Self {
        self.death = Some(date.to_string());
        self
    }

    pub fn married(mut self, date: &str) -> Self {
        self.marriage = Some(date.to_string());
        self
    }

    pub fn with_parents(mut self, father: Option<u64>, mother: Option<u64>) -> Self {
        self.father_id = father;
        self.mother_id = mother;
        self
    }

    pub fn with_spouses(mut self, spouses: &[u64]) -> Self {
        self.spouse_ids = spouses.to_vec();
        self
    }

    pub fn with_children(mut self, children: &[u64]) -> Self {
        self.children_ids = children.to_vec();
        self
    }

    /// Drop every reference to `id` (used when that person is deleted)
    pub fn forget(&mut self, id: u64) {
        if self.father_id == Some(id) {
            self.father_id = None;
        }
        if self.mother_id == Some(id) {
            self.mother_id = None;
        }
        self.spouse_ids.retain(|s| *s != id);
        self.children_ids.retain(|c| *c != id);
    }
}

/// Blank text means "not recorded"; anything else is parsed (possibly to Unknown).
fn parse_optional(text: Option<&str>) -> Option<PartialDate> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(PartialDate::parse)
}

// ============================================================================
// Person (snapshot shape)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub sex: Sex,
    pub first_name: String,
    pub last_name: String,
    pub birth: Option<PartialDate>,
    pub death: Option<PartialDate>,
    pub marriage: Option<PartialDate>,
    pub father: Option<PersonId>,
    pub mother: Option<PersonId>,
    pub spouses: Vec<PersonId>,
    pub children: Vec<PersonId>,
    pub order_by_father: i32,
    pub order_by_mother: i32,
    pub order_by_spouse: i32,
}

impl Person {
    /// Normalize a raw record. Reference lists keep their declared order.
    pub fn from_raw(raw: &RawPerson) -> Self {
        Self {
            id: PersonId(raw.id),
            sex: raw.sex,
            first_name: raw.first_name.trim().to_string(),
            last_name: raw.last_name.trim().to_string(),
            birth: parse_optional(raw.birth.as_deref()),
            death: parse_optional(raw.death.as_deref()),
            marriage: parse_optional(raw.marriage.as_deref()),
            father: raw.father_id.map(PersonId),
            mother: raw.mother_id.map(PersonId),
            spouses: raw.spouse_ids.iter().copied().map(PersonId).collect(),
            children: raw.children_ids.iter().copied().map(PersonId).collect(),
            order_by_father: raw.order_by_father,
            order_by_mother: raw.order_by_mother,
            order_by_spouse: raw.order_by_spouse,
        }
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => self.id.to_string(),
        }
    }

    /// A recorded death (even with an unknown date) means deceased
    pub fn is_deceased(&self) -> bool {
        self.death.is_some()
    }

    /// Age at death for the deceased, age on `today` for the living
    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth?;
        let reference = self.death.unwrap_or(PartialDate::Full(today));
        date::age(&birth, &reference)
    }

    pub fn parents(&self) -> impl Iterator<Item = PersonId> {
        self.father.into_iter().chain(self.mother)
    }

    /// Display order among the children of `parent`
    pub fn order_under(&self, parent: PersonId) -> i32 {
        if self.father == Some(parent) {
            self.order_by_father
        } else if self.mother == Some(parent) {
            self.order_by_mother
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_parses_dates_once() {
        let raw = RawPerson::new(7, Sex::Female, " Anna ", "Berg")
            .born("15.06.1950")
            .died("  ")
            .married("1971");
        let person = Person::from_raw(&raw);

        assert_eq!(person.first_name, "Anna");
        assert!(person.birth.map(|b| b.is_full()).unwrap_or(false));
        assert_eq!(person.death, None);
        assert_eq!(person.marriage, Some(PartialDate::YearOnly(1971)));
        assert!(!person.is_deceased());
    }

    #[test]
    fn test_unparseable_death_still_means_deceased() {
        let person =
            Person::from_raw(&RawPerson::new(1, Sex::Male, "Ivan", "").died("winter 1942"));
        assert_eq!(person.death, Some(PartialDate::Unknown));
        assert!(person.is_deceased());
        assert_eq!(person.full_name(), "Ivan");
    }

    #[test]
    fn test_age_uses_death_or_today() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let living = Person::from_raw(&RawPerson::new(1, Sex::Male, "A", "B").born("15.06.1950"));
        assert_eq!(living.age(today), Some(74));

        let dead = Person::from_raw(
            &RawPerson::new(2, Sex::Male, "A", "B").born("15.06.1900").died("14.06.1990"),
        );
        assert_eq!(dead.age(today), Some(89));
    }

    #[test]
    fn test_raw_json_shape() {
        let json = r#"{"id": 3, "sex": "F", "firstName": "Olga", "fatherId": 1,
                       "spouseIds": [4], "orderByFather": 2}"#;
        let raw: RawPerson = serde_json::from_str(json).unwrap();
        assert_eq!(raw.sex, Sex::Female);
        assert_eq!(raw.father_id, Some(1));
        assert_eq!(raw.spouse_ids, vec![4]);
        assert_eq!(raw.order_by_father, 2);
        assert!(raw.children_ids.is_empty());
    }

    #[test]
    fn test_forget_strips_references() {
        let mut raw = RawPerson::new(5, Sex::Male, "", "")
            .with_parents(Some(1), Some(2))
            .with_spouses(&[2, 3])
            .with_children(&[2]);
        raw.forget(2);
        assert_eq!(raw.mother_id, None);
        assert_eq!(raw.father_id, Some(1));
        assert_eq!(raw.spouse_ids, vec![3]);
        assert!(raw.children_ids.is_empty());
    }
}
