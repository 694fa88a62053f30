//! Event Scheduler
//!
//! Projects birthdays, memorials and wedding anniversaries onto the next
//! `window_days` days and ranks them by proximity.

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::date::{next_occurrence, PartialDate};
use crate::graph::GraphSnapshot;
use crate::person::{Person, PersonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Birthday,
    Memorial,
    WeddingAnniversary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProjection {
    pub person_id: PersonId,
    pub kind: EventKind,
    pub date: NaiveDate,
    /// Years since the origin event; 0 for birthdays of the living unless
    /// the running age was requested
    pub years: u32,
    pub days_until: u32,
    /// Spouse for wedding anniversaries
    pub partner_id: Option<PersonId>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOptions {
    pub window_days: u32,
    /// Report the age being reached on birthdays of living people
    pub include_running_age: bool,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EventOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            window_days: config.event_window_days,
            include_running_age: false,
        }
    }
}

pub fn upcoming_events(
    snapshot: &GraphSnapshot,
    window_days: u32,
    today: NaiveDate,
) -> Vec<EventProjection> {
    let options = EventOptions {
        window_days,
        include_running_age: false,
    };
    upcoming_events_with(snapshot, &options, today)
}

pub fn upcoming_events_with(
    snapshot: &GraphSnapshot,
    options: &EventOptions,
    today: NaiveDate,
) -> Vec<EventProjection> {
    let mut events: Vec<EventProjection> = snapshot
        .par_persons()
        .flat_map_iter(|person| project_person(snapshot, person, options, today))
        .filter(|event| event.days_until <= options.window_days)
        .collect();

    events.sort_by(|a, b| {
        a.days_until
            .cmp(&b.days_until)
            .then_with(|| a.last_name.cmp(&b.last_name))
            .then_with(|| a.first_name.cmp(&b.first_name))
            .then_with(|| a.person_id.cmp(&b.person_id))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    events
}

fn project_person(
    snapshot: &GraphSnapshot,
    person: &Person,
    options: &EventOptions,
    today: NaiveDate,
) -> Vec<EventProjection> {
    let mut events = Vec::new();

    if let Some(birth) = person.birth.and_then(|b| b.as_full()) {
        let count_years = person.is_deceased() || options.include_running_age;
        if let Some(event) = project(person, EventKind::Birthday, birth, count_years, today) {
            events.push(event);
        }
    }

    if let Some(death) = person.death.and_then(|d| d.as_full()) {
        if let Some(event) = project(person, EventKind::Memorial, death, true, today) {
            events.push(event);
        }
    }

    if let Some(marriage) = person.marriage.and_then(|m| m.as_full()) {
        let (partner, shared) = wedding_partner(snapshot, person);
        // A couple recording the same date is reported once, by the lower id
        let reported_by_partner = shared && partner.map(|p| p < person.id).unwrap_or(false);
        if !reported_by_partner {
            if let Some(mut event) =
                project(person, EventKind::WeddingAnniversary, marriage, true, today)
            {
                event.partner_id = partner;
                events.push(event);
            }
        }
    }

    events
}

fn project(
    person: &Person,
    kind: EventKind,
    origin: NaiveDate,
    count_years: bool,
    today: NaiveDate,
) -> Option<EventProjection> {
    let (date, days_until) = next_occurrence(origin.month(), origin.day(), today)?;
    let years = if count_years {
        u32::try_from(date.year() - origin.year()).unwrap_or(0)
    } else {
        0
    };
    Some(EventProjection {
        person_id: person.id,
        kind,
        date,
        years,
        days_until,
        partner_id: None,
        first_name: person.first_name.clone(),
        last_name: person.last_name.clone(),
    })
}

/// The spouse recording the same marriage date, else the only spouse.
/// The flag tells whether the date is shared.
fn wedding_partner(snapshot: &GraphSnapshot, person: &Person) -> (Option<PersonId>, bool) {
    let spouses = snapshot.spouses_of(person.id);
    let shared = spouses.iter().copied().find(|spouse| {
        snapshot
            .get(*spouse)
            .and_then(|s| s.marriage)
            .map(|m: PartialDate| Some(m) == person.marriage)
            .unwrap_or(false)
    });
    match (shared, spouses) {
        (Some(partner), _) => (Some(partner), true),
        (None, [only]) => (Some(*only), false),
        _ => (None, false),
    }
}
