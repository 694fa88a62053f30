//! Stats Aggregator
//!
//! Population counts, age histogram and the longest-lived list, computed in
//! one parallel fold. Nothing is cached between calls.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::graph::GraphSnapshot;
use crate::person::{Person, PersonId, Sex};

/// Histogram ranges (inclusive); the last bucket is open-ended
const AGE_BUCKETS: &[(u32, Option<u32>)] = &[
    (0, Some(49)),
    (50, Some(59)),
    (60, Some(69)),
    (70, Some(79)),
    (80, Some(89)),
    (90, Some(99)),
    (100, None),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub label: String,
    pub min: u32,
    pub max: Option<u32>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongLived {
    pub person_id: PersonId,
    pub name: String,
    pub age: u32,
    pub deceased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsData {
    pub total: usize,
    pub male_count: usize,
    pub female_count: usize,
    pub alive_count: usize,
    pub deceased_count: usize,
    /// People whose age cannot be computed; not part of the histogram
    pub unknown_age_count: usize,
    pub age_histogram: Vec<AgeBucket>,
    /// Mean age at death over the deceased with a computable age
    pub average_lifespan: Option<f64>,
    /// Oldest first, ties by id
    pub longest_lived: Vec<LongLived>,
}

impl StatsData {
    pub fn histogram_total(&self) -> usize {
        self.age_histogram.iter().map(|b| b.count).sum()
    }
}

fn bucket_index(age: u32) -> usize {
    AGE_BUCKETS
        .iter()
        .rposition(|(min, _)| age >= *min)
        .unwrap_or(0)
}

fn bucket_label(min: u32, max: Option<u32>) -> String {
    match max {
        Some(max) if min == 0 => format!("<{}", max + 1),
        Some(max) => format!("{}-{}", min, max),
        None => format!("{}+", min),
    }
}

#[derive(Debug, Clone, Default)]
struct Tally {
    male: usize,
    female: usize,
    alive: usize,
    deceased: usize,
    unknown_age: usize,
    buckets: [usize; 7],
    lifespan_sum: u64,
    lifespan_count: usize,
    long_lived: Vec<(u32, PersonId)>,
}

impl Tally {
    fn add(mut self, person: &Person, today: NaiveDate, min_age: u32) -> Self {
        match person.sex {
            Sex::Male => self.male += 1,
            Sex::Female => self.female += 1,
        }
        if person.is_deceased() {
            self.deceased += 1;
        } else {
            self.alive += 1;
        }

        match person.age(today) {
            Some(age) => {
                self.buckets[bucket_index(age)] += 1;
                if person.is_deceased() {
                    self.lifespan_sum += u64::from(age);
                    self.lifespan_count += 1;
                }
                if age >= min_age {
                    self.long_lived.push((age, person.id));
                }
            }
            None => self.unknown_age += 1,
        }
        self
    }

    fn merge(mut self, other: Tally) -> Self {
        self.male += other.male;
        self.female += other.female;
        self.alive += other.alive;
        self.deceased += other.deceased;
        self.unknown_age += other.unknown_age;
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets) {
            *mine += theirs;
        }
        self.lifespan_sum += other.lifespan_sum;
        self.lifespan_count += other.lifespan_count;
        self.long_lived.extend(other.long_lived);
        self
    }
}

pub fn compute_stats(snapshot: &GraphSnapshot, today: NaiveDate) -> StatsData {
    compute_stats_with(snapshot, today, &EngineConfig::default())
}

pub fn compute_stats_with(
    snapshot: &GraphSnapshot,
    today: NaiveDate,
    config: &EngineConfig,
) -> StatsData {
    let min_age = config.longest_lived_min_age;
    let mut tally = snapshot
        .par_persons()
        .fold(Tally::default, |tally, person| tally.add(person, today, min_age))
        .reduce(Tally::default, Tally::merge);

    tally
        .long_lived
        .sort_by(|(age_a, id_a), (age_b, id_b)| age_b.cmp(age_a).then(id_a.cmp(id_b)));
    tally.long_lived.truncate(config.longest_lived_top_n);

    let longest_lived = tally
        .long_lived
        .iter()
        .filter_map(|(age, id)| {
            snapshot.get(*id).map(|person| LongLived {
                person_id: *id,
                name: person.full_name(),
                age: *age,
                deceased: person.is_deceased(),
            })
        })
        .collect();

    let age_histogram = AGE_BUCKETS
        .iter()
        .zip(tally.buckets)
        .map(|((min, max), count)| AgeBucket {
            label: bucket_label(*min, *max),
            min: *min,
            max: *max,
            count,
        })
        .collect();

    let average_lifespan = (tally.lifespan_count > 0)
        .then(|| tally.lifespan_sum as f64 / tally.lifespan_count as f64);

    StatsData {
        total: snapshot.len(),
        male_count: tally.male,
        female_count: tally.female,
        alive_count: tally.alive,
        deceased_count: tally.deceased,
        unknown_age_count: tally.unknown_age,
        age_histogram,
        average_lifespan,
        longest_lived,
    }
}
