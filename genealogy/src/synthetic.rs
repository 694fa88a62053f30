//! Synthetic populations
//!
//! Seeded generator of multi-generation families for benchmarks and tests.
//! Output is internally consistent: parents list their children, spouses list
//! each other, and nobody dies before being born.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GenealogyError, Result};
use crate::names;
use crate::person::{RawPerson, Sex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSpec {
    /// Married couples in the first generation
    pub founder_couples: usize,
    pub generations: u32,
    pub start_year: i32,
    /// Nobody is born after this year; death dates after it are not recorded
    pub present_year: i32,
    pub mean_lifespan: f64,
    pub lifespan_std_dev: f64,
    pub seed: u64,
}

impl Default for PopulationSpec {
    fn default() -> Self {
        Self {
            founder_couples: 50,
            generations: 6,
            start_year: 1750,
            present_year: 2024,
            mean_lifespan: 68.0,
            lifespan_std_dev: 16.0,
            seed: 42,
        }
    }
}

impl PopulationSpec {
    pub fn validate(&self) -> Result<()> {
        if !self.lifespan_std_dev.is_finite() || self.lifespan_std_dev < 0.0 {
            return Err(GenealogyError::Config(format!(
                "lifespan_std_dev must be finite and >= 0, got {}",
                self.lifespan_std_dev
            )));
        }
        if self.generations < 1 {
            return Err(GenealogyError::Config("generations must be at least 1".into()));
        }
        if self.present_year < self.start_year {
            return Err(GenealogyError::Config(format!(
                "present_year {} precedes start_year {}",
                self.present_year, self.start_year
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Couple {
    husband: u64,
    wife: u64,
    married: i32,
}

struct Generator {
    rng: StdRng,
    lifespan: Normal<f64>,
    present_year: i32,
    records: Vec<RawPerson>,
}

impl Generator {
    fn record_mut(&mut self, id: u64) -> Option<&mut RawPerson> {
        // ids are assigned sequentially from 1
        self.records.get_mut((id as usize).checked_sub(1)?)
    }

    fn birth_year(&self, id: u64) -> i32 {
        self.records
            .get((id as usize).saturating_sub(1))
            .and_then(|r| r.birth.as_deref())
            .and_then(|b| b.rsplit('.').next())
            .and_then(|y| y.parse().ok())
            .unwrap_or(self.present_year)
    }

    fn random_date(&mut self, year: i32) -> String {
        let day: u32 = self.rng.gen_range(1..=28);
        let month: u32 = self.rng.gen_range(1..=12);
        format!("{:02}.{:02}.{:04}", day, month, year)
    }

    fn spawn(&mut self, sex: Sex, birth_year: i32, last_name: &str) -> u64 {
        let id = self.records.len() as u64 + 1;
        let first_name = names::random_first_name(&mut self.rng, sex == Sex::Male);
        let mut record = RawPerson::new(id, sex, first_name, last_name);
        record.birth = Some(self.random_date(birth_year));

        let age = self.lifespan.sample(&mut self.rng).clamp(1.0, 105.0) as i32;
        let death_year = birth_year + age;
        if death_year < self.present_year {
            record.death = Some(self.random_date(death_year));
        }

        self.records.push(record);
        id
    }

    fn marry(&mut self, husband: u64, wife: u64) -> Couple {
        let eldest = self.birth_year(husband).max(self.birth_year(wife));
        let married = eldest + self.rng.gen_range(19..=28);
        let date = self.random_date(married);
        for (id, spouse) in [(husband, wife), (wife, husband)] {
            if let Some(record) = self.record_mut(id) {
                record.spouse_ids.push(spouse);
                record.marriage = Some(date.clone());
                record.order_by_spouse = 1;
            }
        }
        Couple { husband, wife, married }
    }

    /// Children of one couple, returned with their sex
    fn have_children(&mut self, couple: Couple) -> Vec<(u64, Sex)> {
        let count = self.rng.gen_range(0..=4);
        let last_name = self
            .records
            .get((couple.husband as usize).saturating_sub(1))
            .map(|r| r.last_name.clone())
            .unwrap_or_default();

        let mut children = Vec::new();
        let mut year = couple.married + 1;
        for order in 1..=count {
            if year > self.present_year {
                break;
            }
            let sex = if self.rng.gen::<bool>() { Sex::Male } else { Sex::Female };
            let child = self.spawn(sex, year, &last_name);
            if let Some(record) = self.record_mut(child) {
                record.father_id = Some(couple.husband);
                record.mother_id = Some(couple.wife);
                record.order_by_father = order;
                record.order_by_mother = order;
            }
            for parent in [couple.husband, couple.wife] {
                if let Some(record) = self.record_mut(parent) {
                    record.children_ids.push(child);
                }
            }
            children.push((child, sex));
            year += self.rng.gen_range(1..=3);
        }
        children
    }
}

/// Generate a consistent population from `spec`
pub fn generate_population(spec: &PopulationSpec) -> Result<Vec<RawPerson>> {
    spec.validate()?;
    let lifespan = Normal::new(spec.mean_lifespan, spec.lifespan_std_dev)
        .map_err(|e| GenealogyError::Config(format!("lifespan distribution: {}", e)))?;
    let mut generator = Generator {
        rng: StdRng::seed_from_u64(spec.seed),
        lifespan,
        present_year: spec.present_year,
        records: Vec::new(),
    };

    let mut couples = Vec::with_capacity(spec.founder_couples);
    for _ in 0..spec.founder_couples {
        let husband_name = names::random_last_name(&mut generator.rng);
        let wife_name = names::random_last_name(&mut generator.rng);
        let husband_year = spec.start_year + generator.rng.gen_range(0..10);
        let wife_year = spec.start_year + generator.rng.gen_range(0..10);
        let husband = generator.spawn(Sex::Male, husband_year, husband_name);
        let wife = generator.spawn(Sex::Female, wife_year, wife_name);
        couples.push(generator.marry(husband, wife));
    }

    for generation in 1..spec.generations {
        let mut sons = Vec::new();
        let mut daughters = Vec::new();
        for couple in &couples {
            for (child, sex) in generator.have_children(*couple) {
                match sex {
                    Sex::Male => sons.push((child, couple.husband)),
                    Sex::Female => daughters.push((child, couple.husband)),
                }
            }
        }
        sons.shuffle(&mut generator.rng);
        daughters.shuffle(&mut generator.rng);

        let mut next = Vec::new();
        for (son, father) in sons {
            // Never pair siblings
            let partner = daughters.iter().position(|(_, her_father)| *her_father != father);
            let wife = match partner {
                Some(index) => daughters.swap_remove(index).0,
                None if generator.rng.gen_bool(0.7) => {
                    // Marry in from outside the tree
                    let year = (generator.birth_year(son) + generator.rng.gen_range(-3..=3))
                        .min(spec.present_year);
                    let name = names::random_last_name(&mut generator.rng);
                    generator.spawn(Sex::Female, year, name)
                }
                None => continue,
            };
            next.push(generator.marry(son, wife));
        }
        debug!(
            "Generation {}: {} couples, {} people so far",
            generation,
            next.len(),
            generator.records.len()
        );
        couples = next;
    }

    Ok(generator.records)
}
