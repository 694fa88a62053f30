//! Snapshot Store - owns the current snapshot
//!
//! Readers clone an `Arc` and never block each other. Writers are serialized:
//! copy the backing records, apply the edit, rebuild, publish. A rebuild that
//! fails publishes nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, warn};

use crate::error::{GenealogyError, Result};
use crate::graph::{build_snapshot, GraphSnapshot, ValidationReport};
use crate::person::{PersonId, RawPerson};

pub struct SnapshotStore {
    current: RwLock<Arc<GraphSnapshot>>,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl SnapshotStore {
    pub fn new(records: Vec<RawPerson>) -> Result<(Self, ValidationReport)> {
        let (snapshot, report) = build_snapshot(records)?;
        let store = Self {
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
            generation: AtomicU64::new(1),
        };
        Ok((store, report))
    }

    pub fn empty() -> Self {
        Self {
            current: RwLock::new(Arc::new(GraphSnapshot::default())),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The published snapshot. Stays valid after later publishes.
    pub fn current(&self) -> Arc<GraphSnapshot> {
        // The guarded value is an immutable Arc, so a poisoned lock is still usable
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Number of snapshots published so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn replace_all(&self, records: Vec<RawPerson>) -> Result<ValidationReport> {
        self.mutate("replace_all", move |current| {
            *current = records;
            Ok(())
        })
    }

    pub fn create_person(&self, record: RawPerson) -> Result<ValidationReport> {
        self.mutate("create_person", move |records| {
            if records.iter().any(|r| r.id == record.id) {
                return Err(GenealogyError::DuplicateId(PersonId(record.id)));
            }
            records.push(record);
            Ok(())
        })
    }

    pub fn update_person(&self, record: RawPerson) -> Result<ValidationReport> {
        self.mutate("update_person", move |records| {
            let slot = records
                .iter_mut()
                .find(|r| r.id == record.id)
                .ok_or(GenealogyError::NotFound(PersonId(record.id)))?;
            *slot = record;
            Ok(())
        })
    }

    /// Remove a person and every reference to them
    pub fn delete_person(&self, id: PersonId) -> Result<ValidationReport> {
        self.mutate("delete_person", move |records| {
            let index = records
                .iter()
                .position(|r| r.id == id.0)
                .ok_or(GenealogyError::NotFound(id))?;
            records.remove(index);
            for record in records.iter_mut() {
                record.forget(id.0);
            }
            Ok(())
        })
    }

    fn mutate<F>(&self, operation: &str, edit: F) -> Result<ValidationReport>
    where
        F: FnOnce(&mut Vec<RawPerson>) -> Result<()>,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut records = self.current().records().to_vec();
        if let Err(e) = edit(&mut records) {
            warn!("{} rejected: {}", operation, e);
            return Err(e);
        }
        let (snapshot, report) = match build_snapshot(records) {
            Ok(built) => built,
            Err(e) => {
                warn!("{} rejected during rebuild: {}", operation, e);
                return Err(e);
            }
        };

        let people = snapshot.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            "{} published snapshot generation {} ({} people, {} issues)",
            operation,
            generation,
            people,
            report.len()
        );
        Ok(report)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::IssueKind;
    use crate::person::Sex;
    use std::thread;

    fn seed() -> Vec<RawPerson> {
        vec![
            RawPerson::new(1, Sex::Male, "Karl", "Stein").with_spouses(&[2]),
            RawPerson::new(2, Sex::Female, "Greta", "Stein").with_spouses(&[1]),
            RawPerson::new(3, Sex::Male, "Paul", "Stein").with_parents(Some(1), Some(2)),
        ]
    }

    #[test]
    fn test_create_update_delete() {
        let (store, _) = SnapshotStore::new(seed()).unwrap();
        let before = store.current();

        let lena = RawPerson::new(4, Sex::Female, "Lena", "Stein").with_parents(Some(1), Some(2));
        store.create_person(lena).unwrap();
        assert_eq!(store.current().children_of(PersonId(1)).len(), 2);

        let renamed =
            RawPerson::new(4, Sex::Female, "Lena", "Vogel").with_parents(Some(1), Some(2));
        store.update_person(renamed).unwrap();
        assert_eq!(store.current().get(PersonId(4)).unwrap().last_name, "Vogel");

        let report = store.delete_person(PersonId(1)).unwrap();
        let after = store.current();
        assert_eq!(report.count(IssueKind::DanglingReference), 0);
        assert!(!after.contains(PersonId(1)));
        assert_eq!(after.get(PersonId(3)).unwrap().father, None);
        assert!(after.spouses_of(PersonId(2)).is_empty());

        // Old readers keep their consistent view
        assert_eq!(before.len(), 3);
        assert_eq!(store.generation(), 4);
    }

    #[test]
    fn test_failed_mutation_publishes_nothing() {
        let (store, _) = SnapshotStore::new(seed()).unwrap();
        let generation = store.generation();

        let err = store.create_person(RawPerson::new(2, Sex::Male, "Dup", "")).unwrap_err();
        assert!(matches!(err, GenealogyError::DuplicateId(PersonId(2))));
        assert!(matches!(
            store.update_person(RawPerson::new(9, Sex::Male, "", "")),
            Err(GenealogyError::NotFound(PersonId(9)))
        ));
        assert!(store.delete_person(PersonId(9)).is_err());

        assert_eq!(store.generation(), generation);
        assert_eq!(store.current().len(), 3);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let (store, _) = SnapshotStore::new(seed()).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                for id in 10..60u64 {
                    let child = RawPerson::new(id, Sex::Male, "Kid", "Stein")
                        .with_parents(Some(1), Some(2));
                    store.create_person(child).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = store.current();
                        // Every published child is indexed under both parents
                        assert_eq!(snapshot.len(), snapshot.records().len());
                        assert_eq!(
                            snapshot.children_of(PersonId(1)).len(),
                            snapshot.children_of(PersonId(2)).len()
                        );
                        assert_eq!(snapshot.children_of(PersonId(1)).len(), snapshot.len() - 2);
                    }
                });
            }
        });

        assert_eq!(store.current().len(), 53);
    }

    #[test]
    fn test_replace_all_from_empty() {
        let store = SnapshotStore::default();
        assert!(store.current().is_empty());
        assert_eq!(store.generation(), 0);

        let report = store.replace_all(seed()).unwrap();
        assert!(report.count(IssueKind::MissingChildLink) > 0);
        assert_eq!(store.current().len(), 3);
        assert_eq!(store.generation(), 1);

        assert!(store.replace_all(vec![seed()[0].clone(), seed()[0].clone()]).is_err());
        assert_eq!(store.current().len(), 3);
    }
}
