//! Record store seam.
//!
//! `essay-db` provides the SQLite implementation; [`MemoryRecordStore`] backs
//! unit tests and local demos.

use std::sync::Mutex;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::models::{EssayRecord, NewEssay};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("essay not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

/// Owner-scoped access to essay records.
pub trait RecordStore {
    /// All records owned by `owner_id`, in the store's natural order.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EssayRecord>, StoreError>;

    /// One record, only if it belongs to `owner_id`.
    fn get_for_owner(&self, owner_id: &str, id: &str) -> Result<EssayRecord, StoreError>;

    /// Persists a new record; the store assigns `id` and `created_at`.
    fn insert(&self, essay: NewEssay) -> Result<EssayRecord, StoreError>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EssayRecord>, StoreError> {
        (**self).list_by_owner(owner_id)
    }

    fn get_for_owner(&self, owner_id: &str, id: &str) -> Result<EssayRecord, StoreError> {
        (**self).get_for_owner(owner_id, id)
    }

    fn insert(&self, essay: NewEssay) -> Result<EssayRecord, StoreError> {
        (**self).insert(essay)
    }
}

/// In-memory store with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<EssayRecord>>,
    list_error: Mutex<Option<StoreError>>,
    next_id: Mutex<u64>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a record exactly as given.
    pub fn with_record(self, record: EssayRecord) -> Self {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        self
    }

    /// Make the next `list_by_owner` call fail with `err`.
    pub fn with_list_error(self, err: StoreError) -> Self {
        match self.list_error.lock() {
            Ok(mut slot) => *slot = Some(err),
            Err(poisoned) => *poisoned.into_inner() = Some(err),
        }
        self
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_list_error(&self) -> Option<StoreError> {
        match self.list_error.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn snapshot(&self) -> Vec<EssayRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EssayRecord>, StoreError> {
        if let Some(err) = self.take_list_error() {
            return Err(err);
        }
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|record| record.owner_id == owner_id)
            .collect())
    }

    fn get_for_owner(&self, owner_id: &str, id: &str) -> Result<EssayRecord, StoreError> {
        self.snapshot()
            .into_iter()
            .find(|record| record.id == id && record.owner_id == owner_id)
            .ok_or(StoreError::NotFound)
    }

    fn insert(&self, essay: NewEssay) -> Result<EssayRecord, StoreError> {
        essay.validate().map_err(StoreError::Validation)?;

        let seq = {
            let mut next = match self.next_id.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *next += 1;
            *next
        };
        // Keep creation times strictly increasing so ordering tests are stable.
        let created_at = Utc::now() + Duration::milliseconds(seq as i64);
        let record = essay.into_record(format!("mem-{seq}"), created_at);

        match self.records.lock() {
            Ok(mut records) => records.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_essay(owner: &str, title: &str) -> NewEssay {
        NewEssay {
            owner_id: owner.into(),
            title: title.into(),
            body: "Some essay body".into(),
            grade: "B+".into(),
            score: 87,
            ..NewEssay::default()
        }
    }

    #[test]
    fn insert_assigns_ids_and_scopes_by_owner() {
        let store = MemoryRecordStore::new();
        let a = match store.insert(new_essay("alice", "One")) {
            Ok(record) => record,
            Err(err) => panic!("insert: {err}"),
        };
        let _ = store.insert(new_essay("bob", "Two"));

        assert!(!a.id.is_empty());
        assert_eq!(store.len(), 2);

        let listed = match store.list_by_owner("alice") {
            Ok(listed) => listed,
            Err(err) => panic!("list: {err}"),
        };
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "One");

        assert_eq!(store.get_for_owner("bob", &a.id), Err(StoreError::NotFound));
    }

    #[test]
    fn insert_rejects_invalid_payload() {
        let store = MemoryRecordStore::new();
        let result = store.insert(new_essay("alice", "   "));
        assert!(matches!(result, Err(StoreError::Validation(_))), "{result:?}");
        assert!(store.is_empty());
    }

    #[test]
    fn list_error_fires_once() {
        let store = MemoryRecordStore::new()
            .with_list_error(StoreError::Unavailable("connection reset".into()));
        assert!(store.list_by_owner("alice").is_err());
        assert_eq!(store.list_by_owner("alice"), Ok(Vec::new()));
    }
}
