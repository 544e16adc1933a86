//! Essay history loading for the dashboard.
//!
//! [`load_history`] is the strict operation; [`load_history_view`] applies the
//! dashboard policy on top of it: a missing identity asks for sign-in, a store
//! failure degrades to an empty list with one logged diagnostic.

use thiserror::Error;
use tracing::error;

use crate::grade_scale::GradeTier;
use crate::models::EssayRecord;
use crate::routes::Route;
use crate::session::SessionProvider;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("no signed-in identity")]
    Unauthenticated,
    #[error("essay history unavailable: {0}")]
    StoreUnavailable(String),
}

/// Presentation-ready row of the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub grade: String,
    pub score: u8,
    pub submitted_on: String,
    pub grade_tier: GradeTier,
    pub result_path: String,
}

impl HistoryEntry {
    fn from_record(record: EssayRecord) -> Self {
        let result_path = Route::GradeResult(record.id.clone()).path();
        Self {
            grade_tier: GradeTier::from_grade(&record.grade),
            submitted_on: record.created_at.format("%Y-%m-%d").to_string(),
            id: record.id,
            title: record.title,
            grade: record.grade,
            score: record.score,
            result_path,
        }
    }
}

/// What the dashboard should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    Entries(Vec<HistoryEntry>),
    SignInRequired,
}

/// Loads the signed-in identity's essays, newest first.
pub fn load_history<P, S>(session: &P, store: &S) -> Result<Vec<HistoryEntry>, HistoryError>
where
    P: SessionProvider + ?Sized,
    S: RecordStore + ?Sized,
{
    let identity = session
        .current_identity()
        .ok_or(HistoryError::Unauthenticated)?;

    let mut records = store
        .list_by_owner(&identity.id)
        .map_err(|err| match err {
            StoreError::Unavailable(reason) => HistoryError::StoreUnavailable(reason),
            other => HistoryError::StoreUnavailable(other.to_string()),
        })?;

    records.retain(|record| record.owner_id == identity.id);
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(records.into_iter().map(HistoryEntry::from_record).collect())
}

/// Dashboard policy over [`load_history`].
pub fn load_history_view<P, S>(session: &P, store: &S) -> HistoryView
where
    P: SessionProvider + ?Sized,
    S: RecordStore + ?Sized,
{
    match load_history(session, store) {
        Ok(entries) => HistoryView::Entries(entries),
        Err(HistoryError::Unauthenticated) => HistoryView::SignInRequired,
        Err(HistoryError::StoreUnavailable(reason)) => {
            error!(reason = %reason, "error fetching essay history");
            HistoryView::Entries(Vec::new())
        }
    }
}

/// Dashboard stats card.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistorySummary {
    pub total: usize,
    pub average_score: u8,
    pub best_score: Option<u8>,
}

impl HistorySummary {
    #[must_use]
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        let sum: u32 = entries.iter().map(|entry| u32::from(entry.score)).sum();
        let total = entries.len();
        let average = (sum as f64 / total as f64).round() as u8;
        Self {
            total,
            average_score: average,
            best_score: entries.iter().map(|entry| entry.score).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;
    use crate::session::{Identity, SessionContext};
    use crate::store::MemoryRecordStore;

    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn record(id: &str, owner: &str, minutes: i64, score: u8) -> EssayRecord {
        let base = match Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).single() {
            Some(base) => base,
            None => panic!("valid timestamp"),
        };
        EssayRecord {
            id: id.into(),
            owner_id: owner.into(),
            title: format!("Essay {id}"),
            body: "Some essay body".into(),
            grade: "B+".into(),
            score,
            created_at: base + Duration::minutes(minutes),
            criteria: Vec::new(),
            annotations: Default::default(),
        }
    }

    fn alice() -> SessionContext {
        SessionContext::signed_in(Identity::new("alice"))
    }

    #[test]
    fn identity_without_records_gets_empty_history() {
        let store = MemoryRecordStore::new().with_record(record("b1", "bob", 0, 70));
        let entries = match load_history(&alice(), &store) {
            Ok(entries) => entries,
            Err(err) => panic!("load_history: {err}"),
        };
        assert!(entries.is_empty());
    }

    #[test]
    fn only_owned_records_are_returned() {
        let store = MemoryRecordStore::new()
            .with_record(record("a1", "alice", 0, 80))
            .with_record(record("b1", "bob", 1, 70))
            .with_record(record("a2", "alice", 2, 90))
            .with_record(record("c1", "carol", 3, 60))
            .with_record(record("a3", "alice", 4, 85));

        let entries = match load_history(&alice(), &store) {
            Ok(entries) => entries,
            Err(err) => panic!("load_history: {err}"),
        };
        assert_eq!(entries.len(), 3);
        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a2", "a1"]);
    }

    #[test]
    fn entries_are_presentation_ready() {
        let store = MemoryRecordStore::new().with_record(record("a1", "alice", 0, 88));
        let entries = match load_history(&alice(), &store) {
            Ok(entries) => entries,
            Err(err) => panic!("load_history: {err}"),
        };
        assert_eq!(entries[0].submitted_on, "2025-03-14");
        assert_eq!(entries[0].result_path, "/grade/result/a1");
        assert_eq!(entries[0].grade_tier, GradeTier::Good);
    }

    #[test]
    fn missing_identity_is_unauthenticated() {
        let store = MemoryRecordStore::new();
        let result = load_history(&SessionContext::anonymous(), &store);
        assert_eq!(result, Err(HistoryError::Unauthenticated));
        assert_eq!(
            load_history_view(&SessionContext::anonymous(), &store),
            HistoryView::SignInRequired
        );
    }

    #[test]
    fn store_failure_degrades_to_empty_with_one_diagnostic() {
        let store = MemoryRecordStore::new()
            .with_record(record("a1", "alice", 0, 80))
            .with_list_error(StoreError::Unavailable("transient network error".into()));

        let failing = MemoryRecordStore::new()
            .with_list_error(StoreError::Unavailable("connection refused".into()));
        assert_eq!(
            load_history(&alice(), &failing),
            Err(HistoryError::StoreUnavailable("connection refused".into()))
        );

        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
        let view = tracing::subscriber::with_default(subscriber, || {
            load_history_view(&alice(), &store)
        });

        assert_eq!(view, HistoryView::Entries(Vec::new()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn summary_reports_totals() {
        let store = MemoryRecordStore::new()
            .with_record(record("a1", "alice", 0, 80))
            .with_record(record("a2", "alice", 1, 91));
        let entries = match load_history(&alice(), &store) {
            Ok(entries) => entries,
            Err(err) => panic!("load_history: {err}"),
        };
        let summary = HistorySummary::from_entries(&entries);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.average_score, 86);
        assert_eq!(summary.best_score, Some(91));
        assert_eq!(HistorySummary::from_entries(&[]), HistorySummary::default());
    }
}
