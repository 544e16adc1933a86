//! Essay repository: graded essays in the `essays` table.

use chrono::Utc;
use essay_core::models::{AnnotationMap, CriterionScore, EssayRecord, NewEssay};
use essay_core::store::{RecordStore, StoreError};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::{column_error, format_timestamp, parse_timestamp, Db, DbError};

const SELECT_COLUMNS: &str = "SELECT id, owner_id, title, body, grade, score, \
     criteria_json, annotations_json, created_at FROM essays";

pub struct EssayRepository<'a> {
    db: &'a Db,
}

impl<'a> EssayRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn create(&self, essay: NewEssay) -> Result<EssayRecord, DbError> {
        essay.validate().map_err(DbError::Validation)?;

        let id = uuid::Uuid::new_v4().to_string();
        let record = essay.into_record(id, Utc::now());
        let criteria_json = serde_json::to_string(&record.criteria)?;
        let annotations_json = serde_json::to_string(&record.annotations)?;

        self.db.conn().execute(
            "INSERT INTO essays (
                id, owner_id, title, body, grade, score,
                criteria_json, annotations_json, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.owner_id,
                record.title,
                record.body,
                record.grade,
                record.score,
                criteria_json,
                annotations_json,
                format_timestamp(record.created_at),
            ],
        )?;

        debug!(essay_id = %record.id, owner_id = %record.owner_id, "essay stored");
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<EssayRecord, DbError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let result = self
            .db
            .conn()
            .query_row(&sql, params![id], scan_essay)
            .optional()?;

        result.ok_or(DbError::EssayNotFound)
    }

    /// Like [`get`](Self::get), but another owner's essay is reported as missing.
    pub fn get_for_owner(&self, owner_id: &str, id: &str) -> Result<EssayRecord, DbError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1 AND owner_id = ?2");
        let result = self
            .db
            .conn()
            .query_row(&sql, params![id, owner_id], scan_essay)
            .optional()?;

        result.ok_or(DbError::EssayNotFound)
    }

    /// Newest first; equal timestamps fall back to id order.
    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EssayRecord>, DbError> {
        let sql = format!("{SELECT_COLUMNS} WHERE owner_id = ?1 ORDER BY created_at DESC, id ASC");
        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], scan_essay)?;

        let mut essays = Vec::new();
        for row in rows {
            essays.push(row?);
        }
        Ok(essays)
    }
}

impl RecordStore for EssayRepository<'_> {
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EssayRecord>, StoreError> {
        EssayRepository::list_by_owner(self, owner_id).map_err(store_error)
    }

    fn get_for_owner(&self, owner_id: &str, id: &str) -> Result<EssayRecord, StoreError> {
        EssayRepository::get_for_owner(self, owner_id, id).map_err(store_error)
    }

    fn insert(&self, essay: NewEssay) -> Result<EssayRecord, StoreError> {
        self.create(essay).map_err(store_error)
    }
}

/// Maps storage failures onto the store seam used by the view layer.
pub fn store_error(err: DbError) -> StoreError {
    match err {
        DbError::EssayNotFound => StoreError::NotFound,
        DbError::Validation(msg) => StoreError::Validation(msg),
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn scan_essay(row: &rusqlite::Row<'_>) -> rusqlite::Result<EssayRecord> {
    let criteria_json: String = row.get(6)?;
    let annotations_json: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    let criteria: Vec<CriterionScore> = serde_json::from_str(&criteria_json)
        .map_err(|err| column_error(6, DbError::Json(err)))?;
    let annotations: AnnotationMap = serde_json::from_str(&annotations_json)
        .map_err(|err| column_error(7, DbError::Json(err)))?;

    Ok(EssayRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        grade: row.get(4)?,
        score: row.get(5)?,
        created_at: parse_timestamp(&created_at).map_err(|err| column_error(8, err))?,
        criteria,
        annotations,
    })
}
