//! essay-db: SQLite storage + migration engine for the essay grader.

pub mod admin;
pub mod essay_repository;
pub mod session_repository;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::info;

include!(concat!(env!("OUT_DIR"), "/migrations.rs"));

/// Crate identity label.
pub fn crate_label() -> &'static str {
    "essay-db"
}

#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: 5000,
        }
    }

    pub fn from_app_config(cfg: &essay_core::config::Config) -> Self {
        Self {
            path: PathBuf::from(cfg.database_path()),
            busy_timeout_ms: u64::try_from(cfg.database.busy_timeout_ms).unwrap_or(0),
        }
    }
}

#[derive(Debug)]
pub struct Db {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i32,
    pub description: String,
    pub applied: bool,
    pub applied_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("open database: {0}")]
    Open(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("migration {version} missing {direction} sql")]
    MissingSQL {
        version: i32,
        direction: &'static str,
    },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Transaction(String),
    #[error("essay not found")]
    EssayNotFound,
    #[error("session not found")]
    SessionNotFound,
}

impl Db {
    /// Opens (creating if needed) the database file at `cfg.path`.
    pub fn open(cfg: Config) -> Result<Self, DbError> {
        if let Some(dir) = cfg.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(&cfg.path)?;
        conn.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))?;
        for (pragma, value) in [
            ("journal_mode", "WAL"),
            ("foreign_keys", "ON"),
            ("synchronous", "NORMAL"),
        ] {
            // Not every SQLite build honours every pragma; keep going.
            if let Err(err) = conn.pragma_update(None, pragma, value) {
                tracing::debug!(pragma, error = %err, "pragma not applied");
            }
        }
        Ok(Self { conn })
    }

    /// Private in-memory database, mostly for tests and demos.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let _ = conn.pragma_update(None, "foreign_keys", "ON");
        Ok(Self { conn })
    }

    /// Applies every pending migration in version order.
    pub fn migrate_up(&mut self) -> Result<usize, DbError> {
        let current = self.schema_version()?;
        let pending: Vec<EmbeddedMigration> = MIGRATIONS
            .iter()
            .filter(|m| m.version > current)
            .copied()
            .collect();
        for m in &pending {
            self.apply(m, Direction::Up)?;
        }
        Ok(pending.len())
    }

    /// Reverts up to `steps` applied migrations, newest first.
    pub fn migrate_down(&mut self, steps: i32) -> Result<usize, DbError> {
        let current = self.schema_version()?;
        let Ok(steps) = usize::try_from(steps) else {
            return Ok(0);
        };
        let applied: Vec<EmbeddedMigration> = MIGRATIONS
            .iter()
            .rev()
            .filter(|m| m.version <= current)
            .take(steps)
            .copied()
            .collect();
        for m in &applied {
            self.apply(m, Direction::Down)?;
        }
        Ok(applied.len())
    }

    pub fn migration_status(&mut self) -> Result<Vec<MigrationStatus>, DbError> {
        self.bootstrap()?;
        let mut stmt = self
            .conn
            .prepare("SELECT version, applied_at FROM schema_migrations")?;
        let applied: BTreeMap<i32, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_, _>>()?;

        Ok(MIGRATIONS
            .iter()
            .map(|m| {
                let applied_at = applied.get(&m.version).cloned();
                MigrationStatus {
                    version: m.version,
                    description: m.description.to_string(),
                    applied: applied_at.is_some(),
                    applied_at: applied_at.unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Highest applied migration version, 0 on a fresh database.
    pub fn schema_version(&self) -> Result<i32, DbError> {
        self.bootstrap()?;
        let version = self.conn.query_row(
            "SELECT IFNULL(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    fn bootstrap(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    fn apply(&mut self, m: &EmbeddedMigration, direction: Direction) -> Result<(), DbError> {
        let sql = match direction {
            Direction::Up => m.up_sql,
            Direction::Down => m.down_sql,
        };
        if sql.trim().is_empty() {
            return Err(DbError::MissingSQL {
                version: m.version,
                direction: direction.as_str(),
            });
        }

        self.transaction(|tx| {
            tx.execute_batch(sql)?;
            match direction {
                Direction::Up => tx.execute(
                    "INSERT INTO schema_migrations (version, description, applied_at)
                     VALUES (?1, ?2, ?3)",
                    params![m.version, m.description, format_timestamp(Utc::now())],
                )?,
                Direction::Down => tx.execute(
                    "DELETE FROM schema_migrations WHERE version = ?1",
                    params![m.version],
                )?,
            };
            Ok(())
        })?;
        info!(
            version = m.version,
            description = m.description,
            direction = direction.as_str(),
            "migration applied"
        );
        Ok(())
    }

    /// Raw connection, for ad-hoc queries in tools and tests.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` in a transaction; any error rolls the whole unit back.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let tx = self.conn.transaction()?;
        let value = match f(&tx) {
            Ok(value) => value,
            Err(err) => {
                return match tx.rollback() {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(DbError::Transaction(format!(
                        "{err}; rollback also failed: {rollback}"
                    ))),
                };
            }
        };
        tx.commit()?;
        Ok(value)
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
/// ordering matches time ordering.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| DbError::Validation(format!("invalid timestamp {raw:?}: {err}")))
}

/// Wraps a column decoding failure so it can leave a row-mapping closure.
pub(crate) fn column_error(column: usize, err: DbError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "essay-db");
    }

    #[test]
    fn migrations_are_embedded_in_order() {
        assert!(MIGRATIONS.len() >= 2);
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        assert!(MIGRATIONS.iter().all(|m| !m.up_sql.is_empty()));
        assert!(MIGRATIONS.iter().all(|m| !m.down_sql.is_empty()));
    }

    #[test]
    fn timestamps_round_trip_and_sort_as_text() {
        let early = match DateTime::parse_from_rfc3339("2025-01-02T03:04:05.000006Z") {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(err) => panic!("parse: {err}"),
        };
        let late = early + chrono::Duration::microseconds(1);
        let (a, b) = (format_timestamp(early), format_timestamp(late));
        assert!(a < b);
        match parse_timestamp(&a) {
            Ok(parsed) => assert_eq!(parsed, early),
            Err(err) => panic!("parse_timestamp: {err}"),
        }
        assert!(parse_timestamp("yesterday").is_err());
    }
}
