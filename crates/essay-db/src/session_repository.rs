//! Session repository: bearer tokens that resolve to an [`Identity`].

use chrono::{DateTime, Duration, Utc};
use essay_core::session::Identity;
use rand::RngCore;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use crate::{column_error, format_timestamp, parse_timestamp, Db, DbError};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn identity(&self) -> Identity {
        let identity = Identity::new(self.user_id.clone());
        match &self.email {
            Some(email) => identity.with_email(email.clone()),
            None => identity,
        }
    }
}

pub struct SessionRepository<'a> {
    db: &'a Db,
}

impl<'a> SessionRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Issues a fresh random token for `user_id` valid for `ttl`.
    pub fn create(
        &self,
        user_id: &str,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<Session, DbError> {
        if user_id.trim().is_empty() {
            return Err(DbError::Validation("session user id is required".into()));
        }
        if ttl <= Duration::zero() {
            return Err(DbError::Validation("session ttl must be positive".into()));
        }

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| DbError::Validation("session ttl is out of range".into()))?;
        let session = Session {
            token: new_token(),
            user_id: user_id.trim().to_string(),
            email: nullable_string(email),
            created_at: now,
            expires_at,
        };

        self.db.conn().execute(
            "INSERT INTO sessions (token, user_id, email, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.token,
                session.user_id,
                session.email,
                format_timestamp(session.created_at),
                format_timestamp(session.expires_at),
            ],
        )?;

        info!(user_id = %session.user_id, expires_at = %session.expires_at, "session created");
        Ok(session)
    }

    pub fn get(&self, token: &str) -> Result<Session, DbError> {
        let result = self
            .db
            .conn()
            .query_row(
                "SELECT token, user_id, email, created_at, expires_at
                 FROM sessions
                 WHERE token = ?1",
                params![token],
                scan_session,
            )
            .optional()?;

        result.ok_or(DbError::SessionNotFound)
    }

    /// The identity behind `token`, if the session exists and has not expired.
    pub fn resolve(&self, token: &str) -> Result<Option<Identity>, DbError> {
        self.resolve_at(token, Utc::now())
    }

    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Identity>, DbError> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        match self.get(token) {
            Ok(session) if session.is_expired_at(now) => {
                debug!(user_id = %session.user_id, "session expired");
                Ok(None)
            }
            Ok(session) => Ok(Some(session.identity())),
            Err(DbError::SessionNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn revoke(&self, token: &str) -> Result<(), DbError> {
        let rows = self
            .db
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        if rows == 0 {
            return Err(DbError::SessionNotFound);
        }
        Ok(())
    }

    /// Deletes every session expired at `now`; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DbError> {
        let rows = self.db.conn().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![format_timestamp(now)],
        )?;
        if rows > 0 {
            info!(removed = rows, "purged expired sessions");
        }
        Ok(rows)
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn nullable_string(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn scan_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let created_at: String = row.get(3)?;
    let expires_at: String = row.get(4)?;
    Ok(Session {
        token: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        created_at: parse_timestamp(&created_at).map_err(|err| column_error(3, err))?,
        expires_at: parse_timestamp(&expires_at).map_err(|err| column_error(4, err))?,
    })
}
