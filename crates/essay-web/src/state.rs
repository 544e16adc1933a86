//! Shared application state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use essay_core::config::Config;
use essay_core::models::{EssayRecord, NewEssay};
use essay_core::session::{Identity, SessionContext};
use essay_core::store::{RecordStore, StoreError};
use essay_db::essay_repository::{store_error, EssayRepository};
use essay_db::session_repository::SessionRepository;
use essay_db::{Db, DbError};
use essay_grader::flow::GradingPolicy;
use essay_grader::service::GradingService;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// SQLite handle shared by all requests.
///
/// Every method locks for the duration of one synchronous call, so the guard
/// never lives across an `.await`.
#[derive(Clone)]
pub struct SharedDb {
    inner: Arc<Mutex<Db>>,
}

impl SharedDb {
    pub fn new(db: Db) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&Db) -> T) -> T {
        match self.inner.lock() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    pub fn resolve_session(&self, token: &str) -> Result<Option<Identity>, DbError> {
        self.with(|db| SessionRepository::new(db).resolve(token))
    }

    pub fn revoke_session(&self, token: &str) -> Result<(), DbError> {
        self.with(|db| SessionRepository::new(db).revoke(token))
    }
}

impl RecordStore for SharedDb {
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EssayRecord>, StoreError> {
        self.with(|db| EssayRepository::new(db).list_by_owner(owner_id))
            .map_err(store_error)
    }

    fn get_for_owner(&self, owner_id: &str, id: &str) -> Result<EssayRecord, StoreError> {
        self.with(|db| EssayRepository::new(db).get_for_owner(owner_id, id))
            .map_err(store_error)
    }

    fn insert(&self, essay: NewEssay) -> Result<EssayRecord, StoreError> {
        self.with(|db| EssayRepository::new(db).create(essay))
            .map_err(store_error)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub grader: Arc<dyn GradingService>,
    pub policy: GradingPolicy,
    pub cookie_name: String,
    pub session_ttl: Duration,
    /// Cancelled on server shutdown; in-flight grading derives child tokens.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: Db, grader: Arc<dyn GradingService>, cfg: &Config) -> Self {
        Self {
            db: SharedDb::new(db),
            grader,
            policy: GradingPolicy::from_config(&cfg.grading),
            cookie_name: cfg.server.session_cookie.clone(),
            session_ttl: cfg.server.session_ttl,
            shutdown: CancellationToken::new(),
        }
    }

    /// Session context for a request token; lookup failures count as signed out.
    pub fn session_for(&self, token: Option<&str>) -> SessionContext {
        let Some(token) = token else {
            return SessionContext::anonymous();
        };
        match self.db.resolve_session(token) {
            Ok(identity) => SessionContext::from(identity),
            Err(err) => {
                error!(error = %err, "session lookup failed");
                SessionContext::anonymous()
            }
        }
    }
}
