use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration, Utc};
use essay_db::session_repository::SessionRepository;
use essay_db::{Config, Db, DbError};

fn temp_db_path(prefix: &str) -> PathBuf {
    static UNIQUE_SUFFIX: AtomicU64 = AtomicU64::new(0);
    let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(value) => value.as_nanos(),
        Err(_) => 0,
    };
    let suffix = UNIQUE_SUFFIX.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "essay-db-sessions-{prefix}-{nanos}-{}-{suffix}.sqlite",
        std::process::id(),
    ))
}

fn setup_db(prefix: &str) -> (Db, PathBuf) {
    let path = temp_db_path(prefix);
    let mut db = match Db::open(Config::new(&path)) {
        Ok(value) => value,
        Err(err) => panic!("open db failed: {err}"),
    };
    if let Err(err) = db.migrate_up() {
        panic!("migrate_up failed: {err}");
    }
    (db, path)
}

#[test]
fn create_then_resolve_returns_identity() {
    let (db, path) = setup_db("resolve");
    let repo = SessionRepository::new(&db);

    let session = match repo.create("user-1", Some("writer@example.com"), Duration::hours(1)) {
        Ok(value) => value,
        Err(err) => panic!("create failed: {err}"),
    };
    assert_eq!(session.token.len(), 64);

    let identity = match repo.resolve(&session.token) {
        Ok(Some(identity)) => identity,
        Ok(None) => panic!("expected identity"),
        Err(err) => panic!("resolve failed: {err}"),
    };
    assert_eq!(identity.id, "user-1");
    assert_eq!(identity.display_name(), "writer@example.com");

    let _ = std::fs::remove_file(path);
}

#[test]
fn unknown_and_blank_tokens_resolve_to_none() {
    let (db, path) = setup_db("unknown");
    let repo = SessionRepository::new(&db);

    assert!(matches!(repo.resolve("deadbeef"), Ok(None)));
    assert!(matches!(repo.resolve("  "), Ok(None)));

    let _ = std::fs::remove_file(path);
}

#[test]
fn expired_session_does_not_resolve_and_is_purged() {
    let (db, path) = setup_db("expired");
    let repo = SessionRepository::new(&db);

    let short = match repo.create("user-2", None, Duration::minutes(5)) {
        Ok(value) => value,
        Err(err) => panic!("create failed: {err}"),
    };
    let long = match repo.create("user-3", None, Duration::days(2)) {
        Ok(value) => value,
        Err(err) => panic!("create failed: {err}"),
    };

    let later = Utc::now() + Duration::hours(1);
    assert!(matches!(repo.resolve_at(&short.token, later), Ok(None)));
    assert!(matches!(repo.resolve_at(&long.token, later), Ok(Some(_))));

    match repo.purge_expired(later) {
        Ok(removed) => assert_eq!(removed, 1),
        Err(err) => panic!("purge failed: {err}"),
    }
    assert!(matches!(repo.get(&short.token), Err(DbError::SessionNotFound)));
    assert!(repo.get(&long.token).is_ok());

    let _ = std::fs::remove_file(path);
}

#[test]
fn revoke_removes_session_once() {
    let (db, path) = setup_db("revoke");
    let repo = SessionRepository::new(&db);

    let session = match repo.create("user-4", None, Duration::hours(1)) {
        Ok(value) => value,
        Err(err) => panic!("create failed: {err}"),
    };
    if let Err(err) = repo.revoke(&session.token) {
        panic!("revoke failed: {err}");
    }
    assert!(matches!(repo.resolve(&session.token), Ok(None)));
    assert!(matches!(
        repo.revoke(&session.token),
        Err(DbError::SessionNotFound)
    ));

    let _ = std::fs::remove_file(path);
}

#[test]
fn create_validates_inputs() {
    let (db, path) = setup_db("validate");
    let repo = SessionRepository::new(&db);

    assert!(matches!(
        repo.create(" ", None, Duration::hours(1)),
        Err(DbError::Validation(_))
    ));
    assert!(matches!(
        repo.create("user-5", None, Duration::zero()),
        Err(DbError::Validation(_))
    ));
    assert!(matches!(
        repo.create("user-5", None, Duration::days(365 * 1_000_000)),
        Err(DbError::Validation(_))
    ));

    let _ = std::fs::remove_file(path);
}
