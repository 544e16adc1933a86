use essay_db::admin::run_for_test;
use essay_db::session_repository::SessionRepository;
use essay_db::Db;

fn memory_db() -> Db {
    match Db::open_in_memory() {
        Ok(value) => value,
        Err(err) => panic!("open in-memory db failed: {err}"),
    }
}

#[test]
fn migrate_commands_report_progress() {
    let mut db = memory_db();

    let out = run_for_test(&["migrate", "up"], &mut db);
    assert_eq!(out.exit_code, 0, "stderr={}", out.stderr);
    assert!(out.stdout.contains("Applied 2 migration(s)"), "{}", out.stdout);

    let out = run_for_test(&["migrate", "status"], &mut db);
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout.matches("applied").count(), 2, "{}", out.stdout);
    assert!(out.stdout.contains("create essays"));

    let out = run_for_test(&["migrate", "down"], &mut db);
    assert_eq!(out.exit_code, 0);
    assert!(out.stdout.contains("schema version 1"), "{}", out.stdout);
}

#[test]
fn session_create_prints_a_resolvable_token() {
    let mut db = memory_db();
    let _ = run_for_test(&["migrate", "up"], &mut db);

    let out = run_for_test(
        &["session", "create", "user-9", "--email", "nine@example.com"],
        &mut db,
    );
    assert_eq!(out.exit_code, 0, "stderr={}", out.stderr);
    let token = out.stdout.trim().to_string();
    assert_eq!(token.len(), 64);

    let identity = match SessionRepository::new(&db).resolve(&token) {
        Ok(Some(identity)) => identity,
        Ok(None) => panic!("token did not resolve"),
        Err(err) => panic!("resolve failed: {err}"),
    };
    assert_eq!(identity.email, "nine@example.com");

    let out = run_for_test(&["session", "revoke", &token], &mut db);
    assert_eq!(out.exit_code, 0);
    let out = run_for_test(&["session", "revoke", &token], &mut db);
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("session not found"), "{}", out.stderr);
}

#[test]
fn session_create_rejects_huge_ttl_without_crashing() {
    let mut db = memory_db();
    let _ = run_for_test(&["migrate", "up"], &mut db);

    let out = run_for_test(
        &["session", "create", "u1", "--ttl-hours", "1000000000000"],
        &mut db,
    );
    assert_ne!(out.exit_code, 0);
    assert!(out.stderr.contains("--ttl-hours"), "{}", out.stderr);
    assert!(out.stdout.is_empty(), "{}", out.stdout);
}

#[test]
fn usage_errors_exit_with_two() {
    let mut db = memory_db();
    let out = run_for_test(&["session", "create"], &mut db);
    assert_eq!(out.exit_code, 2);
    assert!(out.stderr.contains("requires a user id"));

    let out = run_for_test(&[], &mut db);
    assert_eq!(out.exit_code, 0);
    assert!(out.stdout.contains("Usage: essay-db"));
}
