//! `essay-db` admin command: migrations and session tokens.

use std::io::Write;

use chrono::{Duration, Utc};
use essay_core::config;

use crate::session_repository::SessionRepository;
use crate::{Config, Db};

const DEFAULT_TTL_HOURS: i64 = 24 * 7;
const MAX_TTL_HOURS: i64 = 24 * 366 * 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Subcommand {
    Help,
    MigrateUp,
    MigrateDown { steps: i32 },
    MigrateStatus,
    SessionCreate {
        user_id: String,
        email: Option<String>,
        ttl_hours: i64,
    },
    SessionRevoke { token: String },
    SessionPurge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GlobalFlags {
    config_file: Option<String>,
    db_path: Option<String>,
}

/// Entry point for the binary: resolves the database from config, then runs.
pub fn run(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    let (flags, rest) = match split_global_flags(args) {
        Ok(value) => value,
        Err(message) => {
            let _ = writeln!(stderr, "{message}");
            return 2;
        }
    };

    let mut db = match open_db(&flags) {
        Ok(db) => db,
        Err(message) => {
            let _ = writeln!(stderr, "{message}");
            return 1;
        }
    };
    run_with_db(&rest, &mut db, stdout, stderr)
}

pub fn run_for_test(args: &[&str], db: &mut Db) -> CommandOutput {
    let owned_args: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = run_with_db(&owned_args, db, &mut stdout, &mut stderr);
    CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
    }
}

pub fn run_with_db(
    args: &[String],
    db: &mut Db,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    let subcommand = match parse_args(args) {
        Ok(subcommand) => subcommand,
        Err(message) => {
            let _ = writeln!(stderr, "{message}");
            return 2;
        }
    };
    match execute(subcommand, db, stdout) {
        Ok(()) => 0,
        Err(message) => {
            let _ = writeln!(stderr, "{message}");
            1
        }
    }
}

fn open_db(flags: &GlobalFlags) -> Result<Db, String> {
    let db_config = match &flags.db_path {
        Some(path) => Config::new(config::expand_tilde(path)),
        None => {
            let (cfg, _) = config::load_config(flags.config_file.as_deref())
                .map_err(|err| format!("error: {err}"))?;
            Config::from_app_config(&cfg)
        }
    };
    Db::open(db_config).map_err(|err| format!("error: {err}"))
}

fn execute(subcommand: Subcommand, db: &mut Db, stdout: &mut dyn Write) -> Result<(), String> {
    match subcommand {
        Subcommand::Help => write_help(stdout).map_err(|err| err.to_string()),
        Subcommand::MigrateUp => {
            let applied = db.migrate_up().map_err(|err| format!("error: {err}"))?;
            let version = db.schema_version().map_err(|err| format!("error: {err}"))?;
            writeln!(stdout, "Applied {applied} migration(s); schema version {version}")
                .map_err(|err| err.to_string())
        }
        Subcommand::MigrateDown { steps } => {
            let rolled_back = db
                .migrate_down(steps)
                .map_err(|err| format!("error: {err}"))?;
            let version = db.schema_version().map_err(|err| format!("error: {err}"))?;
            writeln!(
                stdout,
                "Rolled back {rolled_back} migration(s); schema version {version}"
            )
            .map_err(|err| err.to_string())
        }
        Subcommand::MigrateStatus => {
            let statuses = db
                .migration_status()
                .map_err(|err| format!("error: {err}"))?;
            for status in statuses {
                let state = if status.applied { "applied" } else { "pending" };
                writeln!(
                    stdout,
                    "{:03}  {:<8} {:<20} {}",
                    status.version, state, status.applied_at, status.description
                )
                .map_err(|err| err.to_string())?;
            }
            Ok(())
        }
        Subcommand::SessionCreate {
            user_id,
            email,
            ttl_hours,
        } => {
            let ttl = Duration::try_hours(ttl_hours)
                .ok_or_else(|| format!("error: --ttl-hours {ttl_hours} is out of range"))?;
            let session = SessionRepository::new(db)
                .create(&user_id, email.as_deref(), ttl)
                .map_err(|err| format!("error: {err}"))?;
            writeln!(stdout, "{}", session.token).map_err(|err| err.to_string())
        }
        Subcommand::SessionRevoke { token } => {
            SessionRepository::new(db)
                .revoke(&token)
                .map_err(|err| format!("error: {err}"))?;
            writeln!(stdout, "Session revoked").map_err(|err| err.to_string())
        }
        Subcommand::SessionPurge => {
            let removed = SessionRepository::new(db)
                .purge_expired(Utc::now())
                .map_err(|err| format!("error: {err}"))?;
            writeln!(stdout, "Removed {removed} expired session(s)").map_err(|err| err.to_string())
        }
    }
}

fn split_global_flags(args: &[String]) -> Result<(GlobalFlags, Vec<String>), String> {
    let mut flags = GlobalFlags::default();
    let mut rest = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        match args[idx].as_str() {
            "--config" => {
                flags.config_file = Some(flag_value(args, idx, "--config")?);
                idx += 2;
            }
            "--db" => {
                flags.db_path = Some(flag_value(args, idx, "--db")?);
                idx += 2;
            }
            other => {
                rest.push(other.to_string());
                idx += 1;
            }
        }
    }
    Ok((flags, rest))
}

fn parse_args(args: &[String]) -> Result<Subcommand, String> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    match words.as_slice() {
        [] | ["help"] | ["-h"] | ["--help"] => Ok(Subcommand::Help),
        ["migrate", "up"] => Ok(Subcommand::MigrateUp),
        ["migrate", "down"] => Ok(Subcommand::MigrateDown { steps: 1 }),
        ["migrate", "down", steps] => {
            let steps: i32 = steps
                .parse()
                .map_err(|_| format!("error: invalid step count {steps:?}"))?;
            if steps <= 0 {
                return Err("error: step count must be positive".to_string());
            }
            Ok(Subcommand::MigrateDown { steps })
        }
        ["migrate", "status"] => Ok(Subcommand::MigrateStatus),
        ["migrate", other, ..] => Err(format!("error: unknown migrate subcommand: {other}")),
        ["session", "create", tail @ ..] => parse_session_create(tail),
        ["session", "revoke", token] => Ok(Subcommand::SessionRevoke {
            token: (*token).to_string(),
        }),
        ["session", "revoke"] => Err("error: session revoke requires a token".to_string()),
        ["session", "purge"] => Ok(Subcommand::SessionPurge),
        ["session", other, ..] => Err(format!("error: unknown session subcommand: {other}")),
        [other, ..] => Err(format!("error: unknown command: {other}")),
    }
}

fn parse_session_create(args: &[&str]) -> Result<Subcommand, String> {
    let mut user_id: Option<String> = None;
    let mut email = None;
    let mut ttl_hours = DEFAULT_TTL_HOURS;

    let mut idx = 0;
    while idx < args.len() {
        match args[idx] {
            "--email" => {
                let value = args
                    .get(idx + 1)
                    .ok_or_else(|| "error: --email requires a value".to_string())?;
                email = Some((*value).to_string());
                idx += 2;
            }
            "--ttl-hours" => {
                let value = args
                    .get(idx + 1)
                    .ok_or_else(|| "error: --ttl-hours requires a value".to_string())?;
                ttl_hours = value
                    .parse()
                    .map_err(|_| format!("error: invalid --ttl-hours {value:?}"))?;
                if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
                    return Err(format!(
                        "error: --ttl-hours must be between 1 and {MAX_TTL_HOURS}"
                    ));
                }
                idx += 2;
            }
            flag if flag.starts_with('-') => {
                return Err(format!("error: unknown flag for session create: {flag}"));
            }
            value => {
                if user_id.is_some() {
                    return Err(format!("error: unexpected argument: {value}"));
                }
                user_id = Some(value.to_string());
                idx += 1;
            }
        }
    }

    let user_id = user_id.ok_or_else(|| "error: session create requires a user id".to_string())?;
    Ok(Subcommand::SessionCreate {
        user_id,
        email,
        ttl_hours,
    })
}

fn flag_value(args: &[String], idx: usize, name: &str) -> Result<String, String> {
    args.get(idx + 1)
        .cloned()
        .ok_or_else(|| format!("error: {name} requires a value"))
}

fn write_help(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Usage: essay-db [--config FILE] [--db PATH] <command>")?;
    writeln!(out)?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  migrate up                     Apply pending migrations")?;
    writeln!(out, "  migrate down [N]               Roll back N migrations (default 1)")?;
    writeln!(out, "  migrate status                 Show applied and pending migrations")?;
    writeln!(out, "  session create <user-id>       Issue a session token")?;
    writeln!(out, "      --email <email>            Email shown in page headers")?;
    writeln!(out, "      --ttl-hours <hours>        Token lifetime (default 168)")?;
    writeln!(out, "  session revoke <token>         Delete a session")?;
    writeln!(out, "  session purge                  Delete expired sessions")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn parses_migrate_down_with_default_steps() {
        assert_eq!(
            parse_args(&args(&["migrate", "down"])),
            Ok(Subcommand::MigrateDown { steps: 1 })
        );
        assert_eq!(
            parse_args(&args(&["migrate", "down", "2"])),
            Ok(Subcommand::MigrateDown { steps: 2 })
        );
        assert!(parse_args(&args(&["migrate", "down", "0"])).is_err());
    }

    #[test]
    fn parses_session_create_flags() {
        let parsed = parse_args(&args(&[
            "session",
            "create",
            "user-7",
            "--email",
            "u7@example.com",
            "--ttl-hours",
            "2",
        ]));
        assert_eq!(
            parsed,
            Ok(Subcommand::SessionCreate {
                user_id: "user-7".into(),
                email: Some("u7@example.com".into()),
                ttl_hours: 2,
            })
        );
        assert!(parse_args(&args(&["session", "create"])).is_err());
        assert!(parse_args(&args(&["session", "create", "u", "--ttl-hours", "-1"])).is_err());
        let too_long = (MAX_TTL_HOURS + 1).to_string();
        assert!(parse_args(&args(&["session", "create", "u", "--ttl-hours", &too_long])).is_err());
    }

    #[test]
    fn global_flags_are_split_out() {
        let (flags, rest) = match split_global_flags(&args(&[
            "--db",
            "/tmp/x.db",
            "migrate",
            "status",
        ])) {
            Ok(value) => value,
            Err(err) => panic!("split: {err}"),
        };
        assert_eq!(flags.db_path.as_deref(), Some("/tmp/x.db"));
        assert_eq!(rest, args(&["migrate", "status"]));
        assert!(split_global_flags(&args(&["--config"])).is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["migrate", "sideways"])).is_err());
        assert_eq!(parse_args(&[]), Ok(Subcommand::Help));
    }
}
