//! Entry point for the essay grader web server (`essay-web`).

use std::sync::Arc;

use essay_core::config::{self, Config};
use essay_db::Db;
use essay_grader::simulated::SimulatedGrader;
use essay_web::server;
use essay_web::state::AppState;
use essay_web::telemetry;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
struct Args {
    config_file: Option<String>,
    bind: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config_file = Some(iter.next().ok_or("--config requires a value")?);
            }
            "--bind" => {
                args.bind = Some(iter.next().ok_or("--bind requires a value")?);
            }
            "-h" | "--help" => {
                println!("Usage: essay-web [--config FILE] [--bind ADDR]");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn load(args: &Args) -> Result<Config, String> {
    let (mut cfg, source) =
        config::load_config(args.config_file.as_deref()).map_err(|err| err.to_string())?;
    if let Some(bind) = &args.bind {
        cfg.server.bind = bind.clone();
    }
    if let Some(path) = source {
        eprintln!("essay-web: using config {}", path.display());
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("essay-web: {message}");
            std::process::exit(2);
        }
    };
    let cfg = match load(&args) {
        Ok(cfg) => cfg,
        Err(message) => {
            eprintln!("essay-web: {message}");
            std::process::exit(1);
        }
    };

    if let Err(err) = telemetry::init_tracing(&cfg.logging) {
        eprintln!("essay-web: tracing already initialized: {err}");
    }
    if let Err(err) = cfg.ensure_directories() {
        warn!(error = %err, "failed to create directories");
    }

    if let Err(message) = run(cfg).await {
        error!("{message}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<(), String> {
    let mut db = Db::open(essay_db::Config::from_app_config(&cfg))
        .map_err(|err| format!("open database: {err}"))?;
    let applied = db
        .migrate_up()
        .map_err(|err| format!("migrate database: {err}"))?;
    info!(
        path = %cfg.database_path(),
        applied,
        "database ready"
    );

    let grader = Arc::new(SimulatedGrader::new(cfg.grading.simulated_delay));
    let state = AppState::new(db, grader, &cfg);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .map_err(|err| format!("bind {}: {err}", cfg.server.bind))?;
    server::serve(listener, state)
        .await
        .map_err(|err| format!("server error: {err}"))?;
    info!("essay-web stopped");
    Ok(())
}
