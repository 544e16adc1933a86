//! Configuration for the essay grader.
//!
//! Precedence: defaults < YAML config file < `ESSAYGRADER_*` environment
//! overrides. An explicitly named config file must be readable; the default
//! location is optional.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "ESSAYGRADER_DB_PATH";
pub const ENV_BIND: &str = "ESSAYGRADER_BIND";
pub const ENV_LOG_LEVEL: &str = "ESSAYGRADER_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "ESSAYGRADER_LOG_FORMAT";
pub const ENV_GRADING_DELAY_MS: &str = "ESSAYGRADER_GRADING_DELAY_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid environment override {key}: {value:?}")]
    Env { key: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub grading: GradingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            global: GlobalConfig {
                data_dir: home.join(".local/share/essaygrader").display().to_string(),
                config_dir: home.join(".config/essaygrader").display().to_string(),
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            grading: GradingConfig::default(),
        }
    }
}

impl Config {
    /// Effective database path (explicit or derived from data_dir).
    pub fn database_path(&self) -> String {
        if !self.database.path.is_empty() {
            return self.database.path.clone();
        }
        let p: PathBuf = [&self.global.data_dir, "essaygrader.db"].iter().collect();
        p.display().to_string()
    }

    pub fn ensure_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.global.data_dir)?;
        std::fs::create_dir_all(&self.global.config_dir)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Global
        if self.global.data_dir.trim().is_empty() {
            return Err(invalid("global.data_dir is required"));
        }
        if self.global.config_dir.trim().is_empty() {
            return Err(invalid("global.config_dir is required"));
        }

        // Database
        if self.database.busy_timeout_ms < 0 {
            return Err(invalid("database.busy_timeout_ms must be zero or greater"));
        }

        // Logging
        match self.logging.level.to_lowercase().trim() {
            "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(invalid(
                    "logging.level must be one of debug, info, warn, error",
                ))
            }
        }
        match self.logging.format.to_lowercase().trim() {
            "console" | "json" => {}
            _ => return Err(invalid("logging.format must be one of console, json")),
        }

        // Server
        if self.server.bind.trim().is_empty() {
            return Err(invalid("server.bind is required"));
        }
        if self.server.session_cookie.trim().is_empty()
            || self
                .server
                .session_cookie
                .contains(|c: char| c.is_whitespace() || c == ';' || c == '=')
        {
            return Err(invalid(
                "server.session_cookie must be a non-empty cookie name",
            ));
        }
        if self.server.session_ttl.is_zero() {
            return Err(invalid("server.session_ttl must be greater than 0"));
        }

        // Grading
        if self.grading.timeout.is_zero() {
            return Err(invalid("grading.timeout must be greater than 0"));
        }
        if self.grading.max_attempts < 1 {
            return Err(invalid("grading.max_attempts must be at least 1"));
        }
        if self.grading.simulated_delay >= self.grading.timeout {
            return Err(invalid(
                "grading.simulated_delay must be shorter than grading.timeout",
            ));
        }

        Ok(())
    }

    /// Expands `~` in all path-valued fields.
    pub fn expand_paths(&mut self) {
        self.global.data_dir = expand_tilde(&self.global.data_dir);
        self.global.config_dir = expand_tilde(&self.global.config_dir);
        self.database.path = expand_tilde(&self.database.path);
    }

    /// Applies `ESSAYGRADER_*` overrides from `vars`.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(path) = non_empty(vars, ENV_DB_PATH) {
            self.database.path = expand_tilde(path);
        }
        if let Some(bind) = non_empty(vars, ENV_BIND) {
            self.server.bind = bind.to_string();
        }
        if let Some(level) = non_empty(vars, ENV_LOG_LEVEL) {
            self.logging.level = level.to_lowercase();
        }
        if let Some(format) = non_empty(vars, ENV_LOG_FORMAT) {
            self.logging.format = format.to_lowercase();
        }
        if let Some(raw) = non_empty(vars, ENV_GRADING_DELAY_MS) {
            let millis = raw.parse::<u64>().map_err(|_| ConfigError::Env {
                key: ENV_GRADING_DELAY_MS,
                value: raw.to_string(),
            })?;
            self.grading.simulated_delay = Duration::from_millis(millis);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Section configs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub data_dir: String,
    pub config_dir: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub session_cookie: String,
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".into(),
            session_cookie: "essay_session".into(),
            session_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Grading call policy.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    pub simulated_delay: Duration,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            simulated_delay: Duration::from_millis(3000),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    #[serde(default)]
    global: PartialGlobalConfig,
    #[serde(default)]
    database: PartialDatabaseConfig,
    #[serde(default)]
    logging: PartialLoggingConfig,
    #[serde(default)]
    server: PartialServerConfig,
    #[serde(default)]
    grading: PartialGradingConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PartialGlobalConfig {
    #[serde(default)]
    data_dir: String,
    #[serde(default)]
    config_dir: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartialDatabaseConfig {
    #[serde(default)]
    path: String,
    #[serde(default)]
    busy_timeout_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialLoggingConfig {
    #[serde(default)]
    level: String,
    #[serde(default)]
    format: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartialServerConfig {
    #[serde(default)]
    bind: String,
    #[serde(default)]
    session_cookie: String,
    #[serde(default)]
    session_ttl_hours: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialGradingConfig {
    #[serde(default)]
    simulated_delay_ms: Option<u64>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    max_attempts: Option<u32>,
    #[serde(default)]
    retry_backoff_ms: Option<u64>,
}

/// Loads defaults plus an optional YAML file, then validates.
///
/// Returns the config and the file that was used, if any.
pub fn load_config(config_file: Option<&str>) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    load_config_with_env(config_file, &vars)
}

pub fn load_config_with_env(
    config_file: Option<&str>,
    vars: &HashMap<String, String>,
) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let mut cfg = Config::default();

    let explicit = config_file
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(expand_tilde(s)));

    let (path_to_try, required) = match explicit {
        Some(path) => (Some(path), true),
        None => (find_config_file(vars), false),
    };

    let mut used = None;
    if let Some(path) = path_to_try {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let partial: PartialConfig = if text.trim().is_empty() {
                    PartialConfig::default()
                } else {
                    serde_yaml::from_str(&text)?
                };
                apply_partial(&mut cfg, partial);
                used = Some(path);
            }
            Err(source) if required => return Err(ConfigError::Read { path, source }),
            Err(_) => {}
        }
    }

    cfg.apply_env(vars)?;
    cfg.expand_paths();
    cfg.validate()?;
    Ok((cfg, used))
}

fn apply_partial(cfg: &mut Config, partial: PartialConfig) {
    if !partial.global.data_dir.trim().is_empty() {
        cfg.global.data_dir = partial.global.data_dir.trim().to_string();
    }
    if !partial.global.config_dir.trim().is_empty() {
        cfg.global.config_dir = partial.global.config_dir.trim().to_string();
    }
    if !partial.database.path.trim().is_empty() {
        cfg.database.path = partial.database.path.trim().to_string();
    }
    if let Some(ms) = partial.database.busy_timeout_ms {
        cfg.database.busy_timeout_ms = ms;
    }
    if !partial.logging.level.trim().is_empty() {
        cfg.logging.level = partial.logging.level.trim().to_lowercase();
    }
    if !partial.logging.format.trim().is_empty() {
        cfg.logging.format = partial.logging.format.trim().to_lowercase();
    }
    if !partial.server.bind.trim().is_empty() {
        cfg.server.bind = partial.server.bind.trim().to_string();
    }
    if !partial.server.session_cookie.trim().is_empty() {
        cfg.server.session_cookie = partial.server.session_cookie.trim().to_string();
    }
    if let Some(hours) = partial.server.session_ttl_hours {
        cfg.server.session_ttl = Duration::from_secs(hours.saturating_mul(3600));
    }
    if let Some(ms) = partial.grading.simulated_delay_ms {
        cfg.grading.simulated_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = partial.grading.timeout_ms {
        cfg.grading.timeout = Duration::from_millis(ms);
    }
    if let Some(attempts) = partial.grading.max_attempts {
        cfg.grading.max_attempts = attempts;
    }
    if let Some(ms) = partial.grading.retry_backoff_ms {
        cfg.grading.retry_backoff = Duration::from_millis(ms);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path.is_empty() {
        return path.to_string();
    }
    if path == "~" {
        return home_dir().display().to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest).display().to_string();
    }
    path.to_string()
}

/// First existing `config.yaml` in the standard locations.
fn find_config_file(vars: &HashMap<String, String>) -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(xdg) = non_empty(vars, "XDG_CONFIG_HOME") {
        dirs.push(Path::new(xdg).join("essaygrader"));
    }
    let home = home_dir();
    if home.as_os_str() != "" {
        dirs.push(home.join(".config/essaygrader"));
    }

    dirs.into_iter()
        .map(|dir| dir.join("config.yaml"))
        .find(|candidate| candidate.is_file())
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .ok()
        .filter(|home| !home.trim().is_empty())
        .map_or_else(|| PathBuf::from("/"), PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn expect_invalid(cfg: &Config) -> String {
        match cfg.validate() {
            Ok(()) => panic!("expected error"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "console");
        assert_eq!(cfg.database.busy_timeout_ms, 5000);
        assert_eq!(cfg.grading.simulated_delay, Duration::from_secs(3));
        assert_eq!(cfg.server.session_cookie, "essay_session");
    }

    #[test]
    fn config_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn database_path_derived() {
        let cfg = Config::default();
        assert!(cfg.database_path().ends_with("essaygrader.db"));
    }

    #[test]
    fn validate_rejects_bad_log_level_and_format() {
        let mut cfg = Config::default();
        cfg.logging.level = "bogus".into();
        assert!(expect_invalid(&cfg).contains("logging.level"));

        let mut cfg = Config::default();
        cfg.logging.format = "xml".into();
        assert!(expect_invalid(&cfg).contains("logging.format"));
    }

    #[test]
    fn validate_grading_bounds() {
        let mut cfg = Config::default();
        cfg.grading.max_attempts = 0;
        assert!(expect_invalid(&cfg).contains("max_attempts"));

        let mut cfg = Config::default();
        cfg.grading.simulated_delay = Duration::from_secs(60);
        assert!(expect_invalid(&cfg).contains("simulated_delay"));
    }

    #[test]
    fn validate_cookie_name() {
        let mut cfg = Config::default();
        cfg.server.session_cookie = "bad name".into();
        assert!(expect_invalid(&cfg).contains("session_cookie"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = load_config_with_env(
            Some("/definitely/not/here/config.yaml"),
            &HashMap::new(),
        );
        assert!(matches!(result, Err(ConfigError::Read { .. })), "{result:?}");
    }

    #[test]
    fn yaml_file_and_env_layer_over_defaults() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(file) => file,
            Err(err) => panic!("tempfile: {err}"),
        };
        let yaml = "database:\n  path: /tmp/essays.db\nlogging:\n  level: DEBUG\ngrading:\n  simulated_delay_ms: 10\n  max_attempts: 5\nserver:\n  session_ttl_hours: 2\n";
        if let Err(err) = file.write_all(yaml.as_bytes()) {
            panic!("write: {err}");
        }
        let path = file.path().display().to_string();

        let mut vars = HashMap::new();
        vars.insert(ENV_BIND.to_string(), "0.0.0.0:9000".to_string());
        vars.insert(ENV_LOG_FORMAT.to_string(), "json".to_string());

        let (cfg, used) = match load_config_with_env(Some(&path), &vars) {
            Ok(value) => value,
            Err(err) => panic!("load: {err}"),
        };
        assert_eq!(used.as_deref(), Some(file.path()));
        assert_eq!(cfg.database_path(), "/tmp/essays.db");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, "json");
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.server.session_ttl, Duration::from_secs(7200));
        assert_eq!(cfg.grading.simulated_delay, Duration::from_millis(10));
        assert_eq!(cfg.grading.max_attempts, 5);
    }

    #[test]
    fn env_delay_must_be_numeric() {
        let mut cfg = Config::default();
        let mut vars = HashMap::new();
        vars.insert(ENV_GRADING_DELAY_MS.to_string(), "soon".to_string());
        let result = cfg.apply_env(&vars);
        assert!(matches!(result, Err(ConfigError::Env { .. })), "{result:?}");
    }

    #[test]
    fn expand_tilde_works() {
        assert_eq!(expand_tilde(""), "");
        assert!(!expand_tilde("~").contains('~'));
        let expanded = expand_tilde("~/essays/db");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("essays/db"));
        assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
    }
}
