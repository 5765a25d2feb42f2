use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "rehab-goals";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Status poll interval: the AI job is checked every 3 seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// 20 attempts × 3s = 60s budget before the poller gives up.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 20;

/// Timeout for the request that hands an assessment to the AI job runner.
pub const DEFAULT_AI_TRIGGER_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

const ENV_DB_PATH: &str = "REHAB_GOALS_DB_PATH";
const ENV_BIND_ADDR: &str = "REHAB_GOALS_BIND_ADDR";
const ENV_AI_JOB_URL: &str = "REHAB_GOALS_AI_JOB_URL";
const ENV_POLL_INTERVAL: &str = "REHAB_GOALS_POLL_INTERVAL_SECS";
const ENV_POLL_MAX_ATTEMPTS: &str = "REHAB_GOALS_POLL_MAX_ATTEMPTS";

/// Get the application data directory (~/RehabGoals/).
/// Falls back to the working directory when no home is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("RehabGoals")
}

/// Default SQLite database location.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("rehab_goals.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "rehab_goals=info,tower_http=warn"
}

/// Runtime configuration, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Endpoint of the external AI job runner. `None` disables triggering.
    pub ai_job_url: Option<String>,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            ai_job_url: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// Unparseable values keep their default and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let db_path = lookup(ENV_DB_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = parse_or(lookup(ENV_BIND_ADDR), ENV_BIND_ADDR, defaults.bind_addr);

        let ai_job_url = lookup(ENV_AI_JOB_URL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let interval_secs: u64 =
            parse_or(lookup(ENV_POLL_INTERVAL), ENV_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_SECS);
        let poll_max_attempts: u32 = parse_or(
            lookup(ENV_POLL_MAX_ATTEMPTS),
            ENV_POLL_MAX_ATTEMPTS,
            DEFAULT_POLL_MAX_ATTEMPTS,
        );

        Self {
            db_path,
            bind_addr,
            ai_job_url,
            poll_interval: Duration::from_secs(interval_secs.max(1)),
            poll_max_attempts: poll_max_attempts.max(1),
        }
    }
}

fn parse_or<T: FromStr + Copy>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value = %value, "Invalid config value, using default");
                default
            }
        },
    }
}
