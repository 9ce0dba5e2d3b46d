use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
    pub anthropic_api_key: String,
    /// Base URL of an OpenAI-compatible embeddings API. The local hashing
    /// embedder is used when unset.
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub history_turns: usize,
    pub refresh_workers: usize,
    pub refresh_queue_capacity: usize,
    pub refresh_max_attempts: u32,
    pub default_num_results: usize,
    /// Chat sessions with no activity for this long are dropped.
    pub session_idle_ttl: Duration,
    pub housekeeping_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            data_dir: PathBuf::from(optional_env("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_api_url: optional_env("EMBEDDING_API_URL"),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            embedding_dimensions: parse_env("EMBEDDING_DIMENSIONS", 256)?,
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL_SECS", 300)?),
            cache_max_entries: parse_env("CACHE_MAX_ENTRIES", 1024)?,
            history_turns: parse_env("HISTORY_TURNS", 6)?,
            refresh_workers: parse_env("REFRESH_WORKERS", 2)?,
            refresh_queue_capacity: parse_env("REFRESH_QUEUE_CAPACITY", 256)?,
            refresh_max_attempts: parse_env("REFRESH_MAX_ATTEMPTS", 3)?,
            default_num_results: parse_env("DEFAULT_NUM_RESULTS", 3)?,
            session_idle_ttl: Duration::from_secs(parse_env("SESSION_IDLE_SECS", 3600)?),
            housekeeping_interval: Duration::from_secs(
                parse_env::<u64>("HOUSEKEEPING_INTERVAL_SECS", 60)?.max(1),
            ),
        })
    }

    pub fn jobs_path(&self) -> PathBuf {
        self.data_dir.join("jobs.json")
    }

    pub fn candidates_dir(&self) -> PathBuf {
        self.data_dir.join("candidates")
    }
}

#[cfg(test)]
impl Config {
    /// Defaults for in-process router tests; never reads the environment.
    pub fn for_tests() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            port: 0,
            rust_log: "debug".to_string(),
            anthropic_api_key: "test-key".to_string(),
            embedding_api_url: None,
            embedding_api_key: None,
            embedding_model: "test".to_string(),
            embedding_dimensions: 256,
            cache_ttl: Duration::from_secs(60),
            cache_max_entries: 64,
            history_turns: 6,
            refresh_workers: 1,
            refresh_queue_capacity: 16,
            refresh_max_attempts: 1,
            default_num_results: 3,
            session_idle_ttl: Duration::from_secs(3600),
            housekeeping_interval: Duration::from_secs(60),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().with_context(|| {
        format!(
            "{key} must be a valid {}, got '{raw}'",
            std::any::type_name::<T>()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_numbers() {
        let port: u16 = parse_value("PORT", "9000").unwrap();
        assert_eq!(port, 9000);
        let turns: usize = parse_value("HISTORY_TURNS", "12").unwrap();
        assert_eq!(turns, 12);
    }

    #[test]
    fn test_parse_value_names_the_variable() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(parse_value::<u16>("PORT", "70000").is_err());
    }

    #[test]
    fn test_missing_optional_uses_default() {
        let value: usize = parse_env("JOBMATCH_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
        assert_eq!(optional_env("JOBMATCH_TEST_SURELY_UNSET_VAR"), None);
    }
}
