use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_CACHE_DIR, DEFAULT_MAX_AGE_DAYS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_OUT_DIR, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "COMPAT_INGEST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "ingest.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub max_age_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

impl IngestConfig {
    /// Loads `ingest.toml` (or the file named by `COMPAT_INGEST_CONFIG`).
    /// A missing default file yields the built-in defaults; a missing explicit file is an error.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_path(Path::new(&path)),
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: IngestConfig = toml::from_str(content)?;
        if config.fetch.max_attempts == 0 {
            return Err(IngestError::Config("fetch.max_attempts must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.cache.max_age_days.saturating_mul(86_400))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = IngestConfig::from_toml_str("").unwrap();
        assert_eq!(config.cache.max_age_days, DEFAULT_MAX_AGE_DAYS);
        assert_eq!(config.fetch.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.output.dir, PathBuf::from(DEFAULT_OUT_DIR));
    }

    #[test]
    fn test_partial_sections_override_only_named_fields() {
        let config = IngestConfig::from_toml_str(
            r#"
            [cache]
            max_age_days = 2

            [fetch]
            user_agent = "tester/1.0"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.max_age_days, 2);
        assert_eq!(config.cache.dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.fetch.user_agent, "tester/1.0");
        assert_eq!(config.fetch.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_age(), Duration::from_secs(2 * 86_400));
    }

    #[test]
    fn test_huge_max_age_saturates() {
        let mut config = IngestConfig::from_toml_str("").unwrap();
        config.cache.max_age_days = u64::MAX;
        assert_eq!(config.max_age(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let err = IngestConfig::from_toml_str("[fetch]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }
}
