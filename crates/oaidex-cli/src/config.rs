//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use oaidex_core::{ElasticSettings, HttpTimeouts, RetryPolicy};
use serde::Deserialize;

/// Global configuration for oaidex
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub workers: WorkersConfig,
    pub input: InputConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub endpoint: String,
    pub name: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub username: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub shards: u32,
    pub replicas: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9200".to_string(),
            name: oaidex_oai::DEFAULT_INDEX.to_string(),
            username: None,
            password: std::env::var("OAIDEX_PASSWORD").ok(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            shards: 1,
            replicas: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Batch files processed concurrently
    pub batches: usize,
    pub max_in_flight: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            batches: oaidex_oai::config::default_workers(),
            max_in_flight: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub pattern: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pattern: "*.gz".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./oaidex.toml (current directory)
    /// 2. ~/.config/oaidex/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("oaidex.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "oaidex") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn elastic_settings(&self) -> ElasticSettings {
        ElasticSettings {
            endpoint: self.index.endpoint.clone(),
            username: self.index.username.clone(),
            password: self.index.password.clone(),
            timeouts: HttpTimeouts {
                connect: Duration::from_secs(self.index.connect_timeout_secs),
                request: Duration::from_secs(self.index.request_timeout_secs),
            },
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.index.endpoint, "http://127.0.0.1:9200");
        assert_eq!(config.index.name, "arxiv-papers");
        assert_eq!(config.input.pattern, "*.gz");
        assert!(config.workers.batches >= 1);
        assert_eq!(config.workers.max_in_flight, 8);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay_ms, 1000);
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("OAIDEX_TEST_VAR", "test_value");
        assert_eq!(
            expand_env_var("${OAIDEX_TEST_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("OAIDEX_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[index]
endpoint = "https://search.example.org:9200"
name = "papers"
username = "indexer"
password = "${NONEXISTENT_VAR_12345}"
request_timeout_secs = 60

[workers]
batches = 4
max_in_flight = 16

[input]
pattern = "*.xml"

[retry]
max_retries = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.index.endpoint, "https://search.example.org:9200");
        assert_eq!(config.index.name, "papers");
        assert_eq!(config.index.username.as_deref(), Some("indexer"));
        assert_eq!(config.index.password, None);
        assert_eq!(config.index.connect_timeout_secs, 10);
        assert_eq!(config.workers.batches, 4);
        assert_eq!(config.workers.max_in_flight, 16);
        assert_eq!(config.input.pattern, "*.xml");
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.base_delay_ms, 1000);

        let settings = config.elastic_settings();
        assert_eq!(settings.timeouts.request, Duration::from_secs(60));
        assert_eq!(config.retry_policy().max_retries, 0);
    }

    #[test]
    fn from_file_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/oaidex.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/oaidex.toml"));
    }
}
