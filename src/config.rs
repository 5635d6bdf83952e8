use crate::datasource::subgraph::DEFAULT_SUBGRAPH_URL;
use crate::format::NumberLocale;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// SQLite file; `None` runs the store local-only.
    pub database_path: Option<String>,
    pub snapshot_path: Option<String>,
    pub subgraph_url: String,
    pub lookup_timeout: Duration,
    /// Serve fixture data when the subgraph cannot be reached.
    pub simulated_fallback: bool,
    pub number_locale: NumberLocale,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = non_empty(&env_map, "DATABASE_PATH");
        let snapshot_path = non_empty(&env_map, "SNAPSHOT_PATH");

        let subgraph_url = non_empty(&env_map, "SUBGRAPH_URL")
            .unwrap_or_else(|| DEFAULT_SUBGRAPH_URL.to_string());
        if !subgraph_url.starts_with("http://") && !subgraph_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SUBGRAPH_URL".to_string(),
                format!("must be an http(s) URL, got {}", subgraph_url),
            ));
        }

        let lookup_timeout_ms = env_map
            .get("LOOKUP_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("10000")
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "LOOKUP_TIMEOUT_MS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let simulated_fallback = match env_map
            .get("SIMULATED_FALLBACK")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SIMULATED_FALLBACK".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let number_locale = env_map
            .get("NUMBER_LOCALE")
            .map(|s| s.as_str())
            .unwrap_or("en-US")
            .parse::<NumberLocale>()
            .map_err(|e| ConfigError::InvalidValue("NUMBER_LOCALE".to_string(), e))?;

        Ok(Config {
            port,
            database_path,
            snapshot_path,
            subgraph_url,
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),
            simulated_fallback,
            number_locale,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            database_path: None,
            snapshot_path: None,
            subgraph_url: DEFAULT_SUBGRAPH_URL.to_string(),
            lookup_timeout: Duration::from_millis(10_000),
            simulated_fallback: true,
            number_locale: NumberLocale::EnUs,
        }
    }
}

fn non_empty(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
