//! Configuration management

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Environment variable holding the upstream client id
pub const CLIENT_ID_VAR: &str = "CBI_CLIENT_ID";
/// Environment variable holding the upstream client secret
pub const CLIENT_SECRET_VAR: &str = "CBI_CLIENT_SECRET";
/// Environment variable overriding the trends query
pub const TRENDS_QUERY_VAR: &str = "CBI_TOP_TRENDS_QUERY";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before resolving credentials.
    /// Loaded in order; variables already set in the process win.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream CB Insights API configuration
    pub upstream: UpstreamConfig,
    /// Upstream credentials (environment variables take precedence)
    pub credentials: CredentialsConfig,
    /// Trends fetch configuration
    pub trends: TrendsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_files: vec![".env.local".to_string(), ".env".to_string()],
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            credentials: CredentialsConfig::default(),
            trends: TrendsConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Upstream CB Insights API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API
    pub base_url: String,
    /// Timeout for the identity exchange
    #[serde(with = "humantime_serde")]
    pub auth_timeout: Duration,
    /// Timeout for chat requests
    #[serde(with = "humantime_serde")]
    pub chat_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cbinsights.com/v2".to_string(),
            auth_timeout: Duration::from_secs(10),
            chat_timeout: Duration::from_secs(60),
        }
    }
}

impl UpstreamConfig {
    /// URL of the identity endpoint
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.base_url.trim_end_matches('/'))
    }

    /// URL of the chat endpoint
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/chatcbi", self.base_url.trim_end_matches('/'))
    }
}

/// Upstream credentials from the config file.
///
/// The `CBI_CLIENT_ID` / `CBI_CLIENT_SECRET` environment variables take
/// precedence; see [`Config::resolve_credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Client id
    pub client_id: Option<String>,
    /// Client secret
    pub client_secret: Option<String>,
}

/// Resolved upstream credentials, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Client id sent to the identity endpoint
    pub client_id: String,
    /// Client secret sent to the identity endpoint
    pub client_secret: String,
}

/// Trends fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// Question sent upstream by the batch fetch
    pub query: String,
    /// Maximum number of trends kept (first N in output order)
    pub max_trends: Option<usize>,
    /// Snapshot file path for static front-end consumption
    pub output: PathBuf,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            query: "Get an ordered list of the latest top tech trends from the \
                    World Economic forum. Show the output in the format: \
                    <output>trend priority. name of the trend</output>. Do not \
                    display any other characters in the response, not even \
                    citations."
                .to_string(),
            max_trends: Some(10),
            output: PathBuf::from("public/data/cbi-trends.json"),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or the upstream base URL is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (CBI_PROXY_ prefix)
        figment = figment.merge(Env::prefixed("CBI_PROXY_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into the process environment (before credential
        // resolution, which reads the environment lazily)
        config.load_env_files();

        config.validate()?;
        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Files that don't exist are silently skipped; existing variables win.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let path = Path::new(path_str);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {path_str}"),
                    Err(e) => tracing::warn!("Failed to load env file {path_str}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {path_str}");
            }
        }
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.upstream.base_url)
            .map_err(|e| Error::Config(format!("Invalid upstream base URL: {e}")))?;
        Ok(())
    }

    /// Resolve upstream credentials, preferring the environment over the
    /// config file. Returns `None` when either half is missing or empty;
    /// that is a permanent configuration error, not a retryable condition.
    #[must_use]
    pub fn resolve_credentials(&self) -> Option<Credentials> {
        let client_id = resolve_value(CLIENT_ID_VAR, self.credentials.client_id.as_deref())?;
        let client_secret =
            resolve_value(CLIENT_SECRET_VAR, self.credentials.client_secret.as_deref())?;
        Some(Credentials {
            client_id,
            client_secret,
        })
    }

    /// The trends query, with the `CBI_TOP_TRENDS_QUERY` override applied
    #[must_use]
    pub fn trends_query(&self) -> String {
        env::var(TRENDS_QUERY_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.trends.query.clone())
    }
}

fn resolve_value(var: &str, fallback: Option<&str>) -> Option<String> {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            fallback
                .filter(|v| !v.trim().is_empty())
                .map(ToString::to_string)
        })
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
