//! Server configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use badgekit_core::DEMO_ISSUER_SECRET;
use badgekit_verifier::LifecycleConfig;

/// Environment variable that overrides `issuer.secret`.
pub const ISSUER_SECRET_ENV: &str = "BADGEKIT_ISSUER_SECRET";

/// Full configuration for the badge server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Trusted issuer settings.
    #[serde(default)]
    pub issuer: IssuerConfig,

    /// Presentation request settings.
    #[serde(default)]
    pub requests: RequestsConfig,

    /// Badge catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Secret the trusted issuer key is derived from.
    #[serde(default = "default_issuer_secret")]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsConfig {
    /// Action tag prefix.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Origin assumed when a client sends none.
    #[serde(default = "default_origin")]
    pub default_origin: String,
    /// Seconds a request stays valid.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Delete a request when its verification fails.
    #[serde(default)]
    pub consume_on_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON or TOML badge catalog; the built-in catalog when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    4000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_issuer_secret() -> String {
    DEMO_ISSUER_SECRET.into()
}
fn default_namespace() -> String {
    "minabadges".into()
}
fn default_origin() -> String {
    "http://localhost:5173".into()
}
fn default_ttl_secs() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            secret: default_issuer_secret(),
        }
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            default_origin: default_origin(),
            ttl_secs: default_ttl_secs(),
            consume_on_failure: false,
        }
    }
}

impl RequestsConfig {
    /// Request TTL, if it fits a timestamp offset from now.
    pub fn ttl(&self) -> anyhow::Result<chrono::Duration> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| anyhow::anyhow!("requests.ttl_secs out of range: {}", self.ttl_secs))
    }

    pub fn lifecycle(&self) -> anyhow::Result<LifecycleConfig> {
        Ok(LifecycleConfig {
            namespace: self.namespace.clone(),
            default_origin: self.default_origin.clone(),
            ttl: self.ttl()?,
            consume_on_failure: self.consume_on_failure,
        })
    }
}

impl ServerConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ServerConfig = toml::from_str(&contents)?;
            config.requests.ttl()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply an issuer secret taken from the environment, if any.
    pub fn apply_issuer_override(&mut self, secret: Option<String>) {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.issuer.secret = secret;
        }
    }

    /// Socket address string of the API listener.
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}
