use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kg_service::ServiceConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Top-level server configuration, read from TOML.
///
/// Every section is optional; missing values take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub photos: PhotoConfig,
    pub notify: NotifyConfig,
    pub service: ServiceConfig,
    pub log: LogConfig,
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Copy safe to print: the password in a postgres url is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let StorageConfig::Postgres { url, .. } = &mut copy.storage {
            *url = redact_url(url);
        }
        copy
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: SocketAddr,
    pub request_timeout_ms: u64,
    /// Maximum request body in bytes; bounds photo uploads.
    pub body_limit: usize,
    /// Answer CORS preflights for any origin.
    pub permissive_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout_ms: 10_000,
            body_limit: 10 * 1024 * 1024,
            permissive_cors: false,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Postgres {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: usize,
    },
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

fn default_max_connections() -> usize {
    16
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum PhotoConfig {
    #[default]
    Memory,
    Fs { root: PathBuf },
}

/// Where action events are published.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum NotifyConfig {
    /// Events are only written to the log.
    #[default]
    Log,
    Kafka {
        brokers: Vec<String>,
        #[serde(default = "default_delivery_timeout_ms")]
        delivery_timeout_ms: u64,
    },
}

fn default_delivery_timeout_ms() -> u64 {
    5_000
}

/// Deployment environment; selects the log format and default level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEnv {
    #[default]
    Local,
    Dev,
    Prod,
}

impl LogEnv {
    pub fn default_filter(self) -> &'static str {
        match self {
            Self::Local | Self::Dev => "debug",
            Self::Prod => "info",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub env: LogEnv,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}
