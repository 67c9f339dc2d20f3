//! Process-wide `tracing` subscriber.
//!
//! `local` logs human-readable output; `dev` and `prod` log JSON lines.

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogEnv};
use crate::error::{ServerError, ServerResult};

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LogConfig) -> ServerResult<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(config, rust_log.as_deref())?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.env {
        LogEnv::Local => builder.pretty().try_init(),
        LogEnv::Dev | LogEnv::Prod => builder.json().try_init(),
    };
    installed.map_err(|e| ServerError::Internal(format!("install log subscriber: {e}")))
}

/// `RUST_LOG` wins over the configured filter, which wins over the
/// environment's default level.
pub fn build_filter(config: &LogConfig, rust_log: Option<&str>) -> ServerResult<EnvFilter> {
    let directives = rust_log
        .filter(|s| !s.is_empty())
        .or(config.filter.as_deref())
        .unwrap_or(config.env.default_filter());
    EnvFilter::try_new(directives)
        .map_err(|e| ServerError::Config(format!("log filter {directives:?}: {e}")))
}
