use std::sync::Arc;
use std::time::Duration;

use kg_notify::{EventNotifier, KafkaNotifier, LogNotifier};
use kg_service::Services;
use kg_store::{FsPhotoStore, InMemoryPhotoStore, InMemoryStore, PgStore, PhotoStore};
use tokio::net::TcpListener;

use crate::config::{NotifyConfig, PhotoConfig, ServerConfig, StorageConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// kirkagram HTTP server.
pub struct KgServer {
    config: ServerConfig,
    state: AppState,
}

impl KgServer {
    /// Connect the configured backends and wire the services.
    pub async fn build(config: ServerConfig) -> ServerResult<Self> {
        let photos: Arc<dyn PhotoStore> = match &config.photos {
            PhotoConfig::Memory => Arc::new(InMemoryPhotoStore::new()),
            PhotoConfig::Fs { root } => {
                let store = FsPhotoStore::open(root.clone()).await?;
                tracing::info!(root = %store.root().display(), "photo directory ready");
                Arc::new(store)
            }
        };
        let notifier = build_notifier(&config.notify)?;

        let services = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("using in-memory storage; data is lost on exit");
                Services::new(
                    Arc::new(InMemoryStore::new()),
                    photos,
                    notifier,
                    config.service.clone(),
                )
            }
            StorageConfig::Postgres {
                url,
                max_connections,
            } => {
                let store = PgStore::connect(url, *max_connections)?;
                tracing::info!(?store, "postgres pool ready");
                Services::new(Arc::new(store), photos, notifier, config.service.clone())
            }
        };

        Ok(Self::with_state(config, AppState::new(services)))
    }

    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config.http)
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let bind = self.config.http.bind;
        let listener = TcpListener::bind(bind).await?;
        tracing::info!(%bind, "kirkagram server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("kirkagram server stopped");
        Ok(())
    }
}

fn build_notifier(config: &NotifyConfig) -> ServerResult<Arc<dyn EventNotifier>> {
    match config {
        NotifyConfig::Log => {
            tracing::info!("publishing events to the log only");
            Ok(Arc::new(LogNotifier::new()))
        }
        NotifyConfig::Kafka {
            brokers,
            delivery_timeout_ms,
        } => {
            if brokers.is_empty() {
                return Err(ServerError::Config("notify.brokers is empty".into()));
            }
            let timeout = Duration::from_millis(*delivery_timeout_ms);
            let notifier = KafkaNotifier::connect(&brokers.join(","), timeout)?;
            Ok(Arc::new(notifier))
        }
    }
}

/// Apply the relational schema. Returns `false` when the configured storage
/// has no schema to apply.
pub async fn migrate(storage: &StorageConfig) -> ServerResult<bool> {
    match storage {
        StorageConfig::Memory => Ok(false),
        StorageConfig::Postgres {
            url,
            max_connections,
        } => {
            let store = PgStore::connect(url, *max_connections)?;
            store.migrate().await?;
            Ok(true)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
