//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::api::rest::IdentifyLimits;
use crate::auth::LogMailer;
use crate::config::{Settings, StorageConfig};
use crate::error::{ServerError, ServerResult};
use crate::identify::PlantNetClient;
use crate::storage::{InMemoryStorage, PostgresStorage, Storage};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

/// FloraFind API server
pub struct Server {
    listen_addr: SocketAddr,
    request_timeout: Duration,
    state: AppState,
}

impl Server {
    /// Build the server from validated settings; connects to storage
    pub async fn new(settings: Settings) -> ServerResult<Self> {
        let listen_addr = settings
            .listen_addr()
            .map_err(|e| ServerError::Server(format!("Invalid listen address: {}", e)))?;

        let storage: Arc<dyn Storage> = match settings.storage_config()? {
            StorageConfig::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(InMemoryStorage::new())
            }
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => {
                tracing::info!(
                    server = settings.postgres_server.as_deref().unwrap_or_default(),
                    db = settings.postgres_db.as_deref().unwrap_or_default(),
                    max_connections,
                    "Connecting to PostgreSQL"
                );
                Arc::new(
                    PostgresStorage::new(url.expose(), max_connections, connect_timeout_secs)
                        .await?,
                )
            }
        };

        let plantnet = settings.plantnet_config()?;
        let identify_limits = IdentifyLimits {
            max_images: plantnet.max_images,
            max_image_size: plantnet.max_image_size,
        };
        // Identification may legitimately run as long as the PlantNet call
        let request_timeout =
            Duration::from_secs(settings.request_timeout_secs.max(plantnet.timeout_secs + 5));
        let identifier = Arc::new(PlantNetClient::new(plantnet)?);

        let state = AppState::new(
            storage,
            settings.auth_config()?,
            Arc::new(LogMailer),
            identifier,
            identify_limits,
        );

        Ok(Self {
            listen_addr,
            request_timeout,
            state,
        })
    }

    /// Router with every middleware the running service uses
    pub fn router(&self) -> Router {
        create_router(self.state.clone()).layer(TimeoutLayer::new(self.request_timeout))
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.listen_addr).await?;

        tracing::info!("FloraFind API listening on {}", self.listen_addr);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("FloraFind API shutting down");

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
