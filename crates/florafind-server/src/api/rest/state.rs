//! Application state for API handlers

use crate::auth::{Mailer, TokenService};
use crate::config::AuthConfig;
use crate::identify::PlantIdentifier;
use crate::storage::Storage;
use std::sync::Arc;

/// Upload limits applied before images reach the identifier
#[derive(Debug, Clone, Copy)]
pub struct IdentifyLimits {
    pub max_images: usize,
    pub max_image_size: usize,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub storage: Arc<dyn Storage>,

    /// Token issuing and verification
    pub tokens: Arc<TokenService>,

    /// Outgoing account mail
    pub mailer: Arc<dyn Mailer>,

    /// Plant identification backend
    pub identifier: Arc<dyn PlantIdentifier>,

    /// Account policy (expiries, history size, links)
    pub auth: Arc<AuthConfig>,

    pub identify_limits: IdentifyLimits,

    /// Service version
    pub version: String,

    /// Service start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        storage: Arc<dyn Storage>,
        auth: AuthConfig,
        mailer: Arc<dyn Mailer>,
        identifier: Arc<dyn PlantIdentifier>,
        identify_limits: IdentifyLimits,
    ) -> Self {
        Self {
            storage,
            tokens: Arc::new(TokenService::new(&auth)),
            mailer,
            identifier,
            auth: Arc::new(auth),
            identify_limits,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
