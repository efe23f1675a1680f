use std::sync::Arc;

use tracing::{debug, error, warn};
use zap_core::Settings;
use zap_core::assets::AssetLocator;
use zap_core::error::CoreResult;
use zap_core::notifications::PushTarget;
use zap_core::store::Store;
use zap_push::PushGateway;
use zap_storage::LocalBlobStore;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

pub type AppState = Arc<AppStateInner>;

/// Shared application state for all route handlers.
pub struct AppStateInner {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<LocalBlobStore>,
    /// `None` when no push gateway is configured.
    pub push: Option<PushGateway>,
    pub settings: Settings,
    pub config: ServerConfig,
}

impl AppStateInner {
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn assets(&self) -> &dyn AssetLocator {
        self.blobs.as_ref()
    }

    /// Runs a core call on the blocking pool. The store does synchronous I/O.
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> AppResult<T>
    where
        F: FnOnce(&AppStateInner) -> CoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                AppError::InternalError(e.to_string())
            })?
            .map_err(AppError::from)
    }

    /// Hands notifications to the push gateway in the background. They stay
    /// stored either way, so a failed push only costs the device alert.
    pub fn push(&self, targets: Vec<PushTarget>) {
        if targets.is_empty() {
            return;
        }
        let Some(gateway) = self.push.clone() else {
            debug!("No push gateway configured, {} notifications not pushed", targets.len());
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = gateway.send_notifications(&targets).await {
                warn!("Push delivery failed: {}", e);
            }
        });
    }
}
