use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use zap_core::store::{Store, StoreError};

use crate::PushGateway;

/// Background task that pulls new Moments from the gateway.
pub async fn run_sync_loop(store: Arc<dyn Store>, gateway: PushGateway, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match sync_moments(&store, &gateway).await {
            Ok(count) => {
                if count > 0 {
                    info!("Moment sync: ingested {} moments", count);
                }
            }
            Err(e) => {
                warn!("Moment sync error: {}", e);
            }
        }
    }
}

/// Fetches Moments newer than the latest stored one and inserts them.
/// Returns how many were new. Store access runs on the blocking pool.
pub async fn sync_moments(store: &Arc<dyn Store>, gateway: &PushGateway) -> anyhow::Result<usize> {
    let reader = store.clone();
    let after = tokio::task::spawn_blocking(move || reader.latest_moment_date()).await??;
    let moments = gateway.fetch_moments(after).await?;
    if moments.is_empty() {
        return Ok(0);
    }

    let writer = store.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
        let mut inserted = 0;
        for moment in &moments {
            match writer.insert_moment(moment) {
                Ok(()) => inserted += 1,
                // already ingested by an overlapping run
                Err(StoreError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(inserted)
    })
    .await?
}
