//! Client for the push gateway: delivers stored notifications to devices and
//! is the source of truth for the Moment schedule.

pub mod sync;

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zap_core::notifications::PushTarget;
use zap_types::models::Moment;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Push gateway returned HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPayload<'a> {
    notification_id: &'a str,
    device_token: &'a str,
}

#[derive(Debug, Serialize)]
struct SendNotifications<'a> {
    notifications: Vec<NotificationPayload<'a>>,
}

#[derive(Debug, Deserialize)]
struct MomentsResponse {
    moments: Vec<Moment>,
}

#[derive(Debug, Clone)]
pub struct PushGateway {
    client: Client,
    base_url: String,
}

impl PushGateway {
    pub fn new(base_url: &str) -> Result<Self, PushError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send_notifications(&self, targets: &[PushTarget]) -> Result<(), PushError> {
        if targets.is_empty() {
            return Ok(());
        }
        let body = SendNotifications {
            notifications: targets
                .iter()
                .map(|t| NotificationPayload {
                    notification_id: &t.notification_id,
                    device_token: &t.device_token,
                })
                .collect(),
        };
        let response = self
            .client
            .post(format!("{}/notifications", self.base_url))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PushError::HttpStatus(response.status().as_u16()));
        }
        debug!("Pushed {} notifications", targets.len());
        Ok(())
    }

    /// Moments dated after `after`, or all of them.
    pub async fn fetch_moments(&self, after: Option<DateTime<Utc>>) -> Result<Vec<Moment>, PushError> {
        let mut request = self.client.get(format!("{}/moments", self.base_url));
        if let Some(after) = after {
            request = request.query(&[("after", after.timestamp_millis())]);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(PushError::HttpStatus(response.status().as_u16()));
        }
        let body: MomentsResponse = response.json().await?;
        Ok(body.moments)
    }
}
