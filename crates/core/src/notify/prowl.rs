//! Prowl push notification client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ProwlConfig;

use super::types::{NotificationEvent, NotifyError};
use super::Notifier;

/// Sends events to the Prowl public API.
pub struct ProwlNotifier {
    client: Client,
    config: ProwlConfig,
}

impl ProwlNotifier {
    /// Create a new Prowl notifier.
    pub fn new(config: ProwlConfig) -> Result<Self, NotifyError> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(NotifyError::Setup("prowl api key is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()
            .map_err(|e| NotifyError::Setup(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Whether the configured event filter lets `event` through.
    pub fn is_subscribed(&self, event: &NotificationEvent) -> bool {
        self.config.events.contains(&event.kind())
    }
}

#[async_trait]
impl Notifier for ProwlNotifier {
    fn name(&self) -> &str {
        "prowl"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        if !self.is_subscribed(event) {
            return Ok(());
        }

        let event_name = event.kind().to_string();
        let description = event.description();
        let params = [
            ("apikey", self.config.api_key.as_deref().unwrap_or_default()),
            ("application", self.config.application.as_str()),
            ("event", event_name.as_str()),
            ("description", description.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.api_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Prowl notification sent: {}", event_name);
        Ok(())
    }
}
