//! Notifier that writes events to the log.

use async_trait::async_trait;
use tracing::info;

use super::types::{NotificationEvent, NotifyError};
use super::Notifier;

/// Logs every event at info level.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        info!("{}", event.description());
        Ok(())
    }
}
