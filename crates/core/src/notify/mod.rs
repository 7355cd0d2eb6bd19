//! Notification dispatch for transfer events.
//!
//! Notifications are best effort: a failing notifier is logged and the run
//! carries on.

mod log_notifier;
mod prowl;
mod types;

pub use log_notifier::LogNotifier;
pub use prowl::ProwlNotifier;
pub use types::{EventKind, NotificationEvent, NotifyError};

use async_trait::async_trait;
use tracing::warn;

use crate::config::NotificationsConfig;

/// A destination for notification events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the name of this notifier implementation.
    fn name(&self) -> &str;

    /// Delivers one event.
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Fans events out to every registered notifier.
#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set described by the configuration. The log notifier is
    /// always present.
    pub fn from_config(config: &NotificationsConfig) -> Result<Self, NotifyError> {
        let mut set = Self::new().with(LogNotifier);
        if config.prowl.enabled {
            set.push(ProwlNotifier::new(config.prowl.clone())?);
        }
        Ok(set)
    }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.push(notifier);
        self
    }

    pub fn push(&mut self, notifier: impl Notifier + 'static) {
        self.notifiers.push(Box::new(notifier));
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Sends `event` to every notifier. Returns how many delivered it.
    pub async fn dispatch(&self, event: &NotificationEvent) -> usize {
        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.notify(event).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Notifier {} failed: {}", notifier.name(), e),
            }
        }
        delivered
    }
}
