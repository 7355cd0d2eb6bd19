//! Mock notifier for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::notify::{NotificationEvent, Notifier, NotifyError};

/// Mock implementation of the Notifier trait.
///
/// Clones share the recorded events, so a clone can be handed to a
/// [`NotifierSet`](crate::notify::NotifierSet) and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail (events are still recorded).
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());

        if *self.fail.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(NotifyError::ConnectionFailed("mock failure".to_string()));
        }
        Ok(())
    }
}
