//! Notification events and errors.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinds of events a notifier can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TransferStarted,
    ItemMoved,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::TransferStarted => write!(f, "Transfer Started"),
            EventKind::ItemMoved => write!(f, "Item Moved"),
        }
    }
}

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A transfer of `name` was launched.
    TransferStarted { name: String },
    /// A finished item was moved to its destination.
    ItemMoved { name: String, destination: PathBuf },
}

impl NotificationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NotificationEvent::TransferStarted { .. } => EventKind::TransferStarted,
            NotificationEvent::ItemMoved { .. } => EventKind::ItemMoved,
        }
    }

    /// Human-readable one-liner.
    pub fn description(&self) -> String {
        match self {
            NotificationEvent::TransferStarted { name } => format!("Transfer started: {}", name),
            NotificationEvent::ItemMoved { name, destination } => {
                format!("{} moved to {}", name, destination.display())
            }
        }
    }
}

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request timed out")]
    Timeout,

    #[error("Notification service unreachable: {0}")]
    ConnectionFailed(String),

    #[error("Notification service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Notifier setup failed: {0}")]
    Setup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&EventKind::TransferStarted).unwrap(),
            "\"transfer_started\""
        );
        let kind: EventKind = serde_json::from_str("\"item_moved\"").unwrap();
        assert_eq!(kind, EventKind::ItemMoved);
    }

    #[test]
    fn test_description() {
        let event = NotificationEvent::ItemMoved {
            name: "Show S01".to_string(),
            destination: PathBuf::from("/media/tv/Show S01"),
        };
        assert_eq!(event.kind(), EventKind::ItemMoved);
        assert_eq!(event.description(), "Show S01 moved to /media/tv/Show S01");
    }
}
