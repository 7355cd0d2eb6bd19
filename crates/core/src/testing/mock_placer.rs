//! Mock placer for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::placer::{MoveRequest, MoveResult, Placer, PlacerError};

/// Mock implementation of the Placer trait.
///
/// Records move requests without touching the filesystem. Moves of items
/// registered with [`MockPlacer::fail_item`] fail with
/// [`PlacerError::DestinationExists`].
#[derive(Debug, Clone, Default)]
pub struct MockPlacer {
    requests: Arc<Mutex<Vec<MoveRequest>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes moves of `name` fail.
    pub fn fail_item(&self, name: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into());
    }

    /// Every request received, successful or not.
    pub fn requests(&self) -> Vec<MoveRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Placer for MockPlacer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn move_item(&self, request: MoveRequest) -> Result<MoveResult, PlacerError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&request.name)
        {
            return Err(PlacerError::DestinationExists {
                path: request.destination,
            });
        }

        Ok(MoveResult {
            destination: request.destination,
            size_bytes: 0,
            atomic: true,
        })
    }

    async fn validate(&self) -> Result<(), PlacerError> {
        Ok(())
    }
}
