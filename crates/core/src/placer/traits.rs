//! Trait definitions for the placer module.

use async_trait::async_trait;

use super::error::PlacerError;
use super::types::{MoveRequest, MoveResult};

/// Moves finished items to their final destinations.
#[async_trait]
pub trait Placer: Send + Sync {
    /// Returns the name of this placer implementation.
    fn name(&self) -> &str;

    /// Moves one file or directory. Never overwrites an existing destination.
    async fn move_item(&self, request: MoveRequest) -> Result<MoveResult, PlacerError>;

    /// Validates that the placer is properly configured and ready.
    async fn validate(&self) -> Result<(), PlacerError>;
}
