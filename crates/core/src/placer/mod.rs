//! Placer module for moving finished transfers to their final destinations.
//!
//! Items land in the working directory while lftp fetches them. Once an
//! item is complete, the placer moves it into the target directory mapped
//! to its source directory.
//!
//! - Atomic rename when source and destination share a filesystem
//! - Recursive copy followed by source removal otherwise
//! - Automatic parent directory creation
//!
//! # Example
//!
//! ```ignore
//! use locomotive_core::placer::{FsPlacer, MoveRequest, Placer};
//!
//! let placer = FsPlacer::with_defaults();
//! let result = placer
//!     .move_item(MoveRequest::new("Show S01", "/data/work/Show S01", "/media/tv/Show S01"))
//!     .await?;
//! ```

mod config;
mod error;
mod fs_placer;
mod traits;
mod types;

pub use config::PlacerConfig;
pub use error::PlacerError;
pub use fs_placer::FsPlacer;
pub use traits::Placer;
pub use types::{MoveRequest, MoveResult};
