//! File system placer implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use super::config::PlacerConfig;
use super::error::PlacerError;
use super::traits::Placer;
use super::types::{MoveRequest, MoveResult};

/// File system based placer implementation.
pub struct FsPlacer {
    config: PlacerConfig,
}

impl FsPlacer {
    /// Creates a new file system placer with the given configuration.
    pub fn new(config: PlacerConfig) -> Self {
        Self { config }
    }

    /// Creates a placer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default())
    }

    /// Attempts to move a file or directory atomically (rename).
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, PlacerError> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // Cross-filesystem moves fail with EXDEV (18 on Linux)
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(PlacerError::move_failed(
                        source.to_path_buf(),
                        destination.to_path_buf(),
                        e,
                    ))
                }
            }
        }
    }

    /// Copies a single file.
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::Io(e)
            }
        })?;

        let dest_file = File::create(destination).await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        Ok(total_bytes)
    }

    /// Copies a directory tree, depth first.
    async fn copy_tree(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let mut total_bytes = 0u64;
        let mut pending: Vec<(PathBuf, PathBuf)> =
            vec![(source.to_path_buf(), destination.to_path_buf())];

        while let Some((from_dir, to_dir)) = pending.pop() {
            fs::create_dir_all(&to_dir)
                .await
                .map_err(|e| PlacerError::DirectoryCreationFailed {
                    path: to_dir.clone(),
                    source: e,
                })?;

            let mut entries = fs::read_dir(&from_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let from = entry.path();
                let to = to_dir.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    pending.push((from, to));
                } else {
                    total_bytes += self.copy_file(&from, &to).await?;
                }
            }
        }

        Ok(total_bytes)
    }

    /// Total size of all files below `path`.
    async fn measure(path: &Path) -> Result<u64, PlacerError> {
        let meta = fs::metadata(path).await?;
        if !meta.is_dir() {
            return Ok(meta.len());
        }

        let mut total = 0u64;
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    pending.push(entry.path());
                } else {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }

    /// Creates the destination's parent directory.
    async fn ensure_parent_dir(&self, path: &Path) -> Result<(), PlacerError> {
        if !self.config.create_parents {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PlacerError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
            }
        }
        Ok(())
    }

    async fn remove_source(path: &Path, is_dir: bool) -> Result<(), PlacerError> {
        let result = if is_dir {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        result.map_err(|e| PlacerError::CleanupFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[async_trait]
impl Placer for FsPlacer {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn move_item(&self, request: MoveRequest) -> Result<MoveResult, PlacerError> {
        let source_meta = match fs::metadata(&request.source).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlacerError::SourceNotFound {
                    path: request.source.clone(),
                })
            }
            Err(e) => return Err(PlacerError::Io(e)),
        };

        if request.destination.exists() {
            return Err(PlacerError::DestinationExists {
                path: request.destination.clone(),
            });
        }

        self.ensure_parent_dir(&request.destination).await?;

        if self.config.prefer_atomic_moves
            && Self::try_atomic_move(&request.source, &request.destination).await?
        {
            let size_bytes = Self::measure(&request.destination).await?;
            debug!(
                "Moved {} to {} (rename)",
                request.name,
                request.destination.display()
            );
            return Ok(MoveResult {
                destination: request.destination,
                size_bytes,
                atomic: true,
            });
        }

        // Fall back to copy
        let size_bytes = if source_meta.is_dir() {
            self.copy_tree(&request.source, &request.destination).await?
        } else {
            self.copy_file(&request.source, &request.destination).await?
        };
        Self::remove_source(&request.source, source_meta.is_dir()).await?;

        debug!(
            "Moved {} to {} (copy, {} bytes)",
            request.name,
            request.destination.display(),
            size_bytes
        );

        Ok(MoveResult {
            destination: request.destination,
            size_bytes,
            atomic: false,
        })
    }

    async fn validate(&self) -> Result<(), PlacerError> {
        if self.config.buffer_size == 0 {
            return Err(PlacerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "copy buffer size must be positive",
            )));
        }
        Ok(())
    }
}
