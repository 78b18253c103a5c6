//! Vigil Board Client
//!
//! Client for the versioned artifact board holding models, datasets and
//! metric histories. Artifacts are addressed by name; every write creates a
//! new version and reads return the requested (or latest) version.

pub mod error;
pub mod http;
pub mod json;
pub mod memory;
pub mod types;

pub use error::{BoardError, Result};
pub use http::HttpBoard;
pub use json::{fetch_json, publish_json};
pub use memory::MemoryBoard;
pub use types::Artifact;

use async_trait::async_trait;
use bytes::Bytes;

/// Versioned, name-addressed artifact storage.
///
/// Versions are dense and start at 1; version 0 denotes an absent artifact
/// when used as an expected version on publish.
#[async_trait]
pub trait Board: Send + Sync {
    /// Read an artifact by name, latest version unless one is given.
    async fn fetch(&self, name: &str, version: Option<u64>) -> Result<Artifact>;

    /// Write an artifact under a new version and return that version.
    ///
    /// When `expected_version` is given the write only succeeds if it still
    /// matches the artifact's current version; a mismatch is a
    /// [`BoardError::WriteConflict`]. `None` writes unconditionally.
    async fn publish(
        &self,
        name: &str,
        data: Bytes,
        expected_version: Option<u64>,
    ) -> Result<u64>;

    /// Check if the board is reachable
    async fn is_healthy(&self) -> bool;
}
