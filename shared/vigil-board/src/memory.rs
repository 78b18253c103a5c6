//! In-Memory Board Backend
//!
//! Backs tests and local runs. Enforces expected-version checks
//! unconditionally, so conflict paths are exercisable without a live board.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::types::Artifact;
use crate::{Board, BoardError, Result};

#[derive(Debug, Default)]
pub struct MemoryBoard {
    // name -> versions, index i holding version i + 1
    entries: RwLock<HashMap<String, Vec<Bytes>>>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Board for MemoryBoard {
    async fn fetch(&self, name: &str, version: Option<u64>) -> Result<Artifact> {
        let entries = self.entries.read();
        let versions = entries
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BoardError::NotFound(name.to_string()))?;

        let (data, version) = match version {
            None => (versions[versions.len() - 1].clone(), versions.len() as u64),
            Some(v) if v >= 1 && (v as usize) <= versions.len() => {
                (versions[(v - 1) as usize].clone(), v)
            }
            Some(_) => return Err(BoardError::NotFound(name.to_string())),
        };

        Ok(Artifact {
            name: name.to_string(),
            version,
            data,
        })
    }

    async fn publish(
        &self,
        name: &str,
        data: Bytes,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let mut entries = self.entries.write();
        let current = entries.get(name).map(|v| v.len() as u64).unwrap_or(0);

        if let Some(expected) = expected_version {
            if expected != current {
                return Err(BoardError::WriteConflict {
                    name: name.to_string(),
                    expected: expected_version,
                });
            }
        }

        let versions = entries.entry(name.to_string()).or_default();
        versions.push(data);
        Ok(versions.len() as u64)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_increment() {
        let board = MemoryBoard::new();
        let v1 = board
            .publish("m", Bytes::from_static(b"a"), None)
            .await
            .unwrap();
        let v2 = board
            .publish("m", Bytes::from_static(b"b"), None)
            .await
            .unwrap();
        assert_eq!((v1, v2), (1, 2));

        let latest = board.fetch("m", None).await.unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.data, Bytes::from_static(b"b"));

        let first = board.fetch("m", Some(1)).await.unwrap();
        assert_eq!(first.data, Bytes::from_static(b"a"));
    }

    #[tokio::test]
    async fn test_fetch_absent_is_not_found() {
        let board = MemoryBoard::new();
        assert!(matches!(
            board.fetch("missing", None).await,
            Err(BoardError::NotFound(_))
        ));
        board
            .publish("m", Bytes::from_static(b"a"), None)
            .await
            .unwrap();
        assert!(matches!(
            board.fetch("m", Some(7)).await,
            Err(BoardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_expected_version_conflicts() {
        let board = MemoryBoard::new();
        // Expecting absence creates version 1
        board
            .publish("m", Bytes::from_static(b"a"), Some(0))
            .await
            .unwrap();
        // A writer that still expects absence has lost the race
        let err = board
            .publish("m", Bytes::from_static(b"b"), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::WriteConflict { .. }));

        // The matching expectation succeeds
        let v = board
            .publish("m", Bytes::from_static(b"b"), Some(1))
            .await
            .unwrap();
        assert_eq!(v, 2);
    }
}
