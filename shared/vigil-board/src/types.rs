//! Common Types for the Board

use bytes::Bytes;

/// One stored artifact version
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub version: u64,
    pub data: Bytes,
}
