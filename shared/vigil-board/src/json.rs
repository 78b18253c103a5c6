//! Typed JSON helpers over the raw byte-level [`Board`] API

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Board, Result};

/// Fetch an artifact and deserialize it, returning the stored version too
pub async fn fetch_json<T: DeserializeOwned>(
    board: &dyn Board,
    name: &str,
    version: Option<u64>,
) -> Result<(T, u64)> {
    let artifact = board.fetch(name, version).await?;
    let value = serde_json::from_slice(&artifact.data)?;
    Ok((value, artifact.version))
}

/// Serialize a value and publish it as a new artifact version
pub async fn publish_json<T: Serialize + ?Sized>(
    board: &dyn Board,
    name: &str,
    value: &T,
    expected_version: Option<u64>,
) -> Result<u64> {
    let data = serde_json::to_vec(value)?;
    board.publish(name, Bytes::from(data), expected_version).await
}
