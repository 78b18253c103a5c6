//! Recorder
//!
//! Append-only persistence of metric rows to a named history on the board.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use vigil_board::{fetch_json, publish_json, Board, BoardError};
use vigil_core::{MetricRow, VigilError};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Write conflict on history '{0}'")]
    WriteConflict(String),

    #[error("Board error: {0}")]
    Board(BoardError),
}

pub type Result<T> = std::result::Result<T, RecordError>;

impl From<RecordError> for VigilError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::WriteConflict(name) => VigilError::StoreWriteConflict(name),
            RecordError::Board(BoardError::NotFound(name)) => VigilError::NotFound(name),
            RecordError::Board(BoardError::Serialization(e)) => {
                VigilError::Serialization(e.to_string())
            }
            RecordError::Board(e) => VigilError::Network(e.to_string()),
        }
    }
}

/// Appends metric rows to versioned histories and reads them back
pub struct Recorder {
    board: Arc<dyn Board>,
}

impl Recorder {
    pub fn new(board: Arc<dyn Board>) -> Self {
        Self { board }
    }

    /// Append rows after the existing history and return the new board
    /// version.
    ///
    /// The write expects the version that was read, so a lost race against
    /// a concurrent append surfaces as [`RecordError::WriteConflict`]
    /// rather than silently overwriting. Rows are never merged or
    /// deduplicated; appending the same rows twice stores them twice.
    pub async fn append(&self, history_name: &str, rows: Vec<MetricRow>) -> Result<u64> {
        let (mut history, version) = self.read_versioned(history_name).await?;

        if rows.is_empty() {
            debug!(history = history_name, version, "Nothing to append");
            return Ok(version);
        }

        let appended = rows.len();
        history.extend(rows);

        let new_version =
            publish_json(self.board.as_ref(), history_name, &history, Some(version))
                .await
                .map_err(|e| match e {
                    BoardError::WriteConflict { .. } => {
                        RecordError::WriteConflict(history_name.to_string())
                    }
                    other => RecordError::Board(other),
                })?;

        info!(
            history = history_name,
            appended,
            total = history.len(),
            version = new_version,
            "History appended"
        );
        Ok(new_version)
    }

    /// Full history in stored order; absent names read as empty.
    pub async fn read(&self, history_name: &str) -> Result<Vec<MetricRow>> {
        let (rows, _) = self.read_versioned(history_name).await?;
        Ok(rows)
    }

    /// A history and the board version backing it; absent names are an
    /// empty history at version 0, which doubles as the expected version
    /// for a creating write.
    async fn read_versioned(&self, history_name: &str) -> Result<(Vec<MetricRow>, u64)> {
        match fetch_json(self.board.as_ref(), history_name, None).await {
            Ok((rows, version)) => Ok((rows, version)),
            Err(BoardError::NotFound(_)) => Ok((Vec::new(), 0)),
            Err(e) => Err(RecordError::Board(e)),
        }
    }
}
