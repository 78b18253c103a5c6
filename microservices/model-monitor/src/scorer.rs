//! Scorer
//!
//! Resolves the model manifest from the board and scores labeled batches
//! against the remote prediction endpoint.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use vigil_board::{fetch_json, Board};
use vigil_core::{ModelManifest, Observation, ScoredRecord, VigilError};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Schema mismatch: records missing feature columns {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    #[error("Stale model: board holds {board}, endpoint serves {serving}")]
    StaleModel { board: String, serving: String },

    #[error("Endpoint returned {got} predictions for {sent} records")]
    CountMismatch { sent: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, ScoreError>;

impl From<ScoreError> for VigilError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::ModelUnavailable(msg) => VigilError::ModelUnavailable(msg),
            e @ ScoreError::SchemaMismatch { .. } => VigilError::SchemaMismatch(e.to_string()),
            e @ ScoreError::StaleModel { .. } => VigilError::StaleModel(e.to_string()),
            e @ ScoreError::CountMismatch { .. } => VigilError::EndpointContract(e.to_string()),
        }
    }
}

/// Predictions for one scored batch
#[derive(Debug, Clone)]
pub struct PredictionBatch {
    /// One prediction per input record, order-preserving
    pub predictions: Vec<String>,
    /// Version label reported by the endpoint, when it reports one
    pub model_version: Option<String>,
}

/// Client for the remote prediction endpoint
#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(&self, features: &[HashMap<String, Value>]) -> Result<PredictionBatch>;
}

/// Prediction client speaking the endpoint's JSON contract: a POSTed array
/// of feature objects answered by an array of predictions.
pub struct HttpPredictionClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpPredictionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, features: &[HashMap<String, Value>]) -> Result<PredictionBatch> {
        let response = self
            .http_client
            .post(format!("{}/predict", self.base_url))
            .json(features)
            .send()
            .await
            .map_err(|e| ScoreError::ModelUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScoreError::ModelUnavailable(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }

        let model_version = response
            .headers()
            .get("x-model-version")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let raw: Vec<Value> = response
            .json()
            .await
            .map_err(|e| ScoreError::ModelUnavailable(format!("invalid response body: {}", e)))?;

        Ok(PredictionBatch {
            predictions: raw.iter().map(label_of).collect(),
            model_version,
        })
    }
}

/// Render a prediction value as a label comparable against ground truth
fn label_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Scores labeled batches against the deployed model
pub struct Scorer {
    board: Arc<dyn Board>,
    client: Arc<dyn PredictionClient>,
    model_artifact: String,
}

impl Scorer {
    pub fn new(
        board: Arc<dyn Board>,
        client: Arc<dyn PredictionClient>,
        model_artifact: &str,
    ) -> Self {
        Self {
            board,
            client,
            model_artifact: model_artifact.to_string(),
        }
    }

    /// Score a batch, producing one record per observation with the
    /// observation timestamp preserved.
    ///
    /// Fails without retrying on an unresolvable manifest, missing feature
    /// columns, an endpoint count mismatch, or a version disagreement
    /// between the board manifest and the serving endpoint.
    pub async fn score(
        &self,
        batch: &[Observation],
    ) -> Result<(Vec<ScoredRecord>, ModelManifest)> {
        let (manifest, _): (ModelManifest, u64) =
            fetch_json(self.board.as_ref(), &self.model_artifact, None)
                .await
                .map_err(|e| ScoreError::ModelUnavailable(e.to_string()))?;

        let missing = missing_columns(&manifest, batch);
        if !missing.is_empty() {
            return Err(ScoreError::SchemaMismatch { missing });
        }

        let features: Vec<HashMap<String, Value>> =
            batch.iter().map(|o| o.features.clone()).collect();
        let outcome = self.client.predict(&features).await?;

        if outcome.predictions.len() != batch.len() {
            return Err(ScoreError::CountMismatch {
                sent: batch.len(),
                got: outcome.predictions.len(),
            });
        }

        if let Some(serving) = &outcome.model_version {
            if *serving != manifest.version {
                return Err(ScoreError::StaleModel {
                    board: manifest.version.clone(),
                    serving: serving.clone(),
                });
            }
        }

        let scored = batch
            .iter()
            .zip(outcome.predictions)
            .map(|(obs, predicted)| ScoredRecord {
                observed_at: obs.observed_at,
                truth: obs.label.clone(),
                predicted,
            })
            .collect();

        debug!(model = %manifest.name, version = %manifest.version, records = batch.len(), "Batch scored");
        Ok((scored, manifest))
    }
}

fn missing_columns(manifest: &ModelManifest, batch: &[Observation]) -> Vec<String> {
    let mut missing = BTreeSet::new();
    for obs in batch {
        for column in &manifest.features {
            if !obs.features.contains_key(column) {
                missing.insert(column.clone());
            }
        }
    }
    missing.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_board::{publish_json, MemoryBoard};

    /// Stub endpoint answering with canned predictions
    struct StubClient {
        predictions: Vec<String>,
        model_version: Option<String>,
    }

    #[async_trait]
    impl PredictionClient for StubClient {
        async fn predict(&self, _features: &[HashMap<String, Value>]) -> Result<PredictionBatch> {
            Ok(PredictionBatch {
                predictions: self.predictions.clone(),
                model_version: self.model_version.clone(),
            })
        }
    }

    fn observation(label: &str, x: f64) -> Observation {
        Observation {
            observed_at: Utc::now(),
            label: label.to_string(),
            features: HashMap::from([("x".to_string(), Value::from(x))]),
        }
    }

    async fn board_with_manifest() -> Arc<MemoryBoard> {
        let board = Arc::new(MemoryBoard::new());
        let manifest = ModelManifest {
            name: "churn".to_string(),
            version: "v3".to_string(),
            features: vec!["x".to_string()],
        };
        publish_json(board.as_ref(), "model", &manifest, None)
            .await
            .unwrap();
        board
    }

    fn scorer(board: Arc<MemoryBoard>, client: StubClient) -> Scorer {
        Scorer::new(board, Arc::new(client), "model")
    }

    #[tokio::test]
    async fn test_scores_one_record_per_observation() {
        let board = board_with_manifest().await;
        let batch = vec![observation("yes", 1.0), observation("no", 2.0)];
        let client = StubClient {
            predictions: vec!["yes".to_string(), "yes".to_string()],
            model_version: Some("v3".to_string()),
        };

        let (scored, manifest) = scorer(board, client).score(&batch).await.unwrap();
        assert_eq!(scored.len(), batch.len());
        assert_eq!(manifest.version, "v3");
        assert_eq!(scored[0].truth, "yes");
        assert_eq!(scored[1].predicted, "yes");
        assert_eq!(scored[1].observed_at, batch[1].observed_at);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_model_unavailable() {
        let board = Arc::new(MemoryBoard::new());
        let client = StubClient {
            predictions: vec![],
            model_version: None,
        };

        let err = scorer(board, client)
            .score(&[observation("yes", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_feature_column_is_schema_mismatch() {
        let board = board_with_manifest().await;
        let mut obs = observation("yes", 1.0);
        obs.features.clear();
        let client = StubClient {
            predictions: vec!["yes".to_string()],
            model_version: None,
        };

        let err = scorer(board, client).score(&[obs]).await.unwrap_err();
        match err {
            ScoreError::SchemaMismatch { missing } => assert_eq!(missing, vec!["x".to_string()]),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prediction_count_mismatch_fails() {
        let board = board_with_manifest().await;
        let client = StubClient {
            predictions: vec!["yes".to_string()],
            model_version: None,
        };

        let err = scorer(board, client)
            .score(&[observation("yes", 1.0), observation("no", 2.0)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoreError::CountMismatch { sent: 2, got: 1 }
        ));
    }

    #[tokio::test]
    async fn test_version_disagreement_is_stale_model() {
        let board = board_with_manifest().await;
        let client = StubClient {
            predictions: vec!["yes".to_string()],
            model_version: Some("v2".to_string()),
        };

        let err = scorer(board, client)
            .score(&[observation("yes", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::StaleModel { .. }));
    }

    #[tokio::test]
    async fn test_unreported_endpoint_version_is_accepted() {
        let board = board_with_manifest().await;
        let client = StubClient {
            predictions: vec!["yes".to_string()],
            model_version: None,
        };

        assert!(scorer(board, client)
            .score(&[observation("yes", 1.0)])
            .await
            .is_ok());
    }

    #[test]
    fn test_label_of_stringifies_non_strings() {
        assert_eq!(label_of(&Value::from("spam")), "spam");
        assert_eq!(label_of(&Value::from(1)), "1");
        assert_eq!(label_of(&Value::from(true)), "true");
    }
}
