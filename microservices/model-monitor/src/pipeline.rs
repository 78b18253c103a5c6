//! Monitoring pipeline wiring Scorer -> Aggregator -> Recorder

use tracing::info;
use vigil_core::{Observation, Result, RunId, RunReport};

use crate::aggregator::Aggregator;
use crate::recorder::Recorder;
use crate::scorer::Scorer;

/// One monitoring pass: score a labeled batch, aggregate it into metric
/// rows, append them to the configured history.
pub struct MonitorPipeline {
    scorer: Scorer,
    aggregator: Aggregator,
    recorder: Recorder,
    history_name: String,
}

impl MonitorPipeline {
    pub fn new(
        scorer: Scorer,
        aggregator: Aggregator,
        recorder: Recorder,
        history_name: &str,
    ) -> Self {
        Self {
            scorer,
            aggregator,
            recorder,
            history_name: history_name.to_string(),
        }
    }

    /// Run one monitoring pass over a labeled batch.
    ///
    /// Any stage failure aborts the run before the history write, so a
    /// failed run leaves the previous history version untouched.
    pub async fn run(&self, batch: &[Observation]) -> Result<RunReport> {
        let run_id = RunId::generate();
        info!(run_id = %run_id, records = batch.len(), history = %self.history_name, "Monitoring run started");

        let (scored, manifest) = self.scorer.score(batch).await?;
        let rows = self.aggregator.aggregate(&scored)?;
        let rows_appended = rows.len();
        let history_version = self.recorder.append(&self.history_name, rows).await?;

        let report = RunReport {
            run_id,
            model_version: manifest.version,
            records_scored: scored.len(),
            rows_appended,
            history_version,
        };
        info!(
            run_id = %report.run_id,
            model_version = %report.model_version,
            rows = report.rows_appended,
            history_version = report.history_version,
            "Monitoring run complete"
        );
        Ok(report)
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Metric;
    use crate::scorer::{PredictionBatch, PredictionClient, ScoreError};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use vigil_board::{publish_json, MemoryBoard};
    use vigil_core::{ModelManifest, Period, VigilError};

    /// Endpoint stub predicting the label carried in the "hint" feature
    struct HintClient;

    #[async_trait]
    impl PredictionClient for HintClient {
        async fn predict(
            &self,
            features: &[HashMap<String, Value>],
        ) -> std::result::Result<PredictionBatch, ScoreError> {
            let predictions = features
                .iter()
                .map(|f| {
                    f.get("hint")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string()
                })
                .collect();
            Ok(PredictionBatch {
                predictions,
                model_version: Some("v3".to_string()),
            })
        }
    }

    fn observation(day: u32, truth: &str, hint: &str) -> Observation {
        Observation {
            observed_at: Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).unwrap(),
            label: truth.to_string(),
            features: HashMap::from([("hint".to_string(), Value::from(hint))]),
        }
    }

    async fn pipeline_over(board: Arc<MemoryBoard>) -> MonitorPipeline {
        let manifest = ModelManifest {
            name: "churn".to_string(),
            version: "v3".to_string(),
            features: vec!["hint".to_string()],
        };
        publish_json(board.as_ref(), "model", &manifest, None)
            .await
            .unwrap();

        let scorer = Scorer::new(board.clone(), Arc::new(HintClient), "model");
        let aggregator = Aggregator::new(Period::Day, vec![Metric::Accuracy]);
        let recorder = Recorder::new(board);
        MonitorPipeline::new(scorer, aggregator, recorder, "history")
    }

    #[tokio::test]
    async fn test_end_to_end_run_appends_history() {
        let board = Arc::new(MemoryBoard::new());
        let pipeline = pipeline_over(board).await;

        let batch = vec![
            observation(6, "A", "A"),
            observation(6, "A", "B"),
            observation(6, "B", "B"),
            observation(6, "B", "B"),
        ];

        let report = pipeline.run(&batch).await.unwrap();
        assert_eq!(report.records_scored, 4);
        assert_eq!(report.rows_appended, 1);
        assert_eq!(report.history_version, 1);
        assert_eq!(report.model_version, "v3");

        let history = pipeline.recorder().read("history").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!((history[0].value - 0.75).abs() < 1e-12);
        assert_eq!(history[0].count, 4);
    }

    #[tokio::test]
    async fn test_runs_accumulate_in_order() {
        let board = Arc::new(MemoryBoard::new());
        let pipeline = pipeline_over(board).await;

        pipeline.run(&[observation(6, "A", "A")]).await.unwrap();
        pipeline.run(&[observation(7, "B", "A")]).await.unwrap();

        let history = pipeline.recorder().read("history").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].bucket < history[1].bucket);
        assert!((history[0].value - 1.0).abs() < 1e-12);
        assert!((history[1].value - 0.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_failed_run_leaves_history_untouched() {
        let board = Arc::new(MemoryBoard::new());
        let pipeline = pipeline_over(board).await;

        pipeline.run(&[observation(6, "A", "A")]).await.unwrap();

        // A record without the manifest's feature column aborts the run
        let mut bad = observation(7, "B", "B");
        bad.features.clear();
        let err = pipeline.run(&[bad]).await.unwrap_err();
        assert!(matches!(err, VigilError::SchemaMismatch(_)));

        let history = pipeline.recorder().read("history").await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
