//! Aggregator
//!
//! Buckets scored records by time period and computes classification
//! metrics over each bucket's (truth, prediction) pairs.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use vigil_core::{MetricRow, Period, ScoredRecord, VigilError};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Metric '{metric}' computed over an empty bucket")]
    EmptyBucket { metric: &'static str },
}

pub type Result<T> = std::result::Result<T, AggregateError>;

impl From<AggregateError> for VigilError {
    fn from(err: AggregateError) -> Self {
        VigilError::EmptyBucket(err.to_string())
    }
}

/// Classification metrics computable over a bucket of scored records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Accuracy,
    MacroF1,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::MacroF1 => "f1_macro",
        }
    }

    /// Compute the metric over a bucket's records.
    ///
    /// Empty buckets are unrepresentable through [`Aggregator::aggregate`],
    /// which only creates buckets around records; the guard stays anyway.
    pub fn compute(&self, records: &[&ScoredRecord]) -> Result<f64> {
        if records.is_empty() {
            return Err(AggregateError::EmptyBucket { metric: self.name() });
        }
        Ok(match self {
            Metric::Accuracy => accuracy(records),
            Metric::MacroF1 => macro_f1(records),
        })
    }
}

/// Buckets scored records and computes the configured metrics
pub struct Aggregator {
    period: Period,
    metrics: Vec<Metric>,
}

impl Aggregator {
    pub fn new(period: Period, metrics: Vec<Metric>) -> Self {
        Self { period, metrics }
    }

    /// One row per (bucket, metric) pair, ordered by bucket ascending then
    /// metric name ascending.
    ///
    /// Buckets nobody observed in are omitted rather than zero-filled.
    pub fn aggregate(&self, records: &[ScoredRecord]) -> Result<Vec<MetricRow>> {
        let mut buckets: BTreeMap<DateTime<Utc>, Vec<&ScoredRecord>> = BTreeMap::new();
        for record in records {
            buckets
                .entry(self.period.truncate(record.observed_at))
                .or_default()
                .push(record);
        }

        let mut rows = Vec::with_capacity(buckets.len() * self.metrics.len());
        for (bucket, group) in &buckets {
            for metric in &self.metrics {
                rows.push(MetricRow {
                    bucket: *bucket,
                    metric: metric.name().to_string(),
                    value: metric.compute(group)?,
                    count: group.len() as u64,
                });
            }
        }

        rows.sort_by(|a, b| a.bucket.cmp(&b.bucket).then_with(|| a.metric.cmp(&b.metric)));
        Ok(rows)
    }
}

fn accuracy(records: &[&ScoredRecord]) -> f64 {
    let correct = records.iter().filter(|r| r.truth == r.predicted).count();
    correct as f64 / records.len() as f64
}

/// Unweighted mean of per-label F1 over the labels seen in the bucket.
/// A label with no predicted or true occurrences contributes 0.
fn macro_f1(records: &[&ScoredRecord]) -> f64 {
    let labels: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| [r.truth.as_str(), r.predicted.as_str()])
        .collect();

    let mut sum = 0.0;
    for label in &labels {
        let tp = records
            .iter()
            .filter(|r| r.truth == *label && r.predicted == *label)
            .count() as f64;
        let fp = records
            .iter()
            .filter(|r| r.truth != *label && r.predicted == *label)
            .count() as f64;
        let fn_ = records
            .iter()
            .filter(|r| r.truth == *label && r.predicted != *label)
            .count() as f64;

        let denom = 2.0 * tp + fp + fn_;
        sum += if denom == 0.0 { 0.0 } else { 2.0 * tp / denom };
    }
    sum / labels.len() as f64
}
