//! Core domain types for the monitoring pipeline

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for one monitoring run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One labeled input record to a monitoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// When the observation was made, not when it was scored
    pub observed_at: DateTime<Utc>,
    /// Ground-truth label
    pub label: String,
    /// Feature name to value, as sent to the prediction endpoint
    pub features: HashMap<String, serde_json::Value>,
}

/// One evaluated example: ground truth alongside the model's prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub observed_at: DateTime<Utc>,
    pub truth: String,
    pub predicted: String,
}

/// One aggregated metric value for one time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Bucket start, the observation timestamp truncated to the period
    pub bucket: DateTime<Utc>,
    pub metric: String,
    pub value: f64,
    /// Number of scored records contributing to the bucket
    pub count: u64,
}

/// Aggregation period for bucketing scored records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
}

impl Period {
    /// Truncate a timestamp to the start of its bucket, in UTC.
    ///
    /// Weeks start on the ISO Monday, months on the first day.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        match self {
            Period::Hour => day_start(date) + Duration::hours(ts.hour() as i64),
            Period::Day => day_start(date),
            Period::Week => {
                let back = ts.weekday().num_days_from_monday() as i64;
                day_start(date - Duration::days(back))
            }
            Period::Month => day_start(date.with_day(1).unwrap_or(date)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(Period::Hour),
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

/// Model metadata held on the board alongside the model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    /// Version label of the trained model, compared against the serving endpoint
    pub version: String,
    /// Feature columns the model expects on every input record
    pub features: Vec<String>,
}

/// Summary of one completed monitoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub model_version: String,
    pub records_scored: usize,
    pub rows_appended: usize,
    /// Board version of the metric history after the append
    pub history_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap(),
        )
    }

    #[test]
    fn test_truncate_hour_and_day() {
        let t = ts("2026-03-14 15:42:07");
        assert_eq!(Period::Hour.truncate(t), ts("2026-03-14 15:00:00"));
        assert_eq!(Period::Day.truncate(t), ts("2026-03-14 00:00:00"));
    }

    #[test]
    fn test_truncate_week_to_monday() {
        // 2026-03-14 is a Saturday; the ISO week starts Monday 2026-03-09
        let t = ts("2026-03-14 15:42:07");
        assert_eq!(Period::Week.truncate(t), ts("2026-03-09 00:00:00"));
        // A Monday truncates to itself
        let monday = ts("2026-03-09 08:00:00");
        assert_eq!(Period::Week.truncate(monday), ts("2026-03-09 00:00:00"));
    }

    #[test]
    fn test_truncate_month() {
        let t = ts("2026-03-14 15:42:07");
        assert_eq!(Period::Month.truncate(t), ts("2026-03-01 00:00:00"));
    }

    #[test]
    fn test_period_round_trip() {
        for p in [Period::Hour, Period::Day, Period::Week, Period::Month] {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
        assert!("fortnight".parse::<Period>().is_err());
    }
}
