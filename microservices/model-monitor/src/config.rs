//! Model Monitor Configuration

use serde::Deserialize;
use validator::Validate;
use vigil_core::{Period, Result, VigilError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MonitorConfig {
    pub http_bind: String,
    /// Base URL of the prediction endpoint
    #[validate(url)]
    pub endpoint_url: String,
    /// Base URL of the artifact board
    #[validate(url)]
    pub board_url: String,
    /// Shared-access token forwarded to the board on every call
    #[validate(length(min = 1))]
    pub board_token: String,
    /// Board artifact holding the model manifest
    #[validate(length(min = 1))]
    pub model_artifact: String,
    /// Board artifact holding the labeled batch scored by the periodic loop
    pub dataset_artifact: Option<String>,
    /// Board artifact the metric history is appended under
    #[validate(length(min = 1))]
    pub history_name: String,
    pub period: Period,
    pub run_interval_secs: u64,
}

impl MonitorConfig {
    /// Read and validate the configuration from the environment.
    ///
    /// This is the only place the environment is consulted; everything
    /// downstream receives the struct explicitly.
    pub fn from_env() -> Result<Self> {
        let period = std::env::var("MONITOR_PERIOD")
            .unwrap_or_else(|_| "day".to_string())
            .parse()
            .map_err(VigilError::Config)?;

        let config = Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            endpoint_url: std::env::var("ENDPOINT_URL")
                .unwrap_or_else(|_| "http://localhost:5001".to_string()),
            board_url: std::env::var("BOARD_URL")
                .unwrap_or_else(|_| "http://localhost:8350".to_string()),
            board_token: std::env::var("BOARD_TOKEN")
                .map_err(|_| VigilError::Config("BOARD_TOKEN is required".to_string()))?,
            model_artifact: std::env::var("MODEL_ARTIFACT")
                .unwrap_or_else(|_| "model".to_string()),
            dataset_artifact: std::env::var("DATASET_ARTIFACT").ok(),
            history_name: std::env::var("HISTORY_NAME")
                .unwrap_or_else(|_| "metric-history".to_string()),
            period,
            run_interval_secs: std::env::var("RUN_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
        };

        config
            .validate()
            .map_err(|e| VigilError::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> MonitorConfig {
        MonitorConfig {
            http_bind: "0.0.0.0:8080".to_string(),
            endpoint_url: "http://localhost:5001".to_string(),
            board_url: "http://localhost:8350".to_string(),
            board_token: "sv-token".to_string(),
            model_artifact: "model".to_string(),
            dataset_artifact: None,
            history_name: "metric-history".to_string(),
            period: Period::Day,
            run_interval_secs: 3600,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_endpoint_url() {
        let mut config = base_config();
        config.endpoint_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_token() {
        let mut config = base_config();
        config.board_token = String::new();
        assert!(config.validate().is_err());
    }
}
