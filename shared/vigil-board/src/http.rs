//! HTTP Board Backend

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use crate::types::Artifact;
use crate::{Board, BoardError, Result};

/// Response header carrying the artifact version on reads and writes
const VERSION_HEADER: &str = "x-artifact-version";

/// Board backend speaking the board's HTTP artifact API.
///
/// Every request carries the shared-access token as the `sv` query
/// parameter; the board enforces it, this client only forwards it.
#[derive(Debug, Clone)]
pub struct HttpBoard {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl HttpBoard {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        reqwest::Url::parse(base_url)
            .map_err(|e| BoardError::Configuration(format!("Invalid board URL: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn artifact_url(&self, name: &str) -> String {
        format!("{}/artifacts/{}", self.base_url, name)
    }

    fn version_from(resp: &reqwest::Response, name: &str) -> Result<u64> {
        resp.headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                BoardError::Protocol(format!("missing {} header for '{}'", VERSION_HEADER, name))
            })
    }
}

#[async_trait]
impl Board for HttpBoard {
    async fn fetch(&self, name: &str, version: Option<u64>) -> Result<Artifact> {
        let mut request = self
            .client
            .get(self.artifact_url(name))
            .query(&[("sv", self.access_token.as_str())]);
        if let Some(v) = version {
            request = request.query(&[("version", v.to_string())]);
        }

        let resp = request.send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(BoardError::NotFound(name.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(BoardError::Unauthorized(name.to_string()))
            }
            status if !status.is_success() => Err(BoardError::Protocol(format!(
                "unexpected status {} fetching '{}'",
                status, name
            ))),
            _ => {
                let version = Self::version_from(&resp, name)?;
                let data = resp.bytes().await?;
                debug!(name, version, bytes = data.len(), "Fetched artifact");
                Ok(Artifact {
                    name: name.to_string(),
                    version,
                    data,
                })
            }
        }
    }

    async fn publish(
        &self,
        name: &str,
        data: Bytes,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let mut request = self
            .client
            .put(self.artifact_url(name))
            .query(&[("sv", self.access_token.as_str())])
            .body(data);
        if let Some(v) = expected_version {
            request = request.header("If-Match", v.to_string());
        }

        let resp = request.send().await?;
        match resp.status() {
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                Err(BoardError::WriteConflict {
                    name: name.to_string(),
                    expected: expected_version,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(BoardError::Unauthorized(name.to_string()))
            }
            status if !status.is_success() => Err(BoardError::Protocol(format!(
                "unexpected status {} publishing '{}'",
                status, name
            ))),
            _ => {
                let version = Self::version_from(&resp, name)?;
                debug!(name, version, "Published artifact");
                Ok(version)
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url))
            .query(&[("sv", self.access_token.as_str())])
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(HttpBoard::new("not a url", "token").is_err());
    }

    #[tokio::test]
    async fn test_fetch_against_live_board() {
        // Requires a running board instance - skip in CI without one
        if std::env::var("VIGIL_BOARD_URL").is_err() {
            return;
        }

        let url = std::env::var("VIGIL_BOARD_URL").unwrap();
        let token = std::env::var("VIGIL_BOARD_TOKEN").unwrap_or_default();
        let board = HttpBoard::new(&url, &token).unwrap();
        assert!(board.is_healthy().await);
    }
}
