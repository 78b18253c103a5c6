//! Model Monitor
//!
//! Monitors the live performance of a deployed classification model:
//! - Scores labeled batches against the prediction endpoint
//! - Buckets scored records by period and computes metrics per bucket
//! - Appends metric rows to a versioned history on the artifact board
//! - Serves the accumulated history for inspection and plotting

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use vigil_board::{fetch_json, Board, BoardError, HttpBoard};
use vigil_core::{
    DependencyStatus, HealthStatus, Observation, ReadinessStatus, Result, ServiceRuntime,
    VigilError, VigilService,
};

mod aggregator;
mod config;
mod pipeline;
mod recorder;
mod scorer;

pub use config::MonitorConfig;
use aggregator::{Aggregator, Metric};
use pipeline::MonitorPipeline;
use recorder::Recorder;
use scorer::{HttpPredictionClient, Scorer};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("model_monitor=debug".parse().unwrap()),
        )
        .json()
        .init();

    info!("Starting Model Monitor");

    let service = Arc::new(MonitorService::new()?);
    ServiceRuntime::run(service).await
}

/// Model monitor service state
pub struct MonitorService {
    config: MonitorConfig,
    board: Arc<dyn Board>,
    pipeline: Arc<MonitorPipeline>,
    start_time: std::time::Instant,
}

/// Body of `POST /api/v1/runs`; omit `records` to score the configured
/// dataset artifact instead
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub records: Option<Vec<Observation>>,
}

impl MonitorService {
    pub fn new() -> Result<Self> {
        let config = MonitorConfig::from_env()?;

        let board: Arc<dyn Board> = Arc::new(
            HttpBoard::new(&config.board_url, &config.board_token)
                .map_err(|e| VigilError::Config(e.to_string()))?,
        );

        let scorer = Scorer::new(
            board.clone(),
            Arc::new(HttpPredictionClient::new(&config.endpoint_url)),
            &config.model_artifact,
        );
        let aggregator = Aggregator::new(config.period, vec![Metric::Accuracy, Metric::MacroF1]);
        let recorder = Recorder::new(board.clone());
        let pipeline = Arc::new(MonitorPipeline::new(
            scorer,
            aggregator,
            recorder,
            &config.history_name,
        ));

        Ok(Self {
            config,
            board,
            pipeline,
            start_time: std::time::Instant::now(),
        })
    }

    /// Start the periodic monitoring loop
    fn run_monitor_loop(&self) {
        let Some(dataset) = self.config.dataset_artifact.clone() else {
            info!("No dataset artifact configured, periodic runs disabled");
            return;
        };
        let pipeline = self.pipeline.clone();
        let board = self.board.clone();
        let interval_secs = self.config.run_interval_secs;

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));

            loop {
                interval.tick().await;

                let batch = match load_batch(board.as_ref(), &dataset).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(dataset = %dataset, error = %e, "Could not load dataset batch");
                        continue;
                    }
                };

                match pipeline.run(&batch).await {
                    Ok(report) => info!(
                        run_id = %report.run_id,
                        rows = report.rows_appended,
                        history_version = report.history_version,
                        "Scheduled run complete"
                    ),
                    Err(e) => warn!(error = %e, "Scheduled run failed"),
                }
            }
        });
    }
}

/// Load a labeled batch artifact from the board
async fn load_batch(board: &dyn Board, name: &str) -> Result<Vec<Observation>> {
    fetch_json::<Vec<Observation>>(board, name, None)
        .await
        .map(|(batch, _)| batch)
        .map_err(|e| match e {
            BoardError::NotFound(n) => VigilError::NotFound(n),
            other => VigilError::Network(other.to_string()),
        })
}

fn api_error(err: VigilError) -> (axum::http::StatusCode, axum::Json<serde_json::Value>) {
    let status = axum::http::StatusCode::from_u16(err.status_code())
        .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        axum::Json(serde_json::json!({
            "error": err.to_string(),
            "code": err.error_code()
        })),
    )
}

#[async_trait::async_trait]
impl VigilService for MonitorService {
    fn service_id(&self) -> &'static str {
        "model-monitor"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        let board_healthy = self.board.is_healthy().await;
        ReadinessStatus {
            ready: board_healthy,
            dependencies: vec![DependencyStatus {
                name: "board".to_string(),
                available: board_healthy,
                latency_ms: None,
            }],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Model Monitor");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(
            http = %self.config.http_bind,
            period = %self.config.period,
            run_interval = %self.config.run_interval_secs,
            "Starting Model Monitor"
        );

        self.run_monitor_loop();

        let pipeline = self.pipeline.clone();
        let board = self.board.clone();
        let dataset = self.config.dataset_artifact.clone();

        let app = axum::Router::new()
            .route("/health", axum::routing::get(|| async { "OK" }))
            .route("/ready", axum::routing::get(|| async { "OK" }))
            .route(
                "/api/v1/runs",
                axum::routing::post({
                    let pipeline = pipeline.clone();
                    move |axum::Json(request): axum::Json<RunRequest>| {
                        let pipeline = pipeline.clone();
                        let board = board.clone();
                        let dataset = dataset.clone();
                        async move {
                            let batch = match request.records {
                                Some(records) => Ok(records),
                                None => match dataset.as_deref() {
                                    Some(name) => load_batch(board.as_ref(), name).await,
                                    None => Err(VigilError::Config(
                                        "no records in request and no dataset artifact configured"
                                            .to_string(),
                                    )),
                                },
                            };

                            match batch {
                                Ok(batch) => match pipeline.run(&batch).await {
                                    Ok(report) => (
                                        axum::http::StatusCode::OK,
                                        axum::Json(serde_json::json!(report)),
                                    ),
                                    Err(e) => api_error(e),
                                },
                                Err(e) => api_error(e),
                            }
                        }
                    }
                }),
            )
            .route(
                "/api/v1/history/{name}",
                axum::routing::get({
                    let pipeline = pipeline.clone();
                    move |axum::extract::Path(name): axum::extract::Path<String>| {
                        let pipeline = pipeline.clone();
                        async move {
                            match pipeline.recorder().read(&name).await {
                                Ok(rows) => (
                                    axum::http::StatusCode::OK,
                                    axum::Json(serde_json::json!({
                                        "name": name,
                                        "rows": rows
                                    })),
                                ),
                                Err(e) => api_error(e.into()),
                            }
                        }
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
