//! Vigil Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait the monitoring services implement
//! - Common domain types (Observation, ScoredRecord, MetricRow, etc.)
//! - Error handling utilities

pub mod domain;
pub mod error;
pub mod service;

pub use domain::*;
pub use error::{Result, VigilError};
pub use service::{DependencyStatus, HealthStatus, ReadinessStatus, ServiceRuntime, VigilService};
