//! Error types for Vigil services

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VigilError>;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Stale model: {0}")]
    StaleModel(String),

    #[error("Endpoint contract violation: {0}")]
    EndpointContract(String),

    #[error("Empty bucket: {0}")]
    EmptyBucket(String),

    #[error("Store write conflict: {0}")]
    StoreWriteConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VigilError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SchemaMismatch(_) => 422,
            Self::NotFound(_) => 404,
            Self::StaleModel(_) => 409,
            Self::StoreWriteConflict(_) => 409,
            Self::ModelUnavailable(_) => 503,
            Self::EndpointContract(_) => 502,
            Self::Network(_) => 502,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::StaleModel(_) => "STALE_MODEL",
            Self::EndpointContract(_) => "ENDPOINT_CONTRACT",
            Self::EmptyBucket(_) => "EMPTY_BUCKET",
            Self::StoreWriteConflict(_) => "STORE_WRITE_CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for VigilError {
    fn from(err: std::io::Error) -> Self {
        VigilError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        VigilError::Serialization(err.to_string())
    }
}
