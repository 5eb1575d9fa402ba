use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::entities::EntityId;

/// Serializable error body handed to the surrounding CRUD layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Unprocessable Entity")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Machine-readable error kind
    pub kind: String,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cycle detected while resolving recipe at {node} (depth {depth})")]
    CycleDetected { node: String, depth: u32 },

    #[error("Invalid recipe detail {detail_id}: {reason}")]
    InvalidRecipeDetail { detail_id: EntityId, reason: String },

    #[error("Unknown facet field: {0}")]
    UnknownFacetField(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[serde(skip)]
        std::sync::Arc<anyhow::Error>,
    ),
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Other(std::sync::Arc::new(err))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(what: impl std::fmt::Display, id: EntityId) -> Self {
        ServiceError::NotFound(format!("{} {} not found", what, id))
    }

    pub fn invalid_detail(detail_id: EntityId, reason: impl Into<String>) -> Self {
        ServiceError::InvalidRecipeDetail {
            detail_id,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::InvalidRecipeDetail { .. } => "invalid_recipe_detail",
            Self::UnknownFacetField(_) => "unknown_facet_field",
            Self::ValidationError(_) => "validation_error",
            Self::DataAccess(_) => "data_access",
            Self::Cancelled => "cancelled",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    /// Mirrors the status conventions of the CRUD layer that embeds the engine.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CycleDetected { .. } | Self::InvalidRecipeDetail { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::UnknownFacetField(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::DataAccess(_) => StatusCode::BAD_GATEWAY,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DataAccess(_) => "Data source unavailable".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status_code();
        ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            kind: self.kind().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
