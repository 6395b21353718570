use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::{error, warn};

/// Failures raised while resolving a connection or a collection accessor.
///
/// Cloneable because every caller coalesced onto one in-flight construction
/// receives its own copy of the same failure.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RegistryError {
    #[error("database `{0}` is not configured")]
    UnconfiguredDatabase(String),

    #[error("collection `{0}` has no registered schema")]
    UnknownCollection(String),

    #[error("connection to database `{database}` failed: {reason}")]
    Connection { database: String, reason: String },
}

/// A single field that failed its structural contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ThisError)]
#[error("{collection} validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    pub collection: String,
    pub violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("`{}` {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, ThisError)]
pub enum GatewayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("record `{0}` not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("MongoDB error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for GatewayError {
    fn from(e: figment::Error) -> Self {
        GatewayError::Config(Box::new(e))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            GatewayError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("No record with id `{id}`."),
                },
            ),
            GatewayError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message: reason,
                },
            ),
            GatewayError::PayloadTooLarge(reason) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiErrorBody {
                    code: "PAYLOAD_TOO_LARGE".to_string(),
                    message: reason,
                },
            ),
            GatewayError::Registry(err) => {
                let code = match &err {
                    RegistryError::UnconfiguredDatabase(_) => "UNCONFIGURED_DATABASE",
                    RegistryError::UnknownCollection(_) => "UNKNOWN_COLLECTION",
                    RegistryError::Connection { .. } => "CONNECTION_ERROR",
                };
                // Connection reasons stay in the log; the body names only the database.
                let message = match &err {
                    RegistryError::Connection { database, .. } => {
                        warn!(error = %err, "connection failure surfaced to client");
                        format!("Could not connect to database `{database}`.")
                    }
                    other => other.to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: code.to_string(),
                        message,
                    },
                )
            }
            GatewayError::Validation(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "VALIDATION_ERROR".to_string(),
                    message: err.to_string(),
                },
            ),
            other => {
                error!(error = %other, "request failed with storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal server error occurred.".to_string(),
                    },
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
