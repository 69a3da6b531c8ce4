//! # Error Handling
//!
//! Pipeline error taxonomy ([`CatalogError`]) and the problem+json response
//! type ([`ApiError`]) returned by the administrative surface.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Errors raised by the import and sync pipeline.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Client id or secret is not configured
    #[error("game database credentials are not configured")]
    AuthConfiguration,

    /// The token endpoint rejected the request or was unreachable
    #[error("failed to obtain access token: {source}")]
    AuthenticationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A query endpoint answered 4xx/5xx or the transport failed
    #[error("game database request failed{}: {message}", status_suffix(.status))]
    ExternalApi { status: Option<u16>, message: String },

    /// The requested external record does not exist
    #[error("game {external_id} was not found in the game database")]
    NotFoundInExternalSource { external_id: String },

    /// No local product carries the given id
    #[error("product {product_id} was not found")]
    ProductNotFound { product_id: uuid::Uuid },

    /// A local precondition was violated
    #[error("{0}")]
    Business(String),

    /// Another bulk sync is already running
    #[error("a catalog sync is already in progress")]
    SyncInProgress,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" with status {status}"))
        .unwrap_or_default()
}

impl CatalogError {
    pub fn external(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalApi {
            status,
            message: message.into(),
        }
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::Business(message.into())
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(error: reqwest::Error) -> Self {
        Self::ExternalApi {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Extract current trace ID from the active request (falls back to a generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                let suffix = uuid::Uuid::new_v4().simple().to_string();
                Some(format!("corr-{}", &suffix[..8]).into_boxed_str())
            })
    }
}

/// Detects unique-index violations across the supported backends.
pub(crate) fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    match db_error.code() {
        Some(code) => {
            let code_str: &str = code.as_ref();
            code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str)
        }
        None => false,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFoundInExternalSource { ref external_id } => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", error.to_string())
                    .with_details(serde_json::json!({ "external_id": external_id }))
            }
            CatalogError::ProductNotFound { product_id } => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", error.to_string())
                    .with_details(serde_json::json!({ "product_id": product_id }))
            }
            CatalogError::Business(message) => {
                Self::new(StatusCode::BAD_REQUEST, "BUSINESS_RULE_VIOLATION", message)
            }
            CatalogError::SyncInProgress => {
                Self::new(StatusCode::CONFLICT, "SYNC_IN_PROGRESS", error.to_string())
            }
            CatalogError::AuthConfiguration => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CATALOG_NOT_CONFIGURED",
                error.to_string(),
            ),
            CatalogError::AuthenticationFailed { .. } => {
                tracing::error!(error = %error, "Game database authentication failed");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "CATALOG_AUTH_FAILED",
                    "Could not authenticate against the game database",
                )
                .with_retry_after(60)
            }
            CatalogError::ExternalApi { status, .. } => {
                tracing::error!(error = %error, "Game database request failed");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "CATALOG_UNAVAILABLE",
                    "The game database is unavailable",
                )
                .with_details(serde_json::json!({ "upstream_status": status }))
            }
            CatalogError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            rejection.body_text(),
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

/// Create a not found error (404)
pub fn not_found(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}
