use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::ledger::Page;
use crate::query::UpdateQueryError;

// ============================================================================
// Response Envelopes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ListView<T> {
    pub items: Vec<T>,
    pub size: usize,
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListViewResponse<T> {
    pub success: bool,
    pub message: String,
    pub response_type: String,
    pub total: usize,
    pub offset_start: usize,
    pub offset_end: usize,
    /// `null` when unbounded
    pub limit: Option<usize>,
    pub result: ListView<T>,
}

impl<T: Serialize> ListViewResponse<T> {
    pub fn of(page: Page<T>, response_type: &str) -> Self {
        let total = page.total();
        let applied = page.applied();
        let items = page.into_results();
        let size = items.len();

        Self {
            success: true,
            message: String::new(),
            response_type: response_type.to_string(),
            total,
            offset_start: applied.offset,
            offset_end: applied.offset + size,
            limit: applied.limit,
            result: ListView { items, size },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<&'static str>,
}

// ============================================================================
// API Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid value for parameter '{param}': {value}")]
    InvalidParameter { param: &'static str, value: String },

    #[error(transparent)]
    Query(#[from] UpdateQueryError),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ApiError::Query(UpdateQueryError::InvalidTimestamp { .. }) => "INVALID_TIMESTAMP",
            ApiError::Query(UpdateQueryError::InvalidRange { .. }) => "INVALID_RANGE",
            ApiError::Query(UpdateQueryError::StoreUnavailable(_)) => "UPSTREAM_FAILURE",
            ApiError::Query(UpdateQueryError::Consistency(_)) => "INTERNAL_ERROR",
        }
    }

    fn param(&self) -> Option<&'static str> {
        match self {
            ApiError::InvalidParameter { param, .. } => Some(*param),
            ApiError::Query(err) => err.param(),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "invalid_parameter",
            ApiError::Query(err) => err.reason(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::Query(UpdateQueryError::InvalidTimestamp { .. })
            | ApiError::Query(UpdateQueryError::InvalidRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Query(UpdateQueryError::StoreUnavailable(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Query(UpdateQueryError::Consistency(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Store and consistency details stay in the logs
        let message = match self {
            ApiError::Query(UpdateQueryError::StoreUnavailable(_)) => {
                "Update data is temporarily unavailable".to_string()
            }
            ApiError::Query(UpdateQueryError::Consistency(_)) => "Internal error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            message,
            error_code: self.error_code(),
            param: self.param(),
        })
    }
}
