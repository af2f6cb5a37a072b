// Response types for API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::errors::AuthError;
use crate::schema::ResolveError;

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: i64,
    pub fields: Vec<String>,
}

/// Body of `POST /query`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub field: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Successful query result
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub data: serde_json::Value,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            request_id: None,
        }
    }

    /// Create from AuthError with request ID
    pub fn from_auth_error_with_id(err: AuthError, request_id: String) -> Self {
        let mut api_error = Self::from(err);
        api_error.request_id = Some(request_id);
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.user_message())
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}
