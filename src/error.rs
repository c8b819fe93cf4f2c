//! Error handling module
//!
//! Internal rejection reasons and the HTTP-facing error type.

use crate::auth::DecodeError;
use crate::gateway::RewriteError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Message carried by every gateway rejection
pub const FORBIDDEN_MESSAGE: &str = "The jwt token validation failed";

/// Why the gate rejected a request.
///
/// For logs only. Every variant produces the same outward response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("no bearer credential")]
    NoCredential,

    #[error("malformed credential")]
    MalformedCredential,

    #[error("invalid credential signature")]
    InvalidSignature,

    #[error("credential expired")]
    ExpiredCredential,

    #[error("credential decode failed")]
    OtherDecodeError,

    #[error("role not permitted for path")]
    RoleNotPermitted,

    #[error("request already carries the identity parameter")]
    IdentityParamCollision,

    #[error("identity rewrite failed")]
    RewriteFailed,
}

impl From<&DecodeError> for RejectReason {
    fn from(e: &DecodeError) -> Self {
        match e {
            DecodeError::Malformed(_) => RejectReason::MalformedCredential,
            DecodeError::InvalidSignature => RejectReason::InvalidSignature,
            DecodeError::Other(_) => RejectReason::OtherDecodeError,
        }
    }
}

impl From<&RewriteError> for RejectReason {
    fn from(e: &RewriteError) -> Self {
        match e {
            RewriteError::ParamCollision(_) => RejectReason::IdentityParamCollision,
            RewriteError::InvalidPathAndQuery(_) | RewriteError::InvalidUri(_) => {
                RejectReason::RewriteFailed
            }
        }
    }
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Fixed body of a gateway rejection
#[derive(Debug, Serialize)]
pub struct ForbiddenResponse {
    pub error: &'static str,
    pub message: &'static str,
    pub status: u16,
    pub timestamp: String,
}

impl ForbiddenResponse {
    pub fn now() -> Self {
        Self {
            error: "Forbidden",
            message: FORBIDDEN_MESSAGE,
            status: StatusCode::FORBIDDEN.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Forbidden => {
                return (StatusCode::FORBIDDEN, Json(ForbiddenResponse::now())).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Upstream(msg) => {
                error!("Upstream error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The upstream service could not be reached".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            code,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, AppError>;
