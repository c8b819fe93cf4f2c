//! Bearer credential extraction
//!
//! Pulls the raw credential out of the `Authorization` header. No structural
//! validation happens here.

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Scheme prefix expected in front of the credential
pub const BEARER_PREFIX: &str = "Bearer ";

/// Return the credential following `Bearer `, if any.
///
/// A missing header, a non UTF-8 value, a different scheme, or an empty
/// credential all yield `None`.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Some(token),
        Some(_) => None,
        None => {
            tracing::debug!("Authorization header present without Bearer scheme");
            None
        }
    }
}
