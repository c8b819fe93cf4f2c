//! Token admission pre-check
//!
//! Collapses extraction and decoding outcomes into a single admit/deny answer.
//! The reason is kept for logging only.

use crate::auth::jwt::{Claims, DecodeError};
use crate::error::RejectReason;
use chrono::{DateTime, Utc};

/// Outcome of resolving the caller's identity from a request
#[derive(Debug)]
pub enum Resolution {
    /// No usable bearer credential was presented
    NoCredential,
    /// A credential was presented but could not be decoded
    Failed(DecodeError),
    /// Credential decoded; not yet checked for expiry
    Decoded(Claims),
}

impl Resolution {
    /// Resolved username, present only for decoded claims with a non-blank subject
    pub fn username(&self) -> Option<&str> {
        match self {
            Resolution::Decoded(claims) => claims.username(),
            _ => None,
        }
    }
}

/// Admit the resolution or explain why not.
///
/// Rejects when the credential is absent, failed to decode, has no username,
/// or expires at or before `now`.
pub fn check(resolution: &Resolution, now: DateTime<Utc>) -> Result<&Claims, RejectReason> {
    let claims = match resolution {
        Resolution::NoCredential => return Err(RejectReason::NoCredential),
        Resolution::Failed(e) => return Err(RejectReason::from(e)),
        Resolution::Decoded(claims) => claims,
    };

    if claims.username().is_none() {
        return Err(RejectReason::MalformedCredential);
    }

    match claims.expires_at() {
        Some(expires_at) if expires_at > now => Ok(claims),
        _ => Err(RejectReason::ExpiredCredential),
    }
}

/// Boolean form of [`check`]
pub fn validate(resolution: &Resolution, now: DateTime<Utc>) -> bool {
    check(resolution, now).is_ok()
}
