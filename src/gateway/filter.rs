//! Gateway filter
//!
//! The end-to-end gate: extract, decode, validate, authorize, rewrite.
//! Never fails outward; every request ends in `Forward` or `Reject`.

use crate::auth::validator::{self, Resolution};
use crate::auth::{authorize, extract_bearer, JwtDecoder, RouteAuthorizationIndex};
use crate::error::RejectReason;
use crate::gateway::{Decision, IdentityRewriter};
use axum::http::{HeaderMap, Request};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Stateless request gate over immutable startup values
#[derive(Debug)]
pub struct GatewayFilter {
    decoder: JwtDecoder,
    index: RouteAuthorizationIndex,
    rewriter: IdentityRewriter,
}

impl GatewayFilter {
    pub fn new(
        decoder: JwtDecoder,
        index: RouteAuthorizationIndex,
        rewriter: IdentityRewriter,
    ) -> Self {
        Self {
            decoder,
            index,
            rewriter,
        }
    }

    pub fn index(&self) -> &RouteAuthorizationIndex {
        &self.index
    }

    /// Resolve the caller's identity from request headers.
    ///
    /// Decode failures are folded into the resolution, not returned.
    pub fn resolve(&self, headers: &HeaderMap) -> Resolution {
        match extract_bearer(headers) {
            None => Resolution::NoCredential,
            Some(token) => match self.decoder.decode(token) {
                Ok(claims) => Resolution::Decoded(claims),
                Err(e) => Resolution::Failed(e),
            },
        }
    }

    pub fn evaluate<B>(&self, request: Request<B>) -> Decision<B> {
        self.evaluate_at(request, Utc::now())
    }

    /// Run the gate with an explicit clock
    pub fn evaluate_at<B>(&self, request: Request<B>, now: DateTime<Utc>) -> Decision<B> {
        let path = request.uri().path().to_string();
        let resolution = self.resolve(request.headers());

        let claims = match validator::check(&resolution, now) {
            Ok(claims) => claims,
            Err(reason) => {
                if let Resolution::Failed(e) = &resolution {
                    warn!(path = %path, reason = %reason, error = %e, "Request rejected");
                } else {
                    warn!(path = %path, reason = %reason, "Request rejected");
                }
                return Decision::Reject(reason);
            }
        };

        let required = self.index.required_roles(&path);
        if !authorize(&claims.role, &required) {
            if required.is_empty() {
                debug!(path = %path, "No route rule matches path");
            }
            warn!(
                path = %path,
                reason = %RejectReason::RoleNotPermitted,
                role = %claims.role,
                "Request rejected"
            );
            return Decision::Reject(RejectReason::RoleNotPermitted);
        }

        match self.rewriter.rewrite(request, claims.user_id) {
            Ok(request) => {
                debug!(path = %path, user = ?claims.username(), "Request admitted");
                Decision::Forward(request)
            }
            Err(e) => {
                let reason = RejectReason::from(&e);
                warn!(path = %path, reason = %reason, error = %e, "Request rejected");
                Decision::Reject(reason)
            }
        }
    }
}
