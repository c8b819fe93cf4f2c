//! Identity injection
//!
//! Requests to identity-sensitive paths are forwarded with the caller's
//! numeric user id appended as a query parameter. The rewrite is additive:
//! a gated request that already carries the parameter is refused on any path
//! rather than shadowed or passed through.

use axum::http::uri::{InvalidUri, InvalidUriParts, PathAndQuery};
use axum::http::{Request, Uri};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::form_urlencoded;

/// Query parameter that carries the caller's user id
pub const DEFAULT_IDENTITY_PARAM: &str = "userId";

/// Path prefixes whose upstreams expect the caller's user id
pub const DEFAULT_SENSITIVE_PATHS: [&str; 2] = ["/manage/seats", "/user/details"];

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("query already contains '{0}'")]
    ParamCollision(String),

    #[error("rewritten path and query is invalid: {0}")]
    InvalidPathAndQuery(#[from] InvalidUri),

    #[error("rewritten uri is invalid: {0}")]
    InvalidUri(#[from] InvalidUriParts),
}

#[derive(Debug, Clone)]
pub struct IdentityRewriter {
    sensitive_paths: Vec<String>,
    param: String,
}

impl Default for IdentityRewriter {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENSITIVE_PATHS.iter().map(|p| p.to_string()).collect(),
            DEFAULT_IDENTITY_PARAM,
        )
    }
}

impl IdentityRewriter {
    pub fn new(sensitive_paths: Vec<String>, param: impl Into<String>) -> Self {
        Self {
            sensitive_paths: sensitive_paths
                .into_iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            param: param.into(),
        }
    }

    /// Segment-aware prefix match on the normalized path: `/manage/seats`
    /// covers `/manage/seats`, `/manage/seats/4` and `/manage//seats;x` but
    /// not `/manage/seatsx`.
    pub fn is_identity_sensitive(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.sensitive_paths.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// The URI to forward, or `None` when the request passes unchanged
    pub fn rewrite_uri(&self, uri: &Uri, user_id: i64) -> Result<Option<Uri>, RewriteError> {
        let query = uri.query().unwrap_or("");
        if form_urlencoded::parse(query.as_bytes()).any(|(name, _)| name == self.param.as_str()) {
            return Err(RewriteError::ParamCollision(self.param.clone()));
        }

        if !self.is_identity_sensitive(uri.path()) {
            return Ok(None);
        }

        let pair = form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.param, &user_id.to_string())
            .finish();
        let path_and_query = if query.is_empty() {
            format!("{}?{}", uri.path(), pair)
        } else {
            format!("{}?{}&{}", uri.path(), query, pair)
        };

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
        Ok(Some(Uri::from_parts(parts)?))
    }

    /// Produce the request to forward. Only the URI can change.
    pub fn rewrite<B>(&self, request: Request<B>, user_id: i64) -> Result<Request<B>, RewriteError> {
        match self.rewrite_uri(request.uri(), user_id)? {
            None => Ok(request),
            Some(uri) => {
                tracing::info!(path = %uri.path(), "Adding {} to forwarded uri", self.param);
                let (mut parts, body) = request.into_parts();
                parts.uri = uri;
                Ok(Request::from_parts(parts, body))
            }
        }
    }
}

/// The path a backend will most likely resolve: percent-decoded, `;`
/// parameters dropped, empty and `.` segments removed, `..` applied.
fn normalize_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        let segment = segment.split(';').next().unwrap_or("");
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
