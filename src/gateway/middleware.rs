//! Gateway middleware
//!
//! Runs the gate in front of protected routes.

use crate::error::AppError;
use crate::gateway::{Decision, GatewayFilter};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Forward admitted requests to the inner service, answer everything else
/// with the fixed 403 body.
pub async fn gateway_middleware(
    State(gate): State<Arc<GatewayFilter>>,
    request: Request,
    next: Next,
) -> Response {
    match gate.evaluate(request) {
        Decision::Forward(request) => next.run(request).await,
        Decision::Reject(_) => AppError::Forbidden.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, Claims, JwtDecoder, RouteAuthorizationIndex, RouteRule};
    use crate::gateway::IdentityRewriter;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret";

    fn app() -> Router {
        let index = RouteAuthorizationIndex::new(vec![
            RouteRule::new("/manage/**", ["ROLE_ADMIN"]),
            RouteRule::new("/users/find", ["ROLE_ADMIN", "ROLE_USER"]),
        ])
        .unwrap();
        let gate = Arc::new(GatewayFilter::new(
            JwtDecoder::from_secret(SECRET),
            index,
            IdentityRewriter::default(),
        ));

        // Echo the uri the inner service actually received
        let echo = |uri: axum::http::Uri| async move { uri.to_string() };
        Router::new()
            .route("/manage/{*rest}", get(echo))
            .route("/users/find", get(echo))
            .route_layer(from_fn_with_state(gate, gateway_middleware))
    }

    async fn send(uri: &str, authorization: Option<String>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn bearer(role: &str, user_id: i64) -> Option<String> {
        let token = issue_token(SECRET, &Claims::for_user("alice", role, user_id)).unwrap();
        Some(format!("Bearer {token}"))
    }

    #[tokio::test]
    async fn test_admitted_request_reaches_handler_rewritten() {
        let (status, body) = send("/manage/seats", bearer("ROLE_ADMIN", 7)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/manage/seats?userId=7");
    }

    #[tokio::test]
    async fn test_non_sensitive_path_unchanged() {
        let (status, body) = send("/users/find?q=x", bearer("ROLE_USER", 7)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/users/find?q=x");
    }

    #[tokio::test]
    async fn test_rejections_are_indistinguishable() {
        let forged = issue_token("wrong", &Claims::for_user("alice", "ROLE_ADMIN", 1)).unwrap();
        let cases = vec![
            None,
            Some("Basic abc".to_string()),
            Some(format!("Bearer {forged}")),
            bearer("ROLE_USER", 1),
        ];

        for authorization in cases {
            let (status, body) = send("/manage/seats", authorization).await;
            assert_eq!(status, StatusCode::FORBIDDEN);

            let mut json: serde_json::Value = serde_json::from_str(&body).unwrap();
            json.as_object_mut().unwrap().remove("timestamp");
            assert_eq!(
                json,
                serde_json::json!({
                    "error": "Forbidden",
                    "message": "The jwt token validation failed",
                    "status": 403
                })
            );
        }
    }
}
