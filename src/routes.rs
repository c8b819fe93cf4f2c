//! Route definitions and router setup
//!
//! Gated routes pass through the gateway middleware before being forwarded;
//! login and enrollment are forwarded as-is.

use crate::error::ApiResult;
use crate::gateway::gateway_middleware;
use crate::proxy;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    middleware::from_fn_with_state,
    response::Response,
    routing::{any, get},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState) -> Router {
    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .propagate_x_request_id();

    let gated = Router::new()
        .route("/users/find", any(forward_manage_user))
        .route("/manage/{*rest}", any(forward_event_management))
        .route("/user/{*rest}", any(forward_event_management))
        .route_layer(from_fn_with_state(state.gate.clone(), gateway_middleware));

    let open = Router::new()
        .route("/health", get(health_check))
        .route("/users/login", any(forward_manage_user))
        .route("/users/enroll", any(forward_manage_user));

    Router::new()
        .merge(gated)
        .merge(open)
        .layer(middleware)
        .with_state(state)
}

async fn forward_manage_user(
    State(state): State<SharedState>,
    request: Request,
) -> ApiResult<Response> {
    proxy::forward(&state.http, &state.upstreams.manage_user, request).await
}

async fn forward_event_management(
    State(state): State<SharedState>,
    request: Request,
) -> ApiResult<Response> {
    proxy::forward(&state.http, &state.upstreams.event_management, request).await
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Gateway is running.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
