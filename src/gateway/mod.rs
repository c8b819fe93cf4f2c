//! Request-time gate
//!
//! Sequences credential extraction, admission, role authorization and the
//! identity rewrite, and adapts the result to axum middleware.

pub mod decision;
pub mod filter;
pub mod middleware;
pub mod rewrite;

pub use decision::Decision;
pub use filter::GatewayFilter;
pub use middleware::gateway_middleware;
pub use rewrite::{IdentityRewriter, RewriteError};
