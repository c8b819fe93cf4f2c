//! API gateway
//!
//! Authenticates every inbound request by its bearer JWT, authorizes the
//! caller's role against the route rule table, injects the caller's user id
//! on identity-sensitive paths, and forwards admitted requests to the
//! configured backend. Any failure yields one uniform 403 response.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod proxy;
pub mod routes;
pub mod state;
