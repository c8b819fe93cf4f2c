//! Authentication and authorization module
//!
//! Credential extraction, JWT decoding, admission checks, and route-based
//! role authorization.

pub mod extractor;
pub mod jwt;
pub mod rules;
pub mod validator;

pub use extractor::extract_bearer;
pub use jwt::{issue_token, Claims, DecodeError, JwtDecoder, DEFAULT_ROLE};
pub use rules::{authorize, PatternError, RouteAuthorizationIndex, RouteRule};
pub use validator::Resolution;
