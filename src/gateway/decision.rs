//! Terminal per-request outcome of the gate

use crate::error::RejectReason;
use axum::http::Request;

/// Either the (possibly rewritten) request to forward, or a rejection
#[derive(Debug)]
pub enum Decision<B> {
    Forward(Request<B>),
    Reject(RejectReason),
}

impl<B> Decision<B> {
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Decision::Forward(_) => None,
            Decision::Reject(reason) => Some(*reason),
        }
    }
}
