//! Error types for the attribution module

use thiserror::Error;

/// Errors raised while building attribution inputs (routes, origins, failures)
#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("Invalid vertex: {0}")]
    InvalidVertex(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("Unknown failure: {0}")]
    UnknownFailure(String),
}

/// Contract violations inside the classifier.
///
/// These are caller bugs, never protocol conditions. A valid route paired with
/// an origin built from that route cannot produce any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("the local node (position 0) cannot be blamed")]
    SelfBlamed,

    #[error("position {position} is outside a route of {hops} hops")]
    PositionOutOfRange { position: usize, hops: usize },

    #[error("origin {origin} is outside a route of {hops} hops")]
    OriginOutOfRange { origin: usize, hops: usize },
}
