//! Payment failure attribution for multi-hop onion-routed payments

pub mod classifier;
pub mod error;
pub mod failure;
pub mod result;
pub mod route;
pub mod scenario;
pub mod vertex;

pub use classifier::{FailureClassifier, Origin};
pub use error::{AttributionError, InvariantViolation};
pub use failure::FailureVariant;
pub use result::{AttributionResult, FinalFailureReason};
pub use route::{Hop, MilliSatoshi, Route};
pub use vertex::{DirectedNodePair, Vertex};
