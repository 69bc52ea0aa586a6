//! Request orchestration layer
//!
//! Routes object paths to endpoints, coalesces concurrent searches and
//! turns activations into dispatch requests.

pub mod activation;
pub mod multiplexer;
pub mod router;

pub use activation::{build_activation_request, DispatchRequest};
pub use multiplexer::{FollowerHandle, SearchMultiplexer};
pub use router::ObjectRouter;
