//! Core abstractions for the search provider
//!
//! This module provides the foundational types the rest of the crate is
//! built on: endpoint identity, the item id codec, errors, and the traits
//! that describe the daemon and launcher.

pub mod endpoint;
pub mod error;
pub mod item_id;
pub mod meta;
pub mod traits;

// Re-export commonly used types
pub use endpoint::Endpoint;
pub use error::{ErrorContext, ProviderError, ProviderResult};
pub use item_id::{filter_for_endpoint, parse_item_id, parse_node_path, ItemId, NodeKind};
pub use meta::ResultMeta;
pub use traits::*;
