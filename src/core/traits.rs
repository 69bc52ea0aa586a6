//! Seams to the external collaborators
//!
//! The provider talks to exactly two outside parties: the content daemon that
//! answers searches, and the launcher that opens a dispatch URI.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{error::ProviderResult, meta::ResultMeta};

/// Backend content-indexing daemon
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Unscoped search; returns compound item ids across every channel.
    ///
    /// `cancellation` is triggered when the search is no longer wanted.
    async fn get_item_ids_for_search(
        &self,
        query: &str,
        cancellation: CancellationToken,
    ) -> ProviderResult<Vec<String>>;

    /// Display metadata for the given item ids
    async fn get_metadata_for_item_ids(&self, item_ids: &[String])
        -> ProviderResult<Vec<ResultMeta>>;
}

/// Opens a dispatch URI in the content application
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    async fn launch(&self, uri: &str) -> ProviderResult<()>;
}
