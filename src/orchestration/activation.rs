//! Dispatch requests for opening search results
//!
//! Opening a result (or launching a search) never touches the multiplexer.
//! The endpoint, item id and query are turned into a [`DispatchRequest`],
//! which renders as a `scheme://channel_id/node_path?search=query` URI for
//! the launcher. The launcher hands it to the default application instance
//! or to a channel-specific one.

use url::Url;

use crate::{
    core::{
        endpoint::Endpoint,
        error::{ProviderError, ProviderResult},
        item_id::{parse_item_id, parse_node_path},
    },
    internal_error,
};

/// What the launcher should open. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRequest {
    pub channel_id: Option<String>,
    pub node_path: Option<String>,
    pub query: Option<String>,
}

/// Build the dispatch request for an activation on `endpoint`.
///
/// Fails with `InvalidItemId` for a malformed item id, with
/// `InvalidNodePath` for a malformed node path inside it, and with
/// `WrongChannel` when the item was found in a different channel than the
/// one the endpoint serves.
pub fn build_activation_request(
    endpoint: &Endpoint,
    item_id: Option<&str>,
    query: Option<&str>,
) -> ProviderResult<DispatchRequest> {
    let parsed = item_id.map(parse_item_id).transpose()?;
    if let Some((node_path, _)) = parsed {
        parse_node_path(node_path)?;
    }

    if let (Some(channel_id), Some((_, channel_context))) = (endpoint.channel_id(), parsed) {
        if channel_context != channel_id {
            return Err(ProviderError::WrongChannel {
                item_id: item_id.unwrap_or_default().to_string(),
                channel_id: channel_id.to_string(),
            });
        }
    }

    Ok(DispatchRequest {
        channel_id: endpoint.channel_id().map(str::to_string),
        node_path: parsed.map(|(node_path, _)| node_path.to_string()),
        query: query.map(str::to_string),
    })
}

impl DispatchRequest {
    /// Render the request as a URI with the given scheme.
    ///
    /// The query string is form-encoded under `search_key`.
    pub fn to_uri(&self, scheme: &str, search_key: &str) -> ProviderResult<Url> {
        let authority = self.channel_id.as_deref().unwrap_or_default();
        let mut uri = Url::parse(&format!("{scheme}://{authority}"))
            .map_err(|e| internal_error!("Invalid dispatch URI for {:?}: {}", self, e))?;

        if let Some(node_path) = &self.node_path {
            uri.set_path(&format!("/{node_path}"));
        }

        if let Some(query) = &self.query {
            uri.query_pairs_mut().append_pair(search_key, query);
        }

        Ok(uri)
    }
}
