//! Compound item identifiers and channel-scoped result filtering
//!
//! The daemon identifies every search result as `kind/node_id?channel_id`,
//! for example `t/TOPIC_NODE_ID?CHANNEL_ID` or `c/CONTENT_NODE_ID?CHANNEL_ID`.
//! The part before `?` is the node path, the part after it is the channel
//! context the node was found in.

use std::{collections::HashSet, fmt, str::FromStr};

use super::{
    endpoint::Endpoint,
    error::{ProviderError, ProviderResult},
};

const CHANNEL_SEPARATOR: char = '?';
const NODE_SEPARATOR: char = '/';

/// Split an item id into `(node_path, channel_context)`.
///
/// Exactly one `?` is allowed and both sides must be non-empty.
pub fn parse_item_id(item_id: &str) -> ProviderResult<(&str, &str)> {
    split_exactly_once(item_id, CHANNEL_SEPARATOR)
        .ok_or_else(|| ProviderError::InvalidItemId(item_id.to_string()))
}

/// Split a node path into `(node_kind, node_id)`.
///
/// Exactly one `/` is allowed and both sides must be non-empty.
pub fn parse_node_path(node_path: &str) -> ProviderResult<(&str, &str)> {
    split_exactly_once(node_path, NODE_SEPARATOR)
        .ok_or_else(|| ProviderError::InvalidNodePath(node_path.to_string()))
}

fn split_exactly_once(value: &str, separator: char) -> Option<(&str, &str)> {
    let (head, tail) = value.split_once(separator)?;
    if head.is_empty() || tail.is_empty() || tail.contains(separator) {
        return None;
    }
    Some((head, tail))
}

/// Derive an endpoint's view of a shared, unscoped result set.
///
/// `sibling_channel_ids` holds the channel ids of the other endpoints that
/// were answered from the same backend call. A default endpoint hides
/// results belonging to those channels so they are not listed twice.
/// Order is preserved and duplicates are kept. Identifiers that fail to
/// parse are dropped whenever the decision depends on their contents.
pub fn filter_for_endpoint(
    raw_ids: &[String],
    endpoint: &Endpoint,
    sibling_channel_ids: &HashSet<String>,
) -> Vec<String> {
    match endpoint {
        Endpoint::Channel(channel_id) => raw_ids
            .iter()
            .filter(|item_id| belongs_to_channel(item_id, channel_id))
            .cloned()
            .collect(),
        Endpoint::Default if sibling_channel_ids.is_empty() => raw_ids.to_vec(),
        Endpoint::Default => raw_ids
            .iter()
            .filter(|item_id| match parse_item_id(item_id) {
                Ok((_, channel_context)) => !sibling_channel_ids.contains(channel_context),
                Err(e) => {
                    log::trace!("Dropping search result: {e}");
                    false
                }
            })
            .cloned()
            .collect(),
    }
}

fn belongs_to_channel(item_id: &str, channel_id: &str) -> bool {
    match item_id.parse::<ItemId>() {
        // The channel's own root node is the endpoint itself, not a result.
        Ok(item) => item.channel_id == channel_id && !item.is_channel_root(),
        Err(e) => {
            log::trace!("Dropping search result: {e}");
            false
        }
    }
}

/// Node kind code at the start of a node path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// `t`: a topic node
    Topic,
    /// `c`: a content node
    Content,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Topic => "t",
            NodeKind::Content => "c",
            NodeKind::Other(code) => code.as_str(),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(code: &str) -> Self {
        match code {
            "t" => NodeKind::Topic,
            "c" => NodeKind::Content,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

/// Owned, validated form of a compound item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId {
    pub node_kind: NodeKind,
    pub node_id: String,
    pub channel_id: String,
}

impl ItemId {
    pub fn new(
        node_kind: NodeKind,
        node_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            node_kind,
            node_id: node_id.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn node_path(&self) -> String {
        format!("{}{NODE_SEPARATOR}{}", self.node_kind.as_str(), self.node_id)
    }

    /// A channel's root node carries the channel id as its node id.
    pub fn is_channel_root(&self) -> bool {
        self.node_id == self.channel_id
    }
}

impl FromStr for ItemId {
    type Err = ProviderError;

    fn from_str(item_id: &str) -> Result<Self, Self::Err> {
        let (node_path, channel_id) = parse_item_id(item_id)?;
        let (node_kind, node_id) = parse_node_path(node_path)?;
        Ok(ItemId::new(NodeKind::from(node_kind), node_id, channel_id))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{CHANNEL_SEPARATOR}{}",
            self.node_path(),
            self.channel_id
        )
    }
}
