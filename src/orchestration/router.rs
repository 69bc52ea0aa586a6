//! Object path routing
//!
//! One handler serves every endpoint. The base object path is the default
//! endpoint, and any child node named `<prefix><channel_id>` is a channel
//! endpoint whose id is taken from the path at call time, so nothing has
//! to be registered when channels come and go.

use matchit::{Match, Router as MatchRouter};

use crate::{
    config_error,
    core::{endpoint::Endpoint, error::ProviderResult},
};

const NODE_PARAM: &str = "node";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRoute {
    /// The registered base object
    Base,
    /// Any direct child of the base object
    Subtree,
}

/// Resolves inbound object paths to endpoints
pub struct ObjectRouter {
    base_path: String,
    channel_node_prefix: String,
    matcher: MatchRouter<NodeRoute>,
}

impl ObjectRouter {
    pub fn new(base_path: &str, channel_node_prefix: &str) -> ProviderResult<Self> {
        let base_path = base_path.to_string();
        let mut matcher = MatchRouter::new();

        matcher
            .insert(base_path.clone(), NodeRoute::Base)
            .map_err(|e| config_error!("Failed to register {}: {}", base_path, e))?;
        matcher
            .insert(format!("{base_path}/{{{NODE_PARAM}}}"), NodeRoute::Subtree)
            .map_err(|e| config_error!("Failed to register subtree of {}: {}", base_path, e))?;

        log::debug!("Routing {base_path} and its {channel_node_prefix}* children");

        Ok(Self {
            base_path,
            channel_node_prefix: channel_node_prefix.to_string(),
            matcher,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolve an object path to the endpoint it addresses.
    ///
    /// Returns `None` for paths outside the base object and its channel
    /// nodes; the caller rejects such calls.
    pub fn route(&self, object_path: &str) -> Option<Endpoint> {
        let Match { value, params } = self.matcher.at(object_path).ok()?;

        match value {
            NodeRoute::Base => Some(Endpoint::Default),
            NodeRoute::Subtree => {
                let endpoint = params
                    .get(NODE_PARAM)
                    .and_then(|node| self.channel_id_for_node(node))
                    .map(Endpoint::Channel);
                if endpoint.is_none() {
                    log::debug!("No endpoint at {object_path}");
                }
                endpoint
            }
        }
    }

    /// Child nodes to advertise. Channels are reachable only by callers that
    /// already know their id, so this is always empty.
    pub fn enumerate(&self, _object_path: &str) -> Vec<String> {
        Vec::new()
    }

    /// Whether the search provider interface is exposed at subtree `node`.
    pub fn introspect(&self, node: Option<&str>) -> bool {
        node.is_some_and(|node| node.starts_with(&self.channel_node_prefix))
    }

    /// Object path of the endpoint for `channel_id`
    pub fn channel_object_path(&self, channel_id: &str) -> String {
        format!(
            "{}/{}{}",
            self.base_path, self.channel_node_prefix, channel_id
        )
    }

    fn channel_id_for_node(&self, node: &str) -> Option<String> {
        node.strip_prefix(&self.channel_node_prefix)
            .filter(|channel_id| !channel_id.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "/org/learningequality/Kolibri/SearchProvider";

    fn router() -> ObjectRouter {
        ObjectRouter::new(BASE, "channel_").unwrap()
    }

    #[test]
    fn test_route_base_path() {
        assert_eq!(router().route(BASE), Some(Endpoint::Default));
    }

    #[test]
    fn test_route_channel_node() {
        let router = router();
        let path = router.channel_object_path("c8566843");
        assert_eq!(path, format!("{BASE}/channel_c8566843"));
        assert_eq!(
            router.route(&path),
            Some(Endpoint::Channel("c8566843".to_string()))
        );
    }

    #[test]
    fn test_route_rejects_unknown_paths() {
        let router = router();
        for path in [
            "/org/learningequality/Kolibri",
            "/org/learningequality/Kolibri/SearchProvider/other_node",
            "/org/learningequality/Kolibri/SearchProvider/channel_",
            "/org/learningequality/Kolibri/SearchProvider/channel_abc/child",
            "/org/learningequality/Kolibri/SearchProvider/",
            "/",
        ] {
            assert_eq!(router.route(path), None, "{path} should not route");
        }
    }

    #[test]
    fn test_subtree_is_not_enumerated() {
        let router = router();
        assert!(router.enumerate(BASE).is_empty());
        assert!(router.introspect(Some("channel_abc")));
        assert!(!router.introspect(Some("other")));
        assert!(!router.introspect(None));
    }
}
