//! The search provider surface
//!
//! A single [`SearchProvider`] answers the five search provider methods for
//! every endpoint. [`SearchProviderService`] puts the object router in front
//! of it so a transport only needs to hand over the object path and the
//! decoded call.

use std::{fmt, sync::Arc};

use log::{debug, info};

use crate::{
    config::{self, Config},
    core::{
        endpoint::Endpoint,
        error::{ProviderError, ProviderResult},
        meta::ResultMeta,
        traits::{Launcher, SearchBackend},
    },
    orchestration::{
        activation::build_activation_request, multiplexer::SearchMultiplexer, router::ObjectRouter,
    },
};

/// Join search terms into the query string sent to the daemon.
pub fn join_terms(terms: &[String]) -> String {
    terms.join(" ")
}

/// Shared handler for the default endpoint and every channel endpoint
pub struct SearchProvider<B: SearchBackend, L: Launcher> {
    multiplexer: SearchMultiplexer<B>,
    launcher: Arc<L>,
    dispatch: config::Dispatch,
}

impl<B: SearchBackend, L: Launcher> SearchProvider<B, L> {
    pub fn new(backend: Arc<B>, launcher: Arc<L>, dispatch: config::Dispatch) -> Self {
        Self {
            multiplexer: SearchMultiplexer::new(backend),
            launcher,
            dispatch,
        }
    }

    pub fn multiplexer(&self) -> &SearchMultiplexer<B> {
        &self.multiplexer
    }

    pub async fn get_initial_result_set(
        &self,
        endpoint: &Endpoint,
        terms: &[String],
    ) -> ProviderResult<Vec<String>> {
        self.search(endpoint, terms).await
    }

    /// Refined search. The previous results are not used to narrow the new
    /// search; the daemon is asked again for the full term list.
    pub async fn get_subsearch_result_set(
        &self,
        endpoint: &Endpoint,
        _previous_results: &[String],
        terms: &[String],
    ) -> ProviderResult<Vec<String>> {
        self.search(endpoint, terms).await
    }

    /// Passed straight through to the daemon, without coalescing.
    pub async fn get_result_metas(&self, item_ids: &[String]) -> ProviderResult<Vec<ResultMeta>> {
        self.multiplexer
            .backend()
            .get_metadata_for_item_ids(item_ids)
            .await
    }

    pub async fn launch_search(
        &self,
        endpoint: &Endpoint,
        terms: &[String],
        _timestamp: u32,
    ) -> ProviderResult<()> {
        self.activate(endpoint, None, terms).await
    }

    pub async fn activate_result(
        &self,
        endpoint: &Endpoint,
        item_id: &str,
        terms: &[String],
        _timestamp: u32,
    ) -> ProviderResult<()> {
        self.activate(endpoint, Some(item_id), terms).await
    }

    /// Cancel any search still waiting for the daemon.
    pub fn shutdown(&self) {
        self.multiplexer.shutdown();
    }

    async fn search(&self, endpoint: &Endpoint, terms: &[String]) -> ProviderResult<Vec<String>> {
        let query = join_terms(terms);
        self.multiplexer
            .submit_query(&query, endpoint.clone())
            .wait()
            .await
    }

    async fn activate(
        &self,
        endpoint: &Endpoint,
        item_id: Option<&str>,
        terms: &[String],
    ) -> ProviderResult<()> {
        let query = join_terms(terms);
        let query = (!query.is_empty()).then_some(query.as_str());

        let request = build_activation_request(endpoint, item_id, query)?;
        let uri = request.to_uri(&self.dispatch.scheme, &self.dispatch.search_key)?;

        info!("Launching {uri} for {endpoint}");
        self.launcher.launch(uri.as_str()).await
    }
}

/// A decoded inbound call of the search provider interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCall {
    GetInitialResultSet {
        terms: Vec<String>,
    },
    GetSubsearchResultSet {
        previous_results: Vec<String>,
        terms: Vec<String>,
    },
    GetResultMetas {
        item_ids: Vec<String>,
    },
    LaunchSearch {
        terms: Vec<String>,
        timestamp: u32,
    },
    ActivateResult {
        item_id: String,
        terms: Vec<String>,
        timestamp: u32,
    },
}

impl MethodCall {
    /// Member name on the bus
    pub fn name(&self) -> &'static str {
        match self {
            MethodCall::GetInitialResultSet { .. } => "GetInitialResultSet",
            MethodCall::GetSubsearchResultSet { .. } => "GetSubsearchResultSet",
            MethodCall::GetResultMetas { .. } => "GetResultMetas",
            MethodCall::LaunchSearch { .. } => "LaunchSearch",
            MethodCall::ActivateResult { .. } => "ActivateResult",
        }
    }
}

/// The single reply produced for a [`MethodCall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodReply {
    ItemIds(Vec<String>),
    Metas(Vec<ResultMeta>),
    Empty,
}

/// Router plus handler: everything between a transport and the daemon
pub struct SearchProviderService<B: SearchBackend, L: Launcher> {
    router: ObjectRouter,
    provider: SearchProvider<B, L>,
}

impl<B: SearchBackend, L: Launcher> SearchProviderService<B, L> {
    pub fn new(router: ObjectRouter, provider: SearchProvider<B, L>) -> Self {
        Self { router, provider }
    }

    pub fn from_config(config: &Config, backend: Arc<B>, launcher: Arc<L>) -> ProviderResult<Self> {
        let router = ObjectRouter::new(
            &config.provider.object_path,
            &config.provider.channel_node_prefix,
        )?;
        let provider = SearchProvider::new(backend, launcher, config.dispatch.clone());
        Ok(Self::new(router, provider))
    }

    pub fn router(&self) -> &ObjectRouter {
        &self.router
    }

    pub fn provider(&self) -> &SearchProvider<B, L> {
        &self.provider
    }

    /// Route and answer one call. Always yields exactly one reply or error.
    pub async fn handle_call(&self, object_path: &str, call: MethodCall) -> ProviderResult<MethodReply> {
        let endpoint = self
            .router
            .route(object_path)
            .ok_or_else(|| ProviderError::NotFound(object_path.to_string()))?;

        debug!("{} on {endpoint}", call.name());
        let provider = &self.provider;

        match call {
            MethodCall::GetInitialResultSet { terms } => provider
                .get_initial_result_set(&endpoint, &terms)
                .await
                .map(MethodReply::ItemIds),
            MethodCall::GetSubsearchResultSet {
                previous_results,
                terms,
            } => provider
                .get_subsearch_result_set(&endpoint, &previous_results, &terms)
                .await
                .map(MethodReply::ItemIds),
            MethodCall::GetResultMetas { item_ids } => provider
                .get_result_metas(&item_ids)
                .await
                .map(MethodReply::Metas),
            MethodCall::LaunchSearch { terms, timestamp } => provider
                .launch_search(&endpoint, &terms, timestamp)
                .await
                .map(|()| MethodReply::Empty),
            MethodCall::ActivateResult {
                item_id,
                terms,
                timestamp,
            } => provider
                .activate_result(&endpoint, &item_id, &terms, timestamp)
                .await
                .map(|()| MethodReply::Empty),
        }
    }
}

impl fmt::Display for MethodReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodReply::ItemIds(ids) => write!(f, "{} item ids", ids.len()),
            MethodReply::Metas(metas) => write!(f, "{} result metas", metas.len()),
            MethodReply::Empty => write!(f, "empty reply"),
        }
    }
}
