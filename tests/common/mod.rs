#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use kolibri_search_provider::{
    config::Config,
    core::{Launcher, ProviderError, ProviderResult, ResultMeta, SearchBackend},
    service::SearchProviderService,
};

pub const BASE_PATH: &str = "/org/learningequality/Kolibri/SearchProvider";

pub fn channel_path(channel_id: &str) -> String {
    format!("{BASE_PATH}/channel_{channel_id}")
}

pub fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Daemon stand-in. Searches wait for a permit when a gate is set.
#[derive(Default)]
pub struct MockBackend {
    search_calls: AtomicUsize,
    meta_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    results: HashMap<String, ProviderResult<Vec<String>>>,
    metas: Vec<ResultMeta>,
    gate: Option<Arc<Semaphore>>,
}

impl MockBackend {
    pub fn with_result(mut self, query: &str, ids: Vec<String>) -> Self {
        self.results.insert(query.to_string(), Ok(ids));
        self
    }

    pub fn with_failure(mut self, query: &str, message: &str) -> Self {
        self.results
            .insert(query.to_string(), Err(ProviderError::Backend(message.to_string())));
        self
    }

    pub fn with_metas(mut self, metas: Vec<ResultMeta>) -> Self {
        self.metas = metas;
        self
    }

    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn meta_calls(&self) -> usize {
        self.meta_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub async fn wait_for_searches(&self, calls: usize) {
        while self.search_calls() < calls {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn get_item_ids_for_search(
        &self,
        query: &str,
        _cancellation: CancellationToken,
    ) -> ProviderResult<Vec<String>> {
        self.queries.lock().push(query.to_string());
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.results
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_metadata_for_item_ids(
        &self,
        item_ids: &[String],
    ) -> ProviderResult<Vec<ResultMeta>> {
        self.meta_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .metas
            .iter()
            .filter(|meta| item_ids.contains(&meta.id))
            .cloned()
            .collect())
    }
}

/// Launcher that records every URI instead of opening it.
#[derive(Default)]
pub struct RecordingLauncher {
    uris: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().clone()
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn launch(&self, uri: &str) -> ProviderResult<()> {
        self.uris.lock().push(uri.to_string());
        Ok(())
    }
}

pub type TestService = SearchProviderService<MockBackend, RecordingLauncher>;

pub fn service(backend: MockBackend) -> (Arc<TestService>, Arc<MockBackend>, Arc<RecordingLauncher>) {
    let backend = Arc::new(backend);
    let launcher = Arc::new(RecordingLauncher::default());
    let service = SearchProviderService::from_config(
        &Config::default(),
        Arc::clone(&backend),
        Arc::clone(&launcher),
    )
    .expect("default config builds a service");

    (Arc::new(service), backend, launcher)
}
