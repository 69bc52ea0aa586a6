//! Request coalescing
//!
//! Every search endpoint receives the same query at nearly the same time,
//! but the daemon only offers one unscoped search call. The multiplexer
//! keeps a single in-flight session: callers asking for the query that is
//! already pending attach to it as followers, and when the daemon replies
//! each follower receives its own channel-scoped view of the one result.
//!
//! Completed results are never reused. A submission that finds a completed
//! session, or a pending session for another query, replaces it.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::{debug, trace, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::{
    endpoint::Endpoint,
    error::{ProviderError, ProviderResult},
    item_id::filter_for_endpoint,
    traits::SearchBackend,
};

pub type SearchOutcome = ProviderResult<Vec<String>>;

/// Deduplicates concurrent identical searches into one backend call.
pub struct SearchMultiplexer<B: SearchBackend> {
    inner: Arc<MultiplexerInner<B>>,
}

impl<B: SearchBackend> Clone for SearchMultiplexer<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MultiplexerInner<B> {
    backend: Arc<B>,
    next_session_id: AtomicU64,
    /// The only mutable shared state. Lock order is slot, then session state.
    slot: Mutex<Option<Arc<Session>>>,
}

struct Session {
    id: u64,
    query: String,
    token: CancellationToken,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    followers: Vec<Follower>,
    completed: bool,
}

struct Follower {
    endpoint: Endpoint,
    sink: oneshot::Sender<SearchOutcome>,
}

/// A caller's pending request. It holds no reference to the session.
pub struct FollowerHandle {
    session_id: u64,
    receiver: oneshot::Receiver<SearchOutcome>,
}

impl FollowerHandle {
    /// Id of the session this follower was attached to
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Wait for the session to complete and return this follower's view.
    pub async fn wait(self) -> SearchOutcome {
        // The sink only disappears unsent if the search task itself was torn
        // down, e.g. on runtime shutdown.
        self.receiver
            .await
            .unwrap_or(Err(ProviderError::Cancelled))
    }
}

impl<B: SearchBackend> SearchMultiplexer<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            inner: Arc::new(MultiplexerInner {
                backend,
                next_session_id: AtomicU64::new(1),
                slot: Mutex::new(None),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    /// Submit a search on behalf of `endpoint`.
    ///
    /// Returns immediately. Must be called from within a tokio runtime, since
    /// a new session spawns its backend call.
    pub fn submit_query(&self, query: &str, endpoint: Endpoint) -> FollowerHandle {
        let (sink, receiver) = oneshot::channel();
        let mut slot = self.inner.slot.lock();

        if let Some(current) = slot.as_ref() {
            if current.query == query {
                let mut state = current.state.lock();
                if !state.completed {
                    trace!(
                        "Attaching {endpoint} to pending search {} ({} followers)",
                        current.id,
                        state.followers.len()
                    );
                    state.followers.push(Follower { endpoint, sink });
                    return FollowerHandle {
                        session_id: current.id,
                        receiver,
                    };
                }
            }
        }

        let session_id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session {
            id: session_id,
            query: query.to_string(),
            token: CancellationToken::new(),
            state: Mutex::new(SessionState {
                followers: vec![Follower { endpoint, sink }],
                completed: false,
            }),
        });

        if let Some(previous) = slot.replace(Arc::clone(&session)) {
            previous.supersede();
        }
        drop(slot);

        debug!("Starting search {session_id} for {query:?}");
        self.spawn_search(session);

        FollowerHandle {
            session_id,
            receiver,
        }
    }

    /// Cancel the pending session, if any, and empty the slot.
    pub fn shutdown(&self) {
        if let Some(session) = self.inner.slot.lock().take() {
            session.supersede();
        }
    }

    /// Whether a session is currently waiting for the backend
    pub fn is_pending(&self) -> bool {
        self.pending_query().is_some()
    }

    /// Query bound to the pending session, if any
    pub fn pending_query(&self) -> Option<String> {
        let slot = self.inner.slot.lock();
        slot.as_ref()
            .filter(|session| !session.state.lock().completed)
            .map(|session| session.query.clone())
    }

    fn spawn_search(&self, session: Arc<Session>) {
        let backend = Arc::clone(&self.inner.backend);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = session.token.cancelled() => Err(ProviderError::Cancelled),
                result = backend.get_item_ids_for_search(&session.query, session.token.clone()) => result,
            };
            session.complete(outcome);
        });
    }
}

impl Session {
    fn supersede(&self) {
        if !self.state.lock().completed {
            debug!("Cancelling search {} for {:?}", self.id, self.query);
            self.token.cancel();
        }
    }

    /// Resolve every follower exactly once. Later calls are no-ops.
    fn complete(&self, outcome: SearchOutcome) {
        let followers = {
            let mut state = self.state.lock();
            if state.completed {
                return;
            }
            state.completed = true;
            std::mem::take(&mut state.followers)
        };

        match outcome {
            Ok(raw_ids) => {
                debug!(
                    "Return {} results of search {} to {} followers",
                    raw_ids.len(),
                    self.id,
                    followers.len()
                );

                let views: Vec<Vec<String>> = (0..followers.len())
                    .map(|index| {
                        let siblings = sibling_channel_ids(&followers, index);
                        filter_for_endpoint(&raw_ids, &followers[index].endpoint, &siblings)
                    })
                    .collect();

                for (follower, view) in followers.into_iter().zip(views) {
                    follower.resolve(self.id, Ok(view));
                }
            }
            Err(err) => {
                if err.is_cancelled() {
                    debug!("Search {} cancelled with {} followers", self.id, followers.len());
                } else {
                    warn!("Search {} for {:?} failed: {err}", self.id, self.query);
                }

                for follower in followers {
                    follower.resolve(self.id, Err(err.clone()));
                }
            }
        }
    }
}

impl Follower {
    fn resolve(self, session_id: u64, outcome: SearchOutcome) {
        if self.sink.send(outcome).is_err() {
            trace!("Follower {} of search {session_id} went away", self.endpoint);
        }
    }
}

/// Channel ids of every follower except the one at `index`.
fn sibling_channel_ids(followers: &[Follower], index: usize) -> HashSet<String> {
    followers
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .filter_map(|(_, follower)| follower.endpoint.channel_id())
        .map(str::to_string)
        .collect()
}
