//! Long-poll sync loop
//!
//! One task keeps asking the controller for the next state snapshot and
//! merges each answer into the store. The first request is answered
//! immediately with everything; after that each request is a long poll
//! carrying the store's cursor, so the controller answers only once
//! something has changed (or its own timeout elapses).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::MergeError;
use crate::render::SharedNotifier;
use crate::store::{MergeOutcome, StateStore};
use crate::transport::{ApiRequest, NormalizeContext, RequestKind, Transport, What};

pub type SharedStore = Arc<RwLock<StateStore>>;

/// Phase of the sync loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Requesting,
    Merging,
    /// Waiting out the retry delay after a failure
    Backoff,
    Stopped,
}

/// What the UI last asked about. Echoed on every poll so the controller
/// includes the right zone and music node in its answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncContext {
    pub zone: Option<String>,
    pub mpath: Option<String>,
}

pub type SharedContext = Arc<RwLock<SyncContext>>;

/// Merge a response body and notify every changed target while still holding
/// the write lock, so notifications of two merges never interleave.
pub(crate) async fn merge_and_notify(
    store: &SharedStore,
    notifier: &SharedNotifier,
    body: &Value,
    ctx: &NormalizeContext,
) -> Result<MergeOutcome, MergeError> {
    let mut store = store.write().await;
    let outcome = store.merge_json(body, ctx)?;
    for target in outcome.targets() {
        notifier.notify(target);
    }
    Ok(outcome)
}

pub struct SyncLoop {
    transport: Arc<dyn Transport>,
    store: SharedStore,
    notifier: SharedNotifier,
    context: SharedContext,
    retry_delay: Duration,
    shutdown: CancellationToken,
    state: watch::Sender<SyncState>,
}

impl SyncLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: SharedStore,
        notifier: SharedNotifier,
        context: SharedContext,
        retry_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            transport,
            store,
            notifier,
            context,
            retry_delay,
            shutdown,
            state,
        }
    }

    /// Current phase
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Follow phase changes (survives the loop being moved into a task)
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SyncState) {
        self.state.send_replace(state);
    }

    /// Request for the next cycle. Until a first answer has been merged the
    /// loop keeps asking for everything without waiting.
    async fn next_request(&self, initial: bool) -> (RequestKind, ApiRequest) {
        let context = self.context.read().await.clone();
        let mut request = ApiRequest::new(What::All);
        if let Some(zone) = context.zone {
            request = request.zone(zone);
        }
        if let Some(mpath) = context.mpath {
            request = request.mpath(mpath);
        }

        if initial {
            return (RequestKind::Immediate, request);
        }

        let cursor = self.store.read().await.cursor();
        (
            RequestKind::Wait,
            request.action("Wait").lastupdate(cursor),
        )
    }

    /// Sleep for the retry delay. Returns false if cancelled meanwhile.
    async fn backoff(&self) -> bool {
        self.set_state(SyncState::Backoff);
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.retry_delay) => true,
        }
    }

    /// Run until the shutdown token is cancelled
    pub async fn run(self) {
        info!("Sync loop started");
        let mut initial = true;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let (kind, request) = self.next_request(initial).await;
            let ctx = NormalizeContext::for_request(&request);

            self.set_state(SyncState::Requesting);
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.transport.request(kind, &request) => result,
            };

            // A response racing with shutdown is dropped unmerged
            if self.shutdown.is_cancelled() {
                break;
            }

            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    warn!("Sync request failed: {}", e);
                    if !self.backoff().await {
                        break;
                    }
                    self.set_state(SyncState::Idle);
                    continue;
                }
            };

            self.set_state(SyncState::Merging);
            match merge_and_notify(&self.store, &self.notifier, &body, &ctx).await {
                Ok(MergeOutcome::Applied(changes)) => {
                    initial = false;
                    debug!(
                        changed = changes.targets.len(),
                        cursor_advanced = changes.cursor_advanced,
                        "Merged sync response"
                    );
                }
                Ok(MergeOutcome::Stale {
                    snapshot,
                    current,
                    ..
                }) => {
                    initial = false;
                    debug!(%snapshot, %current, "Ignored stale sync response");
                }
                Err(e) => {
                    warn!("Rejected sync response: {}", e);
                    if !self.backoff().await {
                        break;
                    }
                }
            }

            self.set_state(SyncState::Idle);
        }

        self.set_state(SyncState::Stopped);
        info!("Sync loop stopped");
    }
}
