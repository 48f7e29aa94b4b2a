//! Client session
//!
//! A [`Session`] owns everything one client needs: the transport, the state
//! store, the render notifier, the current selection and the shutdown token.
//! There are no globals; several sessions can run side by side.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zone_model::RenderTarget;

use crate::config::Config;
use crate::dispatch::{Action, BrowseOutcome, Dispatcher};
use crate::error::{DispatchError, SessionError};
use crate::render::SharedNotifier;
use crate::store::{MergeOutcome, StateStore};
use crate::sync::{SharedContext, SharedStore, SyncContext, SyncLoop, SyncState};
use crate::transport::Transport;

pub struct Session {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    store: SharedStore,
    notifier: SharedNotifier,
    context: SharedContext,
    /// Music paths visited before the current one
    breadcrumbs: Mutex<Vec<String>>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    sync_state: Mutex<Option<watch::Receiver<SyncState>>>,
}

impl Session {
    pub fn new(config: Config, transport: Arc<dyn Transport>, notifier: SharedNotifier) -> Self {
        let config = Arc::new(config);
        let store: SharedStore = Arc::new(RwLock::new(StateStore::new()));
        let context = SyncContext {
            zone: config.zone.clone(),
            mpath: None,
        };
        let dispatcher = Dispatcher::new(
            transport.clone(),
            store.clone(),
            notifier.clone(),
            config.clone(),
        );

        Self {
            config,
            transport,
            store,
            notifier,
            context: Arc::new(RwLock::new(context)),
            breadcrumbs: Mutex::new(Vec::new()),
            dispatcher,
            shutdown: CancellationToken::new(),
            sync_state: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Spawn the sync loop. A session runs at most one; later calls fail
    /// with [`SessionError::AlreadyStarted`].
    pub async fn start(&self) -> Result<JoinHandle<()>, SessionError> {
        let mut sync_state = self.sync_state.lock().await;
        if sync_state.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        let sync = SyncLoop::new(
            self.transport.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.context.clone(),
            self.config.retry_delay(),
            self.shutdown.child_token(),
        );
        *sync_state = Some(sync.watch_state());

        info!(base_url = %self.config.base_url, "Starting session");
        Ok(tokio::spawn(sync.run()))
    }

    /// Stop the sync loop. An in-flight poll is dropped and its answer, if
    /// any, is never merged.
    pub fn shutdown(&self) {
        info!("Shutting down session");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Phase of the sync loop, `None` before `start`
    pub async fn sync_state(&self) -> Option<SyncState> {
        self.sync_state
            .lock()
            .await
            .as_ref()
            .map(|rx| *rx.borrow())
    }

    /// Read access to the store
    pub async fn store(&self) -> RwLockReadGuard<'_, StateStore> {
        self.store.read().await
    }

    /// Zone and music path echoed on every poll
    pub async fn sync_context(&self) -> SyncContext {
        self.context.read().await.clone()
    }

    pub async fn selected_zone(&self) -> Option<String> {
        self.context.read().await.zone.clone()
    }

    /// Make `zone_id` the target of commands and polls.
    ///
    /// Unknown ids are refused once the zone list is known; before the first
    /// sync any id is accepted.
    pub async fn select_zone(&self, zone_id: &str) -> Result<(), DispatchError> {
        {
            let store = self.store.read().await;
            if !store.zones().is_empty() && store.zone(zone_id).is_none() {
                return Err(DispatchError::UnknownZone(zone_id.to_string()));
            }
        }

        self.context.write().await.zone = Some(zone_id.to_string());
        debug!(zone_id, "Zone selected");

        let _store = self.store.write().await;
        self.notifier.notify(&RenderTarget::Zones);
        self.notifier.notify(&RenderTarget::Zone(zone_id.to_string()));
        self.notifier.notify(&RenderTarget::Queue(zone_id.to_string()));
        Ok(())
    }

    /// Send an action to the selected zone. Returns once the optimistic edit
    /// (if any) is applied; the request completes on the returned task.
    pub async fn dispatch(&self, action: Action) -> Result<JoinHandle<()>, DispatchError> {
        let zone = self.selected_zone().await;
        self.dispatcher.send(zone.as_deref(), action).await
    }

    /// Flip the mute state of the selected zone
    pub async fn toggle_mute(&self) -> Result<JoinHandle<()>, DispatchError> {
        let zone = self
            .selected_zone()
            .await
            .ok_or(DispatchError::NoZoneSelected)?;
        let muted = self
            .store
            .read()
            .await
            .zone(&zone)
            .map(|z| z.muted)
            .ok_or_else(|| DispatchError::UnknownZone(zone.clone()))?;

        let action = if muted { Action::MuteOff } else { Action::MuteOn };
        self.dispatcher.send(Some(&zone), action).await
    }

    /// Current music path (empty for the top level)
    pub async fn music_path(&self) -> String {
        self.context.read().await.mpath.clone().unwrap_or_default()
    }

    /// Browse to `path`, remembering the current path for [`browse_back`].
    ///
    /// [`browse_back`]: Session::browse_back
    pub async fn browse_to(&self, path: &str) -> Result<BrowseOutcome, DispatchError> {
        let zone = self.selected_zone().await;
        let outcome = self.dispatcher.browse(zone.as_deref(), path).await?;

        let previous = {
            let mut context = self.context.write().await;
            context.mpath.replace(path.to_string())
        };
        if previous.as_deref() != Some(path) {
            self.breadcrumbs
                .lock()
                .await
                .push(previous.unwrap_or_default());
        }
        Ok(outcome)
    }

    /// Return to the previously browsed path. Returns the path now shown, or
    /// `None` when already at the start.
    pub async fn browse_back(&self) -> Result<Option<String>, DispatchError> {
        let zone = self.selected_zone().await;
        if zone.is_none() {
            return Err(DispatchError::NoZoneSelected);
        }
        let Some(path) = self.breadcrumbs.lock().await.pop() else {
            return Ok(None);
        };

        self.dispatcher.browse(zone.as_deref(), &path).await?;
        self.context.write().await.mpath = Some(path.clone()).filter(|p| !p.is_empty());
        Ok(Some(path))
    }

    /// Fetch `path` again, replacing the cached node
    pub async fn refresh_music(&self, path: &str) -> Result<MergeOutcome, DispatchError> {
        let zone = self
            .selected_zone()
            .await
            .ok_or(DispatchError::NoZoneSelected)?;
        self.dispatcher.fetch_music(&zone, path).await
    }

    /// Search the music library; results replace the cached search node
    pub async fn search(&self, term: &str) -> Result<MergeOutcome, DispatchError> {
        let zone = self.selected_zone().await;
        self.dispatcher.search(zone.as_deref(), term).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
