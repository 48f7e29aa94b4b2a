//! Command dispatch
//!
//! Commands are sent as immediate requests on their own task: the caller
//! never waits for the controller, and the answer is only logged. The state
//! change shows up with the next sync cycle, except for the controls
//! configured as optimistic, which are applied to the store right away.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zone_model::RenderTarget;

use crate::config::{Config, OptimisticControl};
use crate::error::DispatchError;
use crate::render::SharedNotifier;
use crate::store::{MergeOutcome, OptimisticEdit};
use crate::sync::{merge_and_notify, SharedStore};
use crate::transport::{ApiRequest, NormalizeContext, RequestKind, Transport, What};

/// A command addressed to the selected zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Jump to a queue entry
    Seek { queue_id: String },
    RemoveAll,
    VolumeUp,
    VolumeDown,
    SetVolume(u8),
    MuteOn,
    MuteOff,
    ShuffleOn,
    ShuffleOff,
    RepeatOn,
    RepeatOff,
    /// Replace the queue with a music path and start playing
    PlayMusic { path: String },
    /// Append a music path to the queue
    AddMusic { path: String },
    /// Join `zone` into the selected zone's group
    Link { zone: String },
    Unlink { zone: String },
    /// Save the queue as a playlist
    Save { name: String },
}

impl Action {
    /// Action name understood by the controller
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Play => "Start",
            Self::Pause => "Pause",
            Self::Stop => "Stop",
            Self::Next => "Next",
            Self::Previous => "Previous",
            Self::Seek { .. } => "Seek",
            Self::RemoveAll => "RemoveAll",
            Self::VolumeUp => "MuchLouder",
            Self::VolumeDown => "MuchSofter",
            Self::SetVolume(_) => "SetVolume",
            Self::MuteOn => "MuteOn",
            Self::MuteOff => "MuteOff",
            Self::ShuffleOn => "ShuffleOn",
            Self::ShuffleOff => "ShuffleOff",
            Self::RepeatOn => "RepeatOn",
            Self::RepeatOff => "RepeatOff",
            Self::PlayMusic { .. } => "PlayMusic",
            Self::AddMusic { .. } => "AddMusic",
            Self::Link { .. } => "Link",
            Self::Unlink { .. } => "Unlink",
            Self::Save { .. } => "Save",
        }
    }

    /// Immediate request sending this action to `zone`
    pub fn to_request(&self, zone: &str) -> ApiRequest {
        let request = ApiRequest::new(What::None)
            .action(self.wire_name())
            .zone(zone);
        match self {
            Self::Seek { queue_id } => request.queue(queue_id.as_str()),
            Self::SetVolume(volume) => request.volume(*volume),
            Self::PlayMusic { path } | Self::AddMusic { path } => request.mpath(path.as_str()),
            Self::Link { zone } | Self::Unlink { zone } => request.link(zone.as_str()),
            Self::Save { name } => request.savename(name.as_str()),
            _ => request,
        }
    }

    /// Local edit to apply before the controller confirms, if the action is
    /// configured as optimistic
    pub fn optimistic_edit(&self, config: &Config) -> Option<OptimisticEdit> {
        let step = i16::from(config.volume_step);
        match self {
            Self::VolumeUp if config.is_optimistic(OptimisticControl::Volume) => {
                Some(OptimisticEdit::VolumeStep(step))
            }
            Self::VolumeDown if config.is_optimistic(OptimisticControl::Volume) => {
                Some(OptimisticEdit::VolumeStep(-step))
            }
            Self::MuteOn if config.is_optimistic(OptimisticControl::Mute) => {
                Some(OptimisticEdit::Mute(true))
            }
            Self::MuteOff if config.is_optimistic(OptimisticControl::Mute) => {
                Some(OptimisticEdit::Mute(false))
            }
            _ => None,
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    /// Parse a wire action name. Actions with parameters cannot be parsed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" | "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            "next" => Ok(Self::Next),
            "previous" | "prev" => Ok(Self::Previous),
            "removeall" => Ok(Self::RemoveAll),
            "muchlouder" => Ok(Self::VolumeUp),
            "muchsofter" => Ok(Self::VolumeDown),
            "muteon" => Ok(Self::MuteOn),
            "muteoff" => Ok(Self::MuteOff),
            "shuffleon" => Ok(Self::ShuffleOn),
            "shuffleoff" => Ok(Self::ShuffleOff),
            "repeaton" => Ok(Self::RepeatOn),
            "repeatoff" => Ok(Self::RepeatOff),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Result of a browse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseOutcome {
    /// Served from the music cache without a request
    Cached,
    /// Fetched from the controller and merged
    Fetched(MergeOutcome),
}

/// Sends commands for a session
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    store: SharedStore,
    notifier: SharedNotifier,
    config: Arc<Config>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: SharedStore,
        notifier: SharedNotifier,
        config: Arc<Config>,
    ) -> Self {
        Self {
            transport,
            store,
            notifier,
            config,
        }
    }

    /// Send `action` to `zone`.
    ///
    /// Refused without a request when no zone is selected. The optimistic
    /// edit (if any) is applied and notified before this returns; the request
    /// itself runs on the returned task.
    pub async fn send(
        &self,
        zone: Option<&str>,
        action: Action,
    ) -> Result<JoinHandle<()>, DispatchError> {
        let zone = zone.ok_or(DispatchError::NoZoneSelected)?;

        if let Some(edit) = action.optimistic_edit(&self.config) {
            let mut store = self.store.write().await;
            match store.apply_optimistic(zone, edit, action.wire_name()) {
                Some(changes) => {
                    for target in &changes.targets {
                        self.notifier.notify(target);
                    }
                }
                None => debug!(zone, %action, "No cached zone for optimistic edit"),
            }
        }

        let request = action.to_request(zone);
        let transport = self.transport.clone();
        Ok(tokio::spawn(async move {
            match transport.request(RequestKind::Immediate, &request).await {
                Ok(body) => debug!(action = %action, response = %body, "Command sent"),
                Err(e) => warn!("Command {} failed: {}", action, e),
            }
        }))
    }

    /// Show the music node at `path`, fetching it only on a cache miss
    pub async fn browse(&self, zone: Option<&str>, path: &str) -> Result<BrowseOutcome, DispatchError> {
        let zone = zone.ok_or(DispatchError::NoZoneSelected)?;

        if self.store.read().await.music(path).is_some() {
            debug!(path, "Music cache hit");
            self.notifier.notify(&RenderTarget::Music(path.to_string()));
            return Ok(BrowseOutcome::Cached);
        }

        self.fetch_music(zone, path).await.map(BrowseOutcome::Fetched)
    }

    /// Fetch the music node at `path` and replace any cached copy
    pub async fn fetch_music(&self, zone: &str, path: &str) -> Result<MergeOutcome, DispatchError> {
        let request = ApiRequest::new(What::Music)
            .action("Browse")
            .zone(zone)
            .mpath(path);
        self.fetch_and_merge(request).await
    }

    /// Run a search; results are cached under the search path
    pub async fn search(&self, zone: Option<&str>, term: &str) -> Result<MergeOutcome, DispatchError> {
        let zone = zone.ok_or(DispatchError::NoZoneSelected)?;
        let request = ApiRequest::new(What::Music).zone(zone).msearch(term);
        self.fetch_and_merge(request).await
    }

    async fn fetch_and_merge(&self, request: ApiRequest) -> Result<MergeOutcome, DispatchError> {
        let body = self
            .transport
            .request(RequestKind::Immediate, &request)
            .await?;
        let ctx = NormalizeContext::for_request(&request);
        Ok(merge_and_notify(&self.store, &self.notifier, &body, &ctx).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RequestKind;

    #[test]
    fn test_seek_request() {
        let request = Action::Seek {
            queue_id: "Q:0/7".into(),
        }
        .to_request("RINCON_1");
        assert_eq!(
            request.query_pairs(Some(RequestKind::Immediate)),
            vec![
                ("what", "none".to_string()),
                ("action", "Seek".to_string()),
                ("zone", "RINCON_1".to_string()),
                ("queue", "Q:0/7".to_string()),
                ("nowait", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parameter_mapping() {
        let link = Action::Link { zone: "Den".into() }.to_request("Kitchen");
        assert_eq!(link.link.as_deref(), Some("Den"));

        let save = Action::Save { name: "Friday".into() }.to_request("Kitchen");
        assert_eq!(save.savename.as_deref(), Some("Friday"));

        let add = Action::AddMusic { path: "A:ALBUM/Blue".into() }.to_request("Kitchen");
        assert_eq!(add.action.as_deref(), Some("AddMusic"));
        assert_eq!(add.mpath.as_deref(), Some("A:ALBUM/Blue"));

        assert_eq!(Action::SetVolume(30).to_request("Kitchen").volume, Some(30));
    }

    #[test]
    fn test_optimistic_policy() {
        let config = Config::default();
        assert_eq!(
            Action::VolumeUp.optimistic_edit(&config),
            Some(OptimisticEdit::VolumeStep(5))
        );
        assert_eq!(
            Action::VolumeDown.optimistic_edit(&config),
            Some(OptimisticEdit::VolumeStep(-5))
        );
        assert_eq!(Action::MuteOn.optimistic_edit(&config), Some(OptimisticEdit::Mute(true)));
        assert_eq!(Action::Play.optimistic_edit(&config), None);
        assert_eq!(Action::SetVolume(10).optimistic_edit(&config), None);

        let config = Config {
            optimistic_controls: vec![OptimisticControl::Mute],
            ..Config::default()
        };
        assert_eq!(Action::VolumeUp.optimistic_edit(&config), None);
    }

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("MuchLouder".parse::<Action>(), Ok(Action::VolumeUp));
        assert_eq!("start".parse::<Action>(), Ok(Action::Play));
        assert_eq!(Action::Play.to_string(), "Start");
        assert!("Seek".parse::<Action>().is_err());
    }
}
