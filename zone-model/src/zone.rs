//! Zone and playback types.
//!
//! A zone is the unit the controller addresses commands to: a single speaker
//! or a group of linked speakers following one leader.

use serde::{Deserialize, Serialize};

/// Upper bound of the controller's volume scale (the lower bound is 0)
pub const MAX_VOLUME: u8 = 100;

/// Canonical zone representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    /// Controller-issued zone identifier
    pub zone_id: String,

    /// Human-readable zone name
    pub zone_name: String,

    /// Icon name as reported by the controller (e.g. "kitchen")
    pub icon: Option<String>,

    /// Whether this zone is linked into another zone's group
    pub linked: bool,

    /// Number of zones following this one
    pub num_linked: u32,

    /// Current playback mode
    pub mode: PlaybackMode,

    /// Whether output is muted
    pub muted: bool,

    /// Volume on a 0-100 scale
    pub volume: u8,

    /// Now playing information
    pub track: CurrentTrack,

    /// Queue track number of the active item, if any
    pub queue_position: Option<u32>,
}

impl Zone {
    /// Create a stopped, empty zone
    pub fn new(zone_id: impl Into<String>, zone_name: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            zone_name: zone_name.into(),
            ..Default::default()
        }
    }

    /// Name shown in zone lists: "Kitchen + 2" when other zones follow it
    pub fn display_name(&self) -> String {
        if self.num_linked > 0 {
            format!("{} + {}", self.zone_name, self.num_linked)
        } else {
            self.zone_name.clone()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.mode == PlaybackMode::Playing
    }

    /// Whether the queue item with `track_num` is the one the zone is on
    pub fn is_active_track(&self, track_num: u32) -> bool {
        self.queue_position == Some(track_num)
    }
}

/// Playback mode enumeration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackMode {
    /// Decode the numeric transport mode used by the flat response shapes
    /// (0 = stopped, 1 = playing, 2 = paused).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Stopped),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

impl From<&str> for PlaybackMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "playing" | "play" => Self::Playing,
            "paused" | "pause" | "paused_playback" => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// Now playing information for a zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentTrack {
    /// Track title (empty when nothing is loaded)
    pub name: String,

    pub album: String,

    pub artist: String,

    /// Album art URL or controller-relative reference
    pub album_art: Option<String>,

    /// Whether the source is a radio stream rather than a queue item
    pub is_radio: bool,
}

impl CurrentTrack {
    /// True when the zone has nothing loaded
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.album.is_empty() && self.artist.is_empty()
    }
}
