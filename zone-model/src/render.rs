//! Render notification targets.
//!
//! A `RenderTarget` names the piece of UI that has to be redrawn after the
//! local state changed. It carries no data: consumers read the current value
//! from the state store.

use serde::{Deserialize, Serialize};

/// What changed, and therefore what a consumer should redraw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id")]
pub enum RenderTarget {
    /// Zone list membership, order, or any listed zone changed
    Zones,

    /// Control data (now playing, volume, mute, mode) for one zone
    Zone(String),

    /// The queue of one zone
    Queue(String),

    /// A music catalog node, by path
    Music(String),
}

impl RenderTarget {
    /// Get the target type as a string (for logging/filtering)
    pub fn target_type(&self) -> &'static str {
        match self {
            Self::Zones => "zones",
            Self::Zone(_) => "zone",
            Self::Queue(_) => "queue",
            Self::Music(_) => "music",
        }
    }

    /// Zone id for zone-scoped targets
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            Self::Zone(id) | Self::Queue(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zones => write!(f, "zones"),
            Self::Zone(id) => write!(f, "zone:{}", id),
            Self::Queue(id) => write!(f, "queue:{}", id),
            Self::Music(path) => write!(f, "music:{}", path),
        }
    }
}
