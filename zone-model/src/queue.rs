//! Play queue types.

use serde::{Deserialize, Serialize};

/// One entry of a zone's play queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueItem {
    /// 1-based position in the queue, matched against `Zone::queue_position`
    pub track_num: u32,

    /// Queue entry id, used by the `Seek` command
    pub queue_id: String,

    pub name: String,

    pub artist: String,

    pub album: String,

    pub album_art: Option<String>,
}

/// The full queue of one zone, replaced wholesale on every queue-bearing
/// response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneQueue {
    pub zone_id: String,
    pub items: Vec<QueueItem>,
}

impl ZoneQueue {
    pub fn new(zone_id: impl Into<String>, items: Vec<QueueItem>) -> Self {
        Self {
            zone_id: zone_id.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Find the entry at a given track number
    pub fn item_at(&self, track_num: u32) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.track_num == track_num)
    }
}
