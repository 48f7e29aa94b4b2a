//! Change cursor issued by the controller.

use serde::{Deserialize, Serialize};

/// Opaque, server-issued state version.
///
/// In practice it is a numeric timestamp. The store only ever moves it
/// forward; it is echoed back as `lastupdate` to ask for changes since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncCursor(u64);

impl SyncCursor {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for SyncCursor {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
