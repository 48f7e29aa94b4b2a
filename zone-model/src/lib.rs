//! Canonical types for the Sonos Web client.
//!
//! Every response shape the controller has ever produced is normalized into
//! these types before it reaches the state store, so UI consumers only ever
//! see one representation.
//!
//! # Modules
//! - [`zone`] - Zones, playback mode and the current track
//! - [`queue`] - Per-zone play queues
//! - [`music`] - Music catalog nodes
//! - [`render`] - Render notification targets

pub mod music;
pub mod queue;
pub mod render;
pub mod zone;

// Re-export commonly used types at crate root
pub use music::{MusicChild, MusicNode, NodeKind, SEARCH_PATH};
pub use queue::{QueueItem, ZoneQueue};
pub use render::RenderTarget;
pub use zone::{CurrentTrack, PlaybackMode, Zone, MAX_VOLUME};
