//! Music catalog types.
//!
//! The catalog is a tree addressed by path strings. A node is fetched with a
//! Browse command and then cached by path until something explicitly asks for
//! that path again.

use serde::{Deserialize, Serialize};

/// Reserved path under which search results are stored
pub const SEARCH_PATH: &str = "*Search*";

/// Classification of a catalog entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Browsable folder (genres, artists, shares, ...)
    #[default]
    Container,
    /// An album: browsable, and can be played or queued as a whole
    Album,
    /// A single track
    Track,
    /// A radio stream: played directly instead of browsed
    Radio,
}

impl NodeKind {
    /// Map a UPnP class string (e.g. `object.container.album.musicAlbum`)
    pub fn from_upnp_class(class: &str) -> Self {
        if class.ends_with("audioBroadcast") {
            Self::Radio
        } else if class.ends_with("musicAlbum") {
            Self::Album
        } else if class.starts_with("object.container") {
            Self::Container
        } else {
            Self::Track
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container | Self::Album)
    }

    /// Whether selecting an entry of this kind should play it rather than browse
    pub fn plays_on_select(&self) -> bool {
        matches!(self, Self::Radio)
    }
}

/// A reference to a child entry of a [`MusicNode`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MusicChild {
    /// Path to browse (or play) this child, already percent-decoded
    pub path: String,

    pub name: String,

    pub artist: Option<String>,

    pub description: Option<String>,

    pub kind: NodeKind,

    pub album_art: Option<String>,
}

/// A fetched catalog node with its ordered children
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MusicNode {
    /// Cache key
    pub path: String,

    pub name: String,

    pub artist: Option<String>,

    pub kind: NodeKind,

    pub album_art: Option<String>,

    /// Root of the catalog (no "back" entry)
    pub is_top: bool,

    pub children: Vec<MusicChild>,
}

impl MusicNode {
    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    pub fn is_search_result(&self) -> bool {
        self.path == SEARCH_PATH
    }
}
