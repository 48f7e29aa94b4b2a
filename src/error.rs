//! Error types for the sync engine.
//!
//! Transport failures, schema rejections and local command refusals are kept
//! apart so callers can tell "retry later" from "the server sent garbage"
//! from "ask the user to pick a zone".

use thiserror::Error;

/// Failure of a single API round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("controller returned HTTP {0}")]
    Status(u16),

    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A response body that does not match any known schema variant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("section `{section}` has the wrong type: expected {expected}")]
    WrongType {
        section: String,
        expected: &'static str,
    },

    #[error("{section} entry has no id")]
    MissingId { section: &'static str },

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: String, value: i64 },

    #[error("queue has no owning zone")]
    OrphanQueue,

    #[error("invalid cursor value: {0}")]
    InvalidCursor(String),
}

/// A snapshot rejected by the store. The store is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("duplicate zone id in snapshot: {0}")]
    DuplicateZone(String),
}

/// A user action that could not be sent.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No zone is selected; the UI should prompt the user to pick one.
    #[error("Please select a Zone first.")]
    NoZoneSelected,

    #[error("unknown zone: {0}")]
    UnknownZone(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Session lifecycle misuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("sync loop already started")]
    AlreadyStarted,
}

impl DispatchError {
    /// Whether this is the "select a zone" signal rather than a failure
    pub fn is_select_zone(&self) -> bool {
        matches!(self, Self::NoZoneSelected)
    }
}
