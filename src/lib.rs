//! Sonos Web client - Rust Implementation
//!
//! Keeps a local view of a Sonos Web controller's state in sync and sends
//! user commands to it.
//!
//! This library provides:
//! - Long-poll synchronization gated by the controller's change cursor
//! - Normalization of the controller's several response schemas
//! - Optimistic volume and mute edits, reconciled on the next sync
//! - Render notifications for exactly the parts of the state that changed

// =============================================================================
// Lints - Enforce code quality and consistency
// =============================================================================

// Deny truly dangerous patterns (these will fail the build)
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod session;
pub mod store;
pub mod sync;
pub mod transport;

pub use dispatch::{Action, BrowseOutcome, Dispatcher};
pub use error::{DispatchError, MergeError, SchemaError, SessionError, TransportError};
pub use render::{NoopNotifier, RenderBus, RenderNotifier, SharedNotifier};
pub use session::Session;
pub use store::{ChangeSet, MergeOutcome, OptimisticEdit, StateStore, SyncCursor};
pub use sync::{SyncContext, SyncLoop, SyncState};
pub use transport::{ApiRequest, HttpTransport, RequestKind, Transport, What};

pub use zone_model;
