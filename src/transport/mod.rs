//! Controller API transport
//!
//! Every interaction with the controller is a GET on a single endpoint with
//! the request described entirely by query parameters. A `wait` request may
//! be held open by the controller until something changes; an `immediate`
//! one is answered right away.

pub mod schema;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::TransportError;
use crate::store::SyncCursor;

pub use schema::{normalize, NormalizeContext, SchemaVariant, Snapshot, ZoneSection};

/// Whether the controller may hold the request open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Long poll: answered when state changes past `lastupdate` or the
    /// controller's own timeout elapses
    Wait,
    /// Answered without blocking (commands, first fetch)
    Immediate,
}

impl RequestKind {
    /// Value of the `nowait` query parameter
    pub fn nowait(&self) -> &'static str {
        match self {
            Self::Wait => "0",
            Self::Immediate => "1",
        }
    }
}

/// Which sections the controller should include in its answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum What {
    Zones,
    Zone,
    Music,
    Queue,
    Globals,
    #[default]
    None,
    All,
}

impl What {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zones => "zones",
            Self::Zone => "zone",
            Self::Music => "music",
            Self::Queue => "queue",
            Self::Globals => "globals",
            Self::None => "none",
            Self::All => "all",
        }
    }
}

impl std::str::FromStr for What {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zones" => Ok(Self::Zones),
            "zone" => Ok(Self::Zone),
            "music" => Ok(Self::Music),
            "queue" => Ok(Self::Queue),
            "globals" => Ok(Self::Globals),
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            other => Err(format!("unknown section: {}", other)),
        }
    }
}

impl std::fmt::Display for What {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of one API call. Unset parameters are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    pub what: Option<What>,
    pub action: Option<String>,
    pub zone: Option<String>,
    pub mpath: Option<String>,
    pub msearch: Option<String>,
    pub queue: Option<String>,
    pub lastupdate: Option<SyncCursor>,
    pub volume: Option<u8>,
    pub link: Option<String>,
    pub savename: Option<String>,
}

impl ApiRequest {
    pub fn new(what: What) -> Self {
        Self {
            what: Some(what),
            ..Default::default()
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn mpath(mut self, path: impl Into<String>) -> Self {
        self.mpath = Some(path.into());
        self
    }

    pub fn msearch(mut self, term: impl Into<String>) -> Self {
        self.msearch = Some(term.into());
        self
    }

    pub fn queue(mut self, queue_id: impl Into<String>) -> Self {
        self.queue = Some(queue_id.into());
        self
    }

    pub fn lastupdate(mut self, cursor: Option<SyncCursor>) -> Self {
        self.lastupdate = cursor;
        self
    }

    pub fn volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn link(mut self, zone: impl Into<String>) -> Self {
        self.link = Some(zone.into());
        self
    }

    pub fn savename(mut self, name: impl Into<String>) -> Self {
        self.savename = Some(name.into());
        self
    }

    /// Query pairs in wire order. `nowait` is only sent when a kind is given.
    pub fn query_pairs(&self, kind: Option<RequestKind>) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(what) = self.what {
            pairs.push(("what", what.as_str().to_string()));
        }
        if let Some(ref action) = self.action {
            pairs.push(("action", action.clone()));
        }
        if let Some(ref zone) = self.zone {
            pairs.push(("zone", zone.clone()));
        }
        if let Some(ref mpath) = self.mpath {
            pairs.push(("mpath", mpath.clone()));
        }
        if let Some(ref msearch) = self.msearch {
            pairs.push(("msearch", msearch.clone()));
        }
        if let Some(ref queue) = self.queue {
            pairs.push(("queue", queue.clone()));
        }
        if let Some(cursor) = self.lastupdate {
            pairs.push(("lastupdate", cursor.to_string()));
        }
        if let Some(kind) = kind {
            pairs.push(("nowait", kind.nowait().to_string()));
        }
        if let Some(volume) = self.volume {
            pairs.push(("volume", volume.to_string()));
        }
        if let Some(ref link) = self.link {
            pairs.push(("link", link.clone()));
        }
        if let Some(ref savename) = self.savename {
            pairs.push(("savename", savename.clone()));
        }
        pairs
    }
}

/// A single round trip to the controller.
///
/// Implementations perform no retries and hold no shared mutable state.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, kind: RequestKind, request: &ApiRequest)
        -> Result<Value, TransportError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for `endpoint` (e.g. `http://host:9999/api`).
    ///
    /// Only a connect timeout is applied: long-poll requests are held open by
    /// the controller for as long as it likes.
    pub fn new(endpoint: &str, connect_timeout: Duration) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(&config.base_url, config.connect_timeout())
    }

    /// Full request URL
    pub fn url_for(&self, kind: Option<RequestKind>, request: &ApiRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in request.query_pairs(kind) {
                query.append_pair(key, &value);
            }
        }
        url
    }

    /// Issue a GET. With `kind == None` the `nowait` parameter is left to the
    /// controller's default (used by the one-shot CLI).
    pub async fn fetch(
        &self,
        kind: Option<RequestKind>,
        request: &ApiRequest,
    ) -> Result<Value, TransportError> {
        let url = self.url_for(kind, request);
        debug!(url = %url, "API request");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let data: Value = serde_json::from_slice(&body)?;

        debug!(
            action = request.action.as_deref().unwrap_or("<none>"),
            bytes = body.len(),
            "API response"
        );

        Ok(data)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        kind: RequestKind,
        request: &ApiRequest,
    ) -> Result<Value, TransportError> {
        self.fetch(Some(kind), request).await
    }
}
