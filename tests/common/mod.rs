//! Shared test doubles: a scripted in-memory transport and a recording
//! notifier.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sonos_web_client::zone_model::RenderTarget;
use sonos_web_client::{ApiRequest, RenderNotifier, RequestKind, Transport, TransportError, What};
use tokio::sync::Notify;

/// One scripted answer to a sync or browse request
pub enum Reply {
    Body(Value),
    Status(u16),
    /// Answer after a delay
    Delayed(Duration, Value),
    /// Answer once the test releases the gate
    Gated(Arc<Notify>, Value),
}

/// Transport that answers from a script and records every call.
///
/// Commands (`what=none`) are answered with `{}` without consuming the
/// script. When the script runs out, requests never complete, like a long
/// poll nothing ever changes for.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(RequestKind, ApiRequest)>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<(RequestKind, ApiRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls that were commands
    pub fn commands(&self) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|(_, r)| r.what == Some(What::None))
            .map(|(_, r)| r)
            .collect()
    }

    /// Calls other than commands
    pub fn polls(&self) -> Vec<(RequestKind, ApiRequest)> {
        self.calls()
            .into_iter()
            .filter(|(_, r)| r.what != Some(What::None))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(
        &self,
        kind: RequestKind,
        request: &ApiRequest,
    ) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push((kind, request.clone()));

        if request.what == Some(What::None) {
            return Ok(json!({}));
        }

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Status(code)) => Err(TransportError::Status(code)),
            Some(Reply::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Reply::Gated(gate, body)) => {
                gate.notified().await;
                Ok(body)
            }
            None => std::future::pending().await,
        }
    }
}

/// Notifier that keeps every target it was given
#[derive(Default)]
pub struct RecordingNotifier {
    targets: Mutex<Vec<RenderTarget>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn targets(&self) -> Vec<RenderTarget> {
        self.targets.lock().unwrap().clone()
    }

    pub fn count(&self, target: &RenderTarget) -> usize {
        self.targets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == target)
            .count()
    }

    pub fn clear(&self) {
        self.targets.lock().unwrap().clear();
    }
}

impl RenderNotifier for RecordingNotifier {
    fn notify(&self, target: &RenderTarget) {
        self.targets.lock().unwrap().push(target.clone());
    }
}

/// Poll `check` until it holds, failing the test after two seconds
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Upper-snake zone list with one zone
pub fn kitchen(cursor: u64, mode: u8, volume: u8) -> Value {
    json!({
        "LAST_UPDATE": cursor,
        "zones_loop": [{
            "ZONE_MEMBERS": [{
                "ZONE_ID": "Kitchen",
                "ZONE_NAME": "Kitchen",
                "ACTIVE_MODE": mode,
                "ACTIVE_MUTED": 0,
                "ACTIVE_VOLUME": volume,
                "ACTIVE_NAME": "Track A",
                "ACTIVE_ARTIST": "Artist",
                "ACTIVE_ALBUM": "Album"
            }]
        }]
    })
}

/// Nested music node answer
pub fn music(path: &str, children: &[(&str, &str)]) -> Value {
    let items: Vec<Value> = children
        .iter()
        .map(|(id, title)| json!({"id": id, "title": title, "iscontainer": true}))
        .collect();
    json!({"music": {"id": path, "title": path, "items": items}})
}
