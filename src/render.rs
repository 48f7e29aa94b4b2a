//! Render notification contract
//!
//! After a merge or optimistic edit changes the store, the session calls
//! [`RenderNotifier::notify`] once per changed target. Notifications carry no
//! data; consumers read the store and must still diff before writing.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;
use zone_model::RenderTarget;

/// Default channel capacity of a [`RenderBus`]
pub const DEFAULT_CAPACITY: usize = 256;

/// Receiver of render notifications.
///
/// Called while the store's write lock is held: implementations must not
/// block or call back into the session.
pub trait RenderNotifier: Send + Sync {
    fn notify(&self, target: &RenderTarget);
}

pub type SharedNotifier = Arc<dyn RenderNotifier>;

/// Publishes render targets on a broadcast channel
#[derive(Clone)]
pub struct RenderBus {
    tx: broadcast::Sender<RenderTarget>,
}

impl RenderBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send a target to all current subscribers
    pub fn publish(&self, target: RenderTarget) {
        if let Err(e) = self.tx.send(target) {
            trace!("No render subscribers: {}", e);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RenderTarget> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RenderBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RenderNotifier for RenderBus {
    fn notify(&self, target: &RenderTarget) {
        self.publish(target.clone());
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl RenderNotifier for NoopNotifier {
    fn notify(&self, _target: &RenderTarget) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bus_delivers_to_subscribers() {
        let bus = RenderBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.notify(&RenderTarget::Zones);
        bus.notify(&RenderTarget::Zone("Kitchen".into()));

        assert_eq!(rx.recv().await.unwrap(), RenderTarget::Zones);
        assert_eq!(rx.recv().await.unwrap(), RenderTarget::Zone("Kitchen".into()));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = RenderBus::default();
        bus.publish(RenderTarget::Zones);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
