//! Message Bus
//!
//! Typed publish/subscribe for the two inbound event kinds: button presses
//! and cross-instance score updates. Every subscriber sees every message
//! published after it subscribed.

use tokio::sync::broadcast;
use tracing::debug;

use crate::core::node::RoundId;
use crate::device::protocol::{AddressedUpdate, InternalUpdate, PressEvent};

/// Default per-topic buffer.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Cloneable handle to the bus; clones share topics.
#[derive(Debug, Clone)]
pub struct MessageBus {
    presses: broadcast::Sender<PressEvent>,
    updates: broadcast::Sender<AddressedUpdate>,
}

impl MessageBus {
    /// Create a bus buffering `capacity` messages per topic.
    pub fn new(capacity: usize) -> Self {
        let (presses, _) = broadcast::channel(capacity.max(1));
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self { presses, updates }
    }

    /// Publish a press. Returns the number of subscribers reached.
    pub fn publish_press(&self, press: PressEvent) -> usize {
        // No subscribers is fine: nobody is playing.
        self.presses.send(press).unwrap_or(0)
    }

    /// Subscribe to presses.
    pub fn subscribe_presses(&self) -> broadcast::Receiver<PressEvent> {
        self.presses.subscribe()
    }

    /// Publish a score update for `target`.
    pub fn publish_update(&self, target: RoundId, update: InternalUpdate) -> usize {
        debug!("Update for round {}: {:?}", target, update);
        self.updates
            .send(AddressedUpdate { target, update })
            .unwrap_or(0)
    }

    /// Subscribe to score updates.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<AddressedUpdate> {
        self.updates.subscribe()
    }

    /// Current press subscriber count.
    pub fn press_subscribers(&self) -> usize {
        self.presses.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
