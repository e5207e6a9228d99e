//! Output collaborators.
//!
//! The engine never talks to hardware directly; it calls these traits.
//! `ChannelDevice` turns every call into a `DeviceCommand` on an mpsc
//! channel, which is what the demo binary and the tests use.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::core::image::ImageDescriptor;
use crate::core::node::NodeId;
use crate::device::protocol::DeviceCommand;

/// Draws on nodes.
pub trait NodeRenderer: Send + Sync {
    /// Draw `image` on one node.
    fn render_node(&self, node: &NodeId, image: &ImageDescriptor);
    /// Draw `image` on every node.
    fn render_all(&self, image: &ImageDescriptor);
}

/// Plays audio clips. Fire and forget.
pub trait AudioPlayer: Send + Sync {
    /// Start playing `clip_id`.
    fn play_clip(&self, clip_id: &str);
}

/// Status channel to the presentation layer.
pub trait Announcer: Send + Sync {
    /// Publish a status line.
    fn announce(&self, text: &str, is_game_event: bool, high_score: bool);
}

/// Bundle of output collaborators shared by a round and its bonus rounds.
#[derive(Clone)]
pub struct Device {
    /// Renderer
    pub renderer: Arc<dyn NodeRenderer>,
    /// Audio
    pub audio: Arc<dyn AudioPlayer>,
    /// Announcements
    pub announcer: Arc<dyn Announcer>,
}

impl Device {
    /// Use one object for all three roles.
    pub fn from_sink<S>(sink: Arc<S>) -> Self
    where
        S: NodeRenderer + AudioPlayer + Announcer + 'static,
    {
        Self {
            renderer: sink.clone(),
            audio: sink.clone(),
            announcer: sink,
        }
    }

    /// Device that drops everything.
    pub fn null() -> Self {
        Self::from_sink(Arc::new(NullDevice))
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").finish_non_exhaustive()
    }
}

/// Discards all output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDevice;

impl NodeRenderer for NullDevice {
    fn render_node(&self, _node: &NodeId, _image: &ImageDescriptor) {}
    fn render_all(&self, _image: &ImageDescriptor) {}
}

impl AudioPlayer for NullDevice {
    fn play_clip(&self, _clip_id: &str) {}
}

impl Announcer for NullDevice {
    fn announce(&self, _text: &str, _is_game_event: bool, _high_score: bool) {}
}

// =============================================================================
// CHANNEL DEVICE
// =============================================================================

/// Forwards every call as a `DeviceCommand`.
#[derive(Debug, Clone)]
pub struct ChannelDevice {
    tx: mpsc::UnboundedSender<DeviceCommand>,
}

impl ChannelDevice {
    /// Create a device and the receiving end of its command stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeviceCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Wrap in a `Device` bundle.
    pub fn into_device(self) -> Device {
        Device::from_sink(Arc::new(self))
    }

    fn send(&self, cmd: DeviceCommand) {
        if self.tx.send(cmd).is_err() {
            warn!("Device command dropped: receiver closed");
        }
    }
}

impl NodeRenderer for ChannelDevice {
    fn render_node(&self, node: &NodeId, image: &ImageDescriptor) {
        self.send(DeviceCommand::RenderNode {
            node_id: node.clone(),
            image: image.clone(),
        });
    }

    fn render_all(&self, image: &ImageDescriptor) {
        self.send(DeviceCommand::RenderAll {
            image: image.clone(),
        });
    }
}

impl AudioPlayer for ChannelDevice {
    fn play_clip(&self, clip_id: &str) {
        self.send(DeviceCommand::PlayClip {
            clip_id: clip_id.to_string(),
        });
    }
}

impl Announcer for ChannelDevice {
    fn announce(&self, text: &str, is_game_event: bool, high_score: bool) {
        self.send(DeviceCommand::Announce {
            text: text.to_string(),
            is_game_event,
            high_score,
        });
    }
}
