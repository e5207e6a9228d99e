//! Protocol Messages
//!
//! Wire format between the engine and the button hardware bridge.
//! All messages serialize as tagged JSON.

use serde::{Deserialize, Serialize};

use crate::core::image::ImageDescriptor;
use crate::core::node::{NodeId, RoundId};

// =============================================================================
// INBOUND
// =============================================================================

/// Extra detail the firmware reports with a press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressMetadata {
    /// How long the button was held (ms)
    pub held_ms: u32,
    /// Time since the node was last lit, if the firmware tracks it (ms)
    pub since_lit_ms: Option<u32>,
}

/// A physical button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressEvent {
    /// Node pressed
    pub node_id: NodeId,
    /// Firmware detail
    #[serde(default)]
    pub metadata: PressMetadata,
}

impl PressEvent {
    /// Press with no metadata.
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            metadata: PressMetadata::default(),
        }
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Score deltas reported by a nested round (or another instance).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalUpdate {
    /// Added to the receiver's correct score
    pub correct_delta: u32,
    /// Added to the receiver's wrong score
    pub wrong_delta: u32,
    /// The reporting round has finished
    pub ended: bool,
    /// Free-form note for logs
    pub note: String,
}

impl InternalUpdate {
    /// Final report from a finished round.
    pub fn completed(correct_delta: u32, wrong_delta: u32, note: impl Into<String>) -> Self {
        Self {
            correct_delta,
            wrong_delta,
            ended: true,
            note: note.into(),
        }
    }

    /// Score-only adjustment.
    pub fn adjustment(correct_delta: u32, wrong_delta: u32) -> Self {
        Self {
            correct_delta,
            wrong_delta,
            ended: false,
            note: String::new(),
        }
    }
}

/// Cross-instance update routed to one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedUpdate {
    /// Round that should absorb it
    pub target: RoundId,
    /// Payload
    pub update: InternalUpdate,
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Command for the hardware bridge or the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceCommand {
    /// Draw on one node.
    RenderNode {
        /// Target node
        node_id: NodeId,
        /// What to draw
        image: ImageDescriptor,
    },
    /// Draw the same image on every node.
    RenderAll {
        /// What to draw
        image: ImageDescriptor,
    },
    /// Play an audio clip; fire and forget.
    PlayClip {
        /// Clip id
        clip_id: String,
    },
    /// Status line for the presentation layer.
    Announce {
        /// Message
        text: String,
        /// Belongs to the game's own event stream
        is_game_event: bool,
        /// A new high score was set
        high_score: bool,
    },
}

impl DeviceCommand {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
