//! Content Kinds
//!
//! What a node currently means to the player.

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// Semantic content shown on a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContentKind {
    /// Dark, nothing to hit
    #[default]
    Off = 0,
    /// Plain hit target
    Color = 1,
    /// Opens the bonus round
    Sword = 2,
    /// Hazard, pressing it loses the round
    FrownyFace = 3,
    /// Small bonus
    SmilyFace = 4,
    /// Large bonus inside the bonus round
    Crown = 5,
}

impl ContentKind {
    /// Is the node showing anything?
    #[inline]
    pub fn is_active(self) -> bool {
        self != ContentKind::Off
    }
}

/// Content of one node plus when it auto-expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonState {
    /// Current content
    pub kind: ContentKind,
    /// Expiry instant; `None` never expires
    pub expires_at: Option<Instant>,
}

impl ButtonState {
    /// Dark node that never expires.
    pub const OFF: ButtonState = ButtonState {
        kind: ContentKind::Off,
        expires_at: None,
    };

    /// Active content expiring `ttl` after `now` (or never).
    pub fn lit(kind: ContentKind, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            kind,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    /// Has this activation expired at `now`?
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.kind.is_active() && self.expires_at.is_some_and(|at| at <= now)
    }
}

impl Default for ButtonState {
    fn default() -> Self {
        Self::OFF
    }
}
