//! Press Resolution
//!
//! Maps the kind a press consumed to what the round should do about it.

use serde::{Deserialize, Serialize};

use crate::game::content::ContentKind;
use crate::game::events::{Cue, EndReason, RoundOutcome};

/// Action chosen for a consumed kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressAction {
    /// Award points; optionally run the next placement cycle right away.
    Hit {
        /// Points added to the correct score
        points: u32,
        /// Run a placement cycle immediately
        advance: bool,
        /// Extra audio cue
        cue: Option<Cue>,
    },
    /// Dark node pressed.
    Miss {
        /// Count it against the wrong score
        penalize: bool,
        /// Run a placement cycle immediately
        advance: bool,
    },
    /// Pause and hand control to a bonus round.
    EnterBonus,
    /// End the round as a failure.
    Fail(EndReason),
}

/// Per-variant values for the shared dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PressTable {
    /// Points per colour hit
    pub color_points: u32,
    /// Colour hits drive pacing
    pub color_advances: bool,
    /// Points for a smily face
    pub smily_points: u32,
    /// Points for a crown
    pub crown_points: u32,
    /// Misses count against the wrong score
    pub penalize_miss: bool,
    /// Misses run a placement cycle
    pub miss_advances: bool,
}

impl Default for PressTable {
    fn default() -> Self {
        Self {
            color_points: 1,
            color_advances: true,
            smily_points: 3,
            crown_points: 20,
            penalize_miss: true,
            miss_advances: false,
        }
    }
}

impl PressTable {
    /// Dispatch a consumed kind.
    pub fn resolve(&self, kind: ContentKind) -> PressAction {
        match kind {
            ContentKind::Off => PressAction::Miss {
                penalize: self.penalize_miss,
                advance: self.miss_advances,
            },
            ContentKind::Color => PressAction::Hit {
                points: self.color_points,
                advance: self.color_advances,
                cue: None,
            },
            ContentKind::Sword => PressAction::EnterBonus,
            ContentKind::Crown => PressAction::Hit {
                points: self.crown_points,
                advance: false,
                cue: Some(Cue::CrownHit),
            },
            ContentKind::FrownyFace => PressAction::Fail(EndReason::FrownyFace),
            ContentKind::SmilyFace => PressAction::Hit {
                points: self.smily_points,
                advance: false,
                cue: None,
            },
        }
    }
}

/// What a press ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PressOutcome {
    /// Round not running; nothing happened
    Ignored,
    /// Correct press
    Hit {
        /// Points awarded
        points: u32,
        /// Correct score after the hit
        correct: u32,
    },
    /// Wrong press (or dark node in a forgiving round)
    Miss {
        /// Wrong score after the miss
        wrong: u32,
    },
    /// Bonus round started
    BonusEntered,
    /// The press ended the round
    Ended {
        /// How it ended
        outcome: RoundOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = PressTable::default();
        assert_eq!(
            table.resolve(ContentKind::Off),
            PressAction::Miss { penalize: true, advance: false }
        );
        assert_eq!(
            table.resolve(ContentKind::Color),
            PressAction::Hit { points: 1, advance: true, cue: None }
        );
        assert_eq!(table.resolve(ContentKind::Sword), PressAction::EnterBonus);
        assert_eq!(
            table.resolve(ContentKind::Crown),
            PressAction::Hit { points: 20, advance: false, cue: Some(Cue::CrownHit) }
        );
        assert_eq!(
            table.resolve(ContentKind::FrownyFace),
            PressAction::Fail(EndReason::FrownyFace)
        );
        assert_eq!(
            table.resolve(ContentKind::SmilyFace),
            PressAction::Hit { points: 3, advance: false, cue: None }
        );
    }

    #[test]
    fn test_forgiving_misses() {
        let table = PressTable {
            penalize_miss: false,
            miss_advances: true,
            ..Default::default()
        };
        assert_eq!(
            table.resolve(ContentKind::Off),
            PressAction::Miss { penalize: false, advance: true }
        );
    }
}
