//! Round Events
//!
//! Lifecycle and scoring events published by a round for the presentation
//! layer, plus the end-of-round taxonomy.

use serde::{Deserialize, Serialize};

use crate::core::node::{NodeId, RoundId};
use crate::game::content::ContentKind;

/// Why a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Correct score reached the goal
    GoalReached,
    /// Duration budget ran out
    TimeUp,
    /// Every node was lit at once
    BoardFull,
    /// Wrong presses exceeded the failure threshold
    TooManyWrong,
    /// A frowny face was pressed
    FrownyFace,
    /// The player closed the round from the UI
    ClosedByPlayer,
}

impl EndReason {
    /// Default failure tag for this reason.
    pub fn is_failure(self) -> bool {
        !matches!(self, EndReason::GoalReached | EndReason::TimeUp)
    }

    /// Human-readable text for logs and records.
    pub fn message(self) -> &'static str {
        match self {
            EndReason::GoalReached => "You won!",
            EndReason::TimeUp => "Time is up",
            EndReason::BoardFull => "All of the nodes are showing something",
            EndReason::TooManyWrong => "Too Many Wrong",
            EndReason::FrownyFace => "It was a frowny Face",
            EndReason::ClosedByPlayer => "Closed by player",
        }
    }
}

/// Terminal result of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// What ended it
    pub reason: EndReason,
    /// Failure vs success tag
    pub failure: bool,
}

impl RoundOutcome {
    /// Outcome tagged with the reason's default failure flag.
    pub fn from_reason(reason: EndReason) -> Self {
        Self {
            reason,
            failure: reason.is_failure(),
        }
    }
}

/// Audio cue; variants map cues to clip ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Round begins
    RoundStart,
    /// Press on a dark node
    Miss,
    /// Frowny face pressed
    FrownyFace,
    /// Wrong limit exceeded
    TooManyWrong,
    /// Bonus round begins
    BonusStart,
    /// Bonus round finished and play resumes
    BonusBeaten,
    /// Crown pressed
    CrownHit,
}

/// Event published on a round's event channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// Round entered Running
    Started {
        /// Round id
        round: RoundId,
        /// Node count at start
        board_size: usize,
    },
    /// Content was placed on a node
    Placed {
        /// Node lit
        node: NodeId,
        /// Kind shown
        kind: ContentKind,
    },
    /// Content expired before anyone pressed it
    Expired {
        /// Node cleared
        node: NodeId,
    },
    /// Correct press
    Hit {
        /// Node pressed
        node: NodeId,
        /// Kind consumed
        kind: ContentKind,
        /// Points awarded
        points: u32,
        /// Correct score after the hit
        correct: u32,
    },
    /// Press on a dark node
    Miss {
        /// Node pressed
        node: NodeId,
        /// Wrong score after the miss
        wrong: u32,
    },
    /// Round paused for a nested bonus round
    BonusEntered {
        /// Nested round id
        child: RoundId,
    },
    /// Score deltas absorbed from an update
    ScoreAdjusted {
        /// Correct delta applied
        correct_delta: u32,
        /// Wrong delta applied
        wrong_delta: u32,
    },
    /// Round resumed after its bonus round
    Resumed {
        /// Correct score after aggregation
        correct: u32,
    },
    /// Round reached its terminal phase
    Ended {
        /// Outcome
        outcome: RoundOutcome,
        /// Final correct score
        correct: u32,
        /// Final wrong score
        wrong: u32,
        /// Persistence reported a new high score
        high_score: bool,
    },
}
