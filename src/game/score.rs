//! Score Records
//!
//! Difficulty tiers and the immutable record handed to persistence at the
//! end of a round.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::game::events::RoundOutcome;

// =============================================================================
// DIFFICULTY
// =============================================================================

/// Board-size bracket used to compare scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DifficultyTier {
    /// Short code
    pub code: &'static str,
    /// Display label
    pub label: &'static str,
}

/// Classify a board size: `<5` Small, `5..=9` Medium, `>=10` Large.
pub fn difficulty_tier(board_size: usize) -> DifficultyTier {
    match board_size {
        0..=4 => DifficultyTier {
            code: "1",
            label: "Small",
        },
        5..=9 => DifficultyTier {
            code: "5",
            label: "Medium",
        },
        _ => DifficultyTier {
            code: "10",
            label: "Large",
        },
    }
}

// =============================================================================
// SCORE RECORD
// =============================================================================

/// Which direction of the normalized score wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrder {
    /// Times: smaller is better
    LowerIsBetter,
    /// Points: larger is better
    HigherIsBetter,
}

impl ScoreOrder {
    /// Ordering that sorts the best score first.
    pub fn rank(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            ScoreOrder::LowerIsBetter => ord,
            ScoreOrder::HigherIsBetter => ord.reverse(),
        }
    }
}

/// Everything a variant needs to build its record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundSummary {
    /// Node count at round start
    pub board_size: usize,
    /// Final correct score
    pub correct: u32,
    /// Final wrong score
    pub wrong: u32,
    /// Goal, if the variant has one
    pub goal: Option<u32>,
    /// Time from start to end
    pub elapsed: Duration,
    /// How the round ended
    pub outcome: RoundOutcome,
}

/// Result of one round, as persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Game the score belongs to
    pub game: String,
    /// Difficulty code
    pub difficulty_code: String,
    /// Difficulty label
    pub difficulty_label: String,
    /// Raw score payload (board size)
    pub score_data: String,
    /// Comparable score
    pub normalized_score: f64,
    /// Direction of `normalized_score`
    pub order: ScoreOrder,
    /// Human-readable summary
    pub description: String,
    /// Eligible for the leaderboard
    #[serde(default = "ranked_by_default")]
    pub ranked: bool,
    /// Wall-clock time the record was built
    pub recorded_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Build a record for `summary`, filling difficulty from the board size.
    pub fn new(
        game: &str,
        summary: &RoundSummary,
        normalized_score: f64,
        order: ScoreOrder,
        description: String,
    ) -> Self {
        let tier = difficulty_tier(summary.board_size);
        Self {
            game: game.to_string(),
            difficulty_code: tier.code.to_string(),
            difficulty_label: tier.label.to_string(),
            score_data: summary.board_size.to_string(),
            normalized_score,
            order,
            description,
            ranked: true,
            recorded_at: Utc::now(),
        }
    }

    /// Keep this record off the leaderboard.
    pub fn unranked(mut self) -> Self {
        self.ranked = false;
        self
    }
}

fn ranked_by_default() -> bool {
    true
}

/// Format a duration as `mm:ss`.
pub fn format_clock(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::EndReason;
    use proptest::prelude::*;

    #[test]
    fn test_difficulty_boundaries() {
        assert_eq!(difficulty_tier(4), DifficultyTier { code: "1", label: "Small" });
        assert_eq!(difficulty_tier(5), DifficultyTier { code: "5", label: "Medium" });
        assert_eq!(difficulty_tier(9), DifficultyTier { code: "5", label: "Medium" });
        assert_eq!(difficulty_tier(10), DifficultyTier { code: "10", label: "Large" });
        assert_eq!(difficulty_tier(0).label, "Small");
    }

    proptest! {
        #[test]
        fn prop_tier_is_monotonic(a in 0usize..64, b in 0usize..64) {
            let rank = |n: usize| difficulty_tier(n).code.parse::<u32>().unwrap();
            if a <= b {
                prop_assert!(rank(a) <= rank(b));
            }
        }
    }

    #[test]
    fn test_score_order() {
        assert_eq!(ScoreOrder::LowerIsBetter.rank(10.0, 20.0), Ordering::Less);
        assert_eq!(ScoreOrder::HigherIsBetter.rank(10.0, 20.0), Ordering::Greater);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(0)), "00:00");
        assert_eq!(format_clock(Duration::from_secs(75)), "01:15");
        assert_eq!(format_clock(Duration::from_millis(59_999)), "00:59");
    }

    #[test]
    fn test_record_fills_difficulty() {
        let summary = RoundSummary {
            board_size: 7,
            correct: 100,
            wrong: 2,
            goal: Some(100),
            elapsed: Duration::from_secs(42),
            outcome: RoundOutcome::from_reason(EndReason::GoalReached),
        };
        let record = ScoreRecord::new("Quickest to 100", &summary, 42.0, ScoreOrder::LowerIsBetter, "x".into());
        assert_eq!(record.difficulty_code, "5");
        assert_eq!(record.difficulty_label, "Medium");
        assert_eq!(record.score_data, "7");
    }
}
