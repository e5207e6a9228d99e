//! Fastest to goal.
//!
//! Plain colour targets that never expire. A new one appears every placement
//! interval and after each hit while fewer than `max_lit_for_advance` are
//! showing. The round fails as soon as the whole board is lit.

use tokio::time::Duration;

use crate::core::image::{ImageDescriptor, Rgb};
use crate::core::rng::DeterministicRng;
use crate::game::content::ContentKind;
use crate::game::events::Cue;
use crate::game::placer::{ContentPlacer, PlacementContext, PlacementTrigger};
use crate::game::press::PressTable;
use crate::game::scheduler::Cadence;
use crate::game::score::{format_clock, RoundSummary, ScoreOrder, ScoreRecord};
use crate::game::variants::{GameVariant, RoundRules};

/// Tuning for the fastest-to-goal variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FastestConfig {
    /// Correct presses needed to win
    pub goal: u32,
    /// Time between scheduled placements
    pub placement_interval: Duration,
    /// A hit only lights a new node while fewer than this are lit
    pub max_lit_for_advance: usize,
    /// Pause between the board filling up and the round ending
    pub board_full_delay: Duration,
    /// Smallest usable board
    pub min_nodes: usize,
    /// Target colour
    pub color: Rgb,
}

impl Default for FastestConfig {
    fn default() -> Self {
        Self {
            goal: 100,
            placement_interval: Duration::from_millis(2000),
            max_lit_for_advance: 4,
            board_full_delay: Duration::from_millis(300),
            min_nodes: 3,
            color: Rgb::BLUE,
        }
    }
}

/// Fastest-to-goal variant.
#[derive(Clone, Debug, Default)]
pub struct FastestToGoal {
    config: FastestConfig,
}

impl FastestToGoal {
    /// Variant with custom tuning.
    pub fn new(config: FastestConfig) -> Self {
        Self { config }
    }

    /// Current tuning.
    pub fn config(&self) -> &FastestConfig {
        &self.config
    }
}

struct FastestPlacer {
    max_lit_for_advance: usize,
}

impl ContentPlacer for FastestPlacer {
    fn next(&mut self, ctx: &mut PlacementContext<'_>) {
        if ctx.trigger == PlacementTrigger::Advance
            && ctx.board.active_count() >= self.max_lit_for_advance
        {
            return;
        }
        ctx.place_random(ContentKind::Color, None, None);
    }
}

impl GameVariant for FastestToGoal {
    fn name(&self) -> &'static str {
        "Fastest to Goal"
    }

    fn rules(&self) -> RoundRules {
        RoundRules {
            min_nodes: self.config.min_nodes,
            goal: Some(self.config.goal),
            failure_threshold: None,
            duration: None,
            cadence: Cadence::new(self.config.placement_interval, 1),
            board_full_delay: Some(self.config.board_full_delay),
            press_table: PressTable::default(),
        }
    }

    fn placer(&self) -> Box<dyn ContentPlacer> {
        Box::new(FastestPlacer {
            max_lit_for_advance: self.config.max_lit_for_advance,
        })
    }

    fn image_for(&self, kind: ContentKind, _rng: &mut DeterministicRng) -> ImageDescriptor {
        match kind {
            ContentKind::Off => ImageDescriptor::Blank,
            _ => ImageDescriptor::solid(self.config.color),
        }
    }

    fn clip(&self, cue: Cue) -> Option<&'static str> {
        match cue {
            Cue::RoundStart => Some("start"),
            _ => None,
        }
    }

    fn score_record(&self, summary: &RoundSummary) -> ScoreRecord {
        let goal = summary.goal.unwrap_or(self.config.goal);
        if summary.outcome.failure {
            return ScoreRecord::new(
                self.name(),
                summary,
                summary.elapsed.as_secs_f64(),
                ScoreOrder::LowerIsBetter,
                format!("Got {} of {} before: {}", summary.correct, goal, summary.outcome.reason.message()),
            )
            .unranked();
        }
        ScoreRecord::new(
            self.name(),
            summary,
            summary.elapsed.as_secs_f64(),
            ScoreOrder::LowerIsBetter,
            format!("Got to {} in {}", goal, format_clock(summary.elapsed)),
        )
    }
}
