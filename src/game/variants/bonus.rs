//! Bonus round.
//!
//! Salmon targets plus the occasional short-lived crown. Wrong presses cost
//! nothing and just move play along; only the clock ends the round.

use tokio::time::Duration;

use crate::core::image::{ImageDescriptor, Rgb, Sprite};
use crate::core::rng::DeterministicRng;
use crate::game::content::ContentKind;
use crate::game::events::Cue;
use crate::game::placer::{ContentPlacer, PlacementContext, SpecialRule, SpecialTracker};
use crate::game::press::PressTable;
use crate::game::scheduler::Cadence;
use crate::game::score::{RoundSummary, ScoreOrder, ScoreRecord};
use crate::game::variants::{GameVariant, RoundRules};

const CROWN_FAMILY: &[ContentKind] = &[ContentKind::Crown];

/// Tuning for the bonus round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BonusConfig {
    /// Scheduler timing
    pub cadence: Cadence,
    /// How long a colour target stays lit
    pub color_ttl: Duration,
    /// Points for a colour target
    pub color_points: u32,
    /// Crown rule
    pub crown: SpecialRule,
    /// Points for a crown
    pub crown_points: u32,
    /// Round length
    pub duration: Duration,
    /// Smallest usable board
    pub min_nodes: usize,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            cadence: Cadence::new(Duration::from_millis(250), 4),
            color_ttl: Duration::from_millis(1000),
            color_points: 2,
            crown: SpecialRule {
                chance_one_in: 6,
                max_per_round: None,
                min_spacing: Duration::ZERO,
                ttl: Duration::from_millis(500),
            },
            crown_points: 20,
            duration: Duration::from_secs(20),
            min_nodes: 2,
        }
    }
}

/// Bonus-round variant.
#[derive(Clone, Debug, Default)]
pub struct BonusRound {
    config: BonusConfig,
}

impl BonusRound {
    /// Variant with custom tuning.
    pub fn new(config: BonusConfig) -> Self {
        Self { config }
    }
}

struct BonusPlacer {
    color_ttl: Duration,
    crown: SpecialTracker,
}

impl ContentPlacer for BonusPlacer {
    fn next(&mut self, ctx: &mut PlacementContext<'_>) {
        let crown = self.crown.try_place(ctx, ContentKind::Crown, None);
        ctx.place_random(ContentKind::Color, Some(self.color_ttl), crown.as_ref());
    }
}

impl GameVariant for BonusRound {
    fn name(&self) -> &'static str {
        "Sword Bonus Round"
    }

    fn rules(&self) -> RoundRules {
        RoundRules {
            min_nodes: self.config.min_nodes,
            goal: None,
            failure_threshold: None,
            duration: Some(self.config.duration),
            cadence: self.config.cadence,
            board_full_delay: None,
            press_table: PressTable {
                color_points: self.config.color_points,
                crown_points: self.config.crown_points,
                penalize_miss: false,
                miss_advances: true,
                ..PressTable::default()
            },
        }
    }

    fn placer(&self) -> Box<dyn ContentPlacer> {
        Box::new(BonusPlacer {
            color_ttl: self.config.color_ttl,
            crown: SpecialTracker::new(self.config.crown, CROWN_FAMILY),
        })
    }

    fn image_for(&self, kind: ContentKind, _rng: &mut DeterministicRng) -> ImageDescriptor {
        match kind {
            ContentKind::Off => ImageDescriptor::Blank,
            ContentKind::Crown => ImageDescriptor::sprite(Sprite::Crown),
            ContentKind::Sword => ImageDescriptor::sprite(Sprite::Sword),
            _ => ImageDescriptor::solid(Rgb::SALMON),
        }
    }

    fn clip(&self, cue: Cue) -> Option<&'static str> {
        match cue {
            Cue::RoundStart => Some("bonus-round-start"),
            Cue::CrownHit => Some("hit-the-crown"),
            _ => None,
        }
    }

    fn score_record(&self, summary: &RoundSummary) -> ScoreRecord {
        ScoreRecord::new(
            self.name(),
            summary,
            f64::from(summary.correct),
            ScoreOrder::HigherIsBetter,
            format!("{} points in the bonus round", summary.correct),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::node_range;
    use crate::game::board::BoardState;
    use crate::game::placer::PlacementTrigger;
    use crate::game::press::PressAction;
    use tokio::time::Instant;

    #[test]
    fn test_crown_short_lived() {
        let nodes = node_range("n", 4);
        let board = BoardState::new(&nodes);
        let mut rng = DeterministicRng::new(31);
        let config = BonusConfig {
            crown: SpecialRule {
                chance_one_in: 1,
                ..BonusConfig::default().crown
            },
            ..BonusConfig::default()
        };
        let mut placer = BonusRound::new(config).placer();
        let start = Instant::now();

        let mut ctx = PlacementContext::new(&board, &mut rng, start, PlacementTrigger::Initial);
        placer.next(&mut ctx);
        let placed = ctx.into_placements();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].kind, ContentKind::Crown);
        assert_eq!(placed[1].kind, ContentKind::Color);

        let swept = board.sweep_expired(start + Duration::from_millis(500));
        assert_eq!(swept, vec![placed[0].node.clone()]);
        assert_eq!(board.sweep_expired(start + Duration::from_millis(1000)).len(), 1);
    }

    #[test]
    fn test_misses_are_free() {
        let variant = BonusRound::default();
        assert_eq!(
            variant.resolve_press(ContentKind::Off),
            PressAction::Miss { penalize: false, advance: true }
        );
        assert!(matches!(
            variant.resolve_press(ContentKind::Color),
            PressAction::Hit { points: 2, .. }
        ));
        assert_eq!(
            variant.resolve_press(ContentKind::Crown),
            PressAction::Hit { points: 20, advance: false, cue: Some(Cue::CrownHit) }
        );
    }
}
