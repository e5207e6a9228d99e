//! Mixed content.
//!
//! Each cycle lights one random-coloured target, then rolls for a sword
//! (opens a bonus round) and a face. One face in three is frowny and ends
//! the round when pressed; the rest are smily and worth extra points.

use std::sync::Arc;

use tokio::time::Duration;

use crate::core::image::{ImageDescriptor, Pattern, Rgb, Sprite};
use crate::core::node::NodeId;
use crate::core::rng::DeterministicRng;
use crate::game::content::ContentKind;
use crate::game::events::Cue;
use crate::game::placer::{ContentPlacer, PlacementContext, SpecialRule, SpecialTracker};
use crate::game::press::PressTable;
use crate::game::scheduler::Cadence;
use crate::game::score::{format_clock, RoundSummary, ScoreOrder, ScoreRecord};
use crate::game::variants::bonus::{BonusConfig, BonusRound};
use crate::game::variants::{GameVariant, RoundRules};

const SWORD_FAMILY: &[ContentKind] = &[ContentKind::Sword];
const FACE_FAMILY: &[ContentKind] = &[ContentKind::FrownyFace, ContentKind::SmilyFace];

/// Tuning for the mixed-content variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixedConfig {
    /// Scheduler timing
    pub cadence: Cadence,
    /// How long a colour target stays lit
    pub color_ttl: Duration,
    /// Round fails once wrong presses exceed this
    pub wrong_limit: u32,
    /// Points for a smily face
    pub smily_points: u32,
    /// Smallest usable board
    pub min_nodes: usize,
    /// Sword rule
    pub sword: SpecialRule,
    /// Face rule
    pub face: SpecialRule,
    /// Of the faces placed, one in this many is frowny (0 = never)
    pub frowny_one_in: u32,
    /// Round length
    pub duration: Duration,
    /// Correct score that wins
    pub goal: u32,
    /// Tuning of the nested bonus round
    pub bonus: BonusConfig,
}

impl Default for MixedConfig {
    fn default() -> Self {
        Self {
            cadence: Cadence::new(Duration::from_millis(250), 4),
            color_ttl: Duration::from_millis(1500),
            wrong_limit: 5,
            smily_points: 3,
            min_nodes: 2,
            sword: SpecialRule {
                chance_one_in: 10,
                max_per_round: Some(5),
                min_spacing: Duration::from_secs(8),
                ttl: Duration::from_millis(2000),
            },
            face: SpecialRule {
                chance_one_in: 3,
                max_per_round: None,
                min_spacing: Duration::from_secs(2),
                ttl: Duration::from_millis(1500),
            },
            frowny_one_in: 3,
            duration: Duration::from_secs(60),
            goal: 50,
            bonus: BonusConfig::default(),
        }
    }
}

/// Mixed-content variant.
#[derive(Clone, Debug, Default)]
pub struct MixedContent {
    config: MixedConfig,
}

impl MixedContent {
    /// Variant with custom tuning.
    pub fn new(config: MixedConfig) -> Self {
        Self { config }
    }

    /// Current tuning.
    pub fn config(&self) -> &MixedConfig {
        &self.config
    }
}

struct MixedPlacer {
    color_ttl: Duration,
    frowny_one_in: u32,
    sword: SpecialTracker,
    face: SpecialTracker,
    last_color: Option<NodeId>,
}

impl ContentPlacer for MixedPlacer {
    fn next(&mut self, ctx: &mut PlacementContext<'_>) {
        let color = ctx.place_random(ContentKind::Color, Some(self.color_ttl), self.last_color.as_ref());
        if color.is_some() {
            self.last_color = color;
        }
        let exclude = self.last_color.clone();

        self.sword.try_place(ctx, ContentKind::Sword, exclude.as_ref());

        if self.face.admit(ctx) {
            let kind = if ctx.rng.chance(self.frowny_one_in) {
                ContentKind::FrownyFace
            } else {
                ContentKind::SmilyFace
            };
            let ttl = Some(self.face.rule().ttl);
            if ctx.place_random(kind, ttl, exclude.as_ref()).is_some() {
                self.face.record(ctx.now);
            }
        }
    }
}

impl GameVariant for MixedContent {
    fn name(&self) -> &'static str {
        "Mixed Reaction"
    }

    fn rules(&self) -> RoundRules {
        RoundRules {
            min_nodes: self.config.min_nodes,
            goal: Some(self.config.goal),
            failure_threshold: Some(self.config.wrong_limit),
            duration: Some(self.config.duration),
            cadence: self.config.cadence,
            board_full_delay: None,
            press_table: PressTable {
                smily_points: self.config.smily_points,
                ..PressTable::default()
            },
        }
    }

    fn placer(&self) -> Box<dyn ContentPlacer> {
        Box::new(MixedPlacer {
            color_ttl: self.config.color_ttl,
            frowny_one_in: self.config.frowny_one_in,
            sword: SpecialTracker::new(self.config.sword, SWORD_FAMILY),
            face: SpecialTracker::new(self.config.face, FACE_FAMILY),
            last_color: None,
        })
    }

    fn image_for(&self, kind: ContentKind, rng: &mut DeterministicRng) -> ImageDescriptor {
        match kind {
            ContentKind::Off => ImageDescriptor::Blank,
            ContentKind::Sword => ImageDescriptor::sprite(Sprite::Sword),
            ContentKind::FrownyFace => ImageDescriptor::sprite(Sprite::FrownyFace),
            ContentKind::SmilyFace => ImageDescriptor::Pattern {
                pattern: Pattern::PlainSmilyFace,
                color: Rgb::GREEN,
            },
            ContentKind::Crown => ImageDescriptor::sprite(Sprite::Crown),
            ContentKind::Color => ImageDescriptor::solid(Rgb::new(
                rng.next_channel(),
                rng.next_channel(),
                rng.next_channel(),
            )),
        }
    }

    fn clip(&self, cue: Cue) -> Option<&'static str> {
        match cue {
            Cue::RoundStart => Some("start"),
            Cue::FrownyFace | Cue::TooManyWrong => Some("lost-entire-game"),
            Cue::BonusStart => Some("bonus-start"),
            Cue::BonusBeaten => Some("beat-bonus-round"),
            Cue::Miss | Cue::CrownHit => None,
        }
    }

    fn score_record(&self, summary: &RoundSummary) -> ScoreRecord {
        ScoreRecord::new(
            self.name(),
            summary,
            f64::from(summary.correct),
            ScoreOrder::HigherIsBetter,
            format!(
                "{} correct, {} wrong in {}",
                summary.correct,
                summary.wrong,
                format_clock(summary.elapsed)
            ),
        )
    }

    fn bonus_variant(&self) -> Option<Arc<dyn GameVariant>> {
        Some(Arc::new(BonusRound::new(self.config.bonus)))
    }
}
