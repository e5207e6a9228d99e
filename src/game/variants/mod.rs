//! Game Variants
//!
//! A variant is the small capability set the shared round engine is
//! parameterized by: placement policy, press table, thresholds, images,
//! audio and the score record it produces.

pub mod bonus;
pub mod fastest;
pub mod mixed;

use std::sync::Arc;

use tokio::time::Duration;

use crate::core::image::ImageDescriptor;
use crate::core::rng::DeterministicRng;
use crate::game::content::ContentKind;
use crate::game::events::Cue;
use crate::game::placer::ContentPlacer;
use crate::game::press::{PressAction, PressTable};
use crate::game::scheduler::Cadence;
use crate::game::score::{RoundSummary, ScoreRecord};

pub use bonus::{BonusConfig, BonusRound};
pub use fastest::{FastestConfig, FastestToGoal};
pub use mixed::{MixedConfig, MixedContent};

/// Thresholds and timing the round engine enforces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundRules {
    /// Smallest board the variant can run on
    pub min_nodes: usize,
    /// Correct score that ends the round as a success
    pub goal: Option<u32>,
    /// Round fails once the wrong score exceeds this
    pub failure_threshold: Option<u32>,
    /// Time budget; the round ends with `TimeUp` when it runs out
    pub duration: Option<Duration>,
    /// Scheduler timing
    pub cadence: Cadence,
    /// Fail when every node is lit, after this settle delay
    pub board_full_delay: Option<Duration>,
    /// Press dispatch values
    pub press_table: PressTable,
}

/// Miss sounds shared by the built-in variants, played in rotation.
pub const MISS_CLIPS: &[&str] = &["wrong-1", "wrong-2", "wrong-3"];

/// Capability set for one game variant.
pub trait GameVariant: Send + Sync + 'static {
    /// Display name, also the leaderboard key.
    fn name(&self) -> &'static str;

    /// Thresholds and timing.
    fn rules(&self) -> RoundRules;

    /// Fresh placement policy for one round.
    fn placer(&self) -> Box<dyn ContentPlacer>;

    /// Map a consumed kind to an action.
    fn resolve_press(&self, kind: ContentKind) -> PressAction {
        self.rules().press_table.resolve(kind)
    }

    /// Image shown for `kind`.
    fn image_for(&self, kind: ContentKind, rng: &mut DeterministicRng) -> ImageDescriptor;

    /// Clip id for a cue, if the variant has one.
    fn clip(&self, _cue: Cue) -> Option<&'static str> {
        None
    }

    /// Miss sounds, played in rotation.
    fn miss_clips(&self) -> &'static [&'static str] {
        MISS_CLIPS
    }

    /// Record persisted when the round ends.
    fn score_record(&self, summary: &RoundSummary) -> ScoreRecord;

    /// Variant started when a sword is pressed.
    fn bonus_variant(&self) -> Option<Arc<dyn GameVariant>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules() {
        let fastest = FastestToGoal::default().rules();
        assert_eq!(fastest.min_nodes, 3);
        assert_eq!(fastest.goal, Some(100));
        assert!(fastest.board_full_delay.is_some());
        assert!(fastest.duration.is_none());

        let mixed = MixedContent::default().rules();
        assert_eq!(mixed.failure_threshold, Some(5));
        assert_eq!(mixed.cadence, Cadence::new(Duration::from_millis(250), 4));

        let bonus = BonusRound::default().rules();
        assert_eq!(bonus.duration, Some(Duration::from_secs(20)));
        assert!(bonus.failure_threshold.is_none());
        assert!(!bonus.press_table.penalize_miss);
    }

    #[test]
    fn test_only_mixed_has_bonus() {
        assert!(MixedContent::default().bonus_variant().is_some());
        assert!(FastestToGoal::default().bonus_variant().is_none());
        assert!(BonusRound::default().bonus_variant().is_none());
    }
}
