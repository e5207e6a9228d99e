//! Content Placement
//!
//! Shared contract for the per-variant placement policies, plus the
//! bookkeeping for optional "special" kinds (sword, faces, crown).
//!
//! Rules every placer follows:
//! - only dark nodes are ever activated
//! - a special kind fires through a `chance(1/n)` gate
//! - a special kind respects its per-round cap, its minimum spacing from the
//!   previous occurrence, and never overlaps a live occurrence of its family

use tokio::time::{Duration, Instant};

use crate::core::node::NodeId;
use crate::core::rng::DeterministicRng;
use crate::game::board::BoardState;
use crate::game::content::ContentKind;

/// Why a placement cycle runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementTrigger {
    /// First cycle when the round starts
    Initial,
    /// Scheduler tick
    Scheduled,
    /// A colour hit advanced the cycle early
    Advance,
    /// Play resumed after a bonus round
    Resumed,
}

/// One node newly lit this cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Node lit
    pub node: NodeId,
    /// Kind placed
    pub kind: ContentKind,
}

/// Everything a placer sees during one cycle.
pub struct PlacementContext<'a> {
    /// Current board
    pub board: &'a BoardState,
    /// Round RNG
    pub rng: &'a mut DeterministicRng,
    /// Cycle time
    pub now: Instant,
    /// Why the cycle runs
    pub trigger: PlacementTrigger,
    placed: Vec<Placement>,
}

impl<'a> PlacementContext<'a> {
    /// Start a cycle.
    pub fn new(
        board: &'a BoardState,
        rng: &'a mut DeterministicRng,
        now: Instant,
        trigger: PlacementTrigger,
    ) -> Self {
        Self {
            board,
            rng,
            now,
            trigger,
            placed: Vec::new(),
        }
    }

    /// Light a random dark node, skipping `exclude`. Returns the node lit.
    pub fn place_random(
        &mut self,
        kind: ContentKind,
        ttl: Option<Duration>,
        exclude: Option<&NodeId>,
    ) -> Option<NodeId> {
        let candidates = self.board.off_nodes(exclude);
        let node = self.rng.choose(&candidates)?.clone();
        if self.place_at(&node, kind, ttl) {
            Some(node)
        } else {
            None
        }
    }

    /// Light a specific node if it is dark.
    pub fn place_at(&mut self, node: &NodeId, kind: ContentKind, ttl: Option<Duration>) -> bool {
        if self.board.place(node, kind, ttl, self.now) {
            self.placed.push(Placement {
                node: node.clone(),
                kind,
            });
            true
        } else {
            false
        }
    }

    /// Finish the cycle.
    pub fn into_placements(self) -> Vec<Placement> {
        self.placed
    }
}

/// Variant-specific placement policy. One instance lives for one round.
pub trait ContentPlacer: Send {
    /// Choose and place this cycle's content (0-2 nodes typically).
    fn next(&mut self, ctx: &mut PlacementContext<'_>);
}

// =============================================================================
// SPECIAL KINDS
// =============================================================================

/// Constraints for one optional kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialRule {
    /// Fires with probability `1 / chance_one_in` (0 = never)
    pub chance_one_in: u32,
    /// Cap per round
    pub max_per_round: Option<u32>,
    /// Minimum time since the previous occurrence
    pub min_spacing: Duration,
    /// How long it stays lit
    pub ttl: Duration,
}

impl SpecialRule {
    /// Rule that never fires.
    pub const NEVER: SpecialRule = SpecialRule {
        chance_one_in: 0,
        max_per_round: None,
        min_spacing: Duration::ZERO,
        ttl: Duration::ZERO,
    };
}

/// Per-round state for one special rule.
#[derive(Clone, Debug)]
pub struct SpecialTracker {
    rule: SpecialRule,
    family: &'static [ContentKind],
    placed: u32,
    last_at: Option<Instant>,
}

impl SpecialTracker {
    /// Track `rule`; `family` are the kinds that count as a live occurrence.
    pub fn new(rule: SpecialRule, family: &'static [ContentKind]) -> Self {
        Self {
            rule,
            family,
            placed: 0,
            last_at: None,
        }
    }

    /// Roll the gate, then check cap, spacing and exclusion.
    pub fn admit(&mut self, ctx: &mut PlacementContext<'_>) -> bool {
        if !ctx.rng.chance(self.rule.chance_one_in) {
            return false;
        }
        if self.rule.max_per_round.is_some_and(|max| self.placed >= max) {
            return false;
        }
        if let Some(last) = self.last_at {
            if ctx.now.saturating_duration_since(last) < self.rule.min_spacing {
                return false;
            }
        }
        ctx.board.count_kinds(self.family) == 0
    }

    /// Note an occurrence placed at `now`.
    pub fn record(&mut self, now: Instant) {
        self.placed += 1;
        self.last_at = Some(now);
    }

    /// Admit and, if allowed, place `kind` on a random dark node.
    pub fn try_place(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        kind: ContentKind,
        exclude: Option<&NodeId>,
    ) -> Option<NodeId> {
        if !self.admit(ctx) {
            return None;
        }
        let node = ctx.place_random(kind, Some(self.rule.ttl), exclude)?;
        self.record(ctx.now);
        Some(node)
    }

    #[cfg(test)]
    fn placed(&self) -> u32 {
        self.placed
    }

    /// The rule being tracked.
    pub fn rule(&self) -> &SpecialRule {
        &self.rule
    }
}
