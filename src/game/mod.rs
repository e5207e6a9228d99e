//! Game Engine Module
//!
//! The reaction-game engine: board, scheduler, placement, press handling,
//! round lifecycle and bonus-round composition.
//!
//! ## Module Structure
//!
//! - `content`: Content kinds and per-node button state
//! - `board`: Atomic node → content map
//! - `scheduler`: Cancellable periodic driver
//! - `placer`: Placement contract and special-kind rules
//! - `press`: Press dispatch table and outcomes
//! - `events`: End reasons, audio cues, round events
//! - `score`: Difficulty tiers and score records
//! - `round`: Round state machine and engine
//! - `subgame`: Nested bonus rounds
//! - `variants`: Fastest-to-goal, mixed content, bonus round

pub mod board;
pub mod content;
pub mod events;
pub mod placer;
pub mod press;
pub mod round;
pub mod scheduler;
pub mod score;
pub mod subgame;
pub mod variants;

// Re-export key types
pub use board::BoardState;
pub use content::{ButtonState, ContentKind};
pub use events::{Cue, EndReason, RoundEvent, RoundOutcome};
pub use placer::{ContentPlacer, Placement, PlacementContext, PlacementTrigger, SpecialRule, SpecialTracker};
pub use press::{PressAction, PressOutcome, PressTable};
pub use round::{Completion, Round, RoundConfig, RoundError, RoundPhase, RoundServices, RoundState};
pub use scheduler::{Cadence, ContentScheduler, TickFlow};
pub use score::{difficulty_tier, DifficultyTier, RoundSummary, ScoreOrder, ScoreRecord};
pub use subgame::SubGameHost;
pub use variants::{GameVariant, RoundRules};
