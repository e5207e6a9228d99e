//! # Reaction Games
//!
//! Reaction-game engine for grids of individually addressable illuminated
//! buttons ("nodes").
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      REACTION GAMES                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── node.rs     - Node and round identifiers                │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── image.rs    - Opaque image descriptors                  │
//! │                                                              │
//! │  game/           - Reaction-game engine                      │
//! │  ├── board.rs    - Atomic node → content map                 │
//! │  ├── scheduler.rs- Cancellable periodic driver               │
//! │  ├── placer.rs   - Content placement rules                   │
//! │  ├── press.rs    - Press dispatch                            │
//! │  ├── round.rs    - Round lifecycle and end sequence          │
//! │  ├── subgame.rs  - Nested bonus rounds                       │
//! │  └── variants/   - Fastest / mixed / bonus                   │
//! │                                                              │
//! │  device/         - Collaborators (non-deterministic)         │
//! │  ├── bus.rs      - Press and update topics                   │
//! │  ├── protocol.rs - Wire messages                             │
//! │  └── sink.rs     - Renderer, audio, announcer                │
//! │                                                              │
//! │  store/          - Leaderboard persistence                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Each running round has one scheduler task and one bus listener task.
//! Both touch the same board and scores; every read-then-write on the board
//! is a single locked operation, so an activation is consumed by exactly one
//! of press or expiry, and a round ends exactly once.
//!
//! Placement is seeded: given the same seed and the same presses at the
//! same times, a round lights the same nodes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod device;
pub mod game;
pub mod store;

// Re-export commonly used types
pub use core::node::{NodeId, RoundId};
pub use core::rng::DeterministicRng;
pub use device::{ChannelDevice, Device, DeviceCommand, InternalUpdate, MessageBus, PressEvent};
pub use game::round::{Round, RoundConfig, RoundError, RoundPhase, RoundServices};
pub use game::variants::{BonusRound, FastestToGoal, GameVariant, MixedContent};
pub use store::{InMemoryScoreStore, JsonFileScoreStore, ScoreStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
