//! Core primitives.
//!
//! Identifiers, the seeded RNG behind content placement, and the opaque
//! image payloads the engine hands to the renderer.

pub mod image;
pub mod node;
pub mod rng;

// Re-export core types
pub use image::{ImageDescriptor, Pattern, Rgb, Sprite};
pub use node::{node_range, NodeId, RoundId};
pub use rng::{derive_round_seed, DeterministicRng};
