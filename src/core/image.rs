//! Image Descriptors
//!
//! Opaque payloads handed to the rendering collaborator. The engine picks
//! a descriptor per content kind and never looks inside it again.

use serde::{Deserialize, Serialize};

/// 24-bit colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Build a colour from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Win / high-score flash.
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    /// Loss flash.
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    /// Fastest-to-goal target colour.
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    /// Bonus round target colour.
    pub const SALMON: Rgb = Rgb::new(255, 120, 120);
}

/// Built-in patterns understood by the button firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Every pixel the same colour
    AllOneColor,
    /// Simple smiling face
    PlainSmilyFace,
}

/// Named sprites decoded by the rendering collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sprite {
    /// Sword that opens the bonus round
    Sword,
    /// Frowning face that ends the round
    FrownyFace,
    /// Crown worth bonus points
    Crown,
}

/// What to draw on a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[derive(Default)]
pub enum ImageDescriptor {
    /// Node dark.
    #[default]
    Blank,
    /// Firmware pattern in one colour.
    Pattern {
        /// Pattern to draw
        pattern: Pattern,
        /// Colour to draw it in
        color: Rgb,
    },
    /// Pre-decoded sprite.
    Sprite {
        /// Sprite name
        sprite: Sprite,
    },
    /// Raw 8x8 pixel rows, already encoded by an upstream collaborator.
    Raw {
        /// Encoded pixel rows
        pixels: Vec<u64>,
    },
}

impl ImageDescriptor {
    /// Whole node lit in one colour.
    pub fn solid(color: Rgb) -> Self {
        Self::Pattern {
            pattern: Pattern::AllOneColor,
            color,
        }
    }

    /// Named sprite.
    pub fn sprite(sprite: Sprite) -> Self {
        Self::Sprite { sprite }
    }

    /// Is this the dark image?
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}
