//! Abstract per-tick input signal
//!
//! Device polling lives outside the core; the platform layer folds key and
//! mouse state into a [`TickInput`] once per tick.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Active directional intents for the current tick
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Direction: u8 {
        const UP = 0x01;
        const DOWN = 0x02;
        const LEFT = 0x04;
        const RIGHT = 0x08;
        /// Rotate clockwise (screen space)
        const CW = 0x10;
        /// Rotate counter-clockwise (screen space)
        const CCW = 0x20;
    }
}

impl Direction {
    /// Unnormalized translation vector for the directional flags
    pub fn translation(self) -> Vec2 {
        let mut t = Vec2::ZERO;
        if self.contains(Direction::UP) {
            t.y -= 1.0;
        }
        if self.contains(Direction::DOWN) {
            t.y += 1.0;
        }
        if self.contains(Direction::LEFT) {
            t.x -= 1.0;
        }
        if self.contains(Direction::RIGHT) {
            t.x += 1.0;
        }
        t
    }

    /// Banking direction: -1 left, 1 right, 0 neutral (both or neither pressed)
    pub fn banking(self) -> i8 {
        match (self.contains(Direction::LEFT), self.contains(Direction::RIGHT)) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        }
    }
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Directional flags (keyboard / virtual pad)
    pub direction: Direction,
    /// Primary fire (cannon)
    pub fire: bool,
    /// Secondary fire (turret, aimed at the pointer)
    pub turret_fire: bool,
    /// Pointer position, in pointer-device units
    pub pointer: Option<Vec2>,
}
