//! Sky Raid - kinematic and behavioral core of a 2D arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (trajectories, animation, scripts, director)
//! - `tuning`: Data-driven game balance
//! - `error`: Construction-time error taxonomy
//!
//! Angles are in degrees. Screen space has +y pointing down, so a heading of
//! 90° points toward the bottom of the screen.

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{Result, SimError};
pub use tuning::Tuning;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, the frame rate the arcade feel was tuned at)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Logical screen dimensions (pixels)
    pub const SCREEN_WIDTH: f32 = 288.0;
    pub const SCREEN_HEIGHT: f32 = 288.0;

    /// Distance outside the screen at which spawned actors appear/leave
    pub const OFF_SCREEN_OFFSET: f32 = 10.0;
}

/// Wrap an angle in degrees to [-180, 180)
#[inline]
pub fn normalize_degrees(mut angle: f32) -> f32 {
    while angle >= 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }
    angle
}

/// Unit vector for a heading in degrees
#[inline]
pub fn heading_to_vector(degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

/// Heading in degrees of a direction vector (0 for the zero vector)
#[inline]
pub fn vector_to_heading(v: Vec2) -> f32 {
    v.y.atan2(v.x).to_degrees()
}

/// Axis-aligned rectangle in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    /// Rectangle of the given size centered on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - size / 2.0,
            max: center + size / 2.0,
        }
    }

    /// The full logical screen
    pub fn screen() -> Self {
        Self::new(0.0, 0.0, consts::SCREEN_WIDTH, consts::SCREEN_HEIGHT)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Clamp a point into the rectangle (edges inclusive)
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(190.0), -170.0);
        assert_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees(180.0), -180.0);
        assert_eq!(normalize_degrees(45.0), 45.0);
        assert_eq!(normalize_degrees(720.0 + 10.0), 10.0);
    }

    #[test]
    fn test_heading_round_trip_axes() {
        // Screen space: 90° points down
        let down = heading_to_vector(90.0);
        assert!(down.x.abs() < 1e-6 && (down.y - 1.0).abs() < 1e-6);
        assert!((vector_to_heading(Vec2::new(0.0, -5.0)) + 90.0).abs() < 1e-4);
        assert!((vector_to_heading(Vec2::new(-1.0, 0.0)).abs() - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_rect_clamp_and_center() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(r.center(), Vec2::new(50.0, 25.0));
        assert_eq!(r.clamp(Vec2::new(-5.0, 80.0)), Vec2::new(0.0, 50.0));
        assert!(r.contains(Vec2::new(100.0, 50.0)));
        assert!(!r.contains(Vec2::new(100.1, 50.0)));
    }

    #[test]
    fn test_rect_from_center() {
        let r = Rect::from_center(Vec2::new(10.0, 10.0), Vec2::new(4.0, 6.0));
        assert_eq!(r.min, Vec2::new(8.0, 7.0));
        assert_eq!(r.size(), Vec2::new(4.0, 6.0));
        assert!(r.intersects(&Rect::new(11.0, 12.0, 5.0, 5.0)));
        assert!(!r.intersects(&Rect::new(13.0, 13.0, 5.0, 5.0)));
    }
}
