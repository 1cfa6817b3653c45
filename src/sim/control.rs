//! Input-driven providers
//!
//! These never finish: they follow the collaborator-supplied signal for as
//! long as the entity lives.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::input::Direction;
use super::trajectory::{Sensors, TrajectoryProvider};
use crate::Rect;
use crate::error::{Result, SimError};

/// Moves with the directional flags, confined to a boundary rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardTrajectory {
    boundary: Rect,
    position: Vec2,
    heading: f32,
    /// Pixels per second
    speed: f32,
    /// Degrees per second while CW/CCW is held
    rotation_speed: f32,
}

impl KeyboardTrajectory {
    pub fn new(boundary: Rect, position: Vec2, speed: f32, rotation_speed: f32) -> Result<Self> {
        if !speed.is_finite() || !rotation_speed.is_finite() {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "keyboard control needs finite speeds (speed {speed}, rotation {rotation_speed})"
            )));
        }
        Ok(Self {
            boundary,
            position,
            heading: 0.0,
            speed,
            rotation_speed,
        })
    }

    pub fn boundary(&self) -> Rect {
        self.boundary
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

impl TrajectoryProvider for KeyboardTrajectory {
    fn advance(&mut self, dt: f32, sensors: &Sensors<'_>) {
        let flags = sensors.input.direction;
        let translation = flags.translation().normalize_or_zero();
        // Clamping only applies while moving; a pose placed outside stays put
        if translation != Vec2::ZERO {
            self.position = self.boundary.clamp(self.position + translation * self.speed * dt);
        }
        if flags.contains(Direction::CW) {
            self.heading += self.rotation_speed * dt;
        }
        if flags.contains(Direction::CCW) {
            self.heading -= self.rotation_speed * dt;
        }
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn finished(&self) -> bool {
        false
    }
}

/// Tracks the pointer, scaled from device units into world pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerTrajectory {
    /// Device units per world pixel
    scale_factor: f32,
    position: Vec2,
    heading: f32,
}

impl PointerTrajectory {
    pub fn new(scale_factor: f32, position: Vec2) -> Result<Self> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "pointer scale factor must be positive, got {scale_factor}"
            )));
        }
        Ok(Self {
            scale_factor,
            position,
            heading: 0.0,
        })
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }
}

impl TrajectoryProvider for PointerTrajectory {
    fn advance(&mut self, _dt: f32, sensors: &Sensors<'_>) {
        // No pointer this tick: hold the last known position
        if let Some(pointer) = sensors.input.pointer {
            self.position = (pointer / self.scale_factor).round();
        }
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn finished(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::input::TickInput;
    use crate::sim::trajectory::NoTargets;

    fn step(p: &mut impl TrajectoryProvider, input: TickInput, dt: f32) {
        let sensors = Sensors {
            input: &input,
            targets: &NoTargets,
        };
        p.advance(dt, &sensors);
    }

    fn held(direction: Direction) -> TickInput {
        TickInput {
            direction,
            ..Default::default()
        }
    }

    #[test]
    fn test_keyboard_diagonal_is_normalized() {
        let mut k = KeyboardTrajectory::new(Rect::screen(), Vec2::new(100.0, 100.0), 150.0, 180.0).unwrap();
        step(&mut k, held(Direction::RIGHT | Direction::DOWN), 1.0);
        let moved = k.position() - Vec2::new(100.0, 100.0);
        assert!((moved.length() - 150.0).abs() < 1e-3);
        assert!((moved.x - moved.y).abs() < 1e-3);
    }

    #[test]
    fn test_keyboard_clamps_to_boundary() {
        let mut k = KeyboardTrajectory::new(Rect::screen(), Vec2::new(10.0, 10.0), 150.0, 180.0).unwrap();
        step(&mut k, held(Direction::LEFT | Direction::UP), 1.0);
        assert_eq!(k.position(), Vec2::ZERO);
        assert!(!k.finished());
    }

    #[test]
    fn test_keyboard_outside_boundary_not_clamped_when_idle() {
        // Intro hands over a pose below the screen; it stays until moved
        let start = Vec2::new(144.0, 300.0);
        let mut k = KeyboardTrajectory::new(Rect::screen(), start, 150.0, 180.0).unwrap();
        step(&mut k, TickInput::default(), 1.0);
        assert_eq!(k.position(), start);
        step(&mut k, held(Direction::UP), 0.01);
        assert_eq!(k.position().y, 288.0);
    }

    #[test]
    fn test_keyboard_rotation() {
        let mut k = KeyboardTrajectory::new(Rect::screen(), Vec2::ZERO, 150.0, 180.0).unwrap();
        step(&mut k, held(Direction::CW), 0.5);
        assert!((k.heading() - 90.0).abs() < 1e-4);
        step(&mut k, held(Direction::CCW), 1.0);
        assert!((k.heading() + 90.0).abs() < 1e-4);
        step(&mut k, held(Direction::CW | Direction::CCW), 1.0);
        assert!((k.heading() + 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_pointer_scales_and_rounds() {
        assert!(PointerTrajectory::new(0.0, Vec2::ZERO).is_err());
        let mut p = PointerTrajectory::new(3.0, Vec2::new(144.0, 144.0)).unwrap();
        step(&mut p, TickInput::default(), 0.1);
        assert_eq!(p.position(), Vec2::new(144.0, 144.0));
        let input = TickInput {
            pointer: Some(Vec2::new(301.0, 32.0)),
            ..Default::default()
        };
        step(&mut p, input, 0.1);
        assert_eq!(p.position(), Vec2::new(100.0, 11.0));
        assert!(!p.finished());
    }
}
