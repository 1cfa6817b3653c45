//! Target-aware providers: pursuit and evasion
//!
//! Both read the tracked entity through [`Sensors::targets`]. A target that
//! has died is not an error: the provider keeps its last heading and flies on
//! in a straight line.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::trajectory::{Sensors, TrajectoryProvider};
use crate::error::{Result, SimError};
use crate::{Rect, heading_to_vector, normalize_degrees, vector_to_heading};

/// How the turn cap of a pursuing provider scales with time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TurnRate {
    /// Degrees per `advance` call regardless of `dt` (frame-rate dependent,
    /// the arcade behavior the balance numbers were tuned with)
    PerTick(f32),
    /// Degrees per second, scaled by `dt`
    PerSecond(f32),
}

impl TurnRate {
    /// Maximum turn allowed for one advance of `dt` seconds
    pub fn cap(&self, dt: f32) -> f32 {
        match *self {
            TurnRate::PerTick(deg) => deg,
            TurnRate::PerSecond(deg) => deg * dt,
        }
    }
}

/// Pursuit: turns toward a live target at a capped rate, always moving forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeekingTrajectory {
    position: Vec2,
    heading: f32,
    direction: Vec2,
    speed: f32,
    turn_rate: TurnRate,
    target: EntityId,
    /// Travel budget; None pursues forever
    length: Option<f32>,
    travelled: f32,
}

impl SeekingTrajectory {
    pub fn new(start: Vec2, heading: f32, speed: f32, turn_rate: TurnRate, target: EntityId) -> Result<Self> {
        let cap = turn_rate.cap(1.0);
        if !speed.is_finite() || !cap.is_finite() || cap < 0.0 {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "seeking needs finite speed and non-negative turn rate (speed {speed}, turn {cap})"
            )));
        }
        Ok(Self {
            position: start,
            heading,
            direction: heading_to_vector(heading),
            speed,
            turn_rate,
            target,
            length: None,
            travelled: 0.0,
        })
    }

    /// Finish after travelling `length` pixels
    pub fn with_length(mut self, length: f32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn travelled(&self) -> f32 {
        self.travelled
    }

    fn steer(&mut self, target: Vec2, dt: f32) {
        let to_target = target - self.position;
        if to_target == Vec2::ZERO {
            return;
        }
        let desired = vector_to_heading(to_target);
        let diff = normalize_degrees(desired - self.heading);
        let cap = self.turn_rate.cap(dt);
        self.heading = if diff.abs() <= cap {
            desired
        } else {
            normalize_degrees(self.heading + cap.copysign(diff))
        };
        self.direction = heading_to_vector(self.heading);
    }
}

impl TrajectoryProvider for SeekingTrajectory {
    fn advance(&mut self, dt: f32, sensors: &Sensors<'_>) {
        if let Some(target) = sensors.targets.target_position(self.target) {
            self.steer(target, dt);
        }
        self.position += self.direction * self.speed * dt;
        self.travelled += self.speed * dt;
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn finished(&self) -> bool {
        self.length.is_some_and(|length| self.travelled >= length)
    }
}

/// Evasion: heads for the rim point of `bounds` opposite the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvadingTrajectory {
    position: Vec2,
    heading: f32,
    direction: Vec2,
    speed: f32,
    target: EntityId,
    bounds: Rect,
}

impl EvadingTrajectory {
    pub fn new(start: Vec2, heading: f32, speed: f32, target: EntityId, bounds: Rect) -> Result<Self> {
        if !speed.is_finite() {
            return Err(SimError::InvalidTrajectoryConfig(format!("invalid speed {speed}")));
        }
        Ok(Self {
            position: start,
            heading,
            direction: Vec2::ZERO,
            speed,
            target,
            bounds,
        })
    }

    /// Escape point: on the circle inscribed in `bounds`, away from the threat
    fn escape_point(&self, threat: Vec2) -> Option<Vec2> {
        let center = self.bounds.center();
        let away = center - threat;
        if away.length() > 0.0 {
            Some(away.normalize() * (self.bounds.width() / 2.0) + center)
        } else {
            None
        }
    }
}

impl TrajectoryProvider for EvadingTrajectory {
    fn advance(&mut self, dt: f32, sensors: &Sensors<'_>) {
        if let Some(threat) = sensors.targets.target_position(self.target) {
            if let Some(goal) = self.escape_point(threat) {
                let dir = (goal - self.position).normalize_or_zero();
                if dir != Vec2::ZERO {
                    self.direction = dir;
                    self.heading = vector_to_heading(dir);
                }
            }
        }
        self.position += self.direction * self.speed * dt;
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
