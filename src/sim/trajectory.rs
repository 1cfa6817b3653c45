//! Trajectory providers
//!
//! Every provider exposes the same four-call contract ([`TrajectoryProvider`]):
//! `advance` mutates, `position`/`heading`/`finished` are pure queries that
//! report the construction pose until the first `advance`.
//!
//! [`Trajectory`] is the closed set of providers an entity can carry. The
//! curve, steering and input-driven providers live in their own modules.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::control::{KeyboardTrajectory, PointerTrajectory};
use super::entity::EntityId;
use super::input::{Direction, TickInput};
use super::steering::{EvadingTrajectory, SeekingTrajectory};
use crate::error::{Result, SimError};
use crate::{heading_to_vector, vector_to_heading};

/// Resolves the live position of a tracked entity (None once it is gone)
pub trait TargetLookup {
    fn target_position(&self, id: EntityId) -> Option<Vec2>;
}

/// Lookup with no live entities, for providers advanced outside a world
pub struct NoTargets;

impl TargetLookup for NoTargets {
    fn target_position(&self, _id: EntityId) -> Option<Vec2> {
        None
    }
}

static IDLE_INPUT: TickInput = TickInput {
    direction: Direction::empty(),
    fire: false,
    turret_fire: false,
    pointer: None,
};

/// Read-only view of the outside world handed to providers each tick
pub struct Sensors<'a> {
    pub input: &'a TickInput,
    pub targets: &'a dyn TargetLookup,
}

impl Sensors<'static> {
    /// No input, no targets
    pub fn idle() -> Self {
        Sensors {
            input: &IDLE_INPUT,
            targets: &NoTargets,
        }
    }
}

/// The motion contract shared by every provider
pub trait TrajectoryProvider {
    /// Move forward by `dt` seconds
    fn advance(&mut self, dt: f32, sensors: &Sensors<'_>);
    /// Current world position
    fn position(&self) -> Vec2;
    /// Current facing angle in degrees
    fn heading(&self) -> f32;
    /// True once the motion law has run its course (monotonic)
    fn finished(&self) -> bool;
}

fn check_speed(speed: f32) -> Result<()> {
    if !speed.is_finite() {
        return Err(SimError::InvalidTrajectoryConfig(format!(
            "speed must be finite, got {speed}"
        )));
    }
    Ok(())
}

/// Constant pose, never finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTrajectory {
    pub position: Vec2,
    pub heading: f32,
}

impl StaticTrajectory {
    pub fn new(position: Vec2, heading: f32) -> Self {
        Self { position, heading }
    }
}

impl TrajectoryProvider for StaticTrajectory {
    fn advance(&mut self, _dt: f32, _sensors: &Sensors<'_>) {}

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

/// Constant-velocity line, toward an end point or along a fixed heading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StraightTrajectory {
    start: Vec2,
    position: Vec2,
    /// Unit direction of travel
    direction: Vec2,
    heading: f32,
    speed: f32,
    /// Degrees per second added to the heading (visual spin only)
    angular_speed: f32,
    /// Distance to the end point; None when driven by a heading alone
    length: Option<f32>,
}

impl StraightTrajectory {
    /// Build from an optional end point or, failing that, an optional heading
    pub fn new(start: Vec2, end: Option<Vec2>, angle: Option<f32>, speed: f32) -> Result<Self> {
        check_speed(speed)?;
        let (direction, heading, length) = match (end, angle) {
            (Some(end), _) => {
                let delta = end - start;
                (delta.normalize_or_zero(), vector_to_heading(delta), Some(delta.length()))
            }
            (None, Some(angle)) => (heading_to_vector(angle), angle, None),
            (None, None) => {
                return Err(SimError::InvalidTrajectoryConfig(
                    "straight trajectory needs an end point or a heading".into(),
                ));
            }
        };
        Ok(Self {
            start,
            position: start,
            direction,
            heading,
            speed,
            angular_speed: 0.0,
            length,
        })
    }

    /// Fly from `start` to `end`, finishing on arrival
    pub fn toward(start: Vec2, end: Vec2, speed: f32) -> Result<Self> {
        Self::new(start, Some(end), None, speed)
    }

    /// Fly forever along `angle`
    pub fn along(start: Vec2, angle: f32, speed: f32) -> Result<Self> {
        Self::new(start, None, Some(angle), speed)
    }

    pub fn with_angular_speed(mut self, angular_speed: f32) -> Self {
        self.angular_speed = angular_speed;
        self
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }
}

impl TrajectoryProvider for StraightTrajectory {
    fn advance(&mut self, dt: f32, _sensors: &Sensors<'_>) {
        self.position += self.direction * self.speed * dt;
        self.heading += self.angular_speed * dt;
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn finished(&self) -> bool {
        match self.length {
            Some(length) => self.position.distance(self.start) >= length,
            None => false,
        }
    }
}

/// One row of the arc-length lookup table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpan {
    /// Cumulative distance where this segment begins
    pub from: f32,
    /// Cumulative distance where this segment ends
    pub to: f32,
    pub a: Vec2,
    pub b: Vec2,
    pub heading: f32,
}

/// Piecewise-linear path through control points at constant speed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTrajectory {
    spans: Vec<SegmentSpan>,
    total_length: f32,
    speed: f32,
    distance: f32,
    /// Position on the centerline (before lateral shift)
    base: Vec2,
    heading: f32,
    /// Perpendicular offset, positive to the right of travel
    shift: f32,
}

impl SegmentTrajectory {
    pub fn new(ctrlpoints: &[Vec2], speed: f32, shift: f32) -> Result<Self> {
        check_speed(speed)?;
        if ctrlpoints.len() < 2 {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "segment path needs at least 2 control points, got {}",
                ctrlpoints.len()
            )));
        }
        if !shift.is_finite() {
            return Err(SimError::InvalidTrajectoryConfig(format!("invalid shift {shift}")));
        }

        let mut spans = Vec::with_capacity(ctrlpoints.len() - 1);
        let mut total_length = 0.0;
        for pair in ctrlpoints.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let length = (b - a).length().round();
            // Degenerate (repeated) points contribute nothing to the path
            if length == 0.0 {
                continue;
            }
            spans.push(SegmentSpan {
                from: total_length,
                to: total_length + length,
                a,
                b,
                heading: vector_to_heading(b - a),
            });
            total_length += length;
        }

        let heading = spans.first().map(|s| s.heading).unwrap_or(0.0);
        Ok(Self {
            spans,
            total_length,
            speed,
            distance: 0.0,
            base: ctrlpoints[0],
            heading,
            shift,
        })
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn spans(&self) -> &[SegmentSpan] {
        &self.spans
    }

    pub fn shift(&self) -> f32 {
        self.shift
    }

    /// Jump to an absolute travelled distance (clamped to the path)
    pub fn seek(&mut self, distance: f32) {
        self.distance = distance.clamp(0.0, self.total_length);
        if let Some(span) = self
            .spans
            .iter()
            .find(|s| s.from <= self.distance && self.distance <= s.to)
        {
            let t = (self.distance - span.from) / (span.to - span.from);
            self.base = span.a.lerp(span.b, t);
            self.heading = span.heading;
        }
    }
}

impl TrajectoryProvider for SegmentTrajectory {
    fn advance(&mut self, dt: f32, _sensors: &Sensors<'_>) {
        self.seek(self.distance + self.speed * dt);
    }

    fn position(&self) -> Vec2 {
        if self.shift != 0.0 {
            self.base + heading_to_vector(90.0 + self.heading) * self.shift
        } else {
            self.base
        }
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn finished(&self) -> bool {
        self.distance >= self.total_length
    }
}

/// Playback over a precomputed (position, heading) sample table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledTrajectory {
    positions: Vec<Vec2>,
    headings: Vec<f32>,
    /// Samples per second
    speed: f32,
    /// Fractional sample cursor
    cursor: f32,
}

impl SampledTrajectory {
    pub fn new(positions: Vec<Vec2>, headings: Vec<f32>, speed: f32) -> Result<Self> {
        check_speed(speed)?;
        if positions.is_empty() || positions.len() != headings.len() {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "sample table needs matching non-empty columns ({} positions, {} headings)",
                positions.len(),
                headings.len()
            )));
        }
        Ok(Self {
            positions,
            headings,
            speed,
            cursor: 0.0,
        })
    }

    /// One-sample table that never advances
    pub fn fixed(position: Vec2, heading: f32) -> Self {
        Self {
            positions: vec![position],
            headings: vec![heading],
            speed: 0.0,
            cursor: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn index(&self) -> usize {
        self.cursor.max(0.0).floor() as usize
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn samples(&self) -> impl Iterator<Item = (Vec2, f32)> + '_ {
        self.positions.iter().copied().zip(self.headings.iter().copied())
    }

    pub fn reset(&mut self) {
        self.cursor = 0.0;
    }

    fn clamped_index(&self) -> usize {
        self.index().min(self.positions.len() - 1)
    }
}

impl TrajectoryProvider for SampledTrajectory {
    fn advance(&mut self, dt: f32, _sensors: &Sensors<'_>) {
        self.cursor += self.speed * dt;
    }

    fn position(&self) -> Vec2 {
        self.positions[self.clamped_index()]
    }

    fn heading(&self) -> f32 {
        self.headings[self.clamped_index()]
    }

    fn finished(&self) -> bool {
        self.index() >= self.positions.len()
    }
}

/// Every motion law an entity can follow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Trajectory {
    Static(StaticTrajectory),
    Straight(StraightTrajectory),
    Segments(SegmentTrajectory),
    Sampled(SampledTrajectory),
    Seeking(SeekingTrajectory),
    Evading(EvadingTrajectory),
    Keyboard(KeyboardTrajectory),
    Pointer(PointerTrajectory),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            Trajectory::Static($p) => $body,
            Trajectory::Straight($p) => $body,
            Trajectory::Segments($p) => $body,
            Trajectory::Sampled($p) => $body,
            Trajectory::Seeking($p) => $body,
            Trajectory::Evading($p) => $body,
            Trajectory::Keyboard($p) => $body,
            Trajectory::Pointer($p) => $body,
        }
    };
}

impl Trajectory {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Trajectory::Static(_) => "static",
            Trajectory::Straight(_) => "straight",
            Trajectory::Segments(_) => "segments",
            Trajectory::Sampled(_) => "sampled",
            Trajectory::Seeking(_) => "seeking",
            Trajectory::Evading(_) => "evading",
            Trajectory::Keyboard(_) => "keyboard",
            Trajectory::Pointer(_) => "pointer",
        }
    }
}

impl TrajectoryProvider for Trajectory {
    fn advance(&mut self, dt: f32, sensors: &Sensors<'_>) {
        // A zero-length tick moves nothing, steering included
        if dt <= 0.0 {
            return;
        }
        dispatch!(self, p => p.advance(dt, sensors))
    }

    fn position(&self) -> Vec2 {
        dispatch!(self, p => p.position())
    }

    fn heading(&self) -> f32 {
        dispatch!(self, p => p.heading())
    }

    fn finished(&self) -> bool {
        dispatch!(self, p => p.finished())
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Trajectory {
            fn from(p: $ty) -> Self {
                Trajectory::$variant(p)
            }
        })*
    };
}

impl_from!(
    Static(StaticTrajectory),
    Straight(StraightTrajectory),
    Segments(SegmentTrajectory),
    Sampled(SampledTrajectory),
    Seeking(SeekingTrajectory),
    Evading(EvadingTrajectory),
    Keyboard(KeyboardTrajectory),
    Pointer(PointerTrajectory),
);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-3;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < EPS
    }

    fn run(p: &mut impl TrajectoryProvider, dt: f32, ticks: usize) {
        let sensors = Sensors::idle();
        for _ in 0..ticks {
            p.advance(dt, &sensors);
        }
    }

    #[test]
    fn test_straight_requires_end_or_angle() {
        let err = StraightTrajectory::new(Vec2::ZERO, None, None, 10.0);
        assert!(matches!(err, Err(SimError::InvalidTrajectoryConfig(_))));
        assert!(StraightTrajectory::along(Vec2::ZERO, 0.0, f32::NAN).is_err());
    }

    #[test]
    fn test_straight_end_to_end() {
        let mut p = StraightTrajectory::toward(Vec2::ZERO, Vec2::new(0.0, 100.0), 50.0).unwrap();
        assert!((p.heading() - 90.0).abs() < EPS);
        run(&mut p, 0.5, 2);
        assert!(close(p.position(), Vec2::new(0.0, 50.0)));
        assert!(!p.finished());
        run(&mut p, 0.5, 2);
        assert!(close(p.position(), Vec2::new(0.0, 100.0)));
        assert!(p.finished());
    }

    #[test]
    fn test_straight_angle_never_finishes() {
        let mut p = StraightTrajectory::along(Vec2::ZERO, -90.0, 600.0)
            .unwrap()
            .with_angular_speed(90.0);
        run(&mut p, 1.0, 10);
        assert!(!p.finished());
        assert!(close(p.position(), Vec2::new(0.0, -6000.0)));
        // Spin changes heading, not travel direction
        assert!((p.heading() - 810.0).abs() < EPS);
    }

    #[test]
    fn test_query_before_advance_returns_initial_pose() {
        let p = StraightTrajectory::toward(Vec2::new(5.0, 5.0), Vec2::new(15.0, 5.0), 1.0).unwrap();
        assert_eq!(p.position(), Vec2::new(5.0, 5.0));
        assert!(p.heading().abs() < EPS);

        let s = SegmentTrajectory::new(&[Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), Vec2::new(10.0, 10.0)], 1.0, 0.0)
            .unwrap();
        assert_eq!(s.position(), Vec2::ZERO);
        assert!((s.heading() - 90.0).abs() < EPS);
    }

    #[test]
    fn test_segments_need_two_points() {
        assert!(SegmentTrajectory::new(&[Vec2::ZERO], 10.0, 0.0).is_err());
    }

    #[test]
    fn test_segments_walk_and_finish() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(30.0, 0.0), Vec2::new(30.0, 40.0)];
        let mut s = SegmentTrajectory::new(&pts, 10.0, 0.0).unwrap();
        assert_eq!(s.total_length(), 70.0);
        run(&mut s, 1.0, 4);
        assert!(close(s.position(), Vec2::new(30.0, 10.0)));
        assert!((s.heading() - 90.0).abs() < EPS);
        run(&mut s, 1.0, 10);
        assert!(s.finished());
        assert!(close(s.position(), Vec2::new(30.0, 40.0)));
        assert_eq!(s.distance(), 70.0);
    }

    #[test]
    fn test_segments_skip_repeated_points() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let mut s = SegmentTrajectory::new(&pts, 5.0, 0.0).unwrap();
        assert_eq!(s.spans().len(), 1);
        run(&mut s, 1.0, 1);
        assert!(close(s.position(), Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn test_segments_shift_is_perpendicular() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)];
        let mut left = SegmentTrajectory::new(&pts, 10.0, -8.0).unwrap();
        let mut right = SegmentTrajectory::new(&pts, 10.0, 8.0).unwrap();
        run(&mut left, 1.0, 3);
        run(&mut right, 1.0, 3);
        // Heading 0 (east): +shift lands at +y
        assert!(close(right.position(), Vec2::new(30.0, 8.0)));
        assert!(close(left.position(), Vec2::new(30.0, -8.0)));
    }

    #[test]
    fn test_sampled_playback() {
        let positions: Vec<Vec2> = (0..10).map(|i| Vec2::new(i as f32, 0.0)).collect();
        let headings = vec![0.0; 10];
        let mut p = SampledTrajectory::new(positions, headings, 4.0).unwrap();
        run(&mut p, 0.5, 1);
        assert_eq!(p.index(), 2);
        assert_eq!(p.position(), Vec2::new(2.0, 0.0));
        // Fractional progress is not lost across ticks
        run(&mut p, 0.125, 2);
        assert_eq!(p.index(), 3);
        run(&mut p, 1.0, 2);
        assert!(p.finished());
        assert_eq!(p.position(), Vec2::new(9.0, 0.0));
        p.reset();
        assert!(!p.finished());
    }

    #[test]
    fn test_sampled_fixed() {
        let mut p = SampledTrajectory::fixed(Vec2::new(3.0, 4.0), 45.0);
        run(&mut p, 1.0, 100);
        assert!(!p.finished());
        assert_eq!(p.heading(), 45.0);
        assert!(SampledTrajectory::new(vec![Vec2::ZERO], vec![], 1.0).is_err());
    }

    #[test]
    fn test_enum_zero_dt_noop() {
        let mut t: Trajectory = StraightTrajectory::along(Vec2::ZERO, 0.0, 100.0).unwrap().into();
        t.advance(0.0, &Sensors::idle());
        assert_eq!(t.position(), Vec2::ZERO);
        assert_eq!(t.kind(), "straight");
    }

    proptest! {
        #[test]
        fn prop_segment_endpoints(
            pts in prop::collection::vec((-300.0f32..300.0, -300.0f32..300.0), 2..12),
            speed in 1.0f32..200.0,
        ) {
            let pts: Vec<Vec2> = pts.into_iter().map(|(x, y)| Vec2::new(x, y)).collect();
            let mut s = SegmentTrajectory::new(&pts, speed, 0.0).unwrap();
            prop_assert!(s.position().distance(pts[0]) < EPS);
            if s.total_length() > 0.0 {
                s.seek(s.total_length());
                let last = s.spans().last().unwrap().b;
                prop_assert!(s.position().distance(last) < 0.01);
                // Trailing sub-pixel segments round away
                prop_assert!(last.distance(*pts.last().unwrap()) < 0.75);
                prop_assert!(s.finished());
            }
        }

        #[test]
        fn prop_segment_shift_magnitude(
            pts in prop::collection::vec((-300.0f32..300.0, -300.0f32..300.0), 2..8),
            shift in -20.0f32..20.0,
            steps in 1usize..50,
        ) {
            let pts: Vec<Vec2> = pts.into_iter().map(|(x, y)| Vec2::new(x, y)).collect();
            let mut center = SegmentTrajectory::new(&pts, 37.0, 0.0).unwrap();
            let mut shifted = SegmentTrajectory::new(&pts, 37.0, shift).unwrap();
            let sensors = Sensors::idle();
            for _ in 0..steps {
                center.advance(0.1, &sensors);
                shifted.advance(0.1, &sensors);
                let offset = shifted.position() - center.position();
                prop_assert!((offset.length() - shift.abs()).abs() < 0.01);
                // Perpendicular to heading
                prop_assert!(offset.dot(heading_to_vector(center.heading())).abs() < 0.01);
            }
        }

        #[test]
        fn prop_straight_finishes_exactly_at_distance(
            ex in -200.0f32..200.0,
            ey in -200.0f32..200.0,
            speed in 5.0f32..100.0,
        ) {
            let end = Vec2::new(ex, ey);
            prop_assume!(end.length() > 1.0);
            let mut p = StraightTrajectory::toward(Vec2::ZERO, end, speed).unwrap();
            let sensors = Sensors::idle();
            let mut ticks = 0;
            while !p.finished() && ticks < 100_000 {
                prop_assert!(p.position().length() < end.length());
                p.advance(1.0 / 60.0, &sensors);
                ticks += 1;
            }
            prop_assert!(p.position().length() >= end.length());
        }
    }
}
