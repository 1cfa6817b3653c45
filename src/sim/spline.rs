//! Curve-interpolated paths
//!
//! Control points are fitted with a clamped uniform quadratic B-spline, which
//! is evaluated once and rasterised pixel by pixel into a dense
//! (position, heading) table. Playback is a [`SampledTrajectory`] over that
//! table.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::trajectory::SampledTrajectory;
use crate::error::{Result, SimError};
use crate::vector_to_heading;

/// Highest polynomial degree of the fitted curve
const SPLINE_DEGREE: usize = 2;

/// Smallest parameter step used when evaluating the curve
const MIN_DELTA: f32 = 0.01;

/// A clamped, uniform B-spline over the given control points.
///
/// The curve starts on the first control point and ends on the last one.
/// Two control points degrade to a straight line (degree 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSpline {
    ctrl: Vec<Vec2>,
    knots: Vec<f32>,
    degree: usize,
}

impl BSpline {
    pub fn quadratic(ctrlpoints: &[Vec2]) -> Result<Self> {
        let n = ctrlpoints.len();
        if n < 2 {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "spline needs at least 2 control points, got {n}"
            )));
        }
        let degree = SPLINE_DEGREE.min(n - 1);
        let interior = n - degree;
        let mut knots = Vec::with_capacity(n + degree + 1);
        knots.extend(std::iter::repeat_n(0.0, degree + 1));
        knots.extend((1..interior).map(|i| i as f32 / interior as f32));
        knots.extend(std::iter::repeat_n(1.0, degree + 1));
        Ok(Self {
            ctrl: ctrlpoints.to_vec(),
            knots,
            degree,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn control_points(&self) -> &[Vec2] {
        &self.ctrl
    }

    /// Point on the curve at parameter `u` in [0, 1] (de Boor's algorithm)
    pub fn evaluate(&self, u: f32) -> Vec2 {
        let p = self.degree;
        let n = self.ctrl.len();
        let u = u.clamp(0.0, 1.0);

        let mut k = p;
        while k + 1 < n && self.knots[k + 1] <= u {
            k += 1;
        }

        let mut d: Vec<Vec2> = self.ctrl[k - p..=k].to_vec();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = j + k - p;
                let denom = self.knots[i + p + 1 - r] - self.knots[i];
                let alpha = if denom > 0.0 { (u - self.knots[i]) / denom } else { 0.0 };
                d[j] = d[j - 1].lerp(d[j], alpha);
            }
        }
        d[p]
    }

    /// Parameter step: finer for longer control lists, never below [`MIN_DELTA`]
    pub fn delta(&self) -> f32 {
        (1.0 / (4.0 * self.ctrl.len() as f32)).max(MIN_DELTA)
    }

    /// Evaluate at every `delta` step from 0 to 1 inclusive, snapped to pixels
    pub fn sample(&self) -> Vec<Vec2> {
        let delta = self.delta();
        let steps = (1.0 / delta).ceil() as usize;
        (0..=steps)
            .map(|i| self.evaluate((i as f32 * delta).min(1.0)).round())
            .collect()
    }
}

/// Round a heading to the nearest multiple of `quantum` degrees
pub fn quantize_heading(heading: f32, quantum: f32) -> f32 {
    (heading / quantum).round() * quantum
}

/// Walk consecutive points one whole pixel at a time along the major axis.
///
/// Every pixel carries the heading of its enclosing point pair. The final
/// point is always emitted, so the table ends exactly on the path's end.
pub fn rasterize(points: &[Vec2], quantum: Option<f32>) -> (Vec<Vec2>, Vec<f32>) {
    let mut positions = Vec::new();
    let mut headings = Vec::new();
    let mut last_heading = 0.0;

    for pair in points.windows(2) {
        let (a, b) = (pair[0].round(), pair[1].round());
        let delta = b - a;
        if delta == Vec2::ZERO {
            continue;
        }
        let heading = match quantum {
            Some(q) => quantize_heading(vector_to_heading(delta), q),
            None => vector_to_heading(delta),
        };
        let steps = delta.x.abs().max(delta.y.abs()) as usize;
        for s in 0..steps {
            let t = s as f32 / steps as f32;
            positions.push(a.lerp(b, t).round());
            headings.push(heading);
        }
        last_heading = heading;
    }

    if let Some(&end) = points.last() {
        let end = end.round();
        if positions.last() != Some(&end) {
            positions.push(end);
            headings.push(last_heading);
        }
    }
    (positions, headings)
}

/// Fit, rasterise and wrap a control-point list as a playable path.
///
/// `speed` is in samples (pixels of path) per second.
pub fn spline_trajectory(ctrlpoints: &[Vec2], speed: f32, quantum: Option<f32>) -> Result<SampledTrajectory> {
    if let Some(q) = quantum {
        if !q.is_finite() || q <= 0.0 {
            return Err(SimError::InvalidTrajectoryConfig(format!(
                "heading quantum must be positive, got {q}"
            )));
        }
    }
    let curve = BSpline::quadratic(ctrlpoints)?;
    let (positions, headings) = rasterize(&curve.sample(), quantum);
    SampledTrajectory::new(positions, headings, speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trajectory::{Sensors, TrajectoryProvider};
    use proptest::prelude::*;

    #[test]
    fn test_rejects_short_control_lists() {
        assert!(BSpline::quadratic(&[]).is_err());
        assert!(spline_trajectory(&[Vec2::ZERO], 10.0, None).is_err());
        assert!(spline_trajectory(&[Vec2::ZERO, Vec2::ONE], 10.0, Some(0.0)).is_err());
    }

    #[test]
    fn test_clamped_curve_hits_endpoints() {
        let pts = [Vec2::new(38.0, -10.0), Vec2::new(39.0, 132.0), Vec2::new(140.0, 133.0), Vec2::new(257.0, 298.0)];
        let curve = BSpline::quadratic(&pts).unwrap();
        assert_eq!(curve.degree(), 2);
        assert!(curve.evaluate(0.0).distance(pts[0]) < 1e-3);
        assert!(curve.evaluate(1.0).distance(pts[3]) < 1e-3);
    }

    #[test]
    fn test_three_points_is_bezier() {
        // With three control points the clamped quadratic is a Bezier curve
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(50.0, 100.0), Vec2::new(100.0, 0.0)];
        let curve = BSpline::quadratic(&pts).unwrap();
        assert!(curve.evaluate(0.5).distance(Vec2::new(50.0, 50.0)) < 1e-3);
    }

    #[test]
    fn test_two_points_rasterize_every_pixel() {
        let path = spline_trajectory(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)], 1.0, None).unwrap();
        let xs: Vec<f32> = path.samples().map(|(p, _)| p.x).collect();
        let expected: Vec<f32> = (0..=10).map(|x| x as f32).collect();
        assert_eq!(xs, expected);
        assert!(path.samples().all(|(p, h)| p.y == 0.0 && h == 0.0));
    }

    #[test]
    fn test_major_axis_is_y_for_steep_segments() {
        let (positions, headings) = rasterize(&[Vec2::new(0.0, 0.0), Vec2::new(2.0, 6.0)], None);
        assert_eq!(positions.len(), 7);
        assert_eq!(positions[3], Vec2::new(1.0, 3.0));
        let expected = vector_to_heading(Vec2::new(2.0, 6.0));
        assert!(headings.iter().all(|&h| (h - expected).abs() < 1e-4));
    }

    #[test]
    fn test_quantized_headings() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(100.0, 40.0), Vec2::new(150.0, 150.0)];
        let path = spline_trajectory(&pts, 60.0, Some(18.0)).unwrap();
        for (_, h) in path.samples() {
            let steps = h / 18.0;
            assert!((steps - steps.round()).abs() < 1e-4, "heading {h} not on the 18° grid");
        }
    }

    #[test]
    fn test_playback_finishes() {
        let mut path = spline_trajectory(&[Vec2::new(0.0, 0.0), Vec2::new(0.0, 30.0)], 10.0, None).unwrap();
        assert_eq!(path.len(), 31);
        let sensors = Sensors::idle();
        path.advance(3.0, &sensors);
        assert!(!path.finished());
        assert_eq!(path.position(), Vec2::new(0.0, 30.0));
        path.advance(0.1, &sensors);
        assert!(path.finished());
    }

    proptest! {
        #[test]
        fn prop_raster_is_contiguous(
            pts in prop::collection::vec((-50.0f32..330.0, -50.0f32..330.0), 2..10),
        ) {
            let pts: Vec<Vec2> = pts.into_iter().map(|(x, y)| Vec2::new(x, y)).collect();
            let path = spline_trajectory(&pts, 60.0, None).unwrap();
            let samples: Vec<Vec2> = path.samples().map(|(p, _)| p).collect();
            prop_assert_eq!(samples[0], pts[0].round());
            prop_assert_eq!(*samples.last().unwrap(), pts.last().unwrap().round());
            for w in samples.windows(2) {
                let d = (w[1] - w[0]).abs();
                prop_assert!(d.x <= 1.0 && d.y <= 1.0, "gap between {:?} and {:?}", w[0], w[1]);
            }
        }
    }
}
