//! Animation tracks and per-entity playheads
//!
//! A track is immutable frame data that may be shared by many entities
//! (`Rc<AnimationTrack>`). Each entity owns its own [`Playhead`], so two ships
//! built from the same track animate independently.

use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Float slack when comparing accumulated frame time against the delay
const FRAME_EPSILON: f32 = 1e-5;

/// A single visual frame: an identifier the renderer resolves plus its pixel size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: u32,
    pub size: Vec2,
}

impl Frame {
    pub fn new(id: u32, width: f32, height: f32) -> Self {
        Self {
            id,
            size: Vec2::new(width, height),
        }
    }
}

/// Immutable frame sequence with uniform per-frame delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    /// Asset name (e.g. "player-ship", "explosion")
    pub name: String,
    frames: Vec<Frame>,
    /// Seconds each frame stays on screen
    delay: f32,
    looping: bool,
}

impl AnimationTrack {
    pub fn new(name: impl Into<String>, frames: Vec<Frame>, delay: f32, looping: bool) -> Result<Self> {
        let name = name.into();
        if frames.is_empty() {
            return Err(SimError::InvalidAnimation(format!("track '{name}' has no frames")));
        }
        if delay.is_nan() || delay < 0.0 {
            return Err(SimError::InvalidAnimation(format!(
                "track '{name}' has invalid delay {delay}"
            )));
        }
        Ok(Self {
            name,
            frames,
            delay,
            looping,
        })
    }

    /// Single frame shown forever (looping, infinite delay, never finished)
    pub fn fixed(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: name.into(),
            frames: vec![frame],
            delay: f32::INFINITY,
            looping: true,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Wrap in an `Rc` for sharing across entities
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

/// Mutable cursor into a shared track
#[derive(Debug, Clone)]
pub struct Playhead {
    track: Rc<AnimationTrack>,
    frame: usize,
    /// Time spent on the current frame
    elapsed: f32,
}

impl Playhead {
    pub fn new(track: Rc<AnimationTrack>) -> Self {
        Self {
            track,
            frame: 0,
            elapsed: 0.0,
        }
    }

    pub fn track(&self) -> &Rc<AnimationTrack> {
        &self.track
    }

    pub fn frame_index(&self) -> usize {
        self.frame
    }

    pub fn current_frame(&self) -> Frame {
        self.track.frames[self.frame]
    }

    /// A non-looping track is finished once the playhead has moved into its
    /// last frame. Looping tracks never finish.
    pub fn is_finished(&self) -> bool {
        !self.track.looping && self.frame + 1 == self.track.len() && self.elapsed > 0.0
    }

    /// Advance by `dt` seconds, stepping as many frames as the time covers.
    /// Finished playheads hold their last frame and ignore further time.
    pub fn advance(&mut self, dt: f32) {
        if dt <= 0.0 || self.is_finished() {
            return;
        }
        let len = self.track.len();
        let delay = self.track.delay;
        self.elapsed += dt;

        if delay <= 0.0 {
            if self.track.looping {
                self.frame = (self.frame + 1) % len;
                self.elapsed = 0.0;
            } else {
                self.frame = len - 1;
            }
            return;
        }

        while self.elapsed + FRAME_EPSILON >= delay {
            if self.track.looping {
                self.frame = (self.frame + 1) % len;
            } else if self.frame + 1 < len {
                self.frame += 1;
            } else {
                break;
            }
            self.elapsed -= delay;
        }
    }

    /// Rewind to the first frame
    pub fn reset(&mut self) {
        self.frame = 0;
        self.elapsed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(frames: u32, delay: f32, looping: bool) -> Rc<AnimationTrack> {
        let frames = (0..frames).map(|i| Frame::new(i, 16.0, 16.0)).collect();
        AnimationTrack::new("test", frames, delay, looping)
            .expect("valid track")
            .shared()
    }

    #[test]
    fn test_rejects_empty_and_negative_delay() {
        assert!(AnimationTrack::new("empty", Vec::new(), 0.1, false).is_err());
        let frames = vec![Frame::new(0, 1.0, 1.0)];
        assert!(AnimationTrack::new("neg", frames, -0.1, false).is_err());
    }

    #[test]
    fn test_non_looping_finishes_on_last_frame() {
        let k = 6;
        let d = 0.1;
        let mut p = Playhead::new(track(k, d, false));
        p.advance((k - 1) as f32 * d + 0.01);
        assert!(p.is_finished());
        assert_eq!(p.frame_index(), (k - 1) as usize);
        assert_eq!(p.current_frame().id, k - 1);

        // Holding: more time changes nothing
        p.advance(5.0);
        assert!(p.is_finished());
        assert_eq!(p.frame_index(), (k - 1) as usize);
    }

    #[test]
    fn test_non_looping_not_finished_early() {
        let mut p = Playhead::new(track(4, 0.1, false));
        p.advance(0.15);
        assert_eq!(p.frame_index(), 1);
        assert!(!p.is_finished());
    }

    #[test]
    fn test_frame_by_frame_ticks() {
        let mut p = Playhead::new(track(3, 0.1, false));
        for _ in 0..2 {
            p.advance(0.1);
        }
        assert_eq!(p.frame_index(), 2);
        p.advance(0.01);
        assert!(p.is_finished());
    }

    #[test]
    fn test_looping_wraps_once() {
        let k = 4;
        let d = 0.25;
        let mut p = Playhead::new(track(k, d, true));
        p.advance(k as f32 * d);
        assert_eq!(p.frame_index(), 0);
        assert!(!p.is_finished());

        // Wraps, doesn't clamp
        let mut p = Playhead::new(track(k, d, true));
        let mut wraps = 0;
        let mut last = 0;
        for _ in 0..k {
            p.advance(d);
            if p.frame_index() < last {
                wraps += 1;
            }
            last = p.frame_index();
        }
        assert_eq!(wraps, 1);
        assert_eq!(p.frame_index(), 0);
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut p = Playhead::new(track(3, 0.1, false));
        p.advance(0.0);
        assert_eq!(p.frame_index(), 0);
        assert!(!p.is_finished());
    }

    #[test]
    fn test_fixed_never_finishes() {
        let mut p = Playhead::new(AnimationTrack::fixed("dot", Frame::new(7, 2.0, 2.0)).shared());
        p.advance(1000.0);
        assert!(!p.is_finished());
        assert_eq!(p.current_frame().id, 7);
    }

    #[test]
    fn test_shared_track_independent_playheads() {
        let t = track(4, 0.1, true);
        let mut a = Playhead::new(Rc::clone(&t));
        let b = Playhead::new(Rc::clone(&t));
        a.advance(0.2);
        assert_eq!(a.frame_index(), 2);
        assert_eq!(b.frame_index(), 0);
    }
}
