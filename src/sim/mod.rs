//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or device dependencies

pub mod actors;
pub mod animation;
pub mod arsenal;
pub mod control;
pub mod director;
pub mod entity;
pub mod input;
pub mod script;
pub mod spline;
pub mod steering;
pub mod tick;
pub mod trajectory;
pub mod world;

pub use animation::{AnimationTrack, Frame, Playhead};
pub use arsenal::{Loadout, Pilot, PowerSource, ShotSpec};
pub use control::{KeyboardTrajectory, PointerTrajectory};
pub use entity::{ActorKind, EndAction, EntityId, Group, KinematicEntity, RenderPose};
pub use input::{Direction, TickInput};
pub use script::{BoxScript, Poll, Script, ScriptRunner};
pub use spline::{BSpline, spline_trajectory};
pub use steering::{EvadingTrajectory, SeekingTrajectory, TurnRate};
pub use tick::{Session, Snapshot};
pub use trajectory::{
    Sensors, SampledTrajectory, SegmentTrajectory, StaticTrajectory, StraightTrajectory, TargetLookup,
    Trajectory, TrajectoryProvider,
};
pub use world::{Hud, RngState, SimEvent, World};
