//! Kinematic entities: one animation playhead plus one trajectory
//!
//! Per-tick order inside [`KinematicEntity::advance`]:
//! 1. remember whether the trajectory was already finished
//! 2. advance the trajectory
//! 3. copy its heading
//! 4. advance the playhead (unless the animation already finished)
//! 5. recompute the render pose
//! 6. report a false→true trajectory transition
//!
//! End-of-path and end-of-animation reactions are data ([`EndAction`]); the
//! world applies them after the step, so one entity never reaches into
//! another mid-update.

use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::animation::{AnimationTrack, Playhead};
use super::trajectory::{Sensors, StaticTrajectory, Trajectory, TrajectoryProvider};
use crate::Rect;

/// Stable entity handle (never reused within a session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Collision/membership groups exposed to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    Player,
    Enemy,
    EnemyProjectile,
    PlayerProjectile,
    Pickup,
    /// Cursor marker, not collidable
    Decoration,
}

/// What an entity represents (for the renderer, logs and hit reactions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Crosshair,
    RedRaider,
    Insect,
    Brain,
    Shot,
    Missile,
    PowerCapsule,
}

impl ActorKind {
    pub fn is_enemy(self) -> bool {
        matches!(self, ActorKind::RedRaider | ActorKind::Insect | ActorKind::Brain)
    }
}

/// Reaction when a trajectory or animation runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndAction {
    /// Remove the entity
    Kill,
    /// Play the explosion, then remove the entity
    Explode,
}

/// What happened to an entity during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub trajectory_ended: bool,
    pub animation_ended: bool,
}

/// Read-only snapshot handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPose {
    pub id: EntityId,
    pub kind: ActorKind,
    pub group: Group,
    pub position: Vec2,
    /// Degrees, counter-clockwise on screen
    pub rotation: f32,
    /// Track name and frame identifier to draw
    pub track: String,
    pub frame: u32,
    /// Screen-space box of the (rotated) image
    pub bounds: Rect,
}

/// Axis-aligned size of a `size` box rotated by `degrees`
pub fn rotated_size(size: Vec2, degrees: f32) -> Vec2 {
    if degrees == 0.0 {
        return size;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    Vec2::new(size.x * cos + size.y * sin, size.x * sin + size.y * cos)
}

/// Flash shown briefly when a hit does not destroy the entity
#[derive(Debug, Clone)]
pub struct HitFlash {
    pub track: Rc<AnimationTrack>,
    pub duration: f32,
}

#[derive(Debug, Clone)]
pub struct KinematicEntity {
    id: EntityId,
    kind: ActorKind,
    group: Group,
    playhead: Playhead,
    trajectory: Trajectory,
    heading: f32,
    /// None: never rotate the image
    angle_offset: Option<f32>,
    alive: bool,
    position: Vec2,
    rotation: f32,
    bounds: Rect,
    on_trajectory_end: Option<EndAction>,
    on_animation_end: Option<EndAction>,
    animation_end_reported: bool,
    hit_points: Option<f32>,
    /// Damage dealt on contact (projectiles, rammers)
    damage: f32,
    /// Power carried by pickups
    power: f32,
    explosion: Option<Rc<AnimationTrack>>,
    hit_flash: Option<HitFlash>,
    exploding: bool,
}

impl KinematicEntity {
    /// The id is assigned when the world accepts the entity
    pub fn new(
        kind: ActorKind,
        group: Group,
        track: Rc<AnimationTrack>,
        angle_offset: Option<f32>,
        trajectory: impl Into<Trajectory>,
    ) -> Self {
        let trajectory = trajectory.into();
        let mut entity = Self {
            id: EntityId(0),
            kind,
            group,
            playhead: Playhead::new(track),
            heading: trajectory.heading(),
            position: trajectory.position(),
            trajectory,
            angle_offset,
            alive: true,
            rotation: 0.0,
            bounds: Rect::from_center(Vec2::ZERO, Vec2::ZERO),
            on_trajectory_end: None,
            on_animation_end: None,
            animation_end_reported: false,
            hit_points: None,
            damage: 0.0,
            power: 0.0,
            explosion: None,
            hit_flash: None,
            exploding: false,
        };
        entity.refresh_pose();
        entity
    }

    pub fn on_trajectory_end(mut self, action: EndAction) -> Self {
        self.on_trajectory_end = Some(action);
        self
    }

    pub fn on_animation_end(mut self, action: EndAction) -> Self {
        self.on_animation_end = Some(action);
        self
    }

    pub fn with_hit_points(mut self, hit_points: f32) -> Self {
        self.hit_points = Some(hit_points);
        self
    }

    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    pub fn with_explosion(mut self, track: Rc<AnimationTrack>) -> Self {
        self.explosion = Some(track);
        self
    }

    pub fn with_hit_flash(mut self, track: Rc<AnimationTrack>, duration: f32) -> Self {
        self.hit_flash = Some(HitFlash { track, duration });
        self
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_exploding(&self) -> bool {
        self.exploding
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn angle_offset(&self) -> Option<f32> {
        self.angle_offset
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Current image box, also used as the hit box
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn trajectory_mut(&mut self) -> &mut Trajectory {
        &mut self.trajectory
    }

    pub fn playhead(&self) -> &Playhead {
        &self.playhead
    }

    pub fn hit_points(&self) -> Option<f32> {
        self.hit_points
    }

    pub fn damage(&self) -> f32 {
        self.damage
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn hit_flash(&self) -> Option<&HitFlash> {
        self.hit_flash.as_ref()
    }

    pub fn pose(&self) -> RenderPose {
        RenderPose {
            id: self.id,
            kind: self.kind,
            group: self.group,
            position: self.position,
            rotation: self.rotation,
            track: self.playhead.track().name.clone(),
            frame: self.playhead.current_frame().id,
            bounds: self.bounds,
        }
    }

    /// Switch tracks. Re-selecting the current track keeps its playhead
    /// running; a different track starts from its first frame. A `None`
    /// offset keeps the current one.
    pub fn set_animation(&mut self, track: &Rc<AnimationTrack>, angle_offset: Option<f32>, reset_heading: bool) {
        if !Rc::ptr_eq(self.playhead.track(), track) {
            self.playhead = Playhead::new(Rc::clone(track));
            self.animation_end_reported = false;
        }
        if angle_offset.is_some() {
            self.angle_offset = angle_offset;
        }
        if reset_heading {
            self.heading = 0.0;
        }
        self.refresh_pose();
    }

    /// Swap the motion law and re-query the pose at once, so the handover
    /// never shows a stale position. Returns the previous provider.
    pub fn set_trajectory(&mut self, trajectory: impl Into<Trajectory>) -> Trajectory {
        let previous = std::mem::replace(&mut self.trajectory, trajectory.into());
        self.heading = self.trajectory.heading();
        self.refresh_pose();
        previous
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Freeze in place and play the explosion; removed when it ends.
    /// Entities without an explosion are removed at once.
    pub fn explode(&mut self) {
        if self.exploding || !self.alive {
            return;
        }
        let Some(track) = self.explosion.clone() else {
            self.kill();
            return;
        };
        self.exploding = true;
        self.set_trajectory(StaticTrajectory::new(self.position, self.heading));
        self.set_animation(&track, None, false);
        self.on_trajectory_end = None;
        self.on_animation_end = Some(EndAction::Kill);
    }

    /// Subtract hit points. Returns true when this hit destroyed the entity.
    /// Entities without hit points are destroyed by any hit.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.alive || self.exploding {
            return false;
        }
        match self.hit_points.as_mut() {
            Some(hp) => {
                *hp -= amount;
                *hp <= 0.0
            }
            None => true,
        }
    }

    /// Advance trajectory and animation by `dt`
    pub fn advance(&mut self, dt: f32, sensors: &Sensors<'_>) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if !self.alive {
            return outcome;
        }

        let was_finished = self.trajectory.finished();
        self.trajectory.advance(dt, sensors);
        self.heading = self.trajectory.heading();

        if !self.playhead.is_finished() {
            self.playhead.advance(dt);
        }
        if self.playhead.is_finished() && !self.animation_end_reported {
            self.animation_end_reported = true;
            outcome.animation_ended = true;
        }

        self.refresh_pose();
        outcome.trajectory_ended = !was_finished && self.trajectory.finished();
        outcome
    }

    pub fn trajectory_end_action(&self) -> Option<EndAction> {
        self.on_trajectory_end
    }

    pub fn animation_end_action(&self) -> Option<EndAction> {
        self.on_animation_end
    }

    fn refresh_pose(&mut self) {
        self.rotation = match self.angle_offset {
            Some(offset) => -self.heading + offset,
            None => 0.0,
        };
        self.position = self.trajectory.position();
        let size = rotated_size(self.playhead.current_frame().size, self.rotation);
        self.bounds = Rect::from_center(self.position, size);
    }
}
