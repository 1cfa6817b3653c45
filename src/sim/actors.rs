//! Concrete actors: factories plus the behavior scripts that drive them
//!
//! Every factory builds a [`KinematicEntity`], hands it to the world and
//! attaches its script. Scripts capture the owner's id and look the owner up
//! on each resume; once the owner is gone the world drops the script.

use std::rc::Rc;

use glam::Vec2;
use rand::Rng;

use super::animation::{AnimationTrack, Frame};
use super::arsenal::{Loadout, Pilot, ShotSpec};
use super::control::{KeyboardTrajectory, PointerTrajectory};
use super::entity::{ActorKind, EndAction, EntityId, Group, HitFlash, KinematicEntity};
use super::script::{
    BoxScript, Cooldown, FireOnCooldown, Poll, action, defer, forever, poll_fn, sequence, wait,
};
use super::steering::{SeekingTrajectory, TurnRate};
use super::trajectory::{SegmentTrajectory, StraightTrajectory};
use super::world::World;
use crate::consts::{OFF_SCREEN_OFFSET, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::Result;
use crate::{Rect, vector_to_heading};

/// Seconds a damaged boss shows its flash frames
pub const HIT_FLASH_DURATION: f32 = 0.1;

/// Boss burst: (pause before the shot) for short, short, long
const BOSS_BURST: [f32; 3] = [0.4, 0.4, 1.6];

/// Left / neutral / right variants of a banking ship
#[derive(Debug, Clone)]
pub struct Banking {
    pub left: Rc<AnimationTrack>,
    pub neutral: Rc<AnimationTrack>,
    pub right: Rc<AnimationTrack>,
}

impl Banking {
    /// Track for a banking direction (-1 left, 1 right, 0 neutral)
    pub fn for_banking(&self, banking: i8) -> &Rc<AnimationTrack> {
        match banking {
            b if b < 0 => &self.left,
            b if b > 0 => &self.right,
            _ => &self.neutral,
        }
    }
}

/// Every animation track the actors use, shared by all their instances.
///
/// Frames carry synthetic identifiers; the renderer maps `(track name,
/// frame id)` to pixels.
#[derive(Debug, Clone)]
pub struct Sprites {
    pub player: Banking,
    pub player_white_out: Banking,
    pub crosshair: Rc<AnimationTrack>,
    pub red_raider: Rc<AnimationTrack>,
    pub missile: Rc<AnimationTrack>,
    pub insects: Vec<Rc<AnimationTrack>>,
    pub insect_shot: Rc<AnimationTrack>,
    pub brain: Rc<AnimationTrack>,
    pub brain_flash: Rc<AnimationTrack>,
    pub cannon_shot: Rc<AnimationTrack>,
    pub turret_shot: Rc<AnimationTrack>,
    pub capsule: Rc<AnimationTrack>,
    pub explosion: Rc<AnimationTrack>,
}

struct FrameIds(u32);

impl FrameIds {
    fn frames(&mut self, count: u32, width: f32, height: f32) -> Vec<Frame> {
        let frames = (self.0..self.0 + count).map(|id| Frame::new(id, width, height)).collect();
        self.0 += count;
        frames
    }

    fn track(&mut self, name: &str, count: u32, size: (f32, f32), delay: f32, looping: bool) -> Result<Rc<AnimationTrack>> {
        let frames = self.frames(count, size.0, size.1);
        Ok(AnimationTrack::new(name, frames, delay, looping)?.shared())
    }

    fn fixed(&mut self, name: &str, size: (f32, f32)) -> Rc<AnimationTrack> {
        let frame = Frame::new(self.0, size.0, size.1);
        self.0 += 1;
        AnimationTrack::fixed(name, frame).shared()
    }

    fn banking(&mut self, prefix: &str) -> Result<Banking> {
        Ok(Banking {
            left: self.track(&format!("{prefix}-l"), 2, (14.0, 24.0), 0.1, true)?,
            neutral: self.track(prefix, 2, (16.0, 24.0), 0.1, true)?,
            right: self.track(&format!("{prefix}-r"), 2, (14.0, 24.0), 0.1, true)?,
        })
    }
}

impl Sprites {
    pub fn new(insect_variants: u32) -> Result<Self> {
        let mut ids = FrameIds(0);
        Ok(Self {
            player: ids.banking("player-ship")?,
            player_white_out: ids.banking("player-ship-white")?,
            crosshair: ids.fixed("crosshair", (16.0, 16.0)),
            red_raider: ids.track("red-enemy", 2, (16.0, 16.0), 0.1, true)?,
            missile: ids.track("missile", 2, (3.0, 8.0), 0.05, true)?,
            insects: (0..insect_variants)
                .map(|i| ids.fixed(&format!("insect-{i}"), (16.0, 16.0)))
                .collect(),
            insect_shot: ids.fixed("insect-shot", (2.0, 2.0)),
            brain: ids.track("brain", 4, (32.0, 32.0), 0.1, true)?,
            brain_flash: ids.track("brain-white", 4, (32.0, 32.0), 0.1, true)?,
            cannon_shot: ids.fixed("cannon-shot", (2.0, 8.0)),
            turret_shot: ids.fixed("turret-shot", (4.0, 4.0)),
            capsule: ids.fixed("power-capsule", (6.0, 6.0)),
            explosion: ids.track("explosion", 6, (16.0, 16.0), 0.01, false)?,
        })
    }

    /// Insect look for a variant index (wraps around the catalogue)
    pub fn insect(&self, variant: usize) -> &Rc<AnimationTrack> {
        &self.insects[variant % self.insects.len()]
    }
}

// === Player ===

/// Player ship on keyboard control at the center of the screen, with its
/// pilot installed and the pilot script attached
pub fn spawn_player(w: &mut World) -> Result<EntityId> {
    let t = &w.tuning().player;
    let keyboard = KeyboardTrajectory::new(Rect::screen(), Rect::screen().center(), t.speed, t.rotation_speed)?;
    let sprites = w.sprites();
    let ship = KinematicEntity::new(
        ActorKind::Player,
        Group::Player,
        Rc::clone(&sprites.player.neutral),
        None,
        keyboard,
    )
    .with_explosion(Rc::clone(&sprites.explosion));

    let id = w.spawn(ship);
    w.install_pilot(Pilot::new(id, Loadout::default()));
    w.attach_script(id, pilot_script(id));
    Ok(id)
}

/// Mouse-driven aiming marker
pub fn spawn_crosshair(w: &mut World) -> Result<EntityId> {
    let pointer = PointerTrajectory::new(w.tuning().player.pointer_scale, Rect::screen().center())?;
    let marker = KinematicEntity::new(
        ActorKind::Crosshair,
        Group::Decoration,
        Rc::clone(&w.sprites().crosshair),
        Some(0.0),
        pointer,
    );
    Ok(w.spawn(marker))
}

/// Banking animation, cannon, turret and equipment upkeep, once per tick
pub fn pilot_script(id: EntityId) -> BoxScript<World> {
    poll_fn(move |dt, w| {
        pilot_step(w, id, dt)?;
        Ok(Poll::Pending)
    })
}

fn pilot_step(w: &mut World, id: EntityId, dt: f32) -> Result<()> {
    let Some(pilot) = w.pilot() else {
        return Ok(());
    };
    if !pilot.controls_enabled {
        return Ok(());
    }
    let input = w.input().clone();
    let banking = if pilot.is_whited_out() {
        &w.sprites().player_white_out
    } else {
        &w.sprites().player
    };
    let track = Rc::clone(banking.for_banking(input.direction.banking()));
    let scale = w.tuning().player.pointer_scale;

    let Some(ship) = w.entity_mut(id).filter(|s| !s.is_exploding()) else {
        return Ok(());
    };
    ship.set_animation(&track, None, false);
    let origin = ship.position();

    let Some(pilot) = w.pilot_mut() else {
        return Ok(());
    };
    let mut cannon_shots = Vec::new();
    let mut turret_shots = Vec::new();
    if input.fire {
        cannon_shots = pilot.loadout.fire_cannon(origin);
    }
    if input.turret_fire {
        let target = input.pointer.map_or(origin, |p| p / scale);
        let mut aim = target - origin;
        if aim == Vec2::ZERO {
            aim = Vec2::X;
        }
        turret_shots = pilot.loadout.fire_turret(origin, vector_to_heading(aim));
    }
    pilot.update(dt);

    let cannon_track = Rc::clone(&w.sprites().cannon_shot);
    let turret_track = Rc::clone(&w.sprites().turret_shot);
    for shot in cannon_shots {
        spawn_shot(w, shot, &cannon_track, Group::PlayerProjectile)?;
    }
    for shot in turret_shots {
        spawn_shot(w, shot, &turret_track, Group::PlayerProjectile)?;
    }
    Ok(())
}

/// Straight, unrotated projectile that flies until culled or it hits
pub fn spawn_shot(w: &mut World, shot: ShotSpec, track: &Rc<AnimationTrack>, group: Group) -> Result<EntityId> {
    let path = StraightTrajectory::along(shot.origin, shot.heading, shot.speed)?;
    let entity = KinematicEntity::new(ActorKind::Shot, group, Rc::clone(track), None, path).with_damage(shot.damage);
    Ok(w.spawn(entity))
}

/// Fire a straight enemy shot at the player, spread by `jitter` degrees
fn shoot_at_player(w: &mut World, origin: Vec2, speed: f32, jitter: f32, track: &Rc<AnimationTrack>) -> Result<()> {
    let Some(player) = w.player_position() else {
        return Ok(());
    };
    let heading = vector_to_heading(player - origin) + w.jitter(jitter);
    let shot = ShotSpec {
        origin,
        heading,
        speed,
        damage: w.tuning().enemies.shot_damage,
    };
    spawn_shot(w, shot, track, Group::EnemyProjectile)?;
    Ok(())
}

fn owner_position(w: &World, id: EntityId) -> Option<(Vec2, f32)> {
    w.entity(id)
        .filter(|e| e.is_alive() && !e.is_exploding())
        .map(|e| (e.position(), e.heading()))
}

// === Enemies ===

/// Red raider diving along a straight line; fires seeking missiles
pub fn spawn_red_raider(w: &mut World, from: Vec2, to: Vec2, speed: f32) -> Result<EntityId> {
    let dive = StraightTrajectory::toward(from, to, speed)?;
    let sprites = w.sprites();
    let raider = KinematicEntity::new(
        ActorKind::RedRaider,
        Group::Enemy,
        Rc::clone(&sprites.red_raider),
        Some(90.0),
        dive,
    )
    .on_trajectory_end(EndAction::Kill)
    .with_explosion(Rc::clone(&sprites.explosion));

    let e = &w.tuning().enemies;
    let cooldown = Cooldown::new(e.missile_cooldown, e.first_shot_delay);
    let id = w.spawn(raider);
    let script = FireOnCooldown::new(
        cooldown,
        |w: &World| w.player_id().is_some(),
        move |w: &mut World| fire_missile(w, id),
    );
    w.attach_script(id, Box::new(script));
    Ok(id)
}

/// Raider aimed at where the player's line of fire crosses the bottom edge
pub fn spawn_raider_toward_player(w: &mut World) -> Result<EntityId> {
    let from = Vec2::new(SCREEN_WIDTH / 2.0, -OFF_SCREEN_OFFSET);
    let bottom = SCREEN_HEIGHT + OFF_SCREEN_OFFSET;
    let mut to = Vec2::new(from.x, bottom);
    if let Some(player) = w.player_position() {
        let dy = player.y - from.y;
        if dy.abs() > f32::EPSILON {
            to.x = from.x + (player.x - from.x) * (bottom - from.y) / dy;
        }
    }
    let speed = w.tuning().enemies.raider_speed;
    spawn_red_raider(w, from, to, speed)
}

/// Bonus-round raider: a vertical dive from a random column
pub fn spawn_bonus_raider(w: &mut World) -> Result<EntityId> {
    let x = w.rng().random_range(0.0..=SCREEN_WIDTH).round();
    let from = Vec2::new(x, -OFF_SCREEN_OFFSET);
    let to = Vec2::new(x, SCREEN_HEIGHT + OFF_SCREEN_OFFSET);
    let speed = w.tuning().enemies.bonus_raider_speed;
    spawn_red_raider(w, from, to, speed)
}

fn fire_missile(w: &mut World, raider: EntityId) -> Result<()> {
    let (Some((origin, heading)), Some(player)) = (owner_position(w, raider), w.player_id()) else {
        return Ok(());
    };
    let e = &w.tuning().enemies;
    let seeking = SeekingTrajectory::new(origin, heading, e.missile_speed, TurnRate::PerTick(e.missile_turn), player)?;
    let missile = KinematicEntity::new(
        ActorKind::Missile,
        Group::EnemyProjectile,
        Rc::clone(&w.sprites().missile),
        Some(-90.0),
        seeking,
    )
    .with_damage(e.shot_damage);
    w.spawn(missile);
    Ok(())
}

/// Insect following a segment path; `shift` flies it beside the centerline
pub fn spawn_insect(w: &mut World, shift: f32) -> Result<EntityId> {
    let params = w.wave();
    let path = SegmentTrajectory::new(params.path(), params.insect_speed(), shift)?;
    let cooldown = Cooldown::new(params.insect_cannon_cooldown(), w.tuning().enemies.first_shot_delay);
    let shot_speed = params.insect_shot_speed();
    let sprites = w.sprites();
    let insect = KinematicEntity::new(
        ActorKind::Insect,
        Group::Enemy,
        Rc::clone(sprites.insect(params.insect_variant())),
        None,
        path,
    )
    .on_trajectory_end(EndAction::Kill)
    .with_explosion(Rc::clone(&sprites.explosion));

    let id = w.spawn(insect);
    let script = FireOnCooldown::new(
        cooldown,
        |w: &World| w.player_id().is_some(),
        move |w: &mut World| {
            let Some((origin, _)) = owner_position(w, id) else {
                return Ok(());
            };
            let jitter = w.tuning().enemies.shot_jitter;
            let track = Rc::clone(&w.sprites().insect_shot);
            shoot_at_player(w, origin, shot_speed, jitter, &track)
        },
    );
    w.attach_script(id, Box::new(script));
    Ok(id)
}

/// One squadron slot: a single insect, or a mirrored pair flying abreast
pub fn spawn_insect_slot(w: &mut World) -> Result<()> {
    if w.chance(w.wave().double_squadron()) {
        let shift = w.tuning().waves.pair_shift;
        spawn_insect(w, -shift)?;
        spawn_insect(w, shift)?;
    } else {
        spawn_insect(w, 0.0)?;
    }
    Ok(())
}

/// Brain boss: pursues the player from `anchor`, firing short-short-long bursts
pub fn spawn_brain(w: &mut World, anchor: Vec2) -> Result<Option<EntityId>> {
    let Some(player) = w.player_id() else {
        return Ok(None);
    };
    let e = &w.tuning().enemies;
    let seeking = SeekingTrajectory::new(anchor, 0.0, e.boss_speed, TurnRate::PerTick(e.boss_turn), player)?;
    let hit_points = e.boss_hit_points;
    let shot_speed = e.boss_shot_speed;
    let sprites = w.sprites();
    let brain = KinematicEntity::new(ActorKind::Brain, Group::Enemy, Rc::clone(&sprites.brain), None, seeking)
        .with_hit_points(hit_points)
        .with_hit_flash(Rc::clone(&sprites.brain_flash), HIT_FLASH_DURATION)
        .with_explosion(Rc::clone(&sprites.explosion));

    let id = w.spawn(brain);
    w.attach_script(id, brain_burst(id, shot_speed));
    Ok(Some(id))
}

fn brain_burst(id: EntityId, shot_speed: f32) -> BoxScript<World> {
    forever(move |_, _| {
        let steps = BOSS_BURST
            .iter()
            .flat_map(|&pause| {
                [
                    wait(pause),
                    action(move |w: &mut World| {
                        let Some((origin, _)) = owner_position(w, id) else {
                            return Ok(());
                        };
                        let track = Rc::clone(&w.sprites().insect_shot);
                        shoot_at_player(w, origin, shot_speed, 0.0, &track)
                    }),
                ]
            })
            .collect();
        sequence(steps)
    })
}

// === Pickups and effects ===

/// Power capsule drifting down from `at`
pub fn spawn_power_capsule(w: &mut World, at: Vec2) -> Option<EntityId> {
    let e = &w.tuning().enemies;
    let drift = StraightTrajectory::along(at, 90.0, e.capsule_speed).ok()?;
    let capsule = KinematicEntity::new(
        ActorKind::PowerCapsule,
        Group::Pickup,
        Rc::clone(&w.sprites().capsule),
        None,
        drift,
    )
    .with_power(e.capsule_power);
    Some(w.spawn(capsule))
}

/// Swap to the flash frames, wait, swap back
pub fn hit_flash(id: EntityId, flash: HitFlash) -> BoxScript<World> {
    defer(move |w: &mut World| {
        let Some(entity) = w.entity_mut(id) else {
            return sequence(Vec::new());
        };
        let original = Rc::clone(entity.playhead().track());
        // Already flashing: the running flash restores the original
        if Rc::ptr_eq(&original, &flash.track) {
            return sequence(Vec::new());
        }
        entity.set_animation(&flash.track, None, false);
        sequence(vec![
            wait(flash.duration),
            action(move |w: &mut World| {
                if let Some(entity) = w.entity_mut(id) {
                    if !entity.is_exploding() {
                        entity.set_animation(&original, None, false);
                    }
                }
                Ok(())
            }),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::input::{Direction, TickInput};
    use crate::sim::script::ScriptRunner;
    use crate::tuning::Tuning;

    fn world() -> World {
        World::new(11, Tuning::default()).unwrap()
    }

    fn with_player() -> (World, EntityId) {
        let mut w = world();
        let id = spawn_player(&mut w).unwrap();
        w.fold_spawned();
        (w, id)
    }

    #[test]
    fn test_sprites_have_unique_frames() {
        let s = Sprites::new(3).unwrap();
        let mut ids: Vec<u32> = [&s.red_raider, &s.missile, &s.brain, &s.explosion, &s.player.left]
            .iter()
            .flat_map(|t| t.frames().iter().map(|f| f.id))
            .collect();
        let n = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), n);
        assert_eq!(s.insect(4).name, "insect-1");
        assert!(!s.explosion.is_looping());
    }

    #[test]
    fn test_player_spawns_centered_with_pilot() {
        let (w, id) = with_player();
        assert_eq!(w.player_id(), Some(id));
        assert_eq!(w.player_position(), Some(Vec2::new(144.0, 144.0)));
        assert!(w.pilot().is_some());
    }

    #[test]
    fn test_pilot_banks_and_fires() {
        let (mut w, id) = with_player();
        w.begin_tick(TickInput {
            direction: Direction::LEFT,
            fire: true,
            ..Default::default()
        });
        let mut pilot = ScriptRunner::new(pilot_script(id));
        pilot.tick(1.0 / 60.0, &mut w).unwrap();
        assert_eq!(w.entity(id).unwrap().pose().track, "player-ship-l");
        assert_eq!(w.group_len(Group::PlayerProjectile), 1);
        // Cooldown holds the next shot
        pilot.tick(1.0 / 60.0, &mut w).unwrap();
        assert_eq!(w.group_len(Group::PlayerProjectile), 1);
    }

    #[test]
    fn test_turret_aims_at_pointer() {
        let (mut w, id) = with_player();
        w.begin_tick(TickInput {
            turret_fire: true,
            pointer: Some(Vec2::new(144.0, 44.0)),
            ..Default::default()
        });
        let mut pilot = ScriptRunner::new(pilot_script(id));
        pilot.tick(1.0 / 60.0, &mut w).unwrap();
        let shots = w.group_members(Group::PlayerProjectile);
        assert_eq!(shots.len(), 1);
        let heading = w.entity(shots[0]).unwrap().heading();
        assert!((heading + 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_disabled_controls_do_nothing() {
        let (mut w, id) = with_player();
        if let Some(p) = w.pilot_mut() {
            p.controls_enabled = false;
        }
        w.begin_tick(TickInput {
            fire: true,
            ..Default::default()
        });
        let mut pilot = ScriptRunner::new(pilot_script(id));
        pilot.tick(0.1, &mut w).unwrap();
        assert!(w.is_group_empty(Group::PlayerProjectile));
    }

    #[test]
    fn test_raider_extrapolates_player_line() {
        let (mut w, _) = with_player();
        let id = spawn_raider_toward_player(&mut w).unwrap();
        // Player straight below the spawn point: vertical dive
        let raider = w.entity(id).unwrap();
        assert!((raider.heading() - 90.0).abs() < 1e-3);
        assert_eq!(raider.angle_offset(), Some(90.0));
    }

    #[test]
    fn test_raider_dives_vertically_without_player() {
        let mut w = world();
        let id = spawn_raider_toward_player(&mut w).unwrap();
        assert!((w.entity(id).unwrap().heading() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_raider_missile_seeks_player() {
        let (mut w, player) = with_player();
        let id = spawn_raider_toward_player(&mut w).unwrap();
        w.fold_spawned();
        fire_missile(&mut w, id).unwrap();
        let missiles = w.group_members(Group::EnemyProjectile);
        assert_eq!(missiles.len(), 1);
        let missile = w.entity(missiles[0]).unwrap();
        assert_eq!(missile.kind(), ActorKind::Missile);
        match missile.trajectory() {
            crate::sim::trajectory::Trajectory::Seeking(s) => assert_eq!(s.target(), player),
            other => panic!("expected seeking, got {}", other.kind()),
        }
    }

    #[test]
    fn test_insect_pairs_are_shifted() {
        let (mut w, _) = with_player();
        spawn_insect(&mut w, -8.0).unwrap();
        spawn_insect(&mut w, 8.0).unwrap();
        let ids = w.group_members(Group::Enemy);
        let a = w.entity(ids[0]).unwrap().position();
        let b = w.entity(ids[1]).unwrap().position();
        assert!((a.distance(b) - 16.0).abs() < 1e-3);
    }

    #[test]
    fn test_brain_needs_a_player() {
        let mut w = world();
        assert_eq!(spawn_brain(&mut w, Vec2::new(144.0, 288.0)).unwrap(), None);
        let (mut w, _) = with_player();
        let id = spawn_brain(&mut w, Vec2::new(144.0, 288.0)).unwrap().unwrap();
        assert_eq!(w.entity(id).unwrap().hit_points(), Some(300.0));
    }

    #[test]
    fn test_hit_flash_swaps_and_restores() {
        let (mut w, _) = with_player();
        let id = spawn_brain(&mut w, Vec2::new(144.0, 288.0)).unwrap().unwrap();
        w.fold_spawned();
        let flash = w.entity(id).unwrap().hit_flash().cloned().unwrap();
        let mut runner = ScriptRunner::new(hit_flash(id, flash));
        runner.tick(0.05, &mut w).unwrap();
        assert_eq!(w.entity(id).unwrap().pose().track, "brain-white");
        runner.tick(0.05, &mut w).unwrap();
        assert!(runner.is_done());
        assert_eq!(w.entity(id).unwrap().pose().track, "brain");
    }

    #[test]
    fn test_capsule_drifts_down() {
        let mut w = world();
        let id = spawn_power_capsule(&mut w, Vec2::new(50.0, 50.0)).unwrap();
        let capsule = w.entity(id).unwrap();
        assert_eq!(capsule.power(), 10.0);
        assert_eq!(capsule.group(), Group::Pickup);
        assert!((capsule.heading() - 90.0).abs() < 1e-3);
    }
}
