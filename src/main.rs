//! Sky Raid headless runner
//!
//! Plays a scripted session against the simulation core, resolving hits with a
//! simple box-overlap pass, and prints the final frame as JSON.
//!
//! Usage: `sky-raid [seed] [seconds]`

use std::process::ExitCode;

use glam::Vec2;
use sky_raid::consts::{OFF_SCREEN_OFFSET, SIM_DT};
use sky_raid::Rect;
use sky_raid::sim::{Direction, EntityId, Group, Session, SimEvent, TickInput, World};

const DEFAULT_SEED: u64 = 0x5EED;
const DEFAULT_SECONDS: f32 = 90.0;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_SEED);
    let seconds = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_SECONDS);
    log::info!("Sky Raid (headless) starting, seed {seed}, {seconds}s");

    let mut session = match Session::with_seed(seed) {
        Ok(session) => session,
        Err(e) => {
            log::error!("failed to start session: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ticks = (seconds / SIM_DT).ceil() as u64;
    let mut kills = 0;
    for tick in 0..ticks {
        let input = scripted_input(tick);
        if let Err(e) = session.tick(&input, SIM_DT) {
            log::error!("tick {tick} failed: {e}");
            return ExitCode::FAILURE;
        }
        resolve_hits(session.world_mut());
        session
            .world_mut()
            .cull_out_of_bounds(&[Group::PlayerProjectile, Group::EnemyProjectile, Group::Pickup], OFF_SCREEN_OFFSET * 2.0);

        for event in session.drain_events() {
            match event {
                SimEvent::Destroyed { kind, .. } if kind.is_enemy() => kills += 1,
                SimEvent::Destroyed { kind, position, .. } => {
                    log::info!("{kind:?} destroyed at ({:.0}, {:.0})", position.x, position.y)
                }
                SimEvent::PickupCollected { power, .. } => log::debug!("power +{power}"),
                _ => {}
            }
        }
        if tick % 600 == 0 {
            let hud = session.world().hud();
            log::info!(
                "t={:.0}s difficulty {:.1} wave {} cycle {} entities {} kills {kills}",
                session.world().elapsed(),
                hud.difficulty,
                hud.wave,
                hud.cycle,
                session.world().entity_count()
            );
        }
        if session.is_finished() {
            log::info!("director finished at tick {tick}");
            break;
        }
    }

    match serde_json::to_string_pretty(&session.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            log::error!("failed to encode snapshot: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Weave left and right, fire continuously, sweep the turret in a circle
fn scripted_input(tick: u64) -> TickInput {
    let t = tick as f32 * SIM_DT;
    let direction = if (t / 2.0) as u32 % 2 == 0 { Direction::LEFT } else { Direction::RIGHT };
    let pointer = Vec2::new(144.0 + 100.0 * t.cos(), 100.0 + 60.0 * t.sin());
    TickInput {
        direction,
        fire: true,
        turret_fire: tick % 30 < 15,
        pointer: Some(pointer),
    }
}

fn hitbox(world: &World, id: EntityId) -> Option<(Rect, f32)> {
    world.entity(id).map(|e| (e.bounds(), e.damage()))
}

fn overlaps(world: &World, id: EntityId, area: &Rect) -> bool {
    hitbox(world, id).is_some_and(|(b, _)| b.intersects(area))
}

/// Box-overlap hits: player shots on enemies, enemy shots and bodies on the
/// player, capsules collected by the player
fn resolve_hits(world: &mut World) {
    let enemies = world.group_members(Group::Enemy);
    for shot in world.group_members(Group::PlayerProjectile) {
        let Some((shot_box, damage)) = hitbox(world, shot) else {
            continue;
        };
        let hit = enemies
            .iter()
            .copied()
            .find(|&enemy| world.is_active(enemy) && overlaps(world, enemy, &shot_box));
        if let Some(enemy) = hit {
            world.apply_damage(enemy, damage);
            world.mark_dead(shot);
        }
    }

    let Some(player) = world.player_id().filter(|&id| world.is_active(id)) else {
        return;
    };
    let Some((player_box, _)) = hitbox(world, player) else {
        return;
    };
    for id in world.group_members(Group::EnemyProjectile) {
        if let Some((_, damage)) = hitbox(world, id).filter(|(b, _)| b.intersects(&player_box)) {
            world.apply_damage(player, damage);
            world.mark_dead(id);
        }
    }
    let ram_damage = world.tuning().enemies.shot_damage;
    for id in enemies {
        if overlaps(world, id, &player_box) {
            world.apply_damage(player, ram_damage);
            world.request_explode(id);
        }
    }
    for id in world.group_members(Group::Pickup) {
        if overlaps(world, id, &player_box) {
            world.collect_pickup(id);
        }
    }
}
