//! Wave director: the session's top-level script
//!
//! Flow: intro fly-in, then cycles of waves (one bonus round per cycle)
//! each closed by a boss fight, until the difficulty passes its ceiling.
//! Finishing the script ends the playthrough.
//!
//! All difficulty-dependent numbers live in [`WaveParams`] and are
//! recomputed together, so one wave never mixes values from two levels.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actors;
use super::entity::Group;
use super::script::{BoxScript, action, defer, repeat, repeat_while, sequence, wait, wait_until};
use super::trajectory::{StraightTrajectory, TrajectoryProvider};
use super::world::World;
use crate::consts::{OFF_SCREEN_OFFSET, SCREEN_HEIGHT};
use crate::tuning::Tuning;

const BANNER_TIME: f32 = 1.0;
const BANNER_GAP: f32 = 0.5;
const FINALE_TIME: f32 = 5.0;

/// Difficulty-derived parameters for the current wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveParams {
    difficulty: f32,
    path: Vec<Vec2>,
    insect_speed: f32,
    /// Seconds between squadron members
    spawn_interval: f32,
    insect_shot_speed: f32,
    insect_cannon_cooldown: f32,
    double_squadron: f32,
    squadron_size: u32,
    insect_variant: usize,
}

impl WaveParams {
    pub fn new(difficulty: f32, tuning: &Tuning, rng: &mut Pcg32) -> Self {
        let mut params = Self {
            difficulty: 0.0,
            path: Vec::new(),
            insect_speed: 0.0,
            spawn_interval: 0.0,
            insect_shot_speed: 0.0,
            insect_cannon_cooldown: 0.0,
            double_squadron: 0.0,
            squadron_size: 0,
            insect_variant: 0,
        };
        params.update_difficulty(difficulty, tuning, rng);
        params
    }

    /// Set the difficulty and recompute everything that depends on it,
    /// including a freshly drawn path and insect look.
    pub fn update_difficulty(&mut self, difficulty: f32, tuning: &Tuning, rng: &mut Pcg32) {
        let w = &tuning.waves;
        let factor = (difficulty / w.max_difficulty).clamp(0.0, 1.0);

        self.difficulty = difficulty;
        self.path = tuning.paths[rng.random_range(0..tuning.paths.len())].clone();
        self.insect_speed = w.insect_speed.at(factor);
        self.spawn_interval = w.spawn_spacing / self.insect_speed;
        self.insect_shot_speed = w.insect_shot_speed.at(factor);
        self.insect_cannon_cooldown = w.insect_cannon_cooldown.at(factor);
        self.double_squadron = w.double_squadron.at(factor);
        self.squadron_size = w.squadron_size.at(factor).round() as u32;
        self.insect_variant = rng.random_range(0..w.insect_variants as usize);
    }

    pub fn difficulty(&self) -> f32 {
        self.difficulty
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn insect_speed(&self) -> f32 {
        self.insect_speed
    }

    pub fn spawn_interval(&self) -> f32 {
        self.spawn_interval
    }

    pub fn insect_shot_speed(&self) -> f32 {
        self.insect_shot_speed
    }

    pub fn insect_cannon_cooldown(&self) -> f32 {
        self.insect_cannon_cooldown
    }

    pub fn double_squadron(&self) -> f32 {
        self.double_squadron
    }

    pub fn squadron_size(&self) -> u32 {
        self.squadron_size
    }

    pub fn insect_variant(&self) -> usize {
        self.insect_variant
    }
}

/// Boss start points for a difficulty band
pub fn boss_anchors(difficulty: f32) -> &'static [Vec2] {
    const BOTTOM: Vec2 = Vec2::new(144.0, 288.0);
    const TOP: Vec2 = Vec2::new(144.0, -20.0);
    const LEFT: Vec2 = Vec2::new(-20.0, 144.0);
    const RIGHT: Vec2 = Vec2::new(288.0, 144.0);

    if difficulty <= 20.0 {
        &[BOTTOM]
    } else if difficulty <= 40.0 {
        &[LEFT, RIGHT]
    } else if difficulty <= 60.0 {
        &[BOTTOM, LEFT, RIGHT]
    } else {
        &[BOTTOM, TOP, LEFT, RIGHT]
    }
}

fn enemies_cleared(w: &World) -> bool {
    w.is_group_empty(Group::Enemy)
}

/// Show banners for a while, then clear them and pause briefly
fn announce(messages: &'static [&'static str], hold: f32) -> BoxScript<World> {
    sequence(vec![
        action(move |w: &mut World| {
            w.show_banners(messages);
            Ok(())
        }),
        wait(hold),
        action(|w: &mut World| {
            w.clear_banners();
            Ok(())
        }),
        wait(BANNER_GAP),
    ])
}

/// The whole playthrough
pub fn director() -> BoxScript<World> {
    sequence(vec![
        intro(),
        repeat_while(
            |w: &World| w.wave().difficulty() <= w.tuning().waves.max_difficulty,
            |cycle, w: &mut World| {
                log::info!("cycle {} at difficulty {:.0}", cycle + 1, w.wave().difficulty());
                boss_cycle()
            },
        ),
        finale(),
    ])
}

/// Fly the player in from below the screen, then hand back keyboard control
pub fn intro() -> BoxScript<World> {
    defer(|w: &mut World| {
        w.show_banners(&["Get ready!", "", ""]);
        let speed = w.tuning().player.intro_speed;
        let Some(id) = w.player_id() else {
            return announce(&["GO! GO! GO!", "", ""], BANNER_TIME);
        };
        if let Some(pilot) = w.pilot_mut() {
            pilot.controls_enabled = false;
        }

        let mut keyboard = None;
        if let Some(ship) = w.entity_mut(id) {
            let home = ship.position();
            let below = Vec2::new(home.x, SCREEN_HEIGHT + OFF_SCREEN_OFFSET);
            if let Ok(fly_in) = StraightTrajectory::toward(below, home, speed) {
                keyboard = Some(ship.set_trajectory(fly_in));
            }
        }
        log::debug!("intro: flying {:?} in", id);

        sequence(vec![
            wait_until(move |w: &World| {
                w.entity(id)
                    .is_none_or(|e| !e.is_alive() || e.trajectory().finished())
            }),
            action(move |w: &mut World| {
                if let (Some(ship), Some(keyboard)) = (w.entity_mut(id), keyboard.take()) {
                    ship.set_trajectory(keyboard);
                }
                if let Some(pilot) = w.pilot_mut() {
                    pilot.controls_enabled = true;
                }
                Ok(())
            }),
            announce(&["GO! GO! GO!", "", ""], BANNER_TIME),
        ])
    })
}

/// One cycle: the regular waves with a bonus round among them, then a boss
pub fn boss_cycle() -> BoxScript<World> {
    defer(|w: &mut World| {
        let waves = w.tuning().waves.waves_per_cycle;
        let bonus = w.tuning().waves.bonus_wave;
        sequence(vec![
            repeat(waves, move |wave, w: &mut World| {
                w.hud_mut().wave = wave;
                if wave == bonus {
                    bonus_round()
                } else {
                    squadron_wave()
                }
            }),
            boss_fight(),
        ])
    })
}

/// One raider plus a squadron of insects; difficulty rises once the sky is clear
pub fn squadron_wave() -> BoxScript<World> {
    defer(|w: &mut World| {
        let size = w.wave().squadron_size();
        let interval = w.wave().spawn_interval();
        log::info!(
            "wave {}: difficulty {:.0}, squadron {}, insect speed {:.0}",
            w.hud().wave,
            w.wave().difficulty(),
            size,
            w.wave().insect_speed()
        );
        sequence(vec![
            action(|w: &mut World| {
                actors::spawn_raider_toward_player(w)?;
                Ok(())
            }),
            squadron(size, interval),
            wait_until(enemies_cleared),
            action(|w: &mut World| {
                let next = w.wave().difficulty() + w.tuning().waves.difficulty_step;
                w.set_difficulty(next);
                Ok(())
            }),
        ])
    })
}

/// Spawn `size` squadron slots, `interval` seconds apart
pub fn squadron(size: u32, interval: f32) -> BoxScript<World> {
    repeat(size, move |_, _| {
        sequence(vec![
            action(|w: &mut World| actors::spawn_insect_slot(w)),
            wait(interval),
        ])
    })
}

/// Raiders diving down random columns
pub fn bonus_round() -> BoxScript<World> {
    defer(|w: &mut World| {
        let e = &w.tuning().enemies;
        let (count, interval) = (e.bonus_raiders, e.bonus_raider_interval);
        w.hud_mut().bonus_round = true;
        log::info!("bonus round");
        sequence(vec![
            announce(&["Bonus round"], BANNER_TIME),
            repeat(count, move |_, _| {
                sequence(vec![
                    action(|w: &mut World| {
                        actors::spawn_bonus_raider(w)?;
                        Ok(())
                    }),
                    wait(interval),
                ])
            }),
            wait_until(enemies_cleared),
            announce(&["Bonus round completed"], BANNER_TIME),
            action(|w: &mut World| {
                w.hud_mut().bonus_round = false;
                Ok(())
            }),
        ])
    })
}

/// Brains from the anchors of the current band, then wait for them to fall
pub fn boss_fight() -> BoxScript<World> {
    sequence(vec![
        action(|w: &mut World| {
            let difficulty = w.wave().difficulty();
            let anchors = boss_anchors(difficulty);
            log::info!("boss fight: {} brain(s) at difficulty {:.0}", anchors.len(), difficulty);
            w.hud_mut().boss_fight = true;
            for &anchor in anchors {
                actors::spawn_brain(w, anchor)?;
            }
            Ok(())
        }),
        wait_until(enemies_cleared),
        action(|w: &mut World| {
            let hud = w.hud_mut();
            hud.boss_fight = false;
            hud.cycle += 1;
            Ok(())
        }),
    ])
}

/// Congratulations, then the script ends
pub fn finale() -> BoxScript<World> {
    sequence(vec![
        action(|w: &mut World| {
            log::info!("all waves cleared at difficulty {:.0}", w.wave().difficulty());
            Ok(())
        }),
        announce(
            &["You did it!", "You defeated the enemy!", "Congratulations!!!"],
            FINALE_TIME,
        ),
    ])
}
