//! Session driver: one deterministic tick of the whole simulation
//!
//! Order within a tick:
//! 1. Store the input and resolve damage/explode/pickup requests
//! 2. Run the director script
//! 3. Run entity scripts (owners that died earlier are skipped)
//! 4. Fold this tick's spawns into the live set
//! 5. Advance every entity and apply end-of-path/animation actions
//! 6. Sweep dead entities and drop their scripts
//! 7. Adopt scripts attached during the tick; they first run next tick

use serde::{Deserialize, Serialize};

use super::actors;
use super::director;
use super::entity::{EntityId, RenderPose};
use super::input::TickInput;
use super::script::{Poll, ScriptRunner};
use super::world::{Hud, SimEvent, World};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::Result;
use crate::tuning::Tuning;

/// What a renderer needs for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub elapsed: f32,
    pub hud: Hud,
    pub banners: Vec<String>,
    pub poses: Vec<RenderPose>,
    pub finished: bool,
}

/// A running playthrough
pub struct Session {
    seed: u64,
    world: World,
    director: ScriptRunner<World>,
    scripts: Vec<(EntityId, ScriptRunner<World>)>,
    finished: bool,
    accumulator: f32,
}

impl Session {
    /// Start a playthrough: player, crosshair and the director
    pub fn new(seed: u64, tuning: Tuning) -> Result<Self> {
        let mut world = World::new(seed, tuning)?;
        actors::spawn_player(&mut world)?;
        actors::spawn_crosshair(&mut world)?;
        world.fold_spawned();

        let mut session = Self {
            seed,
            world,
            director: ScriptRunner::new(director::director()),
            scripts: Vec::new(),
            finished: false,
            accumulator: 0.0,
        };
        session.adopt_scripts();
        log::info!("session started (seed {seed})");
        Ok(session)
    }

    /// Start with the default tuning
    pub fn with_seed(seed: u64) -> Result<Self> {
        Self::new(seed, Tuning::default())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The director ran to completion
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Running entity scripts (the director not included)
    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    /// Advance the simulation by `dt` seconds. A zero `dt` runs scripts that
    /// react to state but moves nothing.
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Result<()> {
        // NaN folds to 0 as well
        let dt = dt.max(0.0);
        let world = &mut self.world;

        world.begin_tick(input.clone());
        world.apply_requests();

        if !self.finished {
            if let Poll::Complete = self.director.tick(dt, world)? {
                self.finished = true;
                log::info!("director finished after {} ticks", world.ticks());
                if let Some(player) = world.player_id() {
                    world.mark_dead(player);
                }
            }
        }

        for (owner, runner) in self.scripts.iter_mut() {
            if !world.entity(*owner).is_some_and(|e| e.is_alive()) {
                continue;
            }
            if let Err(e) = runner.tick(dt, world) {
                log::warn!("script on {owner:?} failed, removing owner: {e}");
                world.mark_dead(*owner);
            }
        }
        self.scripts.retain(|(_, runner)| !runner.is_done());

        world.fold_spawned();
        world.advance_entities(dt);

        let removed = world.sweep();
        if !removed.is_empty() {
            self.scripts.retain(|(owner, _)| !removed.contains(owner));
        }
        self.adopt_scripts();
        Ok(())
    }

    /// Feed a variable frame time through fixed `SIM_DT` steps. Returns the
    /// number of ticks run; leftover time carries into the next frame.
    pub fn advance_frame(&mut self, input: &TickInput, frame_dt: f32) -> Result<u32> {
        self.accumulator += frame_dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.tick(input, SIM_DT)?;
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            // Drop the backlog rather than spiral
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        Ok(steps)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.world.ticks(),
            elapsed: self.world.elapsed(),
            hud: self.world.hud(),
            banners: self.world.banners().to_vec(),
            poses: self.world.poses(),
            finished: self.finished,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.drain_events()
    }

    fn adopt_scripts(&mut self) {
        for (owner, script) in self.world.take_pending_scripts() {
            if self.world.entity(owner).is_some() {
                self.scripts.push((owner, ScriptRunner::new(script)));
            }
        }
    }
}
