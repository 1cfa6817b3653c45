//! The shared simulation state every script runs against
//!
//! Entities live in a vector sorted by id so iteration order is stable.
//! Entities spawned while scripts run wait in a side list and join the live
//! set before the movement pass of the same tick; their scripts start on
//! the next tick.
//!
//! Collaborators outside the core (collision, cleanup) talk to the world
//! through requests: `mark_dead` takes effect at once, damage, explosions
//! and pickups are queued and resolved at the start of the next tick.

use std::mem;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actors::{self, Sprites};
use super::arsenal::Pilot;
use super::director::WaveParams;
use super::entity::{ActorKind, EndAction, EntityId, Group, KinematicEntity, RenderPose};
use super::input::TickInput;
use super::script::BoxScript;
use super::trajectory::{Sensors, TargetLookup};
use crate::Rect;
use crate::error::Result;
use crate::tuning::Tuning;

/// Seed for the session's random source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed ^ self.stream.rotate_left(32))
    }
}

/// Something that happened during a tick, for sound/score/UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Spawned { id: EntityId, kind: ActorKind },
    /// A hit that did not destroy the entity
    Damaged { id: EntityId, kind: ActorKind, amount: f32 },
    /// The shield paid for a hit on the player
    ShieldAbsorbed { id: EntityId },
    /// Destroyed; the explosion (if any) is now playing
    Destroyed { id: EntityId, kind: ActorKind, position: Vec2 },
    PickupCollected { id: EntityId, power: f32 },
    /// Left the live set for good
    Removed { id: EntityId },
}

/// Counters shown by the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub difficulty: f32,
    /// Wave index within the current cycle
    pub wave: u32,
    /// Completed boss cycles
    pub cycle: u32,
    pub bonus_round: bool,
    pub boss_fight: bool,
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Damage(EntityId, f32),
    Explode(EntityId),
    Collect(EntityId),
}

/// Live positions of everything that can be tracked, captured before the
/// movement pass so every pursuer sees the same picture.
struct PoseIndex(Vec<(EntityId, Vec2)>);

impl TargetLookup for PoseIndex {
    fn target_position(&self, id: EntityId) -> Option<Vec2> {
        self.0
            .binary_search_by_key(&id, |&(id, _)| id)
            .ok()
            .map(|i| self.0[i].1)
    }
}

pub struct World {
    tuning: Tuning,
    sprites: Sprites,
    rng_state: RngState,
    rng: Pcg32,
    input: TickInput,
    /// Live entities, sorted by id
    entities: Vec<KinematicEntity>,
    /// Spawned this tick, not yet moved
    spawned: Vec<KinematicEntity>,
    pending_scripts: Vec<(EntityId, BoxScript<World>)>,
    next_id: u32,
    requests: Vec<Request>,
    banners: Vec<String>,
    events: Vec<SimEvent>,
    pilot: Option<Pilot>,
    wave: WaveParams,
    hud: Hud,
    ticks: u64,
    elapsed: f32,
}

impl World {
    pub fn new(seed: u64, tuning: Tuning) -> Result<Self> {
        tuning.validate()?;
        let rng_state = RngState::new(seed);
        let mut rng = rng_state.to_rng();
        let wave = WaveParams::new(0.0, &tuning, &mut rng);
        Ok(Self {
            sprites: Sprites::new(tuning.waves.insect_variants)?,
            tuning,
            rng_state,
            rng,
            input: TickInput::default(),
            entities: Vec::new(),
            spawned: Vec::new(),
            pending_scripts: Vec::new(),
            next_id: 1,
            requests: Vec::new(),
            banners: Vec::new(),
            events: Vec::new(),
            pilot: None,
            wave,
            hud: Hud::default(),
            ticks: 0,
            elapsed: 0.0,
        })
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn sprites(&self) -> &Sprites {
        &self.sprites
    }

    pub fn rng_state(&self) -> RngState {
        self.rng_state
    }

    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    /// Uniform sample in [-spread, spread]
    pub fn jitter(&mut self, spread: f32) -> f32 {
        if spread <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(-spread..=spread)
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.random::<f32>() < p
    }

    pub fn input(&self) -> &TickInput {
        &self.input
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    // === Entities ===

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add an entity. It moves starting with this tick's movement pass.
    pub fn spawn(&mut self, mut entity: KinematicEntity) -> EntityId {
        let id = self.allocate_id();
        entity.assign_id(id);
        log::debug!(
            "spawn {:?} {:?} at ({:.0}, {:.0}) on {}",
            id,
            entity.kind(),
            entity.position().x,
            entity.position().y,
            entity.trajectory().kind()
        );
        self.events.push(SimEvent::Spawned { id, kind: entity.kind() });
        self.spawned.push(entity);
        id
    }

    /// Attach a behavior script to an entity; it runs from the next tick
    /// until the entity is removed or the script completes.
    pub fn attach_script(&mut self, owner: EntityId, script: BoxScript<World>) {
        self.pending_scripts.push((owner, script));
    }

    pub fn entity(&self, id: EntityId) -> Option<&KinematicEntity> {
        match self.entities.binary_search_by_key(&id, |e| e.id()) {
            Ok(i) => Some(&self.entities[i]),
            Err(_) => self.spawned.iter().find(|e| e.id() == id),
        }
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut KinematicEntity> {
        match self.entities.binary_search_by_key(&id, |e| e.id()) {
            Ok(i) => Some(&mut self.entities[i]),
            Err(_) => self.spawned.iter_mut().find(|e| e.id() == id),
        }
    }

    /// Alive and not yet exploding
    pub fn is_active(&self, id: EntityId) -> bool {
        self.entity(id).is_some_and(|e| e.is_alive() && !e.is_exploding())
    }

    fn members(&self, group: Group) -> impl Iterator<Item = &KinematicEntity> + '_ {
        self.entities
            .iter()
            .chain(self.spawned.iter())
            .filter(move |e| e.group() == group && e.is_alive() && !e.is_exploding())
    }

    /// Active members of a group (exploding entities no longer count)
    pub fn group_members(&self, group: Group) -> Vec<EntityId> {
        self.members(group).map(|e| e.id()).collect()
    }

    pub fn group_len(&self, group: Group) -> usize {
        self.members(group).count()
    }

    pub fn is_group_empty(&self, group: Group) -> bool {
        self.members(group).next().is_none()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len() + self.spawned.len()
    }

    // === Player ===

    pub fn install_pilot(&mut self, pilot: Pilot) {
        self.pilot = Some(pilot);
    }

    pub fn pilot(&self) -> Option<&Pilot> {
        self.pilot.as_ref()
    }

    pub fn pilot_mut(&mut self) -> Option<&mut Pilot> {
        self.pilot.as_mut()
    }

    /// The player ship, while it is flying
    pub fn player_id(&self) -> Option<EntityId> {
        let id = self.pilot.as_ref()?.id;
        self.is_active(id).then_some(id)
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.player_id()
            .and_then(|id| self.entity(id))
            .map(|e| e.position())
    }

    // === Collaborator requests ===

    /// Remove an entity at once: it receives no further ticks
    pub fn mark_dead(&mut self, id: EntityId) {
        if let Some(e) = self.entity_mut(id) {
            e.kill();
        }
    }

    /// Queue damage, resolved at the start of the next tick
    pub fn apply_damage(&mut self, id: EntityId, amount: f32) {
        self.requests.push(Request::Damage(id, amount));
    }

    /// Queue an explosion, resolved at the start of the next tick
    pub fn request_explode(&mut self, id: EntityId) {
        self.requests.push(Request::Explode(id));
    }

    /// Queue a pickup collected by the player
    pub fn collect_pickup(&mut self, id: EntityId) {
        self.requests.push(Request::Collect(id));
    }

    /// True once an entity's box no longer touches the screen grown by `margin`
    pub fn is_out_of_bounds(&self, id: EntityId, margin: f32) -> bool {
        let Some(e) = self.entity(id) else {
            return false;
        };
        let screen = Rect::screen();
        let area = Rect {
            min: screen.min - Vec2::splat(margin),
            max: screen.max + Vec2::splat(margin),
        };
        !e.bounds().intersects(&area)
    }

    /// Mark every member of `groups` that left the screen as dead. Returns the
    /// number of entities culled.
    pub fn cull_out_of_bounds(&mut self, groups: &[Group], margin: f32) -> usize {
        let doomed: Vec<EntityId> = groups
            .iter()
            .flat_map(|&g| self.group_members(g))
            .filter(|&id| self.is_out_of_bounds(id, margin))
            .collect();
        for &id in &doomed {
            self.mark_dead(id);
        }
        doomed.len()
    }

    // === UI ===

    /// Replace the banner queue
    pub fn show_banners(&mut self, messages: &[&str]) {
        self.banners = messages.iter().map(|m| m.to_string()).collect();
    }

    pub fn clear_banners(&mut self) {
        self.banners.clear();
    }

    pub fn banners(&self) -> &[String] {
        &self.banners
    }

    pub fn hud(&self) -> Hud {
        self.hud
    }

    pub fn hud_mut(&mut self) -> &mut Hud {
        &mut self.hud
    }

    pub fn wave(&self) -> &WaveParams {
        &self.wave
    }

    /// Recompute every difficulty-dependent parameter at once
    pub fn set_difficulty(&mut self, difficulty: f32) {
        self.wave.update_difficulty(difficulty, &self.tuning, &mut self.rng);
        self.hud.difficulty = self.wave.difficulty();
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Render poses of every live entity, in id order
    pub fn poses(&self) -> Vec<RenderPose> {
        self.entities
            .iter()
            .filter(|e| e.is_alive())
            .map(|e| e.pose())
            .collect()
    }

    // === Tick phases (driven by the session) ===

    pub(crate) fn begin_tick(&mut self, input: TickInput) {
        self.input = input;
    }

    pub(crate) fn apply_requests(&mut self) {
        for request in mem::take(&mut self.requests) {
            match request {
                Request::Damage(id, amount) => self.resolve_damage(id, amount),
                Request::Explode(id) => self.destroy(id),
                Request::Collect(id) => self.resolve_pickup(id),
            }
        }
    }

    fn resolve_damage(&mut self, id: EntityId, amount: f32) {
        if !self.is_active(id) {
            return;
        }
        let amount = match self.pilot.as_mut() {
            Some(pilot) if pilot.id == id => pilot.hit(amount),
            _ => amount,
        };
        if amount <= 0.0 {
            self.events.push(SimEvent::ShieldAbsorbed { id });
            return;
        }
        let Some(entity) = self.entity_mut(id) else {
            return;
        };
        if entity.take_damage(amount) {
            self.destroy(id);
            return;
        }
        let kind = entity.kind();
        let flash = entity.hit_flash().cloned();
        self.events.push(SimEvent::Damaged { id, kind, amount });
        if let Some(flash) = flash {
            self.attach_script(id, actors::hit_flash(id, flash));
        }
    }

    fn destroy(&mut self, id: EntityId) {
        if !self.is_active(id) {
            return;
        }
        let Some(entity) = self.entity_mut(id) else {
            return;
        };
        entity.explode();
        let (kind, position) = (entity.kind(), entity.position());
        self.events.push(SimEvent::Destroyed { id, kind, position });

        if kind == ActorKind::Player {
            log::info!("player destroyed at ({:.0}, {:.0})", position.x, position.y);
        }
        if kind.is_enemy() && self.chance(self.tuning.enemies.capsule_drop_chance) {
            actors::spawn_power_capsule(self, position);
        }
    }

    fn resolve_pickup(&mut self, id: EntityId) {
        if !self.is_active(id) {
            return;
        }
        let Some(power) = self.entity(id).map(|e| e.power()) else {
            return;
        };
        if let Some(pilot) = self.pilot.as_mut() {
            pilot.loadout.power.charge_by(power);
        }
        self.mark_dead(id);
        self.events.push(SimEvent::PickupCollected { id, power });
    }

    /// Move this tick's spawns into the live set
    pub(crate) fn fold_spawned(&mut self) {
        // Ids are allocated in increasing order, so appending keeps the sort
        self.entities.append(&mut self.spawned);
    }

    pub(crate) fn take_pending_scripts(&mut self) -> Vec<(EntityId, BoxScript<World>)> {
        mem::take(&mut self.pending_scripts)
    }

    /// Advance every live entity and apply its end-of-path/animation actions
    pub(crate) fn advance_entities(&mut self, dt: f32) {
        let index = PoseIndex(
            self.entities
                .iter()
                .filter(|e| e.is_alive() && !e.is_exploding())
                .map(|e| (e.id(), e.position()))
                .collect(),
        );
        let sensors = Sensors {
            input: &self.input,
            targets: &index,
        };

        let mut reactions = Vec::new();
        for entity in self.entities.iter_mut() {
            let outcome = entity.advance(dt, &sensors);
            if outcome.trajectory_ended {
                if let Some(action) = entity.trajectory_end_action() {
                    reactions.push((entity.id(), action));
                }
            }
            if outcome.animation_ended {
                if let Some(action) = entity.animation_end_action() {
                    reactions.push((entity.id(), action));
                }
            }
        }

        for (id, action) in reactions {
            match action {
                EndAction::Kill => self.mark_dead(id),
                EndAction::Explode => self.destroy(id),
            }
        }

        self.ticks += 1;
        self.elapsed += dt;
    }

    /// Drop dead entities. Returns the removed ids.
    pub(crate) fn sweep(&mut self) -> Vec<EntityId> {
        let mut removed = Vec::new();
        self.entities.retain(|e| {
            if !e.is_alive() {
                removed.push(e.id());
            }
            e.is_alive()
        });
        for &id in &removed {
            self.events.push(SimEvent::Removed { id });
        }
        if let Some(pilot) = self.pilot.as_ref() {
            if removed.contains(&pilot.id) {
                log::debug!("pilot {:?} removed", pilot.id);
                self.pilot = None;
            }
        }
        removed
    }
}
