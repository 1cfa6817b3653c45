//! Player equipment: power source, cannon, turret, shield
//!
//! Weapons don't spawn anything themselves. `shoot` returns the shots to
//! create and the caller turns them into entities, so equipment stays plain
//! data that can be tested without a world.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::script::Cooldown;

/// Seconds the ship stays whited-out after the shield absorbs a hit
pub const WHITE_OUT_DURATION: f32 = 0.1;

/// Cannon shots fly straight up
pub const CANNON_HEADING: f32 = -90.0;
pub const CANNON_SHOT_SPEED: f32 = 600.0;
pub const TURRET_SHOT_SPEED: f32 = 300.0;
pub const SHOT_DAMAGE: f32 = 10.0;
/// Horizontal offset of the turbo laser wing cannons
pub const WING_OFFSET: f32 = 8.0;

/// (refresh seconds, power per shot) per upgrade level
pub type UpgradePath = &'static [(f32, f32)];

const CANNON_PATH: UpgradePath = &[(0.25, 10.0)];
const TURBO_LASER_PATH: UpgradePath = &[
    (0.1, 2.0),
    (0.07, 1.5),
    (0.05, 1.0),
    (0.05, 0.5),
    (0.05, 0.5),
    (0.05, 0.5),
];
const TURRET_PATH: UpgradePath = &[(0.2, 10.0)];
const MINIGUN_PATH: UpgradePath = &[(0.05, 5.0), (0.035, 1.5), (0.025, 1.0), (0.01, 0.5)];
const FLAK_PATH: UpgradePath = &[(0.5, 20.0), (0.3, 15.0), (0.2, 10.0), (0.2, 5.0), (0.2, 2.5)];

/// Flak spread, relative to the aim direction
const FLAK_SPREAD: [f32; 5] = [0.0, -15.0, 15.0, -30.0, 30.0];

/// A projectile to be spawned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotSpec {
    pub origin: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub damage: f32,
}

impl ShotSpec {
    fn new(origin: Vec2, heading: f32, speed: f32) -> Self {
        Self {
            origin,
            heading,
            speed,
            damage: SHOT_DAMAGE,
        }
    }
}

/// Rechargeable energy pool shared by all equipment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSource {
    power: f32,
    max: f32,
    /// Units per second
    regen: f32,
}

impl Default for PowerSource {
    fn default() -> Self {
        Self {
            power: 100.0,
            max: 100.0,
            regen: 10.0,
        }
    }
}

impl PowerSource {
    pub fn new(max: f32, regen: f32) -> Self {
        Self { power: max, max, regen }
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Fraction of a full charge, for the power bar
    pub fn level(&self) -> f32 {
        if self.max > 0.0 { self.power / self.max } else { 0.0 }
    }

    pub fn charge(&mut self, dt: f32) {
        self.power = (self.power + self.regen * dt).min(self.max);
    }

    pub fn charge_by(&mut self, amount: f32) {
        self.power = (self.power + amount).min(self.max);
    }

    pub fn available(&self, amount: f32) -> bool {
        self.power >= amount
    }

    pub fn consume(&mut self, amount: f32) {
        self.power = (self.power - amount).max(0.0);
    }
}

/// Upgrade level, refresh timer and power cost shared by both weapon types
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trigger {
    path: UpgradePath,
    level: usize,
    cooldown: Cooldown,
}

impl Trigger {
    fn new(path: UpgradePath) -> Self {
        let (refresh, _) = path[0];
        Self {
            path,
            level: 0,
            cooldown: Cooldown::new(refresh, 0.0),
        }
    }

    fn cost(&self) -> f32 {
        self.path[self.level].1
    }

    fn upgrade(&mut self) {
        self.level = (self.level + 1).min(self.path.len() - 1);
        self.cooldown.set_period(self.path[self.level].0);
    }

    /// Spend power and restart the timer if a shot is allowed now
    fn pull(&mut self, power: &mut PowerSource) -> bool {
        if !self.cooldown.is_ready() || !power.available(self.cost()) {
            return false;
        }
        power.consume(self.cost());
        self.cooldown.trigger();
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CannonKind {
    Standard,
    TurboLaser,
}

/// Forward gun
#[derive(Debug, Clone, PartialEq)]
pub struct Cannon {
    kind: CannonKind,
    trigger: Trigger,
    /// Turbo laser level 4 alternates between center and wing shots
    wing_next: bool,
}

impl Cannon {
    pub fn new(kind: CannonKind) -> Self {
        let path = match kind {
            CannonKind::Standard => CANNON_PATH,
            CannonKind::TurboLaser => TURBO_LASER_PATH,
        };
        Self {
            kind,
            trigger: Trigger::new(path),
            wing_next: false,
        }
    }

    pub fn kind(&self) -> CannonKind {
        self.kind
    }

    pub fn level(&self) -> usize {
        self.trigger.level
    }

    pub fn refresh_time(&self) -> f32 {
        self.trigger.cooldown.period()
    }

    pub fn power_cost(&self) -> f32 {
        self.trigger.cost()
    }

    pub fn update(&mut self, dt: f32) {
        self.trigger.cooldown.tick(dt);
    }

    pub fn upgrade(&mut self) {
        self.trigger.upgrade();
    }

    pub fn shoot(&mut self, origin: Vec2, power: &mut PowerSource) -> Vec<ShotSpec> {
        if !self.trigger.pull(power) {
            return Vec::new();
        }
        let up = |x_offset: f32| {
            ShotSpec::new(origin + Vec2::new(x_offset, 0.0), CANNON_HEADING, CANNON_SHOT_SPEED)
        };
        match (self.kind, self.trigger.level) {
            (CannonKind::TurboLaser, 4) => {
                let wing = self.wing_next;
                self.wing_next = !self.wing_next;
                if wing {
                    vec![up(-WING_OFFSET), up(WING_OFFSET)]
                } else {
                    vec![up(0.0)]
                }
            }
            (CannonKind::TurboLaser, level) if level > 4 => {
                vec![up(-WING_OFFSET), up(WING_OFFSET), up(0.0)]
            }
            _ => vec![up(0.0)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurretKind {
    Standard,
    Minigun,
    Flak,
}

/// Aimed gun (follows the pointer)
#[derive(Debug, Clone, PartialEq)]
pub struct Turret {
    kind: TurretKind,
    trigger: Trigger,
}

impl Turret {
    pub fn new(kind: TurretKind) -> Self {
        let path = match kind {
            TurretKind::Standard => TURRET_PATH,
            TurretKind::Minigun => MINIGUN_PATH,
            TurretKind::Flak => FLAK_PATH,
        };
        Self {
            kind,
            trigger: Trigger::new(path),
        }
    }

    pub fn kind(&self) -> TurretKind {
        self.kind
    }

    pub fn level(&self) -> usize {
        self.trigger.level
    }

    pub fn refresh_time(&self) -> f32 {
        self.trigger.cooldown.period()
    }

    pub fn update(&mut self, dt: f32) {
        self.trigger.cooldown.tick(dt);
    }

    pub fn upgrade(&mut self) {
        self.trigger.upgrade();
    }

    pub fn shoot(&mut self, origin: Vec2, heading: f32, power: &mut PowerSource) -> Vec<ShotSpec> {
        if !self.trigger.pull(power) {
            return Vec::new();
        }
        match self.kind {
            TurretKind::Flak => FLAK_SPREAD
                .iter()
                .map(|spread| ShotSpec::new(origin, heading + spread, TURRET_SHOT_SPEED))
                .collect(),
            TurretKind::Standard | TurretKind::Minigun => {
                vec![ShotSpec::new(origin, heading, TURRET_SHOT_SPEED)]
            }
        }
    }
}

/// Converts power into damage absorption
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    /// Damage absorbed per unit of power
    pub efficiency: f32,
}

impl Default for Shield {
    fn default() -> Self {
        Self { efficiency: 10.0 / 20.0 }
    }
}

impl Shield {
    /// True when the whole hit was paid for with power
    pub fn absorb(&self, damage: f32, power: &mut PowerSource) -> bool {
        let needed = damage / self.efficiency;
        if power.available(needed) {
            power.consume(needed);
            true
        } else {
            false
        }
    }
}

/// Everything the player ship carries
#[derive(Debug, Clone, PartialEq)]
pub struct Loadout {
    pub power: PowerSource,
    pub cannon: Option<Cannon>,
    pub turret: Option<Turret>,
    pub shield: Option<Shield>,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            power: PowerSource::default(),
            cannon: Some(Cannon::new(CannonKind::Standard)),
            turret: Some(Turret::new(TurretKind::Standard)),
            shield: Some(Shield::default()),
        }
    }
}

impl Loadout {
    /// Per-tick upkeep: recharge and cool down
    pub fn update(&mut self, dt: f32) {
        self.power.charge(dt);
        if let Some(cannon) = self.cannon.as_mut() {
            cannon.update(dt);
        }
        if let Some(turret) = self.turret.as_mut() {
            turret.update(dt);
        }
    }

    pub fn fire_cannon(&mut self, origin: Vec2) -> Vec<ShotSpec> {
        match self.cannon.as_mut() {
            Some(cannon) => cannon.shoot(origin, &mut self.power),
            None => Vec::new(),
        }
    }

    pub fn fire_turret(&mut self, origin: Vec2, heading: f32) -> Vec<ShotSpec> {
        match self.turret.as_mut() {
            Some(turret) => turret.shoot(origin, heading, &mut self.power),
            None => Vec::new(),
        }
    }
}

/// The player's ship state that outlives individual ticks
#[derive(Debug, Clone, PartialEq)]
pub struct Pilot {
    pub id: EntityId,
    pub loadout: Loadout,
    /// Remaining white-out (shield flash) time
    pub white_out: f32,
    /// False while a cutscene flies the ship
    pub controls_enabled: bool,
}

impl Pilot {
    pub fn new(id: EntityId, loadout: Loadout) -> Self {
        Self {
            id,
            loadout,
            white_out: 0.0,
            controls_enabled: true,
        }
    }

    /// Route a hit through the shield. Returns the damage that gets through.
    pub fn hit(&mut self, damage: f32) -> f32 {
        if let Some(shield) = self.loadout.shield {
            if shield.absorb(damage, &mut self.loadout.power) {
                self.white_out = WHITE_OUT_DURATION;
                return 0.0;
            }
        }
        damage
    }

    pub fn is_whited_out(&self) -> bool {
        self.white_out > 0.0
    }

    pub fn update(&mut self, dt: f32) {
        self.loadout.update(dt);
        self.white_out = (self.white_out - dt).max(0.0);
    }
}
