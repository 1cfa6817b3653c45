//! Game balance
//!
//! Everything the director and the actor factories read to decide speeds,
//! cadences and squadron sizes. Defaults reproduce the arcade balance; a
//! JSON sheet can override any of it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Floor/ceiling pair interpolated by difficulty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRange {
    /// Value at difficulty 0
    pub easy: f32,
    /// Value at difficulty 100 and above
    pub hard: f32,
}

impl DifficultyRange {
    pub const fn new(easy: f32, hard: f32) -> Self {
        Self { easy, hard }
    }

    /// Linear interpolation for a difficulty factor in [0, 1]
    pub fn at(&self, factor: f32) -> f32 {
        self.easy + (self.hard - self.easy) * factor.clamp(0.0, 1.0)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.easy.is_finite() || !self.hard.is_finite() {
            return Err(SimError::InvalidTuning(format!("{name} must be finite")));
        }
        Ok(())
    }
}

/// Player ship handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerTuning {
    /// Pixels per second
    pub speed: f32,
    /// Degrees per second while rotating
    pub rotation_speed: f32,
    /// Intro fly-in speed (pixels per second)
    pub intro_speed: f32,
    /// Pointer device units per world pixel
    pub pointer_scale: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 150.0,
            rotation_speed: 180.0,
            intro_speed: 80.0,
            pointer_scale: 1.0,
        }
    }
}

/// Enemy parameters that scale with difficulty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveTuning {
    pub insect_speed: DifficultyRange,
    pub insect_shot_speed: DifficultyRange,
    /// Seconds between insect shots
    pub insect_cannon_cooldown: DifficultyRange,
    pub squadron_size: DifficultyRange,
    /// Probability that a squadron slot spawns a mirrored pair
    pub double_squadron: DifficultyRange,
    /// Gap between squadron members, in pixels of path
    pub spawn_spacing: f32,
    /// Difficulty gained after each regular wave
    pub difficulty_step: f32,
    /// Upper bound of the difficulty scale
    pub max_difficulty: f32,
    /// Waves per cycle before the boss shows up
    pub waves_per_cycle: u32,
    /// Wave index (within a cycle) replaced by the bonus round
    pub bonus_wave: u32,
    /// Lateral offset of mirrored-pair insects
    pub pair_shift: f32,
    /// Number of insect visual variants to pick from
    pub insect_variants: u32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            insect_speed: DifficultyRange::new(50.0, 120.0),
            insect_shot_speed: DifficultyRange::new(80.0, 160.0),
            insect_cannon_cooldown: DifficultyRange::new(2.0, 0.5),
            squadron_size: DifficultyRange::new(5.0, 15.0),
            double_squadron: DifficultyRange::new(0.0, 1.0),
            spawn_spacing: 20.0,
            difficulty_step: 2.0,
            max_difficulty: 100.0,
            waves_per_cycle: 10,
            bonus_wave: 5,
            pair_shift: 8.0,
            insect_variants: 4,
        }
    }
}

/// Fixed enemy stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTuning {
    pub raider_speed: f32,
    pub bonus_raider_speed: f32,
    /// Red raiders per bonus round
    pub bonus_raiders: u32,
    /// Seconds between bonus raiders
    pub bonus_raider_interval: f32,
    pub missile_speed: f32,
    /// Seconds between raider missiles
    pub missile_cooldown: f32,
    /// Missile turn cap in degrees per tick
    pub missile_turn: f32,
    /// Seconds before an enemy's first shot
    pub first_shot_delay: f32,
    /// Random spread applied to insect shots (± degrees)
    pub shot_jitter: f32,
    pub boss_speed: f32,
    /// Boss turn cap in degrees per tick
    pub boss_turn: f32,
    pub boss_hit_points: f32,
    pub boss_shot_speed: f32,
    /// Damage dealt by enemy projectiles
    pub shot_damage: f32,
    /// Chance that a destroyed enemy leaves a power capsule
    pub capsule_drop_chance: f32,
    pub capsule_speed: f32,
    pub capsule_power: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            raider_speed: 120.0,
            bonus_raider_speed: 160.0,
            bonus_raiders: 10,
            bonus_raider_interval: 1.0,
            missile_speed: 150.0,
            missile_cooldown: 1.0,
            missile_turn: 3.0,
            first_shot_delay: 0.1,
            shot_jitter: 10.0,
            boss_speed: 20.0,
            boss_turn: 2.0,
            boss_hit_points: 300.0,
            boss_shot_speed: 100.0,
            shot_damage: 10.0,
            capsule_drop_chance: 0.25,
            capsule_speed: 40.0,
            capsule_power: 10.0,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub waves: WaveTuning,
    pub enemies: EnemyTuning,
    /// Insect flight paths (control points); one is picked per wave
    pub paths: Vec<Vec<Vec2>>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player: PlayerTuning::default(),
            waves: WaveTuning::default(),
            enemies: EnemyTuning::default(),
            paths: default_paths(),
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON balance sheet
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.waves;
        w.insect_speed.validate("insect_speed")?;
        w.insect_shot_speed.validate("insect_shot_speed")?;
        w.insect_cannon_cooldown.validate("insect_cannon_cooldown")?;
        w.squadron_size.validate("squadron_size")?;
        w.double_squadron.validate("double_squadron")?;

        if w.insect_speed.easy <= 0.0 || w.insect_speed.hard <= 0.0 {
            return Err(SimError::InvalidTuning("insect_speed must be positive".into()));
        }
        if w.squadron_size.easy < 0.0 || w.squadron_size.easy > w.squadron_size.hard {
            return Err(SimError::InvalidTuning(format!(
                "squadron_size bounds inverted ({} > {})",
                w.squadron_size.easy, w.squadron_size.hard
            )));
        }
        if w.waves_per_cycle == 0 {
            return Err(SimError::InvalidTuning("waves_per_cycle must be at least 1".into()));
        }
        if w.difficulty_step <= 0.0 {
            return Err(SimError::InvalidTuning("difficulty_step must be positive".into()));
        }
        if w.insect_variants == 0 {
            return Err(SimError::InvalidTuning("insect_variants must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.enemies.capsule_drop_chance) {
            return Err(SimError::InvalidTuning(format!(
                "capsule_drop_chance {} outside [0, 1]",
                self.enemies.capsule_drop_chance
            )));
        }
        if self.player.pointer_scale <= 0.0 {
            return Err(SimError::InvalidTuning("pointer_scale must be positive".into()));
        }
        if self.paths.is_empty() {
            return Err(SimError::InvalidTuning("path catalogue is empty".into()));
        }
        if let Some(i) = self.paths.iter().position(|p| p.len() < 2) {
            return Err(SimError::InvalidTuning(format!("path {i} has fewer than 2 points")));
        }
        Ok(())
    }
}

fn points(raw: &[(f32, f32)]) -> Vec<Vec2> {
    raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
}

fn reversed(mut path: Vec<Vec2>) -> Vec<Vec2> {
    path.reverse();
    path
}

/// The ten insect flight paths of the arcade game
fn default_paths() -> Vec<Vec<Vec2>> {
    let zigzag = points(&[
        (188.0, -10.0),
        (30.0, 135.0),
        (28.0, 163.0),
        (46.0, 182.0),
        (73.0, 175.0),
        (211.0, 58.0),
        (231.0, 58.0),
        (244.0, 75.0),
        (242.0, 103.0),
        (53.0, 298.0),
    ]);
    let u_turn = points(&[
        (42.0, -10.0),
        (42.0, 123.0),
        (52.0, 140.0),
        (72.0, 149.0),
        (228.0, 149.0),
        (241.0, 141.0),
        (245.0, 124.0),
        (245.0, -10.0),
    ]);
    vec![
        zigzag.clone(),
        reversed(zigzag),
        u_turn.clone(),
        reversed(u_turn),
        points(&[
            (298.0, -10.0),
            (250.0, 50.0),
            (200.0, 100.0),
            (150.0, 150.0),
            (100.0, 200.0),
            (50.0, 250.0),
            (50.0, 250.0),
            (100.0, 200.0),
            (150.0, 150.0),
            (200.0, 100.0),
            (250.0, 50.0),
            (298.0, -10.0),
        ]),
        points(&[
            (-10.0, 150.0),
            (50.0, 100.0),
            (100.0, 50.0),
            (150.0, 0.0),
            (200.0, 50.0),
            (250.0, 100.0),
            (250.0, 200.0),
            (200.0, 250.0),
            (150.0, 268.0),
            (100.0, 250.0),
            (50.0, 200.0),
            (-10.0, 150.0),
        ]),
        points(&[
            (150.0, -10.0),
            (100.0, 50.0),
            (50.0, 100.0),
            (0.0, 150.0),
            (50.0, 200.0),
            (100.0, 250.0),
            (150.0, 268.0),
            (200.0, 250.0),
            (250.0, 200.0),
            (268.0, 150.0),
            (250.0, 100.0),
            (200.0, 50.0),
            (150.0, -10.0),
        ]),
        points(&[
            (0.0, -10.0),
            (50.0, 50.0),
            (100.0, 100.0),
            (150.0, 150.0),
            (200.0, 200.0),
            (250.0, 250.0),
            (268.0, 268.0),
            (250.0, 250.0),
            (200.0, 200.0),
            (150.0, 150.0),
            (100.0, 100.0),
            (50.0, 50.0),
            (0.0, -10.0),
        ]),
        points(&[
            (10.0, -10.0),
            (50.0, 50.0),
            (100.0, 100.0),
            (150.0, 150.0),
            (200.0, 200.0),
            (250.0, 250.0),
            (270.0, 270.0),
            (250.0, 250.0),
            (200.0, 200.0),
            (150.0, 150.0),
            (100.0, 100.0),
            (50.0, 50.0),
            (10.0, -10.0),
        ]),
        points(&[
            (-10.0, 20.0),
            (60.0, 60.0),
            (110.0, 110.0),
            (160.0, 160.0),
            (210.0, 210.0),
            (260.0, 260.0),
            (280.0, 280.0),
            (260.0, 260.0),
            (210.0, 210.0),
            (160.0, 160.0),
            (110.0, 110.0),
            (60.0, 60.0),
            (-10.0, 20.0),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let t = Tuning::default();
        t.validate().unwrap();
        assert_eq!(t.paths.len(), 10);
        assert_eq!(t.paths[1][0], Vec2::new(53.0, 298.0));
    }

    #[test]
    fn test_difficulty_range_clamps() {
        let r = DifficultyRange::new(2.0, 0.5);
        assert_eq!(r.at(0.0), 2.0);
        assert_eq!(r.at(1.0), 0.5);
        assert_eq!(r.at(1.7), 0.5);
        assert_eq!(r.at(-3.0), 2.0);
    }

    #[test]
    fn test_json_round_trip_keeps_overrides() {
        let mut t = Tuning::default();
        t.waves.difficulty_step = 5.0;
        let json = t.to_json().unwrap();
        let back = Tuning::from_json(&json).unwrap();
        assert_eq!(back.waves.difficulty_step, 5.0);
        assert_eq!(back.paths, t.paths);
    }

    #[test]
    fn test_rejects_bad_sheets() {
        let mut t = Tuning::default();
        t.paths.clear();
        assert!(matches!(t.validate(), Err(SimError::InvalidTuning(_))));

        let mut t = Tuning::default();
        t.waves.squadron_size = DifficultyRange::new(10.0, 5.0);
        assert!(t.validate().is_err());

        let mut t = Tuning::default();
        t.enemies.capsule_drop_chance = 1.5;
        assert!(t.validate().is_err());

        assert!(matches!(Tuning::from_json("{ not json"), Err(SimError::Json(_))));
    }
}
