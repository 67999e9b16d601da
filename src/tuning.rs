//! Data-driven game balance
//!
//! Every number the generator, difficulty curve, scorer and player read lives
//! here. `Default` reproduces the shipped balance; JSON overrides may be
//! partial since every section is `#[serde(default)]`.

use serde::{Deserialize, Serialize};

use crate::consts::{GRAVITY, SIM_DT};
use crate::error::TuningError;
use crate::sim::difficulty::DifficultyMode;

/// A per-level linear progression clamped to a hard limit.
///
/// Rising progressions (`per_level >= 0`) saturate at `limit` from below,
/// falling ones saturate at `limit` from above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub base: f32,
    pub per_level: f32,
    pub limit: f32,
}

impl Progression {
    pub const fn new(base: f32, per_level: f32, limit: f32) -> Self {
        Self {
            base,
            per_level,
            limit,
        }
    }

    /// Value at the given difficulty level
    pub fn at(&self, level: u32) -> f32 {
        let raw = self.base + level as f32 * self.per_level;
        if self.per_level >= 0.0 {
            raw.min(self.limit)
        } else {
            raw.max(self.limit)
        }
    }
}

/// Multipliers a difficulty mode applies after the level caps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeModifiers {
    pub gap: f32,
    pub width: f32,
    pub breakable: f32,
    pub moving: f32,
    pub enemy: f32,
    pub speed: f32,
}

impl ModeModifiers {
    pub const IDENTITY: Self = Self {
        gap: 1.0,
        width: 1.0,
        breakable: 1.0,
        moving: 1.0,
        enemy: 1.0,
        speed: 1.0,
    };
}

/// Modifier vectors per difficulty mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTable {
    pub easy: ModeModifiers,
    pub normal: ModeModifiers,
    pub hard: ModeModifiers,
    pub extreme: ModeModifiers,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self {
            easy: ModeModifiers {
                gap: 0.8,
                width: 1.2,
                breakable: 0.5,
                moving: 0.5,
                enemy: 0.5,
                speed: 0.7,
            },
            normal: ModeModifiers::IDENTITY,
            hard: ModeModifiers {
                gap: 1.2,
                width: 0.9,
                breakable: 1.5,
                moving: 1.5,
                enemy: 1.5,
                speed: 1.3,
            },
            extreme: ModeModifiers {
                gap: 1.5,
                width: 0.7,
                breakable: 2.0,
                moving: 2.0,
                enemy: 2.0,
                speed: 1.6,
            },
        }
    }
}

impl ModeTable {
    pub fn for_mode(&self, mode: DifficultyMode) -> &ModeModifiers {
        match mode {
            DifficultyMode::Easy => &self.easy,
            DifficultyMode::Normal => &self.normal,
            DifficultyMode::Hard => &self.hard,
            DifficultyMode::Extreme => &self.extreme,
        }
    }
}

/// Difficulty curve balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// Height climbed per difficulty level
    pub interval: f32,
    pub min_gap: Progression,
    pub max_gap: Progression,
    pub min_width: Progression,
    pub max_width: Progression,
    pub breakable_chance: Progression,
    pub moving_chance: Progression,
    pub enemy_chance: Progression,
    /// Platform speeds in units/second
    pub min_speed: Progression,
    pub max_speed: Progression,
    /// Upper bound on any probability after mode scaling
    pub probability_ceiling: f32,
    /// Heights that award a one-time bonus
    pub milestones: Vec<f32>,
    /// Bonus points = milestone height * factor
    pub milestone_bonus_factor: u64,
    pub modes: ModeTable,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            interval: 1000.0,
            min_gap: Progression::new(100.0, 5.0, 150.0),
            max_gap: Progression::new(180.0, 10.0, 250.0),
            min_width: Progression::new(100.0, -5.0, 60.0),
            max_width: Progression::new(300.0, -10.0, 150.0),
            breakable_chance: Progression::new(0.15, 0.05, 0.60),
            moving_chance: Progression::new(0.20, 0.08, 0.75),
            enemy_chance: Progression::new(0.10, 0.03, 0.40),
            min_speed: Progression::new(60.0, 18.0, 240.0),
            max_speed: Progression::new(120.0, 30.0, 360.0),
            probability_ceiling: 0.95,
            milestones: vec![1000.0, 2500.0, 5000.0, 7500.0, 10000.0, 15000.0, 20000.0],
            milestone_bonus_factor: 10,
            modes: ModeTable::default(),
        }
    }
}

/// World generation and pooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub screen_width: f32,
    /// Horizontal padding kept clear on both sides
    pub padding_x: f32,
    /// Start platform sits this far below the player's spawn point
    pub start_platform_offset_y: f32,
    pub platform_height: f32,
    /// Width of the start platform and tutorial platforms
    pub safe_platform_width: f32,
    pub tutorial_count: u32,
    pub tutorial_min_gap: f32,
    pub tutorial_max_gap: f32,
    /// Generate ahead while the cursor is closer than this to the player
    pub generation_distance: f32,
    pub batch_size: u32,
    pub max_jump_distance: f32,
    /// Height tolerance when looking up the previous row
    pub row_tolerance: f32,
    /// Evict platforms this far below the camera bottom
    pub cleanup_buffer: f32,
    pub pool_grow_step: u32,
    /// Pool cap = pool_grow_step * pool_cap_factor
    pub pool_cap_factor: u32,
    /// Vertical movers travel this far either side of their spawn height
    pub vertical_travel: f32,
    pub vertical_chance: Progression,
    /// Seconds a breakable platform lingers after being triggered
    pub break_duration: f32,
    /// Anchor cold-start placements on the nearest platform instead of
    /// placing them unconstrained
    pub strict_reachability: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            padding_x: 100.0,
            start_platform_offset_y: 100.0,
            platform_height: 28.0,
            safe_platform_width: 200.0,
            tutorial_count: 5,
            tutorial_min_gap: 120.0,
            tutorial_max_gap: 150.0,
            generation_distance: 1500.0,
            batch_size: 5,
            max_jump_distance: 250.0,
            row_tolerance: 60.0,
            cleanup_buffer: 500.0,
            pool_grow_step: 10,
            pool_cap_factor: 20,
            vertical_travel: 100.0,
            vertical_chance: Progression::new(0.2, 0.05, 0.5),
            break_duration: 0.5,
            strict_reachability: true,
        }
    }
}

impl WorldConfig {
    /// Leftmost x a platform center may take
    pub fn min_x(&self) -> f32 {
        self.padding_x
    }

    /// Rightmost x a platform center may take
    pub fn max_x(&self) -> f32 {
        (self.screen_width - self.padding_x).max(self.padding_x)
    }

    pub fn pool_cap(&self) -> usize {
        (self.pool_grow_step * self.pool_cap_factor) as usize
    }
}

/// Scoring and combo balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub points_static: u64,
    pub points_moving: u64,
    pub height_bonus_interval: f32,
    pub height_bonus_points: u64,
    /// Seconds without a visit before the combo resets
    pub combo_timeout: f32,
    pub combo_step: f32,
    pub max_combo_multiplier: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            points_static: 10,
            points_moving: 15,
            height_bonus_interval: 500.0,
            height_bonus_points: 50,
            combo_timeout: 2.0,
            combo_step: 0.2,
            max_combo_multiplier: 5.0,
        }
    }
}

/// Enemy placement and patrol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub radius: f32,
    /// Enemy center sits this far above the platform center
    pub height_offset: f32,
    /// Patrol turns around this far from a platform edge
    pub edge_margin: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Seconds between the spawn roll and the enemy appearing
    pub spawn_delay: f32,
    /// Scale on enemy chance for spawns triggered by a landing
    pub landing_spawn_factor: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            radius: 15.0,
            height_offset: 25.0,
            edge_margin: 15.0,
            min_speed: 60.0,
            max_speed: 120.0,
            spawn_delay: 0.1,
            landing_spawn_factor: 0.5,
        }
    }
}

/// Player body and controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    pub move_speed: f32,
    /// Vertical velocity applied on jump (negative is up)
    pub jump_velocity: f32,
    /// Height the feet must clear above a platform top for its row to count
    /// as reachable
    pub jump_clearance: f32,
    /// Horizontal velocity retained per reference frame with no input
    pub air_friction: f32,
    /// How far the player's feet may sink into a surface and still land
    pub landing_tolerance: f32,
    /// Die when this far below the camera bottom
    pub death_margin: f32,
    pub start_x: f32,
    pub start_y: f32,
    /// y coordinate that counts as height zero
    pub origin_y: f32,
    pub viewport_height: f32,
    /// Camera smoothing per reference frame
    pub camera_lerp: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 40.0,
            height: 60.0,
            move_speed: 300.0,
            jump_velocity: -1100.0,
            jump_clearance: 20.0,
            air_friction: 0.9,
            landing_tolerance: 24.0,
            death_margin: 200.0,
            start_x: 150.0,
            start_y: 800.0,
            origin_y: 800.0,
            viewport_height: 900.0,
            camera_lerp: 0.1,
        }
    }
}

impl PlayerConfig {
    /// Apex of a full jump, integrated at `dt` the way the physics step does
    /// it (velocity first, then position)
    pub fn jump_rise(&self, gravity: f32, dt: f32) -> f32 {
        let speed = -self.jump_velocity;
        if speed <= 0.0 || gravity <= 0.0 || dt <= 0.0 {
            return 0.0;
        }
        let dv = gravity * dt;
        let steps = (speed / dv).floor();
        dt * (steps * speed - dv * steps * (steps + 1.0) / 2.0)
    }

    /// Tallest row gap a full jump clears at the fixed timestep
    pub fn reachable_gap(&self) -> f32 {
        self.jump_rise(GRAVITY, SIM_DT) - self.jump_clearance
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub world: WorldConfig,
    pub difficulty: DifficultyTuning,
    pub score: ScoreConfig,
    pub enemy: EnemyConfig,
    pub player: PlayerConfig,
}

impl Tuning {
    /// Parse and validate tuning JSON (missing fields keep their defaults)
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject balance sheets the generator cannot honor
    pub fn validate(&self) -> Result<(), TuningError> {
        let d = &self.difficulty;
        positive("difficulty.interval", d.interval)?;
        ordered("difficulty.gap", d.min_gap.base, d.max_gap.base)?;
        ordered("difficulty.gap_limit", d.min_gap.limit, d.max_gap.limit)?;
        ordered("difficulty.width", d.min_width.base, d.max_width.base)?;
        ordered("difficulty.width_limit", d.min_width.limit, d.max_width.limit)?;
        ordered("difficulty.speed", d.min_speed.base, d.max_speed.base)?;
        positive("difficulty.min_gap", d.min_gap.base)?;
        positive("difficulty.min_width", d.min_width.limit)?;
        probability("difficulty.breakable_chance", d.breakable_chance.limit)?;
        probability("difficulty.moving_chance", d.moving_chance.limit)?;
        probability("difficulty.enemy_chance", d.enemy_chance.limit)?;
        probability("difficulty.probability_ceiling", d.probability_ceiling)?;

        let w = &self.world;
        ordered("world.padding_x", 2.0 * w.padding_x, w.screen_width)?;
        ordered("world.tutorial_gap", w.tutorial_min_gap, w.tutorial_max_gap)?;
        positive("world.tutorial_min_gap", w.tutorial_min_gap)?;
        positive("world.max_jump_distance", w.max_jump_distance)?;
        positive("world.platform_height", w.platform_height)?;
        positive("world.batch_size", w.batch_size as f32)?;
        probability("world.vertical_chance", w.vertical_chance.limit)?;

        let s = &self.score;
        positive("score.height_bonus_interval", s.height_bonus_interval)?;
        positive("score.max_combo_multiplier", s.max_combo_multiplier)?;

        // Max gaps are clamped to the jump; min gaps must fit under it as is
        let reach = self.player.reachable_gap();
        positive("player.reachable_gap", reach)?;
        ordered("difficulty.min_gap_reach", d.min_gap.base.max(d.min_gap.limit), reach)?;
        ordered("world.tutorial_gap_reach", w.tutorial_max_gap, reach)?;

        ordered("enemy.speed", self.enemy.min_speed, self.enemy.max_speed)?;
        probability("enemy.landing_spawn_factor", self.enemy.landing_spawn_factor)?;
        Ok(())
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), TuningError> {
    if min > max {
        return Err(TuningError::InvertedRange { field, min, max });
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value <= 0.0 {
        return Err(TuningError::NonPositive { field, value });
    }
    Ok(())
}

fn probability(field: &'static str, value: f32) -> Result<(), TuningError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TuningError::Probability { field, value });
    }
    Ok(())
}
