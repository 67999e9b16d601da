//! Difficulty curve
//!
//! Maps climbed height to generation parameters. The only state carried is the
//! active mode, the last observed level, the best level of the run and which
//! milestones have paid out; everything else is recomputed per query.

use serde::{Deserialize, Serialize};

use crate::tuning::{DifficultyTuning, ModeModifiers};

/// Difficulty modes, ordered easiest to hardest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyMode {
    Easy,
    #[default]
    Normal,
    Hard,
    Extreme,
}

impl DifficultyMode {
    pub const ALL: [DifficultyMode; 4] = [
        DifficultyMode::Easy,
        DifficultyMode::Normal,
        DifficultyMode::Hard,
        DifficultyMode::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyMode::Easy => "easy",
            DifficultyMode::Normal => "normal",
            DifficultyMode::Hard => "hard",
            DifficultyMode::Extreme => "extreme",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(DifficultyMode::Easy),
            "normal" => Some(DifficultyMode::Normal),
            "hard" => Some(DifficultyMode::Hard),
            "extreme" => Some(DifficultyMode::Extreme),
            _ => None,
        }
    }

    /// One step harder (saturates at Extreme)
    pub fn next(&self) -> Self {
        let i = *self as usize;
        Self::ALL[(i + 1).min(Self::ALL.len() - 1)]
    }

    /// One step easier (saturates at Easy)
    pub fn previous(&self) -> Self {
        let i = *self as usize;
        Self::ALL[i.saturating_sub(1)]
    }
}

/// Generation parameters at a given height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParams {
    pub min_gap: f32,
    pub max_gap: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub breakable_chance: f32,
    pub moving_chance: f32,
    pub enemy_chance: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub level: u32,
}

/// A height milestone that paid out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub height: f32,
    pub bonus: u64,
}

/// Aggregate performance across runs (owned by the caller)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerHistory {
    pub attempts: u32,
    pub deaths: u32,
    pub total_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    Decrease,
    Increase,
}

/// Advisory mode change; never applied automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeSuggestion {
    pub adjustment: Adjustment,
    pub reason: &'static str,
    pub current: DifficultyMode,
    pub suggested: DifficultyMode,
}

/// Display info for the current level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub name: &'static str,
    pub mode: DifficultyMode,
    pub next_level_height: f32,
}

const LEVEL_NAMES: [&str; 10] = [
    "Beginner",
    "Novice",
    "Intermediate",
    "Advanced",
    "Expert",
    "Master",
    "Legendary",
    "Mythical",
    "Impossible",
    "Godlike",
];

/// Death rate above which an easier mode is suggested
const STRUGGLING_DEATH_RATE: f32 = 0.8;
/// Death rate below which (with enough height) a harder mode is suggested
const CRUISING_DEATH_RATE: f32 = 0.2;
const CRUISING_AVERAGE_HEIGHT: f32 = 5000.0;

/// Height → generation parameters
#[derive(Debug, Clone)]
pub struct DifficultyCurve {
    tuning: DifficultyTuning,
    mode: DifficultyMode,
    current_level: u32,
    max_reached_level: u32,
    claimed_milestones: Vec<bool>,
    /// Tallest gap the player can jump
    gap_ceiling: f32,
}

impl DifficultyCurve {
    pub fn new(tuning: DifficultyTuning, mode: DifficultyMode) -> Self {
        let claimed_milestones = vec![false; tuning.milestones.len()];
        Self {
            tuning,
            mode,
            current_level: 0,
            max_reached_level: 0,
            claimed_milestones,
            gap_ceiling: f32::INFINITY,
        }
    }

    /// Clamp every generated gap to what a jump can clear
    pub fn with_gap_ceiling(mut self, ceiling: f32) -> Self {
        self.gap_ceiling = ceiling.max(1.0);
        self
    }

    pub fn gap_ceiling(&self) -> f32 {
        self.gap_ceiling
    }

    pub fn tuning(&self) -> &DifficultyTuning {
        &self.tuning
    }

    pub fn mode(&self) -> DifficultyMode {
        self.mode
    }

    /// Change the mode; takes effect on the next query
    pub fn set_mode(&mut self, mode: DifficultyMode) {
        if mode != self.mode {
            log::info!("Difficulty mode {} -> {}", self.mode.as_str(), mode.as_str());
        }
        self.mode = mode;
    }

    fn modifiers(&self) -> &ModeModifiers {
        self.tuning.modes.for_mode(self.mode)
    }

    /// Level for a climbed height (non-positive and NaN heights are level 0)
    pub fn level_for_height(&self, height: f32) -> u32 {
        if height > 0.0 {
            // `as` saturates, so absurd heights pin at u32::MAX
            (height / self.tuning.interval).floor() as u32
        } else {
            0
        }
    }

    /// Generation parameters for a climbed height
    pub fn parameters_for(&self, height: f32) -> DifficultyParams {
        self.parameters_for_level(self.level_for_height(height))
    }

    /// Generation parameters for a level: capped progression, then mode
    /// scaling, then the jump ceiling on gaps
    pub fn parameters_for_level(&self, level: u32) -> DifficultyParams {
        let t = &self.tuning;
        let m = self.modifiers();
        let ceiling = t.probability_ceiling;
        let max_gap = (t.max_gap.at(level) * m.gap).floor().min(self.gap_ceiling);

        DifficultyParams {
            min_gap: (t.min_gap.at(level) * m.gap).floor().min(max_gap),
            max_gap,
            min_width: (t.min_width.at(level) * m.width).floor().max(1.0),
            max_width: (t.max_width.at(level) * m.width).floor().max(1.0),
            breakable_chance: (t.breakable_chance.at(level) * m.breakable).min(ceiling),
            moving_chance: (t.moving_chance.at(level) * m.moving).min(ceiling),
            enemy_chance: (t.enemy_chance.at(level) * m.enemy).min(ceiling),
            min_speed: t.min_speed.at(level) * m.speed,
            max_speed: t.max_speed.at(level) * m.speed,
            level,
        }
    }

    /// Track the player's height; returns the new level when it changed
    pub fn observe_height(&mut self, height: f32) -> Option<u32> {
        let level = self.level_for_height(height);
        self.max_reached_level = self.max_reached_level.max(level);
        if level == self.current_level {
            return None;
        }
        self.current_level = level;
        Some(level)
    }

    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    pub fn max_reached_level(&self) -> u32 {
        self.max_reached_level
    }

    /// First unclaimed milestone at or below `height`; each pays once per run
    pub fn check_milestone(&mut self, height: f32) -> Option<Milestone> {
        let factor = self.tuning.milestone_bonus_factor;
        let (index, &milestone) = self
            .tuning
            .milestones
            .iter()
            .enumerate()
            .find(|&(i, &m)| height >= m && !self.claimed_milestones[i])?;
        self.claimed_milestones[index] = true;
        log::info!("Milestone {} reached", milestone);
        Some(Milestone {
            height: milestone,
            bonus: milestone as u64 * factor,
        })
    }

    /// Suggest a mode change from cross-run performance
    pub fn suggest_adjustment(&self, history: &PlayerHistory) -> Option<ModeSuggestion> {
        let attempts = history.attempts.max(1) as f32;
        let death_rate = history.deaths as f32 / attempts;
        let average_height = history.total_height / attempts;

        if death_rate > STRUGGLING_DEATH_RATE && self.mode != DifficultyMode::Easy {
            Some(ModeSuggestion {
                adjustment: Adjustment::Decrease,
                reason: "High death rate detected",
                current: self.mode,
                suggested: self.mode.previous(),
            })
        } else if death_rate < CRUISING_DEATH_RATE
            && average_height > CRUISING_AVERAGE_HEIGHT
            && self.mode != DifficultyMode::Extreme
        {
            Some(ModeSuggestion {
                adjustment: Adjustment::Increase,
                reason: "Excellent performance detected",
                current: self.mode,
                suggested: self.mode.next(),
            })
        } else {
            None
        }
    }

    pub fn level_info(&self) -> LevelInfo {
        let name = LEVEL_NAMES[(self.current_level as usize).min(LEVEL_NAMES.len() - 1)];
        LevelInfo {
            level: self.current_level,
            name,
            mode: self.mode,
            next_level_height: (self.current_level as f32 + 1.0) * self.tuning.interval,
        }
    }

    /// Start a new run: level and milestones reset, best level kept
    pub fn reset(&mut self) {
        self.current_level = 0;
        self.claimed_milestones.iter_mut().for_each(|c| *c = false);
    }
}
