//! Score ledger
//!
//! Pure bookkeeping: points, the combo streak, the visited set, run statistics
//! and achievements. Timing (the combo timeout) is owned by the caller, which
//! calls `reset_combo` when its scheduled reset fires.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::platform::{PlatformCategory, PlatformId, PlatformSnapshot};
use crate::best_score::BestScore;
use crate::tuning::ScoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Achievement {
    FirstJump,
    Height1000,
    Height5000,
    Height10000,
    Combo10,
    Combo25,
    Score1000,
    Score5000,
    PlatformsVisited100,
}

impl Achievement {
    pub fn title(&self) -> &'static str {
        match self {
            Achievement::FirstJump => "First Jump!",
            Achievement::Height1000 => "Reached 1000m!",
            Achievement::Height5000 => "Reached 5000m!",
            Achievement::Height10000 => "Reached 10000m!",
            Achievement::Combo10 => "10x Combo!",
            Achievement::Combo25 => "25x Combo Master!",
            Achievement::Score1000 => "1000 Points!",
            Achievement::Score5000 => "5000 Points!",
            Achievement::PlatformsVisited100 => "100 Platforms!",
        }
    }
}

const HEIGHT_ACHIEVEMENTS: [(f32, Achievement); 3] = [
    (1000.0, Achievement::Height1000),
    (5000.0, Achievement::Height5000),
    (10000.0, Achievement::Height10000),
];

const SCORE_ACHIEVEMENTS: [(u64, Achievement); 2] = [
    (1000, Achievement::Score1000),
    (5000, Achievement::Score5000),
];

/// Per-run statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub platforms_visited: u32,
    pub max_height: f32,
    pub total_jumps: u32,
    pub max_combo: u32,
}

/// Result of a platform visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitAward {
    pub is_new: bool,
    pub points: u64,
}

/// Final tally handed out when the player dies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_score: u64,
    pub best_score: u64,
    pub platforms_visited: u32,
    pub max_height: f32,
    pub max_combo: u32,
    pub total_jumps: u32,
    pub max_level: u32,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone)]
pub struct ScoreLedger {
    config: ScoreConfig,
    score: u64,
    best: BestScore,
    best_improved: bool,
    /// Highest height-bonus step paid so far
    height_watermark: u64,
    combo: u32,
    visited: HashSet<PlatformId>,
    stats: RunStats,
    achievements: BTreeSet<Achievement>,
    unlocked: Vec<Achievement>,
}

impl ScoreLedger {
    pub fn new(config: ScoreConfig, best: BestScore) -> Self {
        Self {
            config,
            score: 0,
            best,
            best_improved: false,
            height_watermark: 0,
            combo: 0,
            visited: HashSet::new(),
            stats: RunStats::default(),
            achievements: BTreeSet::new(),
            unlocked: Vec::new(),
        }
    }

    /// Start a new run. The best score carries over.
    pub fn reset(&mut self) {
        self.score = 0;
        self.best_improved = false;
        self.height_watermark = 0;
        self.combo = 0;
        self.visited.clear();
        self.stats = RunStats::default();
        self.achievements.clear();
        self.unlocked.clear();
    }

    /// Multiplier for the current streak
    pub fn combo_multiplier(&self) -> f32 {
        if self.combo <= 1 {
            return 1.0;
        }
        (1.0 + (self.combo - 1) as f32 * self.config.combo_step).min(self.config.max_combo_multiplier)
    }

    /// Add `base` points scaled by the combo multiplier, returning the points added
    fn add_score(&mut self, base: u64) -> u64 {
        // The epsilon keeps 10 * 1.2 from flooring to 11
        let points = (base as f32 * self.combo_multiplier() + 1e-3).floor() as u64;
        self.score += points;
        if self.best.submit(self.score) {
            self.best_improved = true;
        }
        for (threshold, achievement) in SCORE_ACHIEVEMENTS {
            if self.score >= threshold {
                self.unlock(achievement);
            }
        }
        points
    }

    fn unlock(&mut self, achievement: Achievement) {
        if self.achievements.insert(achievement) {
            log::info!("Achievement unlocked: {}", achievement.title());
            self.unlocked.push(achievement);
        }
    }

    /// Mark a platform visited without paying for it (the start platform)
    pub fn mark_visited(&mut self, id: PlatformId) {
        self.visited.insert(id);
    }

    pub fn is_visited(&self, id: PlatformId) -> bool {
        self.visited.contains(&id)
    }

    /// Pay for a first visit; revisits are worth nothing. The multiplier in
    /// effect before the visit applies, then the streak grows.
    pub fn award_platform_visit(&mut self, platform: &PlatformSnapshot) -> VisitAward {
        if !self.visited.insert(platform.id) {
            return VisitAward {
                is_new: false,
                points: 0,
            };
        }

        let base = match platform.category {
            PlatformCategory::Moving => self.config.points_moving,
            PlatformCategory::Static | PlatformCategory::Breakable => self.config.points_static,
        };
        let points = self.add_score(base);

        self.combo += 1;
        self.stats.max_combo = self.stats.max_combo.max(self.combo);
        match self.combo {
            10 => self.unlock(Achievement::Combo10),
            25 => self.unlock(Achievement::Combo25),
            _ => {}
        }

        self.stats.platforms_visited += 1;
        if self.stats.platforms_visited == 100 {
            self.unlock(Achievement::PlatformsVisited100);
        }

        VisitAward { is_new: true, points }
    }

    /// Pay once when a new height interval is crossed. Returns 0 otherwise.
    pub fn award_height_bonus(&mut self, height: f32) -> u64 {
        self.stats.max_height = self.stats.max_height.max(height);
        let step = (height.max(0.0) / self.config.height_bonus_interval).floor() as u64;
        if step <= self.height_watermark {
            return 0;
        }
        self.height_watermark = step;
        let points = self.add_score(self.config.height_bonus_points);
        for (threshold, achievement) in HEIGHT_ACHIEVEMENTS {
            if height >= threshold {
                self.unlock(achievement);
            }
        }
        points
    }

    /// Milestone and other one-off bonuses
    pub fn award_bonus(&mut self, base: u64) -> u64 {
        self.add_score(base)
    }

    pub fn record_jump(&mut self) {
        self.stats.total_jumps += 1;
        self.unlock(Achievement::FirstJump);
    }

    pub fn reset_combo(&mut self) {
        self.combo = 0;
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn current_score(&self) -> u64 {
        self.score
    }

    pub fn best_score(&self) -> u64 {
        self.best.score
    }

    pub fn best(&self) -> &BestScore {
        &self.best
    }

    /// True once after each improvement of the best score
    pub fn take_best_improved(&mut self) -> bool {
        std::mem::take(&mut self.best_improved)
    }

    /// Achievements unlocked since the last call
    pub fn drain_unlocked(&mut self) -> Vec<Achievement> {
        std::mem::take(&mut self.unlocked)
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn achievements(&self) -> impl Iterator<Item = Achievement> + '_ {
        self.achievements.iter().copied()
    }

    pub fn summary(&self, max_level: u32) -> RunSummary {
        RunSummary {
            final_score: self.score,
            best_score: self.best.score,
            platforms_visited: self.stats.platforms_visited,
            max_height: self.stats.max_height,
            max_combo: self.stats.max_combo,
            total_jumps: self.stats.total_jumps,
            max_level,
            achievements: self.achievements().collect(),
        }
    }
}
