//! Signals produced for the UI and audio layers

use serde::{Deserialize, Serialize};

use super::difficulty::Milestone;
use super::enemy::EnemyId;
use super::platform::{PlatformId, PlatformSnapshot};
use super::score::{Achievement, RunSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Any change to the running score
    ScoreChanged { total: u64 },
    PlatformVisited {
        platform: PlatformSnapshot,
        is_new: bool,
        points: u64,
    },
    PlatformBroken { platform: PlatformId },
    EnemySpawned { enemy: EnemyId, platform: PlatformId },
    EnemyHit { enemy: EnemyId },
    HeightBonus { points: u64 },
    MilestoneReached { milestone: Milestone, points: u64 },
    AchievementUnlocked(Achievement),
    LevelChanged { level: u32 },
    NewBestScore { score: u64 },
    PlayerDied(RunSummary),
}
