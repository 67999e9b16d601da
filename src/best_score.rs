//! Persisted best score
//!
//! A single scalar, loaded at startup and written whenever a run beats it.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::persistence::{Storage, load_json, save_json};

/// Best score across runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestScore {
    pub score: u64,
}

impl BestScore {
    /// Storage key
    const STORAGE_KEY: &'static str = "skyward_best_score";

    pub fn new(score: u64) -> Self {
        Self { score }
    }

    /// Check if a score would replace the current best
    pub fn qualifies(&self, score: u64) -> bool {
        score > self.score
    }

    /// Record a score, returning true if it became the new best
    pub fn submit(&mut self, score: u64) -> bool {
        if !self.qualifies(score) {
            return false;
        }
        self.score = score;
        true
    }

    pub fn load(storage: &dyn Storage) -> Self {
        let best = load_json::<u64>(storage, Self::STORAGE_KEY).unwrap_or(0);
        log::info!("Loaded best score {}", best);
        Self::new(best)
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        save_json(storage, Self::STORAGE_KEY, &self.score)
    }
}
