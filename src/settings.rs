//! Player preferences
//!
//! Read once when a session starts and handed to the difficulty curve and the
//! player. Written back only when the player changes something.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::persistence::{Storage, load_json, save_json};
use crate::sim::difficulty::DifficultyMode;

/// Default player color (0xRRGGBB)
pub const DEFAULT_PLAYER_COLOR: u32 = 0xff3366;

/// Game settings/preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active difficulty mode
    pub difficulty_mode: DifficultyMode,
    /// Player body color (0xRRGGBB)
    pub player_color: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty_mode: DifficultyMode::Normal,
            player_color: DEFAULT_PLAYER_COLOR,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "skyward_settings";

    /// Load settings, falling back to defaults when absent or unreadable
    pub fn load(storage: &dyn Storage) -> Self {
        match load_json(storage, Self::STORAGE_KEY) {
            Some(settings) => {
                log::info!("Loaded settings from storage");
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        save_json(storage, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}
