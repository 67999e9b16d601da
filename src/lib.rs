//! Skyward - endless vertical platformer core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (world generation, difficulty, collisions, scoring)
//! - `persistence`: Key/value storage backends (LocalStorage on web)
//! - `settings`: Player-facing preferences
//! - `best_score`: Persisted best score
//! - `tuning`: Data-driven game balance

pub mod best_score;
pub mod error;
pub mod persistence;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use best_score::BestScore;
pub use error::{PhysicsError, StorageError, TuningError};
pub use settings::Settings;
pub use tuning::Tuning;

use rand::Rng;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Frame rate the per-frame tunings (friction, camera lerp) are expressed at
    pub const REFERENCE_FPS: f32 = 60.0;

    /// Gravity applied to dynamic bodies (units/s², y grows downward)
    pub const GRAVITY: f32 = 1800.0;
    /// Terminal fall speed for dynamic bodies
    pub const MAX_FALL_SPEED: f32 = 1200.0;
}

/// Uniform draw in `[lo, hi]` that tolerates an empty or inverted range.
#[inline]
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        lo
    } else {
        rng.random_range(lo..=hi)
    }
}

/// Bernoulli draw with the probability clamped into `[0, 1]`.
#[inline]
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f32) -> bool {
    rng.random_bool(f64::from(p.clamp(0.0, 1.0)))
}

/// Fair coin returning `1.0` or `-1.0`
#[inline]
pub fn coin_direction<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}
