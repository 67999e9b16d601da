//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies; physics and visuals sit behind
//!   the `PhysicsWorld` and `SceneLayer` traits

pub mod camera;
pub mod collision;
pub mod difficulty;
pub mod enemy;
pub mod events;
pub mod physics;
pub mod platform;
pub mod player;
pub mod pool;
pub mod scene;
pub mod schedule;
pub mod score;
pub mod state;
pub mod tick;
pub mod world;

pub use camera::Camera;
pub use collision::{ContactEvent, LandingRule, classify_contacts, is_landing};
pub use difficulty::{
    Adjustment, DifficultyCurve, DifficultyMode, DifficultyParams, LevelInfo, Milestone,
    ModeSuggestion, PlayerHistory,
};
pub use enemy::{Enemy, EnemyId, EnemyPopulator};
pub use events::GameEvent;
pub use physics::{BodyDesc, BodyHandle, ContactPair, Friction, PhysicsWorld, Shape, SimplePhysics};
pub use platform::{Axis, Motion, Platform, PlatformCategory, PlatformId, PlatformKind, PlatformSnapshot};
pub use player::{Facing, Player};
pub use pool::{PlatformPool, PoolStats, RemovedPlatform, Retirement};
pub use scene::{HeadlessScene, SceneLayer, VisualHandle, VisualKind};
pub use schedule::{Scheduler, TaskOwner};
pub use score::{Achievement, RunStats, RunSummary, ScoreLedger};
pub use state::{GamePhase, Session, Task};
pub use tick::{TickInput, tick};
pub use world::{WorldContext, WorldGenerator};
