//! Session state
//!
//! A `Session` is one player's game: every subsystem, the seeded RNG, the
//! logical clock and the collaborators behind the physics, scene and storage
//! boundaries. `tick` drives it; the handlers here apply the outcome of each
//! pipeline stage.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::collision::{ContactEvent, LandingRule};
use super::difficulty::{DifficultyCurve, DifficultyMode, LevelInfo};
use super::enemy::EnemyPopulator;
use super::events::GameEvent;
use super::physics::{PhysicsWorld, Shape};
use super::platform::{Platform, PlatformId};
use super::player::Player;
use super::pool::RemovedPlatform;
use super::scene::{SceneLayer, VisualKind};
use super::schedule::{Scheduler, TaskOwner};
use super::score::{RunSummary, ScoreLedger};
use super::world::{WorldContext, WorldGenerator};
use crate::best_score::BestScore;
use crate::chance;
use crate::persistence::Storage;
use crate::settings::Settings;
use crate::tuning::Tuning;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// Player died; only `restart` leaves this phase
    GameOver,
}

/// Deferred work, keyed in the scheduler by its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    BreakComplete,
    SpawnEnemy,
    ComboReset,
}

pub struct Session<P: PhysicsWorld, S: SceneLayer> {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub settings: Settings,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Logical clock in seconds
    pub clock: f64,
    pub player: Player,
    pub camera: Camera,
    pub difficulty: DifficultyCurve,
    pub world: WorldGenerator,
    pub enemies: EnemyPopulator,
    pub score: ScoreLedger,
    pub physics: P,
    pub scene: S,
    pub(crate) rng: Pcg32,
    pub(crate) scheduler: Scheduler<Task>,
    pub(crate) landing_rule: LandingRule,
    events: Vec<GameEvent>,
    storage: Box<dyn Storage>,
    start_platform: PlatformId,
}

impl<P: PhysicsWorld, S: SceneLayer> Session<P, S> {
    /// Start a session. Settings and the best score are read from `storage`
    /// once, here.
    pub fn new(tuning: Tuning, seed: u64, mut physics: P, mut scene: S, storage: Box<dyn Storage>) -> Self {
        let settings = Settings::load(storage.as_ref());
        let best = BestScore::load(storage.as_ref());

        let player = Player::spawn(&tuning.player, settings.player_color, &mut physics, &mut scene);
        let camera = Camera::new(tuning.player.viewport_height, tuning.player.start_y);
        let difficulty = DifficultyCurve::new(tuning.difficulty.clone(), settings.difficulty_mode)
            .with_gap_ceiling(tuning.player.reachable_gap());
        let world = WorldGenerator::new(tuning.world.clone(), tuning.player.origin_y);
        let enemies = EnemyPopulator::new(tuning.enemy.clone());
        let score = ScoreLedger::new(tuning.score.clone(), best);
        let landing_rule = LandingRule::from_config(&tuning.player);

        let mut session = Self {
            seed,
            tuning,
            settings,
            phase: GamePhase::Playing,
            time_ticks: 0,
            clock: 0.0,
            player,
            camera,
            difficulty,
            world,
            enemies,
            score,
            physics,
            scene,
            rng: Pcg32::seed_from_u64(seed),
            scheduler: Scheduler::new(),
            landing_rule,
            events: Vec::new(),
            storage,
            start_platform: PlatformId(0),
        };
        session.begin_run();
        session
    }

    fn begin_run(&mut self) {
        let start = Vec2::new(self.tuning.player.start_x, self.tuning.player.start_y);
        let mut ctx = WorldContext {
            curve: &self.difficulty,
            rng: &mut self.rng,
            physics: &mut self.physics,
            scene: &mut self.scene,
        };
        self.start_platform = self.world.seed(&mut ctx, start);
        self.score.mark_visited(self.start_platform);
        self.roll_spawned_enemies();
        self.emit(GameEvent::ScoreChanged { total: 0 });
        log::info!(
            "Run started: seed {}, mode {}",
            self.seed,
            self.difficulty.mode().as_str()
        );
    }

    /// Tear the run down and start over with a new seed. Mode, color and the
    /// best score carry over.
    pub fn restart(&mut self, seed: u64) {
        self.scheduler.clear();
        self.enemies.clear(&mut self.physics, &mut self.scene);
        self.world.clear(&mut self.physics, &mut self.scene);
        self.player.despawn(&mut self.physics, &mut self.scene);

        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
        self.clock = 0.0;
        self.difficulty.reset();
        self.score.reset();
        self.player = Player::spawn(
            &self.tuning.player,
            self.settings.player_color,
            &mut self.physics,
            &mut self.scene,
        );
        self.camera = Camera::new(self.tuning.player.viewport_height, self.tuning.player.start_y);
        self.begin_run();
    }

    /// Change difficulty mode; applies to rows generated from now on
    pub fn set_difficulty_mode(&mut self, mode: DifficultyMode) {
        self.difficulty.set_mode(mode);
        self.settings.difficulty_mode = mode;
        self.save_settings();
    }

    pub fn set_player_color(&mut self, color: u32) {
        self.settings.player_color = color;
        let shape = Shape::Rect {
            width: self.player.size.x,
            height: self.player.size.y,
        };
        self.scene
            .reshape_visual(self.player.visual, VisualKind::Player { color }, shape);
        self.save_settings();
    }

    fn save_settings(&mut self) {
        if let Err(err) = self.settings.save(self.storage.as_mut()) {
            log::warn!("Settings not saved: {}", err);
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Take every event produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Height climbed above the start point
    pub fn height(&self) -> f32 {
        self.player.height(self.tuning.player.origin_y)
    }

    pub fn start_platform(&self) -> PlatformId {
        self.start_platform
    }

    pub fn level_info(&self) -> LevelInfo {
        self.difficulty.level_info()
    }

    pub fn summary(&self) -> RunSummary {
        self.score.summary(self.difficulty.max_reached_level())
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Roll the enemy chance for every platform spawned since the last roll
    pub(crate) fn roll_spawned_enemies(&mut self) {
        for id in self.world.drain_spawned() {
            self.roll_enemy(id, 1.0);
        }
    }

    /// Schedule a deferred enemy spawn with probability `enemy_chance * factor`.
    /// Safe and breakable platforms, and platforms that already have (or are
    /// about to get) an enemy, are skipped.
    fn roll_enemy(&mut self, id: PlatformId, factor: f32) {
        let Some(platform) = self.world.get(id) else {
            return;
        };
        if platform.safe || !platform.poolable() {
            return;
        }
        let owner = TaskOwner::Platform(id);
        if self.enemies.on_platform(id).is_some() || self.scheduler.has_pending(owner) {
            return;
        }
        let height = self.tuning.player.origin_y - platform.pos.y;
        let params = self.difficulty.parameters_for(height);
        if chance(&mut self.rng, params.enemy_chance * factor) {
            let due = self.clock + f64::from(self.tuning.enemy.spawn_delay);
            self.scheduler.schedule(owner, due, Task::SpawnEnemy);
        }
    }

    /// Cancel everything that referenced platforms which just left the world
    pub(crate) fn retire_platforms(&mut self, removed: &[RemovedPlatform]) {
        for r in removed {
            let id = r.snapshot.id;
            self.scheduler.cancel_owner(TaskOwner::Platform(id));
            self.enemies
                .on_platform_removed(id, &mut self.physics, &mut self.scene);
        }
    }

    /// Apply one classified contact
    pub(crate) fn apply_contact(&mut self, contact: ContactEvent) {
        match contact {
            ContactEvent::Landing { platform } => self.land_on(platform),
            ContactEvent::EnemyTouch { body, .. } => {
                if let Some(hit) = self
                    .enemies
                    .handle_player_contact(body, &mut self.physics, &mut self.scene)
                {
                    self.emit(GameEvent::EnemyHit { enemy: hit.enemy });
                    self.die();
                }
            }
        }
    }

    fn land_on(&mut self, id: PlatformId) {
        let Some(snapshot) = self.world.get(id).map(Platform::snapshot) else {
            log::warn!("Landing on unknown platform {:?} dropped", id);
            return;
        };
        self.player.enable_jump();

        let award = self.score.award_platform_visit(&snapshot);
        self.emit(GameEvent::PlatformVisited {
            platform: snapshot,
            is_new: award.is_new,
            points: award.points,
        });
        if award.is_new {
            self.scheduler.cancel_owner(TaskOwner::Combo);
            let due = self.clock + f64::from(self.tuning.score.combo_timeout);
            self.scheduler.schedule(TaskOwner::Combo, due, Task::ComboReset);
            self.emit(GameEvent::ScoreChanged {
                total: self.score.current_score(),
            });
        }

        if self.world.trigger_break(id) {
            let due = self.clock + f64::from(self.tuning.world.break_duration);
            self.scheduler
                .schedule(TaskOwner::Platform(id), due, Task::BreakComplete);
        } else {
            self.roll_enemy(id, self.tuning.enemy.landing_spawn_factor);
        }
    }

    /// Run one due task
    pub(crate) fn run_task(&mut self, owner: TaskOwner, task: Task) {
        match (owner, task) {
            (TaskOwner::Platform(id), Task::BreakComplete) => {
                if let Some(removed) = self
                    .world
                    .finish_break(&mut self.physics, &mut self.scene, id)
                {
                    self.retire_platforms(&[removed]);
                    self.emit(GameEvent::PlatformBroken { platform: id });
                }
            }
            (TaskOwner::Platform(id), Task::SpawnEnemy) => {
                let Some(platform) = self.world.get(id) else {
                    return;
                };
                if let Some(enemy) =
                    self.enemies
                        .populate(platform, &mut self.rng, &mut self.physics, &mut self.scene)
                {
                    self.emit(GameEvent::EnemySpawned {
                        enemy,
                        platform: id,
                    });
                }
            }
            (TaskOwner::Combo, Task::ComboReset) => self.score.reset_combo(),
            (owner, task) => log::warn!("Dropping {:?} scheduled for {:?}", task, owner),
        }
    }

    /// Report achievements and persist a new best score
    pub(crate) fn flush_ledger(&mut self) {
        for achievement in self.score.drain_unlocked() {
            self.emit(GameEvent::AchievementUnlocked(achievement));
        }
        if self.score.take_best_improved() {
            let best = *self.score.best();
            if let Err(err) = best.save(self.storage.as_mut()) {
                log::warn!("Best score not saved: {}", err);
            }
            self.emit(GameEvent::NewBestScore { score: best.score });
        }
    }

    /// End the run. Safe to call more than once.
    pub(crate) fn die(&mut self) {
        if !self.player.die(&mut self.physics) {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.scheduler.clear();
        self.flush_ledger();
        let summary = self.summary();
        log::info!(
            "Run over: score {}, height {:.0}, level {}",
            summary.final_score,
            summary.max_height,
            summary.max_level
        );
        self.emit(GameEvent::PlayerDied(summary));
    }
}
