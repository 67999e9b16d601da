//! Fixed timestep simulation tick
//!
//! Core game loop that advances a session deterministically. Stage order:
//! input, world generation, platform and enemy movement, physics and contact
//! classification, deferred tasks, camera and progression, then the death
//! check.

use serde::{Deserialize, Serialize};

use super::collision::classify_contacts;
use super::events::GameEvent;
use super::physics::PhysicsWorld;
use super::scene::SceneLayer;
use super::state::{GamePhase, Session};
use super::world::WorldContext;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    /// Jump (only honored after a landing)
    pub jump: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the session by one fixed timestep
pub fn tick<P: PhysicsWorld, S: SceneLayer>(session: &mut Session<P, S>, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match session.phase {
            GamePhase::Playing => session.phase = GamePhase::Paused,
            GamePhase::Paused => session.phase = GamePhase::Playing,
            GamePhase::GameOver => {}
        }
    }
    if session.phase != GamePhase::Playing {
        return;
    }

    session.time_ticks += 1;
    session.clock += f64::from(dt);

    if session
        .player
        .apply_input(input, &session.tuning.player, &mut session.physics, dt)
    {
        session.score.record_jump();
    }

    // Keep the lookahead filled and drop what fell behind
    let mut ctx = WorldContext {
        curve: &session.difficulty,
        rng: &mut session.rng,
        physics: &mut session.physics,
        scene: &mut session.scene,
    };
    session.world.advance(&mut ctx, session.player.pos.y);
    session.roll_spawned_enemies();
    session
        .world
        .update_moving(&mut session.physics, &mut session.scene, dt);
    let evicted = session
        .world
        .evict(&mut session.physics, &mut session.scene, session.camera.bottom());
    session.retire_platforms(&evicted);

    session
        .enemies
        .update(&session.world, &mut session.physics, &mut session.scene, dt);

    // Classify the whole batch before acting on any of it
    let mut pairs = session.physics.step(dt);
    let contacts = classify_contacts(
        &mut pairs,
        session.player.body,
        &session.landing_rule,
        &session.world,
        &session.enemies,
    );
    session.physics.resolve(&pairs);
    session.player.sync(&session.physics, &mut session.scene);
    for contact in contacts {
        if session.phase != GamePhase::Playing {
            break;
        }
        session.apply_contact(contact);
    }
    if session.phase == GamePhase::GameOver {
        return;
    }

    for (owner, task) in session.scheduler.drain_due(session.clock) {
        session.run_task(owner, task);
    }

    session.camera.follow(
        session.player.pos.y,
        session.tuning.player.camera_lerp,
        dt,
    );

    let height = session.height();
    if let Some(level) = session.difficulty.observe_height(height) {
        log::info!("Level {}", level);
        session.emit(GameEvent::LevelChanged { level });
    }
    let bonus = session.score.award_height_bonus(height);
    if bonus > 0 {
        session.emit(GameEvent::HeightBonus { points: bonus });
        session.emit(GameEvent::ScoreChanged {
            total: session.score.current_score(),
        });
    }
    if let Some(milestone) = session.difficulty.check_milestone(height) {
        let points = session.score.award_bonus(milestone.bonus);
        session.emit(GameEvent::MilestoneReached { milestone, points });
        session.emit(GameEvent::ScoreChanged {
            total: session.score.current_score(),
        });
    }
    session.flush_ledger();

    if session
        .player
        .fell_out(session.camera.bottom(), session.tuning.player.death_margin)
    {
        session.die();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::best_score::BestScore;
    use crate::consts::{GRAVITY, SIM_DT};
    use crate::persistence::{MemoryStorage, Storage};
    use crate::settings::Settings;
    use crate::sim::collision::ContactEvent;
    use crate::sim::difficulty::DifficultyMode;
    use crate::sim::physics::SimplePhysics;
    use crate::sim::platform::{PlatformId, PlatformKind};
    use crate::sim::scene::HeadlessScene;
    use crate::sim::schedule::TaskOwner;
    use crate::sim::score::Achievement;
    use crate::tuning::{Progression, Tuning};

    type TestSession = Session<SimplePhysics, HeadlessScene>;

    fn session_with(tuning: Tuning, seed: u64) -> TestSession {
        Session::new(
            tuning,
            seed,
            SimplePhysics::new(),
            HeadlessScene::new(),
            Box::new(MemoryStorage::new()),
        )
    }

    fn session(seed: u64) -> TestSession {
        session_with(Tuning::default(), seed)
    }

    fn run(session: &mut TestSession, input: &TickInput, ticks: usize) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            tick(session, input, SIM_DT);
            events.extend(session.drain_events());
        }
        events
    }

    /// Every generated row is static and always rolls an enemy
    fn enemy_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.difficulty.breakable_chance = Progression::new(0.0, 0.0, 0.0);
        tuning.difficulty.moving_chance = Progression::new(0.0, 0.0, 0.0);
        tuning.difficulty.enemy_chance = Progression::new(1.0, 0.0, 1.0);
        tuning.difficulty.probability_ceiling = 1.0;
        tuning
    }

    /// Every generated row is breakable
    fn breakable_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.difficulty.breakable_chance = Progression::new(1.0, 0.0, 1.0);
        tuning.difficulty.probability_ceiling = 1.0;
        tuning
    }

    /// Static rows only, no enemies
    fn still_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        let none = Progression::new(0.0, 0.0, 0.0);
        tuning.difficulty.breakable_chance = none;
        tuning.difficulty.moving_chance = none;
        tuning.difficulty.enemy_chance = none;
        tuning
    }

    fn place_player(s: &mut TestSession, pos: Vec2, vel: Vec2) {
        s.physics.set_position(s.player.body, pos).unwrap();
        s.physics.set_velocity(s.player.body, vel).unwrap();
        s.player.pos = pos;
        s.player.vel = vel;
    }

    fn visited(events: &[GameEvent], id: PlatformId) -> bool {
        events.iter().any(|e| {
            matches!(e, GameEvent::PlatformVisited { platform, .. } if platform.id == id)
        })
    }

    #[test]
    fn test_new_session_starts_playing() {
        let mut s = session(12345);
        assert_eq!(s.phase, GamePhase::Playing);
        assert_eq!(s.score.current_score(), 0);
        assert!(s.world.get(s.start_platform()).is_some_and(|p| p.safe));
        assert_eq!(s.drain_events(), vec![GameEvent::ScoreChanged { total: 0 }]);
    }

    #[test]
    fn test_player_lands_on_start_platform() {
        let mut s = session(12345);
        s.drain_events();
        let events = run(&mut s, &TickInput::default(), 60);

        assert!(s.player.can_jump);
        assert!((s.player.pos.y - 856.0).abs() < 1.0);
        let start = s.start_platform();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::PlatformVisited { platform, is_new: false, points: 0 } if platform.id == start
        )));
        // The start platform pays nothing
        assert_eq!(s.score.current_score(), 0);
    }

    #[test]
    fn test_first_jump_achievement() {
        let mut s = session(12345);
        run(&mut s, &TickInput::default(), 60);
        let jump = TickInput {
            jump: true,
            ..TickInput::default()
        };
        let events = run(&mut s, &jump, 1);
        assert!(events.contains(&GameEvent::AchievementUnlocked(Achievement::FirstJump)));
        assert_eq!(s.score.stats().total_jumps, 1);
        assert!(s.player.vel.y < 0.0);
    }

    #[test]
    fn test_determinism() {
        // Two sessions with same seed and inputs should stay identical
        let mut s1 = session(99999);
        let mut s2 = session(99999);

        let inputs = [
            TickInput::default(),
            TickInput {
                right: true,
                ..Default::default()
            },
            TickInput {
                jump: true,
                ..Default::default()
            },
            TickInput {
                left: true,
                jump: true,
                ..Default::default()
            },
        ];

        for input in inputs.iter().cycle().take(240) {
            tick(&mut s1, input, SIM_DT);
            tick(&mut s2, input, SIM_DT);
        }

        assert_eq!(s1.time_ticks, s2.time_ticks);
        assert_eq!(s1.player.pos, s2.player.pos);
        assert_eq!(s1.score.current_score(), s2.score.current_score());
        let positions = |s: &TestSession| s.world.platforms().iter().map(|p| p.pos).collect::<Vec<_>>();
        assert_eq!(positions(&s1), positions(&s2));
        assert_eq!(s1.drain_events(), s2.drain_events());
    }

    #[test]
    fn test_tick_pause() {
        let mut s = session(12345);
        run(&mut s, &TickInput::default(), 5);

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut s, &pause, SIM_DT);
        assert_eq!(s.phase, GamePhase::Paused);
        let ticks = s.time_ticks;
        let pos = s.player.pos;

        // Paused ticks do nothing
        run(&mut s, &TickInput::default(), 10);
        assert_eq!(s.time_ticks, ticks);
        assert_eq!(s.player.pos, pos);

        // Unpause
        tick(&mut s, &pause, SIM_DT);
        assert_eq!(s.phase, GamePhase::Playing);
        assert_eq!(s.time_ticks, ticks + 1);
    }

    #[test]
    fn test_falling_out_ends_run_and_saves_best() {
        let mut s = session(12345);
        run(&mut s, &TickInput::default(), 30);
        s.score.award_bonus(120);

        let right = TickInput {
            right: true,
            ..Default::default()
        };
        let mut events = Vec::new();
        for _ in 0..600 {
            tick(&mut s, &right, SIM_DT);
            events.extend(s.drain_events());
            if s.phase == GamePhase::GameOver {
                break;
            }
        }

        assert_eq!(s.phase, GamePhase::GameOver);
        assert!(s.player.dead);
        let final_score = events.iter().find_map(|e| match e {
            GameEvent::PlayerDied(summary) => Some(summary.final_score),
            _ => None,
        });
        assert_eq!(final_score, Some(120));
        assert!(events.contains(&GameEvent::NewBestScore { score: 120 }));
        assert_eq!(BestScore::load(s.storage()).score, 120);
        assert_eq!(s.pending_tasks(), 0);

        // Game over is terminal until restart
        let ticks = s.time_ticks;
        run(&mut s, &right, 10);
        assert_eq!(s.time_ticks, ticks);
    }

    #[test]
    fn test_full_jump_clears_every_generated_gap() {
        let mut s = session(12345);
        run(&mut s, &TickInput::default(), 60);
        assert!(s.player.can_jump);
        let rest_y = s.player.pos.y;

        let jump = TickInput {
            jump: true,
            ..TickInput::default()
        };
        tick(&mut s, &jump, SIM_DT);
        let mut apex = s.player.pos.y;
        for _ in 0..120 {
            tick(&mut s, &TickInput::default(), SIM_DT);
            apex = apex.min(s.player.pos.y);
        }
        let rise = rest_y - apex;
        let expected = s.tuning.player.jump_rise(GRAVITY, SIM_DT);
        assert!((rise - expected).abs() < 0.5, "rise {rise}, expected {expected}");

        let clearance = s.tuning.player.jump_clearance;
        for mode in DifficultyMode::ALL {
            s.difficulty.set_mode(mode);
            for level in [0, 4, 7, 1_000, u32::MAX] {
                let p = s.difficulty.parameters_for_level(level);
                assert!(
                    p.max_gap + clearance <= rise + 0.5,
                    "{mode:?} level {level}: gap {} vs rise {rise}",
                    p.max_gap
                );
            }
        }
    }

    #[test]
    fn test_breakable_landing_breaks_after_duration() {
        let mut s = session_with(breakable_tuning(), 7);

        let id = s
            .world
            .platforms()
            .iter()
            .find(|p| matches!(p.kind, PlatformKind::Breakable { .. }))
            .map(|p| p.id)
            .unwrap();
        s.apply_contact(ContactEvent::Landing { platform: id });
        assert!(s.world.get(id).unwrap().is_breaking());
        assert!(s.scheduler.has_pending(TaskOwner::Platform(id)));

        // Still solid a few ticks in
        run(&mut s, &TickInput::default(), 10);
        assert!(s.world.get(id).is_some());

        let events = run(&mut s, &TickInput::default(), 30);
        assert!(events.contains(&GameEvent::PlatformBroken { platform: id }));
        assert!(s.world.get(id).is_none());
    }

    #[test]
    fn test_standing_on_breaking_platform_holds_until_break() {
        let mut s = session_with(breakable_tuning(), 7);
        let platform = s.world.platforms().iter().find(|p| !p.safe).cloned().unwrap();
        let half = s.player.size.y / 2.0;
        let resting_y = platform.top() - half;
        place_player(&mut s, Vec2::new(platform.pos.x, resting_y - 2.0), Vec2::ZERO);

        let events = run(&mut s, &TickInput::default(), 5);
        assert!(visited(&events, platform.id));
        assert!(s.world.get(platform.id).unwrap().is_breaking());

        // The contact made before the break keeps holding the player up
        let events = run(&mut s, &TickInput::default(), 15);
        assert!(!visited(&events, platform.id));
        assert!((s.player.pos.y - resting_y).abs() < 1.0);

        let events = run(&mut s, &TickInput::default(), 30);
        assert!(events.contains(&GameEvent::PlatformBroken { platform: platform.id }));
        assert!(s.player.pos.y > resting_y + 5.0);
    }

    #[test]
    fn test_breaking_platform_takes_no_new_landings() {
        let mut s = session_with(breakable_tuning(), 7);
        let platform = s.world.platforms().iter().find(|p| !p.safe).cloned().unwrap();
        assert!(s.world.trigger_break(platform.id));

        let half = s.player.size.y / 2.0;
        place_player(
            &mut s,
            Vec2::new(platform.pos.x, platform.top() - half - 5.0),
            Vec2::new(0.0, 300.0),
        );
        let events = run(&mut s, &TickInput::default(), 15);
        assert!(!visited(&events, platform.id));
        assert!(!s.score.is_visited(platform.id));
        // Head is below the platform's underside
        assert!(s.player.pos.y - half > platform.pos.y + platform.height / 2.0);
    }

    #[test]
    fn test_combo_resets_after_idle_timeout() {
        let mut s = session_with(still_tuning(), 21);
        let ids: Vec<PlatformId> = s
            .world
            .platforms()
            .iter()
            .filter(|p| !p.safe)
            .map(|p| p.id)
            .take(2)
            .collect();
        assert_eq!(ids.len(), 2);

        s.apply_contact(ContactEvent::Landing { platform: ids[0] });
        assert_eq!(s.score.combo(), 1);
        assert!(s.scheduler.has_pending(TaskOwner::Combo));

        // A new visit 1.5 s in pushes the reset back
        run(&mut s, &TickInput::default(), 90);
        assert_eq!(s.score.combo(), 1);
        s.apply_contact(ContactEvent::Landing { platform: ids[1] });
        assert_eq!(s.score.combo(), 2);

        // Past the first deadline, short of the second
        run(&mut s, &TickInput::default(), 90);
        assert_eq!(s.score.combo(), 2);

        run(&mut s, &TickInput::default(), 40);
        assert_eq!(s.score.combo(), 0);
        assert!(!s.scheduler.has_pending(TaskOwner::Combo));
    }

    #[test]
    fn test_revisit_keeps_combo_deadline() {
        let mut s = session_with(still_tuning(), 21);
        let id = s.world.platforms().iter().find(|p| !p.safe).map(|p| p.id).unwrap();

        s.apply_contact(ContactEvent::Landing { platform: id });
        run(&mut s, &TickInput::default(), 90);
        // Landing on an already visited platform does not extend the streak
        s.apply_contact(ContactEvent::Landing { platform: id });
        assert_eq!(s.score.combo(), 1);
        run(&mut s, &TickInput::default(), 40);
        assert_eq!(s.score.combo(), 0);
    }

    #[test]
    fn test_deferred_enemy_spawns() {
        let mut s = session_with(enemy_tuning(), 11);
        let candidates = s.world.platforms().iter().filter(|p| !p.safe).count();
        assert!(candidates > 0);
        assert_eq!(s.pending_tasks(), candidates);
        assert!(s.enemies.enemies().is_empty());

        let events = run(&mut s, &TickInput::default(), 10);
        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemySpawned { .. }))
            .count();
        assert_eq!(spawned, candidates);
        assert_eq!(s.enemies.enemies().len(), candidates);
        for enemy in s.enemies.enemies() {
            assert!(!s.world.get(enemy.platform).unwrap().safe);
        }
    }

    #[test]
    fn test_evicted_platform_cancels_pending_spawn() {
        let mut s = session_with(enemy_tuning(), 11);
        assert!(s.pending_tasks() > 0);

        let removed = s
            .world
            .evict(&mut s.physics, &mut s.scene, f32::NEG_INFINITY);
        assert!(!removed.is_empty());
        s.retire_platforms(&removed);
        assert_eq!(s.pending_tasks(), 0);

        let events = run(&mut s, &TickInput::default(), 10);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::EnemySpawned { .. })));
    }

    #[test]
    fn test_height_bonus_and_milestone() {
        let mut s = session(12345);
        s.drain_events();
        // Far off to the side so no platform is in the way
        let spot = Vec2::new(-2000.0, -205.0);
        s.physics.set_position(s.player.body, spot).unwrap();
        s.physics.set_velocity(s.player.body, Vec2::ZERO).unwrap();
        s.player.pos = spot;

        let events = run(&mut s, &TickInput::default(), 1);
        let bonuses: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::HeightBonus { points } => Some(*points),
                _ => None,
            })
            .collect();
        assert_eq!(bonuses, vec![50]);
        assert!(events.contains(&GameEvent::LevelChanged { level: 1 }));
        let milestone = events.iter().find_map(|e| match e {
            GameEvent::MilestoneReached { milestone, points } => Some((milestone.height, *points)),
            _ => None,
        });
        assert_eq!(milestone, Some((1000.0, 10_000)));
        assert_eq!(s.score.current_score(), 10_050);
    }

    #[test]
    fn test_restart_matches_fresh_session() {
        let mut s = session(5);
        run(&mut s, &TickInput::default(), 30);
        s.score.award_bonus(40);
        run(&mut s, &TickInput::default(), 1);
        s.restart(9);

        let fresh = session(9);
        let layout = |s: &TestSession| {
            s.world
                .platforms()
                .iter()
                .map(|p| (p.pos, p.width, p.category()))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(&s), layout(&fresh));
        assert_eq!(s.score.current_score(), 0);
        assert_eq!(s.score.best_score(), 40);
        assert_eq!(s.time_ticks, 0);
        assert_eq!(s.phase, GamePhase::Playing);
        assert!(!s.player.dead);
    }

    #[test]
    fn test_settings_persist() {
        let mut s = session(1);
        s.set_difficulty_mode(DifficultyMode::Hard);
        s.set_player_color(0x00ff00);
        assert_eq!(s.difficulty.mode(), DifficultyMode::Hard);

        let saved = Settings::load(s.storage());
        assert_eq!(saved.difficulty_mode, DifficultyMode::Hard);
        assert_eq!(saved.player_color, 0x00ff00);
        assert!(s.storage().get("skyward_settings").is_some());
    }
}
