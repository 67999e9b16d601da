//! Skyward headless runner
//!
//! Drives the simulation with a scripted climber so generation, difficulty
//! and scoring can be watched from the terminal:
//!
//! ```text
//! skyward [seed] [runs] [tuning.json]
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use skyward::Tuning;
    use skyward::consts::{MAX_SUBSTEPS, SIM_DT};
    use skyward::persistence::MemoryStorage;
    use skyward::sim::{
        GameEvent, GamePhase, HeadlessScene, PlayerHistory, RunSummary, Session, SimplePhysics,
        TickInput, tick,
    };

    type HeadlessSession = Session<SimplePhysics, HeadlessScene>;

    /// Give up on a run after this much simulated time
    const MAX_RUN_SECONDS: f32 = 180.0;
    /// Uneven frame times so the accumulator actually has work to do
    const FRAME_TIMES: [f32; 3] = [1.0 / 60.0, 1.0 / 45.0, 1.0 / 75.0];

    struct Args {
        seed: u64,
        runs: u32,
        tuning: Tuning,
    }

    fn parse_args() -> Result<Args, String> {
        let mut args = std::env::args().skip(1);
        let seed = match args.next() {
            Some(s) => s.parse().map_err(|e| format!("bad seed {s:?}: {e}"))?,
            None => 12345,
        };
        let runs = match args.next() {
            Some(s) => s.parse().map_err(|e| format!("bad run count {s:?}: {e}"))?,
            None => 3,
        };
        let tuning = match args.next() {
            Some(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
                Tuning::from_json(&json).map_err(|e| format!("{path}: {e}"))?
            }
            None => Tuning::default(),
        };
        Ok(Args { seed, runs, tuning })
    }

    /// Steer under the lowest platform above the player's feet and jump
    /// whenever grounded
    fn bot_input(session: &HeadlessSession) -> TickInput {
        let player = &session.player;
        let feet = player.pos.y + player.size.y / 2.0;
        let reach = session.tuning.player.reachable_gap();
        let target = session
            .world
            .platforms()
            .iter()
            .filter(|p| p.top() < feet - 1.0 && feet - p.top() <= reach)
            .max_by(|a, b| a.top().total_cmp(&b.top()));

        let dx = target.map_or(0.0, |p| p.pos.x - player.pos.x);
        TickInput {
            left: dx < -10.0,
            right: dx > 10.0,
            jump: player.can_jump,
            pause: false,
        }
    }

    fn report(event: &GameEvent) {
        match event {
            GameEvent::MilestoneReached { milestone, points } => {
                log::info!("Milestone {:.0} (+{})", milestone.height, points)
            }
            GameEvent::AchievementUnlocked(a) => log::info!("Achievement: {}", a.title()),
            GameEvent::NewBestScore { score } => log::info!("New best score {}", score),
            other => log::debug!("{:?}", other),
        }
    }

    /// Play one run to the end (or the time limit)
    fn play(session: &mut HeadlessSession) -> Option<RunSummary> {
        let mut accumulator = 0.0;
        let mut elapsed = 0.0;
        let mut frame = 0;

        while elapsed < MAX_RUN_SECONDS {
            let frame_dt = FRAME_TIMES[frame % FRAME_TIMES.len()];
            frame += 1;
            elapsed += frame_dt;
            accumulator += frame_dt;

            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = bot_input(session);
                tick(session, &input, SIM_DT);
                accumulator -= SIM_DT;
                substeps += 1;
            }

            for event in session.drain_events() {
                report(&event);
                if let GameEvent::PlayerDied(summary) = event {
                    return Some(summary);
                }
            }

            if frame % 600 == 0 {
                let info = session.level_info();
                log::info!(
                    "t={:.0}s height={:.0} level={} ({}) score={} platforms={} pooled={}",
                    elapsed,
                    session.height(),
                    info.level,
                    info.name,
                    session.score.current_score(),
                    session.world.platforms().len(),
                    session.world.pooled_len(),
                );
            }
            if session.phase == GamePhase::GameOver {
                break;
            }
        }
        None
    }

    pub fn run() {
        let args = match parse_args() {
            Ok(args) => args,
            Err(err) => {
                log::error!("{}", err);
                eprintln!("usage: skyward [seed] [runs] [tuning.json]");
                return;
            }
        };

        let mut session = Session::new(
            args.tuning,
            args.seed,
            SimplePhysics::new(),
            HeadlessScene::new(),
            Box::new(MemoryStorage::new()),
        );
        let mut history = PlayerHistory::default();

        for run in 0..args.runs {
            if run > 0 {
                session.restart(args.seed.wrapping_add(u64::from(run)));
            }
            log::info!("Run {} (seed {})", run + 1, session.seed);

            history.attempts += 1;
            let summary = match play(&mut session) {
                Some(summary) => {
                    history.deaths += 1;
                    summary
                }
                None => {
                    log::info!("Time limit reached");
                    session.summary()
                }
            };
            history.total_height += summary.max_height;

            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(err) => log::warn!("Summary not serialized: {}", err),
            }
            let stats = session.world.pool_stats();
            log::info!(
                "Pool: {} created, {} reused, {} pooled, {} destroyed",
                stats.created,
                stats.reused,
                stats.pooled,
                stats.destroyed
            );
        }

        if let Some(suggestion) = session.difficulty.suggest_adjustment(&history) {
            log::info!(
                "{}: consider {} instead of {}",
                suggestion.reason,
                suggestion.suggested.as_str(),
                suggestion.current.as_str()
            );
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Skyward (headless) starting...");
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser host drives `Session` directly; nothing to do here
}
