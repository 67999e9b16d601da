//! Procedural world generation
//!
//! Platforms are laid out row by row upward from the start platform. Each row
//! asks the difficulty curve for parameters at the cursor height, then places
//! the new platform within jump reach of the row below. The cursor only ever
//! moves up (toward smaller y).

use glam::Vec2;
use rand::Rng;

use super::difficulty::{DifficultyCurve, DifficultyParams};
use super::physics::{BodyHandle, PhysicsWorld};
use super::platform::{Axis, Motion, Platform, PlatformId, PlatformKind};
use super::pool::{PlatformPool, PlatformDesc, PoolStats, RemovedPlatform};
use super::scene::SceneLayer;
use crate::tuning::WorldConfig;
use crate::{chance, coin_direction, uniform};

/// Borrowed collaborators for one generation call
pub struct WorldContext<'a, R: ?Sized, P: ?Sized, S: ?Sized> {
    pub curve: &'a DifficultyCurve,
    pub rng: &'a mut R,
    pub physics: &'a mut P,
    pub scene: &'a mut S,
}

#[derive(Debug, Clone)]
pub struct WorldGenerator {
    config: WorldConfig,
    /// y that counts as height zero
    origin_y: f32,
    pool: PlatformPool,
    /// y of the most recently generated row
    cursor: f32,
    /// Platforms spawned since the last `drain_spawned`
    spawned: Vec<PlatformId>,
}

impl WorldGenerator {
    pub fn new(config: WorldConfig, origin_y: f32) -> Self {
        let pool = PlatformPool::new(&config);
        Self {
            config,
            origin_y,
            pool,
            cursor: f32::INFINITY,
            spawned: Vec::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// y of the highest generated row (`INFINITY` before seeding)
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    fn height_at(&self, y: f32) -> f32 {
        self.origin_y - y
    }

    /// Lay out the start platform, the tutorial rows and the initial lookahead.
    /// Returns the start platform.
    pub fn seed<R, P, S>(&mut self, ctx: &mut WorldContext<'_, R, P, S>, player_start: Vec2) -> PlatformId
    where
        R: Rng + ?Sized,
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let start_y = player_start.y + self.config.start_platform_offset_y;
        let start = self.spawn(
            ctx,
            PlatformDesc {
                pos: Vec2::new(player_start.x, start_y),
                width: self.config.safe_platform_width,
                kind: PlatformKind::Static,
                level: 0,
                safe: true,
            },
        );
        self.cursor = start_y;

        for _ in 0..self.config.tutorial_count {
            let gap = uniform(ctx.rng, self.config.tutorial_min_gap, self.config.tutorial_max_gap);
            let y = self.cursor - gap;
            let x = self.place_x(ctx.rng, self.cursor);
            self.spawn(
                ctx,
                PlatformDesc {
                    pos: Vec2::new(x, y),
                    width: self.config.safe_platform_width,
                    kind: PlatformKind::Static,
                    level: 0,
                    safe: true,
                },
            );
            self.cursor = y;
        }

        let horizon = player_start.y - self.config.generation_distance;
        while self.cursor > horizon {
            self.generate_row(ctx);
        }

        log::info!(
            "World seeded: {} platforms, cursor at y={:.0}",
            self.pool.active_len(),
            self.cursor
        );
        start
    }

    /// Generate one batch if the cursor has fallen inside the lookahead
    /// distance of the player. Returns the number of platforms spawned.
    pub fn advance<R, P, S>(&mut self, ctx: &mut WorldContext<'_, R, P, S>, player_y: f32) -> usize
    where
        R: Rng + ?Sized,
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        if self.cursor <= player_y - self.config.generation_distance {
            return 0;
        }
        for _ in 0..self.config.batch_size {
            self.generate_row(ctx);
        }
        log::debug!("Generated batch, cursor at y={:.0}", self.cursor);
        self.config.batch_size as usize
    }

    fn generate_row<R, P, S>(&mut self, ctx: &mut WorldContext<'_, R, P, S>)
    where
        R: Rng + ?Sized,
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let spacing = ctx.curve.parameters_for(self.height_at(self.cursor));
        let gap = uniform(ctx.rng, spacing.min_gap, spacing.max_gap);
        let y = self.cursor - gap;
        let x = self.place_x(ctx.rng, self.cursor);

        let params = ctx.curve.parameters_for(self.height_at(y));
        let width = uniform(ctx.rng, params.min_width, params.max_width);
        let kind = self.roll_kind(ctx.rng, &params, y);

        self.spawn(
            ctx,
            PlatformDesc {
                pos: Vec2::new(x, y),
                width,
                kind,
                level: params.level,
                safe: false,
            },
        );
        self.cursor = self.cursor.min(y);
    }

    fn spawn<R, P, S>(&mut self, ctx: &mut WorldContext<'_, R, P, S>, desc: PlatformDesc) -> PlatformId
    where
        R: Rng + ?Sized,
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let id = self.pool.spawn(ctx.physics, ctx.scene, desc);
        self.spawned.push(id);
        id
    }

    /// Pick an x within jump reach of the row at `prev_row_y`.
    ///
    /// The anchor is the platform on that row nearest a uniform candidate. With
    /// no platform on the row, strict mode anchors on the platform nearest in
    /// height; only an empty world falls back to the raw candidate.
    fn place_x<R: Rng + ?Sized>(&self, rng: &mut R, prev_row_y: f32) -> f32 {
        let (min_x, max_x) = (self.config.min_x(), self.config.max_x());
        let candidate = uniform(rng, min_x, max_x);

        let active = self.pool.active();
        let on_row = active
            .iter()
            .filter(|p| (p.pos.y - prev_row_y).abs() < self.config.row_tolerance);
        let anchor = nearest(on_row, |p| (p.pos.x - candidate).abs()).or_else(|| {
            if self.config.strict_reachability {
                nearest(active.iter(), |p| (p.pos.y - prev_row_y).abs())
            } else {
                None
            }
        });

        match anchor {
            Some(anchor) => {
                let reach = self.config.max_jump_distance;
                uniform(
                    rng,
                    (anchor.pos.x - reach).max(min_x),
                    (anchor.pos.x + reach).min(max_x),
                )
            }
            None => candidate,
        }
    }

    /// Breakable wins over moving when both rolls succeed
    fn roll_kind<R: Rng + ?Sized>(&self, rng: &mut R, params: &DifficultyParams, y: f32) -> PlatformKind {
        let breakable = chance(rng, params.breakable_chance);
        let moving = chance(rng, params.moving_chance);
        if breakable {
            PlatformKind::Breakable { breaking: false }
        } else if moving {
            PlatformKind::Moving(self.roll_motion(rng, params, y))
        } else {
            PlatformKind::Static
        }
    }

    fn roll_motion<R: Rng + ?Sized>(&self, rng: &mut R, params: &DifficultyParams, y: f32) -> Motion {
        let speed = uniform(rng, params.min_speed, params.max_speed);
        let direction = coin_direction(rng);
        if chance(rng, self.config.vertical_chance.at(params.level)) {
            Motion {
                axis: Axis::Vertical,
                min: y - self.config.vertical_travel,
                max: y + self.config.vertical_travel,
                speed,
                direction,
            }
        } else {
            Motion {
                axis: Axis::Horizontal,
                min: self.config.min_x(),
                max: self.config.max_x(),
                speed,
                direction,
            }
        }
    }

    /// Step every moving platform and push the new positions to physics and
    /// the scene. A platform whose body has gone missing is logged and skipped.
    pub fn update_moving<P, S>(&mut self, physics: &mut P, scene: &mut S, dt: f32)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        for platform in self.pool.active_mut() {
            let PlatformKind::Moving(motion) = &mut platform.kind else {
                continue;
            };
            motion.advance(&mut platform.pos, dt);
            scene.set_visual_position(platform.visual, platform.pos);
            if let Err(err) = physics.set_position(platform.body, platform.pos) {
                log::warn!("Skipping sync of moving platform {:?}: {}", platform.id, err);
            }
        }
    }

    /// Retire every platform more than the cleanup buffer below the camera
    pub fn evict<P, S>(&mut self, physics: &mut P, scene: &mut S, camera_bottom: f32) -> Vec<RemovedPlatform>
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let threshold = camera_bottom + self.config.cleanup_buffer;
        let removed = self.pool.retire_where(physics, scene, |p| p.pos.y > threshold);
        if !removed.is_empty() {
            log::debug!(
                "Evicted {} platforms below y={:.0} ({} pooled)",
                removed.len(),
                threshold,
                self.pool.pooled_len()
            );
        }
        removed
    }

    /// Mark a breakable platform as breaking. Returns false if it is not
    /// breakable or already breaking.
    pub fn trigger_break(&mut self, id: PlatformId) -> bool {
        let Some(platform) = self.pool.get_mut(id) else {
            return false;
        };
        match &mut platform.kind {
            PlatformKind::Breakable { breaking } if !*breaking => {
                *breaking = true;
                true
            }
            _ => false,
        }
    }

    /// Remove a platform whose break has run its course
    pub fn finish_break<P, S>(&mut self, physics: &mut P, scene: &mut S, id: PlatformId) -> Option<RemovedPlatform>
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        if !self.pool.get(id).is_some_and(Platform::is_breaking) {
            return None;
        }
        self.pool.retire(physics, scene, id)
    }

    /// Platforms spawned since the last call
    pub fn drain_spawned(&mut self) -> Vec<PlatformId> {
        std::mem::take(&mut self.spawned)
    }

    /// Drop the whole world (used on restart)
    pub fn clear<P, S>(&mut self, physics: &mut P, scene: &mut S)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        self.pool.clear(physics, scene);
        self.cursor = f32::INFINITY;
        self.spawned.clear();
    }

    pub fn get(&self, id: PlatformId) -> Option<&Platform> {
        self.pool.get(id)
    }

    pub fn find_by_body(&self, body: BodyHandle) -> Option<&Platform> {
        self.pool.find_by_body(body)
    }

    pub fn platforms(&self) -> &[Platform] {
        self.pool.active()
    }

    pub fn pooled_len(&self) -> usize {
        self.pool.pooled_len()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

fn nearest<'a, I, F>(platforms: I, distance: F) -> Option<&'a Platform>
where
    I: Iterator<Item = &'a Platform>,
    F: Fn(&Platform) -> f32,
{
    platforms.min_by(|a, b| distance(a).total_cmp(&distance(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::difficulty::DifficultyMode;
    use crate::sim::physics::SimplePhysics;
    use crate::sim::platform::PlatformCategory;
    use crate::sim::pool::Retirement;
    use crate::sim::scene::HeadlessScene;
    use crate::tuning::{DifficultyTuning, Progression};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const START: Vec2 = Vec2::new(150.0, 800.0);

    struct Rig {
        physics: SimplePhysics,
        scene: HeadlessScene,
        rng: Pcg32,
        curve: DifficultyCurve,
        world: WorldGenerator,
    }

    impl Rig {
        fn new(seed: u64, tuning: DifficultyTuning) -> Self {
            Self {
                physics: SimplePhysics::new(),
                scene: HeadlessScene::new(),
                rng: Pcg32::seed_from_u64(seed),
                curve: DifficultyCurve::new(tuning, DifficultyMode::Normal),
                world: WorldGenerator::new(WorldConfig::default(), START.y),
            }
        }

        /// Only static platforms, so positions never change after placement
        fn still(seed: u64) -> Self {
            let none = Progression::new(0.0, 0.0, 0.0);
            Self::new(
                seed,
                DifficultyTuning {
                    breakable_chance: none,
                    moving_chance: none,
                    ..DifficultyTuning::default()
                },
            )
        }

        fn split(&mut self) -> (&mut WorldGenerator, WorldContext<'_, Pcg32, SimplePhysics, HeadlessScene>) {
            (
                &mut self.world,
                WorldContext {
                    curve: &self.curve,
                    rng: &mut self.rng,
                    physics: &mut self.physics,
                    scene: &mut self.scene,
                },
            )
        }

        fn seed(&mut self) -> PlatformId {
            let (world, mut ctx) = self.split();
            world.seed(&mut ctx, START)
        }

        fn advance(&mut self, player_y: f32) -> usize {
            let (world, mut ctx) = self.split();
            world.advance(&mut ctx, player_y)
        }
    }

    /// Platforms in generation order
    fn by_id(world: &WorldGenerator) -> Vec<Platform> {
        let mut platforms = world.platforms().to_vec();
        platforms.sort_by_key(|p| p.id);
        platforms
    }

    #[test]
    fn test_seed_lays_out_start_and_tutorial() {
        let mut rig = Rig::new(7, DifficultyTuning::default());
        let start = rig.seed();
        let platforms = by_id(&rig.world);

        assert_eq!(platforms[0].id, start);
        assert_eq!(platforms[0].pos, Vec2::new(150.0, 900.0));
        assert_eq!(platforms[0].width, 200.0);

        for pair in platforms[..6].windows(2) {
            let gap = pair[0].pos.y - pair[1].pos.y;
            assert!(gap > 119.99 && gap < 150.01, "tutorial gap {gap}");
            assert!(pair[1].safe);
            assert_eq!(pair[1].category(), PlatformCategory::Static);
            assert_eq!(pair[1].width, 200.0);
        }
        assert!(!platforms[6].safe);
        assert!(rig.world.cursor() <= START.y - 1500.0);
        assert_eq!(rig.world.drain_spawned().len(), platforms.len());
        assert!(rig.world.drain_spawned().is_empty());
    }

    #[test]
    fn test_advance_generates_one_reachable_batch() {
        let mut rig = Rig::still(11);
        rig.seed();
        let before = rig.world.platforms().len();
        let cursor = rig.world.cursor();

        // Still a full lookahead ahead of the player: nothing to do
        assert_eq!(rig.advance(cursor + 1500.0), 0);

        assert_eq!(rig.advance(cursor + 1000.0), 5);
        let platforms = by_id(&rig.world);
        assert_eq!(platforms.len(), before + 5);
        for pair in platforms[before - 1..].windows(2) {
            let gap = pair[0].pos.y - pair[1].pos.y;
            let params = rig.curve.parameters_for(START.y - pair[0].pos.y);
            assert!(gap > params.min_gap - 0.01 && gap < params.max_gap + 0.01, "gap {gap}");
            assert!((pair[1].pos.x - pair[0].pos.x).abs() <= 250.0);
        }
    }

    #[test]
    fn test_break_is_idempotent_and_destroys() {
        let mut rig = Rig::new(3, DifficultyTuning::default());
        rig.seed();
        let start = rig.world.platforms()[0].id;
        assert!(!rig.world.trigger_break(start));

        let desc = PlatformDesc {
            pos: Vec2::new(300.0, -5000.0),
            width: 120.0,
            kind: PlatformKind::Breakable { breaking: false },
            level: 0,
            safe: false,
        };
        let (world, mut ctx) = rig.split();
        let id = world.spawn(&mut ctx, desc);

        assert!(rig.world.finish_break(&mut rig.physics, &mut rig.scene, id).is_none());
        assert!(rig.world.trigger_break(id));
        assert!(!rig.world.trigger_break(id));
        let body = rig.world.get(id).unwrap().body;

        let removed = rig
            .world
            .finish_break(&mut rig.physics, &mut rig.scene, id)
            .unwrap();
        assert_eq!(removed.retirement, Retirement::Destroyed);
        assert!(!rig.physics.contains(body));
        assert!(rig.world.get(id).is_none());
        assert!(rig.world.finish_break(&mut rig.physics, &mut rig.scene, id).is_none());
        assert!(!rig.world.trigger_break(id));
    }

    #[test]
    fn test_evict_recycles_below_camera() {
        let mut rig = Rig::still(5);
        rig.seed();
        let total = rig.world.platforms().len();

        // Camera bottom far above the start: everything below y=0 goes
        let removed = rig.world.evict(&mut rig.physics, &mut rig.scene, -500.0);
        assert!(!removed.is_empty());
        assert!(removed.iter().all(|r| r.snapshot.pos.y > 0.0));
        assert!(rig.world.platforms().iter().all(|p| p.pos.y <= 0.0));
        assert_eq!(rig.world.platforms().len() + removed.len(), total);
        assert_eq!(rig.world.pooled_len(), removed.len());
        assert_eq!(rig.physics.body_count(), rig.world.platforms().len());
    }

    #[test]
    fn test_moving_platforms_sync_to_physics() {
        let mut rig = Rig::new(9, DifficultyTuning::default());
        rig.seed();
        let desc = PlatformDesc {
            pos: Vec2::new(400.0, -3000.0),
            width: 120.0,
            kind: PlatformKind::Moving(Motion {
                axis: Axis::Horizontal,
                min: 100.0,
                max: 700.0,
                speed: 120.0,
                direction: 1.0,
            }),
            level: 0,
            safe: false,
        };
        let (world, mut ctx) = rig.split();
        let id = world.spawn(&mut ctx, desc);

        for _ in 0..600 {
            rig.world.update_moving(&mut rig.physics, &mut rig.scene, 1.0 / 60.0);
            let p = rig.world.get(id).unwrap();
            assert!((100.0..=700.0).contains(&p.pos.x));
            assert_eq!(rig.physics.position(p.body), Some(p.pos));
            assert_eq!(rig.scene.get(p.visual).unwrap().position, p.pos);
        }
    }

    #[test]
    fn test_missing_body_is_skipped() {
        let mut rig = Rig::new(4, DifficultyTuning::default());
        rig.seed();
        let desc = PlatformDesc {
            pos: Vec2::new(400.0, -3000.0),
            width: 120.0,
            kind: PlatformKind::Moving(Motion {
                axis: Axis::Vertical,
                min: -3100.0,
                max: -2900.0,
                speed: 60.0,
                direction: -1.0,
            }),
            level: 0,
            safe: false,
        };
        let (world, mut ctx) = rig.split();
        let id = world.spawn(&mut ctx, desc);
        let body = rig.world.get(id).unwrap().body;
        rig.physics.remove_body(body);

        rig.world.update_moving(&mut rig.physics, &mut rig.scene, 0.5);
        assert_eq!(rig.world.get(id).unwrap().pos.y, -3030.0);
    }

    #[test]
    fn test_same_seed_same_world() {
        let mut a = Rig::new(1234, DifficultyTuning::default());
        let mut b = Rig::new(1234, DifficultyTuning::default());
        a.seed();
        b.seed();
        assert_eq!(a.world.platforms(), b.world.platforms());
    }

    proptest! {
        #[test]
        fn prop_every_row_reachable_from_previous(seed in any::<u64>(), batches in 1usize..8) {
            let mut rig = Rig::still(seed);
            rig.seed();
            for _ in 0..batches {
                let y = rig.world.cursor() + 1000.0;
                rig.advance(y);
            }
            let platforms = by_id(&rig.world);
            for pair in platforms.windows(2) {
                let dx = (pair[1].pos.x - pair[0].pos.x).abs();
                let dy = pair[0].pos.y - pair[1].pos.y;
                prop_assert!(dx <= 250.0 + 1e-3, "dx {}", dx);
                prop_assert!(dy > 99.99 && dy < 250.01, "dy {}", dy);
                prop_assert!((100.0..=700.0).contains(&pair[1].pos.x));
            }
        }

        #[test]
        fn prop_rows_reachable_under_default_tuning(seed in any::<u64>(), batches in 1usize..8) {
            let mut rig = Rig::new(seed, DifficultyTuning::default());
            rig.seed();
            rig.world.drain_spawned();
            let travel = rig.world.config().vertical_travel;

            for _ in 0..batches {
                // Let movers drift so anchors are wherever they are right now
                for _ in 0..30 {
                    rig.world.update_moving(&mut rig.physics, &mut rig.scene, 1.0 / 60.0);
                }
                let mut known: Vec<Vec2> = rig.world.platforms().iter().map(|p| p.pos).collect();
                let mut row_y = rig.world.cursor();

                let y = row_y + 1000.0;
                rig.advance(y);
                let mut fresh = rig.world.drain_spawned();
                fresh.sort();
                prop_assert_eq!(fresh.len(), 5);

                for id in fresh {
                    let p = rig.world.get(id).unwrap();
                    let params = rig.curve.parameters_for(START.y - row_y);
                    let gap = row_y - p.pos.y;
                    prop_assert!(gap > params.min_gap - 0.01 && gap < params.max_gap + 0.01, "gap {}", gap);
                    prop_assert!((100.0..=700.0).contains(&p.pos.x));
                    let anchored = known.iter().any(|q| {
                        (q.x - p.pos.x).abs() <= 250.0 + 1e-3
                            && (q.y - p.pos.y).abs() <= params.max_gap + travel + 0.01
                    });
                    prop_assert!(anchored, "no anchor for {:?}", p.pos);
                    known.push(p.pos);
                    row_y = p.pos.y;
                }
            }
        }

        #[test]
        fn prop_cursor_never_moves_down(seed in any::<u64>(), steps in proptest::collection::vec(-3000.0f32..3000.0, 1..20)) {
            let mut rig = Rig::new(seed, DifficultyTuning::default());
            rig.seed();
            let mut last = rig.world.cursor();
            for offset in steps {
                let y = rig.world.cursor() + offset;
                rig.advance(y);
                prop_assert!(rig.world.cursor() <= last);
                last = rig.world.cursor();
            }
        }

        #[test]
        fn prop_ids_unique_and_pool_bounded(seed in any::<u64>(), rounds in 1usize..30) {
            let mut rig = Rig::new(seed, DifficultyTuning::default());
            rig.seed();
            let mut seen = std::collections::HashSet::new();
            for p in rig.world.platforms() {
                seen.insert(p.id);
            }
            for _ in 0..rounds {
                let top = rig.world.cursor();
                rig.advance(top + 1000.0);
                rig.world.evict(&mut rig.physics, &mut rig.scene, top + 400.0);
                for id in rig.world.drain_spawned() {
                    seen.insert(id);
                }
                let ids: std::collections::HashSet<_> = rig.world.platforms().iter().map(|p| p.id).collect();
                prop_assert_eq!(ids.len(), rig.world.platforms().len());
                prop_assert!(rig.world.pooled_len() <= rig.world.config().pool_cap());
                prop_assert_eq!(rig.physics.body_count(), rig.world.platforms().len());
            }
            let spawned = rig.world.pool_stats().created + rig.world.pool_stats().reused;
            prop_assert_eq!(seen.len() as u64, spawned);
        }
    }
}
