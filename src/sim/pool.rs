//! Platform pool
//!
//! Owns every active platform and a bounded free-list of hidden visuals for
//! recycling. Pooled entries carry no physics body: bodies are created on
//! spawn and removed on retire, so an entry can never collide while pooled.

use std::collections::VecDeque;

use glam::Vec2;
use serde::Serialize;

use super::physics::{BodyDesc, BodyHandle, Friction, PhysicsWorld, Shape};
use super::platform::{Platform, PlatformId, PlatformKind, PlatformSnapshot};
use super::scene::{SceneLayer, VisualHandle, VisualKind};
use crate::tuning::WorldConfig;

/// Everything the generator decides about a new platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformDesc {
    pub pos: Vec2,
    pub width: f32,
    pub kind: PlatformKind,
    pub level: u32,
    pub safe: bool,
}

/// A hidden, recyclable visual. No body field: pooled means not simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PooledPlatform {
    visual: VisualHandle,
}

/// What happened to a platform on its way out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Retirement {
    Pooled,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovedPlatform {
    pub snapshot: PlatformSnapshot,
    pub retirement: Retirement,
}

/// Pool counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub pooled: u64,
    pub destroyed: u64,
}

#[derive(Debug, Clone)]
pub struct PlatformPool {
    active: Vec<Platform>,
    free: VecDeque<PooledPlatform>,
    next_id: u32,
    platform_height: f32,
    cap: usize,
    trim_batch: usize,
    stats: PoolStats,
}

impl PlatformPool {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            active: Vec::new(),
            free: VecDeque::new(),
            next_id: 0,
            platform_height: config.platform_height,
            cap: config.pool_cap(),
            trim_batch: (config.pool_grow_step as usize).max(1),
            stats: PoolStats::default(),
        }
    }

    /// Activate a platform, recycling a pooled visual when one is available.
    /// Every spawn gets a fresh id.
    pub fn spawn<P, S>(&mut self, physics: &mut P, scene: &mut S, desc: PlatformDesc) -> PlatformId
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let id = PlatformId(self.next_id);
        self.next_id += 1;

        let shape = Shape::Rect {
            width: desc.width,
            height: self.platform_height,
        };
        let kind = VisualKind::Platform(desc.kind.category());

        let visual = match self.free.pop_back() {
            Some(pooled) => {
                scene.reshape_visual(pooled.visual, kind, shape);
                scene.set_visual_position(pooled.visual, desc.pos);
                scene.set_visual_visible(pooled.visual, true);
                self.stats.reused += 1;
                pooled.visual
            }
            None => {
                self.stats.created += 1;
                scene.create_visual(kind, shape, desc.pos)
            }
        };

        let body = physics.create_body(BodyDesc {
            shape,
            position: desc.pos,
            is_static: true,
            friction: Friction::SOLID,
        });

        self.active.push(Platform {
            id,
            pos: desc.pos,
            width: desc.width,
            height: self.platform_height,
            kind: desc.kind,
            level: desc.level,
            safe: desc.safe,
            body,
            visual,
        });
        id
    }

    /// Remove one active platform. Unknown ids are a no-op.
    pub fn retire<P, S>(&mut self, physics: &mut P, scene: &mut S, id: PlatformId) -> Option<RemovedPlatform>
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let index = self.active.iter().position(|p| p.id == id)?;
        let platform = self.active.remove(index);
        Some(self.release(physics, scene, platform))
    }

    /// Remove every active platform matching `pred`, keeping the order of the
    /// survivors. Returns the removed platforms in their former order.
    pub fn retire_where<P, S, F>(&mut self, physics: &mut P, scene: &mut S, mut pred: F) -> Vec<RemovedPlatform>
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
        F: FnMut(&Platform) -> bool,
    {
        let (gone, keep): (Vec<Platform>, Vec<Platform>) =
            std::mem::take(&mut self.active).into_iter().partition(|p| pred(p));
        self.active = keep;
        gone.into_iter()
            .map(|p| self.release(physics, scene, p))
            .collect()
    }

    fn release<P, S>(&mut self, physics: &mut P, scene: &mut S, platform: Platform) -> RemovedPlatform
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        physics.remove_body(platform.body);
        let snapshot = platform.snapshot();

        if !platform.poolable() {
            scene.destroy_visual(platform.visual);
            self.stats.destroyed += 1;
            return RemovedPlatform {
                snapshot,
                retirement: Retirement::Destroyed,
            };
        }

        scene.set_visual_visible(platform.visual, false);
        self.free.push_back(PooledPlatform {
            visual: platform.visual,
        });
        self.stats.pooled += 1;

        if self.free.len() > self.cap {
            let excess = self.trim_batch.min(self.free.len());
            for pooled in self.free.drain(..excess) {
                scene.destroy_visual(pooled.visual);
                self.stats.destroyed += 1;
            }
            log::debug!("Platform pool trimmed by {} (now {})", excess, self.free.len());
        }

        RemovedPlatform {
            snapshot,
            retirement: Retirement::Pooled,
        }
    }

    /// Destroy everything, active and pooled
    pub fn clear<P, S>(&mut self, physics: &mut P, scene: &mut S)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        for platform in self.active.drain(..) {
            physics.remove_body(platform.body);
            scene.destroy_visual(platform.visual);
        }
        for pooled in self.free.drain(..) {
            scene.destroy_visual(pooled.visual);
        }
    }

    pub fn get(&self, id: PlatformId) -> Option<&Platform> {
        self.active.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlatformId) -> Option<&mut Platform> {
        self.active.iter_mut().find(|p| p.id == id)
    }

    pub fn find_by_body(&self, body: BodyHandle) -> Option<&Platform> {
        self.active.iter().find(|p| p.body == body)
    }

    /// Active platforms in spawn order
    pub fn active(&self) -> &[Platform] {
        &self.active
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut Platform> {
        self.active.iter_mut()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn pooled_len(&self) -> usize {
        self.free.len()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
