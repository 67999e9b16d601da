//! Patrolling enemies
//!
//! An enemy is bound to one platform for its whole life and walks back and
//! forth along it. Enemies never fall: their bodies are static and the patrol
//! pushes positions each tick.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::physics::{BodyDesc, BodyHandle, Friction, PhysicsWorld, Shape};
use super::platform::{Platform, PlatformId, PlatformKind};
use super::scene::{SceneLayer, VisualHandle, VisualKind};
use super::world::WorldGenerator;
use crate::tuning::EnemyConfig;
use crate::{coin_direction, uniform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub platform: PlatformId,
    pub pos: Vec2,
    /// Units per second
    pub speed: f32,
    pub direction: f32,
    pub body: BodyHandle,
    pub visual: VisualHandle,
}

/// A player/enemy contact that has been consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyHit {
    pub enemy: EnemyId,
    pub platform: PlatformId,
}

#[derive(Debug, Clone)]
pub struct EnemyPopulator {
    config: EnemyConfig,
    enemies: Vec<Enemy>,
    next_id: u32,
}

impl EnemyPopulator {
    pub fn new(config: EnemyConfig) -> Self {
        Self {
            config,
            enemies: Vec::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }

    /// Patrol bounds for a platform (collapsed to the center when too narrow)
    fn patrol_bounds(&self, platform: &Platform) -> (f32, f32) {
        let left = platform.left() + self.config.edge_margin;
        let right = platform.right() - self.config.edge_margin;
        if left <= right {
            (left, right)
        } else {
            (platform.pos.x, platform.pos.x)
        }
    }

    /// Put an enemy on `platform`. Breakable platforms and platforms that
    /// already carry an enemy are refused.
    pub fn populate<R, P, S>(
        &mut self,
        platform: &Platform,
        rng: &mut R,
        physics: &mut P,
        scene: &mut S,
    ) -> Option<EnemyId>
    where
        R: Rng + ?Sized,
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        if matches!(platform.kind, PlatformKind::Breakable { .. }) || self.on_platform(platform.id).is_some() {
            return None;
        }

        let (left, right) = self.patrol_bounds(platform);
        let pos = Vec2::new(
            platform.pos.x.clamp(left, right),
            platform.pos.y - self.config.height_offset,
        );
        let shape = Shape::Circle {
            radius: self.config.radius,
        };
        let body = physics.create_body(BodyDesc {
            shape,
            position: pos,
            is_static: true,
            friction: Friction::SLICK,
        });
        let visual = scene.create_visual(VisualKind::Enemy, shape, pos);

        let id = EnemyId(self.next_id);
        self.next_id += 1;
        self.enemies.push(Enemy {
            id,
            platform: platform.id,
            pos,
            speed: uniform(rng, self.config.min_speed, self.config.max_speed),
            direction: coin_direction(rng),
            body,
            visual,
        });
        log::debug!("Enemy {:?} spawned on platform {:?}", id, platform.id);
        Some(id)
    }

    /// Walk every enemy along its platform, turning at the edge margins.
    /// Enemies on vertically moving platforms are re-pinned to the surface.
    pub fn update<P, S>(&mut self, world: &WorldGenerator, physics: &mut P, scene: &mut S, dt: f32)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        for i in 0..self.enemies.len() {
            let platform_id = self.enemies[i].platform;
            let Some(platform) = world.get(platform_id) else {
                log::warn!(
                    "Enemy {:?} outlived platform {:?}, skipping",
                    self.enemies[i].id,
                    platform_id
                );
                continue;
            };
            let (left, right) = self.patrol_bounds(platform);
            let offset = self.config.height_offset;

            let enemy = &mut self.enemies[i];
            enemy.pos.x += enemy.speed * enemy.direction * dt;
            if enemy.pos.x <= left || enemy.pos.x >= right {
                enemy.direction = -enemy.direction;
            }
            enemy.pos.x = enemy.pos.x.clamp(left, right);
            if matches!(platform.kind, PlatformKind::Moving(_)) {
                enemy.pos.y = platform.pos.y - offset;
            }

            scene.set_visual_position(enemy.visual, enemy.pos);
            if let Err(err) = physics.set_position(enemy.body, enemy.pos) {
                log::warn!("Skipping sync of enemy {:?}: {}", enemy.id, err);
            }
        }
    }

    /// Destroy the enemy riding a removed platform. Returns how many went.
    pub fn on_platform_removed<P, S>(&mut self, platform: PlatformId, physics: &mut P, scene: &mut S) -> usize
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let (gone, keep): (Vec<Enemy>, Vec<Enemy>) = std::mem::take(&mut self.enemies)
            .into_iter()
            .partition(|e| e.platform == platform);
        self.enemies = keep;
        for enemy in &gone {
            physics.remove_body(enemy.body);
            scene.destroy_visual(enemy.visual);
        }
        gone.len()
    }

    /// Consume a contact between the player and an enemy body. The enemy is
    /// removed so a second contact in the same batch reports nothing.
    pub fn handle_player_contact<P, S>(&mut self, body: BodyHandle, physics: &mut P, scene: &mut S) -> Option<EnemyHit>
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let index = self.enemies.iter().position(|e| e.body == body)?;
        let enemy = self.enemies.remove(index);
        physics.remove_body(enemy.body);
        scene.destroy_visual(enemy.visual);
        Some(EnemyHit {
            enemy: enemy.id,
            platform: enemy.platform,
        })
    }

    pub fn find_by_body(&self, body: BodyHandle) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.body == body)
    }

    pub fn on_platform(&self, platform: PlatformId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.platform == platform)
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn clear<P, S>(&mut self, physics: &mut P, scene: &mut S)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        for enemy in self.enemies.drain(..) {
            physics.remove_body(enemy.body);
            scene.destroy_visual(enemy.visual);
        }
    }
}
