//! Player entity

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyDesc, BodyHandle, Friction, PhysicsWorld, Shape};
use super::scene::{SceneLayer, VisualHandle, VisualKind};
use super::tick::TickInput;
use crate::consts::REFERENCE_FPS;
use crate::tuning::PlayerConfig;

/// Slightly bouncy, low-grip body
const PLAYER_FRICTION: Friction = Friction {
    friction: 0.05,
    friction_air: 0.0,
    restitution: 0.2,
};

/// Upward speed above which the player counts as jumping
const JUMPING_SPEED: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub body: BodyHandle,
    pub visual: VisualHandle,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// Set by a landing, cleared by a jump
    pub can_jump: bool,
    pub is_jumping: bool,
    pub dead: bool,
    pub facing: Facing,
}

impl Player {
    pub fn spawn<P, S>(config: &PlayerConfig, color: u32, physics: &mut P, scene: &mut S) -> Self
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let pos = Vec2::new(config.start_x, config.start_y);
        let shape = Shape::Rect {
            width: config.width,
            height: config.height,
        };
        let body = physics.create_body(BodyDesc {
            shape,
            position: pos,
            is_static: false,
            friction: PLAYER_FRICTION,
        });
        let visual = scene.create_visual(VisualKind::Player { color }, shape, pos);

        Self {
            body,
            visual,
            pos,
            vel: Vec2::ZERO,
            size: Vec2::new(config.width, config.height),
            can_jump: false,
            is_jumping: false,
            dead: false,
            facing: Facing::Right,
        }
    }

    /// Turn input into a velocity. Returns true if a jump started.
    pub fn apply_input<P>(&mut self, input: &TickInput, config: &PlayerConfig, physics: &mut P, dt: f32) -> bool
    where
        P: PhysicsWorld + ?Sized,
    {
        if self.dead {
            return false;
        }
        let current = physics.velocity(self.body).unwrap_or(self.vel);

        let vx = if input.left {
            self.facing = Facing::Left;
            -config.move_speed
        } else if input.right {
            self.facing = Facing::Right;
            config.move_speed
        } else {
            current.x * config.air_friction.powf(dt * REFERENCE_FPS)
        };

        let jumped = input.jump && self.can_jump;
        let vy = if jumped {
            self.can_jump = false;
            self.is_jumping = true;
            config.jump_velocity
        } else {
            current.y
        };

        self.vel = Vec2::new(vx, vy);
        if let Err(err) = physics.set_velocity(self.body, self.vel) {
            log::warn!("Player velocity not applied: {}", err);
        }
        jumped
    }

    /// Pull position and velocity back from physics after a step
    pub fn sync<P, S>(&mut self, physics: &P, scene: &mut S)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        let (Some(pos), Some(vel)) = (physics.position(self.body), physics.velocity(self.body)) else {
            log::warn!("Player body {:?} missing, keeping last state", self.body);
            return;
        };
        self.pos = pos;
        self.vel = vel;
        self.is_jumping = vel.y < -JUMPING_SPEED;
        scene.set_visual_position(self.visual, pos);
    }

    pub fn enable_jump(&mut self) {
        self.can_jump = true;
        self.is_jumping = false;
    }

    /// Height climbed above `origin_y`
    pub fn height(&self, origin_y: f32) -> f32 {
        origin_y - self.pos.y
    }

    pub fn fell_out(&self, camera_bottom: f32, margin: f32) -> bool {
        self.pos.y > camera_bottom + margin
    }

    /// Freeze the player. Returns false if already dead.
    pub fn die<P>(&mut self, physics: &mut P) -> bool
    where
        P: PhysicsWorld + ?Sized,
    {
        if self.dead {
            return false;
        }
        self.dead = true;
        self.can_jump = false;
        self.is_jumping = false;
        self.vel = Vec2::ZERO;
        if let Err(err) = physics.set_velocity(self.body, Vec2::ZERO) {
            log::warn!("Dead player not frozen: {}", err);
        }
        true
    }

    pub fn despawn<P, S>(&self, physics: &mut P, scene: &mut S)
    where
        P: PhysicsWorld + ?Sized,
        S: SceneLayer + ?Sized,
    {
        physics.remove_body(self.body);
        scene.destroy_visual(self.visual);
    }
}
