//! Physics boundary
//!
//! The generation engine treats the rigid-body simulator as a black box: it
//! creates bodies, pushes positions/velocities, removes bodies and consumes
//! collision-start pairs. `SimplePhysics` is the reference backend used by the
//! headless runner and the tests: axis-aligned boxes, gravity on dynamic
//! bodies, and Matter-style contact activation (a pair flagged inactive is
//! never resolved as a solid collision for as long as it stays in contact).

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{GRAVITY, MAX_FALL_SPEED};
use crate::error::PhysicsError;

/// Opaque handle to a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
}

impl Shape {
    /// Half extents of the bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Rect { width, height } => Vec2::new(width, height) * 0.5,
            Shape::Circle { radius } => Vec2::splat(radius),
        }
    }
}

/// Surface response parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Friction {
    pub friction: f32,
    pub friction_air: f32,
    pub restitution: f32,
}

impl Friction {
    /// Grippy, non-bouncy surface (platforms)
    pub const SOLID: Self = Self {
        friction: 1.0,
        friction_air: 0.0,
        restitution: 0.0,
    };
    /// Frictionless body (enemies)
    pub const SLICK: Self = Self {
        friction: 0.0,
        friction_air: 0.001,
        restitution: 0.0,
    };
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub position: Vec2,
    /// Static bodies are never integrated; their position is pushed by the caller
    pub is_static: bool,
    pub friction: Friction,
}

/// A collision-start pair as reported by the physics step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPair {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Position of B relative to A (center to center)
    pub relative_position: Vec2,
    /// Velocity of B relative to A
    pub relative_velocity: Vec2,
    /// Whether the pair should be resolved as a solid contact
    pub active: bool,
}

impl ContactPair {
    /// The body paired with `body`, if `body` is part of this pair
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }

    /// Relative position and velocity of `body` with respect to its partner
    pub fn relative_to_partner(&self, body: BodyHandle) -> Option<(Vec2, Vec2)> {
        if self.body_b == body {
            Some((self.relative_position, self.relative_velocity))
        } else if self.body_a == body {
            Some((-self.relative_position, -self.relative_velocity))
        } else {
            None
        }
    }
}

/// The rigid-body simulator as seen by the generation engine
pub trait PhysicsWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn set_position(&mut self, body: BodyHandle, position: Vec2) -> Result<(), PhysicsError>;
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) -> Result<(), PhysicsError>;
    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;
    fn contains(&self, body: BodyHandle) -> bool;
    /// Remove a body; removing an unknown or already-removed handle is a no-op
    fn remove_body(&mut self, body: BodyHandle);
    /// Advance the simulation, returning pairs that started touching this step
    fn step(&mut self, dt: f32) -> Vec<ContactPair>;
    /// Apply activation decisions for pairs returned by the last `step`
    fn resolve(&mut self, pairs: &[ContactPair]);
}

/// Tolerance under which touching bodies still count as in contact
const CONTACT_SLOP: f32 = 0.5;

#[derive(Debug, Clone)]
struct Body {
    shape: Shape,
    pos: Vec2,
    vel: Vec2,
    is_static: bool,
    friction: Friction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactState {
    /// Reported, awaiting an activation decision
    Pending,
    Active,
    Inactive,
}

/// Reference AABB physics backend
#[derive(Debug, Clone)]
pub struct SimplePhysics {
    bodies: BTreeMap<BodyHandle, Body>,
    contacts: BTreeMap<(BodyHandle, BodyHandle), ContactState>,
    next_handle: u32,
    pub gravity: f32,
    pub max_fall_speed: f32,
}

impl Default for SimplePhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl SimplePhysics {
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            contacts: BTreeMap::new(),
            next_handle: 1,
            gravity: GRAVITY,
            max_fall_speed: MAX_FALL_SPEED,
        }
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_mut(&mut self, body: BodyHandle) -> Result<&mut Body, PhysicsError> {
        self.bodies
            .get_mut(&body)
            .ok_or(PhysicsError::UnknownBody(body))
    }

    /// Overlap depth on each axis (negative means separated)
    fn penetration(a: &Body, b: &Body) -> Vec2 {
        let extent = a.shape.half_extents() + b.shape.half_extents();
        extent - (b.pos - a.pos).abs()
    }

    fn overlapping(a: &Body, b: &Body) -> bool {
        let pen = Self::penetration(a, b);
        pen.x >= -CONTACT_SLOP && pen.y >= -CONTACT_SLOP
    }

    /// Push the dynamic body of a pair out along the axis of least penetration
    fn separate(&mut self, key: (BodyHandle, BodyHandle)) {
        let (Some(a), Some(b)) = (self.bodies.get(&key.0), self.bodies.get(&key.1)) else {
            return;
        };
        let (mover, anchor) = match (a.is_static, b.is_static) {
            (false, true) => (key.0, key.1),
            (true, false) => (key.1, key.0),
            _ => return,
        };
        let anchor_pos = self.bodies[&anchor].pos;
        let pen = Self::penetration(&self.bodies[&mover], &self.bodies[&anchor]);
        let Some(body) = self.bodies.get_mut(&mover) else {
            return;
        };
        let away = body.pos - anchor_pos;
        if pen.y <= pen.x {
            if pen.y > 0.0 {
                body.pos.y += pen.y * away.y.signum();
            }
            if (away.y < 0.0 && body.vel.y > 0.0) || (away.y > 0.0 && body.vel.y < 0.0) {
                body.vel.y = 0.0;
            }
        } else {
            if pen.x > 0.0 {
                body.pos.x += pen.x * away.x.signum();
            }
            if (away.x < 0.0 && body.vel.x > 0.0) || (away.x > 0.0 && body.vel.x < 0.0) {
                body.vel.x = 0.0;
            }
        }
    }

    fn pair_key(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
        if a < b { (a, b) } else { (b, a) }
    }
}

impl PhysicsWorld for SimplePhysics {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            Body {
                shape: desc.shape,
                pos: desc.position,
                vel: Vec2::ZERO,
                is_static: desc.is_static,
                friction: desc.friction,
            },
        );
        handle
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec2) -> Result<(), PhysicsError> {
        self.body_mut(body)?.pos = position;
        Ok(())
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) -> Result<(), PhysicsError> {
        self.body_mut(body)?.vel = velocity;
        Ok(())
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.pos)
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.vel)
    }

    fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    fn remove_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body).is_some() {
            self.contacts.retain(|&(a, b), _| a != body && b != body);
        }
    }

    fn step(&mut self, dt: f32) -> Vec<ContactPair> {
        for body in self.bodies.values_mut().filter(|b| !b.is_static) {
            body.vel.y = (body.vel.y + self.gravity * dt).min(self.max_fall_speed);
            body.vel.x *= 1.0 - body.friction.friction_air;
            body.pos += body.vel * dt;
        }

        // Dynamic bodies against everything else, in handle order
        let movers: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, b)| !b.is_static)
            .map(|(h, _)| *h)
            .collect();

        let mut touching = Vec::new();
        for &mover in &movers {
            for (&other, other_body) in &self.bodies {
                if other == mover {
                    continue;
                }
                // Dynamic pairs are visited once, from the lower handle
                if !other_body.is_static && other < mover {
                    continue;
                }
                if Self::overlapping(&self.bodies[&mover], other_body) {
                    touching.push(Self::pair_key(mover, other));
                }
            }
        }

        self.contacts.retain(|key, _| touching.contains(key));

        let mut started = Vec::new();
        for key in touching {
            match self.contacts.get(&key).copied() {
                Some(ContactState::Inactive) => {}
                Some(ContactState::Active) | Some(ContactState::Pending) => self.separate(key),
                None => {
                    let a = &self.bodies[&key.0];
                    let b = &self.bodies[&key.1];
                    started.push(ContactPair {
                        body_a: key.0,
                        body_b: key.1,
                        relative_position: b.pos - a.pos,
                        relative_velocity: b.vel - a.vel,
                        active: true,
                    });
                    self.contacts.insert(key, ContactState::Pending);
                }
            }
        }
        started
    }

    fn resolve(&mut self, pairs: &[ContactPair]) {
        for pair in pairs {
            let key = Self::pair_key(pair.body_a, pair.body_b);
            let Some(state) = self.contacts.get_mut(&key) else {
                continue;
            };
            if *state != ContactState::Pending {
                continue;
            }
            if pair.active {
                *state = ContactState::Active;
                self.separate(key);
            } else {
                *state = ContactState::Inactive;
            }
        }
    }
}
