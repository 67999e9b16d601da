//! Platform entities
//!
//! Category-specific data lives in the `PlatformKind` payload so that only a
//! moving platform has movement fields and only a breakable one can be breaking.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyHandle, Shape};
use super::scene::VisualHandle;

/// Session-unique platform id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatformId(pub u32);

/// Payload-free platform category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformCategory {
    Static,
    Breakable,
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Back-and-forth movement between two bounds on one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub axis: Axis,
    pub min: f32,
    pub max: f32,
    /// Units per second
    pub speed: f32,
    /// +1.0 or -1.0
    pub direction: f32,
}

impl Motion {
    /// Move `pos` along the axis, reversing at (and clamping to) the bounds
    pub fn advance(&mut self, pos: &mut Vec2, dt: f32) {
        let coord = match self.axis {
            Axis::Horizontal => &mut pos.x,
            Axis::Vertical => &mut pos.y,
        };
        *coord += self.speed * self.direction * dt;
        if *coord <= self.min || *coord >= self.max {
            self.direction = -self.direction;
            *coord = coord.clamp(self.min, self.max);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlatformKind {
    Static,
    Breakable { breaking: bool },
    Moving(Motion),
}

impl PlatformKind {
    pub fn category(&self) -> PlatformCategory {
        match self {
            PlatformKind::Static => PlatformCategory::Static,
            PlatformKind::Breakable { .. } => PlatformCategory::Breakable,
            PlatformKind::Moving(_) => PlatformCategory::Moving,
        }
    }
}

/// An active platform. Active platforms always own a live physics body.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub id: PlatformId,
    /// Center position
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub kind: PlatformKind,
    /// Difficulty level when created
    pub level: u32,
    /// Start platform or tutorial platform
    pub safe: bool,
    pub body: BodyHandle,
    pub visual: VisualHandle,
}

impl Platform {
    pub fn shape(&self) -> Shape {
        Shape::Rect {
            width: self.width,
            height: self.height,
        }
    }

    pub fn category(&self) -> PlatformCategory {
        self.kind.category()
    }

    pub fn left(&self) -> f32 {
        self.pos.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.width / 2.0
    }

    /// y of the landing surface
    pub fn top(&self) -> f32 {
        self.pos.y - self.height / 2.0
    }

    pub fn is_breaking(&self) -> bool {
        matches!(self.kind, PlatformKind::Breakable { breaking: true })
    }

    /// Breakable platforms are destroyed on removal, never recycled
    pub fn poolable(&self) -> bool {
        !matches!(self.kind, PlatformKind::Breakable { .. })
    }

    pub fn snapshot(&self) -> PlatformSnapshot {
        PlatformSnapshot {
            id: self.id,
            pos: self.pos,
            width: self.width,
            height: self.height,
            category: self.category(),
            level: self.level,
        }
    }
}

/// Detached copy of a platform for events and scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    pub id: PlatformId,
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub category: PlatformCategory,
    pub level: u32,
}
