//! Vertical follow camera

use serde::{Deserialize, Serialize};

use crate::consts::REFERENCE_FPS;

/// Viewport that tracks the player upward and never scrolls back down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// y of the viewport's top edge
    pub scroll_y: f32,
    pub height: f32,
}

impl Camera {
    /// Camera centered on `focus_y`
    pub fn new(height: f32, focus_y: f32) -> Self {
        Self {
            scroll_y: focus_y - height / 2.0,
            height,
        }
    }

    /// Ease toward centering `target_y`, but only upward. `lerp` is the
    /// fraction of the distance closed per reference frame.
    pub fn follow(&mut self, target_y: f32, lerp: f32, dt: f32) {
        let desired = target_y - self.height / 2.0;
        if desired >= self.scroll_y {
            return;
        }
        let t = 1.0 - (1.0 - lerp.clamp(0.0, 1.0)).powf(dt * REFERENCE_FPS);
        self.scroll_y += (desired - self.scroll_y) * t;
    }

    pub fn top(&self) -> f32 {
        self.scroll_y
    }

    pub fn bottom(&self) -> f32 {
        self.scroll_y + self.height
    }
}
