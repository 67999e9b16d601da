//! Visual boundary
//!
//! Each logical entity owns exactly one visual handle whose lifetime matches
//! its own. The core never knows how a visual is drawn.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::Shape;
use super::platform::PlatformCategory;

/// Opaque handle to a visual in the scene layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// What a visual represents (drives styling in the renderer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualKind {
    Player { color: u32 },
    Platform(PlatformCategory),
    Enemy,
}

/// Scene layer as seen by the simulation
pub trait SceneLayer {
    fn create_visual(&mut self, kind: VisualKind, shape: Shape, position: Vec2) -> VisualHandle;
    /// Restyle and resize a visual (pooled platforms are reused this way)
    fn reshape_visual(&mut self, handle: VisualHandle, kind: VisualKind, shape: Shape);
    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec2);
    fn set_visual_visible(&mut self, handle: VisualHandle, visible: bool);
    fn destroy_visual(&mut self, handle: VisualHandle);
}

/// A visual tracked by the headless scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    pub kind: VisualKind,
    pub shape: Shape,
    pub position: Vec2,
    pub visible: bool,
}

/// Scene layer that only records state (native runner, tests)
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    visuals: BTreeMap<VisualHandle, Visual>,
    next_handle: u32,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: VisualHandle) -> Option<&Visual> {
        self.visuals.get(&handle)
    }

    /// Visuals not yet destroyed (visible or hidden)
    pub fn live_count(&self) -> usize {
        self.visuals.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visuals.values().filter(|v| v.visible).count()
    }
}

impl SceneLayer for HeadlessScene {
    fn create_visual(&mut self, kind: VisualKind, shape: Shape, position: Vec2) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        self.visuals.insert(
            handle,
            Visual {
                kind,
                shape,
                position,
                visible: true,
            },
        );
        handle
    }

    fn reshape_visual(&mut self, handle: VisualHandle, kind: VisualKind, shape: Shape) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.kind = kind;
            v.shape = shape;
        }
    }

    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec2) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.position = position;
        }
    }

    fn set_visual_visible(&mut self, handle: VisualHandle, visible: bool) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.visible = visible;
        }
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.visuals.remove(&handle);
    }
}
