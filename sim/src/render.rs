use std::sync::Arc;

use hydro::{Pose, Vec3};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Solid,
    Actuator,
    Sensor,
    Comm,
    Animated,
}

/// What a renderer needs to draw one entity. Never touches graphics APIs.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub kind: RenderKind,
    pub name: String,
    pub pose: Pose,
    /// Debug line list (start, end) in world frame.
    pub lines: Vec<(Vec3, Vec3)>,
}

impl Renderable {
    pub fn new(kind: RenderKind, name: &str, pose: Pose) -> Self {
        Self { kind, name: name.to_string(), pose, lines: Vec::new() }
    }

    pub fn with_line(mut self, from: Vec3, to: Vec3) -> Self {
        self.lines.push((from, to));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub tick: u64,
    pub time: f64,
    pub items: Vec<Renderable>,
}

/// Double buffer between the physics thread and readers. The physics thread
/// builds a complete frame off to the side and swaps it in; readers clone the
/// current `Arc` and never hold the lock while drawing.
#[derive(Debug, Clone, Default)]
pub struct RenderBuffer {
    front: Arc<RwLock<Arc<RenderFrame>>>,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: RenderFrame) {
        let frame = Arc::new(frame);
        *self.front.write() = frame;
    }

    pub fn latest(&self) -> Arc<RenderFrame> {
        self.front.read().clone()
    }
}
