use std::collections::VecDeque;

use hydro::Vec3;

use crate::arena::{Arena, Id};
use crate::solid::Solid;
use crate::world::ContactManifold;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub time: f64,
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f64,
}

/// Tracks contacts between two solids across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMonitor {
    pub name: String,
    pub(crate) a: Option<Id<Solid>>,
    pub(crate) b: Option<Id<Solid>>,
    in_contact: bool,
    ticks_in_contact: u64,
    points: Vec<ContactEvent>,
    history: VecDeque<ContactEvent>,
    history_capacity: usize,
}

impl ContactMonitor {
    pub fn new(name: impl Into<String>, a: Id<Solid>, b: Id<Solid>, history_capacity: usize) -> Self {
        Self {
            name: name.into(),
            a: Some(a),
            b: Some(b),
            in_contact: false,
            ticks_in_contact: 0,
            points: Vec::new(),
            history: VecDeque::new(),
            history_capacity,
        }
    }

    pub fn in_contact(&self) -> bool {
        self.in_contact
    }

    /// Consecutive ticks the pair has been touching.
    pub fn ticks_in_contact(&self) -> u64 {
        self.ticks_in_contact
    }

    pub fn points(&self) -> &[ContactEvent] {
        &self.points
    }

    pub fn history(&self) -> impl Iterator<Item = &ContactEvent> {
        self.history.iter()
    }

    pub(crate) fn forget(&mut self, solid: Id<Solid>) {
        if self.a == Some(solid) {
            self.a = None;
        }
        if self.b == Some(solid) {
            self.b = None;
        }
    }

    pub(crate) fn update(&mut self, time: f64, manifolds: &[ContactManifold], solids: &Arena<Solid>) {
        self.points.clear();
        let bodies = self.a.and_then(|a| solids.get(a)).zip(self.b.and_then(|b| solids.get(b)));
        if let Some((a, b)) = bodies {
            let (ha, hb) = (a.body(), b.body());
            for m in manifolds.iter().filter(|m| (m.a == ha && m.b == hb) || (m.a == hb && m.b == ha)) {
                // Normals reported from `a` to `b`
                let flip = if m.a == ha { 1.0 } else { -1.0 };
                self.points.extend(m.points.iter().map(|p| ContactEvent {
                    time,
                    point: p.position,
                    normal: p.normal * flip,
                    depth: p.depth,
                }));
            }
        }
        self.in_contact = !self.points.is_empty();
        self.ticks_in_contact = if self.in_contact { self.ticks_in_contact + 1 } else { 0 };
        if self.history_capacity > 0 {
            for p in &self.points {
                if self.history.len() == self.history_capacity {
                    self.history.pop_front();
                }
                self.history.push_back(*p);
            }
        }
    }
}
