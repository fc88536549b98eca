//! Sensors sample their mount after every solver step, but expose a new
//! reading only at their own rate.

mod kinds;
pub mod noise;

pub use kinds::{SensorData, SensorKind};

use std::collections::VecDeque;

use hydro::{Environment, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::mount::{Mount, MountFrame, SceneRefs};
use crate::render::{RenderKind, Renderable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Simulated time of the sample.
    pub time: f64,
    pub data: SensorData,
}

/// Read-only scene access for one sensor pass.
#[derive(Clone, Copy)]
pub struct SensorContext<'a> {
    pub scene: SceneRefs<'a>,
    pub env: &'a Environment,
    pub time: f64,
}

#[derive(Debug, Clone)]
pub struct Sensor {
    pub name: String,
    pub kind: SensorKind,
    pub(crate) mount: Mount,
    /// Hz; zero samples every update.
    rate: f64,
    since_sample: f64,
    history: VecDeque<SensorReading>,
    history_capacity: usize,
    last: Option<SensorReading>,
    rng: StdRng,
}

impl Sensor {
    pub fn new(name: impl Into<String>, kind: SensorKind, mount: Mount, rate: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            mount,
            rate: if rate.is_finite() { rate.max(0.0) } else { 0.0 },
            since_sample: 0.0,
            history: VecDeque::new(),
            history_capacity: 0,
            last: None,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Keep up to `capacity` past readings, oldest dropped first.
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub(crate) fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn mount(&self) -> Mount {
        self.mount
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.last.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &SensorReading> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn update(&mut self, dt: f64, ctx: &SensorContext<'_>) {
        if !(dt > 0.0) {
            return;
        }
        if self.rate > 0.0 {
            let period = 1.0 / self.rate;
            self.since_sample += dt;
            if self.since_sample < period * (1.0 - 1e-9) {
                return;
            }
            self.since_sample = (self.since_sample - period).max(0.0);
            if self.since_sample >= period {
                self.since_sample %= period;
            }
        }
        let Some(data) = kinds::measure(&self.kind, &self.mount, ctx, &mut self.rng) else {
            return;
        };
        let reading = SensorReading { time: ctx.time, data };
        self.last = Some(reading);
        if self.history_capacity > 0 {
            if self.history.len() == self.history_capacity {
                self.history.pop_front();
            }
            self.history.push_back(reading);
        }
    }

    pub(crate) fn detach(&mut self) {
        self.mount = Mount::Detached;
    }

    pub fn renderable(&self, frame: Option<MountFrame>) -> Option<Renderable> {
        let frame = frame?;
        let mut r = Renderable::new(RenderKind::Sensor, &self.name, frame.pose);
        if let Some(SensorReading { data: SensorData::Dvl { altitude: Some(a), .. }, .. }) = self.last {
            let p = frame.pose.translation;
            r = r.with_line(p, p + frame.pose.transform_vector(-Vec3::Z) * a);
        }
        Some(r)
    }
}
