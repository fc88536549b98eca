use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Settings a UI or config thread may change while the physics thread runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Fluid forces are recomputed every `fluid_prescaler` ticks.
    pub fluid_prescaler: u32,
    pub actuators_enabled: bool,
    /// Simulated seconds per wall-clock second fed to `advance`.
    pub realtime_factor: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self { fluid_prescaler: 1, actuators_enabled: true, realtime_factor: 1.0 }
    }
}

/// Cloneable handle to the live settings. The manager takes one snapshot per
/// tick, so a change never lands halfway through a tick.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Arc<Mutex<SimSettings>>);

impl SharedSettings {
    pub fn new(settings: SimSettings) -> Self {
        Self(Arc::new(Mutex::new(settings)))
    }

    pub fn snapshot(&self) -> SimSettings {
        *self.0.lock()
    }

    pub fn update(&self, f: impl FnOnce(&mut SimSettings)) {
        let mut guard = self.0.lock();
        f(&mut guard);
        guard.fluid_prescaler = guard.fluid_prescaler.max(1);
        if !(guard.realtime_factor.is_finite() && guard.realtime_factor >= 0.0) {
            guard.realtime_factor = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_from_another_thread_is_visible() {
        let shared = SharedSettings::default();
        let handle = shared.clone();
        std::thread::spawn(move || handle.update(|s| s.fluid_prescaler = 4)).join().unwrap();
        assert_eq!(shared.snapshot().fluid_prescaler, 4);
    }

    #[test]
    fn prescaler_never_zero() {
        let shared = SharedSettings::default();
        shared.update(|s| s.fluid_prescaler = 0);
        assert_eq!(shared.snapshot().fluid_prescaler, 1);
    }
}
