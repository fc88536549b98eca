/// Fail-safe timer measured in simulated seconds. Once expired it stays
/// expired until reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Watchdog {
    timeout: f64,
    last_reset: f64,
    expired: bool,
}

impl Watchdog {
    pub fn new(timeout: f64, now: f64) -> Self {
        Self { timeout: timeout.max(0.0), last_reset: now, expired: false }
    }

    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    pub fn expired(&self) -> bool {
        self.expired
    }

    pub fn reset(&mut self, now: f64) {
        self.last_reset = now;
        self.expired = false;
    }

    /// Returns true on the check that trips the timer.
    pub fn check(&mut self, now: f64) -> bool {
        if !self.expired && now - self.last_reset > self.timeout {
            self.expired = true;
            return true;
        }
        false
    }
}
