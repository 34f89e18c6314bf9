use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

// Sliding window - remembers when each admission inside the trailing window happened
pub struct RateWindow {
    quota: usize,
    window: Duration,
    admissions: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota: quota.max(1) as usize,
            window,
            admissions: VecDeque::new(),
        }
    }

    // drop admissions that have left the window
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admissions.front() {
            if now.duration_since(oldest) >= self.window {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `None` if an admission is possible at `now`, otherwise the
    /// instant at which the oldest admission leaves the window.
    pub fn next_slot(&mut self, now: Instant) -> Option<Instant> {
        self.prune(now);
        if self.admissions.len() < self.quota {
            return None;
        }
        self.admissions.front().map(|oldest| *oldest + self.window)
    }

    // caller must have checked next_slot first
    pub fn record(&mut self, now: Instant) {
        self.admissions.push_back(now);
    }

    pub fn in_window(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.admissions.len()
    }
}
