//! Cooperative periodic task timing.
//!
//! The gateway runs as one tight loop polling a set of timers, one per
//! periodic task. A timer fires at most once
//! per elapsed period regardless of how fast the loop spins; time beyond the
//! period is absorbed rather than accumulated, so a stall never produces a
//! burst of catch-up firings. Task bodies must not block: one slow body
//! starves every other task including itself.

/// A single periodic timer with wall-clock due checking.
pub struct PeriodicTimer {
    period_ms: u32,
    last_fired_ms: Option<u64>,
}

impl PeriodicTimer {
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_fired_ms: None,
        }
    }

    /// Returns true exactly once per elapsed period. The first call after
    /// construction fires immediately.
    pub fn call(&mut self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            Some(last) if now_ms.saturating_sub(last) < u64::from(self.period_ms) => false,
            _ => {
                self.last_fired_ms = Some(now_ms);
                true
            }
        }
    }

    /// Change the period mid-flight. The last-fired bookkeeping is left
    /// untouched so an in-progress interval is neither cut short twice nor
    /// reset.
    pub fn set_period(&mut self, period_ms: u32) {
        self.period_ms = period_ms;
    }

    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }
}
