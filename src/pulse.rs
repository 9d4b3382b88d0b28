//! Interrupt-safe RPM pulse counting.
//!
//! The tach signal wire from the ECM pulses three times per crank
//! revolution, serviced by a hardware interrupt. That interrupt is the only
//! genuine concurrency in the system: the scheduler-side reader must never
//! observe a count from one edge paired with the timestamp of another, or
//! the RPM calculation silently corrupts once per long drive. A sequence
//! lock over a pair of atomics closes that race without masking interrupts.

use core::sync::atomic::{AtomicU32, Ordering, fence};

use crate::config::RPM_PULSES_PER_REVOLUTION;
use crate::config::thresholds::{RPM_POLL_FAST_MS, RPM_POLL_FAST_THRESHOLD, RPM_POLL_SLOW_MS};

/// Consistent (count, timestamp) pair taken from the counter.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct PulseSnapshot {
    /// Monotonic pulse count, wraps at u32::MAX.
    pub count: u32,
    /// Microsecond timestamp of the most recent edge.
    pub stamp_us: u32,
}

/// Shared pulse accumulator. Single writer (the edge ISR), single reader
/// (the scheduler tick). The sequence word is odd while an update is in
/// flight, so the reader can detect and retry a torn read.
pub struct PulseCounter {
    seq: AtomicU32,
    count: AtomicU32,
    stamp_us: AtomicU32,
}

/// Retries before the reader gives up on a consistent pair. On target the
/// ISR finishes in well under a microsecond, so a second attempt already
/// succeeds; the bound exists so the reader can never spin forever.
const SNAPSHOT_RETRIES: u32 = 8;

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            count: AtomicU32::new(0),
            stamp_us: AtomicU32::new(0),
        }
    }

    /// Record one rising edge. Invoked from interrupt context only.
    pub fn on_pulse_edge(&self, now_us: u32) {
        let seq = self.seq.load(Ordering::Relaxed);
        // Odd sequence marks the pair as mid-update. On the single-core
        // target ISR preemption alone orders the stores; the fence keeps
        // the data stores behind the odd marker on any other memory model.
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        let count = self.count.load(Ordering::Relaxed);
        self.count.store(count.wrapping_add(1), Ordering::Relaxed);
        self.stamp_us.store(now_us, Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Take a consistent snapshot of (count, timestamp).
    ///
    /// Returns `None` only if the ISR kept interrupting the read for all
    /// retry attempts; the caller falls back to its previous sample.
    pub fn snapshot(&self) -> Option<PulseSnapshot> {
        for _ in 0..SNAPSHOT_RETRIES {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 != 0 {
                continue;
            }
            let count = self.count.load(Ordering::Acquire);
            let stamp_us = self.stamp_us.load(Ordering::Acquire);
            let after = self.seq.load(Ordering::Acquire);
            if before == after {
                return Some(PulseSnapshot { count, stamp_us });
            }
        }
        None
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// RPM from the delta of two pulse deltas, with every division guarded.
///
/// Returns `None` when the pulse delta is zero (engine stopped or signal
/// lost) or the time delta is zero.
pub fn rpm_from_deltas(delta_pulses: u32, delta_us: u32, pulses_per_rev: u32) -> Option<u32> {
    if delta_pulses == 0 || delta_us == 0 || pulses_per_rev == 0 {
        return None;
    }
    let pulses_per_minute = (60_000_000u64 * u64::from(delta_pulses)) / u64::from(delta_us);
    Some((pulses_per_minute / u64::from(pulses_per_rev)) as u32)
}

/// Scheduler-side RPM calculation over successive counter snapshots.
pub struct RpmCalculator {
    previous: PulseSnapshot,
    last_rpm: u32,
}

impl RpmCalculator {
    pub const fn new() -> Self {
        Self {
            previous: PulseSnapshot { count: 0, stamp_us: 0 },
            last_rpm: 0,
        }
    }

    /// Compute RPM from the pulses accumulated since the previous call.
    ///
    /// No pulses in the window reads as a stopped engine (0 RPM). A failed
    /// snapshot returns the previous value unchanged.
    pub fn compute(&mut self, counter: &PulseCounter) -> u32 {
        let Some(current) = counter.snapshot() else {
            return self.last_rpm;
        };
        let delta_pulses = current.count.wrapping_sub(self.previous.count);
        let delta_us = current.stamp_us.wrapping_sub(self.previous.stamp_us);
        self.previous = current;

        self.last_rpm = rpm_from_deltas(delta_pulses, delta_us, RPM_PULSES_PER_REVOLUTION).unwrap_or(0);
        self.last_rpm
    }

    pub const fn last_rpm(&self) -> u32 {
        self.last_rpm
    }
}

impl Default for RpmCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulse-window poll interval for the current RPM.
///
/// Fast at high RPM to reduce quantization error, slow at low RPM so the
/// window still contains enough pulses to be meaningful.
pub const fn poll_interval_for(rpm: u32) -> u32 {
    if rpm >= RPM_POLL_FAST_THRESHOLD {
        RPM_POLL_FAST_MS
    } else {
        RPM_POLL_SLOW_MS
    }
}
