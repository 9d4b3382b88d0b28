//! Acceleration timing and fine-grained trace capture.
//!
//! Both features ride the same speed stream from the chassis bus. The
//! interval timers watch for rising-edge crossings of their speed bounds
//! and keep a personal-best duration that only ever improves. The trace
//! recorder ("dyno run") buffers timestamped speed samples between a start
//! and end speed so a pull can be plotted afterwards; the buffer is
//! bounded and a run that stalls is abandoned on a time cutoff.

use heapless::Vec;

use crate::config::thresholds::{
    PERF_WINDOW_0_TO_50,
    PERF_WINDOW_0_TO_100,
    PERF_WINDOW_80_TO_120,
    TRACE_CAPACITY,
    TRACE_CUTOFF_MS,
    TRACE_END_KPH,
    TRACE_SAMPLE_MS,
    TRACE_START_KPH,
};

// =============================================================================
// Interval timing
// =============================================================================

/// One tracked speed interval (e.g. 0-100 km/h).
pub struct SpeedWindow {
    lower_kph: f32,
    upper_kph: f32,
    started_at_ms: Option<u64>,
    latest_ms: Option<u64>,
    best_ms: Option<u64>,
}

impl SpeedWindow {
    pub const fn new(lower_kph: f32, upper_kph: f32) -> Self {
        Self {
            lower_kph,
            upper_kph,
            started_at_ms: None,
            latest_ms: None,
            best_ms: None,
        }
    }

    fn update(&mut self, previous_kph: f32, speed_kph: f32, timestamp_ms: u64) {
        // Start: crossing up through the lower bound (or moving off
        // standstill for windows that begin at zero)
        let started = if self.lower_kph == 0.0 {
            speed_kph > 0.0 && previous_kph == 0.0
        } else {
            speed_kph >= self.lower_kph && previous_kph < self.lower_kph
        };
        if started {
            self.started_at_ms = Some(timestamp_ms);
        }

        // End: crossing up through the upper bound with a run in progress
        if speed_kph >= self.upper_kph && previous_kph < self.upper_kph {
            if let Some(start) = self.started_at_ms {
                let duration = timestamp_ms.saturating_sub(start);
                self.latest_ms = Some(duration);
                if self.best_ms.is_none_or(|best| duration < best) {
                    self.best_ms = Some(duration);
                }
            }
        }
    }

    pub const fn latest_ms(&self) -> Option<u64> {
        self.latest_ms
    }

    /// Best duration seen since power-on. Never resets, never worsens.
    pub const fn best_ms(&self) -> Option<u64> {
        self.best_ms
    }
}

/// The three concurrently tracked acceleration windows.
pub struct PerformanceTimer {
    pub zero_to_fifty: SpeedWindow,
    pub zero_to_hundred: SpeedWindow,
    pub eighty_to_one_twenty: SpeedWindow,
    previous_kph: Option<f32>,
}

impl PerformanceTimer {
    pub const fn new() -> Self {
        Self {
            zero_to_fifty: SpeedWindow::new(PERF_WINDOW_0_TO_50.0, PERF_WINDOW_0_TO_50.1),
            zero_to_hundred: SpeedWindow::new(PERF_WINDOW_0_TO_100.0, PERF_WINDOW_0_TO_100.1),
            eighty_to_one_twenty: SpeedWindow::new(PERF_WINDOW_80_TO_120.0, PERF_WINDOW_80_TO_120.1),
            previous_kph: None,
        }
    }

    /// Feed one speed sample to every window. Sub-1 km/h wheel speed
    /// readings are sensor noise at standstill and squash to zero so the
    /// "launch" edge stays detectable. The first-ever sample only seeds
    /// the crossing detection: a car already moving at power-on must not
    /// read as a launch.
    pub fn update(&mut self, timestamp_ms: u64, speed_kph: f32) {
        let speed = if speed_kph < 1.0 { 0.0 } else { speed_kph };
        if let Some(previous) = self.previous_kph {
            self.zero_to_fifty.update(previous, speed, timestamp_ms);
            self.zero_to_hundred.update(previous, speed, timestamp_ms);
            self.eighty_to_one_twenty.update(previous, speed, timestamp_ms);
        }
        self.previous_kph = Some(speed);
    }
}

impl Default for PerformanceTimer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Trace capture
// =============================================================================

/// One buffered trace sample, timestamped relative to run start.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TraceSample {
    pub elapsed_ms: u32,
    pub speed_kph: f32,
}

/// Why a trace run ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TraceEndReason {
    EndSpeedReached,
    BufferFull,
    Timeout,
}

/// Receives completed trace runs.
pub trait TraceSink {
    fn run_complete(&mut self, reason: TraceEndReason, samples: &[TraceSample]);
}

/// Bounded recorder for one active run at a time.
pub struct TraceRecorder {
    samples: Vec<TraceSample, TRACE_CAPACITY>,
    active: bool,
    started_at_ms: u64,
    last_sample_at_ms: Option<u64>,
    previous_kph: f32,
}

impl TraceRecorder {
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
            active: false,
            started_at_ms: 0,
            last_sample_at_ms: None,
            previous_kph: 0.0,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one speed sample; flushes to the sink when the run ends for
    /// any reason.
    pub fn update(&mut self, timestamp_ms: u64, speed_kph: f32, sink: &mut impl TraceSink) {
        // Entering a run: crossing up through the start speed
        if !self.active && speed_kph >= TRACE_START_KPH && self.previous_kph < TRACE_START_KPH {
            self.active = true;
            self.started_at_ms = timestamp_ms;
            self.last_sample_at_ms = None;
        }

        if self.active {
            // Subsample: only on speed change, no closer than the
            // configured resolution
            let spaced = self
                .last_sample_at_ms
                .is_none_or(|last| timestamp_ms > last + TRACE_SAMPLE_MS);
            if speed_kph != self.previous_kph && spaced {
                let sample = TraceSample {
                    elapsed_ms: timestamp_ms.saturating_sub(self.started_at_ms) as u32,
                    speed_kph,
                };
                if self.samples.push(sample).is_err() || self.samples.is_full() {
                    self.finish(TraceEndReason::BufferFull, sink);
                    self.previous_kph = speed_kph;
                    return;
                }
                self.last_sample_at_ms = Some(timestamp_ms);
            }
        }

        // Completed run: crossing up through the end speed
        if self.active && speed_kph >= TRACE_END_KPH && self.previous_kph < TRACE_END_KPH {
            self.finish(TraceEndReason::EndSpeedReached, sink);
        }

        // Abandoned run: cutoff exceeded without completing
        if self.active && timestamp_ms.saturating_sub(self.started_at_ms) > TRACE_CUTOFF_MS {
            self.finish(TraceEndReason::Timeout, sink);
        }

        self.previous_kph = speed_kph;
    }

    fn finish(&mut self, reason: TraceEndReason, sink: &mut impl TraceSink) {
        sink.run_complete(reason, &self.samples);
        self.samples.clear();
        self.active = false;
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_to_hundred_duration() {
        let mut timer = PerformanceTimer::new();
        let samples = [(0u64, 0.0), (10, 0.0), (20, 30.0), (30, 60.0), (40, 90.0), (50, 100.0), (60, 110.0)];
        for (ts, speed) in samples {
            timer.update(ts, speed);
        }
        // Launch at t=20 (first nonzero after a zero), 100 reached at t=50
        assert_eq!(timer.zero_to_hundred.latest_ms(), Some(30));
        assert_eq!(timer.zero_to_hundred.best_ms(), Some(30));
        // 0-50 completed at t=30
        assert_eq!(timer.zero_to_fifty.best_ms(), Some(10));
    }

    #[test]
    fn test_best_never_worsens() {
        let mut timer = PerformanceTimer::new();
        // Fast run
        for (ts, speed) in [(0u64, 0.0), (10, 40.0), (20, 100.0)] {
            timer.update(ts, speed);
        }
        assert_eq!(timer.zero_to_hundred.best_ms(), Some(10));

        // Slower run afterwards must not touch the best
        for (ts, speed) in [(1000u64, 0.0), (1100, 40.0), (1500, 100.0)] {
            timer.update(ts, speed);
        }
        assert_eq!(timer.zero_to_hundred.latest_ms(), Some(400));
        assert_eq!(timer.zero_to_hundred.best_ms(), Some(10));
    }

    #[test]
    fn test_eighty_to_one_twenty_independent_of_launch() {
        let mut timer = PerformanceTimer::new();
        // Rolling start, never at 0
        for (ts, speed) in [(0u64, 60.0), (100, 85.0), (200, 110.0), (300, 125.0)] {
            timer.update(ts, speed);
        }
        // 80 crossed at t=100, 120 at t=300
        assert_eq!(timer.eighty_to_one_twenty.best_ms(), Some(200));
        // Zero-launch windows never started
        assert_eq!(timer.zero_to_hundred.best_ms(), None);
    }

    #[test]
    fn test_power_on_while_moving_is_not_a_launch() {
        let mut timer = PerformanceTimer::new();
        // First sample ever arrives mid-drive and climbs through 100
        for (ts, speed) in [(0u64, 90.0), (100, 95.0), (200, 101.0)] {
            timer.update(ts, speed);
        }
        assert_eq!(timer.zero_to_fifty.best_ms(), None);
        assert_eq!(timer.zero_to_hundred.best_ms(), None);
    }

    #[test]
    fn test_sub_one_kph_counts_as_standstill() {
        let mut timer = PerformanceTimer::new();
        for (ts, speed) in [(0u64, 0.4), (10, 0.8), (20, 30.0), (30, 55.0)] {
            timer.update(ts, speed);
        }
        // Launch edge detected at t=20 despite the noise floor
        assert_eq!(timer.zero_to_fifty.best_ms(), Some(10));
    }

    // -------------------------------------------------------------------------
    // Trace recorder
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct SinkLog {
        runs: std::vec::Vec<(TraceEndReason, usize)>,
        last_samples: std::vec::Vec<TraceSample>,
    }

    impl TraceSink for SinkLog {
        fn run_complete(&mut self, reason: TraceEndReason, samples: &[TraceSample]) {
            self.runs.push((reason, samples.len()));
            self.last_samples = samples.to_vec();
        }
    }

    #[test]
    fn test_trace_records_between_start_and_end() {
        let mut recorder = TraceRecorder::new();
        let mut sink = SinkLog::default();

        recorder.update(0, 10.0, &mut sink);
        recorder.update(100, 30.0, &mut sink); // run starts
        assert!(recorder.is_active());
        recorder.update(150, 45.0, &mut sink);
        recorder.update(200, 60.0, &mut sink);
        recorder.update(260, 105.0, &mut sink); // end speed crossed

        assert!(!recorder.is_active());
        assert_eq!(sink.runs.len(), 1);
        let (reason, count) = sink.runs[0];
        assert_eq!(reason, TraceEndReason::EndSpeedReached);
        assert_eq!(count, 4);
        // Timestamps are relative to run start
        assert_eq!(sink.last_samples[0].elapsed_ms, 0);
        assert_eq!(sink.last_samples[1].elapsed_ms, 50);
    }

    #[test]
    fn test_trace_subsamples_by_resolution_and_change() {
        let mut recorder = TraceRecorder::new();
        let mut sink = SinkLog::default();

        recorder.update(0, 30.0, &mut sink); // run starts, first sample
        recorder.update(5, 31.0, &mut sink); // too close in time
        recorder.update(30, 32.0, &mut sink); // sampled
        recorder.update(60, 32.0, &mut sink); // unchanged, skipped
        recorder.update(90, 33.0, &mut sink); // sampled
        recorder.update(200, 105.0, &mut sink);

        let (_, count) = sink.runs[0];
        assert_eq!(count, 4);
    }

    #[test]
    fn test_trace_times_out() {
        let mut recorder = TraceRecorder::new();
        let mut sink = SinkLog::default();

        recorder.update(0, 30.0, &mut sink);
        recorder.update(TRACE_CUTOFF_MS + 1, 35.0, &mut sink);

        assert!(!recorder.is_active());
        assert_eq!(sink.runs[0].0, TraceEndReason::Timeout);
    }

    #[test]
    fn test_trace_buffer_clears_between_runs() {
        let mut recorder = TraceRecorder::new();
        let mut sink = SinkLog::default();

        recorder.update(0, 30.0, &mut sink);
        recorder.update(30, 50.0, &mut sink);
        recorder.update(60, 105.0, &mut sink);
        let first_count = sink.runs[0].1;

        // Back below start speed, then a second run
        recorder.update(1000, 10.0, &mut sink);
        recorder.update(1100, 30.0, &mut sink);
        recorder.update(1130, 50.0, &mut sink);
        recorder.update(1160, 105.0, &mut sink);

        assert_eq!(sink.runs.len(), 2);
        assert_eq!(sink.runs[1].1, first_count);
    }

    #[test]
    fn test_only_one_run_at_a_time() {
        let mut recorder = TraceRecorder::new();
        let mut sink = SinkLog::default();

        recorder.update(0, 30.0, &mut sink);
        let started = recorder.started_at_ms;
        // Re-crossing the start threshold mid-run must not restart the clock
        recorder.update(100, 20.0, &mut sink);
        recorder.update(200, 30.0, &mut sink);
        assert_eq!(recorder.started_at_ms, started);
    }
}
