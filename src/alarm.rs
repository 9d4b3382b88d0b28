//! Audible alarm state machine.
//!
//! A fixed set of thresholds is checked on a 500 ms cadence; breaching any
//! single one arms the alarm, and it only disarms once every condition has
//! cleared simultaneously. There is no per-condition latching. Policy knobs
//! cover the two behaviours worth tuning per car: gating on a running
//! engine, and a debounce before the first sounding of an
//! episode (so a pressure spike during cranking does not blast the buzzer).

use crate::config::thresholds::{
    ALARM_COOLANT_TEMP_C,
    ALARM_CRANKCASE_VACUUM_PSI,
    ALARM_DEBOUNCE_MS,
    ALARM_FUEL_PRESSURE_HIGH_PSI,
    ALARM_FUEL_PRESSURE_LOW_PSI,
    ALARM_OIL_PRESSURE_PSI,
    ALARM_OIL_TEMP_C,
    ALARM_TONE_HZ,
    ENGINE_RUNNING_RPM,
};
use crate::io::ToneSink;

/// Everything the alarm evaluates, sampled once per check.
#[derive(Clone, Copy, Default, Debug)]
pub struct AlarmMetrics {
    pub oil_temp_c: i32,
    pub coolant_temp_c: i32,
    pub oil_pressure_psi: f32,
    pub crankcase_vacuum_psi: f32,
    pub fuel_pressure_psi: f32,
    pub engine_rpm: u32,
}

impl AlarmMetrics {
    /// Whether any monitored threshold is breached.
    pub fn any_breached(&self) -> bool {
        self.oil_temp_c > ALARM_OIL_TEMP_C
            || self.coolant_temp_c > ALARM_COOLANT_TEMP_C
            || self.oil_pressure_psi < ALARM_OIL_PRESSURE_PSI
            || self.crankcase_vacuum_psi < ALARM_CRANKCASE_VACUUM_PSI
            || self.fuel_pressure_psi < ALARM_FUEL_PRESSURE_LOW_PSI
            || self.fuel_pressure_psi > ALARM_FUEL_PRESSURE_HIGH_PSI
    }
}

/// Configurable alarm behaviour.
#[derive(Clone, Copy, Debug)]
pub struct AlarmPolicy {
    /// Only sound while the engine is actually turning.
    pub require_engine_running: bool,
    /// How long a breach must persist before the first sounding.
    pub debounce_ms: u64,
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self {
            require_engine_running: true,
            debounce_ms: ALARM_DEBOUNCE_MS,
        }
    }
}

/// Current alarm lifecycle state.
#[derive(Clone, Copy, Default, Debug)]
pub struct AlarmState {
    pub active: bool,
    pub triggered_at_ms: Option<u64>,
}

pub struct AlarmController {
    policy: AlarmPolicy,
    state: AlarmState,
    breach_since_ms: Option<u64>,
}

impl AlarmController {
    pub const fn new(policy: AlarmPolicy) -> Self {
        Self {
            policy,
            state: AlarmState {
                active: false,
                triggered_at_ms: None,
            },
            breach_since_ms: None,
        }
    }

    /// Evaluate the thresholds and drive the tone output accordingly.
    /// Returns the resulting state.
    pub fn evaluate(&mut self, metrics: &AlarmMetrics, now_ms: u64, tone: &mut impl ToneSink) -> AlarmState {
        let engine_ok = !self.policy.require_engine_running || metrics.engine_rpm > ENGINE_RUNNING_RPM;
        let breached = metrics.any_breached() && engine_ok;

        if breached {
            let since = *self.breach_since_ms.get_or_insert(now_ms);
            let held_long_enough = now_ms.saturating_sub(since) >= self.policy.debounce_ms;
            if held_long_enough && !self.state.active {
                self.state.active = true;
                self.state.triggered_at_ms = Some(now_ms);
                tone.start_tone(ALARM_TONE_HZ);
            }
        } else {
            self.breach_since_ms = None;
            if self.state.active {
                self.state.active = false;
                tone.stop_tone();
            }
        }
        self.state
    }

    pub const fn state(&self) -> AlarmState {
        self.state
    }
}

impl Default for AlarmController {
    fn default() -> Self {
        Self::new(AlarmPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records tone commands for assertions.
    #[derive(Default)]
    struct ToneLog {
        started: u32,
        stopped: u32,
        sounding: bool,
    }

    impl ToneSink for ToneLog {
        fn start_tone(&mut self, frequency_hz: u16) {
            assert_eq!(frequency_hz, ALARM_TONE_HZ);
            self.started += 1;
            self.sounding = true;
        }

        fn stop_tone(&mut self) {
            self.stopped += 1;
            self.sounding = false;
        }
    }

    fn healthy() -> AlarmMetrics {
        AlarmMetrics {
            oil_temp_c: 95,
            coolant_temp_c: 88,
            oil_pressure_psi: 45.0,
            crankcase_vacuum_psi: -2.0,
            fuel_pressure_psi: 52.0,
            engine_rpm: 3000,
        }
    }

    fn immediate_policy() -> AlarmPolicy {
        AlarmPolicy {
            require_engine_running: true,
            debounce_ms: 0,
        }
    }

    #[test]
    fn test_any_single_breach_activates() {
        let breaches = [
            AlarmMetrics { oil_temp_c: 125, ..healthy() },
            AlarmMetrics { coolant_temp_c: 115, ..healthy() },
            AlarmMetrics { oil_pressure_psi: 5.0, ..healthy() },
            AlarmMetrics { crankcase_vacuum_psi: -8.0, ..healthy() },
            AlarmMetrics { fuel_pressure_psi: 40.0, ..healthy() },
            AlarmMetrics { fuel_pressure_psi: 60.0, ..healthy() },
        ];
        for metrics in breaches {
            let mut alarm = AlarmController::new(immediate_policy());
            let mut tone = ToneLog::default();
            let state = alarm.evaluate(&metrics, 0, &mut tone);
            assert!(state.active, "should activate for {metrics:?}");
            assert!(tone.sounding);
        }
    }

    #[test]
    fn test_deactivates_only_when_all_clear() {
        let mut alarm = AlarmController::new(immediate_policy());
        let mut tone = ToneLog::default();

        let two_breaches = AlarmMetrics {
            oil_temp_c: 125,
            fuel_pressure_psi: 40.0,
            ..healthy()
        };
        assert!(alarm.evaluate(&two_breaches, 0, &mut tone).active);

        // One condition clears, the other still holds
        let one_breach = AlarmMetrics { oil_temp_c: 125, ..healthy() };
        assert!(alarm.evaluate(&one_breach, 500, &mut tone).active);

        // All clear
        assert!(!alarm.evaluate(&healthy(), 1000, &mut tone).active);
        assert!(!tone.sounding);
        assert_eq!(tone.started, 1);
        assert_eq!(tone.stopped, 1);
    }

    #[test]
    fn test_engine_running_gate() {
        let mut alarm = AlarmController::new(immediate_policy());
        let mut tone = ToneLog::default();
        // Oil pressure reads zero with the engine off; that is not a fault
        let parked = AlarmMetrics {
            oil_pressure_psi: 0.0,
            engine_rpm: 0,
            ..healthy()
        };
        assert!(!alarm.evaluate(&parked, 0, &mut tone).active);
        assert_eq!(tone.started, 0);
    }

    #[test]
    fn test_debounce_delays_first_sounding() {
        let policy = AlarmPolicy {
            require_engine_running: true,
            debounce_ms: 2000,
        };
        let mut alarm = AlarmController::new(policy);
        let mut tone = ToneLog::default();
        let hot = AlarmMetrics { coolant_temp_c: 115, ..healthy() };

        assert!(!alarm.evaluate(&hot, 0, &mut tone).active);
        assert!(!alarm.evaluate(&hot, 1500, &mut tone).active);
        let state = alarm.evaluate(&hot, 2000, &mut tone);
        assert!(state.active);
        assert_eq!(state.triggered_at_ms, Some(2000));
    }

    #[test]
    fn test_debounce_resets_when_breach_clears() {
        let policy = AlarmPolicy {
            require_engine_running: false,
            debounce_ms: 2000,
        };
        let mut alarm = AlarmController::new(policy);
        let mut tone = ToneLog::default();
        let hot = AlarmMetrics { coolant_temp_c: 115, ..healthy() };

        alarm.evaluate(&hot, 0, &mut tone);
        alarm.evaluate(&healthy(), 1000, &mut tone);
        // Fresh episode; the clock starts over
        assert!(!alarm.evaluate(&hot, 1500, &mut tone).active);
        assert!(!alarm.evaluate(&hot, 3400, &mut tone).active);
        assert!(alarm.evaluate(&hot, 3500, &mut tone).active);
    }
}
