//! Radiator fan control.
//!
//! The fan motor driver takes a PWM duty; the duty follows coolant
//! temperature linearly between the configured start and full-speed
//! temperatures, with a floor so the motor never creeps inaudibly, and a
//! hard cut whenever the engine is not turning so residual heat after
//! parking cannot drain the battery.

use crate::config::thresholds::{ENGINE_RUNNING_RPM, FAN_FLOOR_PERCENT, FAN_TEMP_MAX_C, FAN_TEMP_MIN_C};

/// One computed fan output.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FanOutput {
    pub percent: u8,
    pub pwm: u8,
}

/// Fan duty for the given coolant temperature and engine RPM.
pub fn compute_fan_percent(coolant_temp_c: i32, engine_rpm: u32) -> u8 {
    if engine_rpm <= ENGINE_RUNNING_RPM {
        return 0;
    }
    if coolant_temp_c < FAN_TEMP_MIN_C {
        return 0;
    }
    if coolant_temp_c >= FAN_TEMP_MAX_C {
        return 100;
    }
    let span = (FAN_TEMP_MAX_C - FAN_TEMP_MIN_C) as u32;
    let above_min = (coolant_temp_c - FAN_TEMP_MIN_C) as u32;
    let percent = (above_min * 100 / span) as u8;
    percent.max(FAN_FLOOR_PERCENT)
}

/// Fan controller retaining the last output so the caller can skip
/// redundant PWM writes.
pub struct FanController {
    last: FanOutput,
}

impl FanController {
    pub const fn new() -> Self {
        Self {
            last: FanOutput { percent: 0, pwm: 0 },
        }
    }

    /// Compute the new output; `changed` is false when the duty is
    /// identical to the previous call and the PWM write can be skipped.
    pub fn update(&mut self, coolant_temp_c: i32, engine_rpm: u32) -> (FanOutput, bool) {
        let percent = compute_fan_percent(coolant_temp_c, engine_rpm);
        let output = FanOutput {
            percent,
            pwm: (u16::from(percent) * 255 / 100) as u8,
        };
        let changed = output != self.last;
        self.last = output;
        (output, changed)
    }

    pub const fn last(&self) -> FanOutput {
        self.last
    }
}

impl Default for FanController {
    fn default() -> Self {
        Self::new()
    }
}
