//! Gateway configuration.
//!
//! - `calibration`: Empirically fitted constants matching specific hardware
//!   (gauge curves, sensor coefficients, drivetrain geometry)
//! - `thresholds`: Alarm limits, fan curve, staleness windows and task cadences

pub mod calibration;
pub mod thresholds;

// Re-export calibration constants at config level for convenience
pub use calibration::{
    ADC_FULL_SCALE,
    ADC_REF_VOLTS,
    AFR_MAX_RATIO,
    AFR_MIN_RATIO,
    AFR_TABLE,
    AFR_TABLE_STEP_VX100,
    DIAG_RAW_TO_VOLTS,
    FINAL_DRIVE_RATIO,
    GEAR_RATIOS,
    PEDAL_MAX_VOLTS,
    PEDAL_MIN_VOLTS,
    RPM_PULSES_PER_REVOLUTION,
    RpmFactorCurve,
    SPEED_GAUGE_OFFSET,
    SPEED_GAUGE_SLOPE,
    SPEED_PAYLOAD_OFFSET,
    TEMP_GAUGE_OFFSET,
    TEMP_GAUGE_SCALE,
    WHEEL_SPEED_CORRECTION,
    rolling_circumference_mm,
};
// Re-export thresholds at config level for convenience
pub use thresholds::{
    ALARM_COOLANT_TEMP_C,
    ALARM_CRANKCASE_VACUUM_PSI,
    ALARM_FUEL_PRESSURE_HIGH_PSI,
    ALARM_FUEL_PRESSURE_LOW_PSI,
    ALARM_OIL_PRESSURE_PSI,
    ALARM_OIL_TEMP_C,
    ALARM_TONE_HZ,
    CEL_BOOT_OVERRIDE_MS,
    ENGINE_RUNNING_RPM,
    FAN_FLOOR_PERCENT,
    FAN_TEMP_MAX_C,
    FAN_TEMP_MIN_C,
    RPM_JUMP_LIMIT,
    RPM_POLL_FAST_MS,
    RPM_POLL_FAST_THRESHOLD,
    RPM_POLL_SLOW_MS,
    STALE_BROADCAST_MS,
    STALE_POLLED_MS,
    STALE_WHEEL_SPEED_MS,
};
