//! Inbound CAN frame decoding.
//!
//! The ECM side is a mix of one continuous broadcast (coolant temperature on
//! 0x551) and responses to the diagnostic queries the gateway polls with
//! (0x7E8, echoing the queried service and PID). The chassis side broadcasts
//! the four wheel speeds on 0x1F0. Anything unrecognised is dropped without
//! comment; a gateway that logs every foreign frame on a live bus drowns.
//!
//! All byte-to-unit formulas are empirical fits against the real hardware,
//! sourced from [`crate::config::calibration`].

use crate::can::{CHASSIS_WHEEL_SPEED_ID, CanFrame, ECM_COOLANT_ID, ECM_DIAG_RESPONSE_ID};
use crate::config::calibration::{
    AFR_MAX_RATIO,
    AFR_MIN_RATIO,
    AFR_TABLE,
    AFR_TABLE_STEP_VX100,
    DIAG_RAW_TO_VOLTS,
    PEDAL_MAX_VOLTS,
    PEDAL_MIN_VOLTS,
    WHEEL_SPEED_CORRECTION,
};
use crate::config::thresholds::{LIGHT_CODE_CHECK_ENGINE, LIGHT_CODE_NONE};
use crate::params::EngineParams;

/// Diagnostic services the ECM echoes back with 0x40 added.
const SERVICE_READ_BY_PID: u8 = 0x62;
const SERVICE_READ_FAULTS: u8 = 0x57;

/// Decode one frame from the donor ECM bus into the parameter store.
/// Unknown identifiers and PIDs are ignored.
pub fn decode_ecm_frame(frame: &CanFrame, now_ms: u64, params: &mut EngineParams) {
    match frame.id {
        ECM_COOLANT_ID => {
            if frame.len >= 1 {
                // Calibrated offset, empirically fit
                params.coolant_temp_c.update(i32::from(frame.data[0]) - 40, now_ms);
            }
        }
        ECM_DIAG_RESPONSE_ID => decode_diag_response(frame, now_ms, params),
        _ => {}
    }
}

/// Dispatch a 0x7E8 diagnostic response on the echoed service and PID.
fn decode_diag_response(frame: &CanFrame, now_ms: u64, params: &mut EngineParams) {
    if frame.len < 8 {
        return;
    }
    let data = &frame.data;
    match data[1] {
        SERVICE_READ_BY_PID => {
            let raw16 = (u16::from(data[4]) << 8) | u16::from(data[5]);
            match (data[2], data[3]) {
                // Oil temperature
                (0x11, 0x1F) => params.oil_temp_c.update(i32::from(data[4]) - 50, now_ms),
                // Battery voltage
                (0x11, 0x03) => params.battery_volts.update(f32::from(raw16) / DIAG_RAW_TO_VOLTS, now_ms),
                // Gas pedal position
                (0x12, 0x0D) => {
                    let volts = f32::from(raw16) / DIAG_RAW_TO_VOLTS;
                    params.gas_pedal_percent.update(pedal_percent_from_volts(volts), now_ms);
                }
                // Air/fuel ratio sensor voltages, one per bank
                (0x12, 0x25) => {
                    let volts = f32::from(raw16) / DIAG_RAW_TO_VOLTS;
                    params.afr_bank1.update(afr_from_voltage(volts), now_ms);
                }
                (0x12, 0x26) => {
                    let volts = f32::from(raw16) / DIAG_RAW_TO_VOLTS;
                    params.afr_bank2.update(afr_from_voltage(volts), now_ms);
                }
                // Fuel trim (alpha) percentages
                (0x11, 0x23) => params.alpha_percent_bank1.update(i32::from(data[4]), now_ms),
                (0x11, 0x24) => params.alpha_percent_bank2.update(i32::from(data[4]), now_ms),
                // Intake air temperature
                (0x11, 0x06) => params.intake_air_temp_c.update(i32::from(data[4]) - 50, now_ms),
                _ => {}
            }
        }
        SERVICE_READ_FAULTS => {
            // data[2] carries the stored fault count
            let code = if data[2] > 0 { LIGHT_CODE_CHECK_ENGINE } else { LIGHT_CODE_NONE };
            params.check_engine_code.update(code, now_ms);
        }
        _ => {}
    }
}

/// Decode one frame from the chassis bus into the parameter store.
pub fn decode_chassis_frame(frame: &CanFrame, now_ms: u64, params: &mut EngineParams) {
    if frame.id != CHASSIS_WHEEL_SPEED_ID || frame.len < 8 {
        return;
    }
    let front_left = wheel_speed_kph(frame.data[0], frame.data[1]);
    let front_right = wheel_speed_kph(frame.data[2], frame.data[3]);
    let rear_left = wheel_speed_kph(frame.data[4], frame.data[5]);
    let rear_right = wheel_speed_kph(frame.data[6], frame.data[7]);

    params.speed_front_kph.update((front_left + front_right) / 2.0, now_ms);
    params.speed_rear_kph.update((rear_left + rear_right) / 2.0, now_ms);
    params
        .rear_speed_variation_percent
        .update(rear_variation_percent(rear_left, rear_right), now_ms);
}

/// One wheel speed: a 12-bit field spanning two bytes, in 1/16 km/h.
fn wheel_speed_kph(low: u8, high: u8) -> f32 {
    let raw = u16::from(low) + u16::from(high & 0x0F) * 256;
    (f32::from(raw) / 16.0) * WHEEL_SPEED_CORRECTION
}

/// Spread between the rear wheels as a percentage of the slower one, used as
/// a drivetrain-slip / diff-wear indicator. Zero while either wheel is
/// stopped: the ratio is meaningless and the division unguarded.
fn rear_variation_percent(left: f32, right: f32) -> f32 {
    let (min, max) = if left < right { (left, right) } else { (right, left) };
    if min <= 0.0 {
        return 0.0;
    }
    (max - min) / min * 100.0
}

/// Gas pedal travel as a percentage of the sender's calibrated voltage span.
fn pedal_percent_from_volts(volts: f32) -> f32 {
    let percent = (volts - PEDAL_MIN_VOLTS) / (PEDAL_MAX_VOLTS - PEDAL_MIN_VOLTS) * 100.0;
    percent.clamp(0.0, 100.0)
}

/// Air/fuel ratio from oxygen sensor voltage via the calibration table.
///
/// The table is keyed by voltage x100 in 0.1 V steps; between breakpoints
/// the ratio interpolates linearly. Below 0 V clamps to the minimum ratio,
/// at or above the last breakpoint to the maximum.
pub fn afr_from_voltage(volts: f32) -> f32 {
    if volts <= 0.0 {
        return AFR_MIN_RATIO;
    }
    let scaled = volts * 100.0;
    let last_key = ((AFR_TABLE.len() - 1) as u32 * AFR_TABLE_STEP_VX100) as f32;
    if scaled >= last_key {
        return AFR_MAX_RATIO;
    }
    let index = (scaled / AFR_TABLE_STEP_VX100 as f32) as usize;
    let lower = f32::from(AFR_TABLE[index]);
    let upper = f32::from(AFR_TABLE[index + 1]);
    let frac = (scaled - (index as u32 * AFR_TABLE_STEP_VX100) as f32) / AFR_TABLE_STEP_VX100 as f32;
    (lower + (upper - lower) * frac) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::ECM_DIAG_REQUEST_ID;

    fn diag_response(service: u8, pid_hi: u8, pid_lo: u8, b4: u8, b5: u8) -> CanFrame {
        CanFrame::new(ECM_DIAG_RESPONSE_ID, [0x05, service, pid_hi, pid_lo, b4, b5, 0, 0])
    }

    #[test]
    fn test_coolant_broadcast() {
        let mut params = EngineParams::new(0);
        let frame = CanFrame::new(ECM_COOLANT_ID, [130, 0, 0, 0, 0, 0, 0, 0]);
        decode_ecm_frame(&frame, 100, &mut params);
        assert_eq!(params.coolant(100), 90);
    }

    #[test]
    fn test_oil_temp_response() {
        let mut params = EngineParams::new(0);
        decode_ecm_frame(&diag_response(0x62, 0x11, 0x1F, 155, 0), 100, &mut params);
        assert_eq!(params.oil_temp(100), 105);
    }

    #[test]
    fn test_battery_voltage_response() {
        let mut params = EngineParams::new(0);
        // 2760 / 200 = 13.8 V
        decode_ecm_frame(&diag_response(0x62, 0x11, 0x03, 0x0A, 0xC8), 100, &mut params);
        assert!((params.battery(100) - 13.8).abs() < 0.01);
    }

    #[test]
    fn test_pedal_response_spans_calibrated_voltages() {
        let mut params = EngineParams::new(0);
        // 0.65 V -> 0%
        decode_ecm_frame(&diag_response(0x62, 0x12, 0x0D, 0x00, 130), 100, &mut params);
        assert!(params.pedal(100).abs() < 0.01);
        // 4.85 V = raw 970 -> 100%
        decode_ecm_frame(&diag_response(0x62, 0x12, 0x0D, 0x03, 0xCA), 200, &mut params);
        assert!((params.pedal(200) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_fault_scan_sets_check_engine() {
        let mut params = EngineParams::new(0);
        decode_ecm_frame(&diag_response(0x57, 2, 0, 0, 0), 100, &mut params);
        assert_eq!(params.check_engine_code.raw(), LIGHT_CODE_CHECK_ENGINE);
        decode_ecm_frame(&diag_response(0x57, 0, 0, 0, 0), 200, &mut params);
        assert_eq!(params.check_engine_code.raw(), LIGHT_CODE_NONE);
    }

    #[test]
    fn test_unknown_frames_are_dropped() {
        let mut params = EngineParams::new(0);
        decode_ecm_frame(&CanFrame::new(0x123, [0xFF; 8]), 100, &mut params);
        decode_ecm_frame(&CanFrame::new(ECM_DIAG_REQUEST_ID, [0xFF; 8]), 100, &mut params);
        decode_ecm_frame(&diag_response(0x62, 0x7F, 0x7F, 10, 10), 100, &mut params);
        assert!(!params.coolant_temp_c.has_value());
        assert!(!params.oil_temp_c.has_value());
    }

    #[test]
    fn test_wheel_speed_fields() {
        let mut params = EngineParams::new(0);
        // 100 km/h = raw 1600 = 0x640: low 0x40, high nibble 0x6.
        // Upper nibble of the high byte is unrelated data and must be masked.
        let frame = CanFrame::new(
            CHASSIS_WHEEL_SPEED_ID,
            [0x40, 0xF6, 0x40, 0x06, 0x40, 0x06, 0x40, 0x06],
        );
        decode_chassis_frame(&frame, 100, &mut params);
        assert!((params.speed_front(100) - 100.0).abs() < 0.01);
        assert!((params.speed_rear(100) - 100.0).abs() < 0.01);
        assert!(params.rear_speed_variation(100).abs() < 0.01);
    }

    #[test]
    fn test_rear_variation_guards_stopped_wheel() {
        assert_eq!(rear_variation_percent(0.0, 50.0), 0.0);
        assert_eq!(rear_variation_percent(50.0, 0.0), 0.0);
        // 50 vs 55: 10% of the slower wheel
        assert!((rear_variation_percent(50.0, 55.0) - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_afr_clamps() {
        assert_eq!(afr_from_voltage(0.0), 10.0);
        assert_eq!(afr_from_voltage(-1.0), 10.0);
        assert_eq!(afr_from_voltage(4.9), 60.0);
        assert_eq!(afr_from_voltage(5.0), 60.0);
    }

    #[test]
    fn test_afr_exact_at_breakpoints() {
        // 2.5 V and 3.5 V are exactly representable, so the interpolation
        // fraction is exactly zero and the table entry comes back untouched
        assert_eq!(afr_from_voltage(2.5), 14.70);
        assert_eq!(afr_from_voltage(3.5), 18.00);
    }

    #[test]
    fn test_afr_interpolates_between_breakpoints() {
        // Halfway between 2.0 V (13.20) and 2.1 V (13.50)
        let ratio = afr_from_voltage(2.05);
        assert!((ratio - 13.35).abs() < 0.005, "got {ratio}");
    }

    #[test]
    fn test_afr_monotonic() {
        let mut last = 0.0f32;
        for step in 0..500 {
            let ratio = afr_from_voltage(step as f32 / 100.0);
            assert!(ratio >= last, "not monotonic at {step}");
            last = ratio;
        }
    }
}
