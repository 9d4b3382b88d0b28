//! Outbound CAN payload construction.
//!
//! The cluster-facing encoders reproduce the gauge calibrations the E46
//! expects; none of them are symmetric with the decode side because the two
//! buses use different physical representations. The diagnostic request
//! builders carry the exact payloads the Nissan ECM answers to.

use crate::can::{
    CLUSTER_MISC_ID,
    CLUSTER_RPM_ID,
    CLUSTER_TEMP_ID,
    CanFrame,
    ECM_DIAG_REQUEST_ID,
    ECM_SPEED_IDS,
};
use crate::config::calibration::{
    RpmFactorCurve,
    SPEED_GAUGE_OFFSET,
    SPEED_GAUGE_SLOPE,
    SPEED_PAYLOAD_OFFSET,
    TEMP_GAUGE_OFFSET,
    TEMP_GAUGE_SCALE,
};
use crate::config::thresholds::{OVERTEMP_LIGHT_FLAG, RPM_JUMP_LIMIT};

// =============================================================================
// RPM gauge (0x316)
// =============================================================================

/// Stateful RPM encoder.
///
/// The payload is retained between calls: an implausible jump from the
/// previous reading (electrical noise on the tach wire) leaves the last
/// good payload on the wire instead of kicking the needle.
pub struct RpmFrameEncoder {
    payload: [u8; 8],
    previous_rpm: u32,
    curve: RpmFactorCurve,
}

impl RpmFrameEncoder {
    pub fn new(curve: RpmFactorCurve) -> Self {
        Self {
            payload: [0; 8],
            previous_rpm: 0,
            curve,
        }
    }

    /// Build the RPM frame for the cluster. Identical input always yields
    /// an identical byte pair.
    pub fn encode(&mut self, rpm: u32) -> CanFrame {
        if rpm != 0 && rpm.abs_diff(self.previous_rpm) < RPM_JUMP_LIMIT {
            let scaled = (rpm as f32 * self.curve.factor_at(rpm)) as u16;
            self.payload[2] = (scaled & 0xFF) as u8; // LSB
            self.payload[3] = (scaled >> 8) as u8; // MSB
        }
        self.previous_rpm = rpm;
        CanFrame::new(CLUSTER_RPM_ID, self.payload)
    }
}

impl Default for RpmFrameEncoder {
    fn default() -> Self {
        Self::new(RpmFactorCurve::default())
    }
}

// =============================================================================
// Temperature gauge (0x329)
// =============================================================================

/// Coolant temperature frame for the cluster gauge (affine calibration fit).
pub fn encode_temp(temp_c: i32) -> CanFrame {
    let mut payload = [0u8; 8];
    let byte = (temp_c as f32 + TEMP_GAUGE_OFFSET) / TEMP_GAUGE_SCALE;
    payload[1] = byte.clamp(0.0, 255.0) as u8;
    CanFrame::new(CLUSTER_TEMP_ID, payload)
}

// =============================================================================
// Vehicle speed for the ECM (0x280 / 0x284)
// =============================================================================

/// Speed frames for the ECM; both identifiers carry the same payload on
/// this protocol revision, with the encoded byte at a revision-dependent
/// offset.
pub fn encode_speed(speed_kph: f32) -> [CanFrame; 2] {
    let mut payload = [0u8; 8];
    let byte = SPEED_GAUGE_SLOPE * speed_kph + SPEED_GAUGE_OFFSET;
    payload[SPEED_PAYLOAD_OFFSET] = byte.clamp(0.0, 255.0) as u8;
    [
        CanFrame::new(ECM_SPEED_IDS[0], payload),
        CanFrame::new(ECM_SPEED_IDS[1], payload),
    ]
}

// =============================================================================
// Warning lights and consumption (0x545)
// =============================================================================

/// Misc status frame: warning light code, little-endian fuel consumption
/// counter, overtemperature lamp flag.
pub fn encode_misc_status(light_code: u8, consumption: u16, overtemp: bool) -> CanFrame {
    let mut payload = [0u8; 8];
    payload[0] = light_code;
    payload[1] = (consumption & 0xFF) as u8;
    payload[2] = (consumption >> 8) as u8;
    payload[3] = if overtemp { OVERTEMP_LIGHT_FLAG } else { 0 };
    CanFrame::new(CLUSTER_MISC_ID, payload)
}

// =============================================================================
// Diagnostic requests to the ECM (0x7DF)
// =============================================================================

/// Session setup payloads that put the ECM in a state where it answers
/// parameter queries. Sent once after the first live coolant broadcast
/// proves the ECM is awake.
pub fn ecm_session_setup() -> [CanFrame; 2] {
    [
        CanFrame::new(ECM_DIAG_REQUEST_ID, [0x02, 0x10, 0x81, 0, 0, 0, 0, 0]),
        CanFrame::new(ECM_DIAG_REQUEST_ID, [0x02, 0x10, 0xC0, 0, 0, 0, 0, 0]),
    ]
}

/// Read-by-PID query frame.
const fn request_pid(pid_hi: u8, pid_lo: u8) -> CanFrame {
    CanFrame::new(ECM_DIAG_REQUEST_ID, [0x03, 0x22, pid_hi, pid_lo, 0, 0, 0, 0])
}

pub const fn request_oil_temp() -> CanFrame {
    request_pid(0x11, 0x1F)
}

pub const fn request_battery_voltage() -> CanFrame {
    request_pid(0x11, 0x03)
}

pub const fn request_gas_pedal() -> CanFrame {
    request_pid(0x12, 0x0D)
}

pub const fn request_afr_bank1() -> CanFrame {
    request_pid(0x12, 0x25)
}

pub const fn request_afr_bank2() -> CanFrame {
    request_pid(0x12, 0x26)
}

pub const fn request_alpha_bank1() -> CanFrame {
    request_pid(0x11, 0x23)
}

pub const fn request_alpha_bank2() -> CanFrame {
    request_pid(0x11, 0x24)
}

pub const fn request_intake_air_temp() -> CanFrame {
    request_pid(0x11, 0x06)
}

/// Fault scan request; the response drives the check engine light.
pub const fn request_fault_scan() -> CanFrame {
    CanFrame::new(ECM_DIAG_REQUEST_ID, [0x03, 0x17, 0xFF, 0, 0, 0, 0, 0])
}

/// Tester-present keepalive so the diagnostic session stays open between
/// queries.
pub const fn diagnostic_keepalive() -> CanFrame {
    CanFrame::new(ECM_DIAG_REQUEST_ID, [0x02, 0x3E, 0x00, 0, 0, 0, 0, 0])
}
