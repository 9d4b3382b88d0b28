//! Empirically fitted calibration data.
//!
//! Every constant here was measured against the physical hardware it drives
//! (the E46 cluster gauges, the UEGO oxygen sensors, the gauge senders) and
//! cannot be re-derived from first principles. Treat as injected
//! configuration: swapping target vehicle or cluster means swapping these
//! values, not the code that consumes them.

use core::f32::consts::PI;

// =============================================================================
// RPM signal input
// =============================================================================

/// Pulses on the tach signal wire per crank revolution.
pub const RPM_PULSES_PER_REVOLUTION: u32 = 3;

// =============================================================================
// RPM gauge encoding (cluster frame 0x316)
// =============================================================================

/// The cluster expects RPM multiplied by a conversion factor before byte
/// packing, and the factor itself drifts with RPM (the gauge is not linear).
/// Two representations of the measured curve are supported: the fitted
/// linear formula, and a raw piecewise table of (RPM, factor) measurements
/// with clamping outside the measured range.
#[derive(Clone, Copy)]
pub enum RpmFactorCurve {
    /// Least-squares fit over the measured points.
    LinearFit { slope: f32, intercept: f32 },
    /// Measured (RPM, factor) points, ascending by RPM, linearly
    /// interpolated and clamped at both ends.
    Table(&'static [(f32, f32)]),
}

impl RpmFactorCurve {
    /// Conversion factor for the given RPM.
    pub fn factor_at(&self, rpm: u32) -> f32 {
        let rpm = rpm as f32;
        match self {
            Self::LinearFit { slope, intercept } => slope * rpm + intercept,
            Self::Table(points) => {
                let first = points[0];
                let last = points[points.len() - 1];
                if rpm <= first.0 {
                    return first.1;
                }
                if rpm >= last.0 {
                    return last.1;
                }
                for pair in points.windows(2) {
                    let (lo, hi) = (pair[0], pair[1]);
                    if rpm >= lo.0 && rpm <= hi.0 {
                        let frac = (rpm - lo.0) / (hi.0 - lo.0);
                        return lo.1 + (hi.1 - lo.1) * frac;
                    }
                }
                last.1
            }
        }
    }
}

impl Default for RpmFactorCurve {
    fn default() -> Self {
        Self::LinearFit {
            slope: -0.000_055_401_020_408_163_7,
            intercept: 6.700_612_244_897_96,
        }
    }
}

/// The measured points behind the fitted formula, kept for targets where the
/// fit drifts too far from the gauge at the extremes.
pub const RPM_FACTOR_TABLE: [(f32, f32); 6] = [
    (1000.0, 6.65),
    (2000.0, 6.59),
    (3000.0, 6.53),
    (4000.0, 6.48),
    (5000.0, 6.42),
    (6500.0, 6.34),
];

// =============================================================================
// Temperature and speed gauge encodings (affine fits)
// =============================================================================

/// Coolant gauge byte: `(temp_c + TEMP_GAUGE_OFFSET) / TEMP_GAUGE_SCALE`.
pub const TEMP_GAUGE_OFFSET: f32 = 48.373;
pub const TEMP_GAUGE_SCALE: f32 = 0.75;

/// Speed byte for the ECM: `SPEED_GAUGE_SLOPE * kph + SPEED_GAUGE_OFFSET`.
pub const SPEED_GAUGE_SLOPE: f32 = 0.3903;
pub const SPEED_GAUGE_OFFSET: f32 = 0.5144;

/// Payload offset of the speed byte. Earlier ECM protocol revisions read
/// byte 0 here; the fitted encoding above was measured against revision B
/// which reads byte 4.
pub const SPEED_PAYLOAD_OFFSET: usize = 4;

// =============================================================================
// Diagnostic response scaling
// =============================================================================

/// Two-byte diagnostic values are sensor voltages scaled by 200.
pub const DIAG_RAW_TO_VOLTS: f32 = 200.0;

/// Gas pedal sender voltage at fully released / fully pressed.
pub const PEDAL_MIN_VOLTS: f32 = 0.65;
pub const PEDAL_MAX_VOLTS: f32 = 4.85;

const _: () = assert!(PEDAL_MIN_VOLTS < PEDAL_MAX_VOLTS);

// =============================================================================
// Air/fuel ratio lookup table
// =============================================================================

/// AFR values scaled by 100, one entry per 0.1 V step of sensor voltage from
/// 0.0 V to 4.9 V. Scaling by 100 on both axes keeps the breakpoints exact
/// instead of drowning them in float rounding. Voltages below 0 V clamp to
/// the first entry, at or above 4.9 V to the last.
pub const AFR_TABLE: [u16; 50] = [
    1000, 1015, 1030, 1045, 1060, 1075, 1090, 1105, 1120, 1135, // 0.0 - 0.9 V
    1150, 1167, 1184, 1201, 1218, 1235, 1252, 1269, 1286, 1303, // 1.0 - 1.9 V
    1320, 1350, 1380, 1410, 1440, // 2.0 - 2.4 V
    1470, 1503, 1536, 1569, 1602, 1635, 1668, 1701, 1734, 1767, // 2.5 - 3.4 V
    1800, 1914, 2028, 2142, 2256, 2370, 2485, // 3.5 - 4.1 V
    2600, 3086, 3572, 4058, 4544, 5030, 5515, // 4.2 - 4.8 V
    6000, // 4.9 V
];

/// Table key spacing in voltage x100 units (0.1 V).
pub const AFR_TABLE_STEP_VX100: u32 = 10;

/// Clamp ratios outside the table.
pub const AFR_MIN_RATIO: f32 = 10.0;
pub const AFR_MAX_RATIO: f32 = 60.0;

const _: () = assert!(AFR_TABLE[0] == 1000);
const _: () = assert!(AFR_TABLE[AFR_TABLE.len() - 1] == 6000);

// =============================================================================
// Wheel speed decoding
// =============================================================================

/// Correction applied to the raw 12-bit wheel speed fields, measured against
/// a GPS reference. Unity on the current tire set.
pub const WHEEL_SPEED_CORRECTION: f32 = 1.0;

// =============================================================================
// Analog gauge senders
// =============================================================================

/// 10-bit ADC against a 5 V reference.
pub const ADC_FULL_SCALE: f32 = 1023.0;
pub const ADC_REF_VOLTS: f32 = 5.0;

/// Pressure transducer: `psi = PRESSURE_PSI_PER_VOLT * volts + PRESSURE_PSI_OFFSET`.
pub const PRESSURE_PSI_PER_VOLT: f32 = 36.25;
pub const PRESSURE_PSI_OFFSET: f32 = -18.125;

/// Divider resistor in series with the resistive temperature senders.
pub const THERMISTOR_DIVIDER_OHMS: f32 = 1500.0;

/// Steinhart-Hart coefficients fitted from sample readings of the senders.
pub const STEINHART_A: f32 = 0.966_008_9e-3;
pub const STEINHART_B: f32 = 2.385_522_6e-4;
pub const STEINHART_C: f32 = 3.073_243_4e-7;

// =============================================================================
// Drivetrain geometry (gear estimation)
// =============================================================================

/// Tire: 255/35R18.
pub const TIRE_WIDTH_MM: f32 = 255.0;
pub const TIRE_ASPECT_PERCENT: f32 = 35.0;
pub const WHEEL_DIAMETER_INCHES: f32 = 18.0;

/// Rolling circumference of the driven wheels in millimetres.
pub const fn rolling_circumference_mm() -> f32 {
    PI * ((WHEEL_DIAMETER_INCHES * 25.4) + 2.0 * (TIRE_WIDTH_MM * TIRE_ASPECT_PERCENT / 100.0))
}

/// Differential final drive ratio.
pub const FINAL_DRIVE_RATIO: f32 = 3.38;

/// Gearbox ratios, first to sixth.
pub const GEAR_RATIOS: [f32; 6] = [3.794, 2.324, 1.624, 1.271, 1.0, 0.794];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_afr_table_is_monotonic() {
        for pair in AFR_TABLE.windows(2) {
            assert!(pair[0] < pair[1], "table must increase: {} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rpm_factor_linear_fit() {
        let curve = RpmFactorCurve::default();
        // Fit passes close to the measured points
        let factor = curve.factor_at(1000);
        assert!((factor - 6.645).abs() < 0.01);
        let factor = curve.factor_at(6500);
        assert!((factor - 6.34).abs() < 0.01);
    }

    #[test]
    fn test_rpm_factor_table_clamps_outside_range() {
        let curve = RpmFactorCurve::Table(&RPM_FACTOR_TABLE);
        assert_eq!(curve.factor_at(0), 6.65);
        assert_eq!(curve.factor_at(500), 6.65);
        assert_eq!(curve.factor_at(9000), 6.34);
    }

    #[test]
    fn test_rpm_factor_table_interpolates() {
        let curve = RpmFactorCurve::Table(&RPM_FACTOR_TABLE);
        // Halfway between 1000 (6.65) and 2000 (6.59)
        let factor = curve.factor_at(1500);
        assert!((factor - 6.62).abs() < 0.001);
        // Exactly on a breakpoint
        assert_eq!(curve.factor_at(3000), 6.53);
    }

    #[test]
    fn test_rolling_circumference() {
        // 255/35R18 rolls just over 2.0 m
        let circ = rolling_circumference_mm();
        assert!(circ > 1900.0 && circ < 2100.0, "got {circ}");
    }
}
