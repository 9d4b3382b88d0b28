//! Analog gauge sender conversion.
//!
//! Three sender families hang off the ADC inputs: 0.5-4.5 V pressure
//! transducers (oil, fuel, crankcase), resistive NTC temperature senders
//! behind a fixed divider, and the crankcase transducer doubling as a
//! vacuum gauge against an atmospheric zero captured at boot with the
//! engine off.

use crate::config::calibration::{
    ADC_FULL_SCALE,
    ADC_REF_VOLTS,
    PRESSURE_PSI_OFFSET,
    PRESSURE_PSI_PER_VOLT,
    STEINHART_A,
    STEINHART_B,
    STEINHART_C,
    THERMISTOR_DIVIDER_OHMS,
};

/// Raw 10-bit ADC reading to volts at the pin.
pub fn adc_to_volts(raw: u16) -> f32 {
    (raw as f32 / ADC_FULL_SCALE) * ADC_REF_VOLTS
}

fn pressure_psi_unclamped(volts: f32) -> f32 {
    PRESSURE_PSI_PER_VOLT * volts + PRESSURE_PSI_OFFSET
}

/// Absolute-reading pressure transducer to gauge PSI. Readings below the
/// transducer's 0.5 V floor are sensor offset error, not negative
/// pressure, and clamp to zero.
pub fn pressure_psi(volts: f32) -> f32 {
    pressure_psi_unclamped(volts).max(0.0)
}

// =============================================================================
// Crankcase vacuum
// =============================================================================

/// Crankcase pressure relative to atmosphere.
///
/// The transducer reads absolute pressure, but the interesting number is
/// the delta against the outside air: negative under a healthy crank
/// scavenge, climbing toward zero (and beyond) as blow-by builds. The
/// zero point is averaged from readings taken before the engine starts.
pub struct VacuumGauge {
    zero_sum_psi: f32,
    zero_samples: u32,
}

impl VacuumGauge {
    pub const fn new() -> Self {
        Self {
            zero_sum_psi: 0.0,
            zero_samples: 0,
        }
    }

    /// Fold one engine-off reading into the atmospheric zero.
    pub fn add_zero_sample(&mut self, volts: f32) {
        self.zero_sum_psi += pressure_psi_unclamped(volts);
        self.zero_samples += 1;
    }

    pub const fn is_zeroed(&self) -> bool {
        self.zero_samples > 0
    }

    fn zero_psi(&self) -> f32 {
        if self.zero_samples == 0 {
            0.0
        } else {
            self.zero_sum_psi / self.zero_samples as f32
        }
    }

    /// Gauge pressure relative to the captured zero. Negative is vacuum.
    pub fn vacuum_psi(&self, volts: f32) -> f32 {
        pressure_psi_unclamped(volts) - self.zero_psi()
    }
}

impl Default for VacuumGauge {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Resistive temperature senders
// =============================================================================

/// NTC sender temperature via the Steinhart-Hart equation.
///
/// The sender sits on the low side of a divider fed from the ADC
/// reference, so the reading maps straight to sender resistance. Returns
/// `None` on rail readings: 0 means a shorted sender or unplugged input,
/// full scale an open circuit, and both would otherwise divide by zero.
pub fn thermistor_temp_c(raw: u16) -> Option<f32> {
    let raw_f = raw as f32;
    if raw == 0 || raw_f >= ADC_FULL_SCALE {
        return None;
    }
    let resistance = THERMISTOR_DIVIDER_OHMS * raw_f / (ADC_FULL_SCALE - raw_f);

    let ln_r = micromath::F32(resistance).ln().0;
    let inv_kelvin = STEINHART_A + STEINHART_B * ln_r + STEINHART_C * ln_r * ln_r * ln_r;
    Some(1.0 / inv_kelvin - 273.15)
}
