//! Gear estimation from engine and wheel speed.
//!
//! There is no gear position sensor; the selected gear is inferred by
//! comparing the driveshaft speed implied by the rear wheels against the
//! driveshaft speed each gearbox ratio would produce at the current engine
//! RPM, and picking the nearest match. This is a classifier over a pure
//! function of the inputs, not a state machine; the previous estimate is
//! kept only to detect changes for logging.

use crate::config::calibration::{FINAL_DRIVE_RATIO, GEAR_RATIOS, rolling_circumference_mm};

/// A detected gear change, surfaced for logging.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GearChange {
    pub from: u8,
    pub to: u8,
}

/// Nearest-ratio gear classifier. Gear 0 means neutral, clutch
/// disengaged, or unknown.
pub struct GearEstimator {
    previous_gear: u8,
}

impl GearEstimator {
    pub const fn new() -> Self {
        Self { previous_gear: 0 }
    }

    /// Estimate the current gear, reporting a change when the classifier
    /// flips.
    pub fn estimate(
        &mut self,
        engine_rpm: u32,
        rear_wheel_speed_kph: f32,
        clutch_pressed: bool,
        in_neutral: bool,
    ) -> (u8, Option<GearChange>) {
        let gear = match_gear(engine_rpm, rear_wheel_speed_kph, clutch_pressed, in_neutral);
        let change = if gear != self.previous_gear {
            let change = GearChange {
                from: self.previous_gear,
                to: gear,
            };
            self.previous_gear = gear;
            Some(change)
        } else {
            None
        };
        (gear, change)
    }

    pub const fn current(&self) -> u8 {
        self.previous_gear
    }
}

impl Default for GearEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// The classifier itself: a pure function of the inputs.
pub fn match_gear(engine_rpm: u32, rear_wheel_speed_kph: f32, clutch_pressed: bool, in_neutral: bool) -> u8 {
    if clutch_pressed || in_neutral || rear_wheel_speed_kph <= 0.0 || engine_rpm == 0 {
        return 0;
    }

    // km/h -> wheel revolutions per minute via the rolling circumference
    let wheel_rpm = (rear_wheel_speed_kph * 1000.0 * 1000.0 / 60.0) / rolling_circumference_mm();
    let driveshaft_rpm = wheel_rpm * FINAL_DRIVE_RATIO;

    // Nearest ratio wins; on an exact tie, the lowest gear found first
    let mut best_gear = 1u8;
    let mut best_delta = f32::MAX;
    for (index, ratio) in GEAR_RATIOS.iter().enumerate() {
        let implied_driveshaft_rpm = engine_rpm as f32 / ratio;
        let delta = if implied_driveshaft_rpm > driveshaft_rpm {
            implied_driveshaft_rpm - driveshaft_rpm
        } else {
            driveshaft_rpm - implied_driveshaft_rpm
        };
        if delta < best_delta {
            best_delta = delta;
            best_gear = (index + 1) as u8;
        }
    }
    best_gear
}
