//! Staleness-tracked engine parameter store.
//!
//! Every decoded value carries its last-update timestamp. Readers ask for a
//! value together with the maximum age they are willing to trust; anything
//! older reads as the default (zero), which downstream consumers treat as
//! "sensor disconnected / ECM not answering". Staleness is evaluated on
//! every read, per field, because different signals earn different trust:
//! a ~100 ms broadcast stays credible for seconds, a polled diagnostic
//! response goes stale within one request cycle.

use crate::config::thresholds::{
    CEL_BOOT_OVERRIDE_MS,
    LIGHT_CODE_CHECK_ENGINE,
    STALE_BROADCAST_MS,
    STALE_POLLED_MS,
    STALE_WHEEL_SPEED_MS,
};

/// One tracked value plus the time it was last decoded from the bus.
#[derive(Clone, Copy, Default, Debug)]
pub struct Tracked<T> {
    value: T,
    updated_at_ms: Option<u64>,
}

impl<T: Copy + Default> Tracked<T> {
    pub fn new() -> Self {
        Self {
            value: T::default(),
            updated_at_ms: None,
        }
    }

    /// Record a freshly decoded value.
    pub fn update(&mut self, value: T, now_ms: u64) {
        self.value = value;
        self.updated_at_ms = Some(now_ms);
    }

    /// The value if it is younger than `max_age_ms`, else the default.
    pub fn get(&self, now_ms: u64, max_age_ms: u64) -> T {
        match self.updated_at_ms {
            Some(at) if now_ms.saturating_sub(at) <= max_age_ms => self.value,
            _ => T::default(),
        }
    }

    /// The stored value regardless of age.
    pub fn raw(&self) -> T {
        self.value
    }

    /// Whether the field has ever been updated.
    pub const fn has_value(&self) -> bool {
        self.updated_at_ms.is_some()
    }
}

/// All externally sourced engine state, one tracked field per decoded
/// signal.
pub struct EngineParams {
    boot_ms: u64,

    // Broadcast continuously by the ECM
    pub coolant_temp_c: Tracked<i32>,

    // Returned from diagnostic queries
    pub oil_temp_c: Tracked<i32>,
    pub battery_volts: Tracked<f32>,
    pub gas_pedal_percent: Tracked<f32>,
    pub afr_bank1: Tracked<f32>,
    pub afr_bank2: Tracked<f32>,
    pub alpha_percent_bank1: Tracked<i32>,
    pub alpha_percent_bank2: Tracked<i32>,
    pub intake_air_temp_c: Tracked<i32>,
    pub check_engine_code: Tracked<u8>,

    // Decoded from the chassis bus wheel speed broadcast
    pub speed_front_kph: Tracked<f32>,
    pub speed_rear_kph: Tracked<f32>,
    pub rear_speed_variation_percent: Tracked<f32>,
}

impl EngineParams {
    pub fn new(boot_ms: u64) -> Self {
        Self {
            boot_ms,
            coolant_temp_c: Tracked::new(),
            oil_temp_c: Tracked::new(),
            battery_volts: Tracked::new(),
            gas_pedal_percent: Tracked::new(),
            afr_bank1: Tracked::new(),
            afr_bank2: Tracked::new(),
            alpha_percent_bank1: Tracked::new(),
            alpha_percent_bank2: Tracked::new(),
            intake_air_temp_c: Tracked::new(),
            check_engine_code: Tracked::new(),
            speed_front_kph: Tracked::new(),
            speed_rear_kph: Tracked::new(),
            rear_speed_variation_percent: Tracked::new(),
        }
    }

    // Convenience getters applying each field's trust window.

    pub fn coolant(&self, now_ms: u64) -> i32 {
        self.coolant_temp_c.get(now_ms, STALE_BROADCAST_MS)
    }

    pub fn oil_temp(&self, now_ms: u64) -> i32 {
        self.oil_temp_c.get(now_ms, STALE_POLLED_MS)
    }

    pub fn battery(&self, now_ms: u64) -> f32 {
        self.battery_volts.get(now_ms, STALE_POLLED_MS)
    }

    pub fn pedal(&self, now_ms: u64) -> f32 {
        self.gas_pedal_percent.get(now_ms, STALE_POLLED_MS)
    }

    pub fn afr(&self, now_ms: u64) -> (f32, f32) {
        (
            self.afr_bank1.get(now_ms, STALE_POLLED_MS),
            self.afr_bank2.get(now_ms, STALE_POLLED_MS),
        )
    }

    pub fn speed_front(&self, now_ms: u64) -> f32 {
        self.speed_front_kph.get(now_ms, STALE_WHEEL_SPEED_MS)
    }

    pub fn speed_rear(&self, now_ms: u64) -> f32 {
        self.speed_rear_kph.get(now_ms, STALE_WHEEL_SPEED_MS)
    }

    pub fn rear_speed_variation(&self, now_ms: u64) -> f32 {
        self.rear_speed_variation_percent.get(now_ms, STALE_WHEEL_SPEED_MS)
    }

    /// Check engine light state for the cluster.
    ///
    /// For the first seconds after boot this reads forced-on regardless of
    /// bus traffic: a lit lamp is the only visible proof the gateway came up
    /// before the ECM starts answering fault scans. Deliberate policy, not a
    /// decoding artifact.
    pub fn check_engine_state(&self, now_ms: u64) -> u8 {
        if now_ms.saturating_sub(self.boot_ms) < CEL_BOOT_OVERRIDE_MS {
            return LIGHT_CODE_CHECK_ENGINE;
        }
        self.check_engine_code.get(now_ms, STALE_BROADCAST_MS)
    }
}
