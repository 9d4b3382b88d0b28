//! Centralized threshold and cadence configuration.
//!
//! All thresholds are compile-time constants with validation assertions.
//! If thresholds are configured incorrectly (e.g., a low limit above its
//! high limit), compilation will fail with a clear error.

// =============================================================================
// Alarm thresholds
// =============================================================================

/// ECM-reported oil temperature above this sounds the alarm.
pub const ALARM_OIL_TEMP_C: i32 = 120;

/// Coolant temperature above this sounds the alarm and lights the red
/// overtemperature lamp on the cluster temp gauge.
pub const ALARM_COOLANT_TEMP_C: i32 = 110;

/// Oil pressure below this sounds the alarm.
pub const ALARM_OIL_PRESSURE_PSI: f32 = 10.0;

/// Crankcase vacuum more negative than this sounds the alarm.
pub const ALARM_CRANKCASE_VACUUM_PSI: f32 = -5.0;

/// Fuel pressure band; outside it sounds the alarm.
pub const ALARM_FUEL_PRESSURE_LOW_PSI: f32 = 48.0;
pub const ALARM_FUEL_PRESSURE_HIGH_PSI: f32 = 57.0;

/// Buzzer tone while the alarm is active.
pub const ALARM_TONE_HZ: u16 = 4000;

/// A breach must persist this long before the first sounding of an episode.
pub const ALARM_DEBOUNCE_MS: u64 = 2000;

const _: () = assert!(ALARM_FUEL_PRESSURE_LOW_PSI < ALARM_FUEL_PRESSURE_HIGH_PSI);

// =============================================================================
// Radiator fan curve
// =============================================================================

/// Coolant temperature where the fan starts.
pub const FAN_TEMP_MIN_C: i32 = 85;

/// Coolant temperature where the fan reaches 100%.
pub const FAN_TEMP_MAX_C: i32 = 100;

/// Minimum duty once the fan runs at all; below this the motor stalls
/// inaudibly instead of moving air.
pub const FAN_FLOOR_PERCENT: u8 = 10;

/// RPM at or below which the engine counts as not running. The fan and the
/// alarm are both suppressed against a stopped engine.
pub const ENGINE_RUNNING_RPM: u32 = 500;

const _: () = assert!(FAN_TEMP_MIN_C < FAN_TEMP_MAX_C);
const _: () = assert!(FAN_TEMP_MAX_C <= ALARM_COOLANT_TEMP_C);
const _: () = assert!(FAN_FLOOR_PERCENT < 100);

// =============================================================================
// RPM measurement
// =============================================================================

/// Above this RPM the pulse window is polled fast (plenty of pulses per
/// window); below it, slow (few pulses per window means high quantization
/// error at short windows).
pub const RPM_POLL_FAST_THRESHOLD: u32 = 1500;
pub const RPM_POLL_FAST_MS: u32 = 50;
pub const RPM_POLL_SLOW_MS: u32 = 200;

/// A jump larger than this between consecutive RPM readings is electrical
/// noise, not the engine. The previous cluster payload is retained.
pub const RPM_JUMP_LIMIT: u32 = 750;

const _: () = assert!(RPM_POLL_FAST_MS < RPM_POLL_SLOW_MS);

// =============================================================================
// Parameter staleness windows
// =============================================================================

/// Values the ECM broadcasts continuously (coolant temperature).
pub const STALE_BROADCAST_MS: u64 = 10_000;

/// Values that only arrive as responses to our diagnostic queries; trusted
/// briefly since they are request-driven.
pub const STALE_POLLED_MS: u64 = 1_000;

/// Wheel speed broadcasts from the chassis bus.
pub const STALE_WHEEL_SPEED_MS: u64 = 1_000;

/// The check engine light reads forced-on for this long after boot so the
/// cluster shows proof of life even before the ECM reports real status.
pub const CEL_BOOT_OVERRIDE_MS: u64 = 6_000;

const _: () = assert!(STALE_POLLED_MS < STALE_BROADCAST_MS);

// =============================================================================
// Misc status frame codes (cluster frame 0x545)
// =============================================================================

/// Light-state codes for byte 0. EML is the separate electronic engine
/// management warning lamp; both lamps is the sum of the two codes.
pub const LIGHT_CODE_NONE: u8 = 0;
pub const LIGHT_CODE_CHECK_ENGINE: u8 = 2;
pub const LIGHT_CODE_EML: u8 = 16;
pub const LIGHT_CODE_BOTH: u8 = 18;

/// Byte 3 flag that lights the red overtemperature lamp.
pub const OVERTEMP_LIGHT_FLAG: u8 = 8;

const _: () = assert!(LIGHT_CODE_BOTH == LIGHT_CODE_CHECK_ENGINE + LIGHT_CODE_EML);

// =============================================================================
// Performance capture
// =============================================================================

/// Acceleration windows tracked concurrently (km/h).
pub const PERF_WINDOW_0_TO_50: (f32, f32) = (0.0, 50.0);
pub const PERF_WINDOW_0_TO_100: (f32, f32) = (0.0, 100.0);
pub const PERF_WINDOW_80_TO_120: (f32, f32) = (80.0, 120.0);

/// Trace ("dyno") capture speed bounds (km/h).
pub const TRACE_START_KPH: f32 = 25.0;
pub const TRACE_END_KPH: f32 = 100.0;

/// Bounded sample storage for one trace run.
pub const TRACE_CAPACITY: usize = 600;

/// Minimum spacing between trace samples.
pub const TRACE_SAMPLE_MS: u64 = 20;

/// A run that has not completed after this long is abandoned.
pub const TRACE_CUTOFF_MS: u64 = 10_000;

const _: () = assert!(TRACE_START_KPH < TRACE_END_KPH);

// =============================================================================
// Task cadences (milliseconds)
// =============================================================================

// High frequency
pub const TASK_CAN_WRITE_MISC_MS: u32 = 10;
pub const TASK_CAN_WRITE_RPM_MS: u32 = 10;
pub const TASK_CAN_WRITE_TEMP_MS: u32 = 10;
pub const TASK_CAN_WRITE_SPEED_MS: u32 = 20;
pub const TASK_REQUEST_AFR_MS: u32 = 50;

// Medium frequency
pub const TASK_ALARM_CHECK_MS: u32 = 500;
pub const TASK_REQUEST_PEDAL_MS: u32 = 100;
pub const TASK_GAUGE_FAST_MS: u32 = 100;
pub const TASK_GEAR_ESTIMATE_MS: u32 = 100;
pub const TASK_PUBLISH_FAST_MS: u32 = 100;

// Low frequency
pub const TASK_REQUEST_SLOW_MS: u32 = 1_000;
pub const TASK_KEEPALIVE_MS: u32 = 1_000;
pub const TASK_GAUGE_FUEL_MS: u32 = 1_000;
pub const TASK_PUBLISH_SLOW_MS: u32 = 1_000;
pub const TASK_FAN_OUTPUT_MS: u32 = 5_000;
pub const TASK_GAUGE_TEMPS_MS: u32 = 5_000;
pub const TASK_REQUEST_FAULTS_MS: u32 = 5_000;
pub const TASK_LOOP_STATS_MS: u32 = 5_000;
