//! The gateway loop.
//!
//! One `tick` per pass through the main loop: decode whatever arrived on
//! either bus, then poll every periodic task timer and run the tasks that
//! are due. All time comes in from the caller, all side effects go out
//! through the [`crate::io`] traits, so the whole loop runs under the host
//! test harness with mock collaborators.

use crate::alarm::{AlarmController, AlarmMetrics};
use crate::can::encode::{
    RpmFrameEncoder,
    diagnostic_keepalive,
    ecm_session_setup,
    encode_misc_status,
    encode_speed,
    encode_temp,
    request_afr_bank1,
    request_afr_bank2,
    request_alpha_bank1,
    request_alpha_bank2,
    request_battery_voltage,
    request_fault_scan,
    request_gas_pedal,
    request_intake_air_temp,
    request_oil_temp,
};
use crate::can::{CanFrame, decode_chassis_frame, decode_ecm_frame};
use crate::config::calibration::RpmFactorCurve;
use crate::config::thresholds::{
    ALARM_COOLANT_TEMP_C,
    ENGINE_RUNNING_RPM,
    RPM_POLL_SLOW_MS,
    TASK_ALARM_CHECK_MS,
    TASK_CAN_WRITE_MISC_MS,
    TASK_CAN_WRITE_RPM_MS,
    TASK_CAN_WRITE_SPEED_MS,
    TASK_CAN_WRITE_TEMP_MS,
    TASK_FAN_OUTPUT_MS,
    TASK_GAUGE_FAST_MS,
    TASK_GAUGE_FUEL_MS,
    TASK_GAUGE_TEMPS_MS,
    TASK_GEAR_ESTIMATE_MS,
    TASK_KEEPALIVE_MS,
    TASK_LOOP_STATS_MS,
    TASK_PUBLISH_FAST_MS,
    TASK_PUBLISH_SLOW_MS,
    TASK_REQUEST_AFR_MS,
    TASK_REQUEST_FAULTS_MS,
    TASK_REQUEST_PEDAL_MS,
    TASK_REQUEST_SLOW_MS,
};
use crate::fan::FanController;
use crate::gauges::{VacuumGauge, adc_to_volts, pressure_psi, thermistor_temp_c};
use crate::gear::GearEstimator;
use crate::io::{CanTx, MetricSink, MetricValue, PwmSink, ToneSink};
use crate::params::EngineParams;
use crate::perf::{PerformanceTimer, TraceRecorder, TraceSink};
use crate::pulse::{PulseCounter, RpmCalculator, poll_interval_for};
use crate::scheduler::PeriodicTimer;

/// Engine-off readings folded into the crankcase atmospheric zero before
/// the first start.
const VACUUM_ZERO_SAMPLES: u8 = 8;

// =============================================================================
// Task timers
// =============================================================================

/// Every periodic task in the loop, grouped by cadence. The RPM poll timer
/// is the one exception to fixed cadences: the loop re-tunes its period to
/// the measured RPM after every computation.
pub struct TaskTimers {
    rpm_poll: PeriodicTimer,

    // High frequency
    can_write_rpm: PeriodicTimer,
    can_write_temp: PeriodicTimer,
    can_write_misc: PeriodicTimer,
    can_write_speed: PeriodicTimer,
    request_afr: PeriodicTimer,

    // Medium frequency
    request_pedal: PeriodicTimer,
    gauge_fast: PeriodicTimer,
    gear_estimate: PeriodicTimer,
    alarm_check: PeriodicTimer,
    publish_fast: PeriodicTimer,

    // Low frequency
    request_slow: PeriodicTimer,
    request_faults: PeriodicTimer,
    keepalive: PeriodicTimer,
    gauge_fuel: PeriodicTimer,
    gauge_temps: PeriodicTimer,
    fan_output: PeriodicTimer,
    publish_slow: PeriodicTimer,
    loop_stats: PeriodicTimer,
}

impl TaskTimers {
    pub const fn new() -> Self {
        Self {
            rpm_poll: PeriodicTimer::new(RPM_POLL_SLOW_MS),
            can_write_rpm: PeriodicTimer::new(TASK_CAN_WRITE_RPM_MS),
            can_write_temp: PeriodicTimer::new(TASK_CAN_WRITE_TEMP_MS),
            can_write_misc: PeriodicTimer::new(TASK_CAN_WRITE_MISC_MS),
            can_write_speed: PeriodicTimer::new(TASK_CAN_WRITE_SPEED_MS),
            request_afr: PeriodicTimer::new(TASK_REQUEST_AFR_MS),
            request_pedal: PeriodicTimer::new(TASK_REQUEST_PEDAL_MS),
            gauge_fast: PeriodicTimer::new(TASK_GAUGE_FAST_MS),
            gear_estimate: PeriodicTimer::new(TASK_GEAR_ESTIMATE_MS),
            alarm_check: PeriodicTimer::new(TASK_ALARM_CHECK_MS),
            publish_fast: PeriodicTimer::new(TASK_PUBLISH_FAST_MS),
            request_slow: PeriodicTimer::new(TASK_REQUEST_SLOW_MS),
            request_faults: PeriodicTimer::new(TASK_REQUEST_FAULTS_MS),
            keepalive: PeriodicTimer::new(TASK_KEEPALIVE_MS),
            gauge_fuel: PeriodicTimer::new(TASK_GAUGE_FUEL_MS),
            gauge_temps: PeriodicTimer::new(TASK_GAUGE_TEMPS_MS),
            fan_output: PeriodicTimer::new(TASK_FAN_OUTPUT_MS),
            publish_slow: PeriodicTimer::new(TASK_PUBLISH_SLOW_MS),
            loop_stats: PeriodicTimer::new(TASK_LOOP_STATS_MS),
        }
    }
}

impl Default for TaskTimers {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tick inputs and collaborators
// =============================================================================

/// Averaged raw ADC readings for the analog gauge senders.
#[derive(Clone, Copy, Default, Debug)]
pub struct AnalogReadings {
    pub oil_pressure_raw: u16,
    pub fuel_pressure_raw: u16,
    pub crankcase_raw: u16,
    pub oil_temp_raw: u16,
    pub radiator_temp_raw: u16,
}

/// Everything the loop consumes on one pass.
pub struct TickInputs<'a> {
    pub now_ms: u64,
    /// The tach pulse counter, shared with the edge interrupt.
    pub pulses: &'a PulseCounter,
    /// Frames received from the donor ECM bus since the last tick.
    pub donor_frames: &'a [CanFrame],
    /// Frames received from the chassis bus since the last tick.
    pub chassis_frames: &'a [CanFrame],
    pub clutch_pressed: bool,
    pub in_neutral: bool,
    pub analog: AnalogReadings,
}

/// Everything the loop drives on one pass.
pub struct GatewayIo<'a, D, C, M, T, P, S> {
    /// Transmit side of the donor ECM bus.
    pub donor_tx: &'a mut D,
    /// Transmit side of the chassis/cluster bus.
    pub cluster_tx: &'a mut C,
    pub metrics: &'a mut M,
    pub tone: &'a mut T,
    pub pwm: &'a mut P,
    pub trace: &'a mut S,
}

fn send(tx: &mut impl CanTx, frame: &CanFrame, tx_errors: &mut u32) {
    if tx.send(frame).is_err() {
        *tx_errors += 1;
    }
}

// =============================================================================
// The gateway
// =============================================================================

/// All loop state. Construct once, then call [`Gateway::tick`] forever.
pub struct Gateway {
    timers: TaskTimers,
    params: EngineParams,
    rpm_calc: RpmCalculator,
    rpm_encoder: RpmFrameEncoder,
    gear: GearEstimator,
    fan: FanController,
    alarm: AlarmController,
    perf: PerformanceTimer,
    trace: TraceRecorder,
    vacuum: VacuumGauge,
    vacuum_zero_count: u8,

    /// Diagnostic session opened; queries are pointless before the first
    /// live coolant broadcast proves the ECM is awake.
    session_ready: bool,

    rpm: u32,
    oil_pressure_psi: f32,
    fuel_pressure_psi: f32,
    crankcase_vacuum_psi: f32,
    oil_temp_sensor_c: Option<f32>,
    radiator_temp_c: Option<f32>,

    tick_count: u32,
    tx_errors: u32,
}

impl Gateway {
    pub fn new(boot_ms: u64) -> Self {
        Self {
            timers: TaskTimers::new(),
            params: EngineParams::new(boot_ms),
            rpm_calc: RpmCalculator::new(),
            rpm_encoder: RpmFrameEncoder::new(RpmFactorCurve::default()),
            gear: GearEstimator::new(),
            fan: FanController::new(),
            alarm: AlarmController::default(),
            perf: PerformanceTimer::new(),
            trace: TraceRecorder::new(),
            vacuum: VacuumGauge::new(),
            vacuum_zero_count: 0,
            session_ready: false,
            rpm: 0,
            oil_pressure_psi: 0.0,
            fuel_pressure_psi: 0.0,
            crankcase_vacuum_psi: 0.0,
            oil_temp_sensor_c: None,
            radiator_temp_c: None,
            tick_count: 0,
            tx_errors: 0,
        }
    }

    pub const fn rpm(&self) -> u32 {
        self.rpm
    }

    pub const fn params(&self) -> &EngineParams {
        &self.params
    }

    /// One pass through the loop.
    pub fn tick<D, C, M, T, P, S>(&mut self, inputs: &TickInputs<'_>, io: &mut GatewayIo<'_, D, C, M, T, P, S>)
    where
        D: CanTx,
        C: CanTx,
        M: MetricSink,
        T: ToneSink,
        P: PwmSink,
        S: TraceSink,
    {
        let now = inputs.now_ms;
        self.tick_count += 1;

        // Inbound traffic first so every task below sees current data
        for frame in inputs.donor_frames {
            decode_ecm_frame(frame, now, &mut self.params);
        }
        for frame in inputs.chassis_frames {
            decode_chassis_frame(frame, now, &mut self.params);
        }

        // First proof of life from the ECM opens the diagnostic session
        if !self.session_ready && self.params.coolant_temp_c.has_value() {
            for frame in &ecm_session_setup() {
                send(io.donor_tx, frame, &mut self.tx_errors);
            }
            self.session_ready = true;
        }

        // RPM measurement, re-tuning its own cadence
        if self.timers.rpm_poll.call(now) {
            self.rpm = self.rpm_calc.compute(inputs.pulses);
            self.timers.rpm_poll.set_period(poll_interval_for(self.rpm));
        }

        self.write_cluster_frames(now, io);
        self.send_diag_requests(now, io);
        self.read_gauges(now, inputs);

        if self.timers.gear_estimate.call(now) {
            let rear = self.params.speed_rear(now);
            let (_, change) = self
                .gear
                .estimate(self.rpm, rear, inputs.clutch_pressed, inputs.in_neutral);
            // Shifts are events, not samples; they go out as they happen
            // rather than waiting for the publish cadence
            if let Some(change) = change {
                io.metrics
                    .publish("gearShift", MetricValue::Integer(i64::from(change.to)));
            }
        }

        if self.timers.alarm_check.call(now) {
            let metrics = AlarmMetrics {
                oil_temp_c: self.params.oil_temp(now),
                coolant_temp_c: self.params.coolant(now),
                oil_pressure_psi: self.oil_pressure_psi,
                crankcase_vacuum_psi: self.crankcase_vacuum_psi,
                fuel_pressure_psi: self.fuel_pressure_psi,
                engine_rpm: self.rpm,
            };
            self.alarm.evaluate(&metrics, now, io.tone);
        }

        if self.timers.fan_output.call(now) {
            let (output, changed) = self.fan.update(self.params.coolant(now), self.rpm);
            if changed {
                io.pwm.set_duty(output.pwm);
            }
        }

        // Performance capture rides every tick; the wheel speed broadcast
        // is far faster than any timer here
        let rear = self.params.speed_rear(now);
        self.perf.update(now, rear);
        self.trace.update(now, rear, io.trace);

        if self.timers.publish_fast.call(now) {
            self.publish_fast(now, io.metrics);
        }
        if self.timers.publish_slow.call(now) {
            self.publish_slow(now, io.metrics);
        }
        if self.timers.loop_stats.call(now) {
            let hz = self.tick_count / (TASK_LOOP_STATS_MS / 1000);
            io.metrics.publish("loopHz", MetricValue::Integer(i64::from(hz)));
            io.metrics
                .publish("canTxErrors", MetricValue::Integer(i64::from(self.tx_errors)));
            self.tick_count = 0;
            self.tx_errors = 0;
        }
    }

    /// The four outbound frame groups: RPM, coolant and warning lights to
    /// the cluster, vehicle speed back to the ECM.
    fn write_cluster_frames<D, C, M, T, P, S>(&mut self, now: u64, io: &mut GatewayIo<'_, D, C, M, T, P, S>)
    where
        D: CanTx,
        C: CanTx,
    {
        if self.timers.can_write_rpm.call(now) {
            let frame = self.rpm_encoder.encode(self.rpm);
            send(io.cluster_tx, &frame, &mut self.tx_errors);
        }
        if self.timers.can_write_temp.call(now) {
            let frame = encode_temp(self.params.coolant(now));
            send(io.cluster_tx, &frame, &mut self.tx_errors);
        }
        if self.timers.can_write_misc.call(now) {
            let overtemp = self.params.coolant(now) > ALARM_COOLANT_TEMP_C;
            let frame = encode_misc_status(self.params.check_engine_state(now), 0, overtemp);
            send(io.cluster_tx, &frame, &mut self.tx_errors);
        }
        if self.timers.can_write_speed.call(now) {
            for frame in &encode_speed(self.params.speed_front(now)) {
                send(io.donor_tx, frame, &mut self.tx_errors);
            }
        }
    }

    /// Poll the ECM for everything it only reports on request. Silent
    /// until the diagnostic session is open.
    fn send_diag_requests<D, C, M, T, P, S>(&mut self, now: u64, io: &mut GatewayIo<'_, D, C, M, T, P, S>)
    where
        D: CanTx,
    {
        if !self.session_ready {
            return;
        }
        if self.timers.request_afr.call(now) {
            send(io.donor_tx, &request_afr_bank1(), &mut self.tx_errors);
            send(io.donor_tx, &request_afr_bank2(), &mut self.tx_errors);
        }
        if self.timers.request_pedal.call(now) {
            send(io.donor_tx, &request_gas_pedal(), &mut self.tx_errors);
        }
        if self.timers.request_slow.call(now) {
            for frame in &[
                request_oil_temp(),
                request_battery_voltage(),
                request_alpha_bank1(),
                request_alpha_bank2(),
                request_intake_air_temp(),
            ] {
                send(io.donor_tx, frame, &mut self.tx_errors);
            }
        }
        if self.timers.request_faults.call(now) {
            send(io.donor_tx, &request_fault_scan(), &mut self.tx_errors);
        }
        if self.timers.keepalive.call(now) {
            send(io.donor_tx, &diagnostic_keepalive(), &mut self.tx_errors);
        }
    }

    /// Convert the averaged ADC readings on their cadences.
    fn read_gauges(&mut self, now: u64, inputs: &TickInputs<'_>) {
        if self.timers.gauge_fast.call(now) {
            self.oil_pressure_psi = pressure_psi(adc_to_volts(inputs.analog.oil_pressure_raw));

            let crankcase_volts = adc_to_volts(inputs.analog.crankcase_raw);
            // Atmospheric zero accumulates only while the engine is off
            if self.rpm <= ENGINE_RUNNING_RPM && self.vacuum_zero_count < VACUUM_ZERO_SAMPLES {
                self.vacuum.add_zero_sample(crankcase_volts);
                self.vacuum_zero_count += 1;
            }
            self.crankcase_vacuum_psi = self.vacuum.vacuum_psi(crankcase_volts);
        }
        if self.timers.gauge_fuel.call(now) {
            self.fuel_pressure_psi = pressure_psi(adc_to_volts(inputs.analog.fuel_pressure_raw));
        }
        if self.timers.gauge_temps.call(now) {
            self.oil_temp_sensor_c = thermistor_temp_c(inputs.analog.oil_temp_raw);
            self.radiator_temp_c = thermistor_temp_c(inputs.analog.radiator_temp_raw);
        }
    }

    fn publish_fast(&self, now: u64, metrics: &mut impl MetricSink) {
        metrics.publish("rpm", MetricValue::Integer(i64::from(self.rpm)));
        metrics.publish("speed", MetricValue::Decimal(self.params.speed_rear(now)));
        metrics.publish("gear", MetricValue::Integer(i64::from(self.gear.current())));
        metrics.publish(
            "diffSpeedSplit",
            MetricValue::Decimal(self.params.rear_speed_variation(now)),
        );
        metrics.publish("oilPressure", MetricValue::Decimal(self.oil_pressure_psi));
        metrics.publish("crankCaseVacuum", MetricValue::Decimal(self.crankcase_vacuum_psi));
        metrics.publish("pedal", MetricValue::Decimal(self.params.pedal(now)));
        let (afr1, afr2) = self.params.afr(now);
        metrics.publish("afr1", MetricValue::Decimal(afr1));
        metrics.publish("afr2", MetricValue::Decimal(afr2));
    }

    fn publish_slow(&self, now: u64, metrics: &mut impl MetricSink) {
        metrics.publish("coolant", MetricValue::Integer(i64::from(self.params.coolant(now))));
        metrics.publish("oilTempEcm", MetricValue::Integer(i64::from(self.params.oil_temp(now))));
        metrics.publish("battery", MetricValue::Decimal(self.params.battery(now)));
        metrics.publish("fuelPressure", MetricValue::Decimal(self.fuel_pressure_psi));
        metrics.publish("fan", MetricValue::Integer(i64::from(self.fan.last().percent)));
        if let Some(temp) = self.oil_temp_sensor_c {
            metrics.publish("oilTempSensor", MetricValue::Decimal(temp));
        }
        if let Some(temp) = self.radiator_temp_c {
            metrics.publish("radiatorTemp", MetricValue::Decimal(temp));
        }
        for (topic, window) in [
            ("0to50", &self.perf.zero_to_fifty),
            ("0to100", &self.perf.zero_to_hundred),
            ("80to120", &self.perf.eighty_to_one_twenty),
        ] {
            if let Some(best) = window.best_ms() {
                metrics.publish(topic, MetricValue::Decimal(best as f32 / 1000.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::{
        CHASSIS_WHEEL_SPEED_ID,
        CLUSTER_MISC_ID,
        CLUSTER_RPM_ID,
        CLUSTER_TEMP_ID,
        ECM_COOLANT_ID,
        ECM_DIAG_REQUEST_ID,
        ECM_SPEED_IDS,
    };
    use crate::io::CanTxError;

    #[derive(Default)]
    struct TxLog {
        frames: Vec<CanFrame>,
    }

    impl CanTx for TxLog {
        fn send(&mut self, frame: &CanFrame) -> Result<(), CanTxError> {
            self.frames.push(*frame);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MetricLog {
        published: Vec<(String, MetricValue)>,
    }

    impl MetricSink for MetricLog {
        fn publish(&mut self, topic: &str, value: MetricValue) {
            self.published.push((topic.to_string(), value));
        }
    }

    #[derive(Default)]
    struct NullTone;
    impl ToneSink for NullTone {
        fn start_tone(&mut self, _frequency_hz: u16) {}
        fn stop_tone(&mut self) {}
    }

    #[derive(Default)]
    struct PwmLog {
        duties: Vec<u8>,
    }
    impl PwmSink for PwmLog {
        fn set_duty(&mut self, value: u8) {
            self.duties.push(value);
        }
    }

    #[derive(Default)]
    struct NullTrace;
    impl TraceSink for NullTrace {
        fn run_complete(&mut self, _reason: crate::perf::TraceEndReason, _samples: &[crate::perf::TraceSample]) {}
    }

    struct Harness {
        gateway: Gateway,
        pulses: PulseCounter,
        donor_tx: TxLog,
        cluster_tx: TxLog,
        metrics: MetricLog,
        tone: NullTone,
        pwm: PwmLog,
        trace: NullTrace,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                gateway: Gateway::new(0),
                pulses: PulseCounter::new(),
                donor_tx: TxLog::default(),
                cluster_tx: TxLog::default(),
                metrics: MetricLog::default(),
                tone: NullTone,
                pwm: PwmLog::default(),
                trace: NullTrace,
            }
        }

        fn tick(&mut self, now_ms: u64, donor: &[CanFrame], chassis: &[CanFrame]) {
            let inputs = TickInputs {
                now_ms,
                pulses: &self.pulses,
                donor_frames: donor,
                chassis_frames: chassis,
                clutch_pressed: false,
                in_neutral: false,
                analog: AnalogReadings::default(),
            };
            let mut io = GatewayIo {
                donor_tx: &mut self.donor_tx,
                cluster_tx: &mut self.cluster_tx,
                metrics: &mut self.metrics,
                tone: &mut self.tone,
                pwm: &mut self.pwm,
                trace: &mut self.trace,
            };
            self.gateway.tick(&inputs, &mut io);
        }

        fn donor_ids(&self) -> Vec<u32> {
            self.donor_tx.frames.iter().map(|f| f.id).collect()
        }
    }

    fn coolant_frame(temp_c: i32) -> CanFrame {
        CanFrame::new(ECM_COOLANT_ID, [(temp_c + 40) as u8, 0, 0, 0, 0, 0, 0, 0])
    }

    #[test]
    fn test_cluster_frames_flow_every_tick_cycle() {
        let mut h = Harness::new();
        for step in 0..10u64 {
            h.tick(step * 10, &[], &[]);
        }
        let ids: Vec<u32> = h.cluster_tx.frames.iter().map(|f| f.id).collect();
        assert!(ids.contains(&CLUSTER_RPM_ID));
        assert!(ids.contains(&CLUSTER_TEMP_ID));
        assert!(ids.contains(&CLUSTER_MISC_ID));
        // Speed frames go the other way, to the ECM
        assert!(h.donor_ids().contains(&ECM_SPEED_IDS[0]));
        assert!(h.donor_ids().contains(&ECM_SPEED_IDS[1]));
    }

    #[test]
    fn test_no_diag_traffic_before_ecm_is_alive() {
        let mut h = Harness::new();
        for step in 0..200u64 {
            h.tick(step * 10, &[], &[]);
        }
        // Speed frames are fine; anything addressed to 0x7DF is not
        assert!(!h.donor_ids().contains(&ECM_DIAG_REQUEST_ID));
    }

    #[test]
    fn test_first_coolant_broadcast_opens_session() {
        let mut h = Harness::new();
        h.tick(0, &[], &[]);
        h.tick(10, &[coolant_frame(85)], &[]);

        let setup: Vec<&CanFrame> = h
            .donor_tx
            .frames
            .iter()
            .filter(|f| f.id == ECM_DIAG_REQUEST_ID && f.data[1] == 0x10)
            .collect();
        assert_eq!(setup.len(), 2);
        assert_eq!(setup[0].data[2], 0x81);
        assert_eq!(setup[1].data[2], 0xC0);

        // With the session open, queries start flowing
        for step in 2..20u64 {
            h.tick(step * 10, &[], &[]);
        }
        let queries = h
            .donor_tx
            .frames
            .iter()
            .filter(|f| f.id == ECM_DIAG_REQUEST_ID && f.data[1] == 0x22)
            .count();
        assert!(queries > 0);
    }

    #[test]
    fn test_session_setup_sent_once() {
        let mut h = Harness::new();
        for step in 0..50u64 {
            h.tick(step * 10, &[coolant_frame(85)], &[]);
        }
        let setup = h
            .donor_tx
            .frames
            .iter()
            .filter(|f| f.id == ECM_DIAG_REQUEST_ID && f.data[1] == 0x10)
            .count();
        assert_eq!(setup, 2);
    }

    #[test]
    fn test_coolant_reaches_the_temp_gauge() {
        let mut h = Harness::new();
        h.tick(0, &[coolant_frame(90)], &[]);
        h.tick(10, &[], &[]);
        h.tick(20, &[], &[]);

        let temp_frame = h
            .cluster_tx
            .frames
            .iter()
            .rev()
            .find(|f| f.id == CLUSTER_TEMP_ID)
            .unwrap();
        // (90 + 48.373) / 0.75
        assert_eq!(temp_frame.data[1], 184);
    }

    #[test]
    fn test_check_engine_forced_on_at_boot() {
        let mut h = Harness::new();
        h.tick(0, &[], &[]);
        let misc = h
            .cluster_tx
            .frames
            .iter()
            .find(|f| f.id == CLUSTER_MISC_ID)
            .unwrap();
        assert_eq!(misc.data[0], crate::config::thresholds::LIGHT_CODE_CHECK_ENGINE);
    }

    #[test]
    fn test_metrics_publish_on_cadence() {
        let mut h = Harness::new();
        for step in 0..110u64 {
            h.tick(step * 10, &[], &[]);
        }
        let topics: Vec<&str> = h.metrics.published.iter().map(|(t, _)| t.as_str()).collect();
        assert!(topics.contains(&"rpm"));
        assert!(topics.contains(&"speed"));
        assert!(topics.contains(&"coolant"));
        // 1.1 s of loop: fast group published ~11x, slow ~2x
        let rpm_count = topics.iter().filter(|t| **t == "rpm").count();
        let coolant_count = topics.iter().filter(|t| **t == "coolant").count();
        assert!(rpm_count > coolant_count);
    }

    #[test]
    fn test_gear_shift_published_as_event() {
        let mut h = Harness::new();
        h.tick(0, &[], &[]);
        // 30 tach edges over the 200 ms poll window = 3000 RPM at 3
        // pulses per revolution
        for _ in 0..30 {
            h.pulses.on_pulse_edge(200_000);
        }
        // All four wheels at 100 km/h (raw 1600 in 1/16 km/h fields)
        let wheels = CanFrame::new(
            CHASSIS_WHEEL_SPEED_ID,
            [0x40, 0x06, 0x40, 0x06, 0x40, 0x06, 0x40, 0x06],
        );
        h.tick(200, &[], &[wheels]);

        // 3000 RPM at 100 km/h classifies as fifth gear; the transition
        // goes out immediately instead of waiting for the publish cadence
        assert!(
            h.metrics
                .published
                .contains(&("gearShift".to_string(), MetricValue::Integer(5)))
        );
    }

    #[test]
    fn test_fan_duty_written_on_change_only() {
        let mut h = Harness::new();
        // Cold engine, no RPM: duty computed once as 0, then unchanged
        for step in 0..1100u64 {
            h.tick(step * 10, &[], &[]);
        }
        assert_eq!(h.pwm.duties, vec![]);
    }
}
