//! Host-side replay driver.
//!
//! Feeds a scripted drive (warm-up idle, then a full-throttle pull to past
//! 120 km/h) through the gateway loop with synthetic CAN traffic, tach
//! pulses and ADC readings, and prints the metric stream the gateway
//! publishes. Useful for eyeballing end-to-end behaviour without a car.

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use swap_gateway::can::{CHASSIS_WHEEL_SPEED_ID, ECM_COOLANT_ID};
use swap_gateway::gateway::AnalogReadings;
use swap_gateway::io::{CanTx, CanTxError, MetricSink, MetricValue, PwmSink, ToneSink};
use swap_gateway::perf::{TraceEndReason, TraceSample, TraceSink};
use swap_gateway::{CanFrame, Gateway, GatewayIo, PulseCounter, TickInputs};

/// Loop period of the scripted drive.
const STEP_MS: u64 = 10;

// =============================================================================
// Console sinks
// =============================================================================

struct ConsoleTx {
    label: &'static str,
    verbose: bool,
}

impl CanTx for ConsoleTx {
    fn send(&mut self, frame: &CanFrame) -> Result<(), CanTxError> {
        if self.verbose {
            println!("[{}] 0x{:03X} {:02X?}", self.label, frame.id, frame.payload());
        }
        Ok(())
    }
}

struct ConsoleMetrics;

impl MetricSink for ConsoleMetrics {
    fn publish(&mut self, topic: &str, value: MetricValue) {
        match value {
            MetricValue::Integer(v) => println!("{topic} = {v}"),
            MetricValue::Decimal(v) => println!("{topic} = {v:.2}"),
        }
    }
}

struct ConsoleTone;

impl ToneSink for ConsoleTone {
    fn start_tone(&mut self, frequency_hz: u16) {
        println!("!! alarm on ({frequency_hz} Hz)");
    }

    fn stop_tone(&mut self) {
        println!("!! alarm off");
    }
}

struct ConsolePwm;

impl PwmSink for ConsolePwm {
    fn set_duty(&mut self, value: u8) {
        println!("fan pwm -> {value}");
    }
}

struct ConsoleTrace;

impl TraceSink for ConsoleTrace {
    fn run_complete(&mut self, reason: TraceEndReason, samples: &[TraceSample]) {
        println!("trace run complete ({reason:?}), {} samples", samples.len());
        if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
            println!(
                "  {:.1} km/h @ {} ms .. {:.1} km/h @ {} ms",
                first.speed_kph, first.elapsed_ms, last.speed_kph, last.elapsed_ms
            );
        }
    }
}

// =============================================================================
// Scripted drive
// =============================================================================

/// Engine and vehicle state at one point of the script.
struct Scene {
    rpm: f32,
    speed_kph: f32,
    coolant_c: f32,
}

/// Warm-up idle for 4 s, a pull from standstill to ~130 km/h over the next
/// 8 s, then a short cruise.
fn scene_at(now_ms: u64) -> Scene {
    let t = now_ms as f32 / 1000.0;
    if t < 4.0 {
        Scene {
            rpm: 900.0,
            speed_kph: 0.0,
            coolant_c: 60.0 + t * 6.0,
        }
    } else if t < 12.0 {
        let pull = (t - 4.0) / 8.0;
        Scene {
            rpm: 900.0 + pull * 5_600.0,
            speed_kph: pull * 130.0,
            coolant_c: 84.0 + pull * 8.0,
        }
    } else {
        Scene {
            rpm: 3_000.0,
            speed_kph: 130.0,
            coolant_c: 92.0,
        }
    }
}

fn coolant_frame(temp_c: f32) -> CanFrame {
    CanFrame::new(ECM_COOLANT_ID, [(temp_c + 40.0) as u8, 0, 0, 0, 0, 0, 0, 0])
}

/// All four wheels at the same speed, 12-bit 1/16 km/h fields.
fn wheel_speed_frame(kph: f32) -> CanFrame {
    let raw = (kph * 16.0) as u16;
    let low = (raw & 0xFF) as u8;
    let high = ((raw >> 8) & 0x0F) as u8;
    CanFrame::new(CHASSIS_WHEEL_SPEED_ID, [low, high, low, high, low, high, low, high])
}

/// Emit tach edges for the elapsed step at 3 pulses per revolution,
/// carrying the fractional remainder between steps.
fn emit_pulses(counter: &PulseCounter, rpm: f32, now_us: u32, carry: &mut f32) {
    let pulses_per_ms = rpm * 3.0 / 60_000.0;
    *carry += pulses_per_ms * STEP_MS as f32;
    while *carry >= 1.0 {
        counter.on_pulse_edge(now_us);
        *carry -= 1.0;
    }
}

fn main() {
    let pulses = PulseCounter::new();
    let mut gateway = Gateway::new(0);

    let mut donor_tx = ConsoleTx { label: "ecm", verbose: false };
    let mut cluster_tx = ConsoleTx { label: "cluster", verbose: false };
    let mut metrics = ConsoleMetrics;
    let mut tone = ConsoleTone;
    let mut pwm = ConsolePwm;
    let mut trace = ConsoleTrace;

    let mut pulse_carry = 0.0f32;

    for step in 0..1_500u64 {
        let now_ms = step * STEP_MS;
        let scene = scene_at(now_ms);
        emit_pulses(&pulses, scene.rpm, (now_ms * 1000) as u32, &mut pulse_carry);

        // The ECM broadcasts coolant every 100 ms
        let donor_frames = if now_ms % 100 == 0 {
            vec![coolant_frame(scene.coolant_c)]
        } else {
            vec![]
        };
        // The chassis broadcasts wheel speeds every 20 ms
        let chassis_frames = if now_ms % 20 == 0 {
            vec![wheel_speed_frame(scene.speed_kph)]
        } else {
            vec![]
        };

        let inputs = TickInputs {
            now_ms,
            pulses: &pulses,
            donor_frames: &donor_frames,
            chassis_frames: &chassis_frames,
            clutch_pressed: false,
            in_neutral: false,
            analog: AnalogReadings {
                // Healthy steady-state senders
                oil_pressure_raw: 300,
                fuel_pressure_raw: 400,
                crankcase_raw: 100,
                oil_temp_raw: 500,
                radiator_temp_raw: 520,
            },
        };
        let mut io = GatewayIo {
            donor_tx: &mut donor_tx,
            cluster_tx: &mut cluster_tx,
            metrics: &mut metrics,
            tone: &mut tone,
            pwm: &mut pwm,
            trace: &mut trace,
        };
        gateway.tick(&inputs, &mut io);
    }

    println!("replay finished at rpm {}", gateway.rpm());
}
