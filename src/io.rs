//! Collaborator boundaries.
//!
//! Everything the core needs from the outside world arrives through these
//! traits: CAN transmit on either bus, metric publishing, the alarm buzzer
//! and the fan PWM line. The core never touches hardware and never blocks
//! on any of these calls.

use crate::can::CanFrame;

/// Transmit failure on a CAN bus. The gateway treats these as transient:
/// the frame is dropped and the next scheduled write tries again.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CanTxError;

/// Outbound side of one CAN bus.
pub trait CanTx {
    fn send(&mut self, frame: &CanFrame) -> Result<(), CanTxError>;
}

/// A published metric value.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum MetricValue {
    Integer(i64),
    Decimal(f32),
}

/// Key/value publish boundary (MQTT, serial console, or nothing at all;
/// the core does not care how the transport works).
pub trait MetricSink {
    fn publish(&mut self, topic: &str, value: MetricValue);
}

/// Audible output: a continuous tone that can be started and stopped.
pub trait ToneSink {
    fn start_tone(&mut self, frequency_hz: u16);
    fn stop_tone(&mut self);
}

/// PWM output handle for the fan motor driver.
pub trait PwmSink {
    fn set_duty(&mut self, value: u8);
}

/// Retry a peripheral initialisation a bounded number of times with a fixed
/// backoff between attempts.
///
/// On persistent failure the error is returned so the caller can log it as
/// fatal, but the gateway keeps running in a degraded mode: a dashboard
/// with partial data beats a dead one, and there is no supervisor above
/// this process except a power cycle.
pub fn init_with_retries<E>(
    max_attempts: u32,
    mut attempt: impl FnMut() -> Result<(), E>,
    mut backoff: impl FnMut(),
) -> Result<(), E> {
    let mut tries = 0;
    loop {
        match attempt() {
            Ok(()) => return Ok(()),
            Err(error) => {
                tries += 1;
                if tries >= max_attempts {
                    return Err(error);
                }
                backoff();
            }
        }
    }
}
