//! Gateway core for an engine-swapped BMW E46 running a Nissan engine.
//!
//! The donor ECM and the host chassis speak different CAN dialects, so this
//! crate sits between the two buses and translates in both directions:
//! engine data (RPM, coolant temperature, diagnostics) flows from the Nissan
//! ECM to the BMW cluster, and vehicle speed flows back to the ECM. On the
//! side it samples analog gauge senders, estimates the selected gear, drives
//! the radiator fan and an audible alarm, and captures acceleration times.
//!
//! All hardware access lives behind the traits in [`io`]; the core is pure
//! logic driven by a cooperative scheduler, so it runs unchanged on the
//! target and under the std test harness on the host.
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test --lib
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), allowing use of the standard
//! test framework while the actual firmware runs as `no_std`.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod alarm;
pub mod can;
pub mod config;
pub mod fan;
pub mod gateway;
pub mod gauges;
pub mod gear;
pub mod io;
pub mod params;
pub mod perf;
pub mod pulse;
pub mod scheduler;

pub use can::CanFrame;
pub use gateway::{Gateway, GatewayIo, TickInputs};
pub use params::EngineParams;
pub use pulse::PulseCounter;
