//! # rcdrive
//!
//! A portable, no_std drive loop that turns an RC receiver's throttle and
//! lights channels into a bidirectional motor drive on a two-pin H-bridge,
//! with a lights output and battery monitoring.
//!
//! The loop uses:
//! - `embedded-hal` traits for the receiver inputs and every output line
//! - a free-running 16-bit counter as the only time base
//! - one interrupt-released ADC conversion per frame, signalled through
//!   `critical-section`
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Disables `#![no_std]` support |
//! | `defmt-0-3` | Uses `defmt` logging |
//! | `log`       | Uses `log` logging |
//!
//! ## Per frame
//!
//! 1. Wait for the throttle rising edge (the frame start).
//! 2. Take one battery sample; every 8 samples reclassify the supply.
//! 3. Measure the throttle and lights pulse widths.
//! 4. Mix: direction and hold time for the motor, level for the lights.
//! 5. Hold the motor line for the computed time, then release it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rcdrive::config::Config;
//! use rcdrive::controller::{Controller, Outputs, RcInputs};
//!
//! static ADC_DONE: ConversionSignal = ConversionSignal::new();
//!
//! let mut ctl = Controller::new(
//!     Config::DEFAULT,
//!     counter,
//!     battery_adc,
//!     &ADC_DONE,
//!     || enter_lpm0(),
//!     RcInputs { throttle: ch2, aux: ch3 },
//!     Outputs { bridge: HBridge::new(in1, in2), lights, leds: StatusLeds::new(green, red) },
//! );
//! ctl.run();
//! ```
//!
//! ## Safety behaviour
//!
//! - A critical battery holds the motor off until the supply recovers to "ok".
//! - A missing or implausible throttle pulse stops the motor for that frame.
//! - A missing lights pulse blinks the lights once every 64 polls.
//! - Hardware errors abandon the frame with the motor coasting; the loop never stops.
//!
//! --
//! Designed for `#![no_std]` use on small microcontrollers.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub use critical_section;

#[macro_use]
mod fmt;

pub mod config;
pub mod consts;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod mixer;
pub mod power;
pub mod scheduler;
pub mod signal;
pub mod timer;

#[cfg(test)]
mod sim;

pub use error::{Error, Result};
