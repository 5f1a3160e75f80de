//! Constants used across the RC decode, mixing and power monitoring code.
//!
//! All time values are in counter ticks. With the default 1 MHz counter one
//! tick is one microsecond, so the RC pulse geometry below reads directly as
//! the usual 1.0 ms .. 2.0 ms servo protocol with a 1.5 ms center.
//!
//! ## Key Concepts
//!
//! - **Pulse geometry**: center, validity window and deadband of the RC pulses.
//! - **Drive scaling**: how far off center maps to how long the motor is driven.
//! - **Aux thresholds**: when the lights channel counts as present, and as "on".
//! - **Power thresholds**: window sums of the battery ADC, derived from the
//!   resistor divider ratio and the ADC reference voltage.
//!
//! These values encode the physical RC protocol and the battery chemistry.
//! Use [`Config`](crate::config::Config) to override them per board.

use crate::timer::micros_to_ticks;

/// Rate of the free-running counter, in Hz.
pub const TIMER_HZ: u32 = 1_000_000;

/// Throttle pulse width that commands zero drive.
pub const CENTER_TICKS: u16 = micros_to_ticks(TIMER_HZ, 1_500);

/// Shortest pulse width accepted as a valid reading.
pub const MIN_TICKS: u16 = micros_to_ticks(TIMER_HZ, 800);

/// Longest pulse width accepted as a valid reading.
///
/// This is also the decoder timeout: a channel that stays high longer than
/// this is reported as "no reading".
pub const MAX_TICKS: u16 = micros_to_ticks(TIMER_HZ, 2_200);

/// Distance from [`CENTER_TICKS`] inside which the motor coasts.
pub const DEADBAND_TICKS: u16 = 70;

/// Left shift applied to the throttle offset to obtain the drive magnitude.
pub const DRIVE_SHIFT: u32 = 5;

/// Saturation value of the drive magnitude.
///
/// The magnitude doubles as the number of ticks the drive is held per frame,
/// so this must stay well below the RC frame period (~20 ms).
pub const PWM_MAX: u16 = 16_000;

/// Aux pulses at or below this width are treated as "no signal".
pub const AUX_VALID_MIN_TICKS: u16 = 800;

/// Aux pulses above this width switch the lights on.
pub const CH3_ON_TICKS: u16 = 1_300;

/// Length of the failsafe blink cycle, in aux polls. Lights are on for one poll per cycle.
pub const FAILSAFE_BLINK_PERIOD: u8 = 64;

/// Number of ADC samples summed into one classification window.
pub const PWR_CNT: u16 = 8;

/// Full scale reading of the 10-bit battery ADC.
pub const ADC_FULL_SCALE: u16 = 1023;

/// Battery divider ratio, times ten (4.3:1).
pub const PWR_DIVIDER_X10: u32 = 43;

/// ADC reference voltage, in tenths of a volt (3.3 V).
pub const PWR_VREF_X10: u32 = 33;

/// Converts a battery voltage (in tenths of a volt) to an 8-sample window sum.
///
/// Truncates, so `7.8 V` becomes `4498` with the default divider and reference.
pub const fn window_threshold(decivolts: u32) -> u16 {
    let full = PWR_CNT as u32 * ADC_FULL_SCALE as u32;
    (full * decivolts * 100 / (PWR_DIVIDER_X10 * PWR_VREF_X10 * 10)) as u16
}

/// Window sums above this are "charging" (7.8 V).
pub const PWR_HIGH: u16 = window_threshold(78);

/// Window sums above this are "ok" (7.0 V).
pub const PWR_OK: u16 = window_threshold(70);

/// Window sums above this are "low"; at or below is "critical" (6.5 V).
pub const PWR_LOW: u16 = window_threshold(65);

/// Interval between power samples while waiting for a frame start (50 ms).
pub const IDLE_SAMPLE_TICKS: u16 = micros_to_ticks(TIMER_HZ, 50_000);
