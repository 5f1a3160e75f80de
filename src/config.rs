//! Board-level tuning of the drive loop.
//!
//! [`Config::DEFAULT`] collects the constants from [`crate::consts`]. Boards
//! with a different counter clock, battery pack or transmitter throw can start
//! from it and override individual fields:
//!
//! ```rust
//! use rcdrive::config::Config;
//!
//! let cfg = Config {
//!     idle_sample_ticks: 25_000,
//!     ..Config::DEFAULT
//! };
//! assert_eq!(cfg.pulse.center, 1500);
//! ```

use crate::consts::*;
use crate::timer::Ticks;

/// RC pulse geometry and throttle scaling.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PulseConfig {
    /// Throttle width that commands zero drive.
    pub center: Ticks,
    /// Shortest valid width.
    pub min: Ticks,
    /// Longest valid width, and the per-channel decode timeout.
    pub max: Ticks,
    /// Coast zone around `center`.
    pub deadband: Ticks,
    /// Left shift from throttle offset to drive magnitude.
    pub shift: u32,
    /// Drive magnitude saturation, in ticks of hold time.
    pub pwm_max: Ticks,
}

/// Lights channel thresholds.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AuxConfig {
    /// Widths at or below this mean "no signal".
    pub valid_min: Ticks,
    /// Widths above this switch the lights on.
    pub on_above: Ticks,
    /// Failsafe blink cycle length in polls. Must be a power of two.
    pub blink_period: u8,
}

/// Battery window thresholds.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PowerConfig {
    /// Samples per window.
    pub window: u16,
    /// Largest raw reading the ADC can produce.
    pub full_scale: u16,
    /// Window sums above this are "charging".
    pub high: u16,
    /// Window sums above this are "ok".
    pub ok: u16,
    /// Window sums above this are "low", at or below it "critical".
    pub low: u16,
}

/// Complete drive loop configuration.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Config {
    /// Throttle channel
    pub pulse: PulseConfig,
    /// Lights channel
    pub aux: AuxConfig,
    /// Battery monitor
    pub power: PowerConfig,
    /// Interval between power samples while no RC frames arrive.
    pub idle_sample_ticks: Ticks,
}

impl Config {
    /// The stock configuration: 1 MHz counter, 1.5 ms center, 2S pack on a 4.3:1 divider.
    pub const DEFAULT: Config = Config {
        pulse: PulseConfig {
            center: CENTER_TICKS,
            min: MIN_TICKS,
            max: MAX_TICKS,
            deadband: DEADBAND_TICKS,
            shift: DRIVE_SHIFT,
            pwm_max: PWM_MAX,
        },
        aux: AuxConfig {
            valid_min: AUX_VALID_MIN_TICKS,
            on_above: CH3_ON_TICKS,
            blink_period: FAILSAFE_BLINK_PERIOD,
        },
        power: PowerConfig {
            window: PWR_CNT,
            full_scale: ADC_FULL_SCALE,
            high: PWR_HIGH,
            ok: PWR_OK,
            low: PWR_LOW,
        },
        idle_sample_ticks: IDLE_SAMPLE_TICKS,
    };
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
