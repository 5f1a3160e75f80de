//! Throttle and lights mixing.
//!
//! ## Throttle
//!
//! The offset of the throttle pulse from center is scaled by a left shift and
//! saturated. Its sign selects the H-bridge direction:
//!
//! | Throttle width                      | Direction | Magnitude                     |
//! |-------------------------------------|-----------|-------------------------------|
//! | `> center + deadband`               | Forward   | `min((w - center) << shift, pwm_max)` |
//! | `< center - deadband`               | Reverse   | `min((center - w) << shift, pwm_max)` |
//! | within deadband                     | Coast     | scaled offset, still scheduled |
//! | missing or outside `[min, max]`     | Coast     | 0                             |
//! | low power interlock engaged         | Coast     | 0                             |
//!
//! The magnitude is the number of ticks the drive is held in the current frame.
//!
//! ## Lights
//!
//! A present lights pulse switches the output steadily on or off. Without a
//! usable pulse the output blinks one poll out of every
//! [`FAILSAFE_BLINK_PERIOD`](crate::consts::FAILSAFE_BLINK_PERIOD), so "no
//! signal" is visibly different from "signal says off".

use crate::config::{AuxConfig, Config, PulseConfig};
use crate::decoder::ChannelWidths;
use crate::timer::Ticks;

/// H-bridge direction selection.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Direction {
    /// IN1 asserted.
    Forward,
    /// IN2 asserted.
    Reverse,
    /// Neither line asserted.
    #[default]
    Coast,
}

/// Per-frame drive command.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DriveCommand {
    /// Hold time in ticks, `0..=pwm_max`.
    pub magnitude: Ticks,
    /// Which line to assert while holding.
    pub direction: Direction,
}

impl DriveCommand {
    /// Motor off.
    pub const STOP: DriveCommand = DriveCommand {
        magnitude: 0,
        direction: Direction::Coast,
    };
}

/// Maps a throttle width to a drive command.
pub fn throttle(width: Option<Ticks>, pwr_low: bool, cfg: &PulseConfig) -> DriveCommand {
    if pwr_low {
        return DriveCommand::STOP;
    }
    let width = match width {
        Some(w) if (cfg.min..=cfg.max).contains(&w) => w,
        _ => return DriveCommand::STOP,
    };

    let delta = i32::from(width) - i32::from(cfg.center);
    let shift = cfg.shift.min(32);
    let scaled = u64::from(delta.unsigned_abs()) << shift;
    let magnitude = scaled.min(u64::from(cfg.pwm_max)) as Ticks;

    let direction = if scaled <= u64::from(cfg.deadband) << shift {
        Direction::Coast
    } else if delta > 0 {
        Direction::Forward
    } else {
        Direction::Reverse
    };

    DriveCommand {
        magnitude,
        direction,
    }
}

/// Lights output for one poll.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AuxCommand {
    /// Drive the lights pin high.
    pub on: bool,
    /// The level comes from the failsafe blink, not from the channel.
    pub failsafe: bool,
}

/// Combined result of [`Mixer::mix`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct MixOutput {
    /// Motor
    pub drive: DriveCommand,
    /// Lights
    pub aux: AuxCommand,
}

/// Throttle and lights mixer. Owns the free-running failsafe blink counter.
#[derive(Debug)]
pub struct Mixer {
    pulse: PulseConfig,
    aux: AuxConfig,
    polls: u8,
}

impl Mixer {
    /// Creates a mixer with the failsafe counter at the start of a blink cycle.
    pub fn new(cfg: &Config) -> Self {
        Self {
            pulse: cfg.pulse,
            aux: cfg.aux,
            polls: 0,
        }
    }

    /// Evaluates the lights channel for one poll.
    pub fn aux(&mut self, width: Option<Ticks>) -> AuxCommand {
        let period = self.aux.blink_period.max(1);
        let poll = self.polls % period;
        self.polls = (poll + 1) % period;
        match width {
            Some(w) if w > self.aux.valid_min => AuxCommand {
                on: w > self.aux.on_above,
                failsafe: false,
            },
            _ => AuxCommand {
                on: poll == 0,
                failsafe: true,
            },
        }
    }

    /// Mixes one frame.
    pub fn mix(&mut self, widths: ChannelWidths, pwr_low: bool) -> MixOutput {
        MixOutput {
            drive: throttle(widths.throttle, pwr_low, &self.pulse),
            aux: self.aux(widths.aux),
        }
    }
}
