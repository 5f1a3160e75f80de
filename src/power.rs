//! Battery monitoring: averaged ADC sampling, power state classification and
//! the two-color status indicator.
//!
//! Every call to [`PowerSampler::sample`] takes one conversion. Every
//! [`PWR_CNT`](crate::consts::PWR_CNT) conversions the window sum is compared
//! against three fixed thresholds and the result is shown on a green and a red
//! LED:
//!
//! | State                         | Green  | Red    | Motor interlock |
//! |-------------------------------|--------|--------|-----------------|
//! | [`Charging`](PowerState::Charging) | blink  | off    | released        |
//! | [`Ok`](PowerState::Ok)         | on     | off    | released        |
//! | [`Low`](PowerState::Low)       | off    | on     | unchanged       |
//! | [`Critical`](PowerState::Critical) | off    | blink  | engaged         |
//!
//! Blinking LEDs toggle once per window. There is deliberately no hysteresis:
//! a battery sitting on a threshold may alternate between two states.

use embedded_hal::digital::OutputPin;
use nb::block;

use crate::config::PowerConfig;
use crate::error::{Error, Result, pin};
use crate::signal::{AnalogInput, ConversionSignal, WaitForInterrupt};

/// Supply classification for one averaging window.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PowerState {
    /// Above the high threshold, typically on the charger. Green blinks.
    Charging,
    /// Healthy supply. Green steady.
    #[default]
    Ok,
    /// Getting low, still allowed to drive. Red steady.
    Low,
    /// Too low to drive. Red blinks and the motor is held off.
    Critical,
}

/// Classifies a window sum. Thresholds are exclusive: a sum equal to a
/// threshold falls into the more severe state.
pub fn classify(sum: u16, cfg: &PowerConfig) -> PowerState {
    if sum > cfg.high {
        PowerState::Charging
    } else if sum > cfg.ok {
        PowerState::Ok
    } else if sum > cfg.low {
        PowerState::Low
    } else {
        PowerState::Critical
    }
}

/// Green/red status LEDs, both active high.
#[derive(Debug)]
pub struct StatusLeds<G, R>
where
    G: OutputPin,
    R: OutputPin,
{
    /// Green LED pin
    pub green: G,
    /// Red LED pin
    pub red: R,
    green_lit: bool,
    red_lit: bool,
}

impl<G, R> StatusLeds<G, R>
where
    G: OutputPin,
    R: OutputPin,
{
    /// Takes the two LED pins. Both are assumed off.
    pub fn new(green: G, red: R) -> Self {
        Self {
            green,
            red,
            green_lit: false,
            red_lit: false,
        }
    }

    fn set_green(&mut self, on: bool) -> Result<()> {
        self.green_lit = on;
        if on {
            pin(self.green.set_high())
        } else {
            pin(self.green.set_low())
        }
    }

    fn set_red(&mut self, on: bool) -> Result<()> {
        self.red_lit = on;
        if on {
            pin(self.red.set_high())
        } else {
            pin(self.red.set_low())
        }
    }

    /// Shows a freshly classified window. The extreme states toggle their LED.
    pub fn show(&mut self, state: PowerState) -> Result<()> {
        match state {
            PowerState::Charging => {
                self.set_green(!self.green_lit)?;
                self.set_red(false)
            }
            PowerState::Ok => {
                self.set_green(true)?;
                self.set_red(false)
            }
            PowerState::Low => {
                self.set_green(false)?;
                self.set_red(true)
            }
            PowerState::Critical => {
                self.set_green(false)?;
                self.set_red(!self.red_lit)
            }
        }
    }

    /// Current LED levels as `(green, red)`.
    pub fn lit(&self) -> (bool, bool) {
        (self.green_lit, self.red_lit)
    }
}

/// Running-average battery classifier.
///
/// Owns the window accumulator and the low power interlock flag. Those are the
/// only pieces of power state that outlive a single frame.
#[derive(Debug)]
pub struct PowerSampler {
    cfg: PowerConfig,
    sum: u16,
    count: u16,
    state: PowerState,
    pwr_low: bool,
    /// Number of completed classification windows.
    pub windows: u32,
}

impl PowerSampler {
    /// Creates a sampler with an empty window, reporting [`PowerState::Ok`]
    /// until the first window completes.
    pub fn new(cfg: PowerConfig) -> Self {
        Self {
            cfg,
            sum: 0,
            count: 0,
            state: PowerState::Ok,
            pwr_low: false,
            windows: 0,
        }
    }

    /// Whether the low power interlock is engaged.
    ///
    /// Set by a [`Critical`](PowerState::Critical) window and released only by a
    /// [`Charging`](PowerState::Charging) or [`Ok`](PowerState::Ok) window.
    pub fn pwr_low(&self) -> bool {
        self.pwr_low
    }

    /// The most recently classified state.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Takes one conversion and, when the window is full, reclassifies.
    ///
    /// # Arguments
    /// - `adc`: the battery input
    /// - `done`: the signal the ADC interrupt notifies
    /// - `idle`: low-power wait used while the conversion runs
    /// - `leds`: status indicator updated on every classification
    ///
    /// # Returns
    /// The current power state, which only changes once per window.
    pub fn sample<A, W, G, R>(
        &mut self,
        adc: &mut A,
        done: &ConversionSignal,
        idle: &mut W,
        leds: &mut StatusLeds<G, R>,
    ) -> Result<PowerState>
    where
        A: AnalogInput,
        W: WaitForInterrupt,
        G: OutputPin,
        R: OutputPin,
    {
        done.clear();
        adc.start_conversion().map_err(|_| Error::Adc)?;
        done.wait(idle);
        let raw = block!(adc.read()).map_err(|_| Error::Adc)?;
        self.accumulate(raw, leds)
    }

    /// Adds one raw reading to the window. Split from [`sample`](Self::sample)
    /// for boards that collect conversions some other way.
    pub fn accumulate<G, R>(&mut self, raw: u16, leds: &mut StatusLeds<G, R>) -> Result<PowerState>
    where
        G: OutputPin,
        R: OutputPin,
    {
        self.sum = self.sum.saturating_add(raw.min(self.cfg.full_scale));
        self.count += 1;
        if self.count < self.cfg.window {
            return Ok(self.state);
        }

        let sum = self.sum;
        self.sum = 0;
        self.count = 0;
        self.windows = self.windows.wrapping_add(1);

        let state = classify(sum, &self.cfg);
        debug!("power window sum {} -> {:?}", sum, state);
        if state != self.state {
            info!("power state {:?} -> {:?}", self.state, state);
        }
        self.state = state;

        match state {
            PowerState::Charging | PowerState::Ok => {
                if self.pwr_low {
                    info!("supply recovered, motor interlock released");
                }
                self.pwr_low = false;
            }
            PowerState::Critical => {
                if !self.pwr_low {
                    warn!("supply critical, motor interlock engaged");
                }
                self.pwr_low = true;
            }
            PowerState::Low => {}
        }

        leds.show(state)?;
        Ok(state)
    }
}
