//! The drive loop: one owner for every peripheral and every piece of state.
//!
//! [`Controller`] runs the frame state machine
//!
//! ```text
//! WaitFrameStart -> SamplePower -> Decode -> Mix -> HoldDrive -> ReleaseDrive
//!        ^                                                            |
//!        +------------------------------------------------------------+
//! ```
//!
//! forever. The only state that survives a frame is the battery window and
//! interlock flag in [`PowerSampler`] and the failsafe blink counter in
//! [`Mixer`]; both are owned here and nowhere else.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! use rcdrive::config::Config;
//! use rcdrive::controller::{Controller, Outputs, RcInputs};
//! use rcdrive::power::StatusLeds;
//! use rcdrive::scheduler::HBridge;
//! use rcdrive::signal::{AnalogInput, ConversionSignal};
//!
//! struct Battery;
//! impl AnalogInput for Battery {
//!     type Error = ();
//!     fn start_conversion(&mut self) -> Result<(), ()> { Ok(()) }
//!     fn read(&mut self) -> nb::Result<u16, ()> { Ok(560) }
//! }
//!
//! static ADC_DONE: ConversionSignal = ConversionSignal::new();
//!
//! # let low = || Pin::new(&[PinTransaction::set(PinState::Low)]);
//! # let (in1, in2) = (low(), low());
//! # let (ch2, ch3, lights, green, red) = (Pin::new(&[]), Pin::new(&[]), Pin::new(&[]), Pin::new(&[]), Pin::new(&[]));
//! let mut raw = 0u16;
//! let mut ctl = Controller::new(
//!     Config::DEFAULT,
//!     move || { raw = raw.wrapping_add(1); raw },
//!     Battery,
//!     &ADC_DONE,
//!     || ADC_DONE.notify(), // stands in for the ADC interrupt
//!     RcInputs { throttle: ch2, aux: ch3 },
//!     Outputs { bridge: HBridge::new(in1, in2), lights, leds: StatusLeds::new(green, red) },
//! );
//! // ctl.run();
//! # ctl.outputs.bridge.in1.done();
//! # ctl.outputs.bridge.in2.done();
//! # ctl.inputs.throttle.done();
//! # ctl.inputs.aux.done();
//! # ctl.outputs.lights.done();
//! # ctl.outputs.leds.green.done();
//! # ctl.outputs.leds.red.done();
//! ```

use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::Config;
use crate::decoder::{ChannelWidths, PulseDecoder};
use crate::error::{Error, Result, pin};
use crate::mixer::{AuxCommand, MixOutput, Mixer};
use crate::power::{PowerSampler, PowerState, StatusLeds};
use crate::scheduler::{HBridge, hold_until};
use crate::signal::{AnalogInput, ConversionSignal, WaitForInterrupt};
use crate::timer::{FreeRunningCounter, Timestamp};

/// Position of the controller within the frame state machine.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameStage {
    /// Waiting for the throttle rising edge. Power is still sampled periodically.
    #[default]
    WaitFrameStart,
    /// Taking one battery conversion.
    SamplePower,
    /// Measuring both channel pulses.
    Decode,
    /// Computing drive and lights commands.
    Mix,
    /// Motor line asserted, waiting for the hold time to pass.
    HoldDrive,
    /// Dropping both motor lines. Kept once the frame is complete, until the
    /// next one starts waiting.
    ReleaseDrive,
}

/// The two RC receiver channel inputs.
#[derive(Debug)]
pub struct RcInputs<CH2, CH3>
where
    CH2: InputPin,
    CH3: InputPin,
{
    /// CH2, throttle
    pub throttle: CH2,
    /// CH3, lights
    pub aux: CH3,
}

/// Everything the loop drives.
#[derive(Debug)]
pub struct Outputs<IN1, IN2, L, G, R>
where
    IN1: OutputPin,
    IN2: OutputPin,
    L: OutputPin,
    G: OutputPin,
    R: OutputPin,
{
    /// Motor H-bridge
    pub bridge: HBridge<IN1, IN2>,
    /// Lights, active high
    pub lights: L,
    /// Battery status LEDs
    pub leds: StatusLeds<G, R>,
}

/// What happened in one frame.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct FrameReport {
    /// Throttle rising edge.
    pub start: Timestamp,
    /// Power state after this frame's sample.
    pub power: PowerState,
    /// Whether the low power interlock was engaged while mixing.
    pub pwr_low: bool,
    /// Raw channel widths.
    pub widths: ChannelWidths,
    /// Drive and lights commands.
    pub output: MixOutput,
    /// Counter value at which the drive was released.
    pub released: Timestamp,
}

/// Single-owner context of the drive loop.
#[derive(Debug)]
pub struct Controller<'s, C, A, W, CH2, CH3, IN1, IN2, L, G, R>
where
    C: FreeRunningCounter,
    A: AnalogInput,
    W: WaitForInterrupt,
    CH2: InputPin,
    CH3: InputPin,
    IN1: OutputPin,
    IN2: OutputPin,
    L: OutputPin,
    G: OutputPin,
    R: OutputPin,
{
    cfg: Config,
    /// Current state machine stage
    pub stage: FrameStage,
    /// Free-running counter
    pub counter: C,
    /// Battery ADC
    pub adc: A,
    done: &'s ConversionSignal,
    idle: W,
    /// Receiver channels
    pub inputs: RcInputs<CH2, CH3>,
    /// Motor, lights and LEDs
    pub outputs: Outputs<IN1, IN2, L, G, R>,
    /// Battery classifier
    pub sampler: PowerSampler,
    /// Pulse width decoder
    pub decoder: PulseDecoder,
    /// Throttle and lights mixer
    pub mixer: Mixer,
    /// Completed frames
    pub frames: u32,
    /// Frames abandoned because of a hardware error
    pub errors: u16,
}

impl<'s, C, A, W, CH2, CH3, IN1, IN2, L, G, R> Controller<'s, C, A, W, CH2, CH3, IN1, IN2, L, G, R>
where
    C: FreeRunningCounter,
    A: AnalogInput,
    W: WaitForInterrupt,
    CH2: InputPin,
    CH3: InputPin,
    IN1: OutputPin,
    IN2: OutputPin,
    L: OutputPin,
    G: OutputPin,
    R: OutputPin,
{
    /// Assembles the loop from already configured peripherals.
    ///
    /// # Arguments
    /// - `cfg`: tuning, usually [`Config::DEFAULT`]
    /// - `counter`: the free-running time base
    /// - `adc`: battery input
    /// - `done`: signal notified by the ADC interrupt
    /// - `idle`: low-power wait used while a conversion runs
    /// - `inputs`: receiver channels
    /// - `outputs`: H-bridge (released by [`HBridge::new`]), lights and LEDs
    pub fn new(
        cfg: Config,
        counter: C,
        adc: A,
        done: &'s ConversionSignal,
        idle: W,
        inputs: RcInputs<CH2, CH3>,
        outputs: Outputs<IN1, IN2, L, G, R>,
    ) -> Self {
        Self {
            stage: FrameStage::WaitFrameStart,
            counter,
            adc,
            done,
            idle,
            inputs,
            outputs,
            sampler: PowerSampler::new(cfg.power),
            decoder: PulseDecoder::new(cfg.pulse.max),
            mixer: Mixer::new(&cfg),
            frames: 0,
            errors: 0,
            cfg,
        }
    }

    /// The configuration the loop was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs frames forever. Hardware errors abandon the current frame, leave
    /// the motor coasting and never stop the loop.
    pub fn run(&mut self) -> ! {
        info!("drive loop started");
        loop {
            if let Err(err) = self.run_frame() {
                self.recover(err);
            }
        }
    }

    /// Puts the loop back into a safe state after a failed frame.
    pub fn recover(&mut self, err: Error) {
        warn!("frame abandoned: {:?}", err);
        self.errors = self.errors.wrapping_add(1);
        let _ = self.outputs.bridge.release();
        self.stage = FrameStage::WaitFrameStart;
    }

    /// Runs one complete frame, from waiting for the throttle edge to
    /// releasing the drive.
    pub fn run_frame(&mut self) -> Result<FrameReport> {
        self.stage = FrameStage::WaitFrameStart;
        let start = self.wait_frame_start()?;

        self.stage = FrameStage::SamplePower;
        let power = self.sample_power()?;
        let pwr_low = self.sampler.pwr_low();

        self.stage = FrameStage::Decode;
        let widths = self.decoder.decode(
            start,
            &mut self.counter,
            &mut self.inputs.throttle,
            &mut self.inputs.aux,
        )?;

        self.stage = FrameStage::Mix;
        let output = self.mixer.mix(widths, pwr_low);
        self.drive_lights(output.aux)?;
        self.outputs.bridge.apply(output.drive.direction)?;

        self.stage = FrameStage::HoldDrive;
        let released = hold_until(start, output.drive.magnitude, &mut self.counter);

        self.stage = FrameStage::ReleaseDrive;
        self.outputs.bridge.release()?;

        self.frames = self.frames.wrapping_add(1);
        trace!(
            "frame {}: ch2 {:?} ch3 {:?} -> {:?} {} ticks, lights {}",
            self.frames,
            widths.throttle,
            widths.aux,
            output.drive.direction,
            output.drive.magnitude,
            output.aux.on
        );

        Ok(FrameReport {
            start,
            power,
            pwr_low,
            widths,
            output,
            released,
        })
    }

    /// Waits for the next throttle rising edge, servicing the battery monitor
    /// and the lights failsafe every idle interval.
    pub fn wait_frame_start(&mut self) -> Result<Timestamp> {
        loop {
            if let Some(start) = self.decoder.wait_frame_start(
                &mut self.counter,
                &mut self.inputs.throttle,
                self.cfg.idle_sample_ticks,
            )? {
                return Ok(start);
            }
            let _ = self.idle_poll()?;
        }
    }

    /// One idle tick without RC frames: sample the battery and advance the
    /// lights failsafe blink.
    pub fn idle_poll(&mut self) -> Result<PowerState> {
        let power = self.sample_power()?;
        let aux = self.mixer.aux(None);
        self.drive_lights(aux)?;
        Ok(power)
    }

    /// Takes one battery sample.
    pub fn sample_power(&mut self) -> Result<PowerState> {
        self.sampler.sample(
            &mut self.adc,
            self.done,
            &mut self.idle,
            &mut self.outputs.leds,
        )
    }

    fn drive_lights(&mut self, cmd: AuxCommand) -> Result<()> {
        if cmd.on {
            pin(self.outputs.lights.set_high())
        } else {
            pin(self.outputs.lights.set_low())
        }
    }
}
