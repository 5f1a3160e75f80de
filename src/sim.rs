//! Test bench: a simulated counter, scripted inputs, recording outputs and a
//! scripted ADC sharing one timeline.
//!
//! The clock keeps the true (unwrapped) time in a `u32` and hands out the low
//! 16 bits as the counter value. Every counter read advances time by one tick;
//! pins sample the line at the time of the latest counter read.
#![allow(dead_code)]

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::signal::AnalogInput;
use crate::timer::{FreeRunningCounter, Timestamp};

#[derive(Clone, Debug)]
pub(crate) struct SimClock {
    t: Rc<Cell<u32>>,
}

impl SimClock {
    pub(crate) fn starting_at(t: u32) -> Self {
        Self {
            t: Rc::new(Cell::new(t)),
        }
    }

    /// True time, not wrapped.
    pub(crate) fn ticks(&self) -> u32 {
        self.t.get()
    }
}

impl FreeRunningCounter for SimClock {
    fn now(&mut self) -> Timestamp {
        self.t.set(self.t.get() + 1);
        Timestamp(self.t.get() as u16)
    }
}

/// An input line that is high inside the half-open `[rise, fall)` intervals.
#[derive(Debug)]
pub(crate) struct SimInput {
    clock: SimClock,
    high: Vec<(u32, u32)>,
}

impl SimInput {
    pub(crate) fn new(clock: &SimClock, high: &[(u32, u32)]) -> Self {
        Self {
            clock: clock.clone(),
            high: high.to_vec(),
        }
    }

    /// A receiver repeating `frames` frames of `period` ticks, each pulse
    /// starting `offset` ticks into its frame and lasting `width` ticks.
    pub(crate) fn repeating(
        clock: &SimClock,
        first: u32,
        period: u32,
        frames: u32,
        offset: u32,
        width: u32,
    ) -> Self {
        let high = (0..frames)
            .map(|i| {
                let rise = first + i * period + offset;
                (rise, rise + width)
            })
            .collect::<Vec<_>>();
        Self::new(clock, &high)
    }
}

impl ErrorType for SimInput {
    type Error = Infallible;
}

impl InputPin for SimInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let t = self.clock.ticks();
        Ok(self.high.iter().any(|&(rise, fall)| rise <= t && t < fall))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// An output line recording every write as `(true time, level)`.
#[derive(Clone, Debug)]
pub(crate) struct SimOutput {
    clock: Option<SimClock>,
    log: Rc<RefCell<Vec<(u32, bool)>>>,
    fail_low_from: Option<u32>,
}

impl SimOutput {
    pub(crate) fn new(clock: &SimClock) -> Self {
        Self {
            clock: Some(clock.clone()),
            log: Rc::new(RefCell::new(Vec::new())),
            fail_low_from: None,
        }
    }

    /// An output whose `set_low` fails from time `t` on.
    pub(crate) fn failing_low_from(clock: &SimClock, t: u32) -> Self {
        Self {
            fail_low_from: Some(t),
            ..Self::new(clock)
        }
    }

    /// An output without a timeline, for tests that only care about levels.
    pub(crate) fn detached() -> Self {
        Self {
            clock: None,
            log: Rc::new(RefCell::new(Vec::new())),
            fail_low_from: None,
        }
    }

    pub(crate) fn writes(&self) -> Vec<(u32, bool)> {
        self.log.borrow().clone()
    }

    pub(crate) fn level(&self) -> bool {
        self.log.borrow().last().is_some_and(|&(_, level)| level)
    }

    /// Times at which the line went from low to high.
    pub(crate) fn rises(&self) -> Vec<u32> {
        let mut level = false;
        let mut rises = Vec::new();
        for &(t, l) in self.log.borrow().iter() {
            if l && !level {
                rises.push(t);
            }
            level = l;
        }
        rises
    }

    /// Times at which the line went from high to low.
    pub(crate) fn falls(&self) -> Vec<u32> {
        let mut level = false;
        let mut falls = Vec::new();
        for &(t, l) in self.log.borrow().iter() {
            if !l && level {
                falls.push(t);
            }
            level = l;
        }
        falls
    }

    fn now(&self) -> u32 {
        self.clock.as_ref().map_or(0, SimClock::ticks)
    }

    fn write(&mut self, level: bool) {
        let t = self.now();
        self.log.borrow_mut().push((t, level));
    }
}

impl ErrorType for SimOutput {
    type Error = ErrorKind;
}

impl OutputPin for SimOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail_low_from.is_some_and(|t| self.now() >= t) {
            return Err(ErrorKind::Other);
        }
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

/// Scripted ADC. Cycles through `values`; each conversion reports
/// `WouldBlock` once before yielding its result.
#[derive(Debug)]
pub(crate) struct SimAdc {
    values: Vec<u16>,
    next: usize,
    busy: bool,
    fail: bool,
    pub(crate) conversions: u32,
}

impl SimAdc {
    pub(crate) fn new(values: &[u16]) -> Self {
        Self {
            values: values.to_vec(),
            next: 0,
            busy: false,
            fail: false,
            conversions: 0,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[0])
        }
    }
}

impl AnalogInput for SimAdc {
    type Error = ();

    fn start_conversion(&mut self) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.conversions += 1;
        self.busy = true;
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u16, ()> {
        if self.busy {
            self.busy = false;
            return Err(nb::Error::WouldBlock);
        }
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        Ok(value)
    }
}
