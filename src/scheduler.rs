//! H-bridge output and the per-frame drive pulse.
//!
//! The motor does not see a free-running PWM carrier. Instead, each RC frame
//! produces exactly one drive pulse: the direction line is asserted right after
//! mixing and [`hold_and_release`] drops it once `magnitude` ticks have passed
//! since the frame start. The pulse width relative to the frame period is the
//! effective duty cycle.
//!
//! ## Truth table
//!
//! | IN1 | IN2 | Motor                      |
//! |-----|-----|----------------------------|
//! | 0   | 0   | Coast                      |
//! | 1   | 0   | Forward                    |
//! | 0   | 1   | Reverse                    |
//! | 1   | 1   | never driven by this crate |

use embedded_hal::digital::OutputPin;

use crate::error::{Result, pin};
use crate::mixer::Direction;
use crate::timer::{FreeRunningCounter, Ticks, Timestamp};

/// Two-pin H-bridge control.
#[derive(Debug)]
pub struct HBridge<IN1, IN2>
where
    IN1: OutputPin,
    IN2: OutputPin,
{
    /// Forward line
    pub in1: IN1,
    /// Reverse line
    pub in2: IN2,
    direction: Direction,
}

impl<IN1, IN2> HBridge<IN1, IN2>
where
    IN1: OutputPin,
    IN2: OutputPin,
{
    /// Takes the two control pins and drives both low.
    pub fn new(in1: IN1, in2: IN2) -> Self {
        let mut bridge = Self {
            in1,
            in2,
            direction: Direction::Coast,
        };
        let _ = bridge.release();
        bridge
    }

    /// Asserts the line for `direction`. The opposite line is always dropped
    /// first, so both are never high at the same time.
    pub fn apply(&mut self, direction: Direction) -> Result<()> {
        match direction {
            Direction::Forward => {
                pin(self.in2.set_low())?;
                pin(self.in1.set_high())?;
            }
            Direction::Reverse => {
                pin(self.in1.set_low())?;
                pin(self.in2.set_high())?;
            }
            Direction::Coast => return self.release(),
        }
        self.direction = direction;
        Ok(())
    }

    /// Drops both lines.
    pub fn release(&mut self) -> Result<()> {
        self.direction = Direction::Coast;
        let in1 = pin(self.in1.set_low());
        let in2 = pin(self.in2.set_low());
        in1.and(in2)
    }

    /// The direction currently asserted.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Spins until `duration` ticks have passed since `frame_start`.
///
/// Returns the first counter value at or past the deadline. If the frame is
/// already older than `duration` that is the first value read.
pub fn hold_until<C>(frame_start: Timestamp, duration: Ticks, counter: &mut C) -> Timestamp
where
    C: FreeRunningCounter,
{
    loop {
        let now = counter.now();
        if now - frame_start >= duration {
            return now;
        }
    }
}

/// [`hold_until`], then releases the bridge.
///
/// Returns the counter value at which the bridge was released.
pub fn hold_and_release<C, IN1, IN2>(
    frame_start: Timestamp,
    duration: Ticks,
    counter: &mut C,
    bridge: &mut HBridge<IN1, IN2>,
) -> Result<Timestamp>
where
    C: FreeRunningCounter,
    IN1: OutputPin,
    IN2: OutputPin,
{
    let released = hold_until(frame_start, duration, counter);
    bridge.release()?;
    Ok(released)
}
