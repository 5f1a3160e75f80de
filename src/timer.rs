//! Time base: free-running 16-bit counter timestamps and tick conversions.
//!
//! Every timing decision in the crate is made against a single free-running
//! hardware counter that wraps modulo 2^16. Elapsed time is always computed
//! with wrapping subtraction, which yields the correct forward distance as
//! long as the true interval is shorter than one counter period.
//!
//! Common clock setups (for use with [`micros_to_ticks`]):
//!
//! | COUNTER CLOCK | TICK   | Counter period |
//! |---------------|--------|----------------|
//! |         1 MHz | 1 µs   |       65.5 ms  |
//! |       500 kHz | 2 µs   |      131.1 ms  |
//! |       250 kHz | 4 µs   |      262.1 ms  |

use core::ops::{Add, Sub};

/// A duration, in counter ticks.
pub type Ticks = u16;

/// A raw reading of the free-running counter.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Timestamp(pub u16);

impl Timestamp {
    /// Creates a timestamp from a raw counter value.
    #[inline]
    pub const fn from_ticks(ticks: u16) -> Self {
        Timestamp(ticks)
    }

    /// Ticks elapsed from `earlier` to `self`, modulo 2^16.
    #[inline]
    pub const fn since(self, earlier: Timestamp) -> Ticks {
        self.0.wrapping_sub(earlier.0)
    }
}

impl Sub for Timestamp {
    type Output = Ticks;

    #[inline]
    fn sub(self, other: Self) -> Ticks {
        self.since(other)
    }
}

impl Add<Ticks> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, ticks: Ticks) -> Self {
        Timestamp(self.0.wrapping_add(ticks))
    }
}

/// A free-running counter, configured once at startup.
///
/// Implement this for the board's timer peripheral (e.g. a 16-bit timer in
/// continuous mode clocked from SMCLK).
pub trait FreeRunningCounter {
    /// Returns the current counter value.
    fn now(&mut self) -> Timestamp;
}

impl<F> FreeRunningCounter for F
where
    F: FnMut() -> u16,
{
    #[inline]
    fn now(&mut self) -> Timestamp {
        Timestamp(self())
    }
}

/// Converts microseconds to counter ticks at compile time.
///
/// # Arguments
/// - `timer_hz`: counter clock in Hz
/// - `us`: duration in microseconds
///
/// # Returns
/// - The duration in ticks, truncated. Saturates at `u16::MAX`.
pub const fn micros_to_ticks(timer_hz: u32, us: u32) -> Ticks {
    let ticks = timer_hz as u64 * us as u64 / 1_000_000;
    if ticks > u16::MAX as u64 {
        u16::MAX
    } else {
        ticks as u16
    }
}
