//! RC pulse width acquisition.
//!
//! An RC receiver repeats one frame roughly every 20 ms. Within a frame each
//! channel line goes high once, and the width of that pulse (about 1 to 2 ms)
//! carries the stick position. This module measures the throttle (CH2) and
//! lights (CH3) pulses by polling both lines against the free-running counter.
//!
//! The throttle rising edge defines the frame start, see
//! [`PulseDecoder::wait_frame_start`]. [`PulseDecoder::decode`] then follows
//! both lines at once:
//!
//! - CH2 is high from the frame start; the first low sample ends its pulse.
//! - CH3 pulse starts at its first high sample after the frame start (with
//!   sequential receivers that is CH2's falling edge) and ends at the next
//!   low sample.
//! - A channel that does not finish within the timeout is reported as `None`,
//!   independently of the other one.
//!
//! Widths are raw elapsed ticks. Deciding whether a width is plausible is the
//! mixer's job.

use embedded_hal::digital::InputPin;

use crate::error::{Result, pin};
use crate::timer::{FreeRunningCounter, Ticks, Timestamp};

/// Measured widths for one frame. `None` means the channel timed out.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ChannelWidths {
    /// CH2, throttle
    pub throttle: Option<Ticks>,
    /// CH3, lights
    pub aux: Option<Ticks>,
}

// Per-channel capture progress within one frame.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Capture {
    // Waiting for the line to go high.
    Armed,
    // Line went high at the given time.
    High(Timestamp),
    // Captured or timed out; never overwritten.
    Done(Option<Ticks>),
}

impl Capture {
    fn is_done(&self) -> bool {
        matches!(self, Capture::Done(_))
    }

    fn poll(self, now: Timestamp, high: bool, frame_start: Timestamp, timeout: Ticks) -> Self {
        match self {
            Capture::Armed if high => Capture::High(now),
            Capture::Armed if now - frame_start > timeout => Capture::Done(None),
            Capture::High(since) if !high => Capture::Done(Some(now - since)),
            Capture::High(since) if now - since > timeout => Capture::Done(None),
            other => other,
        }
    }

    fn width(self) -> Option<Ticks> {
        match self {
            Capture::Done(width) => width,
            _ => None,
        }
    }
}

/// Two-channel pulse width decoder.
#[derive(Debug)]
pub struct PulseDecoder {
    timeout: Ticks,
    /// Whether CH2 has been seen low since the last frame start.
    armed: bool,
    /// Frames in which the throttle channel timed out.
    pub throttle_timeouts: u16,
    /// Frames in which the lights channel timed out.
    pub aux_timeouts: u16,
}

impl PulseDecoder {
    /// Creates a decoder that gives up on a channel after `timeout` ticks.
    pub fn new(timeout: Ticks) -> Self {
        Self {
            timeout,
            armed: false,
            throttle_timeouts: 0,
            aux_timeouts: 0,
        }
    }

    /// Looks for the next CH2 rising edge for at most `max_wait` ticks.
    ///
    /// The line must be seen low before a high sample counts as an edge, so a
    /// pulse already in progress is skipped. That state is kept across calls.
    ///
    /// # Returns
    /// - `Some(timestamp)` of the first high sample: the frame start.
    /// - `None` if `max_wait` elapsed first. Call again to keep waiting.
    pub fn wait_frame_start<C, P>(
        &mut self,
        counter: &mut C,
        ch2: &mut P,
        max_wait: Ticks,
    ) -> Result<Option<Timestamp>>
    where
        C: FreeRunningCounter,
        P: InputPin,
    {
        let entered = counter.now();
        loop {
            let now = counter.now();
            if pin(ch2.is_high())? {
                if self.armed {
                    self.armed = false;
                    return Ok(Some(now));
                }
            } else {
                self.armed = true;
            }
            if now - entered >= max_wait {
                return Ok(None);
            }
        }
    }

    /// Measures both channel pulses of the frame that started at `frame_start`.
    ///
    /// Returns once each channel has either been captured or timed out, which
    /// takes at most about twice the timeout.
    pub fn decode<C, P2, P3>(
        &mut self,
        frame_start: Timestamp,
        counter: &mut C,
        ch2: &mut P2,
        ch3: &mut P3,
    ) -> Result<ChannelWidths>
    where
        C: FreeRunningCounter,
        P2: InputPin,
        P3: InputPin,
    {
        let mut throttle = Capture::High(frame_start);
        let mut aux = Capture::Armed;

        while !(throttle.is_done() && aux.is_done()) {
            let now = counter.now();
            if !throttle.is_done() {
                let high = pin(ch2.is_high())?;
                throttle = throttle.poll(now, high, frame_start, self.timeout);
            }
            if !aux.is_done() {
                let high = pin(ch3.is_high())?;
                aux = aux.poll(now, high, frame_start, self.timeout);
            }
        }

        let widths = ChannelWidths {
            throttle: throttle.width(),
            aux: aux.width(),
        };
        if widths.throttle.is_none() {
            self.throttle_timeouts = self.throttle_timeouts.wrapping_add(1);
            trace!("throttle channel timed out");
        }
        if widths.aux.is_none() {
            self.aux_timeouts = self.aux_timeouts.wrapping_add(1);
            trace!("aux channel timed out");
        }
        Ok(widths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_TICKS;
    use crate::sim::{SimClock, SimInput};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn decode_at(
        start: u32,
        ch2: &[(u32, u32)],
        ch3: &[(u32, u32)],
    ) -> (ChannelWidths, SimClock) {
        let clock = SimClock::starting_at(start);
        let mut counter = clock.clone();
        let mut p2 = SimInput::new(&clock, ch2);
        let mut p3 = SimInput::new(&clock, ch3);
        let mut decoder = PulseDecoder::new(MAX_TICKS);
        let frame_start = Timestamp(start as u16);
        let widths = decoder
            .decode(frame_start, &mut counter, &mut p2, &mut p3)
            .unwrap();
        (widths, clock)
    }

    #[test]
    fn test_sequential_channels() {
        // CH2 1500 ticks, CH3 follows immediately for 1200 ticks.
        let (widths, _) = decode_at(1000, &[(1000, 2500)], &[(2500, 3700)]);
        assert_eq!(widths.throttle, Some(1500));
        assert_eq!(widths.aux, Some(1200));
    }

    #[test]
    fn test_parallel_channels() {
        let (widths, _) = decode_at(1000, &[(1000, 2100)], &[(1000, 2800)]);
        assert_eq!(widths.throttle, Some(1100));
        // CH3 rise is first observed one poll after the frame start.
        assert_eq!(widths.aux, Some(1799));
    }

    #[test]
    fn test_widths_across_counter_wrap() {
        let start = 0xffff - 700;
        let (widths, _) = decode_at(start, &[(start, start + 1900)], &[(start + 1900, start + 3000)]);
        assert_eq!(widths.throttle, Some(1900));
        assert_eq!(widths.aux, Some(1100));
    }

    #[test]
    fn test_stuck_high_throttle_only_loses_throttle() {
        let (widths, _) = decode_at(0, &[(0, 100_000)], &[(300, 1700)]);
        assert_eq!(widths.throttle, None);
        assert_eq!(widths.aux, Some(1400));
    }

    #[test]
    fn test_missing_aux_only_loses_aux() {
        let (widths, clock) = decode_at(0, &[(0, 1600)], &[]);
        assert_eq!(widths.throttle, Some(1600));
        assert_eq!(widths.aux, None);
        // gave up shortly after the timeout
        assert!(clock.ticks() <= MAX_TICKS as u32 + 2);
    }

    #[test]
    fn test_stuck_high_aux_times_out() {
        let (widths, _) = decode_at(0, &[(0, 1500)], &[(0, 100_000)]);
        assert_eq!(widths.throttle, Some(1500));
        assert_eq!(widths.aux, None);
    }

    #[test]
    fn test_both_missing_bounded_latency() {
        let (widths, clock) = decode_at(0, &[(0, 100_000)], &[(2000, 100_000)]);
        assert_eq!(widths, ChannelWidths::default());
        assert!(clock.ticks() <= 2 * MAX_TICKS as u32 + 2);
    }

    #[test]
    fn test_out_of_range_widths_reported_raw() {
        let (widths, _) = decode_at(0, &[(0, 300)], &[(300, 700)]);
        assert_eq!(widths.throttle, Some(300));
        assert_eq!(widths.aux, Some(400));
    }

    #[test]
    fn test_timeout_counters() {
        let clock = SimClock::starting_at(0);
        let mut counter = clock.clone();
        let mut p2 = SimInput::new(&clock, &[(0, 100_000)]);
        let mut p3 = SimInput::new(&clock, &[]);
        let mut decoder = PulseDecoder::new(MAX_TICKS);
        let _ = decoder
            .decode(Timestamp(0), &mut counter, &mut p2, &mut p3)
            .unwrap();
        assert_eq!(decoder.throttle_timeouts, 1);
        assert_eq!(decoder.aux_timeouts, 1);
    }

    #[test]
    fn test_wait_frame_start_needs_low_first() {
        // Line high at entry (pulse in progress), low at 500, rises again at 20000.
        let clock = SimClock::starting_at(0);
        let mut counter = clock.clone();
        let mut ch2 = SimInput::new(&clock, &[(0, 500), (20_000, 21_500)]);
        let mut decoder = PulseDecoder::new(MAX_TICKS);
        let start = decoder
            .wait_frame_start(&mut counter, &mut ch2, 50_000)
            .unwrap();
        assert_eq!(start, Some(Timestamp(20_000)));
    }

    #[test]
    fn test_wait_frame_start_gives_up_after_max_wait() {
        let clock = SimClock::starting_at(0);
        let mut counter = clock.clone();
        let mut ch2 = SimInput::new(&clock, &[]);
        let mut decoder = PulseDecoder::new(MAX_TICKS);
        assert_eq!(
            decoder.wait_frame_start(&mut counter, &mut ch2, 1000).unwrap(),
            None
        );
        assert!(decoder.armed);
    }

    #[test]
    fn test_wait_frame_start_with_pin_mock() {
        let mut ch2 = PinMock::new(&[
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
        ]);
        let mut t = 0u16;
        let mut counter = || {
            t += 1;
            t
        };
        let mut decoder = PulseDecoder::new(MAX_TICKS);
        let start = decoder
            .wait_frame_start(&mut counter, &mut ch2, 1000)
            .unwrap();
        assert_eq!(start, Some(Timestamp(4)));
        ch2.done();
    }
}
