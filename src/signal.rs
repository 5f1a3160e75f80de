//! Conversion-complete wake signal and the analog input seam.
//!
//! The battery sampler is the only place where the loop suspends. It starts a
//! conversion and then parks the processor until the ADC interrupt fires. The
//! interrupt handler does no processing at all, it only calls
//! [`ConversionSignal::notify`], which releases exactly one pending
//! [`ConversionSignal::wait`].
//!
//! # Example
//! ```rust,ignore
//! use rcdrive::signal::ConversionSignal;
//!
//! static ADC_DONE: ConversionSignal = ConversionSignal::new();
//!
//! #[interrupt]
//! fn ADC10() {
//!     ADC_DONE.notify();
//! }
//! ```

use core::cell::Cell;
use critical_section::Mutex;

/// One-shot, payload-free wake notification shared between the main loop and an ISR.
#[derive(Debug)]
pub struct ConversionSignal {
    pending: Mutex<Cell<bool>>,
}

impl ConversionSignal {
    /// Creates a signal with no notification pending.
    ///
    /// `const` so it can back a `static`.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Marks the conversion as complete. Call this from the ADC interrupt.
    pub fn notify(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(true));
    }

    /// Consumes a pending notification, if there is one.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(false))
    }

    /// Whether a notification is pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).get())
    }

    /// Drops any stale notification.
    pub fn clear(&self) {
        let _ = self.take();
    }

    /// Blocks until a notification arrives and consumes it.
    ///
    /// The pending check and `idle` run inside one critical section, so the
    /// interrupt cannot slip in between them. `idle` is therefore entered with
    /// interrupts masked and must still wake on a pending one: `wfi` on
    /// Cortex-M does, as does setting `CPUOFF | GIE` in one instruction on
    /// MSP430. The interrupt is serviced once the section ends and the flag is
    /// checked again.
    pub fn wait<W: WaitForInterrupt>(&self, idle: &mut W) {
        loop {
            let done = critical_section::with(|cs| {
                if self.pending.borrow(cs).replace(false) {
                    return true;
                }
                idle.wait_for_interrupt();
                false
            });
            if done {
                return;
            }
        }
    }
}

impl Default for ConversionSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the processor into a low-power wait until the next interrupt.
///
/// Called with interrupts masked. Implementations must return once an
/// interrupt is pending, even though it has not been serviced yet.
pub trait WaitForInterrupt {
    /// Sleeps until an interrupt is pending.
    fn wait_for_interrupt(&mut self);
}

impl<F> WaitForInterrupt for F
where
    F: FnMut(),
{
    #[inline]
    fn wait_for_interrupt(&mut self) {
        self()
    }
}

/// A single-ended analog input sampled one conversion at a time.
///
/// Mirrors the one-shot ADC shape of `embedded-hal` 0.2: start, then poll the
/// result with `nb` semantics.
pub trait AnalogInput {
    /// Error reported by the converter.
    type Error: core::fmt::Debug;

    /// Starts a single conversion. Completion is signalled by the ADC interrupt.
    fn start_conversion(&mut self) -> Result<(), Self::Error>;

    /// Returns the raw result, or `WouldBlock` while the conversion is still running.
    fn read(&mut self) -> nb::Result<u16, Self::Error>;
}
