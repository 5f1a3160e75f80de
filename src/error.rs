//! Error type shared by the drive loop components.

/// Failures reported by the hardware behind the drive loop.
///
/// None of these are fatal. [`Controller::run`](crate::controller::Controller::run)
/// logs them, forces the motor to coast and carries on with the next frame.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// Reading or writing a digital pin failed.
    #[error("digital pin access failed")]
    Pin,
    /// The battery ADC reported a failure.
    #[error("analog conversion failed")]
    Adc,
}

/// Result alias for the drive loop.
pub type Result<T> = core::result::Result<T, Error>;

pub(crate) fn pin<T, E>(res: core::result::Result<T, E>) -> Result<T> {
    res.map_err(|_| Error::Pin)
}
