//! Error types for the OLED front end.

use core::fmt;

use display_interface::DisplayError;

/// Errors raised while bringing up or drawing to the OLED.
///
/// Bus failures arrive already wrapped in [`DisplayError`] by the
/// `ssd1306` crate, so the I2C error type does not leak into this enum.
#[derive(Debug)]
pub enum OledError {
    /// Display interface error (I2C and other bus-level failures).
    Display(DisplayError),
    /// The controller did not accept the initialisation sequence.
    InitializationFailed,
    /// Drawing or flushing was attempted before
    /// [`OledDriver::init()`](crate::OledDriver::init) succeeded.
    NotInitialized,
}

impl From<DisplayError> for OledError {
    fn from(e: DisplayError) -> Self {
        OledError::Display(e)
    }
}

impl fmt::Display for OledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OledError::Display(e) => write!(f, "Display interface error: {:?}", e),
            OledError::InitializationFailed => write!(f, "OLED initialisation failed"),
            OledError::NotInitialized => write!(f, "OLED not initialised"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for OledError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            OledError::Display(_e) => defmt::write!(f, "Display interface error"),
            OledError::InitializationFailed => defmt::write!(f, "Initialization failed"),
            OledError::NotInitialized => defmt::write!(f, "Not initialized"),
        }
    }
}
