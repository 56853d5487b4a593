//! Error types for the clock and EEPROM drivers.

use core::fmt;

/// Errors that can occur when talking to the DS3231 or the AT24C32.
#[derive(Debug)]
pub enum PeripheralError<E> {
    /// Underlying I2C bus error.
    I2c(E),

    /// EEPROM access would run past the end of the array.
    OutOfRange,

    /// Date/time cannot be represented by the DS3231 registers
    /// (year outside 2000–2099 or a field out of range).
    InvalidDateTime,
}

// Allow ergonomic `?` propagation from raw I2C errors.
impl<E> From<E> for PeripheralError<E> {
    fn from(error: E) -> Self {
        PeripheralError::I2c(error)
    }
}

impl<E: fmt::Debug> fmt::Display for PeripheralError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PeripheralError::I2c(e) => write!(f, "I2C error: {:?}", e),
            PeripheralError::OutOfRange => write!(f, "EEPROM address out of range"),
            PeripheralError::InvalidDateTime => write!(f, "Date/time not representable by the RTC"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for PeripheralError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            PeripheralError::I2c(e) => defmt::write!(f, "I2C error: {}", e),
            PeripheralError::OutOfRange => defmt::write!(f, "EEPROM address out of range"),
            PeripheralError::InvalidDateTime => defmt::write!(f, "Invalid date/time"),
        }
    }
}
