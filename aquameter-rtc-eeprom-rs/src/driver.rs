//! Register-addressed I2C primitives shared by the DS3231 and AT24C32.
//!
//! Both chips take a register (DS3231, one byte) or memory address
//! (AT24C32, two bytes big-endian) as the first bytes of every write, and
//! answer reads with a repeated-start `write_read`.
//!
//! This module is crate-private — consumers use [`Ds3231`](crate::Ds3231)
//! and [`At24c32`](crate::At24c32).

use embedded_hal_async::i2c::I2c;

use crate::error::PeripheralError;
use crate::registers::AT24C32_PAGE_SIZE;

/// Longest register prefix: the AT24C32's two-byte memory address.
const MAX_PREFIX: usize = 2;

/// Owns one I2C device handle and its 7-bit address.
pub(crate) struct RegisterDriver<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> RegisterDriver<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Point the chip at `register`, then read `buffer.len()` bytes.
    pub async fn read(
        &mut self,
        register: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), PeripheralError<I2C::Error>> {
        self.i2c.write_read(self.address, register, buffer).await?;
        Ok(())
    }

    /// Send `register` followed by `data` in one write transaction.
    ///
    /// `data` must fit one EEPROM page; longer payloads are rejected with
    /// [`PeripheralError::OutOfRange`].
    pub async fn write(
        &mut self,
        register: &[u8],
        data: &[u8],
    ) -> Result<(), PeripheralError<I2C::Error>> {
        let len = register.len() + data.len();
        if register.len() > MAX_PREFIX || data.len() > AT24C32_PAGE_SIZE {
            return Err(PeripheralError::OutOfRange);
        }

        // [prefix.., payload..]
        let mut buf = [0u8; MAX_PREFIX + AT24C32_PAGE_SIZE];
        buf[..register.len()].copy_from_slice(register);
        buf[register.len()..len].copy_from_slice(data);

        self.i2c.write(self.address, &buf[..len]).await?;
        Ok(())
    }
}
