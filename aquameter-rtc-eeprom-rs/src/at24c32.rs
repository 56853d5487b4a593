//! AT24C32 serial EEPROM.

use core::ops::Range;

use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use aquameter::accounting::Storage;

use crate::driver::RegisterDriver;
use crate::error::PeripheralError;
use crate::registers::{AT24C32_CAPACITY, AT24C32_PAGE_SIZE, AT24C32_WRITE_CYCLE_MS};

/// Async interface for the AT24C32 4 KiB EEPROM.
///
/// Writes of any length are split on 32-byte page boundaries; after each
/// page the driver waits out the chip's self-timed write cycle, so callers
/// never see a NAK from a busy chip.
///
/// # Example
///
/// ```ignore
/// use meter_peripherals::{At24c32, AT24C32_ADDRESS};
///
/// let mut eeprom = At24c32::new(i2c, AT24C32_ADDRESS);
/// eeprom.write(30, &120u32.to_ne_bytes()).await?;
/// ```
pub struct At24c32<I2C> {
    driver: RegisterDriver<I2C>,
}

impl<I2C> At24c32<I2C>
where
    I2C: I2c,
{
    /// # Arguments
    /// * `i2c` — I2C device handle
    /// * `address` — 7-bit I2C address (`0x57` on DS3231 modules)
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            driver: RegisterDriver::new(i2c, address),
        }
    }

    /// Sequential read of `buffer.len()` bytes starting at `address`.
    ///
    /// # Errors
    /// * [`PeripheralError::OutOfRange`] if the read runs past the array
    /// * [`PeripheralError::I2c`] on communication failure
    pub async fn read(
        &mut self,
        address: u16,
        buffer: &mut [u8],
    ) -> Result<(), PeripheralError<I2C::Error>> {
        check_range(address, buffer.len())?;
        self.driver.read(&address.to_be_bytes(), buffer).await
    }

    /// Write `data` starting at `address`, one page at a time.
    ///
    /// # Errors
    /// * [`PeripheralError::OutOfRange`] if the write runs past the array;
    ///   nothing is written in that case
    /// * [`PeripheralError::I2c`] on communication failure; pages before
    ///   the failing one are already committed
    pub async fn write(
        &mut self,
        address: u16,
        data: &[u8],
    ) -> Result<(), PeripheralError<I2C::Error>> {
        check_range(address, data.len())?;

        for (page_address, span) in page_chunks(address, data.len()) {
            self.driver
                .write(&page_address.to_be_bytes(), &data[span])
                .await?;
            Timer::after(Duration::from_millis(AT24C32_WRITE_CYCLE_MS)).await;
        }

        Ok(())
    }
}

impl<I2C> Storage for At24c32<I2C>
where
    I2C: I2c,
{
    /// Zero-fills `buf` on a bus failure.
    async fn read_bytes(&mut self, address: u16, buf: &mut [u8]) {
        if let Err(_e) = self.read(address, buf).await {
            #[cfg(feature = "defmt")]
            defmt::error!("EEPROM read at {} failed: {}", address, defmt::Debug2Format(&_e));
            buf.fill(0);
        }
    }

    async fn write_bytes(&mut self, address: u16, data: &[u8]) {
        if let Err(_e) = self.write(address, data).await {
            #[cfg(feature = "defmt")]
            defmt::error!("EEPROM write at {} failed: {}", address, defmt::Debug2Format(&_e));
        }
    }
}

fn check_range<E>(address: u16, len: usize) -> Result<(), PeripheralError<E>> {
    if address as usize + len > AT24C32_CAPACITY {
        return Err(PeripheralError::OutOfRange);
    }
    Ok(())
}

/// Split `len` bytes written at `address` into page-aligned pieces.
///
/// Yields `(chip address, span of the source slice)`.
fn page_chunks(address: u16, len: usize) -> impl Iterator<Item = (u16, Range<usize>)> {
    let mut offset = 0;
    core::iter::from_fn(move || {
        if offset >= len {
            return None;
        }
        let chip_address = address as usize + offset;
        let room = AT24C32_PAGE_SIZE - chip_address % AT24C32_PAGE_SIZE;
        let end = (offset + room).min(len);
        let chunk = (chip_address as u16, offset..end);
        offset = end;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(address: u16, len: usize) -> ([(u16, Range<usize>); 8], usize) {
        let mut out: [(u16, Range<usize>); 8] = Default::default();
        let mut count = 0;
        for chunk in page_chunks(address, len) {
            out[count] = chunk;
            count += 1;
        }
        (out, count)
    }

    #[test]
    fn field_inside_one_page_is_one_write() {
        let (out, count) = chunks(4, 4);
        assert_eq!(count, 1);
        assert_eq!(out[0], (4, 0..4));
    }

    #[test]
    fn field_across_boundary_is_split() {
        // A u32 at offset 30 spans pages 0 and 1.
        let (out, count) = chunks(30, 4);
        assert_eq!(count, 2);
        assert_eq!(out[0], (30, 0..2));
        assert_eq!(out[1], (32, 2..4));
    }

    #[test]
    fn whole_memory_map_is_split_on_every_page() {
        let (out, count) = chunks(0, 150);
        assert_eq!(count, 5);
        assert_eq!(out[0], (0, 0..32));
        assert_eq!(out[3], (96, 96..128));
        assert_eq!(out[4], (128, 128..150));
    }

    #[test]
    fn empty_write_yields_nothing() {
        assert_eq!(chunks(10, 0).1, 0);
    }

    #[test]
    fn range_check_covers_last_byte() {
        assert!(check_range::<()>(4095, 1).is_ok());
        assert!(matches!(check_range::<()>(4095, 2), Err(PeripheralError::OutOfRange)));
        assert!(check_range::<()>(0, AT24C32_CAPACITY).is_ok());
    }
}
