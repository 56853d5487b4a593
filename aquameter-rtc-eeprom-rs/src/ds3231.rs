//! DS3231 real-time clock.

use embedded_hal_async::i2c::I2c;

use aquameter::accounting::{Clock, DateTime};

use crate::bcd;
use crate::driver::RegisterDriver;
use crate::error::PeripheralError;
use crate::registers::{
    DS3231_TEMP_MSB, DS3231_TIME, DS3231_TIME_LEN, HOURS_MASK, MONTH_MASK, SECONDS_MASK,
};

/// Async interface for the DS3231 real-time clock.
///
/// The clock is assumed to run in 24-hour mode with the century bit
/// ignored: years are reported as 2000–2099.
///
/// Through [`Clock`], a failed read returns the last time that was read
/// successfully, so a single bus error cannot look like a day or month
/// change.
///
/// # Example
///
/// ```ignore
/// use meter_peripherals::{Ds3231, DS3231_ADDRESS};
///
/// let mut rtc = Ds3231::new(i2c, DS3231_ADDRESS);
/// let now = rtc.read_datetime().await?;
/// let celsius = rtc.read_temperature().await?;
/// ```
pub struct Ds3231<I2C> {
    driver: RegisterDriver<I2C>,
    last_read: Option<DateTime>,
}

impl<I2C> Ds3231<I2C>
where
    I2C: I2c,
{
    /// # Arguments
    /// * `i2c` — I2C device handle
    /// * `address` — 7-bit I2C address (always `0x68` on this chip)
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            driver: RegisterDriver::new(i2c, address),
            last_read: None,
        }
    }

    /// Read all seven timekeeping registers in one burst.
    ///
    /// # Errors
    /// * [`PeripheralError::I2c`] on communication failure
    pub async fn read_datetime(&mut self) -> Result<DateTime, PeripheralError<I2C::Error>> {
        let mut regs = [0u8; DS3231_TIME_LEN];
        self.driver.read(&[DS3231_TIME], &mut regs).await?;
        Ok(decode_datetime(&regs))
    }

    /// Set the clock. Used for provisioning; the meter itself never writes
    /// the time.
    ///
    /// # Errors
    /// * [`PeripheralError::InvalidDateTime`] if `datetime` cannot be
    ///   stored (see [`encode_datetime()`])
    /// * [`PeripheralError::I2c`] on communication failure
    pub async fn set_datetime(
        &mut self,
        datetime: &DateTime,
    ) -> Result<(), PeripheralError<I2C::Error>> {
        let regs = encode_datetime(datetime).ok_or(PeripheralError::InvalidDateTime)?;
        self.driver.write(&[DS3231_TIME], &regs).await
    }

    /// Die temperature in °C, 0.25 °C resolution.
    pub async fn read_temperature(&mut self) -> Result<f32, PeripheralError<I2C::Error>> {
        let mut regs = [0u8; 2];
        self.driver.read(&[DS3231_TEMP_MSB], &mut regs).await?;
        Ok(decode_temperature(regs[0], regs[1]))
    }
}

impl<I2C> Clock for Ds3231<I2C>
where
    I2C: I2c,
{
    /// Falls back to the last good reading on a bus failure, or to an
    /// all-zero date if the clock has never been read.
    async fn now(&mut self) -> DateTime {
        match self.read_datetime().await {
            Ok(datetime) => {
                self.last_read = Some(datetime);
                datetime
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("RTC read failed: {}", defmt::Debug2Format(&_e));
                self.last_read.unwrap_or_default()
            }
        }
    }

    /// Falls back to 0.0 °C on a bus failure.
    async fn temperature(&mut self) -> f32 {
        match self.read_temperature().await {
            Ok(celsius) => celsius,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("RTC temperature read failed: {}", defmt::Debug2Format(&_e));
                0.0
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Register codec
// ---------------------------------------------------------------------------

/// Decode registers `0x00..=0x06`. Control bits (clock halt, 12/24,
/// century) are masked off.
pub fn decode_datetime(regs: &[u8; DS3231_TIME_LEN]) -> DateTime {
    DateTime {
        second: bcd::to_decimal(regs[0] & SECONDS_MASK),
        minute: bcd::to_decimal(regs[1]),
        hour: bcd::to_decimal(regs[2] & HOURS_MASK),
        day_of_week: bcd::to_decimal(regs[3]),
        day: bcd::to_decimal(regs[4]),
        month: bcd::to_decimal(regs[5] & MONTH_MASK),
        year: 2000 + bcd::to_decimal(regs[6]) as u16,
    }
}

/// Encode `datetime` for registers `0x00..=0x06`.
///
/// Returns `None` if the year is outside 2000–2099 or any field is out of
/// its calendar range. Day-of-month is not checked against the month.
pub fn encode_datetime(datetime: &DateTime) -> Option<[u8; DS3231_TIME_LEN]> {
    let valid = (2000..=2099).contains(&datetime.year)
        && (1..=12).contains(&datetime.month)
        && (1..=31).contains(&datetime.day)
        && (1..=7).contains(&datetime.day_of_week)
        && datetime.hour < 24
        && datetime.minute < 60
        && datetime.second < 60;
    if !valid {
        return None;
    }

    Some([
        bcd::from_decimal(datetime.second),
        bcd::from_decimal(datetime.minute),
        bcd::from_decimal(datetime.hour),
        bcd::from_decimal(datetime.day_of_week),
        bcd::from_decimal(datetime.day),
        bcd::from_decimal(datetime.month),
        bcd::from_decimal((datetime.year - 2000) as u8),
    ])
}

/// Combine the temperature registers: signed whole degrees in `msb`, plus
/// quarter degrees in bits 7:6 of `lsb`.
pub fn decode_temperature(msb: u8, lsb: u8) -> f32 {
    (msb as i8) as f32 + (lsb >> 6) as f32 * 0.25
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::{self, ErrorKind, ErrorType, Operation};

    #[derive(Debug)]
    struct BusError;

    impl i2c::Error for BusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
        }
    }

    /// Answers every read with `regs`, or NAKs while `failing` is set.
    struct RtcBus<'a> {
        regs: [u8; DS3231_TIME_LEN],
        failing: &'a Cell<bool>,
    }

    impl ErrorType for RtcBus<'_> {
        type Error = BusError;
    }

    impl I2c for RtcBus<'_> {
        async fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.failing.get() {
                return Err(BusError);
            }
            for op in operations {
                if let Operation::Read(buf) = op {
                    let n = buf.len().min(self.regs.len());
                    buf[..n].copy_from_slice(&self.regs[..n]);
                }
            }
            Ok(())
        }
    }

    const XMAS_2024: DateTime = DateTime {
        year: 2024,
        month: 12,
        day: 25,
        day_of_week: 3,
        hour: 14,
        minute: 30,
        second: 45,
    };

    #[test]
    fn decode_masks_control_bits() {
        // Clock-halt bit in seconds, century bit in month.
        let regs = [0x45 | 0x80, 0x30, 0x14, 0x03, 0x25, 0x12 | 0x80, 0x24];
        assert_eq!(decode_datetime(&regs), XMAS_2024);
    }

    #[test]
    fn encode_writes_bcd_fields() {
        assert_eq!(
            encode_datetime(&XMAS_2024),
            Some([0x45, 0x30, 0x14, 0x03, 0x25, 0x12, 0x24])
        );
    }

    #[test]
    fn encoded_registers_decode_to_same_time() {
        let regs = encode_datetime(&XMAS_2024).unwrap();
        assert_eq!(decode_datetime(&regs), XMAS_2024);
    }

    #[test]
    fn encode_rejects_unrepresentable_values() {
        let cases = [
            DateTime { year: 1999, ..XMAS_2024 },
            DateTime { year: 2100, ..XMAS_2024 },
            DateTime { month: 13, ..XMAS_2024 },
            DateTime { day: 0, ..XMAS_2024 },
            DateTime { day_of_week: 0, ..XMAS_2024 },
            DateTime { hour: 24, ..XMAS_2024 },
            DateTime { second: 60, ..XMAS_2024 },
        ];
        for case in cases {
            assert_eq!(encode_datetime(&case), None);
        }
    }

    #[test]
    fn failed_read_repeats_last_good_time() {
        let failing = Cell::new(false);
        let bus = RtcBus {
            regs: encode_datetime(&XMAS_2024).unwrap(),
            failing: &failing,
        };
        let mut rtc = Ds3231::new(bus, 0x68);

        assert_eq!(block_on(rtc.now()), XMAS_2024);

        failing.set(true);
        assert!(block_on(rtc.read_datetime()).is_err());
        assert_eq!(block_on(rtc.now()), XMAS_2024);
    }

    #[test]
    fn failed_first_read_is_all_zero() {
        let failing = Cell::new(true);
        let bus = RtcBus {
            regs: [0; DS3231_TIME_LEN],
            failing: &failing,
        };
        let mut rtc = Ds3231::new(bus, 0x68);

        assert_eq!(block_on(rtc.now()), DateTime::default());
        assert_eq!(block_on(rtc.temperature()), 0.0);
    }

    #[test]
    fn temperature_quarter_degrees() {
        assert_eq!(decode_temperature(0x19, 0x00), 25.0);
        assert_eq!(decode_temperature(0x19, 0x40), 25.25);
        assert_eq!(decode_temperature(0x19, 0xC0), 25.75);
    }

    #[test]
    fn temperature_below_zero() {
        assert_eq!(decode_temperature(0xE6, 0x00), -26.0);
        // -0.25 °C in 10-bit two's complement: 0xFF, 0b11.
        assert_eq!(decode_temperature(0xFF, 0xC0), -0.25);
    }
}
