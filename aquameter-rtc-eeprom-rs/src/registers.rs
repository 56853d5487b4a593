//! Register maps and bus constants for the DS3231 and AT24C32.

// ---------------------------------------------------------------------------
// DS3231 real-time clock
// ---------------------------------------------------------------------------

/// Fixed 7-bit I2C address of the DS3231.
pub const DS3231_ADDRESS: u8 = 0x68;

/// First of the seven consecutive timekeeping registers
/// (seconds, minutes, hours, day of week, date, month, year).
pub const DS3231_TIME: u8 = 0x00;

/// Number of timekeeping registers read or written in one burst.
pub const DS3231_TIME_LEN: usize = 7;

/// Temperature MSB: whole degrees, two's complement. The LSB register
/// (`0x12`) follows and carries quarter degrees in bits 7:6.
pub const DS3231_TEMP_MSB: u8 = 0x11;

/// Clock-halt flag in the seconds register.
pub const SECONDS_MASK: u8 = 0x7F;

/// Hours register in 24-hour mode (bit 6 clear).
pub const HOURS_MASK: u8 = 0x3F;

/// Century flag in the month register.
pub const MONTH_MASK: u8 = 0x1F;

// ---------------------------------------------------------------------------
// AT24C32 EEPROM
// ---------------------------------------------------------------------------

/// I2C address of the AT24C32 on common DS3231 modules (A2..A0 pulled up).
pub const AT24C32_ADDRESS: u8 = 0x57;

/// Array size in bytes (32 Kbit).
pub const AT24C32_CAPACITY: usize = 4096;

/// Page-write buffer size. A write must not cross a page boundary.
pub const AT24C32_PAGE_SIZE: usize = 32;

/// Self-timed write cycle; the chip NAKs until it has elapsed.
pub const AT24C32_WRITE_CYCLE_MS: u64 = 5;
