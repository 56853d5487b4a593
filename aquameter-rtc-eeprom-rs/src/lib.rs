//! Async I2C drivers for the water meter's clock and storage chips.
//!
//! - [`Ds3231`] — real-time clock with temperature sensor. Implements
//!   [`Clock`](aquameter::accounting::Clock).
//! - [`At24c32`] — 4 KiB EEPROM holding the consumption ledger. Implements
//!   [`Storage`](aquameter::accounting::Storage).
//!
//! # Architecture
//!
//! - **`driver`** (crate-private) — register-addressed read/write primitives
//!   shared by both chips.
//! - **`bcd`** — packed-BCD codec used by the DS3231 time registers.
//! - **[`Ds3231`]**, **[`At24c32`]** (public) — validated chip-level APIs.
//!
//! Both chips usually sit on one bus. Construct each with its own
//! shared-bus device handle.
//!
//! # Quick start
//!
//! ```ignore
//! use meter_peripherals::{At24c32, Ds3231};
//!
//! let mut rtc = Ds3231::new(i2c_rtc, meter_peripherals::DS3231_ADDRESS);
//! let mut eeprom = At24c32::new(i2c_eeprom, meter_peripherals::AT24C32_ADDRESS);
//!
//! let now = rtc.read_datetime().await?;
//! eeprom.write(0, &[1, 2, 3, 4]).await?;
//! ```
//!
//! # Features
//!
//! - **`defmt`** — [`defmt::Format`] implementations on error types and
//!   bus-failure logging in the trait adapters.

#![no_std]

pub use at24c32::At24c32;
pub use ds3231::Ds3231;
pub use error::PeripheralError;
pub use registers::{AT24C32_ADDRESS, AT24C32_CAPACITY, AT24C32_PAGE_SIZE, DS3231_ADDRESS};

mod at24c32;
pub mod bcd;
mod driver;
mod ds3231;
mod error;
mod registers;
