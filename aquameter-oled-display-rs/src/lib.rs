//! SSD1306 (128×64) front end for the water meter.
//!
//! The accounting engine hands out two-line text [`Frame`]s through its
//! [`FrameSink`] trait. [`OledSink`] implements that trait on top of
//! [`OledDriver`], an async wrapper around the [`ssd1306`] crate in
//! buffered-graphics mode.
//!
//! # Quick Start
//!
//! ```ignore
//! use aquameter_oled_display_rs::{OledDriver, OledSink, TextLayout};
//!
//! let mut sink = OledSink::new(OledDriver::new(i2c_oled, 0x3C), TextLayout::default());
//! sink.init().await?;
//! // `sink` is now the FrameSink passed to MeterController.
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`** — structured logging via [`defmt`]; enable it on target builds.
//!
//! [`Frame`]: aquameter::accounting::Frame
//! [`FrameSink`]: aquameter::accounting::FrameSink

#![no_std]

pub mod driver;
pub mod error;
pub mod layout;
pub mod sink;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use driver::OledDriver;
pub use error::OledError;
pub use layout::{render_frame, TextLayout};
pub use sink::OledSink;
