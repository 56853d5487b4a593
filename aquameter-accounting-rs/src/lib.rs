//! Consumption-accounting engine for a battery-resident water meter.
//!
//! Everything that has invariants lives here: pulse draining, flow
//! sampling, the persisted consumption ledger with its day/month rollover,
//! the button state machine and the time-sliced display scheduler. The
//! clock, the nonvolatile storage and the display are reached only through
//! the [`Clock`](accounting::Clock), [`Storage`](accounting::Storage) and
//! [`FrameSink`](accounting::FrameSink) traits, so the whole engine runs on
//! the host under `cargo test`.
//!
//! # Crate Features
//!
//! - **`defmt`** — structured logging and [`defmt::Format`] derives.

#![no_std]

pub mod accounting;
