//! Water consumption accounting with a polled, single-owner controller.
//!
//! # Architecture
//!
//! ```text
//! edge handler ──► PulseCounter ──(drain every 1 s)──► FlowSampler ──► SessionVolume
//!                                                                          │
//!                                   (commit every 60 s, rollover vs. clock)▼
//! ButtonFsm ──commands──► MeterController ◄──────────────────────── ConsumptionLedger
//!                               │                                  (EEPROM mirror)
//!                               ▼
//!                         ModeDisplay ──frames──► FrameSink
//! ```
//!
//! [`MeterController`] owns every piece of mutable state except the
//! [`PulseCounter`], which is the one value shared with an asynchronous
//! edge source and is therefore accessed only through an atomic swap.
//!
//! # Timing
//!
//! Nothing in this module reads a clock on its own. Every polled operation
//! takes `now_ms`, a monotonic millisecond timestamp supplied by the caller,
//! and compares elapsed time against one of the interval constants below.
//!
//! # `no_std` Compatibility
//!
//! No heap allocation. Frames are fixed-capacity [`heapless::String`]s and
//! frame sequences live in a [`heapless::Deque`].

mod buttons;
mod clock;
mod controller;
mod error;
mod ledger;
mod mode;
mod presenter;
mod pulse;
mod sampler;
mod storage;

pub use buttons::{Button, ButtonEvent, ButtonFsm, ButtonInputs, ButtonState, Command, Commands};
pub use clock::{Clock, DateTime};
pub use controller::{MeterController, MeterIo};
pub use error::AccountingError;
pub use ledger::{CommitOutcome, ConsumptionLedger, DailyLog, Rollover};
pub use mode::DisplayMode;
pub use presenter::{
    format_frame, Frame, FrameKind, FrameSink, MeterSnapshot, ModeDisplay, ScheduledFrame,
    Sequence, LINE_CAPACITY,
};
pub use pulse::PulseCounter;
pub use sampler::{FlowSample, FlowSampler, SessionVolume};
pub use storage::{MemoryStorage, Storage, MEMORY_MAP_LEN};

// ── Persisted constants ──────────────────────────────────────────────

/// Factory calibration of the YF-S201 flow sensor, in pulses per liter.
pub const DEFAULT_PULSES_PER_LITER: f32 = 450.0;

/// Factory cost rate written by a factory reset, in currency units per liter.
pub const DEFAULT_COST_PER_LITER: f32 = 0.05;

/// Number of slots in the circular daily log.
pub const DAILY_LOG_SLOTS: usize = 30;

/// Number of past days walked by the weekly-history mode.
pub const WEEKLY_HISTORY_DAYS: usize = 7;

// ── Intervals (milliseconds) ─────────────────────────────────────────

/// Minimum time between two flow samples.
pub const SAMPLE_INTERVAL_MS: u64 = 1_000;

/// Minimum time between two commit cycles.
pub const COMMIT_INTERVAL_MS: u64 = 60_000;

/// A render starts at the latest this long after the previous one.
pub const RENDER_INTERVAL_MS: u64 = 2_000;

/// Coarse tick that forces a redraw regardless of activity.
pub const AUTO_REFRESH_MS: u64 = 5_000;

/// Minimum time between two accepted presses of the same button.
pub const DEBOUNCE_MS: u64 = 200;

/// Hold duration after which a long-press action fires.
pub const LONG_PRESS_MS: u64 = 3_000;

/// Window during which the select button must stay held to confirm a
/// factory reset.
pub const FACTORY_RESET_CONFIRM_MS: u64 = 2_000;

/// Delay between two iterations of the firmware control loop.
pub const LOOP_DELAY_MS: u64 = 50;
