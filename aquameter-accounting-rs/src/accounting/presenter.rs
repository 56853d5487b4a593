//! Display-mode controller and time-sliced frame scheduler.
//!
//! Anything that takes more than one frame (the date header followed by
//! the mode content, the seven-day history walk, diagnostics, reset
//! notices) is queued as a [`Sequence`] of [`ScheduledFrame`]s, each with
//! a dwell time. [`ModeDisplay::tick()`] hands out the next frame once the
//! previous dwell has elapsed and otherwise returns immediately, so the
//! control loop keeps polling buttons while a sequence plays.
//!
//! Frames are queued as [`FrameKind`]s and turned into text by
//! [`format_frame()`] only at the moment they are shown, from a
//! [`MeterSnapshot`] taken at that moment. A frame therefore never shows
//! values older than the last completed commit.

use core::fmt::Write;

use heapless::{Deque, String};

use super::clock::DateTime;
use super::mode::DisplayMode;
use super::{AUTO_REFRESH_MS, FACTORY_RESET_CONFIRM_MS, RENDER_INTERVAL_MS, WEEKLY_HISTORY_DAYS};

/// Maximum characters per display line.
pub const LINE_CAPACITY: usize = 20;

/// Flow rates below this are shown as "no flow" (L/min).
const NO_FLOW_THRESHOLD_LPM: f32 = 0.1;

const DATE_HEADER_MS: u64 = 1_000;
const WEEKLY_DAY_MS: u64 = 1_500;
const SAVING_MS: u64 = 500;
const RESET_NOTICE_MS: u64 = 1_500;
const SYSTEM_INFO_MS: u64 = 1_500;
const DIAGNOSTIC_MS: u64 = 2_000;
const FACTORY_DONE_MS: u64 = 2_000;
const BANNER_MS: u64 = 2_000;

const QUEUE_LEN: usize = 10;

// ── Frames ───────────────────────────────────────────────────────────

/// Two lines of text handed to the display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub lines: [String<LINE_CAPACITY>; 2],
}

impl Frame {
    /// Build a frame, truncating each line to [`LINE_CAPACITY`] bytes.
    pub fn new(top: &str, bottom: &str) -> Self {
        Self {
            lines: [line(top), line(bottom)],
        }
    }

    pub fn top(&self) -> &str {
        self.lines[0].as_str()
    }

    pub fn bottom(&self) -> &str {
        self.lines[1].as_str()
    }
}

fn line(text: &str) -> String<LINE_CAPACITY> {
    let mut end = text.len().min(LINE_CAPACITY);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // Cannot overflow: `end <= LINE_CAPACITY`.
    let _ = out.push_str(&text[..end]);
    out
}

/// Display collaborator: shows one frame until the next one arrives.
#[allow(async_fn_in_trait)]
pub trait FrameSink {
    async fn show(&mut self, frame: &Frame);
}

/// Which frame to show; formatted on demand by [`format_frame()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    Banner,
    /// `DD/MM HH:MM` header shown before every mode render.
    DateTime,
    Mode(DisplayMode),
    /// Weekly history entry "D-`n`".
    WeeklyDay(u8),
    Saving,
    SessionReset,
    TodayReset,
    MonthReset,
    SystemInfo,
    Calibration,
    CostRate,
    Temperature,
    FactoryResetPrompt,
    FactoryResetDone,
}

impl FrameKind {
    /// `true` if formatting needs a fresh clock temperature reading.
    pub fn needs_temperature(self) -> bool {
        matches!(self, FrameKind::Temperature)
    }
}

/// One entry of a frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduledFrame {
    pub kind: FrameKind,
    /// Time before the next frame of the sequence. `None` ends the
    /// sequence as soon as this frame is shown; the frame stays on screen.
    pub dwell_ms: Option<u64>,
}

impl ScheduledFrame {
    pub const fn timed(kind: FrameKind, dwell_ms: u64) -> Self {
        Self {
            kind,
            dwell_ms: Some(dwell_ms),
        }
    }

    pub const fn hold(kind: FrameKind) -> Self {
        Self {
            kind,
            dwell_ms: None,
        }
    }
}

/// Kind of sequence currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sequence {
    /// Regular date header + mode content render.
    Render,
    /// Status or command feedback; requests a render when it ends.
    Notice,
}

// ── Canned notices ───────────────────────────────────────────────────

pub(crate) const BANNER: [ScheduledFrame; 1] = [ScheduledFrame::timed(FrameKind::Banner, BANNER_MS)];
pub(crate) const SAVING: [ScheduledFrame; 1] = [ScheduledFrame::timed(FrameKind::Saving, SAVING_MS)];
pub(crate) const SESSION_RESET: [ScheduledFrame; 1] =
    [ScheduledFrame::timed(FrameKind::SessionReset, RESET_NOTICE_MS)];
pub(crate) const TODAY_RESET: [ScheduledFrame; 1] =
    [ScheduledFrame::timed(FrameKind::TodayReset, RESET_NOTICE_MS)];
pub(crate) const MONTH_RESET: [ScheduledFrame; 1] =
    [ScheduledFrame::timed(FrameKind::MonthReset, RESET_NOTICE_MS)];
pub(crate) const DIAGNOSTICS: [ScheduledFrame; 4] = [
    ScheduledFrame::timed(FrameKind::SystemInfo, SYSTEM_INFO_MS),
    ScheduledFrame::timed(FrameKind::Calibration, DIAGNOSTIC_MS),
    ScheduledFrame::timed(FrameKind::CostRate, DIAGNOSTIC_MS),
    ScheduledFrame::timed(FrameKind::Temperature, DIAGNOSTIC_MS),
];
pub(crate) const FACTORY_RESET_PROMPT: [ScheduledFrame; 1] = [ScheduledFrame::timed(
    FrameKind::FactoryResetPrompt,
    FACTORY_RESET_CONFIRM_MS,
)];
pub(crate) const FACTORY_RESET_DONE: [ScheduledFrame; 1] =
    [ScheduledFrame::timed(FrameKind::FactoryResetDone, FACTORY_DONE_MS)];

// ── Snapshot + formatting ────────────────────────────────────────────

/// Values a frame may print, captured right before formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeterSnapshot {
    pub now: DateTime,
    pub rate_lpm: f32,
    pub session_liters: f32,
    pub today_liters: u32,
    pub month_liters: u32,
    pub previous_month_liters: u32,
    pub total_liters: u32,
    pub cost_today: f32,
    pub cost_month: f32,
    pub calibration: f32,
    pub cost_per_liter: f32,
    /// Clock temperature; only meaningful for [`FrameKind::Temperature`].
    pub temperature: f32,
    /// Daily-log entries for "D-0" .. "D-6".
    pub history: [u32; WEEKLY_HISTORY_DAYS],
}

/// Render `kind` into text using values from `snap`.
pub fn format_frame(kind: FrameKind, snap: &MeterSnapshot) -> Frame {
    let mut bottom: String<LINE_CAPACITY> = String::new();

    // Writes into a fixed buffer; overflow only truncates the line.
    let top = match kind {
        FrameKind::Banner => return Frame::new("WATER METER", "System v2.0"),
        FrameKind::DateTime => {
            let mut header: String<LINE_CAPACITY> = String::new();
            let _ = write!(
                header,
                "{:02}/{:02} {:02}:{:02}",
                snap.now.day, snap.now.month, snap.now.hour, snap.now.minute
            );
            return Frame::new(header.as_str(), "");
        }
        FrameKind::Mode(mode) => {
            match mode {
                DisplayMode::FlowRate => {
                    if snap.rate_lpm < NO_FLOW_THRESHOLD_LPM {
                        let _ = bottom.push_str("[No Flow]");
                    } else {
                        let _ = write!(bottom, "{:.2} L/min", snap.rate_lpm);
                    }
                }
                DisplayMode::Session => {
                    let _ = write!(bottom, "{:.3} L", snap.session_liters);
                }
                DisplayMode::Today => {
                    let _ = write!(bottom, "{} L", snap.today_liters);
                }
                DisplayMode::ThisMonth => {
                    let _ = write!(bottom, "{} L", snap.month_liters);
                }
                DisplayMode::LastMonth => {
                    let _ = write!(bottom, "{} L", snap.previous_month_liters);
                }
                DisplayMode::Total => {
                    let _ = write!(bottom, "{} L", snap.total_liters);
                }
                DisplayMode::CostToday => {
                    let _ = write!(bottom, "Rs {:.2}", snap.cost_today);
                }
                DisplayMode::CostMonth => {
                    let _ = write!(bottom, "Rs {:.2}", snap.cost_month);
                }
                DisplayMode::WeeklyHistory => {}
            }
            mode.title()
        }
        FrameKind::WeeklyDay(days_back) => {
            let liters = snap
                .history
                .get(days_back as usize)
                .copied()
                .unwrap_or_default();
            let _ = write!(bottom, "D-{}: {} L", days_back, liters);
            DisplayMode::WeeklyHistory.title()
        }
        FrameKind::Saving => "Saving...",
        FrameKind::SessionReset => "Session Reset!",
        FrameKind::TodayReset => "Today Reset!",
        FrameKind::MonthReset => "Month Reset!",
        FrameKind::SystemInfo => "SYSTEM INFO",
        FrameKind::Calibration => {
            let _ = write!(bottom, "{:.1} pls/L", snap.calibration);
            "Calibration:"
        }
        FrameKind::CostRate => {
            let _ = write!(bottom, "Rs {:.3}/L", snap.cost_per_liter);
            "Cost Rate:"
        }
        FrameKind::Temperature => {
            let _ = write!(bottom, "{:.2} C", snap.temperature);
            "RTC Temp:"
        }
        FrameKind::FactoryResetPrompt => return Frame::new("Hold 2 more sec", "to factory reset"),
        FrameKind::FactoryResetDone => return Frame::new("Initializing...", "Done!"),
    };

    Frame {
        lines: [line(top), bottom],
    }
}

// ── ModeDisplay ──────────────────────────────────────────────────────

/// Current display mode plus the frame scheduler.
///
/// A render starts when the display is idle and either a redraw was
/// requested ([`mark_dirty()`](Self::mark_dirty)), [`RENDER_INTERVAL_MS`]
/// passed since the previous render started, or the [`AUTO_REFRESH_MS`]
/// tick fired.
#[derive(Debug, Clone)]
pub struct ModeDisplay {
    mode: DisplayMode,
    queue: Deque<ScheduledFrame, QUEUE_LEN>,
    sequence: Option<Sequence>,
    next_frame_ms: u64,
    dirty: bool,
    last_render_ms: Option<u64>,
    last_auto_refresh_ms: u64,
}

impl ModeDisplay {
    /// Start in [`DisplayMode::FlowRate`] with a redraw pending.
    pub fn new(now_ms: u64) -> Self {
        Self {
            mode: DisplayMode::default(),
            queue: Deque::new(),
            sequence: None,
            next_frame_ms: now_ms,
            dirty: true,
            last_render_ms: None,
            last_auto_refresh_ms: now_ms,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Sequence currently playing, if any.
    pub fn sequence(&self) -> Option<Sequence> {
        self.sequence
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Advance to the next mode, drop whatever is playing and redraw.
    pub fn cycle_mode(&mut self) -> DisplayMode {
        self.mode = self.mode.next();
        self.abort();
        self.dirty = true;
        self.mode
    }

    /// Request a redraw.
    ///
    /// Absorbed while a render is playing: its remaining frames are
    /// formatted when shown and already reflect the change.
    pub fn mark_dirty(&mut self) {
        if self.sequence != Some(Sequence::Render) {
            self.dirty = true;
        }
    }

    /// Drop the playing sequence, if any.
    pub fn abort(&mut self) {
        self.queue.clear();
        self.sequence = None;
    }

    /// Replace whatever is playing with a notice.
    pub fn notify(&mut self, now_ms: u64, frames: &[ScheduledFrame]) {
        self.start(now_ms, Sequence::Notice, frames);
    }

    /// Show a status notice unless something that owns the display is
    /// playing: another notice or the weekly history walk. Returns `true`
    /// if the notice was queued.
    pub fn notify_if_idle(&mut self, now_ms: u64, frames: &[ScheduledFrame]) -> bool {
        let busy = match self.sequence {
            None => false,
            Some(Sequence::Notice) => true,
            Some(Sequence::Render) => self.mode == DisplayMode::WeeklyHistory,
        };
        if busy {
            return false;
        }
        self.notify(now_ms, frames);
        true
    }

    /// Return the frame to show now, if any.
    pub fn tick(&mut self, now_ms: u64) -> Option<FrameKind> {
        if now_ms.saturating_sub(self.last_auto_refresh_ms) >= AUTO_REFRESH_MS {
            self.last_auto_refresh_ms = now_ms;
            self.mark_dirty();
        }

        if self.sequence.is_some() {
            if now_ms < self.next_frame_ms {
                return None;
            }
            match self.advance(now_ms) {
                Some(kind) => return Some(kind),
                None => self.finish(),
            }
        }

        let render_due = self.dirty
            || self
                .last_render_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= RENDER_INTERVAL_MS);
        if !render_due {
            return None;
        }

        self.start_render(now_ms);
        self.advance(now_ms)
    }

    fn start_render(&mut self, now_ms: u64) {
        let mut frames: [ScheduledFrame; 1 + WEEKLY_HISTORY_DAYS] =
            [ScheduledFrame::hold(FrameKind::DateTime); 1 + WEEKLY_HISTORY_DAYS];
        frames[0] = ScheduledFrame::timed(FrameKind::DateTime, DATE_HEADER_MS);

        let len = if self.mode == DisplayMode::WeeklyHistory {
            for (i, frame) in frames[1..].iter_mut().enumerate() {
                *frame = ScheduledFrame::timed(FrameKind::WeeklyDay(i as u8), WEEKLY_DAY_MS);
            }
            1 + WEEKLY_HISTORY_DAYS
        } else {
            frames[1] = ScheduledFrame::hold(FrameKind::Mode(self.mode));
            2
        };

        self.start(now_ms, Sequence::Render, &frames[..len]);
        self.dirty = false;
        self.last_render_ms = Some(now_ms);
    }

    fn start(&mut self, now_ms: u64, sequence: Sequence, frames: &[ScheduledFrame]) {
        self.queue.clear();
        for frame in frames {
            if self.queue.push_back(*frame).is_err() {
                break;
            }
        }
        self.sequence = Some(sequence);
        self.next_frame_ms = now_ms;
    }

    /// Pop the next queued frame and schedule the one after it.
    fn advance(&mut self, now_ms: u64) -> Option<FrameKind> {
        let frame = self.queue.pop_front()?;
        match frame.dwell_ms {
            Some(dwell) => self.next_frame_ms = now_ms + dwell,
            None => self.finish(),
        }
        Some(frame.kind)
    }

    fn finish(&mut self) {
        if self.sequence == Some(Sequence::Notice) {
            self.dirty = true;
        }
        self.abort();
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
