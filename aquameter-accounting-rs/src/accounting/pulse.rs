use core::sync::atomic::{AtomicU32, Ordering};

/// Pulse counter shared between the flow-sensor edge source and the sampler.
///
/// The edge source only ever calls [`record_pulse()`](Self::record_pulse);
/// the sampler only ever calls [`drain()`](Self::drain). Both are single
/// atomic read-modify-write instructions, so a pulse arriving while the
/// sampler drains is counted either in this window or the next, never lost
/// and never counted twice.
///
/// Intended to live in a `static`:
///
/// ```
/// use aquameter::accounting::PulseCounter;
///
/// static PULSES: PulseCounter = PulseCounter::new();
///
/// PULSES.record_pulse();
/// PULSES.record_pulse();
/// assert_eq!(PULSES.drain(), 2);
/// assert_eq!(PULSES.drain(), 0);
/// ```
pub struct PulseCounter {
    count: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Count one sensor edge. Non-blocking; safe to call from the edge
    /// handler at any time.
    #[inline]
    pub fn record_pulse(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the accumulated count and reset it to zero in one step.
    #[inline]
    pub fn drain(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    /// Current count without resetting it.
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}
