use super::clock::DateTime;
use super::error::AccountingError;
use super::storage::{
    self, Storage, ADDR_CALIBRATION, ADDR_COST_PER_LITER, ADDR_CURRENT_DAY, ADDR_CURRENT_MONTH,
    ADDR_LAST_DAY, ADDR_LAST_MONTH, ADDR_PREVIOUS_MONTH, ADDR_TOTAL_LITERS,
};
use super::{DAILY_LOG_SLOTS, DEFAULT_COST_PER_LITER, DEFAULT_PULSES_PER_LITER};

/// A `u32` read from never-written EEPROM.
const ERASED_U32: u32 = 0xFFFF_FFFF;

/// Fixed-size circular archive of daily totals.
///
/// Calendar day `d` is stored in slot `(d - 1) mod 30`. Day 31 therefore
/// shares slot 0 with day 1 and overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DailyLog {
    slots: [u32; DAILY_LOG_SLOTS],
}

impl Default for DailyLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyLog {
    pub const fn new() -> Self {
        Self {
            slots: [0; DAILY_LOG_SLOTS],
        }
    }

    /// Slot index for calendar day `day`.
    ///
    /// Day 0 never comes from a healthy clock; it maps to the last slot
    /// instead of underflowing.
    pub fn slot_for_day(day: u8) -> usize {
        (day as usize + DAILY_LOG_SLOTS - 1) % DAILY_LOG_SLOTS
    }

    /// Slot shown as "D-`days_back`" by the weekly history, counted from
    /// calendar day `today`: `(today - days_back - 1 + 30) mod 30`.
    pub fn history_slot(today: u8, days_back: usize) -> usize {
        (today as usize + DAILY_LOG_SLOTS * 2 - days_back % DAILY_LOG_SLOTS - 1) % DAILY_LOG_SLOTS
    }

    /// Liters stored in `slot`.
    ///
    /// Returns [`AccountingError::InvalidLogSlot`] if `slot >= DAILY_LOG_SLOTS`.
    pub fn get(&self, slot: usize) -> Result<u32, AccountingError> {
        self.slots
            .get(slot)
            .copied()
            .ok_or(AccountingError::InvalidLogSlot)
    }

    pub fn slots(&self) -> &[u32; DAILY_LOG_SLOTS] {
        &self.slots
    }

    /// Store the total of calendar day `day`; returns the slot written.
    fn archive(&mut self, day: u8, liters: u32) -> usize {
        let slot = Self::slot_for_day(day);
        self.slots[slot] = liters;
        slot
    }
}

/// A period boundary crossed during one commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rollover {
    /// Day or month value that just ended.
    pub from: u8,
    /// Day or month value reported by the clock.
    pub to: u8,
    /// Counter value of the ended period, before this cycle's liters.
    pub archived_liters: u32,
}

/// What one commit cycle changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommitOutcome {
    /// Whole liters folded into the counters.
    pub committed: u32,
    pub day: Option<Rollover>,
    pub month: Option<Rollover>,
    /// Daily-log slot that received `day.archived_liters`.
    pub archived_slot: Option<usize>,
}

/// Persisted consumption counters, mirrored in RAM.
///
/// Every mutation goes through [`commit()`](Self::commit) or one of the
/// reset operations, each of which writes the fields it touched straight
/// back to [`Storage`]. Reads never touch storage, so the in-memory copy is
/// always the latest committed state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumptionLedger {
    total_liters: u32,
    current_month_liters: u32,
    previous_month_liters: u32,
    current_day_liters: u32,
    last_month: u8,
    last_day: u8,
    calibration: f32,
    cost_per_liter: f32,
    daily_log: DailyLog,
}

impl ConsumptionLedger {
    /// Zeroed ledger with default constants, seeded from `today`.
    pub fn factory_default(today: &DateTime) -> Self {
        Self {
            total_liters: 0,
            current_month_liters: 0,
            previous_month_liters: 0,
            current_day_liters: 0,
            last_month: today.month,
            last_day: today.day,
            calibration: DEFAULT_PULSES_PER_LITER,
            cost_per_liter: DEFAULT_COST_PER_LITER,
            daily_log: DailyLog::new(),
        }
    }

    /// Read the full ledger image from storage.
    ///
    /// No validation is applied except to the calibration factor: a value
    /// that is not finite and positive (erased or corrupt storage) is
    /// replaced in RAM by [`DEFAULT_PULSES_PER_LITER`] so the sampler never
    /// divides by it. Storage is left as is.
    pub async fn load<S: Storage>(storage: &mut S) -> Self {
        let mut daily_log = DailyLog::new();
        for (slot, liters) in daily_log.slots.iter_mut().enumerate() {
            *liters = storage::read_u32(storage, storage::log_slot_address(slot)).await;
        }

        let mut calibration = storage::read_f32(storage, ADDR_CALIBRATION).await;
        if !(calibration.is_finite() && calibration > 0.0) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Stored calibration invalid, sampling with default {} pls/L",
                DEFAULT_PULSES_PER_LITER
            );
            calibration = DEFAULT_PULSES_PER_LITER;
        }

        let ledger = Self {
            total_liters: storage::read_u32(storage, ADDR_TOTAL_LITERS).await,
            current_month_liters: storage::read_u32(storage, ADDR_CURRENT_MONTH).await,
            previous_month_liters: storage::read_u32(storage, ADDR_PREVIOUS_MONTH).await,
            current_day_liters: storage::read_u32(storage, ADDR_CURRENT_DAY).await,
            last_month: storage::read_u8(storage, ADDR_LAST_MONTH).await,
            last_day: storage::read_u8(storage, ADDR_LAST_DAY).await,
            calibration,
            cost_per_liter: storage::read_f32(storage, ADDR_COST_PER_LITER).await,
            daily_log,
        };
        if ledger.counters_erased() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Counters read as erased storage, factory reset required");
        }
        ledger
    }

    /// `true` if the total still holds the erased-EEPROM pattern. The total
    /// saturates there and stops counting until a factory reset.
    pub fn counters_erased(&self) -> bool {
        self.total_liters == ERASED_U32
    }

    /// Write every field of the ledger to storage.
    pub async fn persist_all<S: Storage>(&self, storage: &mut S) {
        storage::write_u32(storage, ADDR_TOTAL_LITERS, self.total_liters).await;
        storage::write_u32(storage, ADDR_CURRENT_MONTH, self.current_month_liters).await;
        storage::write_u32(storage, ADDR_PREVIOUS_MONTH, self.previous_month_liters).await;
        storage::write_u32(storage, ADDR_CURRENT_DAY, self.current_day_liters).await;
        storage::write_f32(storage, ADDR_CALIBRATION, self.calibration).await;
        storage::write_f32(storage, ADDR_COST_PER_LITER, self.cost_per_liter).await;
        storage::write_u8(storage, ADDR_LAST_MONTH, self.last_month).await;
        storage::write_u8(storage, ADDR_LAST_DAY, self.last_day).await;
        for (slot, &liters) in self.daily_log.slots.iter().enumerate() {
            storage::write_u32(storage, storage::log_slot_address(slot), liters).await;
        }
    }

    // ── Commit cycle ─────────────────────────────────────────────────

    /// Fold `committed` whole liters into the counters and apply any
    /// day/month rollover reported by `now`. In-memory only.
    ///
    /// Rollover is evaluated against `last_day`/`last_month` as they were
    /// at the top of the cycle. On a boundary the ended period's counter is
    /// archived *before* this cycle's liters are added, and the new period
    /// starts at `committed`: liters committed on the boundary land in the
    /// new period. Day and month rollovers are independent.
    pub fn apply_commit(&mut self, committed: u32, now: &DateTime) -> CommitOutcome {
        let last_day = self.last_day;
        let last_month = self.last_month;

        self.total_liters = self.total_liters.saturating_add(committed);

        let mut archived_slot = None;
        let day = if now.day != last_day {
            let archived_liters = self.current_day_liters;
            archived_slot = Some(self.daily_log.archive(last_day, archived_liters));
            self.current_day_liters = committed;
            self.last_day = now.day;
            Some(Rollover {
                from: last_day,
                to: now.day,
                archived_liters,
            })
        } else {
            self.current_day_liters = self.current_day_liters.saturating_add(committed);
            None
        };

        let month = if now.month != last_month {
            let archived_liters = self.current_month_liters;
            self.previous_month_liters = archived_liters;
            self.current_month_liters = committed;
            self.last_month = now.month;
            Some(Rollover {
                from: last_month,
                to: now.month,
                archived_liters,
            })
        } else {
            self.current_month_liters = self.current_month_liters.saturating_add(committed);
            None
        };

        CommitOutcome {
            committed,
            day,
            month,
            archived_slot,
        }
    }

    /// Write the fields touched by `outcome` to storage.
    pub async fn persist_commit<S: Storage>(&self, storage: &mut S, outcome: &CommitOutcome) {
        if let Some(slot) = outcome.archived_slot {
            storage::write_u32(storage, storage::log_slot_address(slot), self.daily_log.slots[slot])
                .await;
        }
        if outcome.day.is_some() {
            storage::write_u8(storage, ADDR_LAST_DAY, self.last_day).await;
        }
        if outcome.month.is_some() {
            storage::write_u32(storage, ADDR_PREVIOUS_MONTH, self.previous_month_liters).await;
            storage::write_u8(storage, ADDR_LAST_MONTH, self.last_month).await;
        }
        storage::write_u32(storage, ADDR_TOTAL_LITERS, self.total_liters).await;
        storage::write_u32(storage, ADDR_CURRENT_MONTH, self.current_month_liters).await;
        storage::write_u32(storage, ADDR_CURRENT_DAY, self.current_day_liters).await;
    }

    /// [`apply_commit()`](Self::apply_commit) followed by
    /// [`persist_commit()`](Self::persist_commit).
    pub async fn commit<S: Storage>(
        &mut self,
        storage: &mut S,
        committed: u32,
        now: &DateTime,
    ) -> CommitOutcome {
        let outcome = self.apply_commit(committed, now);
        self.persist_commit(storage, &outcome).await;
        outcome
    }

    // ── Direct resets ────────────────────────────────────────────────

    /// Zero today's counter and persist it. No rollover logic.
    pub async fn reset_today<S: Storage>(&mut self, storage: &mut S) {
        self.current_day_liters = 0;
        storage::write_u32(storage, ADDR_CURRENT_DAY, 0).await;
    }

    /// Zero this month's counter and persist it. No rollover logic.
    pub async fn reset_month<S: Storage>(&mut self, storage: &mut S) {
        self.current_month_liters = 0;
        storage::write_u32(storage, ADDR_CURRENT_MONTH, 0).await;
    }

    /// Replace the whole ledger with [`factory_default()`](Self::factory_default)
    /// and persist every field.
    pub async fn factory_reset<S: Storage>(&mut self, storage: &mut S, today: &DateTime) {
        *self = Self::factory_default(today);
        self.persist_all(storage).await;
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn total_liters(&self) -> u32 {
        self.total_liters
    }

    pub fn current_month_liters(&self) -> u32 {
        self.current_month_liters
    }

    pub fn previous_month_liters(&self) -> u32 {
        self.previous_month_liters
    }

    pub fn current_day_liters(&self) -> u32 {
        self.current_day_liters
    }

    pub fn last_month(&self) -> u8 {
        self.last_month
    }

    pub fn last_day(&self) -> u8 {
        self.last_day
    }

    /// Calibration factor in pulses per liter.
    pub fn calibration(&self) -> f32 {
        self.calibration
    }

    pub fn cost_per_liter(&self) -> f32 {
        self.cost_per_liter
    }

    pub fn daily_log(&self) -> &DailyLog {
        &self.daily_log
    }

    pub fn cost_today(&self) -> f32 {
        self.current_day_liters as f32 * self.cost_per_liter
    }

    pub fn cost_month(&self) -> f32 {
        self.current_month_liters as f32 * self.cost_per_liter
    }

    /// Ledger with explicit counter values; used to seed tests.
    #[cfg(test)]
    pub(crate) fn with_counters(
        today: &DateTime,
        total: u32,
        month: u32,
        previous_month: u32,
        day: u32,
    ) -> Self {
        Self {
            total_liters: total,
            current_month_liters: month,
            previous_month_liters: previous_month,
            current_day_liters: day,
            ..Self::factory_default(today)
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
