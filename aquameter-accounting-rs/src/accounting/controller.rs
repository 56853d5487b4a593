use super::buttons::{ButtonFsm, ButtonInputs, Command};
use super::clock::{Clock, DateTime};
use super::ledger::{CommitOutcome, ConsumptionLedger, DailyLog};
use super::mode::DisplayMode;
use super::presenter::{self, format_frame, FrameSink, MeterSnapshot, ModeDisplay};
use super::pulse::PulseCounter;
use super::sampler::{FlowSampler, SessionVolume};
use super::storage::Storage;
use super::{COMMIT_INTERVAL_MS, WEEKLY_HISTORY_DAYS};

/// The three external collaborators, borrowed together for one call.
pub struct MeterIo<'a, C, S, D> {
    pub clock: &'a mut C,
    pub storage: &'a mut S,
    pub sink: &'a mut D,
}

impl<'a, C, S, D> MeterIo<'a, C, S, D>
where
    C: Clock,
    S: Storage,
    D: FrameSink,
{
    pub fn new(clock: &'a mut C, storage: &'a mut S, sink: &'a mut D) -> Self {
        Self {
            clock,
            storage,
            sink,
        }
    }
}

/// All accounting and UI state of the meter.
///
/// Call [`poll()`](Self::poll) once per control-loop iteration. Each call
/// runs, in order: flow sampling, the commit cycle, button handling and
/// the display scheduler. Every step is gated on elapsed time and returns
/// without waiting.
pub struct MeterController {
    sampler: FlowSampler,
    session: SessionVolume,
    ledger: ConsumptionLedger,
    buttons: ButtonFsm,
    display: ModeDisplay,
    last_commit_ms: u64,
}

impl MeterController {
    /// Load the ledger from storage and queue the startup banner.
    pub async fn start<C, S, D>(now_ms: u64, io: &mut MeterIo<'_, C, S, D>) -> Self
    where
        C: Clock,
        S: Storage,
        D: FrameSink,
    {
        let ledger = ConsumptionLedger::load(io.storage).await;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Ledger loaded: total={} L month={} L today={} L last day/month={}/{}",
            ledger.total_liters(),
            ledger.current_month_liters(),
            ledger.current_day_liters(),
            ledger.last_day(),
            ledger.last_month()
        );

        let mut display = ModeDisplay::new(now_ms);
        display.notify(now_ms, &presenter::BANNER);

        Self {
            sampler: FlowSampler::new(now_ms),
            session: SessionVolume::new(),
            ledger,
            buttons: ButtonFsm::new(),
            display,
            last_commit_ms: now_ms,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn ledger(&self) -> &ConsumptionLedger {
        &self.ledger
    }

    pub fn session(&self) -> &SessionVolume {
        &self.session
    }

    pub fn mode(&self) -> DisplayMode {
        self.display.mode()
    }

    pub fn rate_lpm(&self) -> f32 {
        self.sampler.rate_lpm()
    }

    pub fn display(&self) -> &ModeDisplay {
        &self.display
    }

    // ── Control loop ─────────────────────────────────────────────────

    /// Run one control-loop iteration.
    pub async fn poll<C, S, D>(
        &mut self,
        now_ms: u64,
        pulses: &PulseCounter,
        inputs: ButtonInputs,
        io: &mut MeterIo<'_, C, S, D>,
    ) where
        C: Clock,
        S: Storage,
        D: FrameSink,
    {
        if let Some(_sample) =
            self.sampler
                .sample(now_ms, pulses, self.ledger.calibration(), &mut self.session)
        {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Flow: {} pulses, {} L/min, session {} L",
                _sample.pulses,
                _sample.rate_lpm,
                self.session.liters()
            );
            self.display.mark_dirty();
        }

        if now_ms.saturating_sub(self.last_commit_ms) >= COMMIT_INTERVAL_MS {
            self.commit(now_ms, io).await;
        }

        for command in self.buttons.poll(now_ms, inputs) {
            self.execute(now_ms, command, io).await;
        }

        self.refresh_display(now_ms, io).await;
    }

    /// Fold the whole liters of the session into the ledger now.
    pub async fn commit<C, S, D>(
        &mut self,
        now_ms: u64,
        io: &mut MeterIo<'_, C, S, D>,
    ) -> CommitOutcome
    where
        C: Clock,
        S: Storage,
        D: FrameSink,
    {
        self.last_commit_ms = now_ms;

        let today = io.clock.now().await;
        let committed = self.session.take_whole_liters();
        let outcome = self.ledger.commit(io.storage, committed, &today).await;

        #[cfg(feature = "defmt")]
        {
            defmt::info!(
                "Commit: +{} L, total={} L, remainder {} L",
                committed,
                self.ledger.total_liters(),
                self.session.liters()
            );
            if let Some(day) = outcome.day {
                defmt::info!(
                    "Day rollover {} -> {}: archived {} L",
                    day.from,
                    day.to,
                    day.archived_liters
                );
            }
            if let Some(month) = outcome.month {
                defmt::info!(
                    "Month rollover {} -> {}: archived {} L",
                    month.from,
                    month.to,
                    month.archived_liters
                );
            }
        }

        if !self.display.notify_if_idle(now_ms, &presenter::SAVING) {
            self.display.mark_dirty();
        }
        outcome
    }

    /// Carry out one command, as if issued by the buttons.
    pub async fn execute<C, S, D>(
        &mut self,
        now_ms: u64,
        command: Command,
        io: &mut MeterIo<'_, C, S, D>,
    ) where
        C: Clock,
        S: Storage,
        D: FrameSink,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!("Command: {}", command);

        match command {
            Command::CycleMode => {
                self.display.cycle_mode();
            }
            Command::ResetSession => {
                self.session.reset();
                #[cfg(feature = "defmt")]
                defmt::info!("Session reset");
                self.display.notify(now_ms, &presenter::SESSION_RESET);
            }
            Command::ResetToday => {
                self.ledger.reset_today(io.storage).await;
                #[cfg(feature = "defmt")]
                defmt::info!("Today reset");
                self.display.notify(now_ms, &presenter::TODAY_RESET);
            }
            Command::ResetMonth => {
                self.ledger.reset_month(io.storage).await;
                #[cfg(feature = "defmt")]
                defmt::info!("Month reset");
                self.display.notify(now_ms, &presenter::MONTH_RESET);
            }
            Command::ShowDiagnostics => {
                self.display.notify(now_ms, &presenter::DIAGNOSTICS);
            }
            Command::PromptFactoryReset => {
                self.display.notify(now_ms, &presenter::FACTORY_RESET_PROMPT);
            }
            Command::FactoryReset => {
                let today = io.clock.now().await;
                self.ledger.factory_reset(io.storage, &today).await;
                #[cfg(feature = "defmt")]
                defmt::warn!("Factory reset, ledger re-seeded at {}/{}", today.day, today.month);
                self.display.notify(now_ms, &presenter::FACTORY_RESET_DONE);
            }
        }
    }

    async fn refresh_display<C, S, D>(&mut self, now_ms: u64, io: &mut MeterIo<'_, C, S, D>)
    where
        C: Clock,
        S: Storage,
        D: FrameSink,
    {
        let Some(kind) = self.display.tick(now_ms) else {
            return;
        };

        let mut snap = self.snapshot(io.clock.now().await);
        if kind.needs_temperature() {
            snap.temperature = io.clock.temperature().await;
        }
        io.sink.show(&format_frame(kind, &snap)).await;
    }

    fn snapshot(&self, now: DateTime) -> MeterSnapshot {
        let log = self.ledger.daily_log();
        let history: [u32; WEEKLY_HISTORY_DAYS] = core::array::from_fn(|i| {
            log.get(DailyLog::history_slot(now.day, i))
                .unwrap_or_default()
        });

        MeterSnapshot {
            now,
            rate_lpm: self.sampler.rate_lpm(),
            session_liters: self.session.liters(),
            today_liters: self.ledger.current_day_liters(),
            month_liters: self.ledger.current_month_liters(),
            previous_month_liters: self.ledger.previous_month_liters(),
            total_liters: self.ledger.total_liters(),
            cost_today: self.ledger.cost_today(),
            cost_month: self.ledger.cost_month(),
            calibration: self.ledger.calibration(),
            cost_per_liter: self.ledger.cost_per_liter(),
            temperature: 0.0,
            history,
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::presenter::{Frame, Sequence};
    use crate::accounting::storage::MemoryStorage;
    use crate::accounting::{DEFAULT_COST_PER_LITER, DEFAULT_PULSES_PER_LITER, LOOP_DELAY_MS};
    use embassy_futures::block_on;

    struct FixedClock {
        now: DateTime,
        temperature: f32,
    }

    impl Clock for FixedClock {
        async fn now(&mut self) -> DateTime {
            self.now
        }

        async fn temperature(&mut self) -> f32 {
            self.temperature
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: usize,
        last: Frame,
    }

    impl FrameSink for RecordingSink {
        async fn show(&mut self, frame: &Frame) {
            self.frames += 1;
            self.last = frame.clone();
        }
    }

    struct Rig {
        clock: FixedClock,
        storage: MemoryStorage,
        sink: RecordingSink,
        pulses: PulseCounter,
    }

    impl Rig {
        fn new(today: DateTime) -> Self {
            let mut storage = MemoryStorage::new();
            block_on(ConsumptionLedger::factory_default(&today).persist_all(&mut storage));
            Self {
                clock: FixedClock {
                    now: today,
                    temperature: 23.5,
                },
                storage,
                sink: RecordingSink::default(),
                pulses: PulseCounter::new(),
            }
        }

        fn start(&mut self) -> MeterController {
            let mut io = MeterIo::new(&mut self.clock, &mut self.storage, &mut self.sink);
            block_on(MeterController::start(0, &mut io))
        }

        fn poll(&mut self, meter: &mut MeterController, now_ms: u64, inputs: ButtonInputs) {
            let mut io = MeterIo::new(&mut self.clock, &mut self.storage, &mut self.sink);
            block_on(meter.poll(now_ms, &self.pulses, inputs, &mut io));
        }

        /// Poll every loop period over `[from, to]` with fixed inputs.
        fn run(&mut self, meter: &mut MeterController, from: u64, to: u64, inputs: ButtonInputs) {
            let mut t = from;
            while t <= to {
                self.poll(meter, t, inputs);
                t += LOOP_DELAY_MS;
            }
        }

        fn pour(&self, pulses: u32) {
            for _ in 0..pulses {
                self.pulses.record_pulse();
            }
        }

        fn reload(&mut self) -> ConsumptionLedger {
            block_on(ConsumptionLedger::load(&mut self.storage))
        }
    }

    const MAY_5: DateTime = DateTime::date(2024, 5, 5);

    const SELECT: ButtonInputs = ButtonInputs {
        mode: false,
        reset: false,
        select: true,
    };

    const RESET: ButtonInputs = ButtonInputs {
        mode: false,
        reset: true,
        select: false,
    };

    #[test]
    fn startup_shows_banner_first() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.poll(&mut meter, 0, ButtonInputs::RELEASED);
        assert_eq!(rig.sink.last.top(), "WATER METER");
        assert_eq!(rig.sink.frames, 1);
    }

    #[test]
    fn sampled_volume_accumulates_in_session() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.pour(450);
        rig.poll(&mut meter, 1_000, ButtonInputs::RELEASED);
        rig.pour(225);
        rig.poll(&mut meter, 2_000, ButtonInputs::RELEASED);

        assert_eq!(meter.session().liters(), 1.5);
        assert_eq!(meter.rate_lpm(), 30.0);
        assert_eq!(meter.ledger().total_liters(), 0);
    }

    #[test]
    fn commit_after_sixty_seconds_keeps_fraction() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        // 3.5 L in the first second.
        rig.pour(1_575);
        rig.run(&mut meter, 0, 59_950, ButtonInputs::RELEASED);
        assert_eq!(meter.ledger().total_liters(), 0);

        rig.poll(&mut meter, 60_000, ButtonInputs::RELEASED);
        assert_eq!(meter.ledger().total_liters(), 3);
        assert_eq!(meter.ledger().current_day_liters(), 3);
        assert_eq!(meter.session().liters(), 0.5);
        assert_eq!(rig.reload().total_liters(), 3);
    }

    #[test]
    fn commit_across_midnight_archives_day() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.pour(450 * 120);
        rig.run(&mut meter, 0, 60_000, ButtonInputs::RELEASED);
        assert_eq!(meter.ledger().current_day_liters(), 120);

        rig.clock.now = DateTime::date(2024, 5, 6);
        rig.run(&mut meter, 60_050, 120_000, ButtonInputs::RELEASED);

        let ledger = meter.ledger();
        assert_eq!(ledger.daily_log().get(4), Ok(120));
        assert_eq!(ledger.current_day_liters(), 0);
        assert_eq!(ledger.last_day(), 6);
        assert_eq!(ledger.total_liters(), 120);
        assert_eq!(rig.reload().daily_log().get(4), Ok(120));
    }

    #[test]
    fn mode_presses_cycle_modulo_count() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        let mode = ButtonInputs {
            mode: true,
            reset: false,
            select: false,
        };
        let mut t = 0;
        for _ in 0..11 {
            rig.poll(&mut meter, t, mode);
            rig.poll(&mut meter, t + 100, ButtonInputs::RELEASED);
            t += 300;
        }
        assert_eq!(meter.mode().index(), 11 % DisplayMode::COUNT);
    }

    #[test]
    fn completed_sample_starts_render_on_idle_display() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.poll(&mut meter, 0, ButtonInputs::RELEASED);
        rig.poll(&mut meter, 1_000, ButtonInputs::RELEASED);
        rig.poll(&mut meter, 2_000, ButtonInputs::RELEASED);

        // Mode press restarts the render off the sample grid.
        let mode = ButtonInputs {
            mode: true,
            reset: false,
            select: false,
        };
        rig.poll(&mut meter, 2_100, mode);
        rig.poll(&mut meter, 2_150, ButtonInputs::RELEASED);
        // Sample lands mid-render and is absorbed.
        rig.poll(&mut meter, 3_000, ButtonInputs::RELEASED);
        assert!(!meter.display().is_dirty());
        rig.poll(&mut meter, 3_100, ButtonInputs::RELEASED);
        assert_eq!(meter.display().sequence(), None);

        // Idle, no render interval or auto refresh due yet.
        let shown = rig.sink.frames;
        rig.poll(&mut meter, 3_950, ButtonInputs::RELEASED);
        assert_eq!(rig.sink.frames, shown);

        rig.poll(&mut meter, 4_000, ButtonInputs::RELEASED);
        assert_eq!(rig.sink.frames, shown + 1);
        assert_eq!(meter.display().sequence(), Some(Sequence::Render));
    }

    #[test]
    fn reset_button_short_then_long() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.pour(450 * 5 + 225);
        rig.run(&mut meter, 0, 60_000, ButtonInputs::RELEASED);
        assert_eq!(meter.ledger().current_day_liters(), 5);
        assert_eq!(meter.session().liters(), 0.5);

        let writes_before = rig.storage.write_count();
        rig.run(&mut meter, 60_050, 63_050, RESET);
        assert_eq!(meter.session().liters(), 0.0);
        assert_eq!(meter.ledger().current_day_liters(), 0);
        assert_eq!(rig.reload().current_day_liters(), 0);
        // One write for the today reset, nothing repeated while held.
        assert_eq!(rig.storage.write_count(), writes_before + 1);
        assert_eq!(meter.ledger().total_liters(), 5);
    }

    #[test]
    fn select_short_press_plays_diagnostics() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.run(&mut meter, 0, 2_500, ButtonInputs::RELEASED);
        rig.poll(&mut meter, 2_550, SELECT);
        assert_eq!(rig.sink.last.top(), "SYSTEM INFO");
        rig.run(&mut meter, 2_600, 8_050, ButtonInputs::RELEASED);
        assert_eq!(rig.sink.last.top(), "RTC Temp:");
        assert_eq!(rig.sink.last.bottom(), "23.50 C");
    }

    #[test]
    fn select_held_through_confirmation_factory_resets() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.pour(450 * 40);
        rig.run(&mut meter, 0, 60_000, ButtonInputs::RELEASED);
        block_on(meter.execute(
            60_000,
            Command::ResetMonth,
            &mut MeterIo::new(&mut rig.clock, &mut rig.storage, &mut rig.sink),
        ));
        assert_eq!(meter.ledger().total_liters(), 40);

        rig.clock.now = DateTime::date(2024, 6, 2);
        rig.run(&mut meter, 60_050, 63_050, SELECT);
        assert_eq!(rig.sink.last.top(), "Hold 2 more sec");
        assert_eq!(meter.ledger().total_liters(), 40);

        rig.run(&mut meter, 63_100, 65_050, SELECT);
        assert_eq!(rig.sink.last.top(), "Initializing...");

        for ledger in [*meter.ledger(), rig.reload()] {
            assert_eq!(ledger.total_liters(), 0);
            assert_eq!(ledger.current_month_liters(), 0);
            assert_eq!(ledger.previous_month_liters(), 0);
            assert_eq!(ledger.current_day_liters(), 0);
            assert!(ledger.daily_log().slots().iter().all(|&s| s == 0));
            assert_eq!(ledger.calibration(), DEFAULT_PULSES_PER_LITER);
            assert_eq!(ledger.cost_per_liter(), DEFAULT_COST_PER_LITER);
            assert_eq!((ledger.last_day(), ledger.last_month()), (2, 6));
        }
    }

    #[test]
    fn releasing_select_before_confirmation_keeps_ledger() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        rig.pour(450 * 40);
        rig.run(&mut meter, 0, 60_000, ButtonInputs::RELEASED);

        rig.run(&mut meter, 60_050, 63_050, SELECT);
        rig.run(&mut meter, 63_100, 64_000, SELECT);
        rig.run(&mut meter, 64_050, 70_000, ButtonInputs::RELEASED);

        assert_eq!(meter.ledger().total_liters(), 40);
        assert_eq!(rig.reload().total_liters(), 40);
    }

    #[test]
    fn buttons_stay_live_during_weekly_walk() {
        let mut rig = Rig::new(MAY_5);
        let mut meter = rig.start();
        for _ in 0..8 {
            block_on(meter.execute(
                0,
                Command::CycleMode,
                &mut MeterIo::new(&mut rig.clock, &mut rig.storage, &mut rig.sink),
            ));
        }
        rig.pour(450);
        rig.run(&mut meter, 0, 4_000, ButtonInputs::RELEASED);
        assert!(rig.sink.last.bottom().starts_with("D-"));
        assert_eq!(meter.session().liters(), 1.0);

        rig.poll(&mut meter, 4_050, RESET);
        assert_eq!(meter.session().liters(), 0.0);
        assert_eq!(rig.sink.last.top(), "Session Reset!");
    }

    #[test]
    fn weekly_walk_reads_history_slots() {
        let mut rig = Rig::new(DateTime::date(2024, 5, 1));
        let mut meter = rig.start();
        // Archive 7 L for May 1 into slot 0.
        rig.pour(450 * 7);
        rig.run(&mut meter, 0, 60_000, ButtonInputs::RELEASED);
        rig.clock.now = DateTime::date(2024, 5, 2);
        rig.run(&mut meter, 60_050, 120_000, ButtonInputs::RELEASED);
        assert_eq!(meter.ledger().daily_log().get(0), Ok(7));

        // On May 2, "D-1" is slot (2 - 1 - 1) = 0.
        let snap = meter.snapshot(rig.clock.now);
        assert_eq!(snap.history[1], 7);
        assert_eq!(snap.history[0], 0);
    }
}
