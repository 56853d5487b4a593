use super::pulse::PulseCounter;
use super::SAMPLE_INTERVAL_MS;

/// Result of one sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowSample {
    /// Pulses drained for this window.
    pub pulses: u32,
    /// Actual window length in milliseconds (≥ [`SAMPLE_INTERVAL_MS`]).
    pub elapsed_ms: u64,
    /// Instantaneous flow rate in liters per minute.
    pub rate_lpm: f32,
    /// Volume that flowed during the window, in liters.
    pub volume_l: f32,
}

impl FlowSample {
    /// Convert a pulse count over a window into rate and volume.
    ///
    /// `rate = pulses * 60000 / (calibration * elapsed_ms)` and
    /// `volume = pulses / calibration`.
    pub fn compute(pulses: u32, elapsed_ms: u64, calibration: f32) -> Self {
        let pulses_f = pulses as f32;
        let rate_lpm = if pulses == 0 {
            0.0
        } else {
            pulses_f * 60_000.0 / (calibration * elapsed_ms as f32)
        };

        Self {
            pulses,
            elapsed_ms,
            rate_lpm,
            volume_l: pulses_f / calibration,
        }
    }
}

/// Volume accumulated in RAM since the last commit cycle.
///
/// Never negative. Only the whole-liter part leaves through
/// [`take_whole_liters()`](Self::take_whole_liters); the fraction carries
/// into the next cycle. Lost on power loss.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionVolume {
    liters: f32,
}

impl SessionVolume {
    pub const fn new() -> Self {
        Self { liters: 0.0 }
    }

    pub fn liters(&self) -> f32 {
        self.liters
    }

    /// Add a sampled increment. Negative or NaN increments are ignored.
    pub fn add(&mut self, liters: f32) {
        if liters > 0.0 {
            self.liters += liters;
        }
    }

    /// Remove and return `floor(volume)`, keeping the fractional remainder.
    pub fn take_whole_liters(&mut self) -> u32 {
        // Truncation equals floor for a non-negative value.
        let whole = self.liters as u32;
        self.liters -= whole as f32;
        whole
    }

    pub fn reset(&mut self) {
        self.liters = 0.0;
    }
}

/// Converts drained pulse counts into flow rate and session volume once per
/// [`SAMPLE_INTERVAL_MS`].
#[derive(Debug, Clone, Copy)]
pub struct FlowSampler {
    last_sample_ms: u64,
    rate_lpm: f32,
}

impl FlowSampler {
    /// Create a sampler whose first window starts at `now_ms`.
    pub const fn new(now_ms: u64) -> Self {
        Self {
            last_sample_ms: now_ms,
            rate_lpm: 0.0,
        }
    }

    /// Most recent flow rate in liters per minute.
    pub fn rate_lpm(&self) -> f32 {
        self.rate_lpm
    }

    /// Sample the counter if a full window has elapsed.
    ///
    /// Drains `counter`, updates the stored rate and adds the volume
    /// increment to `session`. Returns `None` without touching the counter
    /// when called early.
    pub fn sample(
        &mut self,
        now_ms: u64,
        counter: &PulseCounter,
        calibration: f32,
        session: &mut SessionVolume,
    ) -> Option<FlowSample> {
        let elapsed_ms = now_ms.saturating_sub(self.last_sample_ms);
        if elapsed_ms < SAMPLE_INTERVAL_MS {
            return None;
        }

        let sample = FlowSample::compute(counter.drain(), elapsed_ms, calibration);
        self.rate_lpm = sample.rate_lpm;
        session.add(sample.volume_l);
        self.last_sample_ms = now_ms;

        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_liter_in_one_second() {
        let sample = FlowSample::compute(450, 1_000, 450.0);
        assert_eq!(sample.rate_lpm, 60.0);
        assert_eq!(sample.volume_l, 1.0);
    }

    #[test]
    fn rate_scales_with_window_length() {
        let sample = FlowSample::compute(450, 2_000, 450.0);
        assert_eq!(sample.rate_lpm, 30.0);
        assert_eq!(sample.volume_l, 1.0);
    }

    #[test]
    fn zero_pulses_is_zero_rate() {
        let sample = FlowSample::compute(0, 1_000, 450.0);
        assert_eq!(sample.rate_lpm, 0.0);
        assert_eq!(sample.volume_l, 0.0);
    }

    #[test]
    fn sample_is_gated_by_interval() {
        let counter = PulseCounter::new();
        let mut session = SessionVolume::new();
        let mut sampler = FlowSampler::new(0);

        counter.record_pulse();
        assert!(sampler.sample(999, &counter, 450.0, &mut session).is_none());
        // Early call must not drain.
        assert_eq!(counter.peek(), 1);

        let sample = sampler.sample(1_000, &counter, 450.0, &mut session).unwrap();
        assert_eq!(sample.pulses, 1);
        assert_eq!(counter.peek(), 0);
    }

    #[test]
    fn window_restarts_at_last_sample() {
        let counter = PulseCounter::new();
        let mut session = SessionVolume::new();
        let mut sampler = FlowSampler::new(0);

        sampler.sample(1_250, &counter, 450.0, &mut session).unwrap();
        assert!(sampler.sample(2_000, &counter, 450.0, &mut session).is_none());
        let sample = sampler.sample(2_250, &counter, 450.0, &mut session).unwrap();
        assert_eq!(sample.elapsed_ms, 1_000);
    }

    #[test]
    fn session_accumulates_increments() {
        let counter = PulseCounter::new();
        let mut session = SessionVolume::new();
        let mut sampler = FlowSampler::new(0);

        for (i, pulses) in [225u32, 450, 900].iter().enumerate() {
            for _ in 0..*pulses {
                counter.record_pulse();
            }
            sampler
                .sample((i as u64 + 1) * 1_000, &counter, 450.0, &mut session)
                .unwrap();
        }

        assert_eq!(session.liters(), 0.5 + 1.0 + 2.0);
        assert_eq!(sampler.rate_lpm(), 120.0);
    }

    #[test]
    fn take_whole_liters_keeps_remainder() {
        let mut session = SessionVolume::new();
        session.add(3.75);
        assert_eq!(session.take_whole_liters(), 3);
        assert_eq!(session.liters(), 0.75);
        assert_eq!(session.take_whole_liters(), 0);
        assert_eq!(session.liters(), 0.75);
    }

    #[test]
    fn session_ignores_negative_increments() {
        let mut session = SessionVolume::new();
        session.add(-1.0);
        session.add(f32::NAN);
        assert_eq!(session.liters(), 0.0);
    }
}
