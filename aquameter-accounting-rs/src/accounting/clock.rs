/// Calendar date and wall-clock time as reported by the real-time clock.
///
/// Fields are plain decimal values; any wire encoding is the driver's
/// concern. The accounting engine treats every field as ground truth and
/// performs no validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    /// 1–12.
    pub month: u8,
    /// 1–31.
    pub day: u8,
    /// 1–7, as kept by the clock chip.
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Convenience constructor for a date at midnight.
    pub const fn date(year: u16, month: u8, day: u8) -> Self {
        Self {
            year,
            month,
            day,
            day_of_week: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

/// Real-time clock collaborator.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Current calendar date and time.
    async fn now(&mut self) -> DateTime;

    /// Die temperature of the clock chip in degrees Celsius.
    async fn temperature(&mut self) -> f32;
}
