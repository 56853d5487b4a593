/// What the main display area shows, cycled by the mode button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    #[default]
    FlowRate,
    Session,
    Today,
    ThisMonth,
    LastMonth,
    Total,
    CostToday,
    CostMonth,
    /// Multi-frame walk through the last seven daily-log entries.
    WeeklyHistory,
}

impl DisplayMode {
    /// Number of modes in the cycle.
    pub const COUNT: usize = 9;

    /// All modes in cycle order.
    pub const ALL: [DisplayMode; Self::COUNT] = [
        DisplayMode::FlowRate,
        DisplayMode::Session,
        DisplayMode::Today,
        DisplayMode::ThisMonth,
        DisplayMode::LastMonth,
        DisplayMode::Total,
        DisplayMode::CostToday,
        DisplayMode::CostMonth,
        DisplayMode::WeeklyHistory,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Following mode, wrapping after the last one.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    /// Heading printed on the first display line.
    pub fn title(self) -> &'static str {
        match self {
            DisplayMode::FlowRate => "FLOW RATE:",
            DisplayMode::Session => "SESSION VOL:",
            DisplayMode::Today => "TODAY:",
            DisplayMode::ThisMonth => "THIS MONTH:",
            DisplayMode::LastMonth => "LAST MONTH:",
            DisplayMode::Total => "TOTAL:",
            DisplayMode::CostToday => "TODAY COST:",
            DisplayMode::CostMonth => "MONTH COST:",
            DisplayMode::WeeklyHistory => "LAST 7 DAYS:",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_index_order() {
        for (i, mode) in DisplayMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn n_steps_from_k_lands_on_k_plus_n_mod_count() {
        for k in 0..DisplayMode::COUNT {
            for n in 0..25 {
                let mut mode = DisplayMode::ALL[k];
                for _ in 0..n {
                    mode = mode.next();
                }
                assert_eq!(mode.index(), (k + n) % DisplayMode::COUNT);
            }
        }
    }

    #[test]
    fn titles_fit_one_line() {
        for mode in DisplayMode::ALL {
            assert!(mode.title().len() <= 16);
        }
    }
}
