/// Errors returned by the accounting API when it is called with
/// out-of-range arguments.
///
/// Storage and clock I/O never produce errors at this layer; see
/// [`Storage`](super::Storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccountingError {
    /// Daily-log slot is out of bounds (must be < DAILY_LOG_SLOTS).
    InvalidLogSlot,
}
