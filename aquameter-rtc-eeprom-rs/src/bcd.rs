//! Packed binary-coded decimal, as used by the DS3231 time registers.

/// Decode a packed-BCD byte (`0x59` → `59`).
pub fn to_decimal(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Encode a value in `0..=99` as packed BCD (`59` → `0x59`).
pub fn from_decimal(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_nibbles() {
        assert_eq!(to_decimal(0x00), 0);
        assert_eq!(to_decimal(0x09), 9);
        assert_eq!(to_decimal(0x10), 10);
        assert_eq!(to_decimal(0x59), 59);
        assert_eq!(to_decimal(0x99), 99);
    }

    #[test]
    fn encodes_both_nibbles() {
        assert_eq!(from_decimal(0), 0x00);
        assert_eq!(from_decimal(7), 0x07);
        assert_eq!(from_decimal(31), 0x31);
        assert_eq!(from_decimal(99), 0x99);
    }

    #[test]
    fn every_two_digit_value_survives() {
        for v in 0..=99u8 {
            assert_eq!(to_decimal(from_decimal(v)), v);
        }
    }
}
