//! Nonvolatile storage collaborator and the ledger's memory map.
//!
//! ```text
//! offset  field                        width
//!   0     total liters                 u32
//!   4     current month liters         u32
//!   8     previous month liters        u32
//!  12     current day liters           u32
//!  16     calibration (pulses/liter)   f32
//!  20     last month                   u8
//!  21     last day                     u8
//!  22     cost per liter               f32
//!  30     daily log [0..30]            30 × u32
//! ```
//!
//! Multi-byte fields are stored in native byte order.

use super::DAILY_LOG_SLOTS;

pub(crate) const ADDR_TOTAL_LITERS: u16 = 0;
pub(crate) const ADDR_CURRENT_MONTH: u16 = 4;
pub(crate) const ADDR_PREVIOUS_MONTH: u16 = 8;
pub(crate) const ADDR_CURRENT_DAY: u16 = 12;
pub(crate) const ADDR_CALIBRATION: u16 = 16;
pub(crate) const ADDR_LAST_MONTH: u16 = 20;
pub(crate) const ADDR_LAST_DAY: u16 = 21;
pub(crate) const ADDR_COST_PER_LITER: u16 = 22;
pub(crate) const ADDR_DAILY_LOG_START: u16 = 30;

/// Size in bytes of the whole memory map.
pub const MEMORY_MAP_LEN: usize = ADDR_DAILY_LOG_START as usize + DAILY_LOG_SLOTS * 4;

/// Byte-addressable nonvolatile storage.
///
/// Implementations own any inter-write settling delay the medium needs.
/// Both operations are infallible here: a failed read leaves whatever the
/// transport delivered in `buf`, and no retry or checksum is attempted.
#[allow(async_fn_in_trait)]
pub trait Storage {
    async fn read_bytes(&mut self, address: u16, buf: &mut [u8]);

    async fn write_bytes(&mut self, address: u16, data: &[u8]);
}

/// Byte address of daily-log slot `slot`.
pub(crate) fn log_slot_address(slot: usize) -> u16 {
    ADDR_DAILY_LOG_START + (slot as u16) * 4
}

pub(crate) async fn read_u32<S: Storage>(storage: &mut S, address: u16) -> u32 {
    let mut buf = [0u8; 4];
    storage.read_bytes(address, &mut buf).await;
    u32::from_ne_bytes(buf)
}

pub(crate) async fn write_u32<S: Storage>(storage: &mut S, address: u16, value: u32) {
    storage.write_bytes(address, &value.to_ne_bytes()).await;
}

pub(crate) async fn read_f32<S: Storage>(storage: &mut S, address: u16) -> f32 {
    let mut buf = [0u8; 4];
    storage.read_bytes(address, &mut buf).await;
    f32::from_ne_bytes(buf)
}

pub(crate) async fn write_f32<S: Storage>(storage: &mut S, address: u16, value: f32) {
    storage.write_bytes(address, &value.to_ne_bytes()).await;
}

pub(crate) async fn read_u8<S: Storage>(storage: &mut S, address: u16) -> u8 {
    let mut buf = [0u8; 1];
    storage.read_bytes(address, &mut buf).await;
    buf[0]
}

pub(crate) async fn write_u8<S: Storage>(storage: &mut S, address: u16, value: u8) {
    storage.write_bytes(address, &[value]).await;
}

/// RAM-backed [`Storage`] holding one image of the memory map.
///
/// Fresh instances read back as `0xFF`, like an erased EEPROM. Accesses
/// beyond [`MEMORY_MAP_LEN`] read `0xFF` and drop writes.
#[derive(Clone)]
pub struct MemoryStorage {
    bytes: [u8; MEMORY_MAP_LEN],
    writes: usize,
}

impl MemoryStorage {
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; MEMORY_MAP_LEN],
            writes: 0,
        }
    }

    /// Raw image of the memory map.
    pub fn as_bytes(&self) -> &[u8; MEMORY_MAP_LEN] {
        &self.bytes
    }

    /// Number of `write_bytes` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    async fn read_bytes(&mut self, address: u16, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self
                .bytes
                .get(address as usize + i)
                .copied()
                .unwrap_or(0xFF);
        }
    }

    async fn write_bytes(&mut self, address: u16, data: &[u8]) {
        self.writes += 1;
        for (i, &byte) in data.iter().enumerate() {
            if let Some(slot) = self.bytes.get_mut(address as usize + i) {
                *slot = byte;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn memory_map_ends_after_last_log_slot() {
        assert_eq!(MEMORY_MAP_LEN, 150);
        assert_eq!(log_slot_address(0), 30);
        assert_eq!(log_slot_address(29), 146);
    }

    #[test]
    fn fresh_storage_reads_erased() {
        let mut storage = MemoryStorage::new();
        assert_eq!(block_on(read_u32(&mut storage, ADDR_TOTAL_LITERS)), u32::MAX);
        assert_eq!(block_on(read_u8(&mut storage, ADDR_LAST_DAY)), 0xFF);
    }

    #[test]
    fn fields_land_at_their_offsets() {
        let mut storage = MemoryStorage::new();
        block_on(async {
            write_u32(&mut storage, ADDR_CURRENT_DAY, 0x0102_0304).await;
            write_f32(&mut storage, ADDR_COST_PER_LITER, 0.05).await;
            write_u8(&mut storage, ADDR_LAST_MONTH, 7).await;
        });

        let image = storage.as_bytes();
        assert_eq!(&image[12..16], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(&image[22..26], &0.05f32.to_ne_bytes());
        assert_eq!(image[20], 7);
        // Neighbouring byte untouched.
        assert_eq!(image[21], 0xFF);
        assert_eq!(storage.write_count(), 3);
    }

    #[test]
    fn out_of_range_access_is_harmless() {
        let mut storage = MemoryStorage::new();
        let mut buf = [0u8; 4];
        block_on(async {
            storage.write_bytes(148, &[1, 2, 3, 4]).await;
            storage.read_bytes(148, &mut buf).await;
        });
        assert_eq!(buf, [1, 2, 0xFF, 0xFF]);
    }
}
