//! Template library occupancy

use crate::error::{Error, Result};

/// One page of the library index table
///
/// Each page covers 256 consecutive slots. Bit `n` of byte `i` (LSB first)
/// is set when slot `page * 256 + i * 8 + n` holds a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyPage {
    page: u8,
    bits: [u8; Self::SIZE],
}

impl OccupancyPage {
    /// Size of a page in bytes
    pub const SIZE: usize = 32;

    /// Slots covered by one page
    pub const SLOTS: usize = Self::SIZE * 8;

    /// Wrap the raw index table of `page`
    pub fn from_bytes(page: u8, bytes: &[u8]) -> Result<Self> {
        let bits: [u8; Self::SIZE] = bytes
            .get(..Self::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                Error::Parse(format!(
                    "index table page needs {} bytes, got {}",
                    Self::SIZE,
                    bytes.len()
                ))
            })?;

        Ok(Self { page, bits })
    }

    /// Page number
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Raw bitmap
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// First library slot covered by this page
    pub fn first_slot(&self) -> u16 {
        u16::from(self.page) * Self::SLOTS as u16
    }

    /// Check a slot by its library-wide number
    ///
    /// Slots outside this page are reported as free.
    pub fn is_occupied(&self, slot: u16) -> bool {
        let Some(offset) = slot.checked_sub(self.first_slot()) else {
            return false;
        };
        let offset = usize::from(offset);

        offset < Self::SLOTS && self.bits[offset / 8] & (1 << (offset % 8)) != 0
    }

    /// Number of occupied slots on this page
    pub fn count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Library-wide numbers of the occupied slots, ascending
    pub fn occupied_slots(&self) -> impl Iterator<Item = u16> + '_ {
        let first = self.first_slot();

        (0..Self::SLOTS)
            .filter(|&i| self.bits[i / 8] & (1 << (i % 8)) != 0)
            .map(move |i| first + i as u16)
    }

    /// Lowest free slot on this page
    pub fn first_free(&self) -> Option<u16> {
        let first = self.first_slot();

        (0..Self::SLOTS)
            .find(|&i| self.bits[i / 8] & (1 << (i % 8)) == 0)
            .map(|i| first + i as u16)
    }
}
