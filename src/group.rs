//! Decoding a group's control words into an occupancy mask.
//!
//! Groups come in two encodings of the same information. The regular layout
//! keeps one control byte per slot: 0 is empty, the sentinel value marks the
//! end of the table, anything else is a reduced hash. The packed layout, used
//! when SIMD is unavailable, spreads each slot's reduced hash over two 64-bit
//! words, one nibble per word, one bit per 16-bit lane.

use crate::helpers::read_integral;
use crate::{Error, Result, TypedMemory, Value};

/// Bits of the occupancy mask; one per element slot of a 15-slot group.
pub const OCCUPANCY_BITS: u32 = 0x7FFF;

/// Element slots per group when the type does not record `N`.
pub const DEFAULT_GROUP_SLOTS: usize = 15;
/// Control byte of the sentinel slot when the type does not record `sentinel_`.
pub const DEFAULT_SENTINEL: u64 = 1;

const PACKED_SENTINEL_BITS: u64 = 0x4000_4000_4000_4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupLayout {
    /// 16 one-byte control slots
    Regular,
    /// 2 interleaved 64-bit control words
    Packed,
}

impl GroupLayout {
    /// Layout implied by the length of a group's `m` array.
    pub fn from_arity(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Regular),
            2 => Some(Self::Packed),
            _ => None,
        }
    }

    /// Occupied slots of a group, bit `i` for slot `i`. The sentinel slot
    /// counts as occupied, which is what stops a traversal on it.
    pub fn match_occupied(&self, control: &[u64]) -> u32 {
        match (self, control) {
            (Self::Regular, _) => {
                let empty = control
                    .iter()
                    .take(16)
                    .enumerate()
                    .filter(|(_, c)| **c == 0)
                    .fold(0u32, |acc, (b, _)| acc | 1 << b);
                !empty & OCCUPANCY_BITS
            }
            (Self::Packed, [low, high, ..]) => {
                let x = low | high;
                let y = x | (x >> 32);
                ((y | (y >> 16)) as u32) & OCCUPANCY_BITS
            }
            (Self::Packed, _) => 0,
        }
    }

    /// Whether slot `n` of a group holds the end-of-table sentinel.
    pub fn is_sentinel(&self, control: &[u64], n: usize, slots: usize, sentinel: u64) -> bool {
        if slots.checked_sub(1) != Some(n) {
            return false;
        }
        match (self, control) {
            (Self::Regular, _) => control.get(n) == Some(&sentinel),
            (Self::Packed, [low, high, ..]) => {
                low & PACKED_SENTINEL_BITS == 0x4000 && high & PACKED_SENTINEL_BITS == 0
            }
            (Self::Packed, _) => false,
        }
    }
}

/// Store reduced hash `hash` for slot `pos` of a packed group: bit `i` of the
/// hash goes to lane `i % 4` of word `i / 4`.
pub fn packed_set(words: &mut [u64; 2], pos: usize, hash: u8) {
    for (word, nibble) in words.iter_mut().zip([hash & 0xF, hash >> 4]) {
        for lane in 0..4 {
            let bit = 1u64 << (pos + 16 * lane);
            if nibble & (1 << lane) != 0 {
                *word |= bit;
            } else {
                *word &= !bit;
            }
        }
    }
}

/// The shape shared by every group of one table, read once from its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupShape {
    pub layout: GroupLayout,
    /// Element slots per group
    pub slots: usize,
    pub sentinel: u64,
    /// Size of one group in bytes
    pub size: usize,
}

impl GroupShape {
    /// Inspect the group type behind `group` (any value of that type).
    pub fn of<M: TypedMemory + ?Sized>(memory: &M, group: Value) -> Result<Self> {
        let m = memory.field(group, "m")?;
        let arity = memory.array_len(m)?;
        let layout = GroupLayout::from_arity(arity).ok_or_else(|| Error::UnsupportedGroupLayout {
            ty: memory.type_info(group.ty).map(|t| t.name.clone()).unwrap_or_default(),
            len: arity,
        })?;
        let slots = memory
            .constant(group.ty, "N")?
            .map_or(DEFAULT_GROUP_SLOTS, |n| n as usize);
        if !(1..=DEFAULT_GROUP_SLOTS).contains(&slots) {
            return Err(Error::UnsupportedGroupSlots {
                ty: memory.type_info(group.ty).map(|t| t.name.clone()).unwrap_or_default(),
                slots,
            });
        }
        let sentinel = memory.constant(group.ty, "sentinel_")?.unwrap_or(DEFAULT_SENTINEL);
        Ok(Self {
            layout,
            slots,
            sentinel,
            size: memory.size_of(group.ty)?,
        })
    }

    /// Read the control words of `group`, atomics unwrapped.
    pub fn control<M: TypedMemory + ?Sized>(&self, memory: &M, group: Value) -> Result<Vec<u64>> {
        let m = memory.field(group, "m")?;
        (0..memory.array_len(m)?)
            .map(|b| read_integral(memory, memory.index(m, b)?))
            .collect()
    }

    pub fn match_occupied<M: TypedMemory + ?Sized>(&self, memory: &M, group: Value) -> Result<u32> {
        Ok(self.layout.match_occupied(&self.control(memory, group)?))
    }

    pub fn is_sentinel<M: TypedMemory + ?Sized>(
        &self,
        memory: &M,
        group: Value,
        n: usize,
    ) -> Result<bool> {
        let control = self.control(memory, group)?;
        Ok(self.layout.is_sentinel(&control, n, self.slots, self.sentinel))
    }
}
