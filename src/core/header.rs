//! In-band slot header
//!
//! Layout (one native-endian `u64` word in front of every slot):
//! ```text
//! bit 0      : padded flag
//! bits 1..63 : size
//! ```
//! A payload header carries the payload length. A padding header carries the
//! number of filler bytes that follow it, so that skipping header + filler
//! lands exactly on offset 0 of the storage.

use std::mem;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = mem::size_of::<u64>();

const PADDED_BIT: u64 = 1;

/// Decoded form of the header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotHeader {
    /// Filler bridging the end of the storage back to offset 0.
    Padding { skip: u64 },
    /// A real message of `len` bytes follows.
    Payload { len: u64 },
}

impl SlotHeader {
    /// Largest size representable in the 63-bit size field.
    pub const MAX_SIZE: u64 = u64::MAX >> 1;

    #[inline(always)]
    pub const fn encode(self) -> u64 {
        match self {
            Self::Padding { skip } => (skip << 1) | PADDED_BIT,
            Self::Payload { len } => len << 1,
        }
    }

    #[inline(always)]
    pub const fn decode(raw: u64) -> Self {
        let size = raw >> 1;
        if raw & PADDED_BIT != 0 {
            Self::Padding { skip: size }
        } else {
            Self::Payload { len: size }
        }
    }

    #[inline(always)]
    pub const fn is_padding(self) -> bool {
        matches!(self, Self::Padding { .. })
    }
}
