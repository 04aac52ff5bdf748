//! Bit-addressable views over captured byte streams.
//!
//! A [BitSequence] owns a packed copy of the capture, normalized so that bit 0
//! is the most significant bit of byte 0 regardless of the on-air bit order, with
//! any polarity inversion already applied.

/// Order in which the bits of each captured byte were transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

/// Fixed-length, randomly indexable sequence of bits backed by a byte buffer.
#[derive(Debug, Clone, Default)]
pub struct BitSequence {
    data: Vec<u8>,
    len: usize,
}

impl BitSequence {
    /// Maximum number of bits returned by a single [BitSequence::window].
    pub const MAX_WINDOW: usize = 128;

    /// Expand `bytes` into a bit sequence read in `order`, inverting every bit when
    /// `invert` is set.
    #[must_use]
    pub fn new(bytes: &[u8], order: BitOrder, invert: bool) -> Self {
        let data = bytes
            .iter()
            .map(|b| {
                let b = match order {
                    BitOrder::MsbFirst => *b,
                    BitOrder::LsbFirst => b.reverse_bits(),
                };
                if invert {
                    !b
                } else {
                    b
                }
            })
            .collect();
        Self::from_bytes(data)
    }

    /// Take ownership of MSB-first, non-inverted bytes without copying.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let len = data.len() * 8;
        BitSequence { data, len }
    }

    /// Number of bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the bit at `idx`, or `None` if out of range.
    #[must_use]
    pub fn bit(&self, idx: usize) -> Option<bool> {
        if idx >= self.len {
            return None;
        }
        Some((self.data[idx / 8] >> (7 - idx % 8)) & 1 == 1)
    }

    /// Read `width` bits starting at bit `pos` into the low bits of an integer, first bit
    /// most significant. Returns `None` if the window runs past the end of the sequence or
    /// `width` exceeds [BitSequence::MAX_WINDOW].
    #[must_use]
    pub fn window(&self, pos: usize, width: usize) -> Option<u128> {
        if width > Self::MAX_WINDOW || pos.checked_add(width)? > self.len {
            return None;
        }
        let mut acc: u128 = 0;
        let mut bit = pos;
        let mut taken = 0;
        while taken < width {
            let offset = bit % 8;
            let avail = (8 - offset).min(width - taken);
            // drop bits before the window, then bits after it
            let chunk = (self.data[bit / 8] << offset) >> (8 - avail);
            acc = (acc << avail) | u128::from(chunk);
            taken += avail;
            bit += avail;
        }
        Some(acc)
    }

    /// Read the byte whose first bit is at bit `pos`.
    #[must_use]
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.window(pos, 8).map(|b| b as u8)
    }

    /// Read `count` consecutive bytes starting at bit `pos`, or `None` if they are not
    /// all available.
    #[must_use]
    pub fn read_bytes(&self, pos: usize, count: usize) -> Option<Vec<u8>> {
        let end = pos.checked_add(count.checked_mul(8)?)?;
        if end > self.len {
            return None;
        }
        if pos % 8 == 0 {
            let start = pos / 8;
            return Some(self.data[start..start + count].to_vec());
        }
        (0..count).map(|i| self.byte_at(pos + i * 8)).collect()
    }
}

/// Number of differing bits between two equal-width windows.
#[must_use]
pub fn hamming_distance(a: u128, b: u128) -> u32 {
    (a ^ b).count_ones()
}
