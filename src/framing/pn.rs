//! Frame-relative derandomization.
//!
//! The CCSDS pseudo-noise sequence is generated by the polynomial
//! `1 + x^3 + x^5 + x^7 + x^8` seeded with all ones. It is applied to every CADU byte
//! after the attached sync marker, so the table is indexed by byte offset from the start
//! of the CADU and the first 4 entries are zero.

/// Number of table entries, one per CADU byte.
pub const TABLE_LEN: usize = 1024;
const ASM_LEN: usize = 4;

const fn generate() -> [u8; TABLE_LEN] {
    let mut table = [0u8; TABLE_LEN];
    let mut state: u8 = 0xff;
    let mut i = ASM_LEN;
    while i < TABLE_LEN {
        let mut byte = 0u8;
        let mut j = 0;
        while j < 8 {
            byte = (byte << 1) | (state >> 7);
            // taps x^8, x^7, x^5, x^3 -> bits 7, 4, 2, 0
            let feedback = (state & 0x95).count_ones() as u8 & 1;
            state = (state << 1) | feedback;
            j += 1;
        }
        table[i] = byte;
        i += 1;
    }
    table
}

/// Reverses pseudo-randomization applied by the transmitter.
pub trait Derandomizer: Send + Sync {
    /// XOR mask for the byte at `idx` bytes from the start of the CADU.
    fn mask(&self, idx: usize) -> u8;

    /// Derandomize `dat`, whose first byte sits `offset` bytes from the start of the CADU.
    fn derandomize(&self, dat: &[u8], offset: usize) -> Vec<u8> {
        dat.iter()
            .enumerate()
            .map(|(i, b)| b ^ self.mask(offset + i))
            .collect()
    }
}

/// Precomputed CCSDS pseudo-noise table.
#[derive(Debug, Clone)]
pub struct DerandomizationTable {
    table: [u8; TABLE_LEN],
}

impl DerandomizationTable {
    #[must_use]
    pub const fn new() -> Self {
        DerandomizationTable { table: generate() }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.table
    }
}

impl Default for DerandomizationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Derandomizer for DerandomizationTable {
    /// Indexes beyond the table are returned unchanged.
    fn mask(&self, idx: usize) -> u8 {
        self.table.get(idx).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_ccsds_sequence() {
        let pn = DerandomizationTable::new();
        let expected = hex::decode("ff480ec09a0d70bc8e2c93ad").unwrap();
        assert_eq!(&pn.as_bytes()[..4], &[0, 0, 0, 0]);
        assert_eq!(&pn.as_bytes()[4..16], &expected[..]);
    }

    #[test]
    fn derandomize_is_self_inverse() {
        let pn = DerandomizationTable::default();
        for idx in 0..TABLE_LEN {
            for x in [0x00u8, 0x5a, 0xff] {
                let once = x ^ pn.mask(idx);
                assert_eq!(once ^ pn.mask(idx), x, "idx {idx}");
            }
        }

        let dat: Vec<u8> = (0..=255).collect();
        let scrambled = pn.derandomize(&dat, 700);
        assert_eq!(pn.derandomize(&scrambled, 700), dat);
    }

    #[test]
    fn mask_out_of_range_is_identity() {
        let pn = DerandomizationTable::default();
        assert_eq!(pn.mask(TABLE_LEN), 0);
        assert_eq!(pn.derandomize(&[0x12, 0x34], TABLE_LEN), vec![0x12, 0x34]);
    }
}
