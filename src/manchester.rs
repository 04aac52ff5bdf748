//! Manchester line decoding for METEOR captures.
//!
//! Every data bit is carried as a two half-bit symbol, `10` for one and `01` for zero,
//! so each raw byte holds one nibble. A raw byte pair is read as a little-endian symbol
//! word: the second byte carries the high nibble.
use tracing::debug;

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        // first half-bit of each symbol
        table[i] = ((b >> 4) & 0b1000) | ((b >> 3) & 0b0100) | ((b >> 2) & 0b0010) | ((b >> 1) & 0b0001);
        i += 1;
    }
    table
}

/// Raw symbol byte to decoded nibble. Invalid symbols (`00`, `11`) decode by their first
/// half-bit.
pub const DECODE_TABLE: [u8; 256] = build_table();

/// Number of invalid symbols (`00` or `11`) in a raw byte.
#[must_use]
pub fn violations(raw: u8) -> u32 {
    (0..4)
        .map(|k| (raw >> (2 * k)) & 0b11)
        .filter(|s| *s == 0b00 || *s == 0b11)
        .count() as u32
}

/// Decode a single raw byte pair into one data byte.
#[must_use]
pub fn decode_pair(first: u8, second: u8) -> u8 {
    (DECODE_TABLE[second as usize] << 4) | DECODE_TABLE[first as usize]
}

/// Decode a raw capture. A trailing odd byte is dropped.
#[must_use]
pub fn decode(raw: &[u8]) -> Vec<u8> {
    let mut bad = 0u64;
    let out: Vec<u8> = raw
        .chunks_exact(2)
        .map(|pair| {
            bad += u64::from(violations(pair[0]) + violations(pair[1]));
            decode_pair(pair[0], pair[1])
        })
        .collect();
    debug!(
        raw_len = raw.len(),
        decoded_len = out.len(),
        violations = bad,
        "manchester decoded"
    );
    out
}

fn encode_nibble(nibble: u8) -> u8 {
    (0..4).rev().fold(0u8, |acc, k| {
        let symbol = if (nibble >> k) & 1 == 1 { 0b10 } else { 0b01 };
        (acc << 2) | symbol
    })
}

/// Encode one data byte into its raw byte pair, i.e., the inverse of [decode_pair].
#[must_use]
pub fn encode(byte: u8) -> [u8; 2] {
    [encode_nibble(byte & 0x0f), encode_nibble(byte >> 4)]
}
