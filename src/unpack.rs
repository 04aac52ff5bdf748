//! Sample unpacking.
//!
//! Imager samples are 10 bits wide. They arrive either packed four to five bytes, most
//! significant bit first, or one per little-endian 16-bit word. Scan lines interleave
//! channels sample by sample.

/// Largest value a 10-bit sample can take.
pub const SAMPLE_MAX: u16 = 0x3ff;

/// Bytes holding one group of four packed samples.
pub const GROUP_LEN: usize = 5;

/// Unpack a group of 4 samples from 5 bytes.
#[must_use]
pub fn unpack10(group: &[u8; GROUP_LEN]) -> [u16; 4] {
    let b = group.map(u16::from);
    [
        (b[0] << 2) | (b[1] >> 6),
        ((b[1] % 64) << 4) | (b[2] >> 4),
        ((b[2] % 16) << 6) | (b[3] >> 2),
        ((b[3] % 4) << 8) | b[4],
    ]
}

/// Pack 4 samples into 5 bytes. Bits above the low 10 of each sample are ignored.
#[must_use]
pub fn pack10(samples: [u16; 4]) -> [u8; GROUP_LEN] {
    let s = samples.map(|v| v & SAMPLE_MAX);
    [
        (s[0] >> 2) as u8,
        (((s[0] & 0x3) << 6) | (s[1] >> 4)) as u8,
        (((s[1] & 0xf) << 4) | (s[2] >> 6)) as u8,
        (((s[2] & 0x3f) << 2) | (s[3] >> 8)) as u8,
        (s[3] & 0xff) as u8,
    ]
}

/// Unpack `count` samples from the start of `dat`. `count` is rounded up to a whole
/// number of groups. Returns `None` if `dat` is too short.
#[must_use]
pub fn unpack_samples(dat: &[u8], count: usize) -> Option<Vec<u16>> {
    let groups = count.div_ceil(4);
    let needed = groups * GROUP_LEN;
    if dat.len() < needed {
        return None;
    }
    let mut out = Vec::with_capacity(groups * 4);
    for chunk in dat[..needed].chunks_exact(GROUP_LEN) {
        let mut group = [0u8; GROUP_LEN];
        group.copy_from_slice(chunk);
        out.extend_from_slice(&unpack10(&group));
    }
    Some(out)
}

/// Read little-endian 16-bit words, keeping the low 10 bits of each. A trailing odd byte
/// is ignored.
#[must_use]
pub fn words_le(dat: &[u8]) -> Vec<u16> {
    dat.chunks_exact(2)
        .map(|w| u16::from_le_bytes([w[0], w[1]]) & SAMPLE_MAX)
        .collect()
}

/// Samples for 1-based `channel` from a scan line interleaving `channels` channels.
pub fn channel_samples(
    line: &[u16],
    channel: usize,
    channels: usize,
) -> impl Iterator<Item = u16> + '_ {
    line.iter()
        .skip(channel.saturating_sub(1))
        .step_by(channels.max(1))
        .copied()
}

/// Spread a 10-bit sample over the 16-bit display range.
#[must_use]
pub fn scale(sample: u16, multiplier: u16) -> u16 {
    (sample & SAMPLE_MAX).saturating_mul(multiplier)
}
