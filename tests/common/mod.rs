#![allow(dead_code)]
//! Synthetic capture builders.
use hrpt::{
    family::{NOAA_FRAME_WORDS, NOAA_SYNC},
    framing::{DerandomizationTable, Derandomizer, MpduHeader, ASM, CADU_LEN, MSU_MR_SPANS},
    manchester,
    satellite::{MSU_MR_FRAME_LEN, MSU_MR_SYNC},
    unpack::pack10,
};

pub const NOAA_IMAGE_OFFSET_WORDS: usize = 750;
pub const ZONE_LEN: usize = 882;
/// AVHRR packet user data long enough for a scan line starting at byte 80.
pub const AVHRR_USER_DATA_LEN: usize = 80 + 12800;
pub const METOP_SCID: u16 = 11;

/// Known sample value for a line, 1-based channel and pixel.
pub fn sample(line: usize, channel: usize, pixel: usize) -> u16 {
    ((line * 97 + channel * 31 + pixel) % 1024) as u16
}

/// Prepend `n` zero bits, shifting everything after them off byte boundaries.
pub fn prepend_bits(dat: &[u8], n: usize) -> Vec<u8> {
    let total = dat.len() * 8 + n;
    let mut out = vec![0u8; total.div_ceil(8)];
    for i in 0..dat.len() * 8 {
        if (dat[i / 8] >> (7 - i % 8)) & 1 == 1 {
            let j = i + n;
            out[j / 8] |= 1 << (7 - j % 8);
        }
    }
    out
}

/// Frames of `stride` bytes with the ASM at the start of each and zero payload.
pub fn asm_frames(count: usize, stride: usize) -> Vec<u8> {
    let mut dat = vec![0u8; count * stride];
    for frame in dat.chunks_mut(stride) {
        frame[..4].copy_from_slice(&ASM);
    }
    dat
}

pub fn noaa_capture(lines: usize) -> Vec<u8> {
    let mut dat = Vec::with_capacity(lines * NOAA_FRAME_WORDS * 2);
    for line in 0..lines {
        let mut words = vec![0u16; NOAA_FRAME_WORDS];
        for pixel in 0..2048 {
            for channel in 1..=5 {
                words[NOAA_IMAGE_OFFSET_WORDS + pixel * 5 + channel - 1] =
                    sample(line, channel, pixel);
            }
        }
        let mut frame: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        frame[..NOAA_SYNC.len()].copy_from_slice(&NOAA_SYNC);
        dat.extend(frame);
    }
    dat
}

pub fn msu_mr_frame(line: usize) -> Vec<u8> {
    let mut frame = vec![0u8; MSU_MR_FRAME_LEN];
    frame[..MSU_MR_SYNC.len()].copy_from_slice(&MSU_MR_SYNC);
    for group in 0..393 {
        for channel in 1..=6 {
            let offset = 50 + group * 30 + (channel - 1) * 5;
            let s = |k: usize| sample(line, channel, group * 4 + k);
            frame[offset..offset + 5].copy_from_slice(&pack10([s(0), s(1), s(2), s(3)]));
        }
    }
    frame
}

/// Manchester decoded METEOR transport frames carrying `lines` MSU-MR frames.
pub fn meteor_frames(lines: usize) -> Vec<u8> {
    let per_frame: usize = MSU_MR_SPANS.iter().map(|s| s.len).sum();
    let msu: Vec<u8> = (0..lines).flat_map(msu_mr_frame).collect();

    let mut dat = Vec::new();
    for chunk in msu.chunks(per_frame) {
        let mut padded = chunk.to_vec();
        padded.resize(per_frame, 0);

        let mut cadu = vec![0u8; CADU_LEN];
        cadu[..4].copy_from_slice(&ASM);
        let mut idx = 0;
        for span in MSU_MR_SPANS {
            cadu[span.offset..span.offset + span.len].copy_from_slice(&padded[idx..idx + span.len]);
            idx += span.len;
        }
        dat.extend(cadu);
    }
    dat
}

/// Raw, Manchester coded, METEOR capture.
pub fn meteor_capture(lines: usize) -> Vec<u8> {
    meteor_frames(lines)
        .iter()
        .flat_map(|b| manchester::encode(*b))
        .collect()
}

/// AVHRR packet whose image data starts `start` bytes into the user data.
pub fn avhrr_packet(apid: u16, line: usize, first: u8, start: usize) -> Vec<u8> {
    let mut user_data = vec![0u8; AVHRR_USER_DATA_LEN];
    user_data[0] = first;
    for group in 0..2560 {
        let s = |k: usize| {
            let idx = group * 4 + k;
            sample(line, idx % 5 + 1, idx / 5)
        };
        let offset = start + group * 5;
        user_data[offset..offset + 5].copy_from_slice(&pack10([s(0), s(1), s(2), s(3)]));
    }

    let len_minus1 = (user_data.len() - 1) as u16;
    let mut dat = vec![
        0x08 | (apid >> 8) as u8,
        apid as u8,
        0xc0 | (line >> 8) as u8,
        line as u8,
    ];
    dat.extend(len_minus1.to_be_bytes());
    dat.extend(user_data);
    dat
}

fn cadu(vcid: u16, counter: u32, first_header: u16, zone: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8; CADU_LEN - 4];
    let id = (1u16 << 14) | (METOP_SCID << 6) | (vcid & 0x3f);
    payload[..2].copy_from_slice(&id.to_be_bytes());
    payload[2..5].copy_from_slice(&counter.to_be_bytes()[1..]);
    payload[8..10].copy_from_slice(&(first_header & 0x7ff).to_be_bytes());
    payload[10..10 + zone.len()].copy_from_slice(zone);

    let mut out = ASM.to_vec();
    out.extend(DerandomizationTable::new().derandomize(&payload, 4));
    out
}

/// Inverted, randomized MetOp capture carrying `packets` on `vcid`, with a fill CADU
/// after every 3rd data CADU.
pub fn metop_capture(vcid: u16, packets: &[Vec<u8>]) -> Vec<u8> {
    let mut starts = Vec::new();
    let mut stream = Vec::new();
    for packet in packets {
        starts.push(stream.len());
        stream.extend_from_slice(packet);
    }
    stream.resize(stream.len().div_ceil(ZONE_LEN) * ZONE_LEN, 0);

    let mut dat = Vec::new();
    for (idx, zone) in stream.chunks(ZONE_LEN).enumerate() {
        let zone_start = idx * ZONE_LEN;
        let first_header = starts
            .iter()
            .find(|s| (zone_start..zone_start + ZONE_LEN).contains(*s))
            .map_or(MpduHeader::NO_HEADER, |s| (s - zone_start) as u16);
        dat.extend(cadu(vcid, idx as u32, first_header, zone));
        if idx % 3 == 2 {
            dat.extend(cadu(63, 0, MpduHeader::FILL, &[0x55; ZONE_LEN]));
        }
    }
    dat.iter().map(|b| !b).collect()
}
