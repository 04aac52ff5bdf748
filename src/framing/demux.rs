//! Frame demultiplexing.
//!
//! Both demultiplexers consume [FrameStart]s in stream order and concatenate payload
//! bytes into a single stream. Frames are extracted in parallel but always reassembled
//! in frame order, since the output stream has no markers of its own to recover from a
//! reordered or missing frame.
use rayon::prelude::*;
use tracing::{debug, info};

use super::{DerandomizationTable, Derandomizer, FrameStart, MpduHeader, VCDUHeader, Vcid};
use crate::bits::BitSequence;

/// A fixed-length byte span at a byte offset from a frame start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

/// MSU-MR imager data locations inside a METEOR transport frame.
pub const MSU_MR_SPANS: [Span; 4] = [
    Span { offset: 22, len: 238 },
    Span { offset: 278, len: 238 },
    Span { offset: 534, len: 238 },
    Span { offset: 790, len: 234 },
];

fn in_stream_order(starts: &[FrameStart]) -> bool {
    starts.windows(2).all(|w| w[0].bit < w[1].bit)
}

/// Concatenate every span of every frame into one stream.
///
/// Frames whose spans run past the end of `bits` are dropped.
#[must_use]
pub fn extract_subchannels(bits: &BitSequence, starts: &[FrameStart], spans: &[Span]) -> Vec<u8> {
    debug_assert!(in_stream_order(starts), "frame starts out of order");

    let per_frame: usize = spans.iter().map(|s| s.len).sum();
    let chunks: Vec<Option<Vec<u8>>> = starts
        .par_iter()
        .map(|start| {
            let mut out = Vec::with_capacity(per_frame);
            for span in spans {
                out.extend(bits.read_bytes(start.bit + span.offset * 8, span.len)?);
            }
            Some(out)
        })
        .collect();

    let mut stream = Vec::with_capacity(chunks.len() * per_frame);
    let mut dropped = 0usize;
    for chunk in chunks {
        match chunk {
            Some(chunk) => stream.extend_from_slice(&chunk),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "frames truncated by end of capture");
    }
    info!(
        frames = starts.len() - dropped,
        bytes = stream.len(),
        "demultiplexed sub-channels"
    );
    stream
}

/// M-PDU packet zone bytes concatenated from every CADU of one virtual channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MpduStream {
    pub data: Vec<u8>,
    /// Byte offsets into `data` of packet primary headers declared by M-PDU headers.
    pub packet_offsets: Vec<usize>,
    /// Number of CADUs contributing to `data`.
    pub frames: usize,
}

enum Extracted {
    Truncated,
    OtherVcid,
    Zone { header: MpduHeader, zone: Vec<u8> },
}

/// Extracts M-PDU packet zones for a single VCID.
#[derive(Debug, Clone)]
pub struct MpduDemux {
    vcid: Vcid,
    pn: DerandomizationTable,
}

impl MpduDemux {
    /// Offset of the M-PDU header from the start of the payload following the ASM.
    pub const HEADER_OFFSET: usize = 8;
    /// Offset of the packet zone from the start of the payload following the ASM.
    pub const ZONE_OFFSET: usize = 10;
    /// Packet zone length.
    pub const ZONE_LEN: usize = 882;
    const ASM_LEN: usize = 4;
    const PAYLOAD_LEN: usize = super::CADU_LEN - Self::ASM_LEN;

    #[must_use]
    pub fn new(vcid: Vcid) -> Self {
        MpduDemux {
            vcid,
            pn: DerandomizationTable::new(),
        }
    }

    #[must_use]
    pub fn vcid(&self) -> Vcid {
        self.vcid
    }

    fn extract(&self, bits: &BitSequence, start: &FrameStart) -> Extracted {
        let Some(raw) = bits.read_bytes(start.bit + Self::ASM_LEN * 8, Self::PAYLOAD_LEN) else {
            return Extracted::Truncated;
        };
        let payload = self.pn.derandomize(&raw, Self::ASM_LEN);

        let (Some(vcdu), Some(header)) = (
            VCDUHeader::decode(&payload),
            MpduHeader::decode(&payload[Self::HEADER_OFFSET..]),
        ) else {
            return Extracted::Truncated;
        };
        if vcdu.vcid != self.vcid {
            return Extracted::OtherVcid;
        }
        Extracted::Zone {
            header,
            zone: payload[Self::ZONE_OFFSET..Self::ZONE_OFFSET + Self::ZONE_LEN].to_vec(),
        }
    }

    /// Derandomize every CADU at `starts` and concatenate the packet zones of those
    /// belonging to our VCID.
    #[must_use]
    pub fn demux(&self, bits: &BitSequence, starts: &[FrameStart]) -> MpduStream {
        debug_assert!(in_stream_order(starts), "frame starts out of order");

        let extracted: Vec<Extracted> = starts
            .par_iter()
            .map(|start| self.extract(bits, start))
            .collect();

        let mut stream = MpduStream::default();
        let (mut truncated, mut other, mut bad_pointer) = (0usize, 0usize, 0usize);
        for item in extracted {
            match item {
                Extracted::Truncated => truncated += 1,
                Extracted::OtherVcid => other += 1,
                Extracted::Zone { header, zone } => {
                    if header.has_header(Self::ZONE_LEN) {
                        stream
                            .packet_offsets
                            .push(stream.data.len() + usize::from(header.first_header));
                    } else if header.spare == 0 && header.first_header < MpduHeader::FILL {
                        bad_pointer += 1;
                    }
                    stream.data.extend_from_slice(&zone);
                    stream.frames += 1;
                }
            }
        }

        debug!(
            truncated,
            other_vcids = other,
            bad_pointer,
            "mpdu demultiplex skipped frames"
        );
        info!(
            vcid = self.vcid,
            frames = stream.frames,
            headers = stream.packet_offsets.len(),
            "demultiplexed mpdus"
        );
        stream
    }
}
