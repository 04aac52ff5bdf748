//! Transport frame recovery.
//!
//! References:
//! * CCSDS TM Synchronization and Channel Coding 131.0-B-3
//! * CCSDS AOS Space Data Link Protocol 732.0-B-3
mod demux;
mod pn;
mod synchronizer;

pub use demux::*;
pub use pn::*;
pub use synchronizer::*;

use serde::{Deserialize, Serialize};

pub type Scid = u16;
pub type Vcid = u16;

/// CCSDS attached sync marker used by the CADU-based families.
pub const ASM: [u8; 4] = [0x1a, 0xcf, 0xfc, 0x1d];

/// Total length of a CADU, including the ASM.
pub const CADU_LEN: usize = 1024;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct VCDUHeader {
    pub version: u8,
    pub scid: Scid,
    pub vcid: Vcid,
    pub counter: u32,
    pub replay: bool,
}

impl VCDUHeader {
    /// VCDU header length in bytes
    pub const LEN: usize = 6;
    /// VCID indicating a fill frame
    pub const FILL: Vcid = 63;

    /// Construct from the provided bytes, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }

        let x = u16::from_be_bytes([dat[0], dat[1]]);
        Some(VCDUHeader {
            version: (dat[0] >> 6) & 0x3,
            scid: ((x >> 6) & 0xff),
            vcid: (x & 0x3f),
            counter: u32::from_be_bytes([0, dat[2], dat[3], dat[4]]),
            replay: (dat[5] >> 7) & 0x1 == 1,
        })
    }
}

/// The 2-byte M-PDU header preceding the M-PDU packet zone.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpduHeader {
    /// Spare bits, zero for a well formed header.
    pub spare: u8,
    /// Offset into the packet zone of the first packet primary header.
    pub first_header: u16,
}

impl MpduHeader {
    pub const LEN: usize = 2;
    /// First-header pointer value indicating fill data
    pub const FILL: u16 = 0x7fe;
    /// First-header pointer value indicating no packet primary header in this M-PDU
    pub const NO_HEADER: u16 = 0x7ff;

    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(MpduHeader {
            spare: dat[0] >> 3,
            first_header: u16::from_be_bytes([dat[0] & 0x7, dat[1]]),
        })
    }

    /// True when the header declares a packet boundary inside a packet zone of
    /// `zone_len` bytes.
    #[must_use]
    pub fn has_header(&self, zone_len: usize) -> bool {
        self.spare == 0 && usize::from(self.first_header) < zone_len
    }
}
