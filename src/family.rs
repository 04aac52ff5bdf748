//! Satellite families and the per-family constants that drive decoding.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    framing::{SyncMarker, Thresholds, ASM, CADU_LEN},
    Error, Result,
};

/// NOAA HRPT minor frame sync, 6 little-endian 16-bit words.
pub const NOAA_SYNC: [u8; 12] = [
    0x84, 0x02, 0x6f, 0x01, 0x5c, 0x03, 0x9d, 0x01, 0x0f, 0x02, 0x95, 0x00,
];

/// Words in a NOAA HRPT minor frame.
pub const NOAA_FRAME_WORDS: usize = 11090;

/// A family of spacecraft sharing a downlink format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// NOAA POES HRPT, direct 16-bit word sync.
    Noaa,
    /// METEOR-M HRPT, Manchester coded CADUs carrying MSU-MR frames.
    Meteor,
    /// MetOp AHRPT, randomized CADUs carrying AVHRR space packets.
    Metop,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Noaa, Family::Meteor, Family::Metop];

    /// Number of interleaved imager channels.
    #[must_use]
    pub fn channels(&self) -> usize {
        match self {
            Family::Noaa | Family::Metop => 5,
            Family::Meteor => 6,
        }
    }

    /// Pixels per scan line.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Family::Noaa | Family::Metop => 2048,
            Family::Meteor => 1572,
        }
    }

    /// Factor spreading 10-bit samples over the 16-bit output range.
    #[must_use]
    pub fn multiplier(&self) -> u16 {
        match self {
            Family::Noaa => 40,
            Family::Meteor | Family::Metop => 60,
        }
    }

    /// Transport frame sync marker and stride.
    #[must_use]
    pub fn sync_marker(&self) -> SyncMarker {
        match self {
            Family::Noaa => SyncMarker::new(&NOAA_SYNC, NOAA_FRAME_WORDS * 2),
            Family::Meteor | Family::Metop => SyncMarker::new(&ASM, CADU_LEN),
        }
    }

    /// Per-state Hamming distance thresholds for the transport frame synchronizer.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        match self {
            Family::Noaa => Thresholds::EXACT,
            Family::Meteor => Thresholds {
                unlocked: 0,
                soft_lock: 6,
                resync: 2,
                hard_lock: 22,
            },
            Family::Metop => Thresholds {
                unlocked: 0,
                soft_lock: 2,
                resync: 6,
                hard_lock: 12,
            },
        }
    }

    /// True if the captured bits must be inverted before synchronization.
    #[must_use]
    pub fn inverted(&self) -> bool {
        matches!(self, Family::Metop)
    }

    /// Check that `channel` is a valid 1-based channel number for this family.
    ///
    /// # Errors
    /// [Error::InvalidChannel] if it is not.
    pub fn validate_channel(&self, channel: usize) -> Result<()> {
        let count = self.channels();
        if channel == 0 || channel > count {
            return Err(Error::InvalidChannel { channel, count });
        }
        Ok(())
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Family::Noaa => "noaa",
            Family::Meteor => "meteor",
            Family::Metop => "metop",
        };
        f.write_str(name)
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Family::ALL
            .into_iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownFamily(s.to_string()))
    }
}

/// Direction of the satellite pass over the receiving station.
///
/// Decoding does not depend on it; it is carried through to the output consumer, which
/// owns any flipping of the raster.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PassDirection {
    #[default]
    Northbound,
    Southbound,
}

/// What to decode, as chosen by the caller.
///
/// # Example
/// ```
/// use hrpt::family::{Family, PassDirection, Selection};
///
/// let selection = Selection::builder().family(Family::Meteor).channel(3).build();
/// assert_eq!(selection.direction, PassDirection::Northbound);
/// ```
#[derive(TypedBuilder, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub family: Family,
    /// 1-based channel number.
    pub channel: usize,
    #[builder(default)]
    #[serde(default)]
    pub direction: PassDirection,
}
