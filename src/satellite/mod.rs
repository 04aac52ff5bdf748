//! Per-family decoders composing synchronization, demultiplexing and unpacking into scan
//! lines.
//!
//! Each decoder makes a single pass over its capture in [SatelliteDecoder::process],
//! building an inventory of raw scan lines. Channels are then cut from that inventory as
//! many times as needed with [SatelliteDecoder::decode_channel].
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::{
    capture::Capture,
    family::{Family, PassDirection, Selection},
    framing::{Tuning, Vcid},
    offsets::PixelStart,
    spacepacket::Apid,
    unpack, Result,
};

mod meteor;
mod metop;
mod noaa;

pub use meteor::{MeteorDecoder, MSU_MR_FRAME_LEN, MSU_MR_SYNC};
pub use metop::MetopDecoder;
pub use noaa::NoaaDecoder;

/// Decoder for a single capture of one [Family].
pub trait SatelliteDecoder: Send {
    fn family(&self) -> Family;

    /// Recover every scan line in the capture. Only the first call does any work.
    ///
    /// # Errors
    /// If the worker pool fails or the scan lines cannot be assembled into a raster.
    fn process(&mut self) -> Result<()>;

    /// Raster of the 1-based `channel`, one row per scan line. Empty if the capture has
    /// not been processed or holds no frames.
    ///
    /// # Errors
    /// [crate::Error::InvalidChannel] if the family has no such channel.
    fn decode_channel(&self, channel: usize) -> Result<ChannelImage>;

    /// Number of scan lines recovered by [SatelliteDecoder::process].
    fn frame_count(&self) -> usize;
}

/// Scaled samples for one channel, `(frame_count, width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelImage {
    pub family: Family,
    pub channel: usize,
    pub direction: PassDirection,
    pixels: Array2<u16>,
}

impl ChannelImage {
    #[must_use]
    pub fn new(family: Family, channel: usize, pixels: Array2<u16>) -> Self {
        ChannelImage {
            family,
            channel,
            direction: PassDirection::default(),
            pixels,
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: PassDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    /// Number of scan lines.
    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    #[must_use]
    pub fn pixels(&self) -> &Array2<u16> {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> Array2<u16> {
        self.pixels
    }
}

/// Decoding options. Everything has a sensible default.
///
/// # Example
/// ```
/// use hrpt::satellite::DecoderOptions;
///
/// let options = DecoderOptions::builder().num_threads(2).build();
/// assert_eq!(options.vcid, 9);
/// assert_eq!(options.apids, vec![103, 104]);
/// ```
#[derive(TypedBuilder, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Number of threads used for per-frame work. 0 uses the global rayon pool.
    #[builder(default)]
    pub num_threads: usize,
    /// Virtual channel carrying AVHRR packets.
    #[builder(default = 9)]
    pub vcid: Vcid,
    /// Packet APIDs carrying AVHRR scan lines.
    #[builder(default = vec![103, 104])]
    pub apids: Vec<Apid>,
    /// Location of image data in AVHRR packets.
    #[builder(default)]
    pub pixel_start: PixelStart,
    /// Transport frame synchronizer counters.
    #[builder(default)]
    pub tuning: Tuning,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions::builder().build()
    }
}

/// Runs per-frame work on either a dedicated pool or the global one.
#[derive(Debug)]
pub(crate) struct Workers {
    pool: Option<rayon::ThreadPool>,
}

impl Workers {
    pub(crate) fn new(num_threads: usize) -> Result<Self> {
        let pool = if num_threads == 0 {
            None
        } else {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()?,
            )
        };
        Ok(Workers { pool })
    }

    pub(crate) fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Stack raw scan lines of `line_len` interleaved samples into a raster. Lines of the
/// wrong length are zero-filled or truncated.
pub(crate) fn stack_lines(lines: Vec<Vec<u16>>, line_len: usize) -> Result<Array2<u16>> {
    let rows = lines.len();
    let mut flat = Vec::with_capacity(rows * line_len);
    for mut line in lines {
        if line.len() != line_len {
            debug!(len = line.len(), expected = line_len, "resizing scan line");
        }
        line.resize(line_len, 0);
        flat.extend_from_slice(&line);
    }
    Ok(Array2::from_shape_vec((rows, line_len), flat)?)
}

/// Cut the scaled samples of one channel from a raster of channel-interleaved lines.
pub(crate) fn channel_image(
    family: Family,
    lines: &Array2<u16>,
    channel: usize,
) -> Result<ChannelImage> {
    family.validate_channel(channel)?;
    let step = family.channels() as isize;
    let multiplier = family.multiplier();
    let pixels = lines
        .slice(s![.., (channel - 1)..;step])
        .mapv(|v| unpack::scale(v, multiplier));
    Ok(ChannelImage::new(family, channel, pixels))
}

/// Create the decoder for `family`.
///
/// # Errors
/// If a dedicated worker pool was requested and could not be built.
pub fn decoder_for(
    family: Family,
    capture: Capture,
    options: DecoderOptions,
) -> Result<Box<dyn SatelliteDecoder>> {
    Ok(match family {
        Family::Noaa => Box::new(NoaaDecoder::new(capture, options)?),
        Family::Meteor => Box::new(MeteorDecoder::new(capture, options)?),
        Family::Metop => Box::new(MetopDecoder::new(capture, options)?),
    })
}

/// Decode the selected channel from `capture`.
///
/// # Example
/// ```
/// use hrpt::capture::Capture;
/// use hrpt::family::{Family, Selection};
/// use hrpt::satellite::{decode, DecoderOptions};
///
/// let selection = Selection::builder().family(Family::Noaa).channel(4).build();
/// let image = decode(Capture::default(), &selection, DecoderOptions::default()).unwrap();
/// assert_eq!(image.height(), 0);
/// assert_eq!(image.width(), 2048);
/// ```
///
/// # Errors
/// [crate::Error::InvalidChannel] for a channel the family does not have, checked before
/// any decoding, or any error from [SatelliteDecoder::process].
pub fn decode(
    capture: Capture,
    selection: &Selection,
    options: DecoderOptions,
) -> Result<ChannelImage> {
    selection.family.validate_channel(selection.channel)?;
    let mut decoder = decoder_for(selection.family, capture, options)?;
    decoder.process()?;
    Ok(decoder
        .decode_channel(selection.channel)?
        .with_direction(selection.direction))
}
