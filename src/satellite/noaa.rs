use ndarray::Array2;
use rayon::prelude::*;
use tracing::{info, span, Level};

use super::{channel_image, stack_lines, ChannelImage, DecoderOptions, SatelliteDecoder, Workers};
use crate::{
    bits::{BitOrder, BitSequence},
    capture::Capture,
    family::Family,
    framing::Synchronizer,
    unpack, Result,
};

/// Words from the start of the frame sync to the first image word.
const IMAGE_OFFSET_WORDS: usize = 750;
const WORD_BITS: usize = 16;

/// NOAA HRPT decoder.
///
/// Minor frames are found by an exact search for the 6-word frame sync on 16-bit word
/// boundaries. Each frame contributes one line of 10-bit samples read as little-endian
/// words, all channels interleaved.
#[derive(Debug)]
pub struct NoaaDecoder {
    capture: Capture,
    workers: Workers,
    lines: Array2<u16>,
    processed: bool,
}

impl NoaaDecoder {
    pub const FAMILY: Family = Family::Noaa;

    /// # Errors
    /// If a dedicated worker pool was requested and could not be built.
    pub fn new(capture: Capture, options: DecoderOptions) -> Result<Self> {
        Ok(NoaaDecoder {
            capture,
            workers: Workers::new(options.num_threads)?,
            lines: Array2::zeros((0, Self::line_len())),
            processed: false,
        })
    }

    fn line_len() -> usize {
        Self::FAMILY.width() * Self::FAMILY.channels()
    }
}

impl SatelliteDecoder for NoaaDecoder {
    fn family(&self) -> Family {
        Self::FAMILY
    }

    fn process(&mut self) -> Result<()> {
        if self.processed {
            return Ok(());
        }
        let span = span!(Level::DEBUG, "noaa");
        let _guard = span.enter();

        let bits = BitSequence::new(self.capture.as_bytes(), BitOrder::MsbFirst, false);
        let starts = Synchronizer::search(Self::FAMILY.sync_marker(), WORD_BITS).run(&bits);
        info!(frames = starts.len(), "found minor frames");

        let line_len = Self::line_len();
        let lines: Vec<Vec<u16>> = self.workers.install(|| {
            starts
                .par_iter()
                .map(|start| {
                    let pos = start.bit + IMAGE_OFFSET_WORDS * WORD_BITS;
                    // lines cut short by the end of the capture keep what is there
                    let avail = bits.len().saturating_sub(pos) / WORD_BITS;
                    let words = avail.min(line_len);
                    bits.read_bytes(pos, words * 2)
                        .map(|dat| unpack::words_le(&dat))
                        .unwrap_or_default()
                })
                .collect()
        });

        self.lines = stack_lines(lines, line_len)?;
        self.processed = true;
        info!(lines = self.lines.nrows(), "decoded scan lines");
        Ok(())
    }

    fn decode_channel(&self, channel: usize) -> Result<ChannelImage> {
        channel_image(Self::FAMILY, &self.lines, channel)
    }

    fn frame_count(&self) -> usize {
        self.lines.nrows()
    }
}
