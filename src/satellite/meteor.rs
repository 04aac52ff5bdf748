use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, span, Level};

use super::{channel_image, stack_lines, ChannelImage, DecoderOptions, SatelliteDecoder, Workers};
use crate::{
    bits::BitSequence,
    capture::Capture,
    family::Family,
    framing::{extract_subchannels, SyncMarker, Synchronizer, Tuning, MSU_MR_SPANS},
    manchester,
    unpack::{self, GROUP_LEN},
    Result,
};

/// MSU-MR frame sync.
pub const MSU_MR_SYNC: [u8; 8] = [2, 24, 167, 163, 146, 221, 154, 191];

/// MSU-MR frame length in bytes, sync included.
pub const MSU_MR_FRAME_LEN: usize = 11850;

const FIRST_GROUP: usize = 50;
const GROUP_STRIDE: usize = 30;
const GROUPS: usize = 393;

/// METEOR-M HRPT decoder.
///
/// The capture is Manchester decoded and synchronized on the CADU ASM. MSU-MR data is
/// gathered from 4 fixed spans of each CADU and then searched for MSU-MR frames, each of
/// which holds one scan line of 6 channels.
#[derive(Debug)]
pub struct MeteorDecoder {
    capture: Capture,
    workers: Workers,
    tuning: Tuning,
    lines: Array2<u16>,
    processed: bool,
}

impl MeteorDecoder {
    pub const FAMILY: Family = Family::Meteor;

    /// # Errors
    /// If a dedicated worker pool was requested and could not be built.
    pub fn new(capture: Capture, options: DecoderOptions) -> Result<Self> {
        Ok(MeteorDecoder {
            capture,
            workers: Workers::new(options.num_threads)?,
            tuning: options.tuning,
            lines: Array2::zeros((0, Self::line_len())),
            processed: false,
        })
    }

    fn line_len() -> usize {
        Self::FAMILY.width() * Self::FAMILY.channels()
    }

    /// Unpack the channel-interleaved scan line from one MSU-MR frame.
    fn scan_line(frame: &[u8]) -> Vec<u16> {
        let channels = Self::FAMILY.channels();
        let mut line = vec![0u16; Self::line_len()];
        for group in 0..GROUPS {
            for ch in 0..channels {
                let offset = FIRST_GROUP + group * GROUP_STRIDE + ch * GROUP_LEN;
                let mut packed = [0u8; GROUP_LEN];
                packed.copy_from_slice(&frame[offset..offset + GROUP_LEN]);
                for (k, sample) in unpack::unpack10(&packed).into_iter().enumerate() {
                    line[(group * 4 + k) * channels + ch] = sample;
                }
            }
        }
        line
    }
}

impl SatelliteDecoder for MeteorDecoder {
    fn family(&self) -> Family {
        Self::FAMILY
    }

    fn process(&mut self) -> Result<()> {
        if self.processed {
            return Ok(());
        }
        let span = span!(Level::DEBUG, "meteor");
        let _guard = span.enter();

        let bits = BitSequence::from_bytes(manchester::decode(self.capture.as_bytes()));
        let starts = Synchronizer::new(Self::FAMILY.sync_marker(), Self::FAMILY.thresholds())
            .with_tuning(self.tuning)
            .run(&bits);
        info!(frames = starts.len(), "synchronized transport frames");

        let lines: Vec<Vec<u16>> = self.workers.install(|| {
            let msu = BitSequence::from_bytes(extract_subchannels(&bits, &starts, &MSU_MR_SPANS));
            let msu_starts =
                Synchronizer::search(SyncMarker::new(&MSU_MR_SYNC, MSU_MR_FRAME_LEN), 8).run(&msu);
            info!(frames = msu_starts.len(), "found msu-mr frames");

            let lines: Vec<Option<Vec<u16>>> = msu_starts
                .par_iter()
                .map(|start| {
                    let frame = msu.read_bytes(start.bit, MSU_MR_FRAME_LEN)?;
                    Some(Self::scan_line(&frame))
                })
                .collect();
            let total = lines.len();
            let lines: Vec<Vec<u16>> = lines.into_iter().flatten().collect();
            if lines.len() < total {
                debug!(dropped = total - lines.len(), "msu-mr frames truncated by end of stream");
            }
            lines
        });

        self.lines = stack_lines(lines, Self::line_len())?;
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
