use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, span, Level};

use super::{channel_image, stack_lines, ChannelImage, DecoderOptions, SatelliteDecoder, Workers};
use crate::{
    bits::{BitOrder, BitSequence},
    capture::Capture,
    family::Family,
    framing::{MpduDemux, Synchronizer},
    spacepacket::{packets_at, Packet},
    unpack, Result,
};

/// MetOp AHRPT decoder.
///
/// The inverted capture is synchronized on the CADU ASM, derandomized and demultiplexed
/// into a single virtual channel's M-PDU stream. Each AVHRR packet in that stream holds
/// one scan line of 10-bit samples, all channels interleaved.
#[derive(Debug)]
pub struct MetopDecoder {
    capture: Capture,
    workers: Workers,
    options: DecoderOptions,
    lines: Array2<u16>,
    processed: bool,
}

impl MetopDecoder {
    pub const FAMILY: Family = Family::Metop;

    /// # Errors
    /// If a dedicated worker pool was requested and could not be built.
    pub fn new(capture: Capture, options: DecoderOptions) -> Result<Self> {
        Ok(MetopDecoder {
            capture,
            workers: Workers::new(options.num_threads)?,
            options,
            lines: Array2::zeros((0, Self::line_len())),
            processed: false,
        })
    }

    fn line_len() -> usize {
        Self::FAMILY.width() * Self::FAMILY.channels()
    }

    fn scan_line(&self, packet: &Packet) -> Option<Vec<u16>> {
        let user_data = packet.user_data();
        let start = self.options.pixel_start.resolve(user_data)?;
        unpack::unpack_samples(user_data.get(start..)?, Self::line_len())
    }
}

impl SatelliteDecoder for MetopDecoder {
    fn family(&self) -> Family {
        Self::FAMILY
    }

    fn process(&mut self) -> Result<()> {
        if self.processed {
            return Ok(());
        }
        let span = span!(Level::DEBUG, "metop", vcid = self.options.vcid);
        let _guard = span.enter();

        let bits = BitSequence::new(self.capture.as_bytes(), BitOrder::MsbFirst, true);
        let starts = Synchronizer::new(Self::FAMILY.sync_marker(), Self::FAMILY.thresholds())
            .with_tuning(self.options.tuning)
            .run(&bits);
        info!(frames = starts.len(), "synchronized cadus");

        let this = &*self;
        let lines: Vec<Vec<u16>> = this.workers.install(|| {
            let stream = MpduDemux::new(this.options.vcid).demux(&bits, &starts);
            let packets: Vec<Packet> = packets_at(&stream.data, &stream.packet_offsets)
                .filter(|p| this.options.apids.contains(&p.header.apid))
                .collect();
            info!(packets = packets.len(), "decoded avhrr packets");

            let lines: Vec<Option<Vec<u16>>> =
                packets.par_iter().map(|p| this.scan_line(p)).collect();
            let total = lines.len();
            let lines: Vec<Vec<u16>> = lines.into_iter().flatten().collect();
            if lines.len() < total {
                debug!(dropped = total - lines.len(), "packets too short for a scan line");
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
