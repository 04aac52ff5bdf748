mod common;

use std::fs;

use hrpt::{
    bits::{BitOrder, BitSequence},
    capture::Capture,
    family::{Family, Selection},
    framing::{MpduDemux, Synchronizer},
    offsets::{PixelOffsets, PixelStart},
    satellite::{decode, decoder_for, DecoderOptions},
    spacepacket::packets_at,
};
use test_case::test_case;

use common::{avhrr_packet, metop_capture, prepend_bits, sample};

fn packets() -> Vec<Vec<u8>> {
    vec![
        avhrr_packet(103, 0, 200, 80),
        avhrr_packet(200, 1, 200, 80),
        avhrr_packet(104, 2, 200, 80),
        avhrr_packet(103, 3, 200, 80),
    ]
}

#[test]
fn demux_recovers_packet_boundaries() {
    let family = Family::Metop;
    let bits = BitSequence::new(&metop_capture(9, &packets()), BitOrder::MsbFirst, true);
    let starts = Synchronizer::new(family.sync_marker(), family.thresholds()).run(&bits);

    let stream = MpduDemux::new(9).demux(&bits, &starts);
    // fill cadus are dropped
    assert_eq!(stream.frames, stream.data.len() / 882);
    assert!(starts.len() > stream.frames);
    assert_eq!(stream.packet_offsets, vec![0, 12886, 2 * 12886, 3 * 12886]);

    let apids: Vec<u16> = packets_at(&stream.data, &stream.packet_offsets)
        .map(|p| p.header.apid)
        .collect();
    assert_eq!(apids, vec![103, 200, 104, 103]);
}

#[test]
fn decode_skips_other_apids() {
    let mut decoder = decoder_for(
        Family::Metop,
        Capture::from(metop_capture(9, &packets())),
        DecoderOptions::default(),
    )
    .unwrap();
    decoder.process().unwrap();
    assert_eq!(decoder.frame_count(), 3);

    for channel in [1, 2, 5] {
        let image = decoder.decode_channel(channel).unwrap();
        assert_eq!(image.pixels().dim(), (3, 2048));
        for (row, line) in [0, 2, 3].into_iter().enumerate() {
            for pixel in [0, 1, 1024, 2047] {
                assert_eq!(
                    image.pixels()[[row, pixel]],
                    sample(line, channel, pixel) * 60,
                    "channel {channel} line {line} pixel {pixel}"
                );
            }
        }
    }
}

#[test]
fn other_vcid_yields_nothing() {
    let selection = Selection::builder().family(Family::Metop).channel(1).build();
    let image = decode(
        Capture::from(metop_capture(10, &packets())),
        &selection,
        DecoderOptions::default(),
    )
    .unwrap();
    assert_eq!(image.height(), 0);
    assert_eq!(image.width(), 2048);
}

#[test]
fn unaligned_capture() {
    let dat = prepend_bits(&metop_capture(9, &packets()), 5);
    let selection = Selection::builder().family(Family::Metop).channel(3).build();
    let image = decode(Capture::from(dat), &selection, DecoderOptions::default()).unwrap();
    assert_eq!(image.height(), 3);
    assert_eq!(image.pixels()[[1, 10]], sample(2, 3, 10) * 60);
}

#[test_case(0u8, 58; "low first byte")]
#[test_case(200u8, 80; "high first byte")]
fn content_sensitive_pixel_start(first: u8, start: usize) {
    let packets = vec![avhrr_packet(103, 0, first, start)];
    let selection = Selection::builder().family(Family::Metop).channel(2).build();
    let image = decode(
        Capture::from(metop_capture(9, &packets)),
        &selection,
        DecoderOptions::default(),
    )
    .unwrap();
    assert_eq!(image.height(), 1);
    assert_eq!(image.pixels()[[0, 5]], sample(0, 2, 5) * 60);
}

#[test]
fn fixed_pixel_start_from_table() {
    // data at 58 but the first byte would select 80
    let packets = vec![avhrr_packet(104, 4, 200, 58)];
    let pixel_start = PixelOffsets::default().lookup("metop-58").unwrap();
    assert_eq!(pixel_start, PixelStart::Fixed(58));

    let options = DecoderOptions::builder()
        .pixel_start(pixel_start)
        .vcid(9)
        .build();
    let selection = Selection::builder().family(Family::Metop).channel(4).build();
    let image = decode(Capture::from(metop_capture(9, &packets)), &selection, options).unwrap();
    assert_eq!(image.height(), 1);
    assert_eq!(image.pixels()[[0, 2047]], sample(4, 4, 2047) * 60);
}

#[test]
fn file_backed_capture() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("metop.raw");
    fs::write(&path, metop_capture(9, &packets())).unwrap();

    let selection = Selection::builder().family(Family::Metop).channel(5).build();
    let image = decode(Capture::open(&path).unwrap(), &selection, DecoderOptions::default()).unwrap();
    assert_eq!(image.height(), 3);
}
