//! CCSDS space packets carried in a demultiplexed M-PDU stream.
//!
//! References:
//! * CCSDS Space Packet Protocol 133.0-B-1
use serde::{Deserialize, Serialize};
use tracing::debug;

pub type Apid = u16;

/// CCSDS Primary Header
///
/// The primary header format is common to all CCSDS space packets.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub version: u8,
    pub type_flag: u8,
    pub has_secondary_header: bool,
    pub apid: Apid,
    pub sequence_flags: u8,
    pub sequence_id: u16,
    pub len_minus1: u16,
}

impl PrimaryHeader {
    /// Size of a ``PrimaryHeader``
    pub const LEN: usize = 6;

    /// Decode from bytes. Returns `None` if there are not enough bytes to construct the
    /// header.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let d1 = u16::from_be_bytes([buf[0], buf[1]]);
        let d2 = u16::from_be_bytes([buf[2], buf[3]]);
        let d3 = u16::from_be_bytes([buf[4], buf[5]]);

        Some(PrimaryHeader {
            version: (d1 >> 13 & 0x7) as u8,
            type_flag: (d1 >> 12 & 0x1) as u8,
            has_secondary_header: (d1 >> 11 & 0x1) == 1,
            apid: (d1 & 0x7ff),
            sequence_flags: (d2 >> 14 & 0x3) as u8,
            sequence_id: (d2 & 0x3fff),
            len_minus1: d3,
        })
    }

    /// Total packet length, header included.
    #[must_use]
    pub fn packet_len(&self) -> usize {
        Self::LEN + usize::from(self.len_minus1) + 1
    }
}

/// A single space packet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PrimaryHeader,
    /// All packet bytes, including header and user data
    pub data: Vec<u8>,
}

impl Packet {
    /// Decode the packet at the start of `dat`. Returns `None` if there are not enough
    /// bytes for the header or for the length the header declares. Bytes past the
    /// declared length are ignored.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Packet> {
        let header = PrimaryHeader::decode(dat)?;
        let len = header.packet_len();
        if dat.len() < len {
            return None;
        }
        Some(Packet {
            header,
            data: dat[..len].to_vec(),
        })
    }

    /// Everything after the primary header, secondary header included.
    #[must_use]
    pub fn user_data(&self) -> &[u8] {
        &self.data[PrimaryHeader::LEN..]
    }
}

/// Decode the packets declared at `offsets` into `stream`.
///
/// Each packet is decoded from the span between its offset and the next one, the last
/// span running to the end of the stream. Spans of zero or negative length, and spans
/// that fail to decode, are skipped.
pub fn packets_at<'a>(stream: &'a [u8], offsets: &'a [usize]) -> impl Iterator<Item = Packet> + 'a {
    offsets.iter().enumerate().filter_map(move |(idx, start)| {
        let end = offsets.get(idx + 1).copied().unwrap_or(stream.len());
        if end <= *start || end > stream.len() {
            debug!(start, end, "skipping empty packet span");
            return None;
        }
        let packet = Packet::decode(&stream[*start..end]);
        if packet.is_none() {
            debug!(start, len = end - start, "failed to decode packet");
        }
        packet
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_bytes(apid: Apid, user_data: &[u8]) -> Vec<u8> {
        let len_minus1 = (user_data.len() - 1) as u16;
        let mut dat = vec![
            (apid >> 8) as u8 & 0x7,
            apid as u8,
            0xc0,
            0x01,
            (len_minus1 >> 8) as u8,
            len_minus1 as u8,
        ];
        dat.extend_from_slice(user_data);
        dat
    }

    #[test]
    fn decode_header() {
        let dat: [u8; 6] = [
            // bytes from a SNPP CrIS packet
            0xd, 0x59, 0xd2, 0xab, 0xa, 0x8f,
        ];
        let ph = PrimaryHeader::decode(&dat).unwrap();

        assert_eq!(ph.version, 0);
        assert_eq!(ph.type_flag, 0);
        assert!(ph.has_secondary_header);
        assert_eq!(ph.apid, 1369);
        assert_eq!(ph.sequence_flags, 3);
        assert_eq!(ph.sequence_id, 4779);
        assert_eq!(ph.len_minus1, 2703);
        assert_eq!(ph.packet_len(), 2710);
    }

    #[test]
    fn decode_packet_respects_declared_length() {
        let mut dat = packet_bytes(103, &[1, 2, 3]);
        dat.extend_from_slice(&[0xff; 4]);
        let packet = Packet::decode(&dat).unwrap();
        assert_eq!(packet.header.apid, 103);
        assert_eq!(packet.user_data(), &[1, 2, 3]);

        assert!(Packet::decode(&dat[..8]).is_none());
        assert!(Packet::decode(&dat[..5]).is_none());
    }

    #[test]
    fn packets_at_skips_bad_spans() {
        let mut stream = packet_bytes(103, &[1; 10]);
        stream.extend(packet_bytes(104, &[2; 10]));
        stream.extend(packet_bytes(200, &[3; 10]));
        // second offset repeats the first, the last one is truncated
        let offsets = vec![0, 0, 16, 32];
        stream.truncate(40);

        let apids: Vec<Apid> = packets_at(&stream, &offsets)
            .map(|p| p.header.apid)
            .collect();
        assert_eq!(apids, vec![103, 104]);
    }

    #[test]
    fn packets_at_empty() {
        assert_eq!(packets_at(&[], &[]).count(), 0);
        assert_eq!(packets_at(&[0u8; 3], &[5]).count(), 0);
    }
}
