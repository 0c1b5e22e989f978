//! RFC 6184 packetization of H.264 NAL units.
//!
//! A NAL unit whose body fits into `max_payload_size` bytes goes out as a
//! single NAL unit packet. Larger units are split into FU-A fragments:
//!
//! ```text
//! FU indicator        FU header
//! +---------------+   +---------------+
//! |F|NRI|  Type=28|   |S|E|R|  Type   |
//! +---------------+   +---------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, info};

use super::{build_header, SequenceState, RTP_HEADER_SIZE};
use crate::codec::h264::{NALHeader, NALUnit, NALUnitType};
use crate::config::{DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_PAYLOAD_TYPE};

/// NAL type carried in the FU indicator of every fragment
pub const FU_A_TYPE: u8 = NALUnitType::FuA as u8;

/// FU indicator + FU header
pub const FU_A_OVERHEAD: usize = 2;

/// Start bit of the FU header
pub const FU_START_BIT: u8 = 0x80;
/// End bit of the FU header
pub const FU_END_BIT: u8 = 0x40;

/// S | E | R | TYPE = 1 | 0 | 0 | 0 0001
pub const FU_HEADER_START: u8 = 0x81;
/// S | E | R | TYPE = 1 | 0 | 0 | 0 0101
pub const FU_HEADER_START_IDR: u8 = 0x85;
/// S | E | R | TYPE = 0 | 0 | 0 | 0 0001
pub const FU_HEADER_MIDDLE: u8 = 0x01;
/// S | E | R | TYPE = 0 | 0 | 0 | 0 0101
pub const FU_HEADER_MIDDLE_IDR: u8 = 0x05;
/// S | E | R | TYPE = 0 | 1 | 0 | 0 0001
pub const FU_HEADER_END: u8 = 0x41;
/// S | E | R | TYPE = 0 | 1 | 0 | 0 0101
pub const FU_HEADER_END_IDR: u8 = 0x45;

/// Position of a fragment within its NAL unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    /// First fragment, S bit set
    Start,
    /// Neither first nor last
    Middle,
    /// Last fragment, E bit set
    End,
}

impl Fragment {
    fn of(index: usize, count: usize) -> Self {
        if index == 0 {
            Fragment::Start
        } else if index + 1 == count {
            Fragment::End
        } else {
            Fragment::Middle
        }
    }

    fn flag_bits(self) -> u8 {
        match self {
            Fragment::Start => FU_START_BIT,
            Fragment::Middle => 0,
            Fragment::End => FU_END_BIT,
        }
    }
}

/// FU indicator byte: the NAL unit's F and NRI bits with type 28.
pub fn fu_indicator(header: &NALHeader) -> u8 {
    (u8::from(header.forbidden_zero_bit) << 7) | ((header.nal_ref_idc & 0x03) << 5) | FU_A_TYPE
}

/// FU header byte for one fragment of a NAL unit.
pub fn fu_header(fragment: Fragment, header: &NALHeader) -> u8 {
    match (fragment, header.is_idr()) {
        (Fragment::Start, true) => FU_HEADER_START_IDR,
        (Fragment::Middle, true) => FU_HEADER_MIDDLE_IDR,
        (Fragment::End, true) => FU_HEADER_END_IDR,
        (fragment, false) => fragment.flag_bits() | (header.nal_type & 0x1F),
    }
}

/// Turns NAL units into complete RTP packets.
#[derive(Debug, Clone)]
pub struct H264Packetizer {
    max_payload_size: usize,
    payload_type: u8,
}

impl H264Packetizer {
    /// `max_payload_size` bounds the NAL body bytes per packet; zero is
    /// treated as one so fragmentation always makes progress.
    pub fn new(max_payload_size: usize, payload_type: u8) -> Self {
        Self {
            max_payload_size: max_payload_size.max(1),
            payload_type: payload_type & 0x7F,
        }
    }

    /// NAL body bytes per packet.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// RTP payload type stamped on every packet.
    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// Packetizes one NAL unit, stamping it with the stream's current time.
    pub fn packetize(
        &self,
        state: &mut SequenceState,
        nal: &NALUnit<'_>,
        header: &NALHeader,
    ) -> Vec<Bytes> {
        let timestamp = state.timestamp();
        self.packetize_at(state, nal, header, timestamp)
    }

    /// Packetizes one NAL unit with an explicit RTP timestamp.
    ///
    /// Every packet consumes one sequence number. Packets are returned in
    /// the order they must be sent.
    pub fn packetize_at(
        &self,
        state: &mut SequenceState,
        nal: &NALUnit<'_>,
        header: &NALHeader,
        timestamp: u32,
    ) -> Vec<Bytes> {
        let payload = nal.payload();

        if payload.is_empty() {
            info!("Payload does not exist, NAL header {:#04x}", nal.header_byte());
        }
        if header.is_idr() {
            debug!("IDR NAL unit, {} bytes", nal.len());
        }

        if payload.len() <= self.max_payload_size {
            let mut packet = BytesMut::with_capacity(RTP_HEADER_SIZE + 1 + payload.len());
            packet.put_slice(&self.header(state, timestamp, true));
            packet.put_u8(header.to_byte());
            packet.put_slice(payload);
            return vec![packet.freeze()];
        }

        let indicator = fu_indicator(header);
        let count = payload.len().div_ceil(self.max_payload_size);
        let mut packets = Vec::with_capacity(count);

        for (i, chunk) in payload.chunks(self.max_payload_size).enumerate() {
            let fragment = Fragment::of(i, count);
            let mut packet =
                BytesMut::with_capacity(RTP_HEADER_SIZE + FU_A_OVERHEAD + chunk.len());
            packet.put_slice(&self.header(state, timestamp, fragment == Fragment::End));
            packet.put_u8(indicator);
            packet.put_u8(fu_header(fragment, header));
            packet.put_slice(chunk);
            packets.push(packet.freeze());
        }

        packets
    }

    fn header(&self, state: &mut SequenceState, timestamp: u32, marker: bool) -> [u8; RTP_HEADER_SIZE] {
        let sequence_number = state.next_sequence_number();
        build_header(sequence_number, timestamp, state.ssrc(), marker, self.payload_type)
    }
}

impl Default for H264Packetizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_PAYLOAD_TYPE)
    }
}
