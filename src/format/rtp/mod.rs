//! # Real-time Transport Protocol (RTP) Packet Building
//!
//! This module builds the fixed 12-byte RTP header used for every packet the
//! relay emits and keeps the per-stream counters that feed it:
//!
//! - RTP header serialization (V=2, no padding, no extension, no CSRC)
//! - Sequence number allocation with 16-bit wrap-around
//! - Millisecond timestamps relative to the start of the stream
//! - RTP header parsing, for checking what was put on the wire
//!
//! ## Example: Building a header
//!
//! ```rust
//! use h264relay::format::rtp::{build_header, RTPPacket};
//!
//! let header = build_header(1000, 90000, 0x12345678, true, 96);
//! assert_eq!(&header[..2], &[0x80, 0xE0]);
//!
//! let parsed = RTPPacket::parse(&header).unwrap();
//! assert_eq!(parsed.sequence_number, 1000);
//! assert!(parsed.marker);
//! ```

use bytes::Bytes;
use chrono::Utc;
use log::debug;
use rand::Rng;
use thiserror::Error;

use crate::error::RelayError;
use crate::utils::{BitReader, BitWriter};

/// H.264 payload format (single NAL unit and FU-A packets)
pub mod h264;

pub use h264::*;

/// Size of the fixed RTP header without CSRC entries
pub const RTP_HEADER_SIZE: usize = 12;

/// RTP protocol version carried in every header
pub const RTP_VERSION: u8 = 2;

/// Upper bound (inclusive) of the randomly chosen SSRC
pub const SSRC_MAX: u32 = 0x00FF_FFFF;

/// Errors that can occur while reading RTP packets
#[derive(Debug, Error)]
pub enum RTPError {
    /// The packet data is malformed or incomplete
    #[error("Invalid RTP packet")]
    InvalidPacket,

    /// The version field is not 2
    #[error("Unsupported RTP version {0}")]
    UnsupportedVersion(u8),
}

impl From<RelayError> for RTPError {
    fn from(_: RelayError) -> Self {
        RTPError::InvalidPacket
    }
}

/// Specialized Result type for RTP operations
pub type Result<T> = std::result::Result<T, RTPError>;

/// Serializes a fixed RTP header.
///
/// Byte layout, network order:
///
/// ```text
/// byte0: V(2)|P(1)|X(1)|CC(4)
/// byte1: M(1)|PT(7)
/// bytes2-3: sequence number
/// bytes4-7: timestamp
/// bytes8-11: SSRC
/// ```
pub fn build_header(
    sequence_number: u16,
    timestamp: u32,
    ssrc: u32,
    marker: bool,
    payload_type: u8,
) -> [u8; RTP_HEADER_SIZE] {
    let mut writer = BitWriter::with_capacity(RTP_HEADER_SIZE);
    writer.write_bits(RTP_VERSION as u32, 2);
    writer.write_bit(false); // padding
    writer.write_bit(false); // extension
    writer.write_bits(0, 4); // CSRC count
    writer.write_bit(marker);
    writer.write_bits(payload_type as u32, 7);
    writer.write_bits(sequence_number as u32, 16);
    writer.write_bits(timestamp, 32);
    writer.write_bits(ssrc, 32);

    let bytes = writer.into_bytes();
    debug!(
        "V|P|X|CC: {:#04x}, M|PT: {:#04x}, seq: {}, timestamp: {}, ssrc: {:#08x}",
        bytes[0], bytes[1], sequence_number, timestamp, ssrc
    );

    let mut header = [0u8; RTP_HEADER_SIZE];
    header.copy_from_slice(&bytes);
    header
}

/// Reads the sequence number of a serialized RTP packet.
pub fn packet_sequence_number(packet: &[u8]) -> Option<u16> {
    match packet.get(2..4)? {
        &[hi, lo] => Some(u16::from_be_bytes([hi, lo])),
        _ => None,
    }
}

/// An RTP packet as read back from the wire
#[derive(Debug, Clone)]
pub struct RTPPacket {
    /// RTP version (should be 2)
    pub version: u8,
    /// Padding flag
    pub padding: bool,
    /// Header extension flag
    pub extension: bool,
    /// CSRC count
    pub csrc_count: u8,
    /// Marker bit
    pub marker: bool,
    /// Payload type identifier
    pub payload_type: u8,
    /// Packet sequence number
    pub sequence_number: u16,
    /// Media timestamp
    pub timestamp: u32,
    /// Synchronization source identifier
    pub ssrc: u32,
    /// Packet payload data
    pub payload: Bytes,
}

impl RTPPacket {
    /// Parses an RTP packet from raw bytes
    ///
    /// # Errors
    ///
    /// Returns `RTPError` if:
    /// - The packet is shorter than its header
    /// - The version is not 2
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < RTP_HEADER_SIZE {
            return Err(RTPError::InvalidPacket);
        }

        let mut reader = BitReader::new(data);
        let version = reader.read_bits(2)? as u8;
        if version != RTP_VERSION {
            return Err(RTPError::UnsupportedVersion(version));
        }
        let padding = reader.read_bit()?;
        let extension = reader.read_bit()?;
        let csrc_count = reader.read_bits(4)? as u8;
        let marker = reader.read_bit()?;
        let payload_type = reader.read_bits(7)? as u8;
        let sequence_number = reader.read_bits(16)? as u16;
        let timestamp = reader.read_bits(32)?;
        let ssrc = reader.read_bits(32)?;
        reader.skip_bits(csrc_count as usize * 32)?;
        let payload = reader.remaining_bytes()?;

        Ok(Self {
            version,
            padding,
            extension,
            csrc_count,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// Per-stream RTP counters.
///
/// The sequence number is advanced before use, so a fresh stream starts at 1.
/// Timestamps are wall-clock milliseconds since the stream started rather
/// than a 90 kHz media clock.
#[derive(Debug, Clone)]
pub struct SequenceState {
    sequence_number: u16,
    ssrc: u32,
    start_ms: i64,
}

impl SequenceState {
    /// Starts a stream now with a random SSRC in `0..=SSRC_MAX`.
    pub fn new() -> Self {
        let ssrc = rand::thread_rng().gen_range(0..=SSRC_MAX);
        Self::with_values(0, ssrc, Utc::now().timestamp_millis())
    }

    /// Resumes a stream from known counters.
    pub fn with_values(sequence_number: u16, ssrc: u32, start_ms: i64) -> Self {
        Self {
            sequence_number,
            ssrc,
            start_ms,
        }
    }

    /// Allocates the sequence number for the next packet.
    pub fn next_sequence_number(&mut self) -> u16 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sequence_number
    }

    /// Last allocated sequence number.
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Synchronization source of the stream.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Milliseconds elapsed since the stream started.
    pub fn timestamp(&self) -> u32 {
        self.timestamp_at(Utc::now().timestamp_millis())
    }

    /// Relative timestamp for a given wall-clock instant, truncated to 32 bits.
    pub fn timestamp_at(&self, now_ms: i64) -> u32 {
        now_ms.wrapping_sub(self.start_ms) as u32
    }
}

impl Default for SequenceState {
    fn default() -> Self {
        Self::new()
    }
}
