//! Per-stream state driving the receive side of the relay.

use log::{debug, warn};

use super::queue::DispatchSender;
use super::reassembler::FrameReassembler;
use crate::codec::h264::{classify, split_bitstream};
use crate::config::Config;
use crate::format::rtp::{packet_sequence_number, H264Packetizer, SequenceState};

/// Counters kept for the lifetime of a stream session
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Datagrams fed to the session
    pub datagrams: u64,
    /// Complete access units handed to the scanner
    pub access_units: u64,
    /// NAL units found in those access units
    pub nal_units: u64,
    /// NAL units carrying only their header byte
    pub degenerate_nal_units: u64,
    /// RTP packets placed on the dispatch queue
    pub packets: u64,
    /// Packets lost because the queue was closed
    pub dropped_packets: u64,
}

/// All mutable state of one relayed stream.
///
/// Datagrams go in through [`StreamSession::on_datagram`]; every RTP packet
/// produced for them is on the dispatch queue before the call returns.
#[derive(Debug)]
pub struct StreamSession {
    reassembler: FrameReassembler,
    packetizer: H264Packetizer,
    state: SequenceState,
    sender: DispatchSender,
    stats: SessionStats,
}

impl StreamSession {
    /// Starts a session with a fresh random SSRC, sized from `config`.
    pub fn new(config: &Config, sender: DispatchSender) -> Self {
        Self::with_parts(
            FrameReassembler::new(config.in_packet_size),
            H264Packetizer::new(config.max_payload_size, config.payload_type),
            SequenceState::new(),
            sender,
        )
    }

    /// Assembles a session from explicit parts, e.g. a fixed SSRC.
    pub fn with_parts(
        reassembler: FrameReassembler,
        packetizer: H264Packetizer,
        state: SequenceState,
        sender: DispatchSender,
    ) -> Self {
        Self {
            reassembler,
            packetizer,
            state,
            sender,
            stats: SessionStats::default(),
        }
    }

    /// Feeds one received datagram through the pipeline.
    pub fn on_datagram(&mut self, payload: &[u8]) {
        self.stats.datagrams += 1;

        if let Some(access_unit) = self.reassembler.on_datagram(payload) {
            self.stats.access_units += 1;
            self.process_access_unit(&access_unit);
        }
    }

    fn process_access_unit(&mut self, access_unit: &[u8]) {
        let mut nal_count = 0;

        for nal in split_bitstream(access_unit) {
            nal_count += 1;
            let header = classify(&nal);

            if !header.is_slice() {
                debug!(
                    "Maybe SPS or PPS NALU type {} ({:?}), {} bytes",
                    header.nal_type,
                    header.unit_type(),
                    nal.len()
                );
            }
            if nal.is_degenerate() {
                self.stats.degenerate_nal_units += 1;
            }

            for packet in self.packetizer.packetize(&mut self.state, &nal, &header) {
                let sequence_number = packet_sequence_number(&packet).unwrap_or_default();
                match self.sender.send(packet) {
                    Ok(()) => self.stats.packets += 1,
                    Err(e) => {
                        self.stats.dropped_packets += 1;
                        warn!("dropping packet seq={}: {}", sequence_number, e);
                    }
                }
            }
        }

        self.stats.nal_units += nal_count;
        debug!("NALU count {}", nal_count);
    }

    /// Counters so far.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Ends the session. Dropping the queue sender lets the transmitter
    /// drain and stop.
    pub fn finish(self) -> SessionStats {
        self.stats
    }
}
