//! Access-unit framing over fixed-size datagrams.

use bytes::{Bytes, BytesMut};

/// Rebuilds access units from the datagrams of a fixed-size video source.
///
/// The source sends every access unit as a run of `in_packet_size` datagrams
/// followed by one shorter datagram. A full-size datagram is therefore
/// buffered and anything else completes the access unit. A source that pads
/// its final datagram to the full size will not be framed correctly.
#[derive(Debug)]
pub struct FrameReassembler {
    in_packet_size: usize,
    carry: BytesMut,
}

impl FrameReassembler {
    /// `in_packet_size` is the length of every non-final datagram.
    pub fn new(in_packet_size: usize) -> Self {
        Self {
            in_packet_size,
            carry: BytesMut::with_capacity(in_packet_size * 4),
        }
    }

    /// Feeds one datagram. Returns the complete access unit once the final
    /// (short) datagram has arrived, and leaves the carry-over empty.
    pub fn on_datagram(&mut self, payload: &[u8]) -> Option<Bytes> {
        self.carry.extend_from_slice(payload);

        if payload.len() == self.in_packet_size {
            return None;
        }

        Some(self.carry.split().freeze())
    }

    /// Bytes buffered for the access unit in progress.
    pub fn pending_len(&self) -> usize {
        self.carry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_size_datagrams_are_held() {
        let mut reassembler = FrameReassembler::new(1460);
        let first: Vec<u8> = (0..1460).map(|i| i as u8).collect();
        let last: Vec<u8> = (0..540).map(|i| (i * 7) as u8).collect();

        assert!(reassembler.on_datagram(&first).is_none());
        assert_eq!(reassembler.pending_len(), 1460);

        let frame = reassembler.on_datagram(&last).unwrap();
        assert_eq!(frame.len(), 2000);
        assert_eq!(&frame[..1460], &first[..]);
        assert_eq!(&frame[1460..], &last[..]);
        assert_eq!(reassembler.pending_len(), 0);
    }

    #[test]
    fn test_short_datagram_alone_is_a_frame() {
        let mut reassembler = FrameReassembler::new(1460);
        let frame = reassembler.on_datagram(&[0, 0, 1, 0x68, 0xCE]).unwrap();
        assert_eq!(&frame[..], &[0, 0, 1, 0x68, 0xCE]);
    }

    #[test]
    fn test_consecutive_frames_do_not_mix() {
        let mut reassembler = FrameReassembler::new(4);

        assert!(reassembler.on_datagram(&[1, 1, 1, 1]).is_none());
        assert!(reassembler.on_datagram(&[2, 2, 2, 2]).is_none());
        let first = reassembler.on_datagram(&[3]).unwrap();
        assert_eq!(&first[..], &[1, 1, 1, 1, 2, 2, 2, 2, 3]);

        let second = reassembler.on_datagram(&[4, 4]).unwrap();
        assert_eq!(&second[..], &[4, 4]);

        // Longer than full size also terminates the frame
        let third = reassembler.on_datagram(&[5, 5, 5, 5, 5]).unwrap();
        assert_eq!(third.len(), 5);
    }

    #[test]
    fn test_empty_datagram_flushes_carry() {
        let mut reassembler = FrameReassembler::new(2);
        assert!(reassembler.on_datagram(&[9, 9]).is_none());
        let frame = reassembler.on_datagram(&[]).unwrap();
        assert_eq!(&frame[..], &[9, 9]);
    }
}
