pub mod rtp;

pub use self::rtp::{build_header, H264Packetizer, RTPPacket, SequenceState};
