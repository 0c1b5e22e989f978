#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

//! # h264relay - H.264 over UDP to RTP
//!
//! `h264relay` takes the raw H.264 Annex-B stream a camera such as the Tello
//! EDU pushes over UDP and re-sends it as RTP/H.264 (RFC 6184), so any
//! standard RTP player can show it.
//!
//! ## Features
//!
//! - Access-unit reassembly from fixed-size datagrams
//! - Annex-B start code scanning and NAL header classification
//! - Single NAL unit and FU-A packetization with bit-exact RTP headers
//! - Strict FIFO hand-off between packetization and transmission
//! - Start-up handshake with the video source
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use h264relay::{config::Config, logging, relay::Relay};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     logging::init();
//!     let relay = Relay::bind(Config::load()?).await?;
//!     relay.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! Play the result with an SDP file describing `RTP/AVP 96` / `H264/90000`
//! on the configured destination port, e.g. `ffplay -protocol_whitelist
//! file,udp,rtp -i stream.sdp`.
//!
//! ## Packetizing without sockets
//!
//! ```rust
//! use h264relay::codec::h264::{classify, split_bitstream};
//! use h264relay::format::rtp::{H264Packetizer, SequenceState};
//!
//! let au = [0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1E, 0, 0, 1, 0x65, 0x88, 0x84, 0x21];
//! let packetizer = H264Packetizer::new(1440, 96);
//! let mut state = SequenceState::new();
//!
//! let mut packets = Vec::new();
//! for nal in split_bitstream(&au) {
//!     packets.extend(packetizer.packetize(&mut state, &nal, &classify(&nal)));
//! }
//! assert_eq!(packets.len(), 2);
//! ```
//!
//! ## Module Overview
//!
//! - `codec`: H.264 Annex-B scanning and NAL header classification
//! - `format`: RTP header building and RTP/H.264 packetization
//! - `relay`: reassembly, dispatch queue, stream session and UDP transport
//! - `config`: settings from defaults, `h264relay.toml` and environment
//! - `logging`: `env_logger` set-up for the binary
//! - `error`: error type and `Result` alias
//! - `utils`: bit-level reader and writer

/// H.264 bitstream handling
pub mod codec;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// RTP packet formats
pub mod format;

/// Logger initialisation
pub mod logging;

/// Stream relay: reassembly, queueing and transport
pub mod relay;

/// Common utilities and helper functions
pub mod utils;

pub use error::{RelayError, Result};
