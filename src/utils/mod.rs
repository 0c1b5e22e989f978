//! # Utility Functions and Types
//!
//! Bit-level helpers shared by the H.264 classifier and the RTP header
//! builder. Both read and write fields most significant bit first, which is
//! how NAL unit headers and RTP headers are laid out on the wire.
//!
//! ```rust
//! use h264relay::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![0b10110011u8];
//! let mut reader = BitReader::new(&data);
//!
//! let value = reader.read_bits(3)?; // Reads first 3 bits (101)
//! assert_eq!(value, 0b101);
//! # Ok(())
//! # }
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

pub use bits::*;
