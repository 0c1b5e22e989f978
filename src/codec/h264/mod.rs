//! # H.264/AVC Bitstream Handling
//!
//! Splits Annex-B byte streams into NAL units and reads their one-byte
//! headers. Nothing beyond the header is decoded: slices, SPS and PPS are
//! carried through untouched.
//!
//! ## Example: Classifying the NAL units of an access unit
//!
//! ```rust
//! use h264relay::codec::h264::{classify, split_bitstream, NALUnitType};
//!
//! let au = [0, 0, 0, 1, 0x67, 0x42, 0x00, 0, 0, 1, 0x65, 0x88, 0x84, 0x21];
//! for nal in split_bitstream(&au) {
//!     let header = classify(&nal);
//!     match header.unit_type() {
//!         NALUnitType::CodedSliceIDR => println!("Found IDR slice, {} bytes", nal.len()),
//!         NALUnitType::SPS => println!("Found SPS"),
//!         other => println!("Found {:?}", other),
//!     }
//! }
//! ```

/// Annex-B start code scanning
pub mod scanner;
/// NAL unit views and header classification
pub mod types;

#[doc(inline)]
pub use scanner::*;
#[doc(inline)]
pub use types::*;
