pub mod h264;

pub use h264::{classify, split_bitstream, NALHeader, NALUnit, NALUnitType};
