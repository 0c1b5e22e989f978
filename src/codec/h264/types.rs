use std::ops::Range;

/// A NAL unit located inside an access-unit buffer.
///
/// The view never owns data; it borrows the buffer the scanner ran over.
/// `range` always covers at least the one-byte NAL header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NALUnit<'a> {
    buf: &'a [u8],
    start: usize,
    end: usize,
}

impl<'a> NALUnit<'a> {
    /// Returns `None` for an empty or out-of-bounds range.
    pub fn new(buf: &'a [u8], range: Range<usize>) -> Option<Self> {
        if range.start < range.end && range.end <= buf.len() {
            Some(Self {
                buf,
                start: range.start,
                end: range.end,
            })
        } else {
            None
        }
    }

    /// Wraps a whole slice that holds exactly one NAL unit (no start code).
    pub fn from_slice(data: &'a [u8]) -> Option<Self> {
        Self::new(data, 0..data.len())
    }

    /// Byte range within the scanned buffer.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Header byte and body.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buf[self.start..self.end]
    }

    /// The one-byte NAL header.
    pub fn header_byte(&self) -> u8 {
        self.buf[self.start]
    }

    /// NAL body without the header byte. Empty for a degenerate unit.
    pub fn payload(&self) -> &'a [u8] {
        &self.buf[self.start + 1..self.end]
    }

    /// Length including the header byte; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when only the header byte is present.
    pub fn is_degenerate(&self) -> bool {
        self.len() == 1
    }
}

/// Fields of the one-byte NAL unit header.
///
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |F|NRI|  Type   |
/// +---------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NALHeader {
    /// F bit, zero in a conforming stream
    pub forbidden_zero_bit: bool,
    /// NRI, reference importance (0-3)
    pub nal_ref_idc: u8,
    /// Unit type (0-31)
    pub nal_type: u8,
}

impl NALHeader {
    /// Splits a header byte into its fields.
    pub fn from_byte(header: u8) -> Self {
        Self {
            forbidden_zero_bit: header & 0x80 != 0,
            nal_ref_idc: (header >> 5) & 0x03,
            nal_type: header & 0x1F,
        }
    }

    /// Packs the fields back into a header byte.
    pub fn to_byte(&self) -> u8 {
        (u8::from(self.forbidden_zero_bit) << 7) | ((self.nal_ref_idc & 0x03) << 5) | (self.nal_type & 0x1F)
    }

    /// True for an IDR slice (type 5).
    pub fn is_idr(&self) -> bool {
        self.nal_type == NALUnitType::CodedSliceIDR as u8
    }

    /// True for coded slices (types 1 and 5), the bulk of the stream.
    pub fn is_slice(&self) -> bool {
        self.nal_type == NALUnitType::CodedSliceNonIDR as u8 || self.is_idr()
    }

    /// The type as an enum.
    pub fn unit_type(&self) -> NALUnitType {
        NALUnitType::from(self.nal_type)
    }
}

/// NAL unit types the relay tells apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    /// Unspecified or not listed here
    Unspecified = 0,
    /// Coded slice of a non-IDR picture
    CodedSliceNonIDR = 1,
    /// Coded slice data partition A
    CodedSliceDataPartitionA = 2,
    /// Coded slice data partition B
    CodedSliceDataPartitionB = 3,
    /// Coded slice data partition C
    CodedSliceDataPartitionC = 4,
    /// Coded slice of an IDR picture
    CodedSliceIDR = 5,
    /// Supplemental enhancement information
    SEI = 6,
    /// Sequence parameter set
    SPS = 7,
    /// Picture parameter set
    PPS = 8,
    /// Access unit delimiter
    AccessUnitDelimiter = 9,
    /// End of sequence
    EndOfSequence = 10,
    /// End of stream
    EndOfStream = 11,
    /// Filler data
    FillerData = 12,
    /// Single-time aggregation packet (RTP payload only)
    StapA = 24,
    /// Fragmentation unit A (RTP payload only)
    FuA = 28,
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            24 => NALUnitType::StapA,
            28 => NALUnitType::FuA,
            _ => NALUnitType::Unspecified,
        }
    }
}

/// Extracts the header fields of a NAL unit.
pub fn classify(nal: &NALUnit<'_>) -> NALHeader {
    NALHeader::from_byte(nal.header_byte())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_classify_common_headers() {
        let idr = [0x65, 0xB8, 0x00];
        let header = classify(&NALUnit::from_slice(&idr).unwrap());
        assert_eq!(
            header,
            NALHeader {
                forbidden_zero_bit: false,
                nal_ref_idc: 3,
                nal_type: 5
            }
        );
        assert!(header.is_idr());
        assert!(header.is_slice());

        let sps = [0x67, 0x42];
        let header = classify(&NALUnit::from_slice(&sps).unwrap());
        assert_eq!(header.unit_type(), NALUnitType::SPS);
        assert!(!header.is_slice());

        let pps = [0x68];
        let header = classify(&NALUnit::from_slice(&pps).unwrap());
        assert_eq!(header.unit_type(), NALUnitType::PPS);

        let non_idr = [0x41, 0x9A];
        let header = classify(&NALUnit::from_slice(&non_idr).unwrap());
        assert_eq!(header.nal_ref_idc, 2);
        assert_eq!(header.unit_type(), NALUnitType::CodedSliceNonIDR);
        assert!(!header.is_idr());
    }

    #[test]
    fn test_forbidden_bit() {
        let header = NALHeader::from_byte(0x81);
        assert!(header.forbidden_zero_bit);
        assert_eq!(header.nal_ref_idc, 0);
        assert_eq!(header.nal_type, 1);
    }

    #[test]
    fn test_view_bounds() {
        let buf = [0, 0, 1, 0x65, 1, 2, 3];
        assert!(NALUnit::new(&buf, 3..3).is_none());
        assert!(NALUnit::new(&buf, 3..8).is_none());
        assert!(NALUnit::from_slice(&[]).is_none());

        let nal = NALUnit::new(&buf, 3..7).unwrap();
        assert_eq!(nal.len(), 4);
        assert_eq!(nal.header_byte(), 0x65);
        assert_eq!(nal.payload(), &[1, 2, 3]);
        assert!(!nal.is_degenerate());

        let degenerate = NALUnit::new(&buf, 3..4).unwrap();
        assert!(degenerate.is_degenerate());
        assert!(degenerate.payload().is_empty());
    }

    #[quickcheck]
    fn prop_header_byte_round_trips(byte: u8) -> bool {
        let header = NALHeader::from_byte(byte);
        header.to_byte() == byte && NALHeader::from_byte(header.to_byte()) == header
    }
}
