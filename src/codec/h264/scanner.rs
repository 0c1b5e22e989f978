//! Annex-B start code scanning.
//!
//! NAL units begin after a `00 00 01` or `00 00 00 01` start code and end
//! right before the next `00 00 00` / `00 00 01` pattern, or at the end of
//! the buffer.

use super::types::NALUnit;

#[inline]
fn is_start_code3(buf: &[u8], i: usize) -> bool {
    matches!(buf.get(i..i + 3), Some([0x00, 0x00, 0x01]))
}

#[inline]
fn is_start_code4(buf: &[u8], i: usize) -> bool {
    matches!(buf.get(i..i + 4), Some([0x00, 0x00, 0x00, 0x01]))
}

#[inline]
fn is_three_zeros(buf: &[u8], i: usize) -> bool {
    matches!(buf.get(i..i + 3), Some([0x00, 0x00, 0x00]))
}

/// Lazily yields the NAL units of an Annex-B buffer in byte order.
///
/// Created by [`split_bitstream`]. Once no start code can be found the
/// iterator is exhausted; to scan again, call [`split_bitstream`] again.
#[derive(Debug, Clone)]
pub struct NALUnits<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

/// Splits an Annex-B access unit into NAL unit views.
///
/// ```rust
/// use h264relay::codec::h264::split_bitstream;
///
/// let au = [0, 0, 0, 1, 0x67, 0x42, 0, 0, 1, 0x68, 0xCE, 0, 0, 1, 0x65, 0x88, 0x84];
/// let types: Vec<u8> = split_bitstream(&au).map(|nal| nal.header_byte() & 0x1F).collect();
/// assert_eq!(types, vec![7, 8, 5]);
/// ```
pub fn split_bitstream(buf: &[u8]) -> NALUnits<'_> {
    NALUnits {
        buf,
        pos: 0,
        done: false,
    }
}

impl<'a> NALUnits<'a> {
    /// Advances past the next start code and returns the first byte after it.
    fn find_start(&mut self) -> Option<usize> {
        let buf = self.buf;
        let mut i = self.pos;

        while !is_start_code3(buf, i) && !is_start_code4(buf, i) {
            i += 1;
            // No room left for a start code plus a header byte.
            if i + 4 >= buf.len() {
                self.done = true;
                return None;
            }
        }

        if !is_start_code3(buf, i) {
            i += 1;
        }
        Some(i + 3)
    }

    /// Scans for the end of the unit that begins at `start`.
    fn find_end(&mut self, start: usize) -> usize {
        let buf = self.buf;
        let mut i = start;

        while !is_three_zeros(buf, i) && !is_start_code3(buf, i) {
            i += 1;
            if i + 3 >= buf.len() {
                self.done = true;
                self.pos = buf.len();
                return buf.len();
            }
        }

        self.pos = i;
        i
    }
}

impl<'a> Iterator for NALUnits<'a> {
    type Item = NALUnit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let start = self.find_start()?;
            let end = self.find_end(start);
            // Back-to-back start codes delimit nothing.
            if let Some(nal) = NALUnit::new(self.buf, start..end) {
                return Some(nal);
            }
        }
        None
    }
}

impl std::iter::FusedIterator for NALUnits<'_> {}
