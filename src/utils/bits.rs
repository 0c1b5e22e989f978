use crate::error::{RelayError, Result};

/// Reads MSB-first fields from a byte slice, the inverse of [`BitWriter`].
///
/// ```
/// use h264relay::utils::BitReader;
///
/// let data = [0b0110_0101];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), false);   // forbidden_zero_bit
/// assert_eq!(reader.read_bits(2).unwrap(), 0b11);  // nal_ref_idc
/// assert_eq!(reader.read_bits(5).unwrap(), 5);     // nal_unit_type
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    /// Starts reading at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bits left to read.
    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.position
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining_bits() {
            return Err(RelayError::InvalidData(format!(
                "need {} bits, {} left",
                n,
                self.remaining_bits()
            )));
        }
        Ok(())
    }

    /// Reads one bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads up to 32 bits as an unsigned big-endian value.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(RelayError::InvalidData(format!("cannot read {} bits at once", n)));
        }
        self.ensure(n as usize)?;

        let mut value = 0u32;
        for _ in 0..n {
            let byte = self.data[self.position / 8];
            let bit = (byte >> (7 - self.position % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.position += 1;
        }
        Ok(value)
    }

    /// Moves past `n` bits without decoding them.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.position += n;
        Ok(())
    }

    /// The remaining whole bytes. Fails unless the reader is byte aligned.
    pub fn remaining_bytes(&self) -> Result<&'a [u8]> {
        if self.position % 8 != 0 {
            return Err(RelayError::InvalidData("reader is not byte aligned".into()));
        }
        Ok(&self.data[self.position / 8..])
    }
}

/// Packs fields MSB first into a growing byte buffer.
///
/// ```
/// use h264relay::utils::BitWriter;
///
/// let mut writer = BitWriter::with_capacity(1);
/// writer.write_bits(2, 2);    // version
/// writer.write_bit(false);    // padding
/// writer.write_bit(false);    // extension
/// writer.write_bits(0, 4);    // csrc count
/// assert_eq!(writer.into_bytes(), vec![0x80]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_offset: u8,
}

impl BitWriter {
    /// Empty writer with room for `bytes` bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            bit_offset: 0,
        }
    }

    /// Appends one bit.
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_offset == 0 {
            self.data.push(0);
        }
        if bit {
            if let Some(last) = self.data.last_mut() {
                *last |= 1 << (7 - self.bit_offset);
            }
        }
        self.bit_offset = (self.bit_offset + 1) % 8;
    }

    /// Writes the low `n` bits of `value`, most significant first.
    /// `n` is clamped to 32.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        let n = n.min(32);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// True when no partial byte is pending.
    pub fn is_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    /// Bits written so far.
    pub fn len_bits(&self) -> usize {
        if self.bit_offset == 0 {
            self.data.len() * 8
        } else {
            (self.data.len() - 1) * 8 + self.bit_offset as usize
        }
    }

    /// Returns the written bytes; a partial trailing byte is zero padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
