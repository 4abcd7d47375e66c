use byteorder::{BigEndian, ByteOrder};

use super::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitReaderError {
    Exhausted { requested: usize, remaining: usize },
    TooManyBits(usize),
}

impl BitReaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Exhausted { .. } => ErrorKind::Exhausted,
            Self::TooManyBits(_) => ErrorKind::InvalidSyntax,
        }
    }
}

// Big Endian bit reader
// Reads bits from the head of the buffer towards the tail, most significant bit first.
// The reader never reads beyond the end of the buffer, every read is bounds checked.
pub struct BitReader<'a> {
    buf: &'a [u8],
    bit_cursor: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_cursor: 0 }
    }

    /// Number of bits consumed so far
    pub fn position(&self) -> usize {
        self.bit_cursor
    }

    pub fn bits_remaining(&self) -> usize {
        self.buf.len() * 8 - self.bit_cursor
    }

    /// Reads up to 32 bits without advancing the cursor
    pub fn peek(&self, num_bits: usize) -> Result<u32, BitReaderError> {
        self.check(num_bits)?;
        Ok(self.peek_padded(num_bits))
    }

    /// Reads up to 32 bits without advancing the cursor. Bits beyond the end of the
    /// buffer read as zero so the caller must validate the number of bits it consumes.
    pub fn peek_padded(&self, num_bits: usize) -> u32 {
        if num_bits == 0 {
            return 0;
        }

        let byte_index = self.bit_cursor / 8;
        let bit_index = self.bit_cursor % 8;

        let word = if byte_index + 8 <= self.buf.len() {
            BigEndian::read_u64(&self.buf[byte_index..])
        } else {
            let mut tmp = [0; 8];
            let tail = self.buf.get(byte_index..).unwrap_or(&[]);
            tmp[..tail.len()].copy_from_slice(tail);
            BigEndian::read_u64(&tmp)
        };

        ((word << bit_index) >> (64 - num_bits)) as u32
    }

    /// Reads up to 32 bits and advances the cursor
    pub fn read(&mut self, num_bits: usize) -> Result<u32, BitReaderError> {
        let value = self.peek(num_bits)?;
        self.bit_cursor += num_bits;
        Ok(value)
    }

    pub fn read_usize(&mut self, num_bits: usize) -> Result<usize, BitReaderError> {
        self.read(num_bits).map(|x| x as usize)
    }

    pub fn read_bool(&mut self) -> Result<bool, BitReaderError> {
        self.read(1).map(|x| x == 1)
    }

    pub fn skip(&mut self, num_bits: usize) -> Result<(), BitReaderError> {
        let remaining = self.bits_remaining();
        if num_bits > remaining {
            return Err(BitReaderError::Exhausted {
                requested: num_bits,
                remaining,
            });
        }

        self.bit_cursor += num_bits;
        Ok(())
    }

    /// Moves the cursor forward to the next byte boundary (no-op if already aligned)
    pub fn align_to_byte(&mut self) {
        self.bit_cursor = (self.bit_cursor + 7) & !7;
    }

    /// Byte aligns relative to an earlier bit position rather than to the start of the buffer
    pub fn align_relative_to(&mut self, origin: usize) {
        let misalignment = (self.bit_cursor - origin.min(self.bit_cursor)) % 8;
        if misalignment != 0 {
            self.bit_cursor += 8 - misalignment;
        }
        self.bit_cursor = self.bit_cursor.min(self.buf.len() * 8);
    }

    fn check(&self, num_bits: usize) -> Result<(), BitReaderError> {
        if num_bits > 32 {
            return Err(BitReaderError::TooManyBits(num_bits));
        }

        let remaining = self.bits_remaining();
        if num_bits > remaining {
            Err(BitReaderError::Exhausted {
                requested: num_bits,
                remaining,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    #[test]
    fn read_multiple_values_from_bigendian_bitstream() {
        let buf: [u8; 2] = [0b1011_0110, 0b0100_1111];
        let mut reader = BitReader::new(&buf);

        assert_eq!(reader.read(3).unwrap(), 0b101);
        assert_eq!(reader.read(8).unwrap(), 0b1011_0010);
        assert_eq!(reader.bits_remaining(), 5);
        assert_eq!(reader.read(5).unwrap(), 0b01111);
        assert_eq!(reader.bits_remaining(), 0);
    }

    #[test]
    fn read_32_bits_across_unaligned_bytes() {
        let buf = [0xff, 0x12, 0x34, 0x56, 0x78, 0x9a];
        let mut reader = BitReader::new(&buf);
        reader.skip(4).unwrap();

        assert_eq!(reader.read(32).unwrap(), 0xf123_4567);
        assert_eq!(reader.position(), 36);
    }

    #[test]
    fn peek_does_not_advance() {
        let buf = [0b1100_0000];
        let reader = BitReader::new(&buf);

        assert_eq!(reader.peek(2).unwrap(), 3);
        assert_eq!(reader.peek(2).unwrap(), 3);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn read_past_end_is_exhausted() {
        let buf = [0xaa];
        let mut reader = BitReader::new(&buf);
        reader.read(5).unwrap();

        let err = reader.read(4).unwrap_err();
        assert_eq!(err, BitReaderError::Exhausted { requested: 4, remaining: 3 });
        // the cursor is untouched by a failed read
        assert_eq!(reader.bits_remaining(), 3);
        assert!(reader.skip(4).is_err());
    }

    #[test]
    fn peek_padded_reads_zeros_beyond_buffer() {
        let buf = [0b1010_1010];
        let mut reader = BitReader::new(&buf);
        reader.skip(6).unwrap();

        assert_eq!(reader.peek_padded(8), 0b1000_0000);
        assert!(reader.peek(8).is_err());
    }

    #[test]
    fn align_to_byte_boundary() {
        let buf = [0xff, 0x0f];
        let mut reader = BitReader::new(&buf);
        reader.align_to_byte();
        assert_eq!(reader.position(), 0);

        reader.read(3).unwrap();
        reader.align_to_byte();
        assert_eq!(reader.position(), 8);
        assert_eq!(reader.read(8).unwrap(), 0x0f);
    }

    #[test]
    fn align_relative_to_origin() {
        let buf = [0; 4];
        let mut reader = BitReader::new(&buf);
        reader.skip(3).unwrap();
        let origin = reader.position();
        reader.skip(2).unwrap();
        reader.align_relative_to(origin);
        assert_eq!(reader.position(), 11);
    }
}
