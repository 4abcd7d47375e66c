extern crate std;
use std::vec::Vec;

/// Big endian bit writer used to hand assemble bitstreams in tests
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u32, num_bits: usize) -> &mut Self {
        for i in (0..num_bits).rev() {
            let bit = (value >> i) & 1;
            if self.num_bits % 8 == 0 {
                self.bytes.push(0);
            }
            if bit == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.num_bits % 8);
            }
            self.num_bits += 1;
        }
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write(value as u32, 1)
    }

    pub fn align(&mut self) -> &mut Self {
        while self.num_bits % 8 != 0 {
            self.write(0, 1);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.num_bits
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
