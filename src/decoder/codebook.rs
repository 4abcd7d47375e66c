use std::sync::OnceLock;

use super::bit_reader::{BitReader, BitReaderError};
use super::error::ErrorKind;
use crate::tables::huffman::*;

// number of bits used to index the primary lookup table, longer codes escape to a sub-table
const PRIMARY_BITS: usize = 8;

// largest magnitude representable in a spectral codebook or through the escape mechanism
pub const MAX_QUANTIZED_VALUE: usize = 8191;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodebookError {
    InvalidCode(u32),
    BitReader(BitReaderError),
}

impl CodebookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCode(_) => ErrorKind::InvalidSyntax,
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for CodebookError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VlcEntry {
    Invalid,
    Symbol { symbol: u16, len: u8 },
    Overlong { offset: u32, bits: u8 },
}

/// Canonical huffman decoder with a fixed prefix lookup table. Codes longer than the
/// prefix resolve through an "overlong" second level table.
pub struct Codebook {
    table: Vec<VlcEntry>,
    max_len: usize,
}

impl Codebook {
    /// Builds a decode table from code words and their lengths (indexed by symbol)
    pub fn build(codes: &[u32], lengths: &[u8]) -> Self {
        let max_len = lengths.iter().copied().max().unwrap_or(0) as usize;
        let mut table = vec![VlcEntry::Invalid; 1 << PRIMARY_BITS];

        // size the overlong sub tables by the longest code sharing each primary prefix
        let mut overlong_bits = [0usize; 1 << PRIMARY_BITS];
        for (&code, &len) in codes.iter().zip(lengths) {
            let len = len as usize;
            if len > PRIMARY_BITS {
                let prefix = (code >> (len - PRIMARY_BITS)) as usize;
                overlong_bits[prefix] = overlong_bits[prefix].max(len - PRIMARY_BITS);
            }
        }

        for (prefix, &bits) in overlong_bits.iter().enumerate() {
            if bits > 0 {
                table[prefix] = VlcEntry::Overlong {
                    offset: table.len() as u32,
                    bits: bits as u8,
                };
                table.resize(table.len() + (1 << bits), VlcEntry::Invalid);
            }
        }

        for (symbol, (&code, &len)) in codes.iter().zip(lengths).enumerate() {
            let len = len as usize;
            let entry = VlcEntry::Symbol {
                symbol: symbol as u16,
                len: len as u8,
            };

            if len <= PRIMARY_BITS {
                let first = (code as usize) << (PRIMARY_BITS - len);
                for slot in &mut table[first..first + (1 << (PRIMARY_BITS - len))] {
                    *slot = entry;
                }
            } else {
                let prefix = (code >> (len - PRIMARY_BITS)) as usize;
                if let VlcEntry::Overlong { offset, bits } = table[prefix] {
                    let bits = bits as usize;
                    let suffix_len = len - PRIMARY_BITS;
                    let suffix = (code as usize) & ((1 << suffix_len) - 1);
                    let first = offset as usize + (suffix << (bits - suffix_len));
                    for slot in &mut table[first..first + (1 << (bits - suffix_len))] {
                        *slot = entry;
                    }
                }
            }
        }

        Self { table, max_len }
    }

    /// Decodes one symbol and advances the reader past its code word
    pub fn decode(&self, reader: &mut BitReader) -> Result<u16, CodebookError> {
        let prefix = reader.peek_padded(PRIMARY_BITS) as usize;
        let entry = match self.table[prefix] {
            VlcEntry::Overlong { offset, bits } => {
                let bits = bits as usize;
                let index = reader.peek_padded(PRIMARY_BITS + bits) as usize & ((1 << bits) - 1);
                self.table[offset as usize + index]
            }
            entry => entry,
        };

        match entry {
            VlcEntry::Symbol { symbol, len } => {
                reader.skip(len as usize)?;
                Ok(symbol)
            }
            _ => Err(CodebookError::InvalidCode(reader.peek_padded(self.max_len.min(32)))),
        }
    }
}

/// Describes how a spectral codebook symbol unpacks into quantized values
pub struct SpectralCodebook {
    pub codebook: Codebook,

    /// Number of values per symbol (4 for quads, 2 for pairs)
    pub dimension: usize,

    /// true when the values carry their own sign, otherwise sign bits follow the code word
    pub signed: bool,

    /// true for the escape codebook (magnitude 16 is followed by an escape sequence)
    pub escape: bool,

    /// Unpacked values for every symbol
    pub tuples: Vec<[i8; 4]>,
}

impl SpectralCodebook {
    fn build(codes: &[u16], lengths: &[u8], dimension: usize, modulo: usize, signed: bool, escape: bool) -> Self {
        let codes: Vec<u32> = codes.iter().map(|x| *x as u32).collect();
        let offset = if signed { (modulo / 2) as i32 } else { 0 };

        let tuples = (0..codes.len())
            .map(|symbol| {
                let mut tuple = [0; 4];
                let mut rest = symbol;
                for value in tuple[..dimension].iter_mut().rev() {
                    *value = ((rest % modulo) as i32 - offset) as i8;
                    rest /= modulo;
                }
                tuple
            })
            .collect();

        Self {
            codebook: Codebook::build(&codes, lengths),
            dimension,
            signed,
            escape,
            tuples,
        }
    }
}

/// Every codebook the decoder needs, built once per process and shared read-only
pub struct Codebooks {
    pub scalefactor: Codebook,
    pub spectral: [SpectralCodebook; 11],

    /// x^(4/3) for every quantized magnitude
    pub dequant: Vec<f32>,
}

impl Codebooks {
    fn build() -> Self {
        let dequant = (0..=MAX_QUANTIZED_VALUE).map(|x| (x as f64).powf(4.0 / 3.0) as f32).collect();

        Self {
            scalefactor: Codebook::build(&SCALEFACTOR_CODES, &SCALEFACTOR_BITS),
            spectral: [
                SpectralCodebook::build(&SPECTRAL_CODES_1, &SPECTRAL_BITS_1, 4, 3, true, false),
                SpectralCodebook::build(&SPECTRAL_CODES_2, &SPECTRAL_BITS_2, 4, 3, true, false),
                SpectralCodebook::build(&SPECTRAL_CODES_3, &SPECTRAL_BITS_3, 4, 3, false, false),
                SpectralCodebook::build(&SPECTRAL_CODES_4, &SPECTRAL_BITS_4, 4, 3, false, false),
                SpectralCodebook::build(&SPECTRAL_CODES_5, &SPECTRAL_BITS_5, 2, 9, true, false),
                SpectralCodebook::build(&SPECTRAL_CODES_6, &SPECTRAL_BITS_6, 2, 9, true, false),
                SpectralCodebook::build(&SPECTRAL_CODES_7, &SPECTRAL_BITS_7, 2, 8, false, false),
                SpectralCodebook::build(&SPECTRAL_CODES_8, &SPECTRAL_BITS_8, 2, 8, false, false),
                SpectralCodebook::build(&SPECTRAL_CODES_9, &SPECTRAL_BITS_9, 2, 13, false, false),
                SpectralCodebook::build(&SPECTRAL_CODES_10, &SPECTRAL_BITS_10, 2, 13, false, false),
                SpectralCodebook::build(&SPECTRAL_CODES_11, &SPECTRAL_BITS_11, 2, 17, false, true),
            ],
            dequant,
        }
    }

    /// Spectral codebook for a band type in the range 1..=11
    pub fn spectral(&self, band_type: usize) -> &SpectralCodebook {
        &self.spectral[band_type - 1]
    }
}

/// Returns the process wide codebooks, building them on first use. Concurrent first callers
/// block until the single build completes.
pub fn codebooks() -> &'static Codebooks {
    static CODEBOOKS: OnceLock<Codebooks> = OnceLock::new();
    CODEBOOKS.get_or_init(Codebooks::build)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::decoder::test_util::BitWriter;

    #[test]
    fn scalefactor_codebook_decodes_every_symbol() {
        let books = codebooks();
        let mut writer = BitWriter::new();
        for (code, len) in SCALEFACTOR_CODES.iter().zip(SCALEFACTOR_BITS) {
            writer.write(*code, len as usize);
        }
        let buf = writer.into_bytes();
        let mut reader = BitReader::new(&buf);

        for expected in 0..SCALEFACTOR_CODES.len() {
            assert_eq!(books.scalefactor.decode(&mut reader).unwrap() as usize, expected);
        }
        assert_eq!(books.scalefactor.max_len, 19);
    }

    #[test]
    fn spectral_codebooks_decode_every_symbol() {
        let books = codebooks();
        let tables: [(&[u16], &[u8]); 3] = [
            (&SPECTRAL_CODES_3, &SPECTRAL_BITS_3),
            (&SPECTRAL_CODES_9, &SPECTRAL_BITS_9),
            (&SPECTRAL_CODES_11, &SPECTRAL_BITS_11),
        ];

        for ((codes, lengths), band_type) in tables.iter().zip([3, 9, 11]) {
            let mut writer = BitWriter::new();
            for (code, len) in codes.iter().zip(lengths.iter()) {
                writer.write(*code as u32, *len as usize);
            }
            let buf = writer.into_bytes();
            let mut reader = BitReader::new(&buf);
            let book = &books.spectral(band_type).codebook;
            for expected in 0..codes.len() {
                assert_eq!(book.decode(&mut reader).unwrap() as usize, expected);
            }
        }
    }

    #[test]
    fn tuples_unpack_in_row_major_order() {
        let books = codebooks();

        // signed quad: centre symbol is all zeros
        assert_eq!(books.spectral(1).tuples[40], [0, 0, 0, 0]);
        assert_eq!(books.spectral(1).tuples[0], [-1, -1, -1, -1]);
        assert_eq!(books.spectral(2).tuples[80], [1, 1, 1, 1]);

        // unsigned quad
        assert_eq!(books.spectral(3).tuples[5], [0, 0, 1, 2]);

        // signed pair
        assert_eq!(books.spectral(5).tuples[0], [-4, -4, 0, 0]);
        assert_eq!(books.spectral(6).tuples[40], [0, 0, 0, 0]);

        // unsigned pairs
        assert_eq!(books.spectral(7).tuples[9], [1, 1, 0, 0]);
        assert_eq!(books.spectral(11).tuples[288], [16, 16, 0, 0]);
        assert!(books.spectral(11).escape);
    }

    #[test]
    fn invalid_code_is_reported() {
        // a code book with a hole: only "0" and "10" are valid
        let book = Codebook::build(&[0, 2], &[1, 2]);
        let buf = [0b1100_0000];
        let mut reader = BitReader::new(&buf);

        assert!(matches!(book.decode(&mut reader), Err(CodebookError::InvalidCode(_))));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn truncated_code_is_exhausted() {
        let books = codebooks();
        // first 8 bits of the 19 bit code for symbol 13 (0x7ffff)
        let buf = [0xff];
        let mut reader = BitReader::new(&buf);

        assert!(matches!(
            books.scalefactor.decode(&mut reader),
            Err(CodebookError::BitReader(BitReaderError::Exhausted { .. }))
        ));
    }

    #[test]
    fn dequant_table_is_power_four_thirds() {
        let books = codebooks();
        assert_eq!(books.dequant[0], 0.0);
        assert_eq!(books.dequant[1], 1.0);
        assert!((books.dequant[8] - 16.0).abs() < 1e-4);
        assert_eq!(books.dequant.len(), MAX_QUANTIZED_VALUE + 1);
    }
}
