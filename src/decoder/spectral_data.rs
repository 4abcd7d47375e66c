use super::{
    bit_reader::{BitReader, BitReaderError},
    codebook::{codebooks, CodebookError, Codebooks, SpectralCodebook},
    error::ErrorKind,
    ics_info::IcsInfo,
    pulse_data::PulseData,
    scalefactors::{band_gain, noise_gain},
    section_data::{BandType, SectionData},
};
use crate::common::{
    complex::Scaler,
    constants::{MAX_BANDS, MAX_ESCAPE_PREFIX, MAX_LEN_SPECTRAL, NOISE_SEED, SHORT_WINDOW_STRIDE},
};

#[derive(Debug)]
pub enum SpectralError {
    EscapeOverflow,
    Codebook(CodebookError),
}

impl SpectralError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EscapeOverflow => ErrorKind::InvalidSyntax,
            Self::Codebook(err) => err.kind(),
        }
    }
}

impl From<CodebookError> for SpectralError {
    fn from(err: CodebookError) -> Self {
        Self::Codebook(err)
    }
}

impl From<BitReaderError> for SpectralError {
    fn from(err: BitReaderError) -> Self {
        Self::Codebook(CodebookError::BitReader(err))
    }
}

/// Linear congruential generator for perceptual noise substitution. One generator is shared
/// by every channel of a decoder.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    state: u32,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self { state: NOISE_SEED }
    }
}

impl NoiseGenerator {
    pub fn next_value(&mut self) -> i32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state as i32
    }

    pub fn reset(&mut self) {
        self.state = NOISE_SEED;
    }
}

/// Per channel inputs of the spectral decoder
pub struct BandLayout<'a> {
    pub info: &'a IcsInfo,
    pub sections: &'a SectionData,
    pub scalefactors: &'a [i32; MAX_BANDS],
}

/// Decodes the spectral data of one channel and dequantizes it into `coefficients`
/// (short windows are laid out 128 lines apart)
///
/// # Arguments
///
/// * `reader` - Positioned at the start of the spectral data
/// * `layout` - Window layout, band types and scalefactors of the channel
/// * `pulse_data` - Pulse corrections applied to the quantized values before dequantization
/// * `noise` - Generator used to fill noise substituted bands
/// * `coefficients` - Output buffer of at least 1024 lines, fully overwritten
pub fn read(
    reader: &mut BitReader,
    layout: &BandLayout,
    pulse_data: Option<&PulseData>,
    noise: &mut NoiseGenerator,
    coefficients: &mut [Scaler],
) -> Result<(), SpectralError> {
    let books = codebooks();
    let info = layout.info;
    let mut quantized = [0i32; MAX_LEN_SPECTRAL];

    let mut window = 0;
    let mut idx = 0;
    for &group_len in &info.group_len[..info.num_window_groups] {
        for sfb in 0..info.max_sfb {
            if let BandType::Spectral(codebook) = layout.sections.band_types[idx] {
                let book = books.spectral(codebook as usize);
                for w in window..window + group_len {
                    let start = w * SHORT_WINDOW_STRIDE + info.band_start(sfb);
                    let end = w * SHORT_WINDOW_STRIDE + info.band_start(sfb + 1);
                    for values in quantized[start..end].chunks_mut(book.dimension) {
                        read_tuple(reader, book, values)?;
                    }
                }
            }
            idx += 1;
        }
        window += group_len;
    }

    if let Some(pulse_data) = pulse_data {
        pulse_data.apply(&mut quantized);
    }

    dequantize(books, layout, &quantized, noise, coefficients);
    Ok(())
}

fn read_tuple(reader: &mut BitReader, book: &SpectralCodebook, values: &mut [i32]) -> Result<(), SpectralError> {
    let symbol = book.codebook.decode(reader)? as usize;
    let tuple = book.tuples.get(symbol).copied().unwrap_or_default();
    for (value, x) in values.iter_mut().zip(tuple) {
        *value = x as i32;
    }

    if !book.signed {
        for value in values.iter_mut() {
            if *value != 0 && reader.read_bool()? {
                *value = -*value;
            }
        }
    }

    if book.escape {
        for value in values.iter_mut() {
            if value.abs() == 16 {
                *value = value.signum() * read_escape(reader)?;
            }
        }
    }

    Ok(())
}

// escape sequence: N ones, a zero, then N + 4 bits added to 2^(N + 4)
fn read_escape(reader: &mut BitReader) -> Result<i32, SpectralError> {
    let mut prefix = 0;
    while reader.read_bool()? {
        prefix += 1;
        if prefix > MAX_ESCAPE_PREFIX {
            return Err(SpectralError::EscapeOverflow);
        }
    }

    let num_bits = prefix + 4;
    Ok((1 << num_bits) + reader.read(num_bits)? as i32)
}

fn dequantize(
    books: &Codebooks,
    layout: &BandLayout,
    quantized: &[i32],
    noise: &mut NoiseGenerator,
    coefficients: &mut [Scaler],
) {
    let info = layout.info;
    coefficients[..MAX_LEN_SPECTRAL].fill(0.0);

    let mut window = 0;
    let mut idx = 0;
    for &group_len in &info.group_len[..info.num_window_groups] {
        for sfb in 0..info.max_sfb {
            let scalefactor = layout.scalefactors[idx];
            for w in window..window + group_len {
                let start = w * SHORT_WINDOW_STRIDE + info.band_start(sfb);
                let end = w * SHORT_WINDOW_STRIDE + info.band_start(sfb + 1);
                let band = &mut coefficients[start..end];

                match layout.sections.band_types[idx] {
                    BandType::Spectral(_) => {
                        let gain = band_gain(scalefactor);
                        for (coefficient, q) in band.iter_mut().zip(&quantized[start..end]) {
                            *coefficient = dequantize_value(books, *q) * gain;
                        }
                    }
                    BandType::Noise => {
                        let mut energy = 0.0;
                        for coefficient in band.iter_mut() {
                            *coefficient = noise.next_value() as Scaler;
                            energy += *coefficient * *coefficient;
                        }
                        if energy > 0.0 {
                            let scale = noise_gain(scalefactor) / energy.sqrt();
                            band.iter_mut().for_each(|x| *x *= scale);
                        }
                    }
                    _ => {}
                }
            }
            idx += 1;
        }
        window += group_len;
    }
}

// sign(q) * |q|^(4/3)
fn dequantize_value(books: &Codebooks, q: i32) -> Scaler {
    let magnitude = q.unsigned_abs() as usize;
    let value = match books.dequant.get(magnitude) {
        Some(x) => *x,
        None => (magnitude as f64).powf(4.0 / 3.0) as Scaler,
    };

    if q < 0 {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::common::config::{FrameLength, SamplingFrequency};
    use crate::decoder::pulse_data::Pulse;
    use crate::decoder::test_util::BitWriter;
    use crate::tables::band_offsets::band_offsets;
    use crate::tables::huffman::*;

    fn long_info(max_sfb: usize) -> IcsInfo {
        let swb_offset = band_offsets(FrameLength::Standard1024, SamplingFrequency::from_index(3).unwrap(), false).unwrap();
        IcsInfo {
            num_swb: swb_offset.len() - 1,
            swb_offset,
            max_sfb,
            num_windows: 1,
            num_window_groups: 1,
            group_len: [1, 0, 0, 0, 0, 0, 0, 0],
            ..Default::default()
        }
    }

    // symbol of a pair in the escape codebook
    fn escape_pair(a: usize, b: usize) -> (u32, usize) {
        let symbol = a * 17 + b;
        (SPECTRAL_CODES_11[symbol] as u32, SPECTRAL_BITS_11[symbol] as usize)
    }

    #[test]
    fn all_zero_bands_give_silence() {
        let info = long_info(49);
        let sections = SectionData::default();
        let scalefactors = [0; MAX_BANDS];
        let layout = BandLayout {
            info: &info,
            sections: &sections,
            scalefactors: &scalefactors,
        };

        let buf = [];
        let mut reader = BitReader::new(&buf);
        let mut noise = NoiseGenerator::default();
        let mut coefficients = [1.0; 1024];
        read(&mut reader, &layout, None, &mut noise, &mut coefficients).unwrap();

        assert!(coefficients.iter().all(|x| *x == 0.0));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn escape_values_are_decoded_with_signs() {
        // band 0 (4 lines) uses the escape codebook: (16, 3) then (0, 16)
        let info = long_info(1);
        let mut sections = SectionData::default();
        sections.band_types[0] = BandType::Spectral(11);
        let mut scalefactors = [0; MAX_BANDS];
        scalefactors[0] = 100;

        let mut writer = BitWriter::new();
        let (code, len) = escape_pair(16, 3);
        writer.write(code, len).write(1, 1).write(0, 1);
        // escape 0b10 + 5 bits: 2^5 + 7 = 39
        writer.write(0b10, 2).write(7, 5);
        let (code, len) = escape_pair(0, 16);
        writer.write(code, len).write(0, 1);
        // escape with 8 leading ones: 2^12 + 4095 = 8191
        writer.write(0b1111_1111_0, 9).write(4095, 12);
        let buf = writer.into_bytes();

        let layout = BandLayout {
            info: &info,
            sections: &sections,
            scalefactors: &scalefactors,
        };
        let mut reader = BitReader::new(&buf);
        let mut coefficients = [0.0; 1024];
        read(&mut reader, &layout, None, &mut NoiseGenerator::default(), &mut coefficients).unwrap();

        let expect = |x: f64| x.powf(4.0 / 3.0) as f32;
        assert!((coefficients[0] + expect(39.0)).abs() < 1e-2);
        assert!((coefficients[1] - expect(3.0)).abs() < 1e-4);
        assert_eq!(coefficients[2], 0.0);
        assert!((coefficients[3] - expect(8191.0)).abs() < 1.0);
    }

    #[test]
    fn escape_prefix_longer_than_eight_is_rejected() {
        let info = long_info(1);
        let mut sections = SectionData::default();
        sections.band_types[0] = BandType::Spectral(11);
        let scalefactors = [100; MAX_BANDS];

        let mut writer = BitWriter::new();
        let (code, len) = escape_pair(16, 0);
        writer.write(code, len).write(0, 1);
        writer.write(0x3ff, 10).write(0, 16);
        let buf = writer.into_bytes();

        let layout = BandLayout {
            info: &info,
            sections: &sections,
            scalefactors: &scalefactors,
        };
        let mut reader = BitReader::new(&buf);
        let mut coefficients = [0.0; 1024];
        let err = read(&mut reader, &layout, None, &mut NoiseGenerator::default(), &mut coefficients).unwrap_err();
        assert!(matches!(err, SpectralError::EscapeOverflow));
        assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn truncated_escape_is_exhausted() {
        let info = long_info(1);
        let mut sections = SectionData::default();
        sections.band_types[0] = BandType::Spectral(11);
        let scalefactors = [100; MAX_BANDS];

        let mut writer = BitWriter::new();
        let (code, len) = escape_pair(16, 0);
        writer.write(code, len).write(0, 1).write(0b1110, 4);
        let buf = writer.into_bytes();

        let layout = BandLayout {
            info: &info,
            sections: &sections,
            scalefactors: &scalefactors,
        };
        let mut reader = BitReader::new(&buf);
        let mut coefficients = [0.0; 1024];
        let err = read(&mut reader, &layout, None, &mut NoiseGenerator::default(), &mut coefficients).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn noise_band_matches_band_energy() {
        let info = long_info(2);
        let mut sections = SectionData::default();
        sections.band_types[1] = BandType::Noise;
        let mut scalefactors = [0; MAX_BANDS];
        scalefactors[1] = 20;

        let layout = BandLayout {
            info: &info,
            sections: &sections,
            scalefactors: &scalefactors,
        };
        let buf = [];
        let mut reader = BitReader::new(&buf);
        let mut noise = NoiseGenerator::default();
        let mut coefficients = [0.0; 1024];
        read(&mut reader, &layout, None, &mut noise, &mut coefficients).unwrap();

        let energy: f32 = coefficients[4..8].iter().map(|x| x * x).sum();
        assert!((energy.sqrt() - noise_gain(20)).abs() < 1e-2);
        assert!(coefficients[..4].iter().all(|x| *x == 0.0));
        assert!(coefficients[8..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn pulses_adjust_quantized_values() {
        // codebook 1, all four lines zero, pulse of amplitude 2 on line 1
        let info = long_info(1);
        let mut sections = SectionData::default();
        sections.band_types[0] = BandType::Spectral(1);
        let mut scalefactors = [0; MAX_BANDS];
        scalefactors[0] = 100;

        let mut writer = BitWriter::new();
        writer.write(SPECTRAL_CODES_1[40] as u32, SPECTRAL_BITS_1[40] as usize);
        let buf = writer.into_bytes();

        let mut pulse_data = PulseData::default();
        pulse_data
            .pulses
            .push(Pulse {
                position: 1,
                amplitude: 2,
            })
            .unwrap();

        let layout = BandLayout {
            info: &info,
            sections: &sections,
            scalefactors: &scalefactors,
        };
        let mut reader = BitReader::new(&buf);
        let mut coefficients = [0.0; 1024];
        read(&mut reader, &layout, Some(&pulse_data), &mut NoiseGenerator::default(), &mut coefficients).unwrap();

        let expect = (2.0f64).powf(4.0 / 3.0) as f32;
        assert!((coefficients[1] + expect).abs() < 1e-5);
        assert_eq!(coefficients[0], 0.0);
    }

    #[test]
    fn noise_generator_sequence() {
        let mut noise = NoiseGenerator::default();
        let first = noise.next_value();
        assert_eq!(first as u32, NOISE_SEED.wrapping_mul(1664525).wrapping_add(1013904223));
        noise.reset();
        assert_eq!(noise.next_value(), first);
    }
}
