use super::{
    bit_reader::{BitReader, BitReaderError},
    error::ErrorKind,
    ics_info::IcsInfo,
};
use crate::common::constants::MAX_BANDS;

/// Coding of a scalefactor band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandType {
    /// All lines zero, no scalefactor
    #[default]
    Zero,
    /// Huffman coded with spectral codebook 1..=11
    Spectral(u8),
    /// Perceptual noise substitution
    Noise,
    /// Intensity stereo, second channel is the negated scaled first channel
    IntensityOutOfPhase,
    /// Intensity stereo, second channel is the scaled first channel
    IntensityInPhase,
}

impl BandType {
    fn from_codebook(codebook: u32) -> Result<Self, SectionError> {
        match codebook {
            0 => Ok(Self::Zero),
            1..=11 => Ok(Self::Spectral(codebook as u8)),
            13 => Ok(Self::Noise),
            14 => Ok(Self::IntensityOutOfPhase),
            15 => Ok(Self::IntensityInPhase),
            _ => Err(SectionError::ReservedCodebook(codebook)),
        }
    }

    pub fn is_intensity(&self) -> bool {
        matches!(self, Self::IntensityOutOfPhase | Self::IntensityInPhase)
    }

    /// true for bands carrying huffman coded (or zero) spectral lines, i.e. eligible for M/S
    pub fn is_spectral_or_zero(&self) -> bool {
        matches!(self, Self::Zero | Self::Spectral(_))
    }
}

#[derive(Debug)]
pub enum SectionError {
    ReservedCodebook(u32),
    SectionPastMaxSfb { end: usize, max_sfb: usize },
    BitReader(BitReaderError),
}

impl SectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BitReader(err) => err.kind(),
            _ => ErrorKind::InvalidSyntax,
        }
    }
}

impl From<BitReaderError> for SectionError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

/// Band types of every coded band. Bands are stored group by group, `max_sfb` entries per
/// window group.
#[derive(Debug, Clone)]
pub struct SectionData {
    pub band_types: [BandType; MAX_BANDS],

    /// Band (exclusive, within its group) where the section containing each band ends
    pub run_end: [usize; MAX_BANDS],
}

impl Default for SectionData {
    fn default() -> Self {
        Self {
            band_types: [BandType::Zero; MAX_BANDS],
            run_end: [0; MAX_BANDS],
        }
    }
}

impl SectionData {
    /// Reads the section_data block. Each section is a 4 bit codebook followed by an escape
    /// coded length (5 bit runs for long windows, 3 bit runs for short windows).
    pub fn read(&mut self, reader: &mut BitReader, info: &IcsInfo) -> Result<(), SectionError> {
        let bits = if info.is_eight_short() { 3 } else { 5 };
        let escape = (1 << bits) - 1;
        let mut idx = 0;

        for _ in 0..info.num_window_groups {
            let mut k = 0;
            while k < info.max_sfb {
                let band_type = BandType::from_codebook(reader.read(4)?)?;

                let mut end = k;
                loop {
                    let increment = reader.read_usize(bits)?;
                    end += increment;
                    if end > info.max_sfb {
                        return Err(SectionError::SectionPastMaxSfb {
                            end,
                            max_sfb: info.max_sfb,
                        });
                    }
                    if increment != escape {
                        break;
                    }
                }

                while k < end {
                    self.band_types[idx] = band_type;
                    self.run_end[idx] = end;
                    idx += 1;
                    k += 1;
                }
            }
        }

        Ok(())
    }

    /// Marks every band as zero (used when a channel carries no data)
    pub fn clear(&mut self) {
        self.band_types = [BandType::Zero; MAX_BANDS];
    }
}
