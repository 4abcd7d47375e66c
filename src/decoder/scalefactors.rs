use super::{
    bit_reader::{BitReader, BitReaderError},
    codebook::{codebooks, CodebookError},
    error::{Anomaly, ErrorKind, WarnOnce},
    ics_info::IcsInfo,
    section_data::{BandType, SectionData},
};
use crate::common::{complex::Scaler, constants::MAX_BANDS};

// scalefactor of unit gain
const SF_OFFSET: i32 = 100;

// the noise energy offset starts below the global gain
const NOISE_OFFSET: i32 = 90;

// the first noise energy is coded as a 9 bit value biased by this amount
const NOISE_PRE: i32 = 256;
const NOISE_PRE_BITS: usize = 9;

// scalefactor deltas are coded around this huffman symbol
const DELTA_ZERO: i32 = 60;

const SF_RANGE: core::ops::RangeInclusive<i32> = 0..=255;
const NOISE_RANGE: core::ops::RangeInclusive<i32> = -100..=155;
const INTENSITY_RANGE: core::ops::RangeInclusive<i32> = -155..=100;

#[derive(Debug)]
pub enum ScalefactorError {
    OutOfRange(i32),
    Codebook(CodebookError),
}

impl ScalefactorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange(_) => ErrorKind::InvalidSyntax,
            Self::Codebook(err) => err.kind(),
        }
    }
}

impl From<CodebookError> for ScalefactorError {
    fn from(err: CodebookError) -> Self {
        Self::Codebook(err)
    }
}

impl From<BitReaderError> for ScalefactorError {
    fn from(err: BitReaderError) -> Self {
        Self::Codebook(CodebookError::BitReader(err))
    }
}

/// Decodes the scalefactors of every coded band. Normal bands, noise bands and intensity
/// bands each keep their own running offset. Returns the clamped integer scalefactors,
/// indexed like the band types.
pub fn read(
    reader: &mut BitReader,
    global_gain: i32,
    info: &IcsInfo,
    sections: &SectionData,
    strict: bool,
    warnings: &mut WarnOnce,
) -> Result<[i32; MAX_BANDS], ScalefactorError> {
    let mut scalefactors = [0; MAX_BANDS];

    let mut offset = global_gain;
    let mut noise_offset = global_gain - NOISE_OFFSET;
    let mut intensity_offset = 0;
    let mut first_noise_band = true;

    let num_bands = info.num_window_groups * info.max_sfb;
    for (band_type, scalefactor) in sections.band_types[..num_bands].iter().zip(scalefactors.iter_mut()) {
        *scalefactor = match band_type {
            BandType::Zero => 0,
            BandType::IntensityInPhase | BandType::IntensityOutOfPhase => {
                intensity_offset += read_delta(reader)?;
                clamp(intensity_offset, INTENSITY_RANGE, Anomaly::IntensityPositionClamped, warnings)
            }
            BandType::Noise => {
                if first_noise_band {
                    first_noise_band = false;
                    noise_offset += reader.read(NOISE_PRE_BITS)? as i32 - NOISE_PRE;
                } else {
                    noise_offset += read_delta(reader)?;
                }
                clamp(noise_offset, NOISE_RANGE, Anomaly::NoiseEnergyClamped, warnings)
            }
            BandType::Spectral(_) => {
                offset += read_delta(reader)?;
                if !SF_RANGE.contains(&offset) && strict {
                    return Err(ScalefactorError::OutOfRange(offset));
                }
                clamp(offset, SF_RANGE, Anomaly::ScalefactorClamped, warnings)
            }
        };
    }

    Ok(scalefactors)
}

fn read_delta(reader: &mut BitReader) -> Result<i32, ScalefactorError> {
    Ok(codebooks().scalefactor.decode(reader)? as i32 - DELTA_ZERO)
}

fn clamp(value: i32, range: core::ops::RangeInclusive<i32>, anomaly: Anomaly, warnings: &mut WarnOnce) -> i32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warnings.report(anomaly);
    }
    clamped
}

/// Linear gain of a spectral band: 2^((sf - 100) / 4)
pub fn band_gain(scalefactor: i32) -> Scaler {
    (2.0f64).powf(0.25 * (scalefactor - SF_OFFSET) as f64) as Scaler
}

/// Energy of a noise substituted band: 2^(sf / 4)
pub fn noise_gain(scalefactor: i32) -> Scaler {
    (2.0f64).powf(0.25 * scalefactor as f64) as Scaler
}

/// Intensity stereo gain of a band position: 0.5^(position / 4)
pub fn intensity_gain(position: i32) -> Scaler {
    (0.5f64).powf(0.25 * position as f64) as Scaler
}
