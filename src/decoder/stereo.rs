use bitvec::prelude::*;
use itertools::izip;

use super::{
    bit_reader::{BitReader, BitReaderError},
    error::ErrorKind,
    ics_info::IcsInfo,
    scalefactors::intensity_gain,
    section_data::BandType,
};
use crate::common::{complex::Scaler, constants::MAX_BANDS};

#[derive(Debug)]
pub enum StereoError {
    ReservedMaskPresent,
    BitReader(BitReaderError),
}

impl StereoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReservedMaskPresent => ErrorKind::InvalidSyntax,
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for StereoError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

/// Mid/side flags of a channel pair, one per coded band (indexed like the band types)
#[derive(Debug, Clone, Default)]
pub struct MsMask {
    pub present: bool,
    pub used: BitArray<[u64; MAX_BANDS / 64]>,
}

impl MsMask {
    /// Reads `ms_mask_present` and the per band flags: 0 none, 1 per band, 2 every band
    pub fn read(reader: &mut BitReader, info: &IcsInfo) -> Result<Self, StereoError> {
        let mut mask = Self::default();
        match reader.read(2)? {
            0 => {}
            1 => {
                mask.present = true;
                for idx in 0..info.num_window_groups * info.max_sfb {
                    mask.used.set(idx, reader.read_bool()?);
                }
            }
            2 => {
                mask.present = true;
                mask.used.fill(true);
            }
            _ => return Err(StereoError::ReservedMaskPresent),
        }
        Ok(mask)
    }
}

/// Converts mid/side coded bands back to left/right: L = M + S, R = M - S. Bands where either
/// channel uses noise substitution or intensity stereo are left untouched.
pub fn apply_mid_side(
    info: &IcsInfo,
    mask: &MsMask,
    band_types: [&[BandType]; 2],
    left: &mut [Scaler],
    right: &mut [Scaler],
) {
    if !mask.present {
        return;
    }

    info.for_each_band(|idx, lines| {
        if mask.used[idx] && band_types[0][idx].is_spectral_or_zero() && band_types[1][idx].is_spectral_or_zero() {
            for (l, r) in izip!(&mut left[lines.clone()], &mut right[lines]) {
                let mid = *l;
                let side = *r;
                *l = mid + side;
                *r = mid - side;
            }
        }
    });
}

/// Rebuilds the intensity coded bands of the second channel from the first channel. The sign of
/// each band comes from its codebook and is inverted by the mid/side flag of the band.
pub fn apply_intensity(
    info: &IcsInfo,
    mask: &MsMask,
    band_types: &[BandType],
    positions: &[i32; MAX_BANDS],
    left: &[Scaler],
    right: &mut [Scaler],
) {
    info.for_each_band(|idx, lines| {
        let mut sign: Scaler = match band_types[idx] {
            BandType::IntensityInPhase => 1.0,
            BandType::IntensityOutOfPhase => -1.0,
            _ => return,
        };
        if mask.present && mask.used[idx] {
            sign = -sign;
        }

        let scale = sign * intensity_gain(positions[idx]);
        for (l, r) in izip!(&left[lines.clone()], &mut right[lines]) {
            *r = scale * l;
        }
    });
}
