use heapless::Vec;

use super::{
    bit_reader::{BitReader, BitReaderError},
    error::ErrorKind,
    ics_info::IcsInfo,
};

// at most four pulses per channel
const MAX_PULSES: usize = 4;

#[derive(Debug)]
pub enum PulseError {
    NotAllowedInEightShort,
    StartBandOutOfRange { band: usize, num_swb: usize },
    PositionOutOfRange { position: usize, limit: usize },
    BitReader(BitReaderError),
}

impl PulseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BitReader(err) => err.kind(),
            _ => ErrorKind::InvalidSyntax,
        }
    }
}

impl From<BitReaderError> for PulseError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// Spectral line the pulse applies to
    pub position: usize,

    /// Magnitude added to the quantized value (away from zero)
    pub amplitude: i32,
}

/// Sparse corrections of quantized spectral lines (long windows only)
#[derive(Debug, Clone, Default)]
pub struct PulseData {
    pub pulses: Vec<Pulse, MAX_PULSES>,
}

impl PulseData {
    pub fn read(reader: &mut BitReader, info: &IcsInfo) -> Result<Self, PulseError> {
        if info.is_eight_short() {
            return Err(PulseError::NotAllowedInEightShort);
        }

        let num_pulses = reader.read_usize(2)? + 1;
        let start_band = reader.read_usize(6)?;
        if start_band >= info.num_swb {
            return Err(PulseError::StartBandOutOfRange {
                band: start_band,
                num_swb: info.num_swb,
            });
        }

        let limit = info.band_start(info.num_swb);
        let mut position = info.band_start(start_band);
        let mut pulses = Vec::new();
        for _ in 0..num_pulses {
            position += reader.read_usize(5)?;
            if position >= limit {
                return Err(PulseError::PositionOutOfRange { position, limit });
            }

            let amplitude = reader.read(4)? as i32;
            // capacity matches the 2 bit pulse count
            let _ = pulses.push(Pulse { position, amplitude });
        }

        Ok(Self { pulses })
    }

    /// Applies the pulses to quantized values. A pulse moves its line away from zero, a zero
    /// line becomes negative.
    pub fn apply(&self, quantized: &mut [i32]) {
        for pulse in &self.pulses {
            if let Some(value) = quantized.get_mut(pulse.position) {
                if *value > 0 {
                    *value += pulse.amplitude;
                } else {
                    *value -= pulse.amplitude;
                }
            }
        }
    }
}
