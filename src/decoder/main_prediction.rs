use bitvec::prelude::*;

use super::{
    bit_reader::{BitReader, BitReaderError},
    error::ErrorKind,
    ics_info::IcsInfo,
};
use crate::{
    common::{complex::Scaler, config::SamplingFrequency, constants::MAX_PREDICTOR_SFB},
    tables::band_offsets::predictor_max_bands,
};

// one predictor per spectral line up to the highest predicted band
const MAX_PREDICTORS: usize = 672;

// reset groups interleave the predictors with this period
const NUM_RESET_GROUPS: usize = 30;

// attenuation and adaptation constants of the lattice predictor
const A: f32 = 0.953125;
const ALPHA: f32 = 0.90625;

#[derive(Debug)]
pub enum PredictionError {
    InvalidResetGroup(usize),
    BitReader(BitReaderError),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidResetGroup(_) => ErrorKind::InvalidSyntax,
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for PredictionError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

/// Main profile prediction side info of one channel
#[derive(Debug, Clone, Default)]
pub struct PredictionData {
    /// Predictor reset group 1..=30, 0 when no reset is signalled
    pub reset_group: usize,
    pub used: BitArray<[u64; 1]>,
}

impl PredictionData {
    pub fn read(&mut self, reader: &mut BitReader, num_bands: usize) -> Result<(), PredictionError> {
        if reader.read_bool()? {
            self.reset_group = reader.read_usize(5)?;
            if self.reset_group == 0 || self.reset_group > NUM_RESET_GROUPS {
                return Err(PredictionError::InvalidResetGroup(self.reset_group));
            }
        }

        self.used = BitArray::ZERO;
        for sfb in 0..num_bands.min(MAX_PREDICTOR_SFB) {
            self.used.set(sfb, reader.read_bool()?);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct PredictorState {
    r0: f32,
    r1: f32,
    cor0: f32,
    cor1: f32,
    var0: f32,
    var1: f32,
}

impl Default for PredictorState {
    fn default() -> Self {
        Self {
            r0: 0.0,
            r1: 0.0,
            cor0: 0.0,
            cor1: 0.0,
            var0: 1.0,
            var1: 1.0,
        }
    }
}

impl PredictorState {
    // second order backward adaptive lattice predictor, state kept at 16 bit mantissa precision
    fn predict(&mut self, coef: &mut Scaler, output_enable: bool) {
        let k1 = if self.var0 > 1.0 {
            self.cor0 * flt16_even(A / self.var0)
        } else {
            0.0
        };
        let k2 = if self.var1 > 1.0 {
            self.cor1 * flt16_even(A / self.var1)
        } else {
            0.0
        };

        let prediction = flt16_round(k1 * self.r0 + k2 * self.r1);
        if output_enable {
            *coef += prediction;
        }

        let e0 = *coef;
        let e1 = e0 - k1 * self.r0;

        self.cor1 = flt16_trunc(ALPHA * self.cor1 + self.r1 * e1);
        self.var1 = flt16_trunc(ALPHA * self.var1 + 0.5 * (self.r1 * self.r1 + e1 * e1));
        self.cor0 = flt16_trunc(ALPHA * self.cor0 + self.r0 * e0);
        self.var0 = flt16_trunc(ALPHA * self.var0 + 0.5 * (self.r0 * self.r0 + e0 * e0));

        self.r1 = flt16_trunc(A * (self.r0 - k1 * e0));
        self.r0 = flt16_trunc(A * e0);
    }
}

/// Predictor bank of one channel
#[derive(Debug, Clone)]
pub struct Predictors {
    states: Vec<PredictorState>,
}

impl Default for Predictors {
    fn default() -> Self {
        Self {
            states: vec![PredictorState::default(); MAX_PREDICTORS],
        }
    }
}

impl Predictors {
    pub fn reset(&mut self) {
        self.states.fill(PredictorState::default());
    }

    /// Runs every predictor of a long window frame (adding the prediction to the bands flagged
    /// as used) and applies the signalled group reset. Short window frames reset all predictors.
    pub fn apply(&mut self, info: &IcsInfo, freq: SamplingFrequency, coefficients: &mut [Scaler]) {
        if info.is_eight_short() {
            self.reset();
            return;
        }

        for sfb in 0..predictor_max_bands(freq).min(info.num_swb) {
            let output_enable = info.predictor_present && info.prediction.used[sfb];
            let band = info.band_start(sfb)..info.band_start(sfb + 1).min(MAX_PREDICTORS);
            if band.is_empty() {
                break;
            }
            for (state, coef) in self.states[band.clone()].iter_mut().zip(&mut coefficients[band]) {
                state.predict(coef, output_enable);
            }
        }

        if info.predictor_present && info.prediction.reset_group > 0 {
            for state in self.states.iter_mut().skip(info.prediction.reset_group - 1).step_by(NUM_RESET_GROUPS) {
                *state = PredictorState::default();
            }
        }
    }
}

// round to nearest, ties away from zero, keeping 16 bits of the float
fn flt16_round(x: f32) -> f32 {
    f32::from_bits((x.to_bits().wrapping_add(0x0000_8000)) & 0xFFFF_0000)
}

// round to nearest, ties to even, keeping 16 bits of the float
fn flt16_even(x: f32) -> f32 {
    let bits = x.to_bits();
    f32::from_bits(bits.wrapping_add(0x0000_7FFF + ((bits >> 16) & 1)) & 0xFFFF_0000)
}

fn flt16_trunc(x: f32) -> f32 {
    f32::from_bits(x.to_bits() & 0xFFFF_0000)
}
