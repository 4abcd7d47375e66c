use bitvec::prelude::*;

use super::{
    bit_reader::{BitReader, BitReaderError},
    ics_info::{IcsInfo, WindowSequence},
    modified_dct::transforms,
    temporal_noise_shaping::TnsData,
    windowing::OverlapState,
};
use crate::{
    common::{
        complex::Scaler,
        constants::{LTP_HISTORY_LEN, MAX_LEN_SPECTRAL, MAX_LTP_LONG_SFB},
    },
    tables::windows::window_tables,
};

const LTP_COEFFICIENTS: [Scaler; 8] = [
    0.570829, 0.696616, 0.813004, 0.911304, 0.984900, 1.067894, 1.194601, 1.369533,
];

const FRAME_LEN: usize = MAX_LEN_SPECTRAL;

/// Long term prediction side info of one channel
#[derive(Debug, Clone, Default)]
pub struct LtpData {
    pub present: bool,

    /// Delay in samples into the history buffer (11 bits)
    pub lag: usize,
    pub coef: Scaler,

    /// Bands the prediction is added to
    pub used: BitArray<[u64; 1]>,
}

impl LtpData {
    pub fn read(&mut self, reader: &mut BitReader, max_sfb: usize) -> Result<(), BitReaderError> {
        self.lag = reader.read_usize(11)?;
        self.coef = LTP_COEFFICIENTS[reader.read_usize(3)?];
        self.used = BitArray::ZERO;
        for sfb in 0..max_sfb.min(MAX_LTP_LONG_SFB) {
            self.used.set(sfb, reader.read_bool()?);
        }
        Ok(())
    }
}

/// Reconstructed output of the last frames of one channel, the source of the prediction.
/// Holds the previous two frames of output followed by the windowed overlap part that the next
/// frame will add (three frames in total).
#[derive(Debug, Clone)]
pub struct LtpHistory {
    state: Vec<Scaler>,
}

impl Default for LtpHistory {
    fn default() -> Self {
        Self {
            state: vec![0.0; LTP_HISTORY_LEN],
        }
    }
}

impl LtpHistory {
    pub fn reset(&mut self) {
        self.state.fill(0.0);
    }

    /// Predicts the spectrum of the current frame from the history and adds it to the bands
    /// flagged as used. Short window frames are not predicted.
    pub fn apply(&self, info: &IcsInfo, tns: &TnsData, coefficients: &mut [Scaler]) {
        if info.is_eight_short() {
            return;
        }

        let ltp = &info.ltp;
        let mut pred_time = [0.0; 2 * FRAME_LEN];
        let num_samples = if ltp.lag < FRAME_LEN {
            ltp.lag + FRAME_LEN
        } else {
            2 * FRAME_LEN
        };
        let start = 2 * FRAME_LEN - ltp.lag.min(2 * FRAME_LEN);
        for (predicted, past) in pred_time[..num_samples].iter_mut().zip(&self.state[start..]) {
            *predicted = past * ltp.coef;
        }

        window_prediction(info, &mut pred_time);

        let mut pred_freq = [0.0; FRAME_LEN];
        transforms().get(FRAME_LEN).mdct(&pred_time, &mut pred_freq);

        if tns.present {
            tns.apply(&mut pred_freq, info, false);
        }

        for sfb in 0..info.max_sfb.min(MAX_LTP_LONG_SFB) {
            if ltp.used[sfb] {
                let band = info.band_start(sfb)..info.band_start(sfb + 1);
                for (coef, predicted) in coefficients[band.clone()].iter_mut().zip(&pred_freq[band]) {
                    *coef += predicted;
                }
            }
        }
    }

    /// Shifts the history by one frame and appends the output of the current frame along with
    /// the windowed part of the transform output that overlaps into the next frame
    pub fn update(&mut self, info: &IcsInfo, overlap: &OverlapState, output: &[Scaler]) {
        let tables = window_tables();
        let kbd = info.window_shape[0].is_kbd();
        let lwin = tables.window(kbd, 1024);
        let swin = tables.window(kbd, 128);
        let buf = overlap.imdct_output();

        let mut saved_ltp = [0.0; FRAME_LEN];
        match info.window_sequence[0] {
            WindowSequence::EightShort | WindowSequence::LongStart => {
                if info.is_eight_short() {
                    saved_ltp[..512].copy_from_slice(&overlap.saved()[..512]);
                } else {
                    saved_ltp[..448].copy_from_slice(&buf[512..960]);
                }
                for i in 0..64 {
                    saved_ltp[448 + i] = buf[960 + i] * swin[127 - i];
                    saved_ltp[512 + i] = buf[1023 - i] * swin[63 - i];
                }
            }
            _ => {
                for i in 0..512 {
                    saved_ltp[i] = buf[512 + i] * lwin[1023 - i];
                    saved_ltp[512 + i] = buf[1023 - i] * lwin[511 - i];
                }
            }
        }

        self.state.copy_within(FRAME_LEN..2 * FRAME_LEN, 0);
        self.state[FRAME_LEN..2 * FRAME_LEN].copy_from_slice(&output[..FRAME_LEN]);
        self.state[2 * FRAME_LEN..].copy_from_slice(&saved_ltp);
    }
}

// applies the analysis window of the current sequence to the predicted time signal
fn window_prediction(info: &IcsInfo, pred_time: &mut [Scaler; 2 * FRAME_LEN]) {
    let tables = window_tables();
    let kbd = info.window_shape[0].is_kbd();
    let kbd_prev = info.window_shape[1].is_kbd();
    let lwin = tables.window(kbd, 1024);
    let swin = tables.window(kbd, 128);
    let lwin_prev = tables.window(kbd_prev, 1024);
    let swin_prev = tables.window(kbd_prev, 128);

    let (first, second) = pred_time.split_at_mut(FRAME_LEN);
    if info.window_sequence[0] == WindowSequence::LongStop {
        first[..448].fill(0.0);
        for (x, w) in first[448..576].iter_mut().zip(swin_prev) {
            *x *= w;
        }
    } else {
        for (x, w) in first.iter_mut().zip(lwin_prev) {
            *x *= w;
        }
    }

    if info.window_sequence[0] == WindowSequence::LongStart {
        for (x, w) in second[448..576].iter_mut().zip(swin.iter().rev()) {
            *x *= w;
        }
        second[576..].fill(0.0);
    } else {
        for (x, w) in second.iter_mut().zip(lwin.iter().rev()) {
            *x *= w;
        }
    }
}
