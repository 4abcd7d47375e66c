use heapless::Vec;

use super::{
    bit_reader::{BitReader, BitReaderError},
    error::ErrorKind,
    ics_info::IcsInfo,
};
use crate::common::{
    complex::Scaler,
    config::AudioObjectType,
    constants::{MAX_WINDOWS, SHORT_WINDOW_STRIDE},
};

// filter order limits for short windows, main profile and every other profile
const MAX_ORDER_SHORT: usize = 7;
const MAX_ORDER_MAIN: usize = 20;
const MAX_ORDER_LONG: usize = 12;

const MAX_FILTERS: usize = 4;

#[derive(Debug)]
pub enum TnsError {
    OrderTooLarge { order: usize, max_order: usize },
    BitReader(BitReaderError),
}

impl TnsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderTooLarge { .. } => ErrorKind::InvalidSyntax,
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for TnsError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TnsFilter {
    /// Number of bands covered, counted down from the top of the previous filter
    pub length: usize,
    pub order: usize,

    /// true when the filter runs from high to low frequencies
    pub descending: bool,

    /// Direct form filter coefficients
    pub lpc: [Scaler; MAX_ORDER_MAIN],
}

/// Temporal noise shaping filters of one channel
#[derive(Debug, Clone, Default)]
pub struct TnsData {
    pub present: bool,
    pub filters: [Vec<TnsFilter, MAX_FILTERS>; MAX_WINDOWS],
}

impl TnsData {
    pub fn read(reader: &mut BitReader, info: &IcsInfo, object_type: AudioObjectType) -> Result<Self, TnsError> {
        let short = info.is_eight_short();
        let max_order = if short {
            MAX_ORDER_SHORT
        } else if object_type == AudioObjectType::Main {
            MAX_ORDER_MAIN
        } else {
            MAX_ORDER_LONG
        };
        let (filters_bits, length_bits, order_bits) = if short { (1, 4, 3) } else { (2, 6, 5) };

        let mut tns = Self {
            present: true,
            ..Default::default()
        };

        for filters in tns.filters.iter_mut().take(info.num_windows) {
            let num_filters = reader.read_usize(filters_bits)?;
            if num_filters == 0 {
                continue;
            }

            let coef_res = reader.read_bool()?;
            for _ in 0..num_filters {
                let mut filter = TnsFilter {
                    length: reader.read_usize(length_bits)?,
                    order: reader.read_usize(order_bits)?,
                    ..Default::default()
                };
                if filter.order > max_order {
                    return Err(TnsError::OrderTooLarge {
                        order: filter.order,
                        max_order,
                    });
                }

                if filter.order > 0 {
                    filter.descending = reader.read_bool()?;
                    let compress = reader.read_bool()?;
                    let coef_bits = 3 + coef_res as usize - compress as usize;

                    let mut reflection = [0.0; MAX_ORDER_MAIN];
                    for coef in reflection.iter_mut().take(filter.order) {
                        let value = reader.read(coef_bits)?;
                        *coef = dequantize_coef(value, coef_bits, coef_res);
                    }
                    filter.lpc = reflection_to_lpc(&reflection[..filter.order]);
                }

                // num_filters never exceeds the capacity (2 bit field)
                let _ = filters.push(filter);
            }
        }

        Ok(tns)
    }

    /// Runs the filters over the spectrum. The decoder runs the all-pole (synthesis) filter,
    /// long term prediction runs the all-zero (analysis) filter over its predicted spectrum.
    pub fn apply(&self, coefficients: &mut [Scaler], info: &IcsInfo, synthesis: bool) {
        let top_band = info.tns_max_bands.min(info.max_sfb);
        if top_band == 0 {
            return;
        }

        for (w, filters) in self.filters.iter().enumerate().take(info.num_windows) {
            let mut bottom = info.num_swb;
            for filter in filters {
                let top = bottom;
                bottom = top.saturating_sub(filter.length);
                if filter.order == 0 {
                    continue;
                }

                let start = info.band_start(bottom.min(top_band));
                let end = info.band_start(top.min(top_band));
                if end <= start {
                    continue;
                }

                let window = &mut coefficients[w * SHORT_WINDOW_STRIDE..];
                let band = &mut window[start..end];
                if filter.descending {
                    band.reverse();
                }
                if synthesis {
                    all_pole_filter(band, &filter.lpc[..filter.order]);
                } else {
                    all_zero_filter(band, &filter.lpc[..filter.order]);
                }
                if filter.descending {
                    band.reverse();
                }
            }
        }
    }
}

// inverse quantization of a reflection coefficient: sin(c / iqfac)
fn dequantize_coef(value: u32, coef_bits: usize, coef_res: bool) -> Scaler {
    // sign extend
    let shift = 32 - coef_bits;
    let c = ((value << shift) as i32 >> shift) as f64;

    let half = if coef_res { 8.0 } else { 4.0 };
    let iqfac = (if c >= 0.0 { half - 0.5 } else { half + 0.5 }) / core::f64::consts::FRAC_PI_2;
    (c / iqfac).sin() as Scaler
}

// step-up recursion from reflection coefficients to direct form coefficients
fn reflection_to_lpc(reflection: &[Scaler]) -> [Scaler; MAX_ORDER_MAIN] {
    let mut lpc = [0.0; MAX_ORDER_MAIN];
    let mut previous = [0.0; MAX_ORDER_MAIN];

    for (m, k) in reflection.iter().enumerate() {
        previous[..m].copy_from_slice(&lpc[..m]);
        for i in 0..m {
            lpc[i] = previous[i] + k * previous[m - 1 - i];
        }
        lpc[m] = *k;
    }

    lpc
}

// y[n] = x[n] - sum(lpc[i] * y[n - 1 - i])
fn all_pole_filter(band: &mut [Scaler], lpc: &[Scaler]) {
    for n in 0..band.len() {
        let mut y = band[n];
        for (i, a) in lpc.iter().enumerate().take(n) {
            y -= band[n - 1 - i] * a;
        }
        band[n] = y;
    }
}

// y[n] = x[n] + sum(lpc[i] * x[n - 1 - i])
fn all_zero_filter(band: &mut [Scaler], lpc: &[Scaler]) {
    let mut history = [0.0; MAX_ORDER_MAIN];
    for value in band.iter_mut() {
        let x = *value;
        for (h, a) in history.iter().zip(lpc) {
            *value += h * a;
        }
        history.copy_within(0..MAX_ORDER_MAIN - 1, 1);
        history[0] = x;
    }
}
