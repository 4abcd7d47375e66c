use itertools::izip;

use super::{
    ics_info::{IcsInfo, WindowSequence},
    modified_dct::transforms,
};
use crate::{
    common::{
        complex::Scaler,
        config::FrameLength,
        constants::{MAX_LEN_SPECTRAL, SHORT_WINDOW_STRIDE},
    },
    tables::windows::window_tables,
};

/// Inverse transform and overlap-add strategy, one per frame length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowingVariant {
    /// 1024 line long windows and 8 x 128 line short windows
    Standard1024,
    /// 960 line long windows and 8 x 120 line short windows
    Standard960,
    /// 512 line low delay windows with the low overlap variant of the sine window
    LowDelay512,
    LowDelay480,
}

impl WindowingVariant {
    pub const fn new(frame_length: FrameLength) -> Self {
        match frame_length {
            FrameLength::Standard1024 => Self::Standard1024,
            FrameLength::Standard960 => Self::Standard960,
            FrameLength::LowDelay512 => Self::LowDelay512,
            FrameLength::LowDelay480 => Self::LowDelay480,
        }
    }

    /// Number of output samples per frame
    pub const fn frame_len(&self) -> usize {
        match self {
            Self::Standard1024 => 1024,
            Self::Standard960 => 960,
            Self::LowDelay512 => 512,
            Self::LowDelay480 => 480,
        }
    }
}

/// Overlap-add state of one channel
#[derive(Debug, Clone)]
pub struct OverlapState {
    /// Second half of the previous frame's transform output, not yet windowed
    saved: Vec<Scaler>,

    /// Output of the most recent inverse transform (half of the 2N samples, see `imdct_half`)
    buf: Vec<Scaler>,
}

impl Default for OverlapState {
    fn default() -> Self {
        Self {
            saved: vec![0.0; MAX_LEN_SPECTRAL / 2],
            buf: vec![0.0; MAX_LEN_SPECTRAL],
        }
    }
}

impl OverlapState {
    pub fn saved(&self) -> &[Scaler] {
        &self.saved
    }

    pub fn imdct_output(&self) -> &[Scaler] {
        &self.buf
    }

    pub fn reset(&mut self) {
        self.saved.fill(0.0);
        self.buf.fill(0.0);
    }

    /// Runs the inverse transform of one frame and overlap-adds it with the previous frame
    ///
    /// # Arguments
    ///
    /// * `variant` - Frame length specific windowing
    /// * `info` - Current and previous window sequence and shape
    /// * `coefficients` - Spectral lines (short windows 128 lines apart)
    /// * `output` - Output samples, one frame
    pub fn imdct_and_window(
        &mut self,
        variant: WindowingVariant,
        info: &IcsInfo,
        coefficients: &[Scaler],
        output: &mut [Scaler],
    ) {
        match variant {
            WindowingVariant::Standard1024 => self.long_and_short(1024, 128, info, coefficients, output),
            WindowingVariant::Standard960 => self.long_and_short(960, 120, info, coefficients, output),
            WindowingVariant::LowDelay512 => self.low_delay(512, info, coefficients, output),
            WindowingVariant::LowDelay480 => self.low_delay(480, info, coefficients, output),
        }
    }

    // n: long window length, s: short window length
    fn long_and_short(&mut self, n: usize, s: usize, info: &IcsInfo, coefficients: &[Scaler], output: &mut [Scaler]) {
        let tables = window_tables();
        let kbd = info.window_shape[0].is_kbd();
        let kbd_prev = info.window_shape[1].is_kbd();
        let swin = tables.window(kbd, s);
        let swin_prev = tables.window(kbd_prev, s);
        let lwin_prev = tables.window(kbd_prev, n);

        let half = n / 2;
        let short_half = s / 2;
        // start of the first short window within the frame
        let flat = half - short_half;

        let sequence = info.window_sequence[0];
        let previous = info.window_sequence[1];
        let buf = &mut self.buf[..n];
        let saved = &mut self.saved[..half];

        if sequence == WindowSequence::EightShort {
            let transform = transforms().get(s);
            for w in 0..8 {
                let input = &coefficients[w * SHORT_WINDOW_STRIDE..w * SHORT_WINDOW_STRIDE + s];
                transform.imdct_half(input, &mut buf[w * s..(w + 1) * s]);
            }
        } else {
            transforms().get(n).imdct_half(&coefficients[..n], buf);
        }

        // every transition that involves a short window overlaps over the short window length
        let mut temp = [0.0; 128];
        if previous.ends_long() && matches!(sequence, WindowSequence::OnlyLong | WindowSequence::LongStart) {
            overlap_window(&mut output[..n], saved, buf, lwin_prev);
        } else {
            output[..flat].copy_from_slice(&saved[..flat]);

            if sequence == WindowSequence::EightShort {
                overlap_window(&mut output[flat..flat + s], &saved[flat..], buf, swin_prev);
                for w in 1..4 {
                    let (previous_window, current_window) = buf.split_at(w * s);
                    overlap_window(
                        &mut output[flat + w * s..flat + (w + 1) * s],
                        &previous_window[(w - 1) * s + short_half..],
                        current_window,
                        swin,
                    );
                }
                let (previous_window, current_window) = buf.split_at(4 * s);
                overlap_window(&mut temp[..s], &previous_window[3 * s + short_half..], current_window, swin);
                output[flat + 4 * s..n].copy_from_slice(&temp[..short_half]);
            } else {
                overlap_window(&mut output[flat..flat + s], &saved[flat..], buf, swin_prev);
                output[flat + s..n].copy_from_slice(&buf[short_half..half]);
            }
        }

        // keep the second half for the next frame
        match sequence {
            WindowSequence::EightShort => {
                saved[..short_half].copy_from_slice(&temp[short_half..s]);
                for w in 5..8 {
                    let start = short_half + (w - 5) * s;
                    let (previous_window, current_window) = buf.split_at(w * s);
                    overlap_window(
                        &mut saved[start..start + s],
                        &previous_window[(w - 1) * s + short_half..],
                        current_window,
                        swin,
                    );
                }
                saved[flat..].copy_from_slice(&buf[7 * s + short_half..n]);
            }
            WindowSequence::LongStart => {
                saved[..flat].copy_from_slice(&buf[half..half + flat]);
                saved[flat..].copy_from_slice(&buf[7 * s + short_half..n]);
            }
            _ => saved.copy_from_slice(&buf[half..n]),
        }
    }

    fn low_delay(&mut self, n: usize, info: &IcsInfo, coefficients: &[Scaler], output: &mut [Scaler]) {
        let tables = window_tables();
        let half = n / 2;
        let buf = &mut self.buf[..n];
        let saved = &mut self.saved[..half];

        transforms().get(n).imdct_half(&coefficients[..n], buf);

        if info.window_shape[1].is_kbd() {
            // the shape bit selects the low overlap window in low delay streams
            let quarter = n / 4;
            let eighth = n / 8;
            let flat = 3 * eighth;
            output[..flat].copy_from_slice(&saved[..flat]);
            overlap_window(
                &mut output[flat..flat + quarter],
                &saved[flat..],
                buf,
                tables.window(false, quarter),
            );
            output[flat + quarter..n].copy_from_slice(&buf[eighth..half]);
        } else {
            overlap_window(&mut output[..n], saved, buf, tables.window(false, n));
        }

        saved.copy_from_slice(&buf[half..n]);
    }
}

/// Windowed overlap of the saved tail of the previous block with the head of the current
/// block. `output` and `window` hold `2 * len` values, `previous` and `current` at least `len`.
/// The current block is read backwards: its first quarter is the negated mirror image of the
/// stored half transform.
fn overlap_window(output: &mut [Scaler], previous: &[Scaler], current: &[Scaler], window: &[Scaler]) {
    let len = window.len() / 2;
    let (head, tail) = output[..2 * len].split_at_mut(len);
    let (rising, falling) = window.split_at(len);

    for (k, (out, prev, w)) in izip!(head.iter_mut(), &previous[..len], rising).enumerate() {
        let j = len - 1 - k;
        let cur = current[j];
        let wj = falling[j];
        *out = prev * wj - cur * w;
        tail[j] = prev * w + cur * wj;
    }
}
