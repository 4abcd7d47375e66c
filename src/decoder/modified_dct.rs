//! Inverse and forward modified discrete cosine transform.
//!
//! Both directions are computed through a DCT-IV of the same length, which in turn runs on a
//! complex FFT of half the length. The FFT is a mixed radix (4, 2, 3, 5) decimation in time
//! transform so that the 960 and 480 line variants share the code path with the power of two
//! lengths.

use std::sync::OnceLock;

use crate::common::complex::{Complex, Scaler};

// transform lengths (spectral lines) supported by the decoder
const TRANSFORM_LENGTHS: [usize; 6] = [1024, 960, 512, 480, 128, 120];

// largest complex FFT used (half the longest transform)
const MAX_FFT_LEN: usize = 512;

const RADICES: [usize; 4] = [4, 2, 3, 5];
const MAX_RADIX: usize = 5;

struct Fft {
    len: usize,
    factors: heapless::Vec<usize, 16>,

    // exp(-2 pi i k / len)
    twiddles: Vec<Complex>,
}

impl Fft {
    fn new(len: usize) -> Self {
        let mut factors = heapless::Vec::new();
        let mut remaining = len;
        for radix in RADICES {
            while remaining % radix == 0 && remaining > 1 {
                // at most 16 factors for lengths up to 2^16
                let _ = factors.push(radix);
                remaining /= radix;
            }
        }
        debug_assert_eq!(remaining, 1, "unsupported FFT length {}", len);

        let twiddles = (0..len)
            .map(|k| Complex::expi(-2.0 * core::f64::consts::PI * k as f64 / len as f64))
            .collect();

        Self { len, factors, twiddles }
    }

    fn transform(&self, input: &[Complex], output: &mut [Complex]) {
        self.work(output, input, 1, &self.factors, 1);
    }

    // out = FFT of input[0], input[stride], input[2 * stride] ... (out.len() points)
    fn work(&self, out: &mut [Complex], input: &[Complex], stride: usize, factors: &[usize], tw_stride: usize) {
        let n = out.len();
        let (p, rest) = match factors.split_first() {
            Some((p, rest)) => (*p, rest),
            None => {
                out[0] = input[0];
                return;
            }
        };
        let m = n / p;

        for (q, chunk) in out.chunks_mut(m).enumerate() {
            self.work(chunk, &input[q * stride..], stride * p, rest, tw_stride * p);
        }

        let mut scratch = [Complex::default(); MAX_RADIX];
        for k in 0..m {
            for (q, value) in scratch.iter_mut().enumerate().take(p) {
                *value = out[q * m + k] * self.twiddles[q * k * tw_stride];
            }
            for u in 0..p {
                let mut sum = scratch[0];
                for (q, value) in scratch.iter().enumerate().take(p).skip(1) {
                    sum += *value * self.twiddles[(q * u * m * tw_stride) % self.len];
                }
                out[u * m + k] = sum;
            }
        }
    }
}

/// Modified discrete cosine transform of one length (`len` spectral lines, `2 * len` samples)
pub struct ModDiscreteCosTrans {
    len: usize,
    fft: Fft,

    // exp(-i pi k / len)
    pre_twiddle: Vec<Complex>,

    // exp(-i pi (k + 1/4) / len)
    post_twiddle: Vec<Complex>,
}

impl ModDiscreteCosTrans {
    fn new(len: usize) -> Self {
        let half = len / 2;
        let pi = core::f64::consts::PI;
        Self {
            len,
            fft: Fft::new(half),
            pre_twiddle: (0..half).map(|k| Complex::expi(-pi * k as f64 / len as f64)).collect(),
            post_twiddle: (0..half)
                .map(|k| Complex::expi(-pi * (k as f64 + 0.25) / len as f64))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    // DCT-IV: out[n] = sum(x[k] cos(pi / N (n + 1/2) (k + 1/2))), returned as complex pairs
    // where pair p holds (out[2p], -out[N - 1 - 2p])
    fn dct4(&self, input: &[Scaler], pairs: &mut [Complex]) {
        let n = self.len;
        let half = n / 2;

        let mut folded = [Complex::default(); MAX_FFT_LEN];
        for (k, (value, twiddle)) in folded.iter_mut().zip(&self.pre_twiddle).enumerate() {
            *value = Complex::new(input[2 * k], input[n - 1 - 2 * k]) * *twiddle;
        }

        self.fft.transform(&folded[..half], &mut pairs[..half]);
        for (value, twiddle) in pairs.iter_mut().zip(&self.post_twiddle) {
            *value = *value * *twiddle;
        }
    }

    /// Inverse transform returning the middle half of the `2 * len` output samples,
    /// y[n] = 1/N sum(X[k] cos(pi / N (n + 1/2 + N/2) (k + 1/2))) for n in N/2..3N/2.
    /// The outer quarters follow by symmetry and are reconstructed by the windowing stage.
    ///
    /// # Arguments
    ///
    /// * `spec_lines` - Input spectral lines (`len` values)
    /// * `output` - Output samples (`len` values)
    pub fn imdct_half(&self, spec_lines: &[Scaler], output: &mut [Scaler]) {
        let n = self.len;
        let scale = 1.0 / n as Scaler;

        let mut pairs = [Complex::default(); MAX_FFT_LEN];
        self.dct4(spec_lines, &mut pairs);

        for (p, value) in pairs[..n / 2].iter().enumerate() {
            output[2 * p] = value.i * scale;
            output[n - 1 - 2 * p] = -value.r * scale;
        }
    }

    /// Forward transform of `2 * len` windowed samples into `len` spectral lines,
    /// X[k] = 2 sum(x[n] cos(pi / N (n + 1/2 + N/2) (k + 1/2))). This is the exact inverse of
    /// `imdct_half` followed by windowed overlap-add.
    pub fn mdct(&self, samples: &[Scaler], spec_lines: &mut [Scaler]) {
        let n = self.len;
        let half = n / 2;

        // fold the 2N input onto the N point DCT-IV input
        let mut folded = [0.0; 2 * MAX_FFT_LEN];
        for (m, value) in folded[..n].iter_mut().enumerate() {
            *value = -samples[3 * half - 1 - m];
            if m < half {
                *value -= samples[m + 3 * half];
            } else {
                *value += samples[m - half];
            }
        }

        let mut pairs = [Complex::default(); MAX_FFT_LEN];
        self.dct4(&folded[..n], &mut pairs);

        for (p, value) in pairs[..half].iter().enumerate() {
            spec_lines[2 * p] = 2.0 * value.r;
            spec_lines[n - 1 - 2 * p] = -2.0 * value.i;
        }
    }
}

pub struct Transforms {
    transforms: [ModDiscreteCosTrans; 6],
}

impl Transforms {
    /// Transform for `len` spectral lines (`len` must be one of the supported lengths)
    pub fn get(&self, len: usize) -> &ModDiscreteCosTrans {
        let index = TRANSFORM_LENGTHS.iter().position(|x| *x == len).unwrap_or(0);
        &self.transforms[index]
    }
}

/// Returns the process wide transform tables, building them on first use
pub fn transforms() -> &'static Transforms {
    static TRANSFORMS: OnceLock<Transforms> = OnceLock::new();
    TRANSFORMS.get_or_init(|| Transforms {
        transforms: TRANSFORM_LENGTHS.map(ModDiscreteCosTrans::new),
    })
}
