//! Sine and Kaiser-Bessel derived windows for every transform length.
//!
//! Each table holds the rising half of a window: `n` coefficients for a transform with `n`
//! spectral lines (and `2n` time samples). The falling half is the mirror image.

use std::sync::OnceLock;

// window lengths used by the inverse transform (long, short and low overlap variants)
const WINDOW_LENGTHS: [usize; 6] = [1024, 960, 512, 480, 128, 120];

// Kaiser window alpha for long and short windows
const KBD_ALPHA_LONG: f64 = 4.0;
const KBD_ALPHA_SHORT: f64 = 6.0;

pub struct WindowTables {
    sine: [Vec<f32>; 6],
    kbd: [Vec<f32>; 6],
}

impl WindowTables {
    fn build() -> Self {
        let sine = WINDOW_LENGTHS.map(sine_window);
        let kbd = WINDOW_LENGTHS.map(|n| {
            let alpha = if n > 128 { KBD_ALPHA_LONG } else { KBD_ALPHA_SHORT };
            kbd_window(n, alpha)
        });

        Self { sine, kbd }
    }

    /// Rising half of a window with `len` coefficients (`len` must be a supported transform length)
    pub fn window(&self, kbd: bool, len: usize) -> &[f32] {
        let index = WINDOW_LENGTHS.iter().position(|x| *x == len).unwrap_or(0);
        if kbd {
            &self.kbd[index]
        } else {
            &self.sine[index]
        }
    }
}

/// Returns the process wide window tables, building them on first use
pub fn window_tables() -> &'static WindowTables {
    static WINDOWS: OnceLock<WindowTables> = OnceLock::new();
    WINDOWS.get_or_init(WindowTables::build)
}

fn sine_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| ((i as f64 + 0.5) * core::f64::consts::PI / (2.0 * n as f64)).sin() as f32)
        .collect()
}

fn kbd_window(n: usize, alpha: f64) -> Vec<f32> {
    let alpha2 = 4.0 * (alpha * core::f64::consts::PI / n as f64).powi(2);

    let mut sum = 0.0;
    let mut cumulative = Vec::with_capacity(n);
    for i in 0..n {
        let tmp = (i * (n - i)) as f64 * alpha2;
        sum += bessel_i0(tmp.sqrt());
        cumulative.push(sum);
    }
    sum += 1.0;

    cumulative.iter().map(|x| (x / sum).sqrt() as f32).collect()
}

// zeroth order modified bessel function of the first kind
fn bessel_i0(x: f64) -> f64 {
    let half_sq = x * x * 0.25;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    while term > 1e-12 * sum && k < 100.0 {
        term *= half_sq / (k * k);
        sum += term;
        k += 1.0;
    }
    sum
}
