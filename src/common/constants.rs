// max number of output channels
pub const MAX_CHANNELS: usize = 64;

// max element instance tag (4 bit field)
pub const MAX_ELEM_ID: usize = 16;

// max number of windows in an EIGHT_SHORT frame
pub const MAX_WINDOWS: usize = 8;

// max number of scalefactor bands over all window groups (8 windows x 16 bands)
pub const MAX_BANDS: usize = 128;

// max number of spectral lines per channel and frame
pub const MAX_LEN_SPECTRAL: usize = 1024;

// max number of long window bands that can use long term prediction
pub const MAX_LTP_LONG_SFB: usize = 40;

// max number of bands covered by the main profile predictor
pub const MAX_PREDICTOR_SFB: usize = 41;

// length of the long term prediction history (three frames)
pub const LTP_HISTORY_LEN: usize = 3 * MAX_LEN_SPECTRAL;

// seed of the noise substitution generator
pub const NOISE_SEED: u32 = 0x1f2e_3d4c;

// spectral lines reserved per short window in a coefficient buffer
pub const SHORT_WINDOW_STRIDE: usize = 128;

// max number of leading ones in the escape sequence of the escape codebook
pub const MAX_ESCAPE_PREFIX: usize = 8;
