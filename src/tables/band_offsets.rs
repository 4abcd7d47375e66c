//! Scalefactor band boundaries, TNS and predictor band limits per sampling frequency index.

use heapless::Vec;

use crate::common::config::{FrameLength, SamplingFrequency};

/// Spectral line offsets of the scalefactor bands (num bands + 1 entries)
pub type BandOffsets = Vec<u16, 64>;

#[rustfmt::skip]
const SWB_OFFSET_1024_96: [u16; 42] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 96, 108, 120, 132,
    144, 156, 172, 188, 212, 240, 276, 320, 384, 448, 512, 576, 640, 704, 768, 832, 896, 960, 1024,
];

#[rustfmt::skip]
const SWB_OFFSET_1024_64: [u16; 48] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 100, 112, 124, 140,
    156, 172, 192, 216, 240, 268, 304, 344, 384, 424, 464, 504, 544, 584, 624, 664, 704, 744, 784,
    824, 864, 904, 944, 984, 1024,
];

#[rustfmt::skip]
const SWB_OFFSET_1024_48: [u16; 50] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 48, 56, 64, 72, 80, 88, 96, 108, 120, 132, 144, 160,
    176, 196, 216, 240, 264, 292, 320, 352, 384, 416, 448, 480, 512, 544, 576, 608, 640, 672, 704,
    736, 768, 800, 832, 864, 896, 928, 1024,
];

#[rustfmt::skip]
const SWB_OFFSET_1024_32: [u16; 52] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 48, 56, 64, 72, 80, 88, 96, 108, 120, 132, 144, 160,
    176, 196, 216, 240, 264, 292, 320, 352, 384, 416, 448, 480, 512, 544, 576, 608, 640, 672, 704,
    736, 768, 800, 832, 864, 896, 928, 960, 992, 1024,
];

#[rustfmt::skip]
const SWB_OFFSET_1024_24: [u16; 48] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 52, 60, 68, 76, 84, 92, 100, 108, 116, 124, 136,
    148, 160, 172, 188, 204, 220, 240, 260, 284, 308, 336, 364, 396, 432, 468, 508, 552, 600, 652,
    704, 768, 832, 896, 960, 1024,
];

#[rustfmt::skip]
const SWB_OFFSET_1024_16: [u16; 44] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 100, 112, 124, 136, 148, 160, 172, 184, 196, 212,
    228, 244, 260, 280, 300, 320, 344, 368, 396, 424, 456, 492, 532, 572, 616, 664, 716, 772, 832,
    896, 960, 1024,
];

#[rustfmt::skip]
const SWB_OFFSET_1024_8: [u16; 41] = [
    0, 12, 24, 36, 48, 60, 72, 84, 96, 108, 120, 132, 144, 156, 172, 188, 204, 220, 236, 252, 268,
    288, 308, 328, 348, 372, 396, 420, 448, 476, 508, 544, 580, 620, 664, 712, 764, 820, 880, 944,
    1024,
];

const SWB_OFFSET_128_96: [u16; 13] = [0, 4, 8, 12, 16, 20, 24, 32, 40, 48, 64, 92, 128];
const SWB_OFFSET_128_48: [u16; 15] = [0, 4, 8, 12, 16, 20, 28, 36, 44, 56, 68, 80, 96, 112, 128];
const SWB_OFFSET_128_24: [u16; 16] = [0, 4, 8, 12, 16, 20, 24, 28, 36, 44, 52, 64, 76, 92, 108, 128];
const SWB_OFFSET_128_16: [u16; 16] = [0, 4, 8, 12, 16, 20, 24, 28, 32, 40, 48, 60, 72, 88, 108, 128];
const SWB_OFFSET_128_8: [u16; 16] = [0, 4, 8, 12, 16, 20, 24, 28, 36, 44, 52, 60, 72, 88, 108, 128];

#[rustfmt::skip]
const SWB_OFFSET_512_48: [u16; 37] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 60, 68, 76, 84, 92, 100, 112, 124,
    136, 148, 164, 184, 208, 236, 268, 300, 332, 364, 396, 428, 460, 512,
];

#[rustfmt::skip]
const SWB_OFFSET_480_48: [u16; 36] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 96, 108, 120, 132,
    144, 156, 172, 188, 212, 240, 272, 304, 336, 368, 400, 432, 480,
];

const SWB_OFFSET_1024: [&[u16]; 12] = [
    &SWB_OFFSET_1024_96,
    &SWB_OFFSET_1024_96,
    &SWB_OFFSET_1024_64,
    &SWB_OFFSET_1024_48,
    &SWB_OFFSET_1024_48,
    &SWB_OFFSET_1024_32,
    &SWB_OFFSET_1024_24,
    &SWB_OFFSET_1024_24,
    &SWB_OFFSET_1024_16,
    &SWB_OFFSET_1024_16,
    &SWB_OFFSET_1024_16,
    &SWB_OFFSET_1024_8,
];

const SWB_OFFSET_128: [&[u16]; 12] = [
    &SWB_OFFSET_128_96,
    &SWB_OFFSET_128_96,
    &SWB_OFFSET_128_96,
    &SWB_OFFSET_128_48,
    &SWB_OFFSET_128_48,
    &SWB_OFFSET_128_48,
    &SWB_OFFSET_128_24,
    &SWB_OFFSET_128_24,
    &SWB_OFFSET_128_16,
    &SWB_OFFSET_128_16,
    &SWB_OFFSET_128_16,
    &SWB_OFFSET_128_8,
];

// number of bands used by the 960 / 120 line variants (the band edges are shared with the
// 1024 / 128 tables, the last band ends at the shorter frame length)
const NUM_SWB_960: [usize; 12] = [40, 40, 46, 49, 49, 49, 46, 46, 42, 42, 42, 40];
const NUM_SWB_120: [usize; 12] = [12, 12, 12, 14, 14, 14, 15, 15, 15, 15, 15, 15];

const TNS_MAX_BANDS_1024: [usize; 12] = [31, 31, 34, 40, 42, 51, 46, 46, 42, 42, 42, 39];
const TNS_MAX_BANDS_128: [usize; 12] = [9, 9, 10, 14, 14, 14, 14, 14, 14, 14, 14, 14];
const TNS_MAX_BANDS_512: [usize; 12] = [0, 0, 0, 31, 32, 37, 31, 31, 0, 0, 0, 0];
const TNS_MAX_BANDS_480: [usize; 12] = [0, 0, 0, 31, 32, 37, 30, 30, 0, 0, 0, 0];

// highest band covered by the main profile backward adaptive predictor
const PRED_SFB_MAX: [usize; 12] = [33, 33, 38, 40, 40, 40, 41, 41, 37, 37, 37, 34];

/// Looks up the scalefactor band offsets for a frame layout
///
/// # Arguments
///
/// * `frame_length` - Number of spectral lines per frame
/// * `freq` - Sampling frequency (selects the table)
/// * `short_windows` - true for the offsets within one of the eight short windows
///
/// Returns None when the combination has no band table (low delay below 44.1 khz)
pub fn band_offsets(frame_length: FrameLength, freq: SamplingFrequency, short_windows: bool) -> Option<BandOffsets> {
    let index = freq.table_index();

    let (table, num_bands, end): (&[u16], usize, u16) = match (frame_length, short_windows) {
        (FrameLength::Standard1024, false) => (SWB_OFFSET_1024[index], SWB_OFFSET_1024[index].len() - 1, 1024),
        (FrameLength::Standard1024, true) => (SWB_OFFSET_128[index], SWB_OFFSET_128[index].len() - 1, 128),
        (FrameLength::Standard960, false) => (SWB_OFFSET_1024[index], NUM_SWB_960[index], 960),
        (FrameLength::Standard960, true) => (SWB_OFFSET_128[index], NUM_SWB_120[index], 120),
        (FrameLength::LowDelay512, false) if index == 3 || index == 4 => (&SWB_OFFSET_512_48[..], 36, 512),
        (FrameLength::LowDelay480, false) if index == 3 || index == 4 => (&SWB_OFFSET_480_48[..], 35, 480),
        _ => return None,
    };

    let mut offsets = BandOffsets::new();
    for offset in &table[..num_bands] {
        offsets.push(*offset).ok()?;
    }
    offsets.push(end).ok()?;
    Some(offsets)
}

/// Highest band (exclusive) that temporal noise shaping may filter
pub fn tns_max_bands(frame_length: FrameLength, freq: SamplingFrequency, short_windows: bool) -> usize {
    let index = freq.table_index();
    match (frame_length, short_windows) {
        (FrameLength::LowDelay512, _) => TNS_MAX_BANDS_512[index],
        (FrameLength::LowDelay480, _) => TNS_MAX_BANDS_480[index],
        (_, false) => TNS_MAX_BANDS_1024[index],
        (_, true) => TNS_MAX_BANDS_128[index],
    }
}

/// Highest band (exclusive) covered by the main profile predictor
pub fn predictor_max_bands(freq: SamplingFrequency) -> usize {
    PRED_SFB_MAX[freq.table_index()]
}
