/// Sampling frequencies addressable through the 4 bit sampling frequency index
pub const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingFrequency {
    /// Sampling frequency index used to select band tables (e.g. 3)
    pub index: usize,

    /// Sampling frequency in hz (e.g. 48000)
    pub hz: u32,
}

impl SamplingFrequency {
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < SAMPLE_RATES.len() {
            Some(Self {
                index,
                hz: SAMPLE_RATES[index],
            })
        } else {
            None
        }
    }

    /// Maps an explicitly coded sampling rate onto the nearest table index
    pub const fn from_hz(hz: u32) -> Self {
        let index = match hz {
            92017.. => 0,
            75132.. => 1,
            55426.. => 2,
            46009.. => 3,
            37566.. => 4,
            27713.. => 5,
            23004.. => 6,
            18783.. => 7,
            13856.. => 8,
            11502.. => 9,
            9391.. => 10,
            _ => 11,
        };

        Self { index, hz }
    }

    /// Index into the band tables (7350 hz shares the 8000 hz tables)
    pub const fn table_index(&self) -> usize {
        if self.index > 11 {
            11
        } else {
            self.index
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioObjectType {
    Main,
    LowComplexity,
    ScalableSampleRate,
    LongTermPrediction,
    SpectralBandReplication,
    ErLowComplexity,
    ErLongTermPrediction,
    ErLowDelay,
    ErEnhancedLowDelay,
    ParametricStereo,
    Other(u8),
}

impl AudioObjectType {
    pub const fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Main,
            2 => Self::LowComplexity,
            3 => Self::ScalableSampleRate,
            4 => Self::LongTermPrediction,
            5 => Self::SpectralBandReplication,
            17 => Self::ErLowComplexity,
            19 => Self::ErLongTermPrediction,
            23 => Self::ErLowDelay,
            29 => Self::ParametricStereo,
            39 => Self::ErEnhancedLowDelay,
            x => Self::Other(x),
        }
    }

    pub const fn id(&self) -> u8 {
        match self {
            Self::Main => 1,
            Self::LowComplexity => 2,
            Self::ScalableSampleRate => 3,
            Self::LongTermPrediction => 4,
            Self::SpectralBandReplication => 5,
            Self::ErLowComplexity => 17,
            Self::ErLongTermPrediction => 19,
            Self::ErLowDelay => 23,
            Self::ParametricStereo => 29,
            Self::ErEnhancedLowDelay => 39,
            Self::Other(x) => *x,
        }
    }

    pub const fn is_error_resilient(&self) -> bool {
        matches!(
            self,
            Self::ErLowComplexity | Self::ErLongTermPrediction | Self::ErLowDelay | Self::ErEnhancedLowDelay
        )
    }

    pub const fn uses_long_term_prediction(&self) -> bool {
        matches!(self, Self::LongTermPrediction | Self::ErLongTermPrediction)
    }
}

/// Number of spectral lines per frame and channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    /// 1024 lines (8 x 128 for short windows)
    Standard1024,
    /// 960 lines (8 x 120 for short windows)
    Standard960,
    /// 512 lines, low delay (long windows only)
    LowDelay512,
    /// 480 lines, low delay (long windows only)
    LowDelay480,
}

impl FrameLength {
    pub const fn new(object_type: AudioObjectType, frame_length_short: bool) -> Self {
        match (object_type, frame_length_short) {
            (AudioObjectType::ErLowDelay, false) => Self::LowDelay512,
            (AudioObjectType::ErLowDelay, true) => Self::LowDelay480,
            (_, false) => Self::Standard1024,
            (_, true) => Self::Standard960,
        }
    }

    /// Number of output samples per channel (e.g. 1024)
    pub const fn samples(&self) -> usize {
        match self {
            Self::Standard1024 => 1024,
            Self::Standard960 => 960,
            Self::LowDelay512 => 512,
            Self::LowDelay480 => 480,
        }
    }

    /// Number of spectral lines in one of the eight short windows (e.g. 128)
    pub const fn short_window_len(&self) -> usize {
        match self {
            Self::Standard1024 => 128,
            Self::Standard960 => 120,
            Self::LowDelay512 => 64,
            Self::LowDelay480 => 60,
        }
    }

    pub const fn is_low_delay(&self) -> bool {
        matches!(self, Self::LowDelay512 | Self::LowDelay480)
    }
}

/// Stream wide parameters every stage of the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub object_type: AudioObjectType,
    pub freq: SamplingFrequency,
    pub frame_length: FrameLength,
}

impl StreamParams {
    pub const fn new(object_type: AudioObjectType, freq: SamplingFrequency, frame_length_short: bool) -> Self {
        Self {
            object_type,
            freq,
            frame_length: FrameLength::new(object_type, frame_length_short),
        }
    }
}

/// Output channel ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Channels ordered by position class: front, side, back then low frequency effects
    Canonical,
    /// Channels ordered as the elements appear in the bitstream
    AsCoded,
}

/// Channel selection for a stereo pair carried as two independent single channel elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualMonoMode {
    Auto,
    /// Output the first (main) channel on both outputs
    Left,
    /// Output the second (sub) channel on both outputs
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Repair borderline streams (clamp, remap known encoder quirks)
    Normal,
    /// Reject borderline streams and disable compatibility defaults
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    pub channel_order: ChannelOrder,
    pub dual_mono: DualMonoMode,
    pub strictness: Strictness,
}

impl DecoderOptions {
    pub const fn new(channel_order: ChannelOrder, dual_mono: DualMonoMode, strictness: Strictness) -> Self {
        Self {
            channel_order,
            dual_mono,
            strictness,
        }
    }

    pub const fn is_strict(&self) -> bool {
        matches!(self.strictness, Strictness::Strict)
    }
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new(ChannelOrder::Canonical, DualMonoMode::Auto, Strictness::Normal)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    #[test]
    fn sampling_frequency_from_index() {
        let freq = SamplingFrequency::from_index(3).unwrap();
        assert_eq!(freq.hz, 48000);
        assert_eq!(freq.table_index(), 3);

        let freq = SamplingFrequency::from_index(12).unwrap();
        assert_eq!(freq.hz, 7350);
        assert_eq!(freq.table_index(), 11);

        assert!(SamplingFrequency::from_index(13).is_none());
    }

    #[test]
    fn explicit_rate_maps_to_nearest_index() {
        assert_eq!(SamplingFrequency::from_hz(48000).index, 3);
        assert_eq!(SamplingFrequency::from_hz(44100).index, 4);
        assert_eq!(SamplingFrequency::from_hz(47000).index, 3);
        assert_eq!(SamplingFrequency::from_hz(100).index, 11);
        assert_eq!(SamplingFrequency::from_hz(192000).index, 0);
    }

    #[test]
    fn frame_length_from_object_type() {
        let frame = FrameLength::new(AudioObjectType::LowComplexity, false);
        assert_eq!(frame.samples(), 1024);
        assert_eq!(frame.short_window_len(), 128);

        let frame = FrameLength::new(AudioObjectType::LowComplexity, true);
        assert_eq!(frame.samples(), 960);
        assert_eq!(frame.short_window_len(), 120);

        let frame = FrameLength::new(AudioObjectType::ErLowDelay, true);
        assert_eq!(frame.samples(), 480);
        assert!(frame.is_low_delay());
    }

    #[test]
    fn object_type_ids_round_trip() {
        for id in [1, 2, 4, 17, 23, 42] {
            assert_eq!(AudioObjectType::from_id(id).id(), id);
        }
        assert!(AudioObjectType::ErLowDelay.is_error_resilient());
        assert!(AudioObjectType::LongTermPrediction.uses_long_term_prediction());
    }

    #[test]
    fn default_options() {
        let options = DecoderOptions::default();
        assert_eq!(options.channel_order, ChannelOrder::Canonical);
        assert_eq!(options.dual_mono, DualMonoMode::Auto);
        assert!(!options.is_strict());
    }
}
