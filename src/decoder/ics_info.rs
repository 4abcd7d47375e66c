use core::ops::Range;

use super::{
    bit_reader::{BitReader, BitReaderError},
    error::{Anomaly, ErrorKind, WarnOnce},
    long_term_prediction::LtpData,
    main_prediction::{PredictionData, PredictionError},
};
use crate::{
    common::{
        config::{AudioObjectType, FrameLength, StreamParams},
        constants::{MAX_WINDOWS, SHORT_WINDOW_STRIDE},
    },
    tables::band_offsets::{band_offsets, predictor_max_bands, tns_max_bands, BandOffsets},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowSequence {
    #[default]
    OnlyLong,
    LongStart,
    EightShort,
    LongStop,
}

impl WindowSequence {
    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::OnlyLong,
            1 => Self::LongStart,
            2 => Self::EightShort,
            _ => Self::LongStop,
        }
    }

    /// true if the second half of this frame overlaps with a long window
    pub fn ends_long(&self) -> bool {
        matches!(self, Self::OnlyLong | Self::LongStop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowShape {
    #[default]
    Sine,
    KaiserBessel,
}

impl WindowShape {
    pub fn is_kbd(&self) -> bool {
        matches!(self, Self::KaiserBessel)
    }
}

#[derive(Debug)]
pub enum IcsInfoError {
    ReservedBitSet,
    LowDelayRequiresLongWindow(WindowSequence),
    PredictionNotAllowed(AudioObjectType),
    LtpNotSupported(FrameLength),
    NoBandTable(FrameLength),
    MaxSfbTooLarge { max_sfb: usize, num_swb: usize },
    Prediction(PredictionError),
    BitReader(BitReaderError),
}

impl IcsInfoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LtpNotSupported(_) | Self::NoBandTable(_) => ErrorKind::MissingFeature,
            Self::Prediction(err) => err.kind(),
            Self::BitReader(err) => err.kind(),
            _ => ErrorKind::InvalidSyntax,
        }
    }
}

impl From<BitReaderError> for IcsInfoError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

impl From<PredictionError> for IcsInfoError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::BitReader(err) => Self::BitReader(err),
            err => Self::Prediction(err),
        }
    }
}

/// Window layout and prediction side info of one channel (shared by both channels of a pair
/// when they use a common window)
#[derive(Debug, Clone, Default)]
pub struct IcsInfo {
    /// Current and previous window sequence
    pub window_sequence: [WindowSequence; 2],

    /// Current and previous window shape
    pub window_shape: [WindowShape; 2],

    /// Number of coded scalefactor bands per group
    pub max_sfb: usize,
    pub num_windows: usize,
    pub num_window_groups: usize,

    /// Number of windows in each group
    pub group_len: [usize; MAX_WINDOWS],

    /// Band offsets within one window (long frame or one of the eight short windows)
    pub swb_offset: BandOffsets,
    pub num_swb: usize,
    pub tns_max_bands: usize,

    pub predictor_present: bool,
    pub prediction: PredictionData,
    pub ltp: LtpData,
}

impl IcsInfo {
    pub fn is_eight_short(&self) -> bool {
        self.window_sequence[0] == WindowSequence::EightShort
    }

    /// Spectral line where band `sfb` starts (`sfb == num_swb` gives the window length)
    pub fn band_start(&self, sfb: usize) -> usize {
        self.swb_offset.get(sfb).copied().unwrap_or(0) as usize
    }

    /// Calls `f` with the band index (counted group by group) and the spectral line range of
    /// every window of every coded band. Short windows are laid out 128 lines apart.
    pub fn for_each_band(&self, mut f: impl FnMut(usize, Range<usize>)) {
        let mut idx = 0;
        let mut window = 0;
        for &group_len in &self.group_len[..self.num_window_groups] {
            for sfb in 0..self.max_sfb {
                let band = self.band_start(sfb)..self.band_start(sfb + 1);
                for w in window..window + group_len {
                    let offset = w * SHORT_WINDOW_STRIDE;
                    f(idx, offset + band.start..offset + band.end);
                }
                idx += 1;
            }
            window += group_len;
        }
    }

    /// Reads the ics_info block. On failure `max_sfb` is zeroed so that a later frame never
    /// walks bands of a half parsed layout.
    pub fn read(
        &mut self,
        reader: &mut BitReader,
        params: &StreamParams,
        strict: bool,
        warnings: &mut WarnOnce,
    ) -> Result<(), IcsInfoError> {
        let result = self.read_fields(reader, params, strict, warnings);
        if result.is_err() {
            self.max_sfb = 0;
        }
        result
    }

    fn read_fields(
        &mut self,
        reader: &mut BitReader,
        params: &StreamParams,
        strict: bool,
        warnings: &mut WarnOnce,
    ) -> Result<(), IcsInfoError> {
        if reader.read_bool()? {
            if strict {
                return Err(IcsInfoError::ReservedBitSet);
            }
            warnings.report(Anomaly::ReservedBitSet);
        }

        self.window_sequence[1] = self.window_sequence[0];
        self.window_sequence[0] = WindowSequence::from_bits(reader.read(2)?);
        if params.frame_length.is_low_delay() && self.window_sequence[0] != WindowSequence::OnlyLong {
            let sequence = self.window_sequence[0];
            self.window_sequence[0] = WindowSequence::OnlyLong;
            return Err(IcsInfoError::LowDelayRequiresLongWindow(sequence));
        }

        self.window_shape[1] = self.window_shape[0];
        self.window_shape[0] = if reader.read_bool()? {
            WindowShape::KaiserBessel
        } else {
            WindowShape::Sine
        };

        self.num_window_groups = 1;
        self.group_len = [0; MAX_WINDOWS];
        self.group_len[0] = 1;
        self.predictor_present = false;
        self.prediction.reset_group = 0;
        self.ltp.present = false;

        let short_windows = self.is_eight_short();
        self.swb_offset = band_offsets(params.frame_length, params.freq, short_windows)
            .ok_or(IcsInfoError::NoBandTable(params.frame_length))?;
        self.num_swb = self.swb_offset.len() - 1;
        self.tns_max_bands = tns_max_bands(params.frame_length, params.freq, short_windows);

        if short_windows {
            self.max_sfb = reader.read_usize(4)?;
            for _ in 0..7 {
                if reader.read_bool()? {
                    self.group_len[self.num_window_groups - 1] += 1;
                } else {
                    self.num_window_groups += 1;
                    self.group_len[self.num_window_groups - 1] = 1;
                }
            }
            self.num_windows = 8;
        } else {
            self.max_sfb = reader.read_usize(6)?;
            self.num_windows = 1;
            self.predictor_present = reader.read_bool()?;

            if self.predictor_present {
                match params.object_type {
                    AudioObjectType::Main => {
                        let num_bands = self.max_sfb.min(predictor_max_bands(params.freq));
                        self.prediction.read(reader, num_bands)?;
                    }
                    AudioObjectType::LowComplexity | AudioObjectType::ErLowComplexity => {
                        return Err(IcsInfoError::PredictionNotAllowed(params.object_type));
                    }
                    _ => {
                        if params.frame_length != FrameLength::Standard1024 {
                            return Err(IcsInfoError::LtpNotSupported(params.frame_length));
                        }
                        self.ltp.present = reader.read_bool()?;
                        if self.ltp.present {
                            self.ltp.read(reader, self.max_sfb)?;
                        }
                    }
                }
            }
        }

        if self.max_sfb > self.num_swb {
            return Err(IcsInfoError::MaxSfbTooLarge {
                max_sfb: self.max_sfb,
                num_swb: self.num_swb,
            });
        }

        Ok(())
    }

    /// Copies the side info of the first channel of a common window pair into the second
    /// channel, keeping the second channel's own window history
    pub fn copy_common_window(&mut self, other: &IcsInfo) {
        let previous_sequence = self.window_sequence[0];
        let previous_shape = self.window_shape[0];
        *self = other.clone();
        self.window_sequence[1] = previous_sequence;
        self.window_shape[1] = previous_shape;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::common::config::SamplingFrequency;
    use crate::decoder::test_util::BitWriter;

    fn params(object_type: AudioObjectType) -> StreamParams {
        StreamParams::new(object_type, SamplingFrequency::from_index(3).unwrap(), false)
    }

    #[test]
    fn read_long_window() {
        let mut writer = BitWriter::new();
        writer.write(0, 1).write(0, 2).write(1, 1).write(49, 6).write(0, 1);
        let buf = writer.into_bytes();
        let mut reader = BitReader::new(&buf);
        let mut warnings = WarnOnce::default();

        let mut info = IcsInfo::default();
        info.read(&mut reader, &params(AudioObjectType::LowComplexity), false, &mut warnings)
            .unwrap();

        assert_eq!(info.window_sequence[0], WindowSequence::OnlyLong);
        assert_eq!(info.window_shape[0], WindowShape::KaiserBessel);
        assert_eq!(info.max_sfb, 49);
        assert_eq!(info.num_swb, 49);
        assert_eq!(info.num_windows, 1);
        assert_eq!(info.band_start(info.num_swb), 1024);
        assert_eq!(reader.position(), 11);
    }

    #[test]
    fn read_eight_short_with_grouping() {
        // grouping bits 1101001: groups of 3, 2, 1, 2 windows
        let mut writer = BitWriter::new();
        writer.write(0, 1).write(2, 2).write(0, 1).write(14, 4).write(0b1101001, 7);
        let buf = writer.into_bytes();
        let mut reader = BitReader::new(&buf);
        let mut warnings = WarnOnce::default();

        let mut info = IcsInfo::default();
        info.read(&mut reader, &params(AudioObjectType::LowComplexity), false, &mut warnings)
            .unwrap();

        assert!(info.is_eight_short());
        assert_eq!(info.num_windows, 8);
        assert_eq!(info.num_window_groups, 4);
        assert_eq!(&info.group_len[..4], &[3, 2, 1, 2]);
        assert_eq!(info.band_start(info.num_swb), 128);
        assert_eq!(info.window_sequence[1], WindowSequence::OnlyLong);
    }

    #[test]
    fn max_sfb_above_band_count_is_rejected() {
        let mut writer = BitWriter::new();
        writer.write(0, 1).write(2, 2).write(0, 1).write(15, 4).write(0, 7);
        let buf = writer.into_bytes();
        let mut reader = BitReader::new(&buf);
        let mut warnings = WarnOnce::default();

        let mut info = IcsInfo::default();
        let err = info
            .read(&mut reader, &params(AudioObjectType::LowComplexity), false, &mut warnings)
            .unwrap_err();

        assert!(matches!(err, IcsInfoError::MaxSfbTooLarge { max_sfb: 15, num_swb: 14 }));
        assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
        assert_eq!(info.max_sfb, 0);
    }

    #[test]
    fn prediction_is_rejected_for_low_complexity() {
        let mut writer = BitWriter::new();
        writer.write(0, 1).write(0, 2).write(0, 1).write(10, 6).write(1, 1);
        let buf = writer.into_bytes();
        let mut reader = BitReader::new(&buf);
        let mut warnings = WarnOnce::default();

        let mut info = IcsInfo::default();
        let err = info
            .read(&mut reader, &params(AudioObjectType::LowComplexity), false, &mut warnings)
            .unwrap_err();
        assert!(matches!(err, IcsInfoError::PredictionNotAllowed(_)));
    }

    #[test]
    fn reserved_bit_only_fails_in_strict_mode() {
        let mut writer = BitWriter::new();
        writer.write(1, 1).write(0, 2).write(0, 1).write(10, 6).write(0, 1);
        let buf = writer.into_bytes();
        let mut warnings = WarnOnce::default();
        let mut info = IcsInfo::default();

        let mut reader = BitReader::new(&buf);
        assert!(info
            .read(&mut reader, &params(AudioObjectType::LowComplexity), false, &mut warnings)
            .is_ok());

        let mut reader = BitReader::new(&buf);
        let err = info
            .read(&mut reader, &params(AudioObjectType::LowComplexity), true, &mut warnings)
            .unwrap_err();
        assert!(matches!(err, IcsInfoError::ReservedBitSet));
    }

    #[test]
    fn low_delay_rejects_short_windows() {
        let ld = StreamParams::new(
            AudioObjectType::ErLowDelay,
            SamplingFrequency::from_index(3).unwrap(),
            false,
        );
        let mut writer = BitWriter::new();
        writer.write(0, 1).write(2, 2).write(0, 1).write(0, 4).write(0, 7);
        let buf = writer.into_bytes();
        let mut reader = BitReader::new(&buf);
        let mut warnings = WarnOnce::default();

        let mut info = IcsInfo::default();
        let err = info.read(&mut reader, &ld, false, &mut warnings).unwrap_err();
        assert!(matches!(err, IcsInfoError::LowDelayRequiresLongWindow(WindowSequence::EightShort)));
        assert_eq!(info.window_sequence[0], WindowSequence::OnlyLong);
    }

    #[test]
    fn common_window_copy_keeps_shape_history() {
        let mut first = IcsInfo::default();
        first.window_shape = [WindowShape::Sine, WindowShape::Sine];
        first.max_sfb = 20;

        let mut second = IcsInfo::default();
        second.window_shape = [WindowShape::KaiserBessel, WindowShape::Sine];
        second.copy_common_window(&first);

        assert_eq!(second.max_sfb, 20);
        assert_eq!(second.window_shape, [WindowShape::Sine, WindowShape::KaiserBessel]);
    }
}
