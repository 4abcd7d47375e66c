use super::{
    bit_reader::{BitReader, BitReaderError},
    error::{ErrorKind, WarnOnce},
    ics_info::{IcsInfo, IcsInfoError},
    long_term_prediction::LtpHistory,
    main_prediction::Predictors,
    pulse_data::{PulseData, PulseError},
    scalefactors::{self, ScalefactorError},
    section_data::{SectionData, SectionError},
    spectral_data::{self, BandLayout, NoiseGenerator, SpectralError},
    temporal_noise_shaping::{TnsData, TnsError},
    windowing::{OverlapState, WindowingVariant},
};
use crate::common::{
    complex::Scaler,
    config::{AudioObjectType, StreamParams},
    constants::{MAX_BANDS, MAX_LEN_SPECTRAL},
};

#[derive(Debug)]
pub enum IcsError {
    Info(IcsInfoError),
    Section(SectionError),
    Scalefactor(ScalefactorError),
    Pulse(PulseError),
    Tns(TnsError),
    Spectral(SpectralError),
    GainControlNotSupported,
    BitReader(BitReaderError),
}

impl IcsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Info(err) => err.kind(),
            Self::Section(err) => err.kind(),
            Self::Scalefactor(err) => err.kind(),
            Self::Pulse(err) => err.kind(),
            Self::Tns(err) => err.kind(),
            Self::Spectral(err) => err.kind(),
            Self::GainControlNotSupported => ErrorKind::MissingFeature,
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for IcsError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

impl From<IcsInfoError> for IcsError {
    fn from(err: IcsInfoError) -> Self {
        Self::Info(err)
    }
}

impl From<SectionError> for IcsError {
    fn from(err: SectionError) -> Self {
        Self::Section(err)
    }
}

impl From<ScalefactorError> for IcsError {
    fn from(err: ScalefactorError) -> Self {
        Self::Scalefactor(err)
    }
}

impl From<PulseError> for IcsError {
    fn from(err: PulseError) -> Self {
        Self::Pulse(err)
    }
}

impl From<TnsError> for IcsError {
    fn from(err: TnsError) -> Self {
        Self::Tns(err)
    }
}

impl From<SpectralError> for IcsError {
    fn from(err: SpectralError) -> Self {
        Self::Spectral(err)
    }
}

/// Decoder wide state every channel stream reads or updates
pub struct DecodeContext<'a> {
    pub params: &'a StreamParams,
    pub strict: bool,
    pub warnings: &'a mut WarnOnce,
    pub noise: &'a mut NoiseGenerator,
}

/// One channel of a channel element: the side info and spectrum of the current frame plus
/// the state carried from frame to frame (overlap, prediction history)
#[derive(Debug, Clone)]
pub struct ChannelStream {
    pub info: IcsInfo,
    pub sections: SectionData,
    pub scalefactors: [i32; MAX_BANDS],
    pub tns: TnsData,

    /// Dequantized spectrum of the current frame (short windows 128 lines apart)
    pub coefficients: Vec<Scaler>,

    /// Time domain output of the current frame at 16 bit sample scale
    pub output: Vec<Scaler>,

    pub overlap: OverlapState,
    pub ltp: LtpHistory,
    pub predictors: Predictors,
}

impl Default for ChannelStream {
    fn default() -> Self {
        Self {
            info: IcsInfo::default(),
            sections: SectionData::default(),
            scalefactors: [0; MAX_BANDS],
            tns: TnsData::default(),
            coefficients: vec![0.0; MAX_LEN_SPECTRAL],
            output: vec![0.0; MAX_LEN_SPECTRAL],
            overlap: OverlapState::default(),
            ltp: LtpHistory::default(),
            predictors: Predictors::default(),
        }
    }
}

impl ChannelStream {
    /// Clears every piece of state carried between frames
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Decodes an individual_channel_stream into `coefficients`
    ///
    /// # Arguments
    ///
    /// * `reader` - Positioned at the global gain of the channel
    /// * `ctx` - Stream parameters and decoder wide state
    /// * `common_window` - The window layout was already read for the channel pair
    pub fn decode(&mut self, reader: &mut BitReader, ctx: &mut DecodeContext, common_window: bool) -> Result<(), IcsError> {
        let result = self.decode_fields(reader, ctx, common_window);
        if result.is_err() {
            self.tns.present = false;
        }
        result
    }

    fn decode_fields(&mut self, reader: &mut BitReader, ctx: &mut DecodeContext, common_window: bool) -> Result<(), IcsError> {
        let params = ctx.params;
        let global_gain = reader.read(8)? as i32;

        if !common_window {
            self.info.read(reader, params, ctx.strict, ctx.warnings)?;
        }

        self.sections.read(reader, &self.info)?;
        self.scalefactors = scalefactors::read(reader, global_gain, &self.info, &self.sections, ctx.strict, ctx.warnings)?;

        let pulse_data = if reader.read_bool()? {
            Some(PulseData::read(reader, &self.info)?)
        } else {
            None
        };

        // error resilient streams carry the filters after the gain control flag
        let error_resilient = params.object_type.is_error_resilient();
        let tns_present = reader.read_bool()?;
        self.tns = TnsData::default();
        if tns_present && !error_resilient {
            self.tns = TnsData::read(reader, &self.info, params.object_type)?;
        }
        if reader.read_bool()? {
            return Err(IcsError::GainControlNotSupported);
        }
        if tns_present && error_resilient {
            self.tns = TnsData::read(reader, &self.info, params.object_type)?;
        }

        let layout = BandLayout {
            info: &self.info,
            sections: &self.sections,
            scalefactors: &self.scalefactors,
        };
        spectral_data::read(reader, &layout, pulse_data.as_ref(), ctx.noise, &mut self.coefficients)?;

        if params.object_type == AudioObjectType::Main && !common_window {
            self.predictors.apply(&self.info, params.freq, &mut self.coefficients);
        }

        Ok(())
    }

    /// Applies the synthesis noise shaping filters of the current frame
    pub fn apply_tns(&mut self) {
        if self.tns.present {
            self.tns.apply(&mut self.coefficients, &self.info, true);
        }
    }

    /// Adds the long term prediction of the current frame to the spectrum
    pub fn apply_ltp(&mut self) {
        if self.info.predictor_present && self.info.ltp.present {
            self.ltp.apply(&self.info, &self.tns, &mut self.coefficients);
        }
    }

    /// Inverse transforms the spectrum into `output`, updating the overlap state (and the long
    /// term prediction history for LTP streams)
    pub fn synthesize(&mut self, variant: WindowingVariant, update_ltp: bool) {
        let frame_len = variant.frame_len();
        self.overlap
            .imdct_and_window(variant, &self.info, &self.coefficients, &mut self.output[..frame_len]);
        if update_ltp {
            self.ltp.update(&self.info, &self.overlap, &self.output);
        }
    }
}
