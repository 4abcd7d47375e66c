use bitvec::prelude::*;

use super::{
    adts::AdtsError,
    audio_specific_config::AudioSpecificConfigError,
    bit_reader::BitReaderError,
    channel_config::{ChannelConfigError, ElementType},
    coupling::CouplingError,
    individual_channel_stream::IcsError,
    program_config::ProgramConfigError,
    stereo::StereoError,
};

/// Error classes of the frame decoder. Every error aborts the current frame only, the next
/// frame can be decoded normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bitstream ended before the frame was complete
    Exhausted,
    /// A decoded value violates the bitstream syntax
    InvalidSyntax,
    /// A valid bitstream feature this decoder does not implement
    MissingFeature,
    /// The channel configuration of the frame does not match the active configuration
    ConfigConflict,
}

/// Recoverable stream anomalies. These are repaired in place and logged once per decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    ReservedBitSet,
    ScalefactorClamped,
    NoiseEnergyClamped,
    IntensityPositionClamped,
    LayoutRemapped,
    Assumed71Layout,
    DuplicateElement,
    SecondProgramConfig,
    ExtensionPayloadSkipped,
    DependentCouplingWithLtp,
    ChannelElementMissing,
    CouplingTargetMissing,
}

impl Anomaly {
    fn message(&self) -> &'static str {
        match self {
            Self::ReservedBitSet => "reserved bit set",
            Self::ScalefactorClamped => "scalefactor out of range, clamped",
            Self::NoiseEnergyClamped => "noise energy out of range, clamped",
            Self::IntensityPositionClamped => "intensity stereo position out of range, clamped",
            Self::LayoutRemapped => "channel layout remapped to work around a broken encoder",
            Self::Assumed71Layout => "assuming 7.1 layout instead of 7.1 wide for channel configuration 7",
            Self::DuplicateElement => "duplicate channel element in frame",
            Self::SecondProgramConfig => "ignoring second program config element in frame",
            Self::ExtensionPayloadSkipped => "skipping unsupported extension payload",
            Self::DependentCouplingWithLtp => "dependent coupling is not supported together with long term prediction",
            Self::ChannelElementMissing => "channel element of the layout missing from frame",
            Self::CouplingTargetMissing => "coupling channel element targets an element missing from frame",
        }
    }
}

/// Latch that logs each anomaly the first time it is reported
#[derive(Debug, Clone, Default)]
pub struct WarnOnce {
    reported: BitArray<[u16; 1]>,
}

impl WarnOnce {
    pub fn report(&mut self, anomaly: Anomaly) {
        let index = anomaly as usize;
        if !self.reported[index] {
            self.reported.set(index, true);
            log::warn!("{}", anomaly.message());
        }
    }

    pub fn is_reported(&self, anomaly: Anomaly) -> bool {
        self.reported[anomaly as usize]
    }
}

/// Error returned by the frame decoder
#[derive(Debug)]
pub enum DecoderError {
    BitReader(BitReaderError),
    Ics(IcsError),
    Coupling(CouplingError),
    ChannelConfig(ChannelConfigError),
    ProgramConfig(ProgramConfigError),
    AudioSpecificConfig(AudioSpecificConfigError),
    Adts(AdtsError),
    Stereo(StereoError),
    DuplicateElement { element_type: ElementType, tag: usize },
}

impl DecoderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BitReader(err) => err.kind(),
            Self::Ics(err) => err.kind(),
            Self::Coupling(err) => err.kind(),
            Self::ChannelConfig(err) => err.kind(),
            Self::ProgramConfig(err) => err.kind(),
            Self::AudioSpecificConfig(err) => err.kind(),
            Self::Adts(err) => err.kind(),
            Self::Stereo(err) => err.kind(),
            Self::DuplicateElement { .. } => ErrorKind::InvalidSyntax,
        }
    }
}

impl From<BitReaderError> for DecoderError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

impl From<IcsError> for DecoderError {
    fn from(err: IcsError) -> Self {
        Self::Ics(err)
    }
}

impl From<CouplingError> for DecoderError {
    fn from(err: CouplingError) -> Self {
        Self::Coupling(err)
    }
}

impl From<ChannelConfigError> for DecoderError {
    fn from(err: ChannelConfigError) -> Self {
        Self::ChannelConfig(err)
    }
}

impl From<ProgramConfigError> for DecoderError {
    fn from(err: ProgramConfigError) -> Self {
        Self::ProgramConfig(err)
    }
}

impl From<AudioSpecificConfigError> for DecoderError {
    fn from(err: AudioSpecificConfigError) -> Self {
        Self::AudioSpecificConfig(err)
    }
}

impl From<AdtsError> for DecoderError {
    fn from(err: AdtsError) -> Self {
        Self::Adts(err)
    }
}

impl From<StereoError> for DecoderError {
    fn from(err: StereoError) -> Self {
        Self::Stereo(err)
    }
}
