use super::{
    bit_reader::{BitReader, BitReaderError},
    channel_config::{self, LayoutMap},
    error::{ErrorKind, WarnOnce},
    program_config::{ProgramConfig, ProgramConfigError},
};
use crate::common::config::{AudioObjectType, SamplingFrequency, StreamParams};

#[derive(Debug)]
pub enum AudioSpecificConfigError {
    UnsupportedObjectType(AudioObjectType),
    InvalidSamplingIndex(usize),
    InvalidLowDelaySamplingIndex(usize),
    InvalidChannelConfiguration(u8),
    /// Error resilience tools (virtual codebooks, reversible codes, reordering)
    ResilienceFlags(u8),
    ErrorProtection(u8),
    ProgramConfig(ProgramConfigError),
    BitReader(BitReaderError),
}

impl AudioSpecificConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedObjectType(_) | Self::ResilienceFlags(_) | Self::ErrorProtection(_) => {
                ErrorKind::MissingFeature
            }
            Self::InvalidSamplingIndex(_)
            | Self::InvalidLowDelaySamplingIndex(_)
            | Self::InvalidChannelConfiguration(_) => ErrorKind::InvalidSyntax,
            Self::ProgramConfig(err) => err.kind(),
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for AudioSpecificConfigError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

impl From<ProgramConfigError> for AudioSpecificConfigError {
    fn from(err: ProgramConfigError) -> Self {
        Self::ProgramConfig(err)
    }
}

/// Explicitly signalled spectral band replication: the core is decoded at its own rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbrSignal {
    pub extension_freq: SamplingFrequency,
    pub parametric_stereo: bool,
}

/// AudioSpecificConfig with the general audio specific part
#[derive(Debug, Clone)]
pub struct AudioSpecificConfig {
    pub object_type: AudioObjectType,
    pub freq: SamplingFrequency,

    /// channel_configuration index, 0 when the layout is given by `program_config`
    pub channel_config: u8,

    /// 960 (or 480 for low delay) samples per frame instead of 1024 (512)
    pub frame_length_short: bool,
    pub core_coder_delay: Option<u16>,
    pub program_config: Option<ProgramConfig>,
    pub sbr: Option<SbrSignal>,
}

impl AudioSpecificConfig {
    pub fn read(buf: &[u8]) -> Result<Self, AudioSpecificConfigError> {
        let mut reader = BitReader::new(buf);
        Self::read_from(&mut reader)
    }

    pub fn read_from(reader: &mut BitReader) -> Result<Self, AudioSpecificConfigError> {
        let origin = reader.position();
        let mut object_type = read_object_type(reader)?;
        let freq = read_sampling_frequency(reader)?;
        let channel_config = reader.read(4)? as u8;

        let mut sbr = None;
        if matches!(
            object_type,
            AudioObjectType::SpectralBandReplication | AudioObjectType::ParametricStereo
        ) {
            sbr = Some(SbrSignal {
                extension_freq: read_sampling_frequency(reader)?,
                parametric_stereo: object_type == AudioObjectType::ParametricStereo,
            });
            object_type = read_object_type(reader)?;
        }

        match object_type {
            AudioObjectType::Main
            | AudioObjectType::LowComplexity
            | AudioObjectType::ScalableSampleRate
            | AudioObjectType::LongTermPrediction
            | AudioObjectType::ErLowComplexity
            | AudioObjectType::ErLowDelay => {}
            other => return Err(AudioSpecificConfigError::UnsupportedObjectType(other)),
        }
        if object_type == AudioObjectType::ErLowDelay && !(3..=7).contains(&freq.index) {
            return Err(AudioSpecificConfigError::InvalidLowDelaySamplingIndex(freq.index));
        }

        // GASpecificConfig
        let frame_length_short = reader.read_bool()?;
        let core_coder_delay = if reader.read_bool()? {
            Some(reader.read(14)? as u16)
        } else {
            None
        };
        let extension_flag = reader.read_bool()?;

        let program_config = if channel_config == 0 {
            reader.skip(4)?;
            Some(ProgramConfig::read(reader, origin)?)
        } else {
            if channel_config::layout_table(channel_config).is_none() {
                return Err(AudioSpecificConfigError::InvalidChannelConfiguration(channel_config));
            }
            None
        };

        let error_resilient = object_type.is_error_resilient();
        if extension_flag {
            if error_resilient {
                let flags = reader.read(3)? as u8;
                if flags != 0 {
                    return Err(AudioSpecificConfigError::ResilienceFlags(flags));
                }
            }
            // extensionFlag3
            reader.skip(1)?;
        }
        if error_resilient {
            let ep_config = reader.read(2)? as u8;
            if ep_config != 0 {
                return Err(AudioSpecificConfigError::ErrorProtection(ep_config));
            }
        }

        log::debug!(
            "object type {:?} channel configuration {} sampling frequency {}",
            object_type,
            channel_config,
            freq.hz
        );

        Ok(Self {
            object_type,
            freq,
            channel_config,
            frame_length_short,
            core_coder_delay,
            program_config,
            sbr,
        })
    }

    pub fn params(&self) -> StreamParams {
        StreamParams::new(self.object_type, self.freq, self.frame_length_short)
    }

    /// Element layout declared by the configuration
    pub fn layout(&self, strict: bool, warnings: &mut WarnOnce) -> Result<LayoutMap, channel_config::ChannelConfigError> {
        match &self.program_config {
            Some(pce) => Ok(pce.layout.clone()),
            None => channel_config::default_layout(self.channel_config, strict, warnings),
        }
    }
}

// 5 bits, 31 escapes to 32 + 6 bits
fn read_object_type(reader: &mut BitReader) -> Result<AudioObjectType, BitReaderError> {
    let mut id = reader.read(5)? as u8;
    if id == 31 {
        id = 32 + reader.read(6)? as u8;
    }
    Ok(AudioObjectType::from_id(id))
}

// 4 bit index, 15 escapes to an explicit 24 bit rate
fn read_sampling_frequency(reader: &mut BitReader) -> Result<SamplingFrequency, AudioSpecificConfigError> {
    let index = reader.read_usize(4)?;
    if index == 15 {
        return Ok(SamplingFrequency::from_hz(reader.read(24)?));
    }
    SamplingFrequency::from_index(index).ok_or(AudioSpecificConfigError::InvalidSamplingIndex(index))
}
