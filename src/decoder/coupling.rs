use heapless::Vec;
use itertools::izip;

use super::{
    bit_reader::{BitReader, BitReaderError},
    channel_config::ElementType,
    codebook::{codebooks, CodebookError},
    error::{Anomaly, ErrorKind, WarnOnce},
    individual_channel_stream::{ChannelStream, DecodeContext, IcsError},
    section_data::BandType,
};
use crate::common::{complex::Scaler, constants::MAX_BANDS};

// up to eight coupled elements, each taking one or two gain lists
const MAX_TARGETS: usize = 8;
const MAX_GAIN_LISTS: usize = 2 * MAX_TARGETS;

// gain steps: 2^(1/8), 2^(1/4), 2^(1/2), 2
const GAIN_SCALES: [f64; 4] = [1.090_507_732_665_257_7, 1.189_207_115_002_721, core::f64::consts::SQRT_2, 2.0];

// gains are coded as scalefactor deltas around this symbol
const DELTA_ZERO: i32 = 60;

#[derive(Debug)]
pub enum CouplingError {
    Ics(IcsError),
    Codebook(CodebookError),
}

impl CouplingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ics(err) => err.kind(),
            Self::Codebook(err) => err.kind(),
        }
    }
}

impl From<IcsError> for CouplingError {
    fn from(err: IcsError) -> Self {
        Self::Ics(err)
    }
}

impl From<CodebookError> for CouplingError {
    fn from(err: CodebookError) -> Self {
        Self::Codebook(err)
    }
}

impl From<BitReaderError> for CouplingError {
    fn from(err: BitReaderError) -> Self {
        Self::Codebook(CodebookError::BitReader(err))
    }
}

/// Stage of the pipeline where a coupling channel is added to its targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CouplingPoint {
    /// Spectral domain, before noise shaping (dependent coupling)
    #[default]
    BeforeTns,
    /// Spectral domain, after noise shaping (dependent coupling)
    BetweenTnsAndImdct,
    /// Time domain (independent coupling)
    AfterImdct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouplingTarget {
    pub element_type: ElementType,
    pub tag: usize,

    /// Channels of a pair to couple into: 0 both (shared gains), 1 second only, 2 first only,
    /// 3 both (separate gains). Single channel targets always use 2.
    pub ch_select: u8,
}

impl CouplingTarget {
    fn num_gain_lists(&self) -> usize {
        1 + (self.ch_select == 3) as usize
    }
}

/// Coupling channel element: one channel stream added into other elements with per band gains
#[derive(Debug, Clone, Default)]
pub struct CouplingElement {
    pub point: CouplingPoint,
    pub targets: Vec<CouplingTarget, MAX_TARGETS>,

    /// Gain lists indexed like the band types (only the first entry is used after the
    /// inverse transform)
    pub gains: Vec<[Scaler; MAX_BANDS], MAX_GAIN_LISTS>,

    pub channel: ChannelStream,
}

impl CouplingElement {
    /// Reads a coupling_channel_element (after the element tag) including its channel stream
    pub fn read(&mut self, reader: &mut BitReader, ctx: &mut DecodeContext) -> Result<(), CouplingError> {
        let switched = reader.read_bool()?;
        let num_coupled = reader.read_usize(3)? + 1;
        self.targets.clear();
        for _ in 0..num_coupled {
            let is_pair = reader.read_bool()?;
            let tag = reader.read_usize(4)?;
            let target = if is_pair {
                CouplingTarget {
                    element_type: ElementType::Cpe,
                    tag,
                    ch_select: reader.read(2)? as u8,
                }
            } else {
                CouplingTarget {
                    element_type: ElementType::Sce,
                    tag,
                    ch_select: 2,
                }
            };
            // capacity matches the 3 bit target count
            let _ = self.targets.push(target);
        }

        let dependent_point = reader.read_bool()?;
        self.point = match (switched, dependent_point) {
            (true, _) => CouplingPoint::AfterImdct,
            (false, false) => CouplingPoint::BeforeTns,
            (false, true) => CouplingPoint::BetweenTnsAndImdct,
        };

        let sign = reader.read_bool()?;
        let scale = GAIN_SCALES[reader.read_usize(2)?];

        self.channel.decode(reader, ctx, false)?;

        let num_gain_lists: usize = self.targets.iter().map(CouplingTarget::num_gain_lists).sum();
        self.gains.clear();
        for list in 0..num_gain_lists {
            let gains = self.read_gain_list(reader, list == 0, sign, scale)?;
            // capacity covers two lists per target
            let _ = self.gains.push(gains);
        }

        Ok(())
    }

    fn read_gain_list(
        &self,
        reader: &mut BitReader,
        first: bool,
        sign: bool,
        scale: f64,
    ) -> Result<[Scaler; MAX_BANDS], CouplingError> {
        let mut gains = [0.0; MAX_BANDS];

        // the first list is implicitly unit gain
        let (common_gain, mut gain) = if first {
            (true, 0)
        } else {
            let common_gain = self.point == CouplingPoint::AfterImdct || reader.read_bool()?;
            let gain = if common_gain { read_delta(reader)? } else { 0 };
            (common_gain, gain)
        };

        let mut gain_cache = scale.powi(-gain) as Scaler;
        if self.point == CouplingPoint::AfterImdct {
            gains[0] = gain_cache;
            return Ok(gains);
        }

        let info = &self.channel.info;
        let num_bands = info.num_window_groups * info.max_sfb;
        for (band_type, value) in self.channel.sections.band_types[..num_bands].iter().zip(gains.iter_mut()) {
            if *band_type == BandType::Zero {
                continue;
            }
            if !common_gain {
                let delta = read_delta(reader)?;
                if delta != 0 {
                    gain += delta;
                    let (magnitude, negative) = if sign { (gain >> 1, gain & 1 != 0) } else { (gain, false) };
                    gain_cache = scale.powi(-magnitude) as Scaler;
                    if negative {
                        gain_cache = -gain_cache;
                    }
                }
            }
            *value = gain_cache;
        }

        Ok(gains)
    }

    /// Adds the coupling channel into the channels of the element `element_type`/`tag` if it
    /// is one of the targets. Spectral coupling (before the inverse transform) scales each band
    /// with its own gain, time domain coupling uses a single gain per channel.
    pub fn apply(
        &self,
        element_type: ElementType,
        tag: usize,
        channels: &mut [ChannelStream],
        refuse_dependent: bool,
        warnings: &mut WarnOnce,
    ) {
        if refuse_dependent && self.point != CouplingPoint::AfterImdct {
            if self.targets.iter().any(|t| t.element_type == element_type && t.tag == tag) {
                warnings.report(Anomaly::DependentCouplingWithLtp);
            }
            return;
        }

        let mut index = 0;
        for target in &self.targets {
            if target.element_type != element_type || target.tag != tag {
                index += target.num_gain_lists();
                continue;
            }

            if target.ch_select != 1 {
                if let Some(channel) = channels.get_mut(0) {
                    self.couple(index, channel);
                }
                if target.ch_select != 0 {
                    index += 1;
                }
            }
            if target.ch_select != 2 {
                if let Some(channel) = channels.get_mut(1) {
                    self.couple(index, channel);
                }
                index += 1;
            }
        }
    }

    fn couple(&self, index: usize, target: &mut ChannelStream) {
        let Some(gains) = self.gains.get(index) else {
            return;
        };

        if self.point == CouplingPoint::AfterImdct {
            let gain = gains[0];
            for (out, src) in izip!(&mut target.output, &self.channel.output) {
                *out += gain * src;
            }
            return;
        }

        let source = &self.channel;
        source.info.for_each_band(|idx, lines| {
            if source.sections.band_types[idx] != BandType::Zero {
                let gain = gains[idx];
                for (dst, src) in izip!(&mut target.coefficients[lines.clone()], &source.coefficients[lines]) {
                    *dst += gain * src;
                }
            }
        });
    }
}

fn read_delta(reader: &mut BitReader) -> Result<i32, CouplingError> {
    Ok(codebooks().scalefactor.decode(reader)? as i32 - DELTA_ZERO)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::common::config::{AudioObjectType, SamplingFrequency, StreamParams};
    use crate::decoder::{spectral_data::NoiseGenerator, test_util::BitWriter};
    use crate::tables::huffman::{SCALEFACTOR_BITS, SCALEFACTOR_CODES};

    fn write_delta(writer: &mut BitWriter, delta: i32) {
        let symbol = (delta + DELTA_ZERO) as usize;
        writer.write(SCALEFACTOR_CODES[symbol], SCALEFACTOR_BITS[symbol] as usize);
    }

    // a long window channel stream whose first band uses codebook 1 and is all zero
    fn write_channel_stream(writer: &mut BitWriter) {
        writer.write(100, 8);
        writer.write(0, 1).write(0, 2).write(0, 1).write(1, 6).write(0, 1);
        writer.write(1, 4).write(1, 5);
        write_delta(writer, 0);
        writer.write(0, 3);
        writer.write(0, 1);
    }

    fn read(buf: &[u8]) -> CouplingElement {
        let params = StreamParams::new(AudioObjectType::LowComplexity, SamplingFrequency::from_index(3).unwrap(), false);
        let mut warnings = WarnOnce::default();
        let mut noise = NoiseGenerator::default();
        let mut ctx = DecodeContext {
            params: &params,
            strict: false,
            warnings: &mut warnings,
            noise: &mut noise,
        };
        let mut reader = BitReader::new(buf);
        let mut element = CouplingElement::default();
        element.read(&mut reader, &mut ctx).unwrap();
        element
    }

    #[test]
    fn read_dependent_coupling_with_band_gains() {
        let mut writer = BitWriter::new();
        // not switched, two targets: SCE 3 and CPE 1 with separate gains
        writer.write(0, 1).write(1, 3);
        writer.write(0, 1).write(3, 4);
        writer.write(1, 1).write(1, 4).write(3, 2);
        // between tns and imdct, no sign, scale 2
        writer.write(1, 1).write(0, 1).write(3, 2);
        write_channel_stream(&mut writer);
        // second and third list: not common, band 0 gain delta 2 and -1
        writer.write(0, 1);
        write_delta(&mut writer, 2);
        writer.write(0, 1);
        write_delta(&mut writer, -1);
        let buf = writer.into_bytes();

        let element = read(&buf);
        assert_eq!(element.point, CouplingPoint::BetweenTnsAndImdct);
        assert_eq!(element.targets.len(), 2);
        assert_eq!(element.targets[0].element_type, ElementType::Sce);
        assert_eq!(element.targets[1].ch_select, 3);
        assert_eq!(element.gains.len(), 3);
        assert_eq!(element.gains[0][0], 1.0);
        assert_eq!(element.gains[1][0], 0.25);
        assert_eq!(element.gains[2][0], 2.0);
        assert_eq!(element.gains[1][1], 0.0);
    }

    #[test]
    fn switched_coupling_is_applied_after_the_transform() {
        let mut writer = BitWriter::new();
        writer.write(1, 1).write(0, 3);
        writer.write(1, 1).write(0, 4).write(0, 2);
        // the point bit is ignored when switched
        writer.write(0, 1).write(0, 1).write(2, 2);
        write_channel_stream(&mut writer);
        let buf = writer.into_bytes();

        let mut element = read(&buf);
        assert_eq!(element.point, CouplingPoint::AfterImdct);
        assert_eq!(element.gains.len(), 1);

        element.channel.output.fill(2.0);
        let mut channels = [ChannelStream::default(), ChannelStream::default()];
        let mut warnings = WarnOnce::default();
        element.apply(ElementType::Cpe, 0, &mut channels, false, &mut warnings);
        assert!(channels[0].output.iter().all(|x| *x == 2.0));
        assert!(channels[1].output.iter().all(|x| *x == 2.0));

        // other elements are not touched
        let mut other = [ChannelStream::default()];
        element.apply(ElementType::Sce, 0, &mut other, false, &mut warnings);
        assert!(other[0].output.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn dependent_coupling_scales_each_band() {
        let mut element = read(&{
            let mut writer = BitWriter::new();
            writer.write(0, 1).write(1, 3);
            writer.write(0, 1).write(0, 4);
            writer.write(0, 1).write(1, 4);
            writer.write(0, 1).write(0, 1).write(3, 2);
            write_channel_stream(&mut writer);
            writer.write(0, 1);
            write_delta(&mut writer, -1);
            writer.into_bytes()
        });
        element.channel.coefficients.fill(3.0);

        let mut warnings = WarnOnce::default();
        let mut first = [ChannelStream::default()];
        element.apply(ElementType::Sce, 0, &mut first, false, &mut warnings);
        assert_eq!(&first[0].coefficients[..4], &[3.0; 4]);
        assert_eq!(first[0].coefficients[4], 0.0);

        // the second target takes the second gain list
        let mut second = [ChannelStream::default()];
        element.apply(ElementType::Sce, 1, &mut second, false, &mut warnings);
        assert_eq!(&second[0].coefficients[..4], &[6.0; 4]);

        // refused for long term prediction streams
        let mut refused = [ChannelStream::default()];
        element.apply(ElementType::Sce, 0, &mut refused, true, &mut warnings);
        assert!(refused[0].coefficients.iter().all(|x| *x == 0.0));
        assert!(warnings.is_reported(Anomaly::DependentCouplingWithLtp));
    }
}
