// Copyright 2022 David Haig
// Licensed under the Apache License, Version 2.0 (the "License");
//

use super::{
    adts::AdtsHeader,
    audio_specific_config::AudioSpecificConfig,
    bit_reader::{BitReader, BitReaderError},
    channel_config::{
        self, ChannelConfigError, ConfigStatus, ElementSlot, ElementType, OutputConfigHolder, Speaker,
    },
    coupling::{CouplingElement, CouplingPoint},
    error::{Anomaly, DecoderError, WarnOnce},
    fill_element::{self, DynamicRange},
    individual_channel_stream::{ChannelStream, DecodeContext, IcsError},
    output_scaling,
    program_config::ProgramConfig,
    spectral_data::NoiseGenerator,
    stereo::{self, MsMask},
    windowing::WindowingVariant,
};
use crate::common::{
    config::{AudioObjectType, DecoderOptions, DualMonoMode, SamplingFrequency, StreamParams},
    constants::MAX_ELEM_ID,
};

// syntactic element ids of a raw data block (0 to 3 are the channel elements)
const ID_DSE: u32 = 4;
const ID_PCE: u32 = 5;
const ID_FIL: u32 = 6;
const ID_END: u32 = 7;

// an element id must still fit after every element
const MIN_BITS_PER_ELEMENT: usize = 3;

/// One decoded frame: planar samples normalised to -1.0..1.0 in output channel order
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub sample_rate: u32,
    pub samples_per_channel: usize,
    pub channels: Vec<Vec<f32>>,

    /// Loudspeaker of each output channel (None when the layout could not be identified)
    pub speakers: Vec<Option<Speaker>>,
}

impl AudioFrame {
    fn empty(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples_per_channel: 0,
            channels: Vec::new(),
            speakers: Vec::new(),
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Interleaved 16 bit samples, rounded and clipped
    pub fn to_interleaved_i16(&self) -> Vec<i16> {
        let planes: Vec<&[f32]> = self.channels.iter().map(|channel| channel.as_slice()).collect();
        let mut interleaved = vec![0; self.num_channels() * self.samples_per_channel];
        output_scaling::interleave_i16(&planes, &mut interleaved);
        interleaved
    }
}

#[derive(Debug, Clone)]
enum ElementData {
    Channels(Vec<ChannelStream>),
    Coupling(Box<CouplingElement>),
}

#[derive(Debug, Clone)]
struct Element {
    /// Instance tag the element was last decoded with
    tag: usize,
    /// Decoded in the current frame
    present: bool,
    data: ElementData,
}

impl Element {
    fn new(element_type: ElementType) -> Self {
        let data = match element_type {
            ElementType::Cce => ElementData::Coupling(Box::default()),
            other => ElementData::Channels(vec![ChannelStream::default(); other.num_channels()]),
        };
        Self {
            tag: 0,
            present: false,
            data,
        }
    }

    fn reset(&mut self) {
        match &mut self.data {
            ElementData::Channels(channels) => channels.iter_mut().for_each(ChannelStream::reset),
            ElementData::Coupling(coupling) => coupling.channel.reset(),
        }
    }
}

// element storage indexed by element type and instance
type Elements = [[Option<Element>; MAX_ELEM_ID]; 4];

// decode state of one raw data block
#[derive(Default)]
struct FrameState {
    audio_found: bool,
    pce_found: bool,
    sce_count: usize,
    presence: [[u8; MAX_ELEM_ID]; 4],
}

/// Main entry point of library - Start here for the Decoder
pub struct AacDecoder {
    options: DecoderOptions,
    config: OutputConfigHolder,
    elements: Elements,
    noise: NoiseGenerator,
    warnings: WarnOnce,
    drc: Option<DynamicRange>,
}

impl AacDecoder {
    /// Creates a decoder for the stream described by an AudioSpecificConfig
    ///
    /// # Arguments
    ///
    /// * `asc` - AudioSpecificConfig (e.g. from an MP4 esds box or an SDP config)
    /// * `options` - Output channel order, dual mono selection and strictness
    pub fn new(asc: &[u8], options: DecoderOptions) -> Result<Self, DecoderError> {
        let asc = AudioSpecificConfig::read(asc)?;
        let mut decoder = Self::with_params(asc.params(), options);

        if let Some(sbr) = asc.sbr {
            log::debug!("decoding the core of a {} Hz SBR stream", sbr.extension_freq.hz);
            decoder.warnings.report(Anomaly::ExtensionPayloadSkipped);
        }

        let layout = asc.layout(options.is_strict(), &mut decoder.warnings)?;
        decoder
            .config
            .configure(&layout, asc.channel_config, ConfigStatus::TrialFromHeader)?;
        decoder.sync_elements();
        Ok(decoder)
    }

    /// Creates a decoder for an ADTS stream, the configuration is taken from the frame headers
    pub fn for_adts(options: DecoderOptions) -> Self {
        let params = StreamParams::new(AudioObjectType::LowComplexity, SamplingFrequency::from_hz(44100), false);
        Self::with_params(params, options)
    }

    fn with_params(params: StreamParams, options: DecoderOptions) -> Self {
        Self {
            options,
            config: OutputConfigHolder::new(params, options.channel_order),
            elements: core::array::from_fn(|_| core::array::from_fn(|_| None)),
            noise: NoiseGenerator::default(),
            warnings: WarnOnce::default(),
            drc: None,
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Object type, sampling frequency and frame length of the active configuration
    pub fn stream_params(&self) -> StreamParams {
        self.config.current().params
    }

    pub fn num_channels(&self) -> usize {
        self.config.current().num_channels()
    }

    pub fn status(&self) -> ConfigStatus {
        self.config.current().status
    }

    /// Dynamic range control information of the most recent frame that carried any
    pub fn dynamic_range(&self) -> Option<&DynamicRange> {
        self.drc.as_ref()
    }

    /// Clears every piece of state carried between frames (overlap, prediction history and
    /// the noise generator) keeping the channel configuration
    pub fn flush(&mut self) {
        for element in self.elements.iter_mut().flatten().flatten() {
            element.reset();
        }
        self.noise.reset();
    }

    /// Decodes one raw data block (optionally preceded by an ADTS header)
    ///
    /// # Arguments
    ///
    /// * `buf_in` - One frame of the bitstream
    ///
    /// A frame that fails to decode produces no output and restores the last channel
    /// configuration that decoded successfully.
    pub fn decode_frame(&mut self, buf_in: &[u8]) -> Result<AudioFrame, DecoderError> {
        for element in self.elements.iter_mut().flatten().flatten() {
            element.present = false;
        }

        let result = self.decode_raw_data_block(buf_in);
        if result.is_err() {
            self.config.rollback();
        }
        self.sync_elements();
        result
    }

    fn decode_raw_data_block(&mut self, buf_in: &[u8]) -> Result<AudioFrame, DecoderError> {
        let mut reader = BitReader::new(buf_in);

        if AdtsHeader::is_present(&reader) {
            self.read_adts_header(&mut reader)?;
        }

        let params = self.config.current().params;
        let mut frame = FrameState::default();
        if params.object_type.is_error_resilient() {
            self.read_er_elements(&mut reader, &params)?;
            frame.audio_found = true;
        } else {
            self.read_elements(&mut reader, &params, &mut frame)?;
        }

        if self.config.current().num_channels() == 0 {
            return Ok(AudioFrame::empty(params.freq.hz));
        }

        self.spectral_to_sample(&params);

        if !frame.audio_found {
            return Ok(AudioFrame::empty(params.freq.hz));
        }
        self.config.commit();

        let mut output = self.output_frame(&params);
        self.select_dual_mono(&mut output, frame.sce_count);
        Ok(output)
    }

    fn read_adts_header(&mut self, reader: &mut BitReader) -> Result<(), DecoderError> {
        let header = AdtsHeader::read(reader)?;
        if header.num_raw_blocks > 1 {
            log::warn!(
                "{} raw data blocks in an ADTS frame, decoding the first",
                header.num_raw_blocks
            );
        }

        self.config.push();
        if header.channel_config > 0 {
            let layout = channel_config::default_layout(header.channel_config, self.options.is_strict(), &mut self.warnings)?;
            self.config
                .configure(&layout, header.channel_config, ConfigStatus::TrialFromHeader)?;
        } else {
            self.config.set_channel_config(0);
            // dual mono broadcasts signal channel configuration 0 without a program config
            let dual_mono = matches!(self.options.dual_mono, DualMonoMode::Left | DualMonoMode::Right);
            if dual_mono && self.config.saved().status == ConfigStatus::None {
                self.config
                    .configure(&channel_config::dual_mono_layout(), 0, ConfigStatus::TrialFromHeader)?;
            }
        }
        self.config.set_params(header.params());
        Ok(())
    }

    fn read_elements(&mut self, reader: &mut BitReader, params: &StreamParams, frame: &mut FrameState) -> Result<(), DecoderError> {
        let payload_alignment = reader.position();
        self.config.start_frame();

        loop {
            let id = reader.read(3)?;
            if id == ID_END {
                break;
            }
            let tag = reader.read_usize(4)?;
            log::trace!("element {} tag {}", id, tag);

            if self.config.current().num_channels() == 0 && id != ID_PCE {
                return Err(ChannelConfigError::NoChannelsConfigured.into());
            }

            match ElementType::from_id(id) {
                Some(element_type) => self.read_indexed_element(reader, params, element_type, tag, frame)?,
                None if id == ID_DSE => fill_element::skip_data_stream(reader)?,
                None if id == ID_PCE => self.read_program_config(reader, params, payload_alignment, frame)?,
                None => {
                    let count = fill_element::read_fill_count(reader, tag)?;
                    fill_element::read_fill_element(reader, count, &mut self.drc, &mut self.warnings)?;
                }
            }

            let remaining = reader.bits_remaining();
            if remaining < MIN_BITS_PER_ELEMENT {
                return Err(DecoderError::BitReader(BitReaderError::Exhausted {
                    requested: MIN_BITS_PER_ELEMENT,
                    remaining,
                }));
            }
        }

        Ok(())
    }

    // single channel, channel pair, coupling and low frequency elements
    fn read_indexed_element(
        &mut self,
        reader: &mut BitReader,
        params: &StreamParams,
        element_type: ElementType,
        tag: usize,
        frame: &mut FrameState,
    ) -> Result<(), DecoderError> {
        let presence = &mut frame.presence[element_type.index()][tag];
        if *presence > 0 {
            if *presence > 1 {
                return Err(DecoderError::DuplicateElement { element_type, tag });
            }
            log::debug!("duplicate {:?} element {}", element_type, tag);
            self.warnings.report(Anomaly::DuplicateElement);
        }
        *presence += 1;

        let strict = self.options.is_strict();
        let slot = self.config.map_element(element_type, tag, strict, &mut self.warnings)?;
        self.read_channel_element(reader, params, element_type, slot, tag)?;
        if element_type == ElementType::Sce {
            frame.sce_count += 1;
        }
        frame.audio_found = true;
        Ok(())
    }

    // error resilient frames carry the elements of the channel configuration in a fixed order
    // without element ids
    fn read_er_elements(&mut self, reader: &mut BitReader, params: &StreamParams) -> Result<(), DecoderError> {
        let channel_config = self.config.current().channel_config;
        let layout = match channel_config::layout_table(channel_config) {
            Some(layout) if channel_config < 13 => layout,
            _ => return Err(ChannelConfigError::InvalidChannelConfiguration(channel_config).into()),
        };

        let strict = self.options.is_strict();
        self.config.start_frame();
        for entry in layout {
            let slot = self
                .config
                .map_element(entry.element_type, entry.tag, strict, &mut self.warnings)?;
            // element instance tag
            reader.skip(4)?;
            self.read_channel_element(reader, params, entry.element_type, slot, entry.tag)?;
        }

        Ok(())
    }

    fn read_program_config(
        &mut self,
        reader: &mut BitReader,
        params: &StreamParams,
        payload_alignment: usize,
        frame: &mut FrameState,
    ) -> Result<(), DecoderError> {
        let pushed = self.config.push();
        if frame.pce_found && !pushed {
            return Err(ChannelConfigError::TrialPending.into());
        }

        let pce = ProgramConfig::read(reader, payload_alignment)?;
        if pce.sampling_index != params.freq.index {
            log::warn!(
                "sampling index {} of the program config differs from the stream ({})",
                pce.sampling_index,
                params.freq.index
            );
        }

        if frame.pce_found {
            log::error!("ignoring program config element, only one is allowed per frame");
            self.warnings.report(Anomaly::SecondProgramConfig);
            self.config.rollback();
        } else {
            self.config.configure(&pce.layout, 0, ConfigStatus::TrialFromInband)?;
            frame.pce_found = true;
        }
        Ok(())
    }

    fn read_channel_element(
        &mut self,
        reader: &mut BitReader,
        params: &StreamParams,
        element_type: ElementType,
        slot: ElementSlot,
        tag: usize,
    ) -> Result<(), DecoderError> {
        let element = self.elements[slot.element_type.index()][slot.index]
            .get_or_insert_with(|| Element::new(slot.element_type));
        element.tag = tag;
        element.present = true;

        let mut ctx = DecodeContext {
            params,
            strict: self.options.is_strict(),
            warnings: &mut self.warnings,
            noise: &mut self.noise,
        };

        match (&mut element.data, element_type) {
            (ElementData::Coupling(coupling), ElementType::Cce) => coupling.read(reader, &mut ctx)?,
            (ElementData::Channels(channels), ElementType::Cpe) => read_channel_pair(reader, &mut ctx, channels)?,
            (ElementData::Channels(channels), ElementType::Sce | ElementType::Lfe) => {
                if let Some(channel) = channels.first_mut() {
                    channel.decode(reader, &mut ctx, false)?;
                }
            }
            _ => return Err(ChannelConfigError::ElementNotAllocated { element_type, tag }.into()),
        }
        Ok(())
    }

    // Turns the spectra of every element decoded in the frame into time domain samples:
    // low frequency elements, then coupling elements, then channel pairs and single channels.
    fn spectral_to_sample(&mut self, params: &StreamParams) {
        let variant = WindowingVariant::new(params.frame_length);
        let ltp = params.object_type.uses_long_term_prediction();
        let warnings = &mut self.warnings;
        let [sce, cpe, cce, lfe] = &mut self.elements;

        for element in lfe.iter_mut().flatten().filter(|e| e.present) {
            if let ElementData::Channels(channels) = &mut element.data {
                apply_prediction_and_tns(channels, ltp);
                for channel in channels.iter_mut() {
                    channel.synthesize(variant, ltp);
                }
            }
        }

        for element in cce.iter_mut().flatten().filter(|e| e.present) {
            if let ElementData::Coupling(coupling) = &mut element.data {
                apply_prediction_and_tns(core::slice::from_mut(&mut coupling.channel), ltp);
                if coupling.point == CouplingPoint::AfterImdct {
                    coupling.channel.synthesize(variant, ltp);
                }
            }
        }

        let couplings: Vec<&CouplingElement> = cce
            .iter()
            .flatten()
            .filter(|e| e.present)
            .filter_map(|e| match &e.data {
                ElementData::Coupling(coupling) => Some(&**coupling),
                ElementData::Channels(_) => None,
            })
            .collect();
        for target in couplings.iter().flat_map(|coupling| coupling.targets.iter()) {
            let elements = match target.element_type {
                ElementType::Cpe => &*cpe,
                _ => &*sce,
            };
            if !elements.iter().flatten().any(|e| e.present && e.tag == target.tag) {
                log::debug!("coupling target {:?} {} not in frame", target.element_type, target.tag);
                warnings.report(Anomaly::CouplingTargetMissing);
            }
        }

        let couple =|point: CouplingPoint,
                      element_type: ElementType,
                      tag: usize,
                      channels: &mut [ChannelStream],
                      warnings: &mut WarnOnce| {
            for coupling in couplings.iter().filter(|c| c.point == point) {
                coupling.apply(element_type, tag, channels, ltp, warnings);
            }
        };

        for (element_type, elements) in [(ElementType::Cpe, cpe), (ElementType::Sce, sce)] {
            for element in elements.iter_mut().flatten().filter(|e| e.present) {
                let tag = element.tag;
                let ElementData::Channels(channels) = &mut element.data else {
                    continue;
                };

                couple(CouplingPoint::BeforeTns, element_type, tag, channels, warnings);
                apply_prediction_and_tns(channels, ltp);
                couple(CouplingPoint::BetweenTnsAndImdct, element_type, tag, channels, warnings);
                for channel in channels.iter_mut() {
                    channel.synthesize(variant, ltp);
                }
                couple(CouplingPoint::AfterImdct, element_type, tag, channels, warnings);
            }
        }
    }

    fn output_frame(&mut self, params: &StreamParams) -> AudioFrame {
        let frame_len = WindowingVariant::new(params.frame_length).frame_len();
        let config = self.config.current();

        let mut channels = Vec::with_capacity(config.num_channels());
        let mut speakers = Vec::with_capacity(config.num_channels());
        for output in &config.channels {
            let mut plane = vec![0.0; frame_len];
            let stream = match &self.elements[output.slot.element_type.index()][output.slot.index] {
                Some(Element {
                    present: true,
                    data: ElementData::Channels(streams),
                    ..
                }) => streams.get(output.channel),
                _ => None,
            };
            match stream {
                Some(stream) => output_scaling::normalise(&stream.output[..frame_len], &mut plane),
                None => self.warnings.report(Anomaly::ChannelElementMissing),
            }
            channels.push(plane);
            speakers.push(output.speaker);
        }

        AudioFrame {
            sample_rate: params.freq.hz,
            samples_per_channel: frame_len,
            channels,
            speakers,
        }
    }

    // a stereo program carried as two single channel elements
    fn select_dual_mono(&self, output: &mut AudioFrame, sce_count: usize) {
        if sce_count != 2 || output.num_channels() != 2 {
            return;
        }
        match self.options.dual_mono {
            DualMonoMode::Left => output.channels[1] = output.channels[0].clone(),
            DualMonoMode::Right => output.channels[0] = output.channels[1].clone(),
            DualMonoMode::Auto | DualMonoMode::Both => {}
        }
    }

    // releases the storage of elements the active layout no longer has
    fn sync_elements(&mut self) {
        let config = self.config.current();
        for element_type in ElementType::ALL {
            for (index, element) in self.elements[element_type.index()].iter_mut().enumerate() {
                if element.is_some() && !config.is_allocated(ElementSlot { element_type, index }) {
                    *element = None;
                }
            }
        }
    }
}

fn read_channel_pair(reader: &mut BitReader, ctx: &mut DecodeContext, channels: &mut [ChannelStream]) -> Result<(), DecoderError> {
    let [left, right] = channels else {
        return Ok(());
    };

    let common_window = reader.read_bool()?;
    let mut mask = MsMask::default();
    if common_window {
        left.info.read(reader, ctx.params, ctx.strict, ctx.warnings).map_err(IcsError::from)?;
        right.info.copy_common_window(&left.info);
        if right.info.predictor_present && ctx.params.object_type != AudioObjectType::Main {
            right.info.ltp.present = reader.read_bool()?;
            if right.info.ltp.present {
                right.info.ltp.read(reader, right.info.max_sfb)?;
            }
        }
        mask = MsMask::read(reader, &left.info)?;
    }

    left.decode(reader, ctx, common_window)?;
    right.decode(reader, ctx, common_window)?;

    if common_window {
        stereo::apply_mid_side(
            &left.info,
            &mask,
            [&left.sections.band_types[..], &right.sections.band_types[..]],
            &mut left.coefficients,
            &mut right.coefficients,
        );
        if ctx.params.object_type == AudioObjectType::Main {
            left.predictors.apply(&left.info, ctx.params.freq, &mut left.coefficients);
            right.predictors.apply(&right.info, ctx.params.freq, &mut right.coefficients);
        }
    }

    stereo::apply_intensity(
        &right.info,
        &mask,
        &right.sections.band_types,
        &right.scalefactors,
        &left.coefficients,
        &mut right.coefficients,
    );

    Ok(())
}

// long term prediction is switched by the first channel of an element
fn apply_prediction_and_tns(channels: &mut [ChannelStream], ltp: bool) {
    let predictor_present = channels.first().map_or(false, |channel| channel.info.predictor_present);
    for channel in channels.iter_mut() {
        if ltp && predictor_present {
            channel.apply_ltp();
        }
        channel.apply_tns();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::common::config::{ChannelOrder, Strictness};
    use crate::decoder::{error::ErrorKind, test_util::BitWriter};
    use std::vec::Vec as StdVec;

    const ID_SCE: u32 = 0;
    const ID_CPE: u32 = 1;
    const ID_CCE: u32 = 2;
    const ID_LFE: u32 = 3;

    // AudioSpecificConfig at 48 kHz
    fn object_asc(object_type: u32, channel_config: u32) -> StdVec<u8> {
        let mut writer = BitWriter::new();
        writer.write(object_type, 5).write(3, 4).write(channel_config, 4).write(0, 3);
        writer.align();
        writer.into_bytes()
    }

    fn asc(channel_config: u32) -> StdVec<u8> {
        object_asc(2, channel_config)
    }

    // AAC LC at 48 kHz with the layout given by a program config element
    fn pce_asc(front: &[(bool, u32)], coupling: &[u32]) -> StdVec<u8> {
        let mut writer = BitWriter::new();
        writer.write(2, 5).write(3, 4).write(0, 4).write(0, 3);
        writer.write(0, 4);
        write_pce(&mut writer, front, coupling);
        writer.into_bytes()
    }

    fn decode_all(asc: &[u8], frames: &[&[u8]]) -> StdVec<AudioFrame> {
        let mut decoder = AacDecoder::new(asc, DecoderOptions::default()).unwrap();
        frames.iter().map(|frame| decoder.decode_frame(frame).unwrap()).collect()
    }

    fn decoder(channel_config: u32) -> AacDecoder {
        AacDecoder::new(&asc(channel_config), DecoderOptions::default()).unwrap()
    }

    fn write_element(writer: &mut BitWriter, id: u32, tag: u32) {
        writer.write(id, 3).write(tag, 4);
    }

    // long window channel stream without any coded band
    fn write_silent_ics(writer: &mut BitWriter) {
        writer.write(100, 8);
        writer.write(0, 1).write(0, 2).write(0, 1).write(0, 6).write(0, 1);
        writer.write(0, 3);
    }

    // long window channel stream with one noise substituted band
    fn write_noise_ics(writer: &mut BitWriter) {
        writer.write(100, 8);
        writer.write(0, 1).write(0, 2).write(0, 1).write(1, 6).write(0, 1);
        writer.write(13, 4).write(1, 5);
        // noise energy 100 - 90 + 30
        writer.write(256 + 30, 9);
        writer.write(0, 3);
    }

    fn write_silent_cpe(writer: &mut BitWriter, tag: u32) {
        write_element(writer, ID_CPE, tag);
        writer.write(0, 1);
        write_silent_ics(writer);
        write_silent_ics(writer);
    }

    fn write_pce(writer: &mut BitWriter, front: &[(bool, u32)], coupling: &[u32]) {
        writer.write(1, 2).write(3, 4);
        writer.write(front.len() as u32, 4).write(0, 4).write(0, 4).write(0, 2).write(0, 3);
        writer.write(coupling.len() as u32, 4);
        writer.write(0, 3);
        for (is_cpe, tag) in front {
            writer.write_bool(*is_cpe).write(*tag, 4);
        }
        for tag in coupling {
            writer.write(0, 1).write(*tag, 4);
        }
        writer.align();
        writer.write(0, 8);
    }

    fn finish(mut writer: BitWriter) -> StdVec<u8> {
        writer.write(ID_END, 3);
        writer.align();
        writer.into_bytes()
    }

    fn mono_noise_frame() -> StdVec<u8> {
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        write_noise_ics(&mut writer);
        finish(writer)
    }

    #[test]
    fn silent_mono_frame() {
        let mut decoder = decoder(1);
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        write_silent_ics(&mut writer);
        let buf = finish(writer);

        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.sample_rate, 48000);
        assert_eq!(frame.num_channels(), 1);
        assert_eq!(frame.samples_per_channel, 1024);
        assert_eq!(frame.speakers, [Some(Speaker::FrontCenter)]);
        assert!(frame.channels[0].iter().all(|x| *x == 0.0));
        assert_eq!(decoder.status(), ConfigStatus::Locked);
        assert_eq!(frame.to_interleaved_i16(), vec![0; 1024]);
    }

    #[test]
    fn flush_restores_initial_state() {
        let buf = mono_noise_frame();
        let mut decoder = decoder(1);

        let first = decoder.decode_frame(&buf).unwrap();
        assert!(first.channels[0].iter().any(|x| *x != 0.0));

        // the noise generator and the overlap carry over into the next frame
        let second = decoder.decode_frame(&buf).unwrap();
        assert_ne!(first, second);

        decoder.flush();
        let after_flush = decoder.decode_frame(&buf).unwrap();
        assert_eq!(first, after_flush);
        assert_eq!(decoder.num_channels(), 1);
    }

    #[test]
    fn canonical_5_1_frame() {
        let mut decoder = decoder(6);
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        write_silent_ics(&mut writer);
        write_silent_cpe(&mut writer, 0);
        write_silent_cpe(&mut writer, 1);
        write_element(&mut writer, ID_LFE, 0);
        write_silent_ics(&mut writer);
        let buf = finish(writer);

        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.num_channels(), 6);
        assert_eq!(
            frame.speakers,
            [
                Speaker::FrontLeft,
                Speaker::FrontRight,
                Speaker::FrontCenter,
                Speaker::LowFrequency,
                Speaker::BackLeft,
                Speaker::BackRight
            ]
            .map(Some)
        );
        assert!(!decoder.warnings.is_reported(Anomaly::ChannelElementMissing));
    }

    #[test]
    fn missing_element_is_silent() {
        let options = DecoderOptions::new(ChannelOrder::AsCoded, DualMonoMode::Auto, Strictness::Normal);
        let mut decoder = AacDecoder::new(&asc(3), options).unwrap();
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        write_noise_ics(&mut writer);
        let buf = finish(writer);

        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.num_channels(), 3);
        assert!(frame.channels[0].iter().any(|x| *x != 0.0));
        assert!(frame.channels[1].iter().all(|x| *x == 0.0));
        assert!(decoder.warnings.is_reported(Anomaly::ChannelElementMissing));
    }

    #[test]
    fn third_duplicate_element_is_an_error() {
        let mut asc = BitWriter::new();
        asc.write(2, 5).write(3, 4).write(0, 4).write(0, 3);
        asc.write(0, 4);
        write_pce(&mut asc, &[(false, 0)], &[]);
        let asc = asc.into_bytes();
        let mut decoder = AacDecoder::new(&asc, DecoderOptions::default()).unwrap();
        assert_eq!(decoder.num_channels(), 1);

        let mut writer = BitWriter::new();
        for _ in 0..2 {
            write_element(&mut writer, ID_SCE, 0);
            write_silent_ics(&mut writer);
        }
        let buf = finish(writer);
        decoder.decode_frame(&buf).unwrap();
        assert!(decoder.warnings.is_reported(Anomaly::DuplicateElement));

        let mut writer = BitWriter::new();
        for _ in 0..3 {
            write_element(&mut writer, ID_SCE, 0);
            write_silent_ics(&mut writer);
        }
        let buf = finish(writer);
        let err = decoder.decode_frame(&buf).unwrap_err();
        assert!(matches!(
            err,
            DecoderError::DuplicateElement {
                element_type: ElementType::Sce,
                tag: 0
            }
        ));
    }

    #[test]
    fn inband_program_config_is_rolled_back_on_error() {
        let mut decoder = AacDecoder::for_adts(DecoderOptions::default());

        // nothing configured yet
        let mut writer = BitWriter::new();
        write_silent_cpe(&mut writer, 0);
        let err = decoder.decode_frame(&finish(writer)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigConflict);

        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_PCE, 0);
        write_pce(&mut writer, &[(true, 0)], &[]);
        write_silent_cpe(&mut writer, 0);
        let frame = decoder.decode_frame(&finish(writer)).unwrap();
        assert_eq!(frame.num_channels(), 2);
        assert_eq!(decoder.status(), ConfigStatus::Locked);

        // a mono program followed by an element it does not declare
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_PCE, 0);
        write_pce(&mut writer, &[(false, 0)], &[]);
        write_element(&mut writer, ID_SCE, 5);
        write_silent_ics(&mut writer);
        let err = decoder.decode_frame(&finish(writer)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigConflict);
        assert_eq!(decoder.num_channels(), 2);
        assert_eq!(decoder.status(), ConfigStatus::Locked);

        // the stereo configuration still decodes
        let mut writer = BitWriter::new();
        write_silent_cpe(&mut writer, 0);
        let frame = decoder.decode_frame(&finish(writer)).unwrap();
        assert_eq!(frame.num_channels(), 2);
    }

    #[test]
    fn adts_stereo_frame() {
        let mut writer = BitWriter::new();
        writer.write(0xFFF, 12).write(0, 1).write(0, 2).write(1, 1);
        writer.write(1, 2).write(4, 4).write(0, 1).write(2, 3);
        writer.write(0, 4).write(64, 13).write(0x7FF, 11).write(0, 2);
        write_silent_cpe(&mut writer, 0);
        let buf = finish(writer);

        let mut decoder = AacDecoder::for_adts(DecoderOptions::default());
        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.sample_rate, 44100);
        assert_eq!(frame.num_channels(), 2);
        assert_eq!(frame.speakers, [Some(Speaker::FrontLeft), Some(Speaker::FrontRight)]);
        assert_eq!(decoder.stream_params().object_type, AudioObjectType::LowComplexity);
    }

    #[test]
    fn dual_mono_selects_first_channel() {
        let mut writer = BitWriter::new();
        // ADTS header with channel configuration 0 and no program config
        writer.write(0xFFF, 12).write(0, 1).write(0, 2).write(1, 1);
        writer.write(1, 2).write(3, 4).write(0, 1).write(0, 3);
        writer.write(0, 4).write(64, 13).write(0x7FF, 11).write(0, 2);
        write_element(&mut writer, ID_SCE, 0);
        write_noise_ics(&mut writer);
        write_element(&mut writer, ID_SCE, 1);
        write_silent_ics(&mut writer);
        let buf = finish(writer);

        let options = DecoderOptions::new(ChannelOrder::Canonical, DualMonoMode::Left, Strictness::Normal);
        let mut decoder = AacDecoder::for_adts(options);
        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.num_channels(), 2);
        assert!(frame.channels[0].iter().any(|x| *x != 0.0));
        assert_eq!(frame.channels[0], frame.channels[1]);

        let mut decoder = AacDecoder::for_adts(DecoderOptions::default());
        let err = decoder.decode_frame(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigConflict);
    }

    #[test]
    fn truncated_frame_is_exhausted() {
        let mut decoder = decoder(1);
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        write_silent_ics(&mut writer);
        // cut inside the channel stream
        writer.align();
        let mut buf = writer.into_bytes();
        buf.truncate(3);

        let err = decoder.decode_frame(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn fill_and_data_elements_are_skipped() {
        let mut decoder = decoder(1);
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_DSE, 0);
        writer.write(0, 1).write(2, 8).write(0xABCD, 16);
        write_element(&mut writer, ID_FIL, 2);
        writer.write(0, 4).write(0, 12);
        write_element(&mut writer, ID_SCE, 0);
        write_silent_ics(&mut writer);
        let buf = finish(writer);

        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.num_channels(), 1);
        assert!(decoder.dynamic_range().is_none());
    }

    #[test]
    fn error_resilient_low_delay_frame() {
        // ER AAC LD, 48 kHz, stereo, no error resilience tools
        let mut writer = BitWriter::new();
        writer.write(23, 5).write(3, 4).write(2, 4).write(0, 3).write(0, 2);
        writer.align();
        let asc = writer.into_bytes();
        let mut decoder = AacDecoder::new(&asc, DecoderOptions::default()).unwrap();

        let mut writer = BitWriter::new();
        // element tag then the channel pair without an element id
        writer.write(0, 4).write(0, 1);
        write_silent_ics(&mut writer);
        write_silent_ics(&mut writer);
        writer.align();
        let buf = writer.into_bytes();

        let frame = decoder.decode_frame(&buf).unwrap();
        assert_eq!(frame.num_channels(), 2);
        assert_eq!(frame.samples_per_channel, 512);
    }

    // first band of a single band long window stream: noise substituted or zero
    fn write_first_band(writer: &mut BitWriter, noise: bool) {
        if noise {
            writer.write(13, 4).write(1, 5).write(256 + 30, 9);
        } else {
            writer.write(0, 4).write(1, 5);
        }
        writer.write(0, 3);
    }

    // coupling element with a single target, its channel carries one noise band
    fn write_cce(writer: &mut BitWriter, point: CouplingPoint, target_is_pair: bool, target_tag: u32) {
        write_element(writer, ID_CCE, 0);
        writer.write_bool(point == CouplingPoint::AfterImdct).write(0, 3);
        writer.write_bool(target_is_pair).write(target_tag, 4);
        if target_is_pair {
            // both channels with shared gains
            writer.write(0, 2);
        }
        // unit gain steps of 2
        writer.write_bool(point == CouplingPoint::BetweenTnsAndImdct).write(0, 1).write(3, 2);
        write_noise_ics(writer);
    }

    fn coupled_stereo_frame(coupling: Option<(CouplingPoint, bool, u32)>) -> StdVec<u8> {
        let mut writer = BitWriter::new();
        if let Some((point, target_is_pair, target_tag)) = coupling {
            write_cce(&mut writer, point, target_is_pair, target_tag);
        }
        write_silent_cpe(&mut writer, 0);
        finish(writer)
    }

    fn main_profile_frame(noise: bool, prediction: Option<(u32, bool)>) -> StdVec<u8> {
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        writer.write(100, 8);
        writer.write(0, 1).write(0, 2).write(0, 1).write(1, 6);
        match prediction {
            Some((reset_group, used)) => {
                writer.write(1, 1);
                if reset_group > 0 {
                    writer.write(1, 1).write(reset_group, 5);
                } else {
                    writer.write(0, 1);
                }
                writer.write_bool(used);
            }
            None => {
                writer.write(0, 1);
            }
        }
        write_first_band(&mut writer, noise);
        finish(writer)
    }

    fn long_term_prediction_frame(noise: bool, predicted: bool) -> StdVec<u8> {
        let mut writer = BitWriter::new();
        write_element(&mut writer, ID_SCE, 0);
        writer.write(100, 8);
        writer.write(0, 1).write(0, 2).write(0, 1).write(1, 6);
        if predicted {
            // lag of one frame, coefficient 3, band 0 predicted
            writer.write(1, 1).write(1, 1).write(1024, 11).write(3, 3).write(1, 1);
        } else {
            writer.write(0, 1);
        }
        write_first_band(&mut writer, noise);
        finish(writer)
    }

    #[test]
    fn coupling_channel_is_added_at_every_point() {
        let asc = pce_asc(&[(true, 0)], &[0]);
        let uncoupled = decode_all(&asc, &[&coupled_stereo_frame(None)]);
        assert_eq!(uncoupled[0].num_channels(), 2);
        assert!(uncoupled[0].channels.iter().flatten().all(|x| *x == 0.0));

        let points = [
            CouplingPoint::BeforeTns,
            CouplingPoint::BetweenTnsAndImdct,
            CouplingPoint::AfterImdct,
        ];
        let mut coupled = StdVec::new();
        for point in points {
            let mut decoder = AacDecoder::new(&asc, DecoderOptions::default()).unwrap();
            let frame = decoder
                .decode_frame(&coupled_stereo_frame(Some((point, true, 0))))
                .unwrap();
            assert!(!decoder.warnings.is_reported(Anomaly::CouplingTargetMissing));

            assert_eq!(frame.num_channels(), 2);
            assert_ne!(frame, uncoupled[0]);
            assert!(frame.channels[0].iter().any(|x| *x != 0.0));
            assert_eq!(frame.channels[0], frame.channels[1]);
            coupled.push(frame);
        }

        // with unit gain and no noise shaping every point yields the coupling channel itself
        assert_eq!(coupled[0], coupled[1]);
        assert_eq!(coupled[1], coupled[2]);
    }

    #[test]
    fn coupling_into_missing_element_is_reported() {
        let asc = pce_asc(&[(true, 0)], &[0]);
        let mut decoder = AacDecoder::new(&asc, DecoderOptions::default()).unwrap();

        let frame = decoder
            .decode_frame(&coupled_stereo_frame(Some((CouplingPoint::BeforeTns, false, 5))))
            .unwrap();
        assert_eq!(frame.num_channels(), 2);
        assert!(frame.channels.iter().flatten().all(|x| *x == 0.0));
        assert!(decoder.warnings.is_reported(Anomaly::CouplingTargetMissing));
        assert_eq!(decoder.status(), ConfigStatus::Locked);
    }

    #[test]
    fn main_profile_prediction_carries_across_frames() {
        let asc = object_asc(1, 1);
        let history = main_profile_frame(true, None);
        let predicted = main_profile_frame(false, Some((0, true)));
        let unpredicted = main_profile_frame(false, Some((0, false)));
        let reset = main_profile_frame(false, Some((1, true)));

        // predictors without history predict nothing
        let fresh = decode_all(&asc, &[&predicted]);
        assert!(fresh[0].channels[0].iter().all(|x| *x == 0.0));

        let with = decode_all(&asc, &[&history, &history, &predicted]);
        let without = decode_all(&asc, &[&history, &history, &unpredicted]);
        assert_eq!(with[1], without[1]);
        assert_ne!(with[2], without[2]);

        // a group reset takes effect after the prediction of its own frame
        let kept = decode_all(&asc, &[&history, &history, &predicted, &predicted]);
        let cleared = decode_all(&asc, &[&history, &history, &reset, &predicted]);
        assert_eq!(kept[2], cleared[2]);
        assert_ne!(kept[3], cleared[3]);
    }

    #[test]
    fn long_term_prediction_uses_previous_output() {
        let asc = object_asc(4, 1);
        let history = long_term_prediction_frame(true, false);
        let predicted = long_term_prediction_frame(false, true);
        let unpredicted = long_term_prediction_frame(false, false);

        // the history starts out silent
        let fresh = decode_all(&asc, &[&predicted]);
        assert!(fresh[0].channels[0].iter().all(|x| *x == 0.0));

        let with = decode_all(&asc, &[&history, &predicted]);
        let without = decode_all(&asc, &[&history, &unpredicted]);
        assert_eq!(with[0], without[0]);
        assert!(with[0].channels[0].iter().any(|x| *x != 0.0));
        assert_ne!(with[1], without[1]);
    }
}
