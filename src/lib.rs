// Copyright 2022 David Haig
// Licensed under the Apache License, Version 2.0 (the "License");
//

//! A block based transform audio decoder for MPEG-4 AAC raw data blocks.
//!
//! The decoder is organised as a pipeline with one module per stage: bit reading, huffman
//! codebooks, scalefactors, spectral data, joint stereo and coupling, prediction and noise
//! shaping, inverse transform with overlap-add and finally channel configuration.
//! Start with [`decoder::aac_decoder::AacDecoder`].

pub mod common {
    pub mod complex;
    pub mod config;
    pub mod constants;
    pub mod wav;
}

pub mod tables {
    pub mod band_offsets;
    pub mod huffman;
    pub mod windows;
}

pub mod decoder {
    pub mod aac_decoder;
    pub mod adts;
    pub mod audio_specific_config;
    pub mod bit_reader;
    pub mod channel_config;
    pub mod codebook;
    pub mod coupling;
    pub mod error;
    pub mod fill_element;
    pub mod ics_info;
    pub mod individual_channel_stream;
    pub mod long_term_prediction;
    pub mod main_prediction;
    pub mod modified_dct;
    pub mod output_scaling;
    pub mod program_config;
    pub mod pulse_data;
    pub mod scalefactors;
    pub mod section_data;
    pub mod spectral_data;
    pub mod stereo;
    pub mod temporal_noise_shaping;
    pub mod windowing;

    #[cfg(test)]
    pub(crate) mod test_util;
}

pub use common::config::{ChannelOrder, DecoderOptions, DualMonoMode, Strictness};
pub use decoder::aac_decoder::{AacDecoder, AudioFrame};
pub use decoder::error::{DecoderError, ErrorKind};
