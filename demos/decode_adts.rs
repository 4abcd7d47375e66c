use aac_decoder::common::wav::{self, WavError, WavHeader, FULL_WAV_HEADER_LEN};
use aac_decoder::decoder::adts::{AdtsError, AdtsHeader, ADTS_HEADER_LEN};
use aac_decoder::decoder::bit_reader::BitReader;
use aac_decoder::{AacDecoder, DecoderError, DecoderOptions};
use simple_logger::SimpleLogger;
use std::env;
use std::fs::File;
use std::io;
use std::io::prelude::*;

#[macro_use]
extern crate log;

#[derive(Debug)]
pub enum MainError {
    Usage,
    Io(io::Error),
    Wav(WavError),
    Adts(usize, AdtsError),
    Decoder(usize, DecoderError),
}

impl From<io::Error> for MainError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<WavError> for MainError {
    fn from(err: WavError) -> Self {
        Self::Wav(err)
    }
}

fn decode_adts_to_wav(adts_file_name: &str, wav_file_name: &str) -> Result<(), MainError> {
    let mut file = File::open(adts_file_name)?;
    let mut buf_in_full = Vec::new();
    file.read_to_end(&mut buf_in_full)?;
    info!("Read {} bytes from file", buf_in_full.len());

    let mut decoder = AacDecoder::for_adts(DecoderOptions::default());
    let mut data = Vec::new();
    let mut num_channels = 0;
    let mut sample_rate = 0;
    let mut in_cursor = 0;
    let mut frame_index = 0;

    while in_cursor + ADTS_HEADER_LEN <= buf_in_full.len() {
        let mut reader = BitReader::new(&buf_in_full[in_cursor..]);
        let header = AdtsHeader::read(&mut reader).map_err(|e| MainError::Adts(in_cursor, e))?;
        let to_index = (in_cursor + header.frame_len).min(buf_in_full.len());

        let frame = decoder
            .decode_frame(&buf_in_full[in_cursor..to_index])
            .map_err(|e| MainError::Decoder(in_cursor, e))?;
        in_cursor = to_index;
        frame_index += 1;

        if frame.samples_per_channel == 0 {
            continue;
        }
        if num_channels == 0 {
            num_channels = frame.num_channels();
            sample_rate = frame.sample_rate as usize;
            info!("{} channels at {}Hz", num_channels, sample_rate);
        } else if num_channels != frame.num_channels() {
            warn!("Frame {} has {} channels, skipped", frame_index, frame.num_channels());
            continue;
        }

        wav::write_samples(&frame.to_interleaved_i16(), &mut data);

        // log about 20 seconds of audio
        if frame_index % 1000 == 0 {
            info!("Decoding frame: {}", frame_index);
        }
    }
    info!("Decoding frame: {} Complete", frame_index);

    let header = WavHeader::for_pcm_i16(num_channels, sample_rate, data.len() / 2);
    let mut header_buf = [0; FULL_WAV_HEADER_LEN];
    let len = wav::write_header(&header, &mut header_buf)?;

    let mut new_wav_file = File::create(wav_file_name)?;
    new_wav_file.write_all(&header_buf[..len])?;
    new_wav_file.write_all(&data)?;
    Ok(())
}

fn main() -> Result<(), MainError> {
    SimpleLogger::new().init().unwrap();
    info!("AAC decoder started");

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        error!("Usage: decode_adts <input.aac> <output.wav>");
        return Err(MainError::Usage);
    }

    decode_adts_to_wav(&args[1], &args[2])
}
