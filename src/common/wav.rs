use byteorder::{ByteOrder, LittleEndian};

// canonical 44 byte RIFF header for 16 bit PCM output

#[derive(Debug)]
pub enum WavError {
    WriteHeaderBufferTooSmall,
    DataTooLong(usize),
}

pub const RIFF_HEADER_ONLY_LEN: usize = 8;
pub const FULL_WAV_HEADER_LEN: usize = 44;

const PCM_HEADER_LENGTH: u32 = 16;
const AUDIO_FORMAT_PCM: u16 = 1;
const BITS_PER_SAMPLE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub num_channels: usize,
    pub sample_rate: usize,
    /// Number of bytes of interleaved sample data following the header
    pub data_size: usize,
}

impl WavHeader {
    /// Header for `num_samples` interleaved 16 bit samples
    pub fn for_pcm_i16(num_channels: usize, sample_rate: usize, num_samples: usize) -> Self {
        Self {
            num_channels,
            sample_rate,
            data_size: num_samples * BITS_PER_SAMPLE / 8,
        }
    }

    pub fn block_align(&self) -> usize {
        self.num_channels * BITS_PER_SAMPLE / 8
    }

    pub fn byte_rate(&self) -> usize {
        self.sample_rate * self.block_align()
    }
}

pub fn write_header(header: &WavHeader, buf: &mut [u8]) -> Result<usize, WavError> {
    if buf.len() < FULL_WAV_HEADER_LEN {
        return Err(WavError::WriteHeaderBufferTooSmall);
    }
    let riff_size = header.data_size + FULL_WAV_HEADER_LEN - RIFF_HEADER_ONLY_LEN;
    if riff_size > u32::MAX as usize {
        return Err(WavError::DataTooLong(header.data_size));
    }

    buf[..4].copy_from_slice(b"RIFF");
    LittleEndian::write_u32(&mut buf[4..8], riff_size as u32);
    buf[8..12].copy_from_slice(b"WAVE");
    buf[12..16].copy_from_slice(b"fmt ");
    LittleEndian::write_u32(&mut buf[16..20], PCM_HEADER_LENGTH);
    LittleEndian::write_u16(&mut buf[20..22], AUDIO_FORMAT_PCM);
    LittleEndian::write_u16(&mut buf[22..24], header.num_channels as u16);
    LittleEndian::write_u32(&mut buf[24..28], header.sample_rate as u32);
    LittleEndian::write_u32(&mut buf[28..32], header.byte_rate() as u32);
    LittleEndian::write_u16(&mut buf[32..34], header.block_align() as u16);
    LittleEndian::write_u16(&mut buf[34..36], BITS_PER_SAMPLE as u16);
    buf[36..40].copy_from_slice(b"data");
    LittleEndian::write_u32(&mut buf[40..44], header.data_size as u32);

    Ok(FULL_WAV_HEADER_LEN)
}

/// Appends the samples to `buf` as little endian 16 bit words
pub fn write_samples(samples: &[i16], buf: &mut Vec<u8>) {
    let start = buf.len();
    buf.resize(start + samples.len() * 2, 0);
    LittleEndian::write_i16_into(samples, &mut buf[start..]);
}
