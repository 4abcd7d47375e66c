use super::{
    bit_reader::{BitReader, BitReaderError},
    error::ErrorKind,
};
use crate::common::config::{AudioObjectType, SamplingFrequency, StreamParams};

/// Syncword at the start of every ADTS frame
pub const ADTS_SYNCWORD: u32 = 0xFFF;

/// Size of the header without the optional CRC
pub const ADTS_HEADER_LEN: usize = 7;

#[derive(Debug)]
pub enum AdtsError {
    MissingSyncword,
    InvalidSamplingIndex(usize),
    FrameTooShort(usize),
    BitReader(BitReaderError),
}

impl AdtsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSyncword | Self::InvalidSamplingIndex(_) | Self::FrameTooShort(_) => {
                ErrorKind::InvalidSyntax
            }
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for AdtsError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

/// Fixed and variable ADTS header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// MPEG-2 (true) or MPEG-4 (false) identifier
    pub mpeg2: bool,
    pub crc_present: bool,
    pub object_type: AudioObjectType,
    pub freq: SamplingFrequency,

    /// channel_configuration index, 0 when the layout is given by a program config element
    pub channel_config: u8,

    /// Length of the frame in bytes including the header
    pub frame_len: usize,
    pub buffer_fullness: u16,

    /// Number of raw data blocks in the frame
    pub num_raw_blocks: usize,
}

impl AdtsHeader {
    /// True if the reader is positioned at an ADTS syncword
    pub fn is_present(reader: &BitReader) -> bool {
        matches!(reader.peek(12), Ok(ADTS_SYNCWORD))
    }

    /// Reads the header and skips the CRC if one is present
    pub fn read(reader: &mut BitReader) -> Result<Self, AdtsError> {
        if reader.read(12)? != ADTS_SYNCWORD {
            return Err(AdtsError::MissingSyncword);
        }
        let mpeg2 = reader.read_bool()?;
        // layer
        reader.skip(2)?;
        let crc_present = !reader.read_bool()?;
        let object_type = AudioObjectType::from_id(reader.read(2)? as u8 + 1);
        let sampling_index = reader.read_usize(4)?;
        let freq = SamplingFrequency::from_index(sampling_index).ok_or(AdtsError::InvalidSamplingIndex(sampling_index))?;
        // private bit
        reader.skip(1)?;
        let channel_config = reader.read(3)? as u8;
        // original/copy, home, copyright id bit and start
        reader.skip(4)?;

        let frame_len = reader.read_usize(13)?;
        if frame_len < ADTS_HEADER_LEN {
            return Err(AdtsError::FrameTooShort(frame_len));
        }
        let buffer_fullness = reader.read(11)? as u16;
        let num_raw_blocks = reader.read_usize(2)? + 1;

        if crc_present {
            reader.skip(16)?;
        }

        Ok(Self {
            mpeg2,
            crc_present,
            object_type,
            freq,
            channel_config,
            frame_len,
            buffer_fullness,
            num_raw_blocks,
        })
    }

    pub fn params(&self) -> StreamParams {
        StreamParams::new(self.object_type, self.freq, false)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::decoder::test_util::BitWriter;

    fn write_header(writer: &mut BitWriter, profile: u32, sampling_index: u32, channel_config: u32, frame_len: u32) {
        writer.write(0xFFF, 12).write(0, 1).write(0, 2).write(1, 1);
        writer.write(profile, 2).write(sampling_index, 4).write(0, 1).write(channel_config, 3);
        writer.write(0, 4).write(frame_len, 13).write(0x7FF, 11).write(0, 2);
    }

    #[test]
    fn read_lc_stereo_header() {
        let mut writer = BitWriter::new();
        write_header(&mut writer, 1, 4, 2, 371);
        let buf = writer.into_bytes();
        assert_eq!(buf.len(), ADTS_HEADER_LEN);

        let mut reader = BitReader::new(&buf);
        assert!(AdtsHeader::is_present(&reader));
        let header = AdtsHeader::read(&mut reader).unwrap();
        assert_eq!(reader.position(), 56);
        assert_eq!(header.object_type, AudioObjectType::LowComplexity);
        assert_eq!(header.freq.hz, 44100);
        assert_eq!(header.channel_config, 2);
        assert_eq!(header.frame_len, 371);
        assert_eq!(header.buffer_fullness, 0x7FF);
        assert_eq!(header.num_raw_blocks, 1);
        assert!(!header.crc_present);
    }

    #[test]
    fn crc_is_skipped() {
        let mut writer = BitWriter::new();
        writer.write(0xFFF, 12).write(1, 1).write(0, 2).write(0, 1);
        writer.write(0, 2).write(3, 4).write(0, 1).write(1, 3);
        writer.write(0, 4).write(9, 13).write(0, 11).write(0, 2);
        writer.write(0xABCD, 16);
        let buf = writer.into_bytes();

        let mut reader = BitReader::new(&buf);
        let header = AdtsHeader::read(&mut reader).unwrap();
        assert!(header.crc_present);
        assert!(header.mpeg2);
        assert_eq!(header.object_type, AudioObjectType::Main);
        assert_eq!(reader.position(), 72);
    }

    #[test]
    fn invalid_headers() {
        let mut writer = BitWriter::new();
        write_header(&mut writer, 1, 13, 2, 100);
        let buf = writer.into_bytes();
        let err = AdtsHeader::read(&mut BitReader::new(&buf)).unwrap_err();
        assert!(matches!(err, AdtsError::InvalidSamplingIndex(13)));

        let mut writer = BitWriter::new();
        write_header(&mut writer, 1, 3, 2, 6);
        let buf = writer.into_bytes();
        let err = AdtsHeader::read(&mut BitReader::new(&buf)).unwrap_err();
        assert!(matches!(err, AdtsError::FrameTooShort(6)));

        let reader = BitReader::new(&[0x21, 0x10]);
        assert!(!AdtsHeader::is_present(&reader));
        let err = AdtsHeader::read(&mut BitReader::new(&[0xFF, 0xE0])).unwrap_err();
        assert!(matches!(err, AdtsError::MissingSyncword));
        assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
    }
}
