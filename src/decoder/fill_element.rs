use bitvec::prelude::*;
use heapless::Vec;

use super::{
    bit_reader::{BitReader, BitReaderError},
    error::{Anomaly, WarnOnce},
};

/// Dynamic range control carries at most 16 bands
pub const MAX_DRC_BANDS: usize = 17;

const MAX_EXCLUDED_CHANNELS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    Fill,
    FillData,
    DataElement,
    DynamicRange,
    SbrData,
    SbrDataCrc,
    Unknown(u8),
}

impl ExtensionType {
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => Self::Fill,
            1 => Self::FillData,
            2 => Self::DataElement,
            11 => Self::DynamicRange,
            13 => Self::SbrData,
            14 => Self::SbrDataCrc,
            _ => Self::Unknown(id),
        }
    }
}

/// One band of dynamic range control
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrcBand {
    /// Top of the band in units of 4 spectral lines
    pub top: u8,
    /// True to attenuate, false to boost
    pub negative: bool,
    pub control: u8,
}

/// Dynamic range control information from the most recent fill element
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DynamicRange {
    pub pce_instance_tag: Option<u8>,
    pub excluded_channels: BitArray<[u64; 1]>,
    pub interpolation_scheme: u8,
    pub prog_ref_level: Option<u8>,
    pub bands: Vec<DrcBand, MAX_DRC_BANDS>,
}

impl DynamicRange {
    /// Reads a dynamic range payload and returns the number of bytes it occupies
    pub fn read(reader: &mut BitReader) -> Result<(Self, usize), BitReaderError> {
        let mut drc = Self::default();
        let mut num_bytes = 1;

        if reader.read_bool()? {
            drc.pce_instance_tag = Some(reader.read(4)? as u8);
            // tag reserved bits
            reader.skip(4)?;
            num_bytes += 1;
        }

        if reader.read_bool()? {
            let mut channel = 0;
            loop {
                for _ in 0..7 {
                    let excluded = reader.read_bool()?;
                    drc.excluded_channels.set(channel, excluded);
                    channel += 1;
                }
                num_bytes += 1;
                if channel >= MAX_EXCLUDED_CHANNELS - 7 || !reader.read_bool()? {
                    break;
                }
            }
        }

        let mut num_bands = 1;
        let mut band_tops = [0u8; MAX_DRC_BANDS];
        if reader.read_bool()? {
            num_bands += reader.read_usize(4)?;
            drc.interpolation_scheme = reader.read(4)? as u8;
            num_bytes += 1;
            for top in band_tops[..num_bands].iter_mut() {
                *top = reader.read(8)? as u8;
                num_bytes += 1;
            }
        } else {
            // a single band spanning the whole spectrum
            band_tops[0] = (1024 / 4 - 1) as u8;
        }

        if reader.read_bool()? {
            drc.prog_ref_level = Some(reader.read(7)? as u8);
            // reserved
            reader.skip(1)?;
            num_bytes += 1;
        }

        for top in &band_tops[..num_bands] {
            let band = DrcBand {
                top: *top,
                negative: reader.read_bool()?,
                control: reader.read(7)? as u8,
            };
            // num_bands never exceeds the capacity
            let _ = drc.bands.push(band);
            num_bytes += 1;
        }

        Ok((drc, num_bytes))
    }

    /// Gain of a band in dB (negative values attenuate)
    pub fn gain_db(band: &DrcBand) -> f32 {
        let db = band.control as f32 * 0.25;
        if band.negative {
            -db
        } else {
            db
        }
    }
}

/// Skips a data stream element (after the element tag)
pub fn skip_data_stream(reader: &mut BitReader) -> Result<(), BitReaderError> {
    let byte_align = reader.read_bool()?;
    let mut count = reader.read_usize(8)?;
    if count == 255 {
        count += reader.read_usize(8)?;
    }
    if byte_align {
        reader.align_to_byte();
    }

    reader.skip(8 * count)
}

/// Reads the payload length of a fill element, the element tag field is the short count
pub fn read_fill_count(reader: &mut BitReader, tag: usize) -> Result<usize, BitReaderError> {
    let mut count = tag;
    if count == 15 {
        count += reader.read_usize(8)?;
        count -= 1;
    }

    let remaining = reader.bits_remaining();
    if remaining < 8 * count {
        return Err(BitReaderError::Exhausted {
            requested: 8 * count,
            remaining,
        });
    }
    Ok(count)
}

/// Walks the extension payloads of a fill element
///
/// # Arguments
///
/// * `reader` - Positioned after the fill count
/// * `count` - Payload length in bytes
/// * `drc` - Receives the dynamic range information if the fill element carries any
/// * `warnings` - Latch for the skipped payload diagnostic
pub fn read_fill_element(
    reader: &mut BitReader,
    mut count: usize,
    drc: &mut Option<DynamicRange>,
    warnings: &mut WarnOnce,
) -> Result<(), BitReaderError> {
    while count > 0 {
        let consumed = read_extension_payload(reader, count, drc, warnings)?;
        count = count.saturating_sub(consumed);
    }

    Ok(())
}

// returns the number of bytes consumed, including the 4 bit type
fn read_extension_payload(
    reader: &mut BitReader,
    count: usize,
    drc: &mut Option<DynamicRange>,
    warnings: &mut WarnOnce,
) -> Result<usize, BitReaderError> {
    let extension_type = ExtensionType::from_id(reader.read(4)? as u8);
    log::debug!("extension payload {:?} of {} bytes", extension_type, count);

    match extension_type {
        ExtensionType::DynamicRange => {
            let (range, num_bytes) = DynamicRange::read(reader)?;
            *drc = Some(range);
            Ok(num_bytes)
        }
        ExtensionType::SbrData | ExtensionType::SbrDataCrc => {
            warnings.report(Anomaly::ExtensionPayloadSkipped);
            reader.skip(8 * count - 4)?;
            Ok(count)
        }
        ExtensionType::Fill | ExtensionType::FillData | ExtensionType::DataElement | ExtensionType::Unknown(_) => {
            reader.skip(8 * count - 4)?;
            Ok(count)
        }
    }
}
