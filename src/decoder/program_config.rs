use super::{
    bit_reader::{BitReader, BitReaderError},
    channel_config::{ChannelPosition, ElementType, LayoutEntry, LayoutMap},
    error::ErrorKind,
};

#[derive(Debug)]
pub enum ProgramConfigError {
    /// The element lists announced by the counts do not fit in the remaining payload
    Truncated { required: usize, remaining: usize },
    BitReader(BitReaderError),
}

impl ProgramConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Truncated { .. } => ErrorKind::Exhausted,
            Self::BitReader(err) => err.kind(),
        }
    }
}

impl From<BitReaderError> for ProgramConfigError {
    fn from(err: BitReaderError) -> Self {
        Self::BitReader(err)
    }
}

/// Matrix downmix signalled for the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixMixdown {
    pub index: u8,
    pub pseudo_surround: bool,
}

/// program_config_element: an explicit list of the elements of a program and their positions
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    /// Two bit object type (profile) of the program
    pub profile: u8,
    pub sampling_index: usize,

    /// Front, side, back and low frequency channel elements followed by the coupling
    /// channel elements, in declaration order
    pub layout: LayoutMap,

    pub mono_mixdown_tag: Option<u8>,
    pub stereo_mixdown_tag: Option<u8>,
    pub matrix_mixdown: Option<MatrixMixdown>,
}

impl ProgramConfig {
    /// Reads a program config element (after the element tag)
    ///
    /// # Arguments
    ///
    /// * `reader` - Positioned at the object type field
    /// * `byte_align_ref` - Bit position the comment field is byte aligned against (the
    ///   start of the raw data block, or of the AudioSpecificConfig)
    pub fn read(reader: &mut BitReader, byte_align_ref: usize) -> Result<Self, ProgramConfigError> {
        let profile = reader.read(2)? as u8;
        let sampling_index = reader.read_usize(4)?;

        let num_front = reader.read_usize(4)?;
        let num_side = reader.read_usize(4)?;
        let num_back = reader.read_usize(4)?;
        let num_lfe = reader.read_usize(2)?;
        let num_assoc_data = reader.read_usize(3)?;
        let num_cc = reader.read_usize(4)?;

        let mono_mixdown_tag = read_optional(reader, 4)?;
        let stereo_mixdown_tag = read_optional(reader, 4)?;
        let matrix_mixdown = if reader.read_bool()? {
            Some(MatrixMixdown {
                index: reader.read(2)? as u8,
                pseudo_surround: reader.read_bool()?,
            })
        } else {
            None
        };

        let required = 5 * (num_front + num_side + num_back + num_cc) + 4 * (num_lfe + num_assoc_data + num_cc);
        let remaining = reader.bits_remaining();
        if remaining < required {
            return Err(ProgramConfigError::Truncated { required, remaining });
        }

        // at most 15 * 3 + 3 + 15 entries, within the layout capacity
        let mut layout = LayoutMap::new();
        for (position, count) in [
            (ChannelPosition::Front, num_front),
            (ChannelPosition::Side, num_side),
            (ChannelPosition::Back, num_back),
        ] {
            for _ in 0..count {
                let element_type = if reader.read_bool()? { ElementType::Cpe } else { ElementType::Sce };
                let tag = reader.read_usize(4)?;
                let _ = layout.push(LayoutEntry::new(element_type, tag, position));
            }
        }
        for _ in 0..num_lfe {
            let tag = reader.read_usize(4)?;
            let _ = layout.push(LayoutEntry::new(ElementType::Lfe, tag, ChannelPosition::Lfe));
        }

        reader.skip(4 * num_assoc_data)?;

        for _ in 0..num_cc {
            // independently switched flag, the coupling element carries it again
            reader.skip(1)?;
            let tag = reader.read_usize(4)?;
            let _ = layout.push(LayoutEntry::new(ElementType::Cce, tag, ChannelPosition::Coupling));
        }

        reader.align_relative_to(byte_align_ref);

        let comment_len = reader.read_usize(8)?;
        reader.skip(8 * comment_len)?;

        Ok(Self {
            profile,
            sampling_index,
            layout,
            mono_mixdown_tag,
            stereo_mixdown_tag,
            matrix_mixdown,
        })
    }

    /// Number of output channels of the program
    pub fn num_channels(&self) -> usize {
        self.layout
            .iter()
            .filter(|entry| entry.position != ChannelPosition::Coupling)
            .map(|entry| entry.element_type.num_channels())
            .sum()
    }
}

fn read_optional(reader: &mut BitReader, num_bits: usize) -> Result<Option<u8>, BitReaderError> {
    Ok(if reader.read_bool()? {
        Some(reader.read(num_bits)? as u8)
    } else {
        None
    })
}
