use heapless::Vec;

use super::error::{Anomaly, ErrorKind, WarnOnce};
use crate::common::{
    config::{ChannelOrder, StreamParams},
    constants::{MAX_CHANNELS, MAX_ELEM_ID},
};

/// Max number of elements in a layout (every element type with every tag)
pub const MAX_LAYOUT_ENTRIES: usize = 4 * MAX_ELEM_ID;

pub type LayoutMap = Vec<LayoutEntry, MAX_LAYOUT_ENTRIES>;

// number of elements in each default channel configuration (index 0 means "from a PCE")
const TAGS_PER_CONFIG: [usize; 16] = [0, 1, 1, 2, 3, 3, 4, 5, 0, 0, 0, 5, 5, 16, 5, 0];

#[derive(Debug)]
pub enum ChannelConfigError {
    InvalidChannelConfiguration(u8),
    TooManyChannels(usize),
    TooManyElements(ElementType),
    ElementNotAllocated { element_type: ElementType, tag: usize },
    NoChannelsConfigured,
    TrialPending,
}

impl ChannelConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidChannelConfiguration(_) => ErrorKind::InvalidSyntax,
            Self::TooManyElements(_) => ErrorKind::MissingFeature,
            Self::TooManyChannels(_)
            | Self::ElementNotAllocated { .. }
            | Self::NoChannelsConfigured
            | Self::TrialPending => ErrorKind::ConfigConflict,
        }
    }
}

/// Syntactic element types that carry channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// single_channel_element
    Sce,
    /// channel_pair_element
    Cpe,
    /// coupling_channel_element
    Cce,
    /// lfe_channel_element
    Lfe,
}

impl ElementType {
    pub const ALL: [Self; 4] = [Self::Sce, Self::Cpe, Self::Cce, Self::Lfe];

    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Sce),
            1 => Some(Self::Cpe),
            2 => Some(Self::Cce),
            3 => Some(Self::Lfe),
            _ => None,
        }
    }

    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub const fn num_channels(&self) -> usize {
        match self {
            Self::Cpe => 2,
            _ => 1,
        }
    }
}

/// Position class an element is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPosition {
    Front,
    Side,
    Back,
    Lfe,
    /// Coupling channels produce no output
    Coupling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub element_type: ElementType,
    pub tag: usize,
    pub position: ChannelPosition,
}

impl LayoutEntry {
    pub const fn new(element_type: ElementType, tag: usize, position: ChannelPosition) -> Self {
        Self {
            element_type,
            tag,
            position,
        }
    }
}

/// Loudspeaker positions in canonical output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Speaker {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    FrontLeftOfCenter,
    FrontRightOfCenter,
    BackCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopBackLeft,
    TopBackCenter,
    TopBackRight,
    LowFrequency2,
    TopSideLeft,
    TopSideRight,
    BottomFrontCenter,
    BottomFrontLeft,
    BottomFrontRight,
}

impl Speaker {
    /// Bit of the speaker in a channel mask (WAVEFORMATEXTENSIBLE bits, extended)
    pub const fn mask(&self) -> u64 {
        let bit = match self {
            Self::LowFrequency2 => 35,
            Self::TopSideLeft => 36,
            Self::TopSideRight => 37,
            Self::BottomFrontCenter => 38,
            Self::BottomFrontLeft => 39,
            Self::BottomFrontRight => 40,
            x => *x as u64,
        };
        1 << bit
    }
}

// every speaker is present in a 22.2 layout
const LAYOUT_22_2: u64 = (0x3F << 35) | 0x3_FFFF;

use Speaker::*;

#[derive(Debug, Clone, Copy)]
enum MapSlot {
    Speaker(Speaker),
    /// Odd channel count handled by the centre slot of the last pair
    Unused,
    Invalid,
}

impl MapSlot {
    fn speaker(&self) -> Option<Speaker> {
        match self {
            Self::Speaker(speaker) => Some(*speaker),
            _ => None,
        }
    }
}

const fn s(speaker: Speaker) -> MapSlot {
    MapSlot::Speaker(speaker)
}

const U: MapSlot = MapSlot::Unused;
const X: MapSlot = MapSlot::Invalid;

// speakers per height layer and position class: slot 0 is the centre of an odd channel count,
// slots 1..5 are consecutive pairs from the inside out, slot 5 is the centre behind the pairs
const SPEAKER_MAP: [[[MapSlot; 6]; 4]; 3] = [
    [
        [s(FrontCenter), s(FrontLeftOfCenter), s(FrontRightOfCenter), s(FrontLeft), s(FrontRight), X],
        [U, s(SideLeft), s(SideRight), X, X, X],
        [U, s(SideLeft), s(SideRight), s(BackLeft), s(BackRight), s(BackCenter)],
        [s(LowFrequency), s(LowFrequency2), X, X, X, X],
    ],
    [
        [s(TopFrontCenter), X, X, s(TopFrontLeft), s(TopFrontRight), X],
        [U, s(TopSideLeft), s(TopSideRight), X, X, s(TopCenter)],
        [U, X, X, s(TopBackLeft), s(TopBackRight), s(TopBackCenter)],
        [X, X, X, X, X, X],
    ],
    [
        [s(BottomFrontCenter), X, X, s(BottomFrontLeft), s(BottomFrontRight), X],
        [X, X, X, X, X, X],
        [X, X, X, X, X, X],
        [X, X, X, X, X, X],
    ],
];

use ChannelPosition::{Back as B, Front as F, Lfe as L, Side as S};
use ElementType::{Cpe, Lfe, Sce};

const fn e(element_type: ElementType, tag: usize, position: ChannelPosition) -> LayoutEntry {
    LayoutEntry::new(element_type, tag, position)
}

const LAYOUT_1: [LayoutEntry; 1] = [e(Sce, 0, F)];
const LAYOUT_2: [LayoutEntry; 1] = [e(Cpe, 0, F)];
const LAYOUT_3: [LayoutEntry; 2] = [e(Sce, 0, F), e(Cpe, 0, F)];
const LAYOUT_4: [LayoutEntry; 3] = [e(Sce, 0, F), e(Cpe, 0, F), e(Sce, 1, B)];
const LAYOUT_5: [LayoutEntry; 3] = [e(Sce, 0, F), e(Cpe, 0, F), e(Cpe, 1, B)];
const LAYOUT_6: [LayoutEntry; 4] = [e(Sce, 0, F), e(Cpe, 0, F), e(Cpe, 1, B), e(Lfe, 0, L)];
const LAYOUT_7: [LayoutEntry; 5] = [e(Sce, 0, F), e(Cpe, 0, F), e(Cpe, 1, F), e(Cpe, 2, B), e(Lfe, 0, L)];
const LAYOUT_11: [LayoutEntry; 5] = [e(Sce, 0, F), e(Cpe, 0, F), e(Cpe, 1, B), e(Sce, 1, B), e(Lfe, 0, L)];
const LAYOUT_12: [LayoutEntry; 5] = [e(Sce, 0, F), e(Cpe, 0, F), e(Cpe, 1, S), e(Cpe, 2, B), e(Lfe, 0, L)];
const LAYOUT_13: [LayoutEntry; 16] = [
    e(Sce, 0, F),
    e(Cpe, 0, F),
    e(Cpe, 1, F),
    e(Cpe, 2, B),
    e(Cpe, 3, B),
    e(Sce, 1, B),
    e(Lfe, 0, L),
    e(Lfe, 1, L),
    // top layer
    e(Sce, 2, F),
    e(Cpe, 4, F),
    e(Cpe, 5, S),
    e(Sce, 3, S),
    e(Cpe, 6, B),
    e(Sce, 4, B),
    // bottom layer
    e(Sce, 5, F),
    e(Cpe, 7, F),
];
const LAYOUT_14: [LayoutEntry; 5] = [e(Sce, 0, F), e(Cpe, 0, F), e(Cpe, 1, B), e(Lfe, 0, L), e(Cpe, 2, F)];

/// Element layout of a channel_configuration index exactly as defined (no compatibility fixes)
pub fn layout_table(channel_config: u8) -> Option<&'static [LayoutEntry]> {
    let layout: &'static [LayoutEntry] = match channel_config {
        1 => &LAYOUT_1,
        2 => &LAYOUT_2,
        3 => &LAYOUT_3,
        4 => &LAYOUT_4,
        5 => &LAYOUT_5,
        6 => &LAYOUT_6,
        7 => &LAYOUT_7,
        11 => &LAYOUT_11,
        12 => &LAYOUT_12,
        13 => &LAYOUT_13,
        14 => &LAYOUT_14,
        _ => return None,
    };
    Some(layout)
}

/// Layout of a channel_configuration index. Configuration 7 is defined as 7.1 with front wide
/// channels but encoders commonly use it for 7.1 with side channels, so unless `strict` is set
/// the second front pair is moved to the back.
pub fn default_layout(channel_config: u8, strict: bool, warnings: &mut WarnOnce) -> Result<LayoutMap, ChannelConfigError> {
    let table = layout_table(channel_config).ok_or(ChannelConfigError::InvalidChannelConfiguration(channel_config))?;
    let mut layout = LayoutMap::new();
    // capacity covers the largest table
    for entry in table {
        let _ = layout.push(*entry);
    }

    if channel_config == 7 && !strict {
        layout[2].position = ChannelPosition::Back;
        warnings.report(Anomaly::Assumed71Layout);
    }

    Ok(layout)
}

/// Layout for a stereo program carried as two independent single channel elements
pub fn dual_mono_layout() -> LayoutMap {
    let mut layout = LayoutMap::new();
    let _ = layout.push(e(Sce, 0, F));
    let _ = layout.push(e(Sce, 1, F));
    layout
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigStatus {
    None,
    /// Configured by a program config element of the current frame
    TrialFromInband,
    /// Configured by a stream header (AudioSpecificConfig, ADTS or an implied layout change)
    TrialFromHeader,
    /// At least one frame decoded successfully with this configuration
    Locked,
}

/// Storage location of a decoded element: element type and instance index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSlot {
    pub element_type: ElementType,
    pub index: usize,
}

/// One output channel: the element (and channel of a pair) it is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChannel {
    pub slot: ElementSlot,
    pub channel: usize,
    pub speaker: Option<Speaker>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub status: ConfigStatus,
    pub params: StreamParams,

    /// channel_configuration index, 0 when the layout comes from a program config element
    pub channel_config: u8,

    /// Layout as declared (before reordering)
    pub layout: LayoutMap,

    /// Output channels in output order
    pub channels: Vec<OutputChannel, MAX_CHANNELS>,

    // element tag to instance index, per element type (program config layouts)
    tag_map: [[Option<usize>; MAX_ELEM_ID]; 4],
    allocated: [[bool; MAX_ELEM_ID]; 4],
}

impl OutputConfig {
    pub fn new(params: StreamParams) -> Self {
        Self {
            status: ConfigStatus::None,
            params,
            channel_config: 0,
            layout: LayoutMap::new(),
            channels: Vec::new(),
            tag_map: [[None; MAX_ELEM_ID]; 4],
            allocated: [[false; MAX_ELEM_ID]; 4],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// True if the layout has storage for the element instance
    pub fn is_allocated(&self, slot: ElementSlot) -> bool {
        slot.index < MAX_ELEM_ID && self.allocated[slot.element_type.index()][slot.index]
    }

    // instance indices are assigned per element type in declaration order, the output order
    // comes from the speaker assignment (or the declaration order)
    fn configure(&mut self, layout: &[LayoutEntry], order: ChannelOrder) -> Result<(), ChannelConfigError> {
        let total: usize = layout
            .iter()
            .filter(|entry| entry.position != ChannelPosition::Coupling)
            .map(|entry| entry.element_type.num_channels())
            .sum();
        if total > MAX_CHANNELS {
            return Err(ChannelConfigError::TooManyChannels(total));
        }

        let mut tag_map = [[None; MAX_ELEM_ID]; 4];
        let mut allocated = [[false; MAX_ELEM_ID]; 4];
        let mut type_counts = [0; 4];
        for entry in layout {
            let type_index = entry.element_type.index();
            let index = type_counts[type_index];
            if index >= MAX_ELEM_ID {
                return Err(ChannelConfigError::TooManyElements(entry.element_type));
            }
            type_counts[type_index] += 1;
            tag_map[type_index][entry.tag] = Some(index);
            allocated[type_index][index] = true;
        }

        let assigned = match order {
            ChannelOrder::Canonical => sniff_channel_order(layout),
            ChannelOrder::AsCoded => None,
        };
        let ordered: Vec<Assignment, MAX_LAYOUT_ENTRIES> = match assigned {
            Some(assigned) => assigned,
            None => layout.iter().map(|entry| Assignment::unassigned(*entry)).collect(),
        };

        let mut channels = Vec::new();
        for assignment in ordered.iter().filter(|a| a.entry.position != ChannelPosition::Coupling) {
            let entry = assignment.entry;
            let slot = ElementSlot {
                element_type: entry.element_type,
                index: tag_map[entry.element_type.index()][entry.tag].unwrap_or(0),
            };
            for channel in 0..entry.element_type.num_channels() {
                // total checked above
                let _ = channels.push(OutputChannel {
                    slot,
                    channel,
                    speaker: assignment.speakers[channel],
                });
            }
        }

        self.layout = layout.iter().copied().collect();
        self.channels = channels;
        self.tag_map = tag_map;
        self.allocated = allocated;
        Ok(())
    }
}

/// The active output configuration and the last one that decoded successfully. A new layout
/// is tried on top of the saved one and either committed once a frame decodes or rolled back.
#[derive(Debug, Clone)]
pub struct OutputConfigHolder {
    current: OutputConfig,
    saved: OutputConfig,
    order: ChannelOrder,

    // elements of the current frame mapped by position (indexed channel configurations)
    elements_mapped: usize,
}

impl OutputConfigHolder {
    pub fn new(params: StreamParams, order: ChannelOrder) -> Self {
        Self {
            current: OutputConfig::new(params),
            saved: OutputConfig::new(params),
            order,
            elements_mapped: 0,
        }
    }

    pub fn current(&self) -> &OutputConfig {
        &self.current
    }

    pub fn saved(&self) -> &OutputConfig {
        &self.saved
    }

    /// Updates the stream parameters of the active configuration (e.g. from an ADTS header)
    pub fn set_params(&mut self, params: StreamParams) {
        self.current.params = params;
    }

    pub fn set_channel_config(&mut self, channel_config: u8) {
        self.current.channel_config = channel_config;
    }

    /// Saves the active configuration if it is locked (or nothing was saved yet) and marks the
    /// active configuration as unconfirmed. Returns true if it was saved.
    pub fn push(&mut self) -> bool {
        let pushed = self.current.status == ConfigStatus::Locked || self.saved.status == ConfigStatus::None;
        if pushed {
            self.saved = self.current.clone();
        }
        self.current.status = ConfigStatus::None;
        pushed
    }

    /// Locks the active configuration after a frame decoded audio with it
    pub fn commit(&mut self) {
        if self.current.status != ConfigStatus::None {
            self.current.status = ConfigStatus::Locked;
        }
    }

    /// Restores the saved configuration if the active one is not locked. Returns true if the
    /// configuration changed.
    pub fn rollback(&mut self) -> bool {
        if self.current.status != ConfigStatus::Locked && self.saved.status != ConfigStatus::None {
            self.current = self.saved.clone();
            true
        } else {
            false
        }
    }

    /// Makes `layout` the active layout
    pub fn configure(
        &mut self,
        layout: &[LayoutEntry],
        channel_config: u8,
        status: ConfigStatus,
    ) -> Result<(), ChannelConfigError> {
        self.current.configure(layout, self.order)?;
        self.current.channel_config = channel_config;
        self.current.status = status;
        Ok(())
    }

    pub fn start_frame(&mut self) {
        self.elements_mapped = 0;
    }

    /// Finds the storage of an element of the current frame. Program config layouts are
    /// addressed by tag. Indexed configurations are addressed by the position of the element
    /// in the frame, which also repairs the layouts of a few known broken encoders.
    pub fn map_element(
        &mut self,
        element_type: ElementType,
        tag: usize,
        strict: bool,
        warnings: &mut WarnOnce,
    ) -> Result<ElementSlot, ChannelConfigError> {
        let not_allocated = ChannelConfigError::ElementNotAllocated { element_type, tag };

        if self.current.channel_config == 0 {
            return self.current.tag_map[element_type.index()]
                .get(tag)
                .copied()
                .flatten()
                .map(|index| ElementSlot { element_type, index })
                .ok_or(not_allocated);
        }

        // stereo signalled as mono and the other way round
        if self.elements_mapped == 0 && element_type == Cpe && self.current.channel_config == 1 {
            log::debug!("mono with CPE");
            self.push();
            let layout = default_layout(2, strict, warnings)?;
            self.configure(&layout, 2, ConfigStatus::TrialFromHeader)?;
        }
        if self.elements_mapped == 0 && element_type == Sce && self.current.channel_config == 2 {
            log::debug!("stereo with SCE");
            self.push();
            self.configure(&dual_mono_layout(), 2, ConfigStatus::TrialFromHeader)?;
        }

        let slot = self.map_by_position(element_type, tag, warnings).ok_or(not_allocated)?;
        if !self.current.is_allocated(slot) {
            return Err(ChannelConfigError::ElementNotAllocated { element_type, tag });
        }
        self.elements_mapped += 1;
        Ok(slot)
    }

    // each rule applies to its configuration and every configuration listed before it
    fn map_by_position(&self, element_type: ElementType, tag: usize, warnings: &mut WarnOnce) -> Option<ElementSlot> {
        let channel_config = self.current.channel_config;
        let mapped = self.elements_mapped;
        let last = TAGS_PER_CONFIG[channel_config as usize].saturating_sub(1);
        let slot = |element_type, index| Some(ElementSlot { element_type, index });

        let rank = match channel_config {
            14 => 0,
            13 => 1,
            12 | 7 => 2,
            11 => 3,
            6 => 4,
            5 => 5,
            4 => 6,
            3 | 2 => 7,
            1 => 8,
            _ => return None,
        };

        if rank == 0 && mapped > 2 && ((element_type == Cpe && tag < 3) || (element_type == Lfe && tag < 1)) {
            return slot(element_type, tag);
        }
        if rank <= 1
            && mapped > 3
            && ((element_type == Cpe && tag < 8) || (element_type == Sce && tag < 6) || (element_type == Lfe && tag < 2))
        {
            return slot(element_type, tag);
        }
        if rank <= 2 && mapped == 3 && element_type == Cpe {
            return slot(Cpe, 2);
        }
        if rank <= 3 && mapped == 3 && element_type == Sce {
            return slot(Sce, 1);
        }
        // 5.1 coded as SCE CPE CPE SCE
        if rank <= 4 && mapped == last && (element_type == Lfe || element_type == Sce) {
            if !(element_type == Lfe && tag == 0) {
                warnings.report(Anomaly::LayoutRemapped);
            }
            return slot(Lfe, 0);
        }
        if rank <= 5 && mapped == 2 && element_type == Cpe {
            return slot(Cpe, 1);
        }
        if rank <= 6 {
            // 4.0 coded as SCE CPE LFE
            if mapped == last && (element_type == Lfe || element_type == Sce) {
                if !(element_type == Sce && tag == 1) {
                    warnings.report(Anomaly::LayoutRemapped);
                }
                return slot(Sce, 1);
            }
            if mapped == 2 && channel_config == 4 && element_type == Sce {
                return slot(Sce, 1);
            }
        }
        if rank <= 7 {
            if mapped == (channel_config != 2) as usize && element_type == Cpe {
                return slot(Cpe, 0);
            } else if mapped == 1 && channel_config == 2 && element_type == Sce {
                return slot(Sce, 1);
            }
        }
        if mapped == 0 && element_type == Sce {
            return slot(Sce, 0);
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct Assignment {
    entry: LayoutEntry,
    speakers: [Option<Speaker>; 2],
}

impl Assignment {
    fn unassigned(entry: LayoutEntry) -> Self {
        Self {
            entry,
            speakers: [None; 2],
        }
    }

    fn mask(&self) -> u64 {
        self.speakers.iter().flatten().fold(0, |mask, speaker| mask | speaker.mask())
    }
}

// Channels declared in consecutive elements of one position class. A single channel element
// that is not paired with a following one is only valid as the centre of the front, before
// any pair.
fn count_paired_channels(layout: &[LayoutEntry], position: ChannelPosition, current: usize) -> Option<usize> {
    let mut num_channels = 0;
    let mut first_cpe = false;
    let mut sce_parity = false;

    for entry in layout[current..].iter().take_while(|entry| entry.position == position) {
        if entry.element_type == Cpe {
            if sce_parity {
                if position == ChannelPosition::Front && !first_cpe {
                    sce_parity = false;
                } else {
                    return None;
                }
            }
            num_channels += 2;
            first_cpe = true;
        } else {
            num_channels += 1;
            sce_parity ^= position != ChannelPosition::Lfe;
        }
    }

    if sce_parity && position == ChannelPosition::Front && first_cpe {
        return None;
    }
    Some(num_channels)
}

// Assigns speakers to the run of elements of one position class starting at the end of
// `assigned`. Returns None if the layout can not be mapped at all.
fn assign_channels(
    layout: &[LayoutEntry],
    assigned: &mut Vec<Assignment, MAX_LAYOUT_ENTRIES>,
    layer: usize,
    position: ChannelPosition,
) -> Option<()> {
    let mut i = assigned.len();
    let mut num_channels = match count_paired_channels(layout, position, i) {
        Some(n) if n <= 5 => n,
        _ => return Some(()),
    };
    let map = &SPEAKER_MAP[layer][position as usize];

    let mut push = |entry: LayoutEntry, left: Speaker, right: Option<Speaker>| {
        assigned
            .push(Assignment {
                entry,
                speakers: [Some(left), right],
            })
            .ok()
    };

    if position == ChannelPosition::Lfe {
        for slot in map.iter().take(num_channels) {
            push(*layout.get(i)?, slot.speaker()?, None)?;
            i += 1;
        }
        return Some(());
    }

    while num_channels & 1 == 1 {
        match map[0] {
            MapSlot::Invalid => return None,
            MapSlot::Unused => break,
            MapSlot::Speaker(speaker) => {
                push(*layout.get(i)?, speaker, None)?;
                i += 1;
                num_channels -= 1;
            }
        }
    }

    let mut j = if position != ChannelPosition::Side && num_channels <= 3 { 3 } else { 1 };
    while num_channels >= 2 {
        let left = map[j].speaker()?;
        let right = map[j + 1].speaker()?;
        let entry = *layout.get(i)?;
        if entry.element_type == Cpe {
            push(entry, left, Some(right))?;
            i += 1;
        } else {
            push(entry, left, None)?;
            push(*layout.get(i + 1)?, right, None)?;
            i += 2;
        }
        j += 2;
        num_channels -= 2;
    }

    if num_channels == 1 {
        push(*layout.get(i)?, map[5].speaker()?, None)?;
    }
    Some(())
}

// Assigns speakers layer by layer (front, side, back and low frequency elements of the
// listener plane, then the top and bottom layers) and sorts the elements into speaker order.
// Elements left over keep their declared order at the end. None if the layout is unmappable.
fn sniff_channel_order(layout: &[LayoutEntry]) -> Option<Vec<Assignment, MAX_LAYOUT_ENTRIES>> {
    let mut assigned = Vec::new();
    for layer in 0..SPEAKER_MAP.len() {
        if assigned.len() >= layout.len() {
            break;
        }
        for position in [ChannelPosition::Front, ChannelPosition::Side, ChannelPosition::Back, ChannelPosition::Lfe] {
            assign_channels(layout, &mut assigned, layer, position)?;
        }
    }

    let mask = assigned.iter().fold(0, |mask, a| mask | a.mask());
    if mask == LAYOUT_22_2 {
        for (a, b) in [(2, 0), (2, 1), (6, 2), (4, 3), (6, 4), (7, 6), (9, 8), (11, 10), (12, 11)] {
            assigned.swap(a, b);
        }
    } else {
        assigned.sort_by_key(Assignment::mask);
    }

    for entry in &layout[assigned.len()..] {
        assigned.push(Assignment::unassigned(*entry)).ok()?;
    }
    Some(assigned)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::common::config::{AudioObjectType, SamplingFrequency};
    use std::vec::Vec as StdVec;

    fn params() -> StreamParams {
        StreamParams::new(AudioObjectType::LowComplexity, SamplingFrequency::from_index(3).unwrap(), false)
    }

    fn configured(channel_config: u8, order: ChannelOrder, strict: bool) -> OutputConfigHolder {
        let mut warnings = WarnOnce::default();
        let layout = default_layout(channel_config, strict, &mut warnings).unwrap();
        let mut holder = OutputConfigHolder::new(params(), order);
        holder.configure(&layout, channel_config, ConfigStatus::TrialFromHeader).unwrap();
        holder
    }

    fn speakers(config: &OutputConfig) -> StdVec<Option<Speaker>> {
        config.channels.iter().map(|c| c.speaker).collect()
    }

    #[test]
    fn channel_counts_of_default_configurations() {
        for (channel_config, expected) in [(1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6), (7, 8), (11, 7), (12, 8), (13, 24), (14, 8)] {
            let holder = configured(channel_config, ChannelOrder::Canonical, false);
            assert_eq!(holder.current().num_channels(), expected, "configuration {}", channel_config);
            assert!(holder.current().channels.iter().all(|c| c.speaker.is_some()));
        }
    }

    #[test]
    fn invalid_default_configurations() {
        let mut warnings = WarnOnce::default();
        for channel_config in [0, 8, 9, 10, 15] {
            let err = default_layout(channel_config, false, &mut warnings).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
        }
    }

    #[test]
    fn canonical_order_of_5_1() {
        let holder = configured(6, ChannelOrder::Canonical, false);
        let expected = [FrontLeft, FrontRight, FrontCenter, LowFrequency, BackLeft, BackRight];
        assert_eq!(speakers(holder.current()), expected.map(Some).to_vec());

        // front left comes from the channel pair, instance 0
        let first = holder.current().channels[0];
        assert_eq!(first.slot, ElementSlot { element_type: Cpe, index: 0 });
        assert_eq!(first.channel, 0);
    }

    #[test]
    fn coded_order_of_5_1() {
        let holder = configured(6, ChannelOrder::AsCoded, false);
        let slots: StdVec<(ElementType, usize)> =
            holder.current().channels.iter().map(|c| (c.slot.element_type, c.channel)).collect();
        assert_eq!(slots, [(Sce, 0), (Cpe, 0), (Cpe, 1), (Cpe, 0), (Cpe, 1), (Lfe, 0)]);
    }

    #[test]
    fn configuration_7_defaults_to_side_channels() {
        let holder = configured(7, ChannelOrder::Canonical, false);
        let expected = [FrontLeft, FrontRight, FrontCenter, LowFrequency, BackLeft, BackRight, SideLeft, SideRight];
        assert_eq!(speakers(holder.current()), expected.map(Some).to_vec());

        let holder = configured(7, ChannelOrder::Canonical, true);
        let speakers = speakers(holder.current());
        assert_eq!(speakers.len(), 8);
        assert!(speakers.contains(&Some(FrontLeftOfCenter)));
        assert!(!speakers.contains(&Some(SideLeft)));
    }

    #[test]
    fn seventy_one_default_is_reported_once() {
        let mut warnings = WarnOnce::default();
        default_layout(7, true, &mut warnings).unwrap();
        assert!(!warnings.is_reported(Anomaly::Assumed71Layout));
        default_layout(7, false, &mut warnings).unwrap();
        assert!(warnings.is_reported(Anomaly::Assumed71Layout));
    }

    #[test]
    fn twenty_two_two_is_fully_assigned() {
        let holder = configured(13, ChannelOrder::Canonical, false);
        let speakers = speakers(holder.current());
        assert_eq!(speakers[..3], [Some(FrontLeft), Some(FrontRight), Some(FrontCenter)]);
        let mut sorted: StdVec<Speaker> = speakers.iter().flatten().copied().collect();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 24);
    }

    #[test]
    fn too_many_channels() {
        let mut layout = LayoutMap::new();
        for tag in 0..16 {
            layout.push(e(Cpe, tag, F)).unwrap();
            layout.push(e(Sce, tag, B)).unwrap();
            layout.push(e(Lfe, tag, L)).unwrap();
        }
        let mut holder = OutputConfigHolder::new(params(), ChannelOrder::Canonical);
        holder.configure(&layout, 0, ConfigStatus::TrialFromInband).unwrap();
        assert_eq!(holder.current().num_channels(), 64);

        layout.push(e(Cpe, 0, B)).unwrap();
        let err = holder.configure(&layout, 0, ConfigStatus::TrialFromInband).unwrap_err();
        assert!(matches!(err, ChannelConfigError::TooManyChannels(66)));
        assert_eq!(err.kind(), ErrorKind::ConfigConflict);
        // the previous layout stays active
        assert_eq!(holder.current().num_channels(), 64);
    }

    #[test]
    fn unpairable_layout_keeps_coded_order() {
        // a single channel after a pair in the front can not be placed
        let layout = [e(Cpe, 0, F), e(Sce, 0, F)];
        let mut holder = OutputConfigHolder::new(params(), ChannelOrder::Canonical);
        holder.configure(&layout, 0, ConfigStatus::TrialFromInband).unwrap();
        let config = holder.current();
        assert_eq!(config.num_channels(), 3);
        assert_eq!(config.channels[0].slot.element_type, Cpe);
        assert!(config.channels.iter().all(|c| c.speaker.is_none()));
    }

    #[test]
    fn program_config_layouts_map_by_tag() {
        let layout = [e(Sce, 5, F), e(Cpe, 3, F), e(Sce, 9, B)];
        let mut holder = OutputConfigHolder::new(params(), ChannelOrder::Canonical);
        holder.configure(&layout, 0, ConfigStatus::TrialFromInband).unwrap();

        let mut warnings = WarnOnce::default();
        holder.start_frame();
        assert_eq!(holder.map_element(Sce, 9, false, &mut warnings).unwrap().index, 1);
        assert_eq!(holder.map_element(Cpe, 3, false, &mut warnings).unwrap().index, 0);
        let err = holder.map_element(Sce, 4, false, &mut warnings).unwrap_err();
        assert!(matches!(err, ChannelConfigError::ElementNotAllocated { tag: 4, .. }));
    }

    #[test]
    fn indexed_layouts_map_by_position() {
        let mut holder = configured(6, ChannelOrder::Canonical, false);
        let mut warnings = WarnOnce::default();
        holder.start_frame();
        // tags are ignored for the first elements
        assert_eq!(holder.map_element(Sce, 7, false, &mut warnings).unwrap(), ElementSlot { element_type: Sce, index: 0 });
        assert_eq!(holder.map_element(Cpe, 0, false, &mut warnings).unwrap(), ElementSlot { element_type: Cpe, index: 0 });
        assert_eq!(holder.map_element(Cpe, 1, false, &mut warnings).unwrap(), ElementSlot { element_type: Cpe, index: 1 });
        assert_eq!(holder.map_element(Lfe, 0, false, &mut warnings).unwrap(), ElementSlot { element_type: Lfe, index: 0 });
        assert!(!warnings.is_reported(Anomaly::LayoutRemapped));
    }

    #[test]
    fn last_sce_of_5_1_is_mapped_to_lfe() {
        let mut holder = configured(6, ChannelOrder::Canonical, false);
        let mut warnings = WarnOnce::default();
        holder.start_frame();
        holder.map_element(Sce, 0, false, &mut warnings).unwrap();
        holder.map_element(Cpe, 0, false, &mut warnings).unwrap();
        holder.map_element(Cpe, 1, false, &mut warnings).unwrap();
        let slot = holder.map_element(Sce, 1, false, &mut warnings).unwrap();
        assert_eq!(slot, ElementSlot { element_type: Lfe, index: 0 });
        assert!(warnings.is_reported(Anomaly::LayoutRemapped));
    }

    #[test]
    fn lfe_of_4_0_is_mapped_to_back_centre() {
        let mut holder = configured(4, ChannelOrder::Canonical, false);
        let mut warnings = WarnOnce::default();
        holder.start_frame();
        holder.map_element(Sce, 0, false, &mut warnings).unwrap();
        holder.map_element(Cpe, 0, false, &mut warnings).unwrap();
        let slot = holder.map_element(Lfe, 0, false, &mut warnings).unwrap();
        assert_eq!(slot, ElementSlot { element_type: Sce, index: 1 });
        assert!(warnings.is_reported(Anomaly::LayoutRemapped));
    }

    #[test]
    fn mono_configuration_with_a_pair_becomes_stereo() {
        let mut holder = configured(1, ChannelOrder::Canonical, false);
        holder.commit();
        let mut warnings = WarnOnce::default();
        holder.start_frame();
        let slot = holder.map_element(Cpe, 0, false, &mut warnings).unwrap();
        assert_eq!(slot, ElementSlot { element_type: Cpe, index: 0 });
        assert_eq!(holder.current().channel_config, 2);
        assert_eq!(holder.current().num_channels(), 2);
        assert_eq!(holder.current().status, ConfigStatus::TrialFromHeader);

        // a failed frame goes back to mono
        assert!(holder.rollback());
        assert_eq!(holder.current().num_channels(), 1);
    }

    #[test]
    fn stereo_configuration_with_two_single_channels() {
        let mut holder = configured(2, ChannelOrder::Canonical, false);
        let mut warnings = WarnOnce::default();
        holder.start_frame();
        assert_eq!(holder.map_element(Sce, 0, false, &mut warnings).unwrap(), ElementSlot { element_type: Sce, index: 0 });
        assert_eq!(holder.map_element(Sce, 1, false, &mut warnings).unwrap(), ElementSlot { element_type: Sce, index: 1 });
        let config = holder.current();
        assert_eq!(config.num_channels(), 2);
        assert_eq!(speakers(config), [Some(FrontLeft), Some(FrontRight)]);
    }

    #[test]
    fn commit_and_rollback() {
        let mut holder = configured(2, ChannelOrder::Canonical, false);
        holder.commit();
        assert_eq!(holder.current().status, ConfigStatus::Locked);

        // try a 5.1 layout and fail the frame
        assert!(holder.push());
        let mut warnings = WarnOnce::default();
        let layout = default_layout(6, false, &mut warnings).unwrap();
        holder.configure(&layout, 6, ConfigStatus::TrialFromInband).unwrap();
        assert_eq!(holder.current().num_channels(), 6);
        assert!(holder.rollback());
        assert_eq!(holder.current().num_channels(), 2);
        assert_eq!(holder.current().status, ConfigStatus::Locked);

        // try again and succeed: nothing to roll back to
        holder.push();
        holder.configure(&layout, 6, ConfigStatus::TrialFromInband).unwrap();
        holder.commit();
        assert!(!holder.rollback());
        assert_eq!(holder.current().num_channels(), 6);
    }

    #[test]
    fn second_push_keeps_the_locked_configuration() {
        let mut holder = configured(2, ChannelOrder::Canonical, false);
        holder.commit();
        assert!(holder.push());
        holder.configure(&LAYOUT_1, 1, ConfigStatus::TrialFromInband).unwrap();
        // the trial is not locked, the saved configuration must survive
        assert!(!holder.push());
        assert_eq!(holder.saved().num_channels(), 2);
    }
}
