//! In-memory layout of categories, variables, RPCs, sounds, clips, events
//! and variations — §3 of the spec. Everything here is produced by
//! [`crate::loader::load_sound_bank`] and is immutable afterwards; the
//! runtime engine layer owns mutable state (cues, variable values) that
//! points *at* these arrays by index.

/// Instance-limiting policy applied when a [`Category`]'s `max_instances`
/// would be exceeded by a new `Play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceBehavior {
    FailNew,
    ReplaceOldest,
    ReplaceQuietest,
    ReplaceLowestPriority,
}

/// A named group sharing instance-limit and fade policy; forms a tree via
/// `parent`. Volume propagates multiplicatively through the chain.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub max_instances: u8,
    pub fade_in_ms: u16,
    pub fade_out_ms: u16,
    pub instance_behavior: InstanceBehavior,
    pub parent: Option<u16>,
    /// Integer-encoded dB volume, 0..255, 180 == 0 dB. Converted to linear
    /// gain only at parameter-application time (§9 design note).
    pub volume: u8,
    pub visible: bool,
}

bitflags::bitflags! {
    /// Accessibility bits for a [`Variable`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VariableFlags: u8 {
        const PUBLIC   = 0b0001;
        const READONLY = 0b0010;
        const GLOBAL   = 0b0100;
        const RESERVED = 0b1000;
    }
}

/// A named scalar input. Global variables live on the engine; non-global
/// variables are copied per-cue at cue creation.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub flags: VariableFlags,
    pub initial: f32,
    pub min: f32,
    pub max: f32,
}

impl Variable {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Which parameter an [`Rpc`] curve's output is added to. Indices at or
/// above [`RPC_PARAMETER_COUNT`] address a DSP preset parameter by ordinal.
pub const RPC_PARAMETER_COUNT: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcParameter {
    VolumeDb,
    PitchCents,
    ReverbSend,
    FilterFreqHz,
    FilterQ,
    DspPreset(u16),
}

impl RpcParameter {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => RpcParameter::VolumeDb,
            1 => RpcParameter::PitchCents,
            2 => RpcParameter::ReverbSend,
            3 => RpcParameter::FilterFreqHz,
            4 => RpcParameter::FilterQ,
            other => RpcParameter::DspPreset(other - RPC_PARAMETER_COUNT),
        }
    }
}

/// One segment endpoint of a piecewise RPC curve.
#[derive(Debug, Clone, Copy)]
pub struct RpcPoint {
    pub x: f32,
    pub y: f32,
    pub curve: CurveType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveType {
    Linear,
    Fast,
    Slow,
    Sine,
    Discrete,
}

impl CurveType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CurveType::Linear),
            1 => Some(CurveType::Fast),
            2 => Some(CurveType::Slow),
            3 => Some(CurveType::Sine),
            4 => Some(CurveType::Discrete),
            _ => None,
        }
    }
}

/// Runtime parameter curve: maps the current value of `variable` to a
/// delta on `parameter`, accumulated with every other RPC targeting the
/// same parameter.
#[derive(Debug, Clone)]
pub struct Rpc {
    pub variable: u16,
    pub parameter: RpcParameter,
    pub points: Vec<RpcPoint>,
}

/// A single weighted alternative within a [`VariationTable`].
#[derive(Debug, Clone, Copy)]
pub enum VariationPayload {
    Sound(u16),
    /// Directly names a wave track without an intermediate Sound.
    WaveTrack { wave_index: u16, wavebank_index: u16 },
}

#[derive(Debug, Clone, Copy)]
pub struct Variation {
    pub payload: VariationPayload,
    pub min_weight: f32,
    pub max_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    Ordered,
    RandomNoImmediateRepeat,
    Random,
    Shuffle,
    Interactive,
}

/// One alternative-selection table. Played cues that reference a
/// `VariationTable` instead of a bare `Sound` pick one entry per play
/// according to `policy`.
#[derive(Debug, Clone)]
pub struct VariationTable {
    pub policy: SelectionPolicy,
    /// Present only for `Interactive`.
    pub variable: Option<u16>,
    pub entries: Vec<Variation>,
}

/// A timed action within a [`Clip`]'s event list. Every variant shares a
/// common header carried on [`Event`] itself rather than duplicated per
/// payload (§9 design note: sum type with common header, not an inline
/// tagged union).
#[derive(Debug, Clone)]
pub struct Event {
    pub timestamp_ms: u16,
    pub random_offset_ms: u16,
    pub loop_count: u8,
    pub frequency: u16,
    pub payload: EventPayload,
}

#[derive(Debug, Clone)]
pub enum EventPayload {
    Stop,
    PlayWave(PlayWaveEvent),
    SetVolume(SetValueEvent),
    SetPitch(SetValueEvent),
    Marker { marker_id: u32 },
}

#[derive(Debug, Clone)]
pub struct WaveTrack {
    pub wave_index: u16,
    pub wavebank_index: u16,
    pub weight_min: u8,
    pub weight_max: u8,
}

#[derive(Debug, Clone)]
pub struct PlayWaveEvent {
    pub tracks: Vec<WaveTrack>,
    pub pitch_variation: (i16, i16),
    pub volume_variation_db: (f32, f32),
    pub filter_variation_hz: (f32, f32),
    pub loops_infinite: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum ValueEquationFlags {
    Add,
    Multiply,
    Replace,
}

#[derive(Debug, Clone, Copy)]
pub enum ValueCurve {
    Linear,
    Log,
    RandomInRange,
}

#[derive(Debug, Clone)]
pub enum SetValueEvent {
    Ramp {
        initial: f32,
        initial_slope: f32,
        slope_delta: f32,
        duration_ms: u16,
    },
    Equation {
        flags: ValueEquationFlags,
        curve: ValueCurve,
        v1: f32,
        v2: f32,
    },
}

/// An ordered list of timed [`Event`]s operating over a single playback
/// timeline, plus its own static parameters.
#[derive(Debug, Clone)]
pub struct Clip {
    pub volume: u8,
    pub filter_freq_hz: f32,
    pub filter_q: f32,
    pub rpc_codes: Vec<u16>,
    pub events: Vec<Event>,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SoundFlags: u8 {
        const HAS_RPC = 0b0001;
        const HAS_DSP = 0b0010;
    }
}

/// A program of one or more [`Clip`]s targeting a [`Category`] with static
/// volume/pitch/priority.
#[derive(Debug, Clone)]
pub struct Sound {
    pub flags: SoundFlags,
    pub category: u16,
    pub volume: u8,
    pub pitch_cents: i16,
    pub priority: u8,
    pub clips: Vec<Clip>,
    pub rpc_codes: Vec<u16>,
    pub dsp_codes: Vec<u16>,
}

/// A playable definition resolved by a cue name: either a bare `Sound` or a
/// `VariationTable` that selects one per play (§9: kept as a sum type, not
/// an inline union with a "complex" bit).
#[derive(Debug, Clone, Copy)]
pub enum CueDefinition {
    Sound(u16),
    VariationTable(u16),
}

/// Compiled, named entry point into a [`SoundBank`].
#[derive(Debug, Clone)]
pub struct CueData {
    pub name: String,
    pub definition: CueDefinition,
}

/// Owns arrays of [`CueData`], [`Sound`], [`VariationTable`], plus the cue
/// name lookup table. Produced once by [`crate::loader::load_sound_bank`]
/// and shared (read-only) by every `Cue` spawned from it. A `SoundBank`
/// references [`Category`]/[`Variable`]/[`Rpc`] entries by index into the
/// owning [`EngineData`] — those are process-wide, not per-bank (§3: the
/// `AudioEngine` is the single owner of categories, variables, RPCs and DSP
/// presets across every loaded bank).
#[derive(Debug, Clone)]
pub struct SoundBank {
    pub cues: Vec<CueData>,
    pub sounds: Vec<Sound>,
    pub variation_tables: Vec<VariationTable>,
    pub(crate) cue_names: std::collections::HashMap<String, u16>,
}

impl SoundBank {
    /// Builds the cue-name lookup table from `cues`, for the same reason
    /// as [`EngineData::new`].
    pub fn new(
        cues: Vec<CueData>,
        sounds: Vec<Sound>,
        variation_tables: Vec<VariationTable>,
    ) -> Self {
        let cue_names = cues
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i as u16))
            .collect();
        Self {
            cues,
            sounds,
            variation_tables,
            cue_names,
        }
    }

    pub fn lookup_cue(&self, name: &str) -> Option<u16> {
        self.cue_names.get(name).copied()
    }
}

/// Process-wide engine configuration: the categories, variables and RPCs
/// shared across every `SoundBank` the engine has loaded. Loaded once, at
/// engine construction, from its own byte stream (§3: "AudioEngine ...
/// owns the set of Categories, Variables, RPCs, and DSP Presets").
#[derive(Debug, Clone)]
pub struct EngineData {
    pub categories: Vec<Category>,
    pub variables: Vec<Variable>,
    pub rpcs: Vec<Rpc>,
    pub(crate) variable_names: std::collections::HashMap<String, u16>,
}

impl EngineData {
    /// Builds the variable-name lookup table from `variables` so callers
    /// outside this crate (tests, embedding hosts building fixtures) don't
    /// need access to its private fields.
    pub fn new(categories: Vec<Category>, variables: Vec<Variable>, rpcs: Vec<Rpc>) -> Self {
        let variable_names = variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), i as u16))
            .collect();
        Self {
            categories,
            variables,
            rpcs,
            variable_names,
        }
    }

    pub fn lookup_variable(&self, name: &str) -> Option<u16> {
        self.variable_names.get(name).copied()
    }

    pub fn category_chain(&self, index: u16) -> Vec<u16> {
        let mut chain = Vec::new();
        let mut cur = Some(index);
        while let Some(i) = cur {
            chain.push(i);
            cur = self.categories.get(i as usize).and_then(|c| c.parent);
        }
        chain
    }

    /// Multiplicative volume from `index` up through the category forest's
    /// root, each factor converted from the integer dB encoding to linear
    /// gain (§9 design note).
    pub fn category_chain_gain(&self, index: u16) -> f32 {
        self.category_chain(index)
            .into_iter()
            .filter_map(|i| self.categories.get(i as usize))
            .map(|c| crate::units::encoded_db_to_linear(c.volume))
            .product()
    }
}
