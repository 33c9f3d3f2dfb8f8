//! The cue state machine (spec §4.4): `Created -> Prepared -> Playing ->
//! Stopping -> Stopped`, with an orthogonal `Paused` flag. Generalizes
//! `AudioSystem::start_playback`/`stop_playback`/`render_callback`'s
//! handle-based lifecycle into a per-cue object that owns its own clip
//! timelines, wave voices and variation-selector state.

use std::collections::HashMap;
use std::sync::Arc;

use bank_schema::{
    CueDefinition, EngineData, Event, EventPayload, SetValueEvent, SoundBank, ValueCurve,
    ValueEquationFlags,
};
use rand::Rng;

use bank_schema::units::{db_to_linear, encoded_db_to_db, encoded_db_to_linear};

use crate::category::ActiveEntry;
use crate::error::EngineError;
use crate::rng::EngineRng;
use crate::rpc::accumulate_rpcs;
use crate::variable_store::{ReservedInputs, VariableStore};
use crate::variation::VariationSelector;
use crate::wave::{SilentWaveSource, WaveSource, WaveVoice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueState {
    Created,
    Prepared,
    Playing,
    Stopping,
    Stopped,
}

/// A cue-level query made available to callers (supplemental feature,
/// §4.4: read back a clip's live parameter value rather than only being
/// able to set it).
#[derive(Debug, Clone, Copy)]
pub enum ParameterKind {
    Volume,
    Pitch,
}

#[derive(Debug, Clone, Copy)]
enum RampTarget {
    Volume,
    Pitch,
}

#[derive(Debug, Clone, Copy)]
struct ActiveRamp {
    target: RampTarget,
    initial: f32,
    slope: f32,
    slope_delta: f32,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl ActiveRamp {
    fn value_at(&self, t_ms: f64) -> f32 {
        let t = t_ms.min(self.duration_ms) as f32;
        self.initial + self.slope * t + 0.5 * self.slope_delta * t * t
    }

    fn finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

struct EventRuntime {
    next_fire_ms: f64,
    /// `None` means the event repeats forever (`loop_count == 255`).
    remaining_repeats: Option<u32>,
    done: bool,
}

/// Linear fade ramp gating a cue's output gain and, while fading out, the
/// `Stopping -> Stopped` transition (§4.4 Play step 4 / Stop fade-out).
#[derive(Debug, Clone, Copy)]
struct FadeState {
    from: f32,
    to: f32,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl FadeState {
    fn gain(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0) as f32;
        self.from + (self.to - self.from) * t
    }

    fn finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

struct ClipInstance {
    clip_index: usize,
    events: Vec<EventRuntime>,
    voices: Vec<WaveVoice>,
    volume_offset_db: f32,
    pitch_offset_cents: f32,
    ramps: Vec<ActiveRamp>,
    rpc_volume_db: f32,
    rpc_pitch_cents: f32,
}

/// Supplies wave playback for a `(wave_index, wavebank_index)` pair. Real
/// hosts wire this to a decoder; tests use `SilentWaveSource`/
/// `FixtureWaveSource`.
pub trait WaveSourceFactory: Send + Sync {
    fn create(&self, wave_index: u16, wavebank_index: u16) -> Box<dyn WaveSource>;
}

pub struct SilentWaveSourceFactory {
    pub frames_total: u64,
}

impl WaveSourceFactory for SilentWaveSourceFactory {
    fn create(&self, _wave_index: u16, _wavebank_index: u16) -> Box<dyn WaveSource> {
        Box::new(SilentWaveSource::new(self.frames_total))
    }
}

pub struct Cue {
    pub handle: u64,
    pub bank: Arc<SoundBank>,
    pub sound_index: u16,
    pub category: u16,
    pub priority: u8,
    pub base_volume_linear: f32,
    pub state: CueState,
    pub paused: bool,
    local_vars: VariableStore,
    clips: Vec<ClipInstance>,
    elapsed_ms: f64,
    fade_in_ms: u16,
    fade_out_ms: u16,
    fade: Option<FadeState>,
}

impl Cue {
    /// Resolves `definition` to a concrete `Sound` (selecting a variation
    /// if needed) and returns a new `Cue` in the `Created` state.
    pub fn new(
        handle: u64,
        bank: Arc<SoundBank>,
        engine: &EngineData,
        definition: CueDefinition,
        table_selectors: &mut HashMap<u16, VariationSelector>,
        rng: &mut EngineRng,
    ) -> Result<Self, EngineError> {
        let local_vars = VariableStore::new(engine);
        let sound_index = match definition {
            CueDefinition::Sound(i) => i,
            CueDefinition::VariationTable(table_index) => {
                let table = bank
                    .variation_tables
                    .get(table_index as usize)
                    .ok_or_else(|| EngineError::NotFound(format!("variation table {table_index}")))?;
                let selector = table_selectors
                    .entry(table_index)
                    .or_insert_with(|| VariationSelector::new(table));
                let entry_index = selector.select(table, rng, &local_vars);
                match table.entries[entry_index].payload {
                    bank_schema::VariationPayload::Sound(s) => s,
                    bank_schema::VariationPayload::WaveTrack { .. } => {
                        return Err(EngineError::InvalidCall(
                            "variation table resolved to a bare wave track, not a Sound".into(),
                        ))
                    }
                }
            }
        };
        let sound = bank
            .sounds
            .get(sound_index as usize)
            .ok_or_else(|| EngineError::NotFound(format!("sound {sound_index}")))?;

        Ok(Cue {
            handle,
            bank,
            sound_index,
            category: sound.category,
            priority: sound.priority,
            base_volume_linear: encoded_db_to_linear(sound.volume),
            state: CueState::Created,
            paused: false,
            local_vars,
            clips: Vec::new(),
            elapsed_ms: 0.0,
            fade_in_ms: 0,
            fade_out_ms: 0,
            fade: None,
        })
    }

    /// Sets the category fade times (§4.4) this cue installs a fade-in
    /// ramp from at `play()` and fades out over at `stop(false)`.
    pub fn set_fade_times(&mut self, fade_in_ms: u16, fade_out_ms: u16) {
        self.fade_in_ms = fade_in_ms;
        self.fade_out_ms = fade_out_ms;
    }

    pub fn prepare(&mut self) -> Result<(), EngineError> {
        if self.state != CueState::Created {
            return Err(EngineError::InvalidCall(format!(
                "prepare() requires Created, cue is {:?}",
                self.state
            )));
        }
        self.state = CueState::Prepared;
        Ok(())
    }

    pub fn play(
        &mut self,
        wave_factory: &dyn WaveSourceFactory,
        rng: &mut EngineRng,
        markers: &mut Vec<u32>,
    ) -> Result<(), EngineError> {
        if self.state != CueState::Prepared {
            return Err(EngineError::InvalidCall(format!(
                "play() requires Prepared, cue is {:?}",
                self.state
            )));
        }
        let sound = &self.bank.sounds[self.sound_index as usize];
        for (i, clip) in sound.clips.iter().enumerate() {
            let events = clip
                .events
                .iter()
                .map(|e| EventRuntime {
                    next_fire_ms: e.timestamp_ms as f64 + jittered_offset(e, rng),
                    remaining_repeats: loop_repeats(e),
                    done: false,
                })
                .collect();
            self.clips.push(ClipInstance {
                clip_index: i,
                events,
                voices: Vec::new(),
                volume_offset_db: 0.0,
                pitch_offset_cents: 0.0,
                ramps: Vec::new(),
                rpc_volume_db: 0.0,
                rpc_pitch_cents: 0.0,
            });
        }
        self.state = CueState::Playing;
        if self.fade_in_ms > 0 {
            self.fade = Some(FadeState {
                from: 0.0,
                to: 1.0,
                elapsed_ms: 0.0,
                duration_ms: self.fade_in_ms as f64,
            });
        }
        self.fire_due_events(wave_factory, rng, markers);
        Ok(())
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stops the cue (§4.4 `Stop(Cue, immediate?)`). `immediate` kills
    /// every child wave synchronously and jumps straight to `Stopped`;
    /// otherwise the cue installs a fade-out ramp over its category's
    /// `fade_out_ms` and stays `Stopping` until that fade completes.
    pub fn stop(&mut self, immediate: bool) {
        if !matches!(self.state, CueState::Playing | CueState::Stopping) {
            return;
        }
        if immediate {
            self.clips.iter_mut().for_each(|c| c.voices.clear());
            self.state = CueState::Stopped;
            return;
        }
        if self.state == CueState::Playing {
            let from = self.fade.map(|f| f.gain()).unwrap_or(1.0);
            self.fade = Some(FadeState {
                from,
                to: 0.0,
                elapsed_ms: 0.0,
                duration_ms: self.fade_out_ms as f64,
            });
            self.state = CueState::Stopping;
        }
    }

    pub fn get_parameter(&self, kind: ParameterKind, clip_index: usize) -> Option<f32> {
        let clip = self.clips.iter().find(|c| c.clip_index == clip_index)?;
        let sound_clip = &self.bank.sounds[self.sound_index as usize].clips[clip_index];
        Some(match kind {
            ParameterKind::Volume => {
                let base_db = encoded_db_to_db(sound_clip.volume);
                let rpc_linear = db_to_linear(clip.rpc_volume_db);
                self.base_volume_linear * db_to_linear(base_db + clip.volume_offset_db) * rpc_linear
            }
            ParameterKind::Pitch => clip.pitch_offset_cents + clip.rpc_pitch_cents,
        })
    }

    /// Advances the cue's timeline by `delta_ms`, firing any events whose
    /// time has come, refreshing RPCs and reserved variables, then
    /// renders `frame_count` worth of mixed wave output. Returns `true`
    /// while the cue should keep being polled. `num_instances` is the
    /// live count of other cues sharing this cue's sound (§4.2
    /// `NumCueInstances`), computed by the caller across all cues.
    /// Marker events fire into `markers` in event-time order (§4.4).
    pub fn tick(
        &mut self,
        delta_ms: f64,
        frame_count: usize,
        wave_factory: &dyn WaveSourceFactory,
        rng: &mut EngineRng,
        engine: &EngineData,
        global_vars: &VariableStore,
        num_instances: u32,
        markers: &mut Vec<u32>,
    ) -> (Vec<f32>, bool) {
        let mut out = vec![0.0f32; frame_count];
        if self.state != CueState::Playing && self.state != CueState::Stopping {
            return (out, false);
        }
        if !self.paused {
            self.elapsed_ms += delta_ms;
            self.local_vars.refresh_reserved(
                engine,
                &ReservedInputs {
                    num_cue_instances: num_instances as f32,
                    attack_time_ms: self.fade_in_ms as f32,
                    release_time_ms: self.fade_out_ms as f32,
                },
            );
            self.fire_due_events(wave_factory, rng, markers);
            self.advance_ramps(delta_ms);
            self.advance_fade(delta_ms);
        }

        let category_gain = engine.category_chain_gain(self.category);
        let fade_gain = self.fade_gain();
        let sound = &self.bank.sounds[self.sound_index as usize];
        let sound_rpc_codes = &sound.rpc_codes;
        let sound_clips = &sound.clips;

        // Wave voices keep rendering even while paused, same as the
        // teacher's render_callback never stops mixing already-active
        // sources just because no new command arrived.
        let mut any_alive = false;
        for clip in self.clips.iter_mut() {
            let sound_clip = &sound_clips[clip.clip_index];
            let mut rpc_codes = sound_rpc_codes.clone();
            rpc_codes.extend_from_slice(&sound_clip.rpc_codes);
            let deltas = accumulate_rpcs(&rpc_codes, engine, global_vars, &self.local_vars);
            clip.rpc_volume_db = deltas.volume_db;
            clip.rpc_pitch_cents = deltas.pitch_cents;

            let clip_volume_linear =
                db_to_linear(encoded_db_to_db(sound_clip.volume) + clip.volume_offset_db);
            let envelope = category_gain
                * self.base_volume_linear
                * clip_volume_linear
                * deltas.volume_mul()
                * fade_gain;

            clip.voices.retain_mut(|v| {
                let alive = v.render(&mut out, envelope);
                any_alive |= alive;
                alive
            });
        }
        let fade_done = self.fade.map_or(true, |f| f.finished());
        if self.state == CueState::Stopping && fade_done && !any_alive {
            self.state = CueState::Stopped;
        }
        let keep_polling = self.state != CueState::Stopped;
        (out, keep_polling)
    }

    pub fn active_entry(&self) -> ActiveEntry {
        ActiveEntry {
            handle: self.handle,
            order: self.handle,
            priority: self.priority,
            volume_linear: self.base_volume_linear,
        }
    }

    fn fire_due_events(
        &mut self,
        wave_factory: &dyn WaveSourceFactory,
        rng: &mut EngineRng,
        markers: &mut Vec<u32>,
    ) {
        let elapsed = self.elapsed_ms;
        let sound_index = self.sound_index;
        let bank = self.bank.clone();
        for clip in self.clips.iter_mut() {
            let sound_clip = &bank.sounds[sound_index as usize].clips[clip.clip_index];
            for idx in 0..clip.events.len() {
                let due = !clip.events[idx].done && clip.events[idx].next_fire_ms <= elapsed;
                if !due {
                    continue;
                }
                let event = &sound_clip.events[idx];
                dispatch_event(event, clip, wave_factory, rng, markers);
                let frequency = event.frequency.max(1) as f64;
                let runtime = &mut clip.events[idx];
                match runtime.remaining_repeats {
                    Some(0) => runtime.done = true,
                    Some(n) => {
                        runtime.remaining_repeats = Some(n - 1);
                        runtime.next_fire_ms += frequency;
                    }
                    None => {
                        runtime.next_fire_ms += frequency;
                    }
                }
            }
        }
    }

    fn advance_ramps(&mut self, delta_ms: f64) {
        for clip in self.clips.iter_mut() {
            for ramp in clip.ramps.iter_mut() {
                ramp.elapsed_ms += delta_ms;
                let v = ramp.value_at(ramp.elapsed_ms);
                match ramp.target {
                    RampTarget::Volume => clip.volume_offset_db = v,
                    RampTarget::Pitch => clip.pitch_offset_cents = v,
                }
            }
            clip.ramps.retain(|r| !r.finished());
        }
    }

    fn advance_fade(&mut self, delta_ms: f64) {
        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed_ms += delta_ms;
        }
    }

    fn fade_gain(&self) -> f32 {
        self.fade.map(|f| f.gain()).unwrap_or(1.0)
    }
}

fn jittered_offset(e: &Event, rng: &mut EngineRng) -> f64 {
    if e.random_offset_ms == 0 {
        0.0
    } else {
        rng.inner_mut().gen_range(0..=e.random_offset_ms) as f64
    }
}

fn loop_repeats(e: &Event) -> Option<u32> {
    match e.loop_count {
        0 => Some(0),
        255 => None,
        n => Some(n as u32),
    }
}

fn dispatch_event(
    event: &Event,
    clip: &mut ClipInstance,
    wave_factory: &dyn WaveSourceFactory,
    rng: &mut EngineRng,
    markers: &mut Vec<u32>,
) {
    match &event.payload {
        EventPayload::Stop => {
            clip.voices.clear();
        }
        EventPayload::PlayWave(play) => {
            if play.tracks.is_empty() {
                return;
            }
            let track_idx = rng.inner_mut().gen_range(0..play.tracks.len());
            let track = &play.tracks[track_idx];
            // Category/sound/clip/RPC/fade gain is folded into the
            // per-tick envelope `Cue::tick` passes to `WaveVoice::render`;
            // this per-instance gain only carries the one-shot random
            // volume variation sampled at play time.
            let gain = gain_offset_db(play, rng);
            clip.voices.push(WaveVoice {
                wave_index: track.wave_index,
                wavebank_index: track.wavebank_index,
                source: wave_factory.create(track.wave_index, track.wavebank_index),
                gain_linear: gain,
                loops_remaining: if play.loops_infinite { None } else { Some(0) },
            });
        }
        EventPayload::SetVolume(v) => apply_set_value(v, clip, RampTarget::Volume, rng),
        EventPayload::SetPitch(v) => apply_set_value(v, clip, RampTarget::Pitch, rng),
        EventPayload::Marker { marker_id } => markers.push(*marker_id),
    }
}

fn gain_offset_db(play: &bank_schema::PlayWaveEvent, rng: &mut EngineRng) -> f32 {
    let (lo, hi) = play.volume_variation_db;
    if hi <= lo {
        1.0
    } else {
        let db = rng.inner_mut().gen_range(lo..hi);
        db_to_linear(db)
    }
}

fn apply_set_value(v: &SetValueEvent, clip: &mut ClipInstance, target: RampTarget, rng: &mut EngineRng) {
    match v {
        SetValueEvent::Ramp {
            initial,
            initial_slope,
            slope_delta,
            duration_ms,
        } => {
            clip.ramps.push(ActiveRamp {
                target,
                initial: *initial,
                slope: *initial_slope,
                slope_delta: *slope_delta,
                elapsed_ms: 0.0,
                duration_ms: *duration_ms as f64,
            });
        }
        SetValueEvent::Equation { flags, curve, v1, v2 } => {
            let value = match curve {
                ValueCurve::Linear | ValueCurve::Log => *v1,
                ValueCurve::RandomInRange => rng.inner_mut().gen_range((*v1).min(*v2)..=(*v1).max(*v2)),
            };
            let current = match target {
                RampTarget::Volume => &mut clip.volume_offset_db,
                RampTarget::Pitch => &mut clip.pitch_offset_cents,
            };
            *current = match flags {
                ValueEquationFlags::Add => *current + value,
                ValueEquationFlags::Multiply => *current * value,
                ValueEquationFlags::Replace => value,
            };
        }
    }
}
