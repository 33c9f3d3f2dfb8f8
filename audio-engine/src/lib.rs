//! The in-process audio runtime: variable store, RPC evaluator, cue state
//! machine and mix driver tied together behind one `parking_lot::Mutex`
//! (spec §5), generalizing `AudioSystem`'s inner-state-plus-mixer-queue
//! split from the teacher crate this workspace is grounded on.

pub mod category;
pub mod config;
pub mod cue;
pub mod error;
pub mod mix;
pub mod notifications;
pub mod rng;
pub mod rpc;
pub mod variable_store;
pub mod variation;
pub mod wave;

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use audio_backend::RenderFn;
use bank_schema::{EngineData, SoundBank, WaveBank};
use parking_lot::Mutex;

use crate::category::{admit, AdmitDecision};
use crate::config::EngineConfig;
use crate::cue::{Cue, CueState, ParameterKind, WaveSourceFactory};
use crate::error::EngineError;
use crate::notifications::{Notification, NotificationQueue};
use crate::rng::EngineRng;
use crate::variable_store::VariableStore;
use crate::variation::VariationSelector;

struct MixDriverState {
    driver: crate::mix::MixDriver,
}

struct LoadedBank {
    bank: Arc<SoundBank>,
}

struct EngineState {
    engine_data: EngineData,
    global_vars: VariableStore,
    banks: HashMap<u32, LoadedBank>,
    wave_banks: HashMap<u32, Arc<WaveBank>>,
    next_bank_id: u32,
    next_wave_bank_id: u32,
    cues: HashMap<u64, Cue>,
    next_cue_handle: u64,
    selectors: HashMap<(u32, u16), VariationSelector>,
    rng: EngineRng,
    mix: MixDriverState,
}

/// Ties the schema, variable store, RPC evaluator, cue state machine and
/// mix driver together behind one lock (§5). The audio thread is whatever
/// `AudioBackend::start` spawns; it only ever calls `render_into`.
pub struct AudioEngine {
    config: EngineConfig,
    state: Mutex<EngineState>,
    notifications: NotificationQueue,
    wave_factory: Arc<dyn WaveSourceFactory>,
}

impl AudioEngine {
    pub fn new(config: EngineConfig, engine_data: EngineData, wave_factory: Arc<dyn WaveSourceFactory>) -> Self {
        let global_vars = VariableStore::new(&engine_data);
        let mix = MixDriverState {
            driver: crate::mix::MixDriver::new(config.quantum_frames, config.output_channels),
        };
        let notifications = NotificationQueue::new(config.notification_capacity);
        let rng = EngineRng::new(config.rng_seed);
        AudioEngine {
            state: Mutex::new(EngineState {
                engine_data,
                global_vars,
                banks: HashMap::new(),
                wave_banks: HashMap::new(),
                next_bank_id: 1,
                next_wave_bank_id: 1,
                cues: HashMap::new(),
                next_cue_handle: 1,
                selectors: HashMap::new(),
                rng,
                mix,
            }),
            notifications,
            wave_factory,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Loads a `SoundBank` from `stream`, validated and resolved against
    /// this engine's categories/variables/RPCs (§4.1). Atomic: a failure
    /// leaves the engine's bank table untouched.
    pub fn load_sound_bank(&self, stream: impl Read) -> Result<u32, EngineError> {
        let mut state = self.state.lock();
        if state.banks.len() >= self.config.max_cues {
            return Err(EngineError::OutOfMemory);
        }
        let bank = bank_schema::load_sound_bank(stream, &state.engine_data)?;
        let id = state.next_bank_id;
        state.next_bank_id += 1;
        state.banks.insert(id, LoadedBank { bank: Arc::new(bank) });
        Ok(id)
    }

    /// Unloads a sound bank, stopping and destroying every cue it owns and
    /// publishing `SoundBankDestroyed`.
    pub fn unload_sound_bank(&self, bank_id: u32) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let removed = state
            .banks
            .remove(&bank_id)
            .ok_or_else(|| EngineError::NotFound(format!("sound bank {bank_id}")))?;
        let doomed: Vec<u64> = state
            .cues
            .iter()
            .filter(|(_, c)| Arc::ptr_eq(&c.bank, &removed.bank))
            .map(|(h, _)| *h)
            .collect();
        for handle in doomed {
            state.cues.remove(&handle);
            self.notifications.publish(Notification::CueDestroyed { cue: handle });
        }
        self.notifications.publish(Notification::SoundBankDestroyed { bank: bank_id });
        Ok(())
    }

    pub fn load_wave_bank(&self, stream: impl Read) -> Result<u32, EngineError> {
        let mut state = self.state.lock();
        let wb = bank_schema::load_wave_bank(stream)?;
        let id = state.next_wave_bank_id;
        state.next_wave_bank_id += 1;
        state.wave_banks.insert(id, Arc::new(wb));
        self.notifications.publish(Notification::WaveBankPrepared { wave_bank: id });
        Ok(id)
    }

    /// Resolves `cue_name` in `bank_id`, runs admission control against its
    /// category, and starts it playing. Returns `InstanceLimit` if the
    /// category is full and its policy is `FailNew` (or the new cue's
    /// priority isn't high enough under `ReplaceLowestPriority`).
    pub fn play_cue(&self, bank_id: u32, cue_name: &str) -> Result<u64, EngineError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let bank = state
            .banks
            .get(&bank_id)
            .ok_or_else(|| EngineError::NotFound(format!("sound bank {bank_id}")))?
            .bank
            .clone();
        let cue_index = bank
            .lookup_cue(cue_name)
            .ok_or_else(|| EngineError::NotFound(format!("cue '{cue_name}'")))?;
        let definition = bank.cues[cue_index as usize].definition;

        let handle = state.next_cue_handle;

        let mut bank_selectors: HashMap<u16, VariationSelector> = state
            .selectors
            .iter()
            .filter(|((b, _), _)| *b == bank_id)
            .map(|((_, t), s)| (*t, s.clone()))
            .collect();
        let mut cue = Cue::new(
            handle,
            bank.clone(),
            &state.engine_data,
            definition,
            &mut bank_selectors,
            &mut state.rng,
        )?;
        for (table_index, selector) in bank_selectors {
            state.selectors.insert((bank_id, table_index), selector);
        }

        let category = state
            .engine_data
            .categories
            .get(cue.category as usize)
            .ok_or_else(|| EngineError::NotFound(format!("category {}", cue.category)))?
            .clone();
        let active: Vec<_> = state
            .cues
            .values()
            .filter(|c| c.category == cue.category)
            .map(|c| c.active_entry())
            .collect();
        match admit(&category, &active, cue.priority) {
            AdmitDecision::Reject => return Err(EngineError::InstanceLimit { category: cue.category }),
            AdmitDecision::Replace(victim) => {
                // Stop, not destroy: the victim keeps playing through its
                // own category's fade-out and is reaped by render_into
                // once it reaches Stopped, same as any other stop (§4.4
                // replace-oldest: "stop the oldest live cue ... with its
                // fade-out").
                if let Some(victim_cue) = state.cues.get_mut(&victim) {
                    victim_cue.stop(false);
                }
                self.notifications.publish(Notification::CueStop { cue: victim });
            }
            AdmitDecision::Allow => {}
        }

        cue.set_fade_times(category.fade_in_ms, category.fade_out_ms);
        cue.prepare()?;
        let mut markers = Vec::new();
        cue.play(self.wave_factory.as_ref(), &mut state.rng, &mut markers)?;
        state.next_cue_handle += 1;
        state.cues.insert(handle, cue);
        for marker_id in markers {
            self.notifications.publish(Notification::MarkerReached { cue: handle, marker_id });
        }
        Ok(handle)
    }

    /// Stops `handle` (§4.4 `Stop(Cue, immediate?)`). `immediate = true`
    /// bypasses the cue's fade-out and tears it down synchronously, so its
    /// category's live-instance count reflects the stop before the next
    /// `render_into` call; otherwise the cue fades out over its category's
    /// `fade_out_ms` and is reaped once `render_into` sees it reach
    /// `Stopped`.
    pub fn stop_cue(&self, handle: u64, immediate: bool) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let cue = state
            .cues
            .get_mut(&handle)
            .ok_or_else(|| EngineError::NotFound(format!("cue {handle}")))?;
        cue.stop(immediate);
        if immediate {
            state.cues.remove(&handle);
            self.notifications.publish(Notification::CueDestroyed { cue: handle });
        } else {
            self.notifications.publish(Notification::CueStop { cue: handle });
        }
        Ok(())
    }

    pub fn pause_cue(&self, handle: u64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state
            .cues
            .get_mut(&handle)
            .ok_or_else(|| EngineError::NotFound(format!("cue {handle}")))?
            .pause();
        Ok(())
    }

    pub fn resume_cue(&self, handle: u64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state
            .cues
            .get_mut(&handle)
            .ok_or_else(|| EngineError::NotFound(format!("cue {handle}")))?
            .resume();
        Ok(())
    }

    pub fn cue_state(&self, handle: u64) -> Option<CueState> {
        self.state.lock().cues.get(&handle).map(|c| c.state)
    }

    pub fn get_parameter(&self, handle: u64, clip_index: usize, kind: ParameterKind) -> Option<f32> {
        self.state
            .lock()
            .cues
            .get(&handle)
            .and_then(|c| c.get_parameter(kind, clip_index))
    }

    pub fn set_global_variable(&self, name: &str, value: f32) -> Result<(), EngineError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let index = state
            .engine_data
            .lookup_variable(name)
            .ok_or_else(|| EngineError::NotFound(format!("variable '{name}'")))?;
        state.global_vars.set(&state.engine_data, index, value)
    }

    pub fn get_global_variable(&self, name: &str) -> Option<f32> {
        let state = self.state.lock();
        let index = state.engine_data.lookup_variable(name)?;
        Some(state.global_vars.get(index))
    }

    /// Called on the audio thread: renders `out.len()` interleaved frames
    /// worth of samples across every active cue. Mirrors the teacher's
    /// `render_callback`'s "drain commands, zero buffer, mix" shape.
    pub fn render_into(&self, out: &mut [f32]) {
        let mut state = self.state.lock();
        let quantum_ms = 1000.0 * self.config.quantum_frames as f64 / self.config.sample_rate.max(1) as f64;
        while state.mix.driver.available_frames() * self.config.output_channels as usize < out.len() {
            let mut cues: Vec<Cue> = state.cues.drain().map(|(_, c)| c).collect();
            let mut markers = Vec::new();
            let EngineState { engine_data, global_vars, rng, mix, .. } = &mut *state;
            mix.driver.tick(
                &mut cues,
                self.wave_factory.as_ref(),
                rng,
                quantum_ms,
                &*engine_data,
                &*global_vars,
                &mut markers,
            );
            for (cue, marker_id) in markers {
                self.notifications.publish(Notification::MarkerReached { cue, marker_id });
            }
            for cue in cues {
                if cue.state != CueState::Stopped {
                    state.cues.insert(cue.handle, cue);
                } else {
                    self.notifications.publish(Notification::CueDestroyed { cue: cue.handle });
                }
            }
        }
        state.mix.driver.drain_into(out);
    }

    /// Produces an `audio_backend::RenderFn` suitable for
    /// `AudioBackend::start`, matching `audio-system`'s
    /// `render_fn_for_system` bridge.
    pub fn render_fn(self: &Arc<Self>) -> RenderFn {
        let engine = self.clone();
        std::sync::Arc::new(move |buffer: &mut [f32], _sample_rate: u32, _frames: usize| {
            engine.render_into(buffer);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::SilentWaveSourceFactory;
    use std::io::Cursor;

    fn write_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    /// One category, `max_instances` configurable, no variables/RPCs.
    fn engine_bytes(max_instances: u8) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0x5444_4145u32.to_le_bytes());
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&1u16.to_le_bytes()); // category_count
        b.extend_from_slice(&0u16.to_le_bytes()); // variable_count
        b.extend_from_slice(&0u16.to_le_bytes()); // rpc_count

        write_string(&mut b, "Default");
        b.push(max_instances);
        b.extend_from_slice(&0u16.to_le_bytes()); // fade_in_ms
        b.extend_from_slice(&0u16.to_le_bytes()); // fade_out_ms
        b.push(0); // FailNew
        b.push(0); // has_parent = false
        b.push(180); // volume
        b.push(1); // visible
        b
    }

    /// A single cue `Boom` resolving to a clipless Sound in category 0.
    fn bank_bytes_single_sound_cue() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0x4B4E_4253u32.to_le_bytes());
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&1u16.to_le_bytes()); // sound_count
        b.extend_from_slice(&1u16.to_le_bytes()); // cue_count
        b.extend_from_slice(&0u16.to_le_bytes()); // variation_table_count

        b.push(0); // sound flags
        b.extend_from_slice(&0u16.to_le_bytes()); // category
        b.push(180); // volume
        b.extend_from_slice(&0i16.to_le_bytes()); // pitch_cents
        b.push(50); // priority
        b.extend_from_slice(&0u16.to_le_bytes()); // rpc_codes len
        b.extend_from_slice(&0u16.to_le_bytes()); // dsp_codes len
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_count

        write_string(&mut b, "Boom");
        b.push(0); // def_type = Sound
        b.extend_from_slice(&0u16.to_le_bytes()); // def_index
        b
    }

    fn test_engine(max_instances: u8) -> AudioEngine {
        let engine_data = bank_schema::load_engine_data(Cursor::new(engine_bytes(max_instances))).unwrap();
        AudioEngine::new(
            EngineConfig {
                max_categories: 8,
                max_cues: 8,
                max_waves: 8,
                ..Default::default()
            },
            engine_data,
            Arc::new(SilentWaveSourceFactory { frames_total: 0 }),
        )
    }

    fn load_test_bank(engine: &AudioEngine) -> u32 {
        engine
            .load_sound_bank(Cursor::new(bank_bytes_single_sound_cue()))
            .unwrap()
    }

    #[test]
    fn play_and_stop_cue_round_trip() {
        let engine = test_engine(1);
        let id = load_test_bank(&engine);

        let handle = engine.play_cue(id, "Boom").unwrap();
        assert_eq!(engine.cue_state(handle), Some(CueState::Playing));
        engine.stop_cue(handle, false).unwrap();
        assert_eq!(engine.cue_state(handle), Some(CueState::Stopping));
    }

    #[test]
    fn immediate_stop_destroys_cue_before_the_next_tick() {
        let engine = test_engine(1);
        let id = load_test_bank(&engine);

        let handle = engine.play_cue(id, "Boom").unwrap();
        engine.stop_cue(handle, true).unwrap();
        assert_eq!(engine.cue_state(handle), None);
    }

    #[test]
    fn unknown_cue_name_is_not_found() {
        let engine = test_engine(1);
        let id = load_test_bank(&engine);

        assert!(matches!(
            engine.play_cue(id, "DoesNotExist"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn admission_control_rejects_over_limit_fail_new() {
        let engine = test_engine(1);
        let id = load_test_bank(&engine);

        let _h1 = engine.play_cue(id, "Boom").unwrap();
        let result = engine.play_cue(id, "Boom");
        assert!(matches!(result, Err(EngineError::InstanceLimit { .. })));
    }

    #[test]
    fn loads_sound_bank_from_bytes() {
        let engine = test_engine(8);
        // An empty-but-valid engine-data-relative bank: zero sounds, zero
        // cues, zero variation tables.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x4B4E_4253u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        let id = engine.load_sound_bank(Cursor::new(bytes)).unwrap();
        assert_eq!(id, 1);
    }
}
