//! Admission control exercised through the real `AudioEngine::play_cue`
//! path rather than calling `category::admit` directly (unit-tested in
//! `audio-engine` itself for all four `InstanceBehavior` policies).

mod common;

use std::io::Cursor;
use std::sync::Arc;

use audio_engine::config::EngineConfig;
use audio_engine::cue::{CueState, SilentWaveSourceFactory};
use audio_engine::error::EngineError;
use audio_engine::AudioEngine;

fn engine(max_instances: u8, instance_behavior: u8) -> AudioEngine {
    let engine_data =
        bank_schema::load_engine_data(Cursor::new(common::engine_bytes(max_instances, instance_behavior))).unwrap();
    AudioEngine::new(
        EngineConfig::default(),
        engine_data,
        Arc::new(SilentWaveSourceFactory { frames_total: u64::MAX }),
    )
}

#[test]
fn fail_new_rejects_third_instance_over_limit_of_two() {
    let engine = engine(2, 0); // FailNew
    let bank_id = engine
        .load_sound_bank(Cursor::new(common::bank_bytes_named_cues(&["A"])))
        .unwrap();

    let _h1 = engine.play_cue(bank_id, "A").unwrap();
    let _h2 = engine.play_cue(bank_id, "A").unwrap();
    let result = engine.play_cue(bank_id, "A");
    assert!(matches!(result, Err(EngineError::InstanceLimit { .. })));
}

#[test]
fn replace_oldest_evicts_the_first_instance_started() {
    let engine = engine(1, 1); // ReplaceOldest
    let bank_id = engine
        .load_sound_bank(Cursor::new(common::bank_bytes_named_cues(&["A"])))
        .unwrap();

    let h1 = engine.play_cue(bank_id, "A").unwrap();
    let h2 = engine.play_cue(bank_id, "A").unwrap();

    // Replacement stops the victim honoring its fade rather than destroying
    // it outright — it stays live, Stopping, until a render_into tick sees
    // its fade-out finish.
    assert_eq!(engine.cue_state(h1), Some(CueState::Stopping));
    assert!(engine.cue_state(h2).is_some());
}
