//! End-to-end cue lifecycle through the public `AudioEngine` API: load
//! engine data and a sound bank from byte streams, play a cue, mix a few
//! quanta, stop it, and see its destruction notification.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use audio_engine::config::EngineConfig;
use audio_engine::cue::{CueState, SilentWaveSourceFactory};
use audio_engine::error::EngineError;
use audio_engine::notifications::Notification;
use audio_engine::AudioEngine;

fn engine(max_instances: u8) -> AudioEngine {
    let engine_data = bank_schema::load_engine_data(Cursor::new(common::engine_bytes(max_instances, 0))).unwrap();
    AudioEngine::new(
        EngineConfig::default(),
        engine_data,
        Arc::new(SilentWaveSourceFactory { frames_total: 0 }),
    )
}

#[test]
fn play_mix_stop_destroys_cue() {
    let engine = engine(4);
    let bank_id = engine
        .load_sound_bank(Cursor::new(common::bank_bytes_playwave_cue("Boom", 0, 1000)))
        .unwrap();

    let handle = engine.play_cue(bank_id, "Boom").unwrap();
    assert_eq!(engine.cue_state(handle), Some(CueState::Playing));

    let mut out = vec![0.0f32; engine.config().quantum_frames * engine.config().output_channels as usize];
    engine.render_into(&mut out);

    engine.stop_cue(handle, false).unwrap();
    // The voice spawned by the PlayWave event has zero frames to render
    // (`SilentWaveSourceFactory { frames_total: 0 }`), so it finishes on
    // the very first tick and the cue transitions all the way to Stopped.
    for _ in 0..4 {
        engine.render_into(&mut out);
    }
    assert_eq!(engine.cue_state(handle), None);
}

#[test]
fn unload_bank_destroys_its_cues_but_not_others() {
    let engine = engine(4);
    let bank_a = engine
        .load_sound_bank(Cursor::new(common::bank_bytes_named_cues(&["A"])))
        .unwrap();
    let bank_b = engine
        .load_sound_bank(Cursor::new(common::bank_bytes_named_cues(&["B"])))
        .unwrap();

    let handle_a = engine.play_cue(bank_a, "A").unwrap();
    let handle_b = engine.play_cue(bank_b, "B").unwrap();

    let seen: Arc<std::sync::Mutex<Vec<Notification>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    engine.notifications().subscribe(move |n| seen2.lock().unwrap().push(*n));

    engine.unload_sound_bank(bank_a).unwrap();
    engine.notifications().drain();

    assert_eq!(engine.cue_state(handle_a), None);
    assert_eq!(engine.cue_state(handle_b), Some(CueState::Playing));

    let got = seen.lock().unwrap();
    assert!(got.iter().any(|n| matches!(n, Notification::CueDestroyed { cue } if *cue == handle_a)));
    assert!(got.iter().any(|n| matches!(n, Notification::SoundBankDestroyed { bank } if *bank == bank_a)));
}

#[test]
fn unknown_bank_id_is_not_found() {
    let engine = engine(4);
    assert!(matches!(
        engine.play_cue(999, "Boom"),
        Err(EngineError::NotFound(_))
    ));
}
