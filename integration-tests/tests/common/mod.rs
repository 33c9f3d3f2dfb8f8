//! Shared byte-fixture builders for the engine-data/sound-bank/wave-bank
//! wire format `bank-schema::loader` parses. Kept here rather than in
//! `bank-schema` itself since these are test fixtures for a *consumer* of
//! the schema crate, not for the schema crate's own unit tests.

#![allow(dead_code)]

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// One category, no variables/RPCs.
pub fn engine_bytes(max_instances: u8, instance_behavior: u8) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0x5444_4145u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes()); // category_count
    b.extend_from_slice(&0u16.to_le_bytes()); // variable_count
    b.extend_from_slice(&0u16.to_le_bytes()); // rpc_count

    write_string(&mut b, "Default");
    b.push(max_instances);
    b.extend_from_slice(&0u16.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    b.push(instance_behavior);
    b.push(0); // has_parent = false
    b.push(180); // volume
    b.push(1); // visible
    b
}

/// One category plus one public variable named `name`, range `[min, max]`.
pub fn engine_bytes_with_variable(name: &str, flags: u8, initial: f32, min: f32, max: f32) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0x5444_4145u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes()); // category_count
    b.extend_from_slice(&1u16.to_le_bytes()); // variable_count
    b.extend_from_slice(&0u16.to_le_bytes()); // rpc_count

    write_string(&mut b, "Default");
    b.push(8);
    b.extend_from_slice(&0u16.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    b.push(0);
    b.push(0);
    b.push(180);
    b.push(1);

    write_string(&mut b, name);
    b.push(flags);
    b.extend_from_slice(&initial.to_le_bytes());
    b.extend_from_slice(&min.to_le_bytes());
    b.extend_from_slice(&max.to_le_bytes());
    b
}

/// A bank with `cue_names.len()` cues, each a clipless `Sound` in category 0.
pub fn bank_bytes_named_cues(cue_names: &[&str]) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0x4B4E_4253u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&(cue_names.len() as u16).to_le_bytes()); // sound_count
    b.extend_from_slice(&(cue_names.len() as u16).to_le_bytes()); // cue_count
    b.extend_from_slice(&0u16.to_le_bytes()); // variation_table_count

    for _ in cue_names {
        b.push(0); // sound flags
        b.extend_from_slice(&0u16.to_le_bytes()); // category
        b.push(180); // volume
        b.extend_from_slice(&0i16.to_le_bytes()); // pitch_cents
        b.push(50); // priority
        b.extend_from_slice(&0u16.to_le_bytes()); // rpc_codes len
        b.extend_from_slice(&0u16.to_le_bytes()); // dsp_codes len
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_count
    }

    for (i, name) in cue_names.iter().enumerate() {
        write_string(&mut b, name);
        b.push(0); // def_type = Sound
        b.extend_from_slice(&(i as u16).to_le_bytes());
    }
    b
}

/// A single cue `name` with one clip containing one `PlayWave` event that
/// plays wave 0 of wavebank 0, `loop_count` additional repeats every
/// `frequency` ms.
pub fn bank_bytes_playwave_cue(name: &str, loop_count: u8, frequency: u16) -> Vec<u8> {
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

    b.extend_from_slice(&1u16.to_le_bytes()); // clip_count
    b.push(180); // clip volume
    b.extend_from_slice(&0f32.to_le_bytes()); // filter_freq
    b.extend_from_slice(&1f32.to_le_bytes()); // filter_q
    b.extend_from_slice(&0u16.to_le_bytes()); // clip rpc_codes len

    b.extend_from_slice(&1u16.to_le_bytes()); // event_count
    b.extend_from_slice(&0u16.to_le_bytes()); // timestamp_ms
    b.extend_from_slice(&0u16.to_le_bytes()); // random_offset_ms
    b.push(loop_count);
    b.extend_from_slice(&frequency.to_le_bytes());
    b.push(1); // PlayWave
    b.extend_from_slice(&1u16.to_le_bytes()); // track_count
    b.extend_from_slice(&0u16.to_le_bytes()); // wave_index
    b.extend_from_slice(&0u16.to_le_bytes()); // wavebank_index
    b.push(255);
    b.push(255);
    b.extend_from_slice(&0i16.to_le_bytes());
    b.extend_from_slice(&0i16.to_le_bytes());
    b.extend_from_slice(&0f32.to_le_bytes());
    b.extend_from_slice(&0f32.to_le_bytes());
    b.extend_from_slice(&0f32.to_le_bytes());
    b.extend_from_slice(&0f32.to_le_bytes());
    b.push(0); // loops_infinite = false

    write_string(&mut b, name);
    b.push(0); // def_type = Sound
    b.extend_from_slice(&0u16.to_le_bytes());
    b
}

pub fn wave_bank_bytes_single_entry() -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0x4B42_4157u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes()); // entry_count
    b.extend_from_slice(&48_000u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes()); // channels
    b.extend_from_slice(&0u64.to_le_bytes()); // byte_offset
    b.extend_from_slice(&1024u64.to_le_bytes()); // byte_length
    b.extend_from_slice(&0u32.to_le_bytes()); // loop_start
    b.extend_from_slice(&0u32.to_le_bytes()); // loop_length
    b
}
