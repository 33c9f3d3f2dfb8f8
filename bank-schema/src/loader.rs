//! Loader contract (§4.1): consumes an opaque byte stream and materializes
//! the entities in §3. Mirrors `asset-manager::asset_pkg::AssetPkg::open`'s
//! shape — read everything up front, validate a header, then validate every
//! index reference before handing back a fully-built value — generalized
//! from a single flat asset index to the richer, nested bank schema.

use std::io::Read;

use crate::error::BankError;
use crate::reader::Reader;
use crate::schema::*;

const ENGINE_MAGIC: u32 = 0x5444_4145; // "EADT" little-endian
const ENGINE_VERSION: u16 = 1;
const BANK_MAGIC: u32 = 0x4B4E_4253; // "SBNK" little-endian
const BANK_VERSION: u16 = 1;

/// The capability the loader needs from its caller: an opaque byte stream.
/// Any `Read` is accepted (a real file, an in-memory cursor, a network
/// socket) — the loader never assumes anything beyond sequential bytes.
pub trait ByteStream: Read {}
impl<T: Read> ByteStream for T {}

fn read_all(mut stream: impl ByteStream) -> Result<Vec<u8>, BankError> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Loads the process-wide categories/variables/RPCs (§3: owned by the
/// `AudioEngine`, shared by every `SoundBank`).
pub fn load_engine_data(stream: impl ByteStream) -> Result<EngineData, BankError> {
    let bytes = read_all(stream)?;
    let mut r = Reader::new(&bytes);

    let magic = r.u32()?;
    if magic != ENGINE_MAGIC {
        return Err(BankError::BadMagic(magic));
    }
    let version = r.u16()?;
    if version != ENGINE_VERSION {
        return Err(BankError::UnsupportedVersion(version));
    }

    let category_count = r.u16()?;
    let variable_count = r.u16()?;
    let rpc_count = r.u16()?;

    let mut categories = Vec::with_capacity(category_count as usize);
    for _ in 0..category_count {
        categories.push(parse_category(&mut r)?);
    }
    for (i, c) in categories.iter().enumerate() {
        if let Some(p) = c.parent {
            if p as usize >= categories.len() {
                return Err(BankError::UnresolvedReference {
                    kind: "category.parent",
                    index: p as u32,
                    count: categories.len() as u32,
                });
            }
            if p as usize == i {
                return Err(BankError::UnresolvedReference {
                    kind: "category.parent (self-cycle)",
                    index: p as u32,
                    count: categories.len() as u32,
                });
            }
        }
    }

    let mut variables = Vec::with_capacity(variable_count as usize);
    let mut variable_names = std::collections::HashMap::new();
    for i in 0..variable_count {
        let v = parse_variable(&mut r)?;
        if variable_names.insert(v.name.clone(), i).is_some() {
            return Err(BankError::DuplicateName(v.name));
        }
        variables.push(v);
    }

    let mut rpcs = Vec::with_capacity(rpc_count as usize);
    for i in 0..rpc_count {
        rpcs.push(parse_rpc(&mut r, i as usize, variables.len() as u32)?);
    }

    Ok(EngineData {
        categories,
        variables,
        rpcs,
        variable_names,
    })
}

fn parse_category(r: &mut Reader) -> Result<Category, BankError> {
    let name = r.string()?;
    let max_instances = r.u8()?;
    let fade_in_ms = r.u16()?;
    let fade_out_ms = r.u16()?;
    let instance_behavior = match r.u8()? {
        0 => InstanceBehavior::FailNew,
        1 => InstanceBehavior::ReplaceOldest,
        2 => InstanceBehavior::ReplaceQuietest,
        _ => InstanceBehavior::ReplaceLowestPriority,
    };
    let has_parent = r.u8()? != 0;
    let parent = if has_parent { Some(r.u16()?) } else { None };
    let volume = r.u8()?;
    let visible = r.u8()? != 0;
    Ok(Category {
        name,
        max_instances,
        fade_in_ms,
        fade_out_ms,
        instance_behavior,
        parent,
        volume,
        visible,
    })
}

fn parse_variable(r: &mut Reader) -> Result<Variable, BankError> {
    let name = r.string()?;
    let flags = VariableFlags::from_bits_truncate(r.u8()?);
    let initial = r.f32()?;
    let min = r.f32()?;
    let max = r.f32()?;
    Ok(Variable {
        name,
        flags,
        initial,
        min,
        max,
    })
}

fn parse_rpc(r: &mut Reader, index: usize, variable_count: u32) -> Result<Rpc, BankError> {
    let variable = r.u16()?;
    if variable as u32 >= variable_count {
        return Err(BankError::UnresolvedReference {
            kind: "rpc.variable",
            index: variable as u32,
            count: variable_count,
        });
    }
    let parameter = RpcParameter::from_code(r.u16()?);
    let point_count = r.u16()?;
    let mut points = Vec::with_capacity(point_count as usize);
    for _ in 0..point_count {
        let x = r.f32()?;
        let y = r.f32()?;
        let curve = CurveType::from_code(r.u8()?).unwrap_or(CurveType::Linear);
        if !x.is_finite() || !y.is_finite() {
            return Err(BankError::NonFiniteCurvePoint { rpc_index: index });
        }
        points.push(RpcPoint { x, y, curve });
    }
    if points.windows(2).any(|w| w[0].x >= w[1].x) {
        return Err(BankError::UnorderedCurvePoints { rpc_index: index });
    }
    Ok(Rpc {
        variable,
        parameter,
        points,
    })
}

/// Loads a `SoundBank`'s cues, sounds and variation tables, validating
/// every category/RPC reference against `engine`.
pub fn load_sound_bank(stream: impl ByteStream, engine: &EngineData) -> Result<SoundBank, BankError> {
    let bytes = read_all(stream)?;
    let mut r = Reader::new(&bytes);

    let magic = r.u32()?;
    if magic != BANK_MAGIC {
        return Err(BankError::BadMagic(magic));
    }
    let version = r.u16()?;
    if version != BANK_VERSION {
        return Err(BankError::UnsupportedVersion(version));
    }

    let sound_count = r.u16()?;
    let cue_count = r.u16()?;
    let variation_table_count = r.u16()?;

    let category_count = engine.categories.len() as u32;
    let rpc_count = engine.rpcs.len() as u32;

    let mut sounds = Vec::with_capacity(sound_count as usize);
    for _ in 0..sound_count {
        sounds.push(parse_sound(&mut r, category_count, rpc_count)?);
    }

    let mut variation_tables = Vec::with_capacity(variation_table_count as usize);
    for (i, _) in (0..variation_table_count).enumerate() {
        variation_tables.push(parse_variation_table(
            &mut r,
            i,
            engine.variables.len() as u32,
            sounds.len() as u32,
        )?);
    }

    let mut cues = Vec::with_capacity(cue_count as usize);
    let mut cue_names = std::collections::HashMap::new();
    for i in 0..cue_count {
        let cue = parse_cue(&mut r, sounds.len() as u32, variation_tables.len() as u32)?;
        if cue_names.insert(cue.name.clone(), i).is_some() {
            return Err(BankError::DuplicateName(cue.name));
        }
        cues.push(cue);
    }

    Ok(SoundBank {
        cues,
        sounds,
        variation_tables,
        cue_names,
    })
}

fn parse_sound(r: &mut Reader, category_count: u32, rpc_count: u32) -> Result<Sound, BankError> {
    let flags = SoundFlags::from_bits_truncate(r.u8()?);
    let category = r.u16()?;
    if category as u32 >= category_count {
        return Err(BankError::UnresolvedReference {
            kind: "sound.category",
            index: category as u32,
            count: category_count,
        });
    }
    let volume = r.u8()?;
    let pitch_cents = r.i16()?;
    let priority = r.u8()?;
    let rpc_codes = read_rpc_codes(r, rpc_count)?;
    let dsp_codes = read_u16_vec(r)?;

    let clip_count = r.u16()?;
    let mut clips = Vec::with_capacity(clip_count as usize);
    for _ in 0..clip_count {
        clips.push(parse_clip(r, rpc_count)?);
    }

    Ok(Sound {
        flags,
        category,
        volume,
        pitch_cents,
        priority,
        clips,
        rpc_codes,
        dsp_codes,
    })
}

fn read_u16_vec(r: &mut Reader) -> Result<Vec<u16>, BankError> {
    let count = r.u16()?;
    let mut v = Vec::with_capacity(count as usize);
    for _ in 0..count {
        v.push(r.u16()?);
    }
    Ok(v)
}

fn read_rpc_codes(r: &mut Reader, rpc_count: u32) -> Result<Vec<u16>, BankError> {
    let codes = read_u16_vec(r)?;
    for &code in &codes {
        if code as u32 >= rpc_count {
            return Err(BankError::UnresolvedReference {
                kind: "rpc_code",
                index: code as u32,
                count: rpc_count,
            });
        }
    }
    Ok(codes)
}

fn parse_clip(r: &mut Reader, rpc_count: u32) -> Result<Clip, BankError> {
    let volume = r.u8()?;
    let filter_freq_hz = r.f32()?;
    let filter_q = r.f32()?;
    let rpc_codes = read_rpc_codes(r, rpc_count)?;

    let event_count = r.u16()?;
    let mut events = Vec::with_capacity(event_count as usize);
    for _ in 0..event_count {
        events.push(parse_event(r)?);
    }

    Ok(Clip {
        volume,
        filter_freq_hz,
        filter_q,
        rpc_codes,
        events,
    })
}

fn parse_event(r: &mut Reader) -> Result<Event, BankError> {
    let timestamp_ms = r.u16()?;
    let random_offset_ms = r.u16()?;
    let loop_count = r.u8()?;
    let frequency = r.u16()?;
    let kind = r.u8()?;
    let payload = match kind {
        0 => EventPayload::Stop,
        1 => EventPayload::PlayWave(parse_play_wave(r)?),
        2 => EventPayload::SetVolume(parse_set_value(r)?),
        3 => EventPayload::SetPitch(parse_set_value(r)?),
        _ => EventPayload::Marker {
            marker_id: r.u32()?,
        },
    };
    Ok(Event {
        timestamp_ms,
        random_offset_ms,
        loop_count,
        frequency,
        payload,
    })
}

fn parse_play_wave(r: &mut Reader) -> Result<PlayWaveEvent, BankError> {
    let track_count = r.u16()?;
    let mut tracks = Vec::with_capacity(track_count as usize);
    for _ in 0..track_count {
        tracks.push(WaveTrack {
            wave_index: r.u16()?,
            wavebank_index: r.u16()?,
            weight_min: r.u8()?,
            weight_max: r.u8()?,
        });
    }
    let pitch_variation = (r.i16()?, r.i16()?);
    let volume_variation_db = (r.f32()?, r.f32()?);
    let filter_variation_hz = (r.f32()?, r.f32()?);
    let loops_infinite = r.u8()? != 0;
    Ok(PlayWaveEvent {
        tracks,
        pitch_variation,
        volume_variation_db,
        filter_variation_hz,
        loops_infinite,
    })
}

fn parse_set_value(r: &mut Reader) -> Result<SetValueEvent, BankError> {
    let kind = r.u8()?;
    if kind == 0 {
        Ok(SetValueEvent::Ramp {
            initial: r.f32()?,
            initial_slope: r.f32()?,
            slope_delta: r.f32()?,
            duration_ms: r.u16()?,
        })
    } else {
        let flags = match r.u8()? {
            0 => ValueEquationFlags::Add,
            1 => ValueEquationFlags::Multiply,
            _ => ValueEquationFlags::Replace,
        };
        let curve = match r.u8()? {
            0 => ValueCurve::Linear,
            1 => ValueCurve::Log,
            _ => ValueCurve::RandomInRange,
        };
        Ok(SetValueEvent::Equation {
            flags,
            curve,
            v1: r.f32()?,
            v2: r.f32()?,
        })
    }
}

fn parse_cue(r: &mut Reader, sound_count: u32, table_count: u32) -> Result<CueData, BankError> {
    let name = r.string()?;
    let def_type = r.u8()?;
    let def_index = r.u16()?;
    let definition = if def_type == 0 {
        if def_index as u32 >= sound_count {
            return Err(BankError::UnresolvedReference {
                kind: "cue.sound",
                index: def_index as u32,
                count: sound_count,
            });
        }
        CueDefinition::Sound(def_index)
    } else {
        if def_index as u32 >= table_count {
            return Err(BankError::UnresolvedReference {
                kind: "cue.variation_table",
                index: def_index as u32,
                count: table_count,
            });
        }
        CueDefinition::VariationTable(def_index)
    };
    Ok(CueData { name, definition })
}

fn parse_variation_table(
    r: &mut Reader,
    index: usize,
    variable_count: u32,
    sound_count: u32,
) -> Result<VariationTable, BankError> {
    let policy = match r.u8()? {
        0 => SelectionPolicy::Ordered,
        1 => SelectionPolicy::RandomNoImmediateRepeat,
        2 => SelectionPolicy::Random,
        3 => SelectionPolicy::Shuffle,
        _ => SelectionPolicy::Interactive,
    };
    let has_variable = r.u8()? != 0;
    let variable = if has_variable {
        let v = r.u16()?;
        if v as u32 >= variable_count {
            return Err(BankError::UnresolvedReference {
                kind: "variation_table.variable",
                index: v as u32,
                count: variable_count,
            });
        }
        Some(v)
    } else {
        None
    };

    let entry_count = r.u16()?;
    if entry_count == 0 {
        // §9 open question, resolved: an empty table is InvalidBank at load time.
        return Err(BankError::EmptyVariationTable(index));
    }
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let payload_type = r.u8()?;
        let payload = if payload_type == 0 {
            let sound_index = r.u16()?;
            if sound_index as u32 >= sound_count {
                return Err(BankError::UnresolvedReference {
                    kind: "variation.sound",
                    index: sound_index as u32,
                    count: sound_count,
                });
            }
            VariationPayload::Sound(sound_index)
        } else {
            VariationPayload::WaveTrack {
                wave_index: r.u16()?,
                wavebank_index: r.u16()?,
            }
        };
        let min_weight = r.f32()?;
        let max_weight = r.f32()?;
        entries.push(Variation {
            payload,
            min_weight,
            max_weight,
        });
    }
    Ok(VariationTable {
        policy,
        variable,
        entries,
    })
}
