//! Runtime parameter curve evaluation (spec §4.3). `eval_rpc` is pure and
//! allocates nothing, so it is safe to call while holding the engine's
//! lock on every mix tick. `accumulate_rpcs` is the per-tick refresh of a
//! clip's `InstanceRPCData` (§3): it walks a sound/clip's `rpc_codes`,
//! evaluates each against the variable it targets, and sums the result
//! per `RpcParameter` so `Cue::tick` can fold it into `finalVolume`/
//! `finalPitch` (§4.5).

use std::f32::consts::PI;

use bank_schema::units::db_to_linear;
use bank_schema::{CurveType, EngineData, Rpc, RpcParameter, VariableFlags};

use crate::variable_store::VariableStore;

/// Evaluates `rpc` at `value`, clamping to the first/last point outside the
/// curve's domain. Each point's `curve` describes the interpolation shape
/// of the segment leading *into* the next point.
pub fn eval_rpc(rpc: &Rpc, value: f32) -> f32 {
    let points = &rpc.points;
    match points.len() {
        0 => return 0.0,
        1 => return points[0].y,
        _ => {}
    }
    if value <= points[0].x {
        return points[0].y;
    }
    let last = points.len() - 1;
    if value >= points[last].x {
        return points[last].y;
    }
    for w in points.windows(2) {
        let (p0, p1) = (w[0], w[1]);
        if value >= p0.x && value <= p1.x {
            let span = p1.x - p0.x;
            let t = if span > 0.0 { (value - p0.x) / span } else { 0.0 };
            let shaped = shape(p0.curve, t);
            return p0.y + (p1.y - p0.y) * shaped;
        }
    }
    points[last].y
}

fn shape(curve: CurveType, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match curve {
        CurveType::Linear => t,
        CurveType::Fast => t.sqrt(),
        CurveType::Slow => t * t,
        CurveType::Sine => (1.0 - (PI * t).cos()) / 2.0,
        CurveType::Discrete => {
            if t >= 1.0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Per-tick RPC output, accumulated across every RPC targeting a clip
/// (§3's `InstanceRPCData`). Parameters not rendered anywhere in this
/// crate (filter freq/Q, DSP presets) are still tracked here so a host
/// wiring up its own DSP chain has something to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcDeltas {
    pub volume_db: f32,
    pub pitch_cents: f32,
    pub reverb_send: f32,
    pub filter_freq_hz: f32,
    pub filter_q: f32,
}

impl RpcDeltas {
    pub fn volume_mul(&self) -> f32 {
        db_to_linear(self.volume_db)
    }
}

/// Evaluates every RPC named in `rpc_codes` against its target variable's
/// current value and sums the results per parameter. `rpc.variable` is
/// resolved against `global_vars` when the variable definition carries
/// `VariableFlags::GLOBAL`, otherwise against the cue-local `local_vars`
/// (§4.2: global variables live in one engine-wide store, non-global ones
/// are copied per-cue).
pub fn accumulate_rpcs(
    rpc_codes: &[u16],
    engine: &EngineData,
    global_vars: &VariableStore,
    local_vars: &VariableStore,
) -> RpcDeltas {
    let mut deltas = RpcDeltas::default();
    for &code in rpc_codes {
        let Some(rpc) = engine.rpcs.get(code as usize) else {
            continue;
        };
        let is_global = engine
            .variables
            .get(rpc.variable as usize)
            .is_some_and(|def| def.flags.contains(VariableFlags::GLOBAL));
        let value = if is_global {
            global_vars.get(rpc.variable)
        } else {
            local_vars.get(rpc.variable)
        };
        let out = eval_rpc(rpc, value);
        match rpc.parameter {
            RpcParameter::VolumeDb => deltas.volume_db += out,
            RpcParameter::PitchCents => deltas.pitch_cents += out,
            RpcParameter::ReverbSend => deltas.reverb_send += out,
            RpcParameter::FilterFreqHz => deltas.filter_freq_hz += out,
            RpcParameter::FilterQ => deltas.filter_q += out,
            RpcParameter::DspPreset(_) => {}
        }
    }
    deltas
}
