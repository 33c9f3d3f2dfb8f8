//! Per-period mix driver (spec §4.5). Ticks every active `Cue`, applies a
//! caller-supplied output attenuation/pan matrix (row-major source x
//! output, multiply-accumulate only — no spatialization math, per the
//! Non-goal that this engine never does 3D audio math itself) and buffers
//! any surplus rendered frames the backend didn't consume this callback in
//! a `ringbuf` ring buffer, the same crate `audio-system`'s teacher sibling
//! repos reach for rather than hand-rolling one.

use std::sync::Arc;

use bank_schema::EngineData;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::cue::{Cue, WaveSourceFactory};
use crate::rng::EngineRng;
use crate::variable_store::VariableStore;

/// A row-major, source-count x output-channel-count attenuation/pan
/// matrix. `matrix[src * out_channels + ch]` scales source `src`'s mono
/// contribution into output channel `ch`.
#[derive(Debug, Clone)]
pub struct MixMatrix {
    pub out_channels: u16,
    pub weights: Vec<f32>,
}

impl MixMatrix {
    /// Equal-power-ish default: every source goes to every output channel
    /// at unity gain divided by channel count, so a mono source spread
    /// across a stereo pair doesn't double in apparent loudness.
    pub fn identity(out_channels: u16) -> Self {
        let per_channel = 1.0 / out_channels.max(1) as f32;
        Self {
            out_channels,
            weights: vec![per_channel; out_channels as usize],
        }
    }
}

pub struct MixDriver {
    quantum_frames: usize,
    out_channels: u16,
    matrix: MixMatrix,
    surplus_prod: HeapProd<f32>,
    surplus_cons: HeapCons<f32>,
}

impl MixDriver {
    pub fn new(quantum_frames: usize, out_channels: u16) -> Self {
        let rb = HeapRb::<f32>::new(quantum_frames * out_channels as usize * 4);
        let (surplus_prod, surplus_cons) = rb.split();
        Self {
            quantum_frames,
            out_channels,
            matrix: MixMatrix::identity(out_channels),
            surplus_prod,
            surplus_cons,
        }
    }

    pub fn set_matrix(&mut self, matrix: MixMatrix) {
        self.matrix = matrix;
    }

    /// Mixes one quantum from every cue in `cues`, applies the output
    /// matrix, and pushes the interleaved result into the surplus buffer.
    /// Leaves dropping cues that just finished to the caller, which needs
    /// to see their final state to publish `CueDestroyed`. Collects every
    /// `Marker` event fired this quantum into `markers` as `(cue, marker_id)`
    /// and computes each cue's `NumCueInstances` (§4.2) — the one reserved
    /// variable that needs visibility across every live cue rather than
    /// just its own.
    pub fn tick(
        &mut self,
        cues: &mut [Cue],
        wave_factory: &dyn WaveSourceFactory,
        rng: &mut EngineRng,
        quantum_ms: f64,
        engine: &EngineData,
        global_vars: &VariableStore,
        markers: &mut Vec<(u64, u32)>,
    ) {
        let mut mono = vec![0.0f32; self.quantum_frames];
        let num_instances: Vec<u32> = (0..cues.len())
            .map(|i| {
                (0..cues.len())
                    .filter(|&j| {
                        j != i
                            && Arc::ptr_eq(&cues[j].bank, &cues[i].bank)
                            && cues[j].sound_index == cues[i].sound_index
                    })
                    .count() as u32
            })
            .collect();
        for (i, cue) in cues.iter_mut().enumerate() {
            let mut cue_markers = Vec::new();
            let (buf, _keep) = cue.tick(
                quantum_ms,
                self.quantum_frames,
                wave_factory,
                rng,
                engine,
                global_vars,
                num_instances[i],
                &mut cue_markers,
            );
            let handle = cue.handle;
            markers.extend(cue_markers.into_iter().map(|marker_id| (handle, marker_id)));
            for (m, s) in mono.iter_mut().zip(buf.iter()) {
                *m += s;
            }
        }

        let mut interleaved = Vec::with_capacity(self.quantum_frames * self.out_channels as usize);
        for &sample in mono.iter() {
            for ch in 0..self.out_channels as usize {
                let weight = self.matrix.weights.get(ch).copied().unwrap_or(0.0);
                interleaved.push(sample * weight);
            }
        }
        let _ = self.surplus_prod.push_slice(&interleaved);
    }

    /// Fills `out` from the surplus buffer, zero-filling anything not yet
    /// available (e.g. the callback asked for more frames than the last
    /// `tick` produced).
    pub fn drain_into(&mut self, out: &mut [f32]) {
        let n = self.surplus_cons.pop_slice(out);
        for s in out[n..].iter_mut() {
            *s = 0.0;
        }
    }

    pub fn available_frames(&self) -> usize {
        self.surplus_cons.occupied_len() / self.out_channels.max(1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::SilentWaveSourceFactory;

    #[test]
    fn identity_matrix_splits_power_across_channels() {
        let m = MixMatrix::identity(2);
        assert!((m.weights[0] - 0.5).abs() < 1e-6);
        assert!((m.weights[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tick_with_no_cues_produces_silence() {
        let mut driver = MixDriver::new(64, 2);
        let factory = SilentWaveSourceFactory { frames_total: 0 };
        let mut rng = EngineRng::new(0);
        let mut cues: Vec<Cue> = Vec::new();
        let engine = EngineData::new(vec![], vec![], vec![]);
        let global_vars = VariableStore::new(&engine);
        let mut markers = Vec::new();
        driver.tick(&mut cues, &factory, &mut rng, 1.0, &engine, &global_vars, &mut markers);
        let mut out = vec![1.0f32; 128];
        driver.drain_into(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
    }
}
