//! Runtime wave playback (spec §6 "Wave decoder" collaborator). Decoding
//! PCM/ADPCM/xWMA payloads is explicitly out of scope (§3 Non-goals) — the
//! engine only needs *something* that can fill a buffer and report when
//! it's exhausted, so that collaborator is a trait the host supplies.

/// A single decoded audio source, advanced one render quantum at a time.
/// Implementations own their own seek position; the engine never inspects
/// sample data.
pub trait WaveSource: Send {
    /// Adds this source's samples into `out` (mono, later spread across
    /// output channels by the mix matrix). Must not overwrite — `out` may
    /// already contain other sources' contributions.
    fn render(&mut self, out: &mut [f32]);
    fn finished(&self) -> bool;
    /// Rewinds to the start, used when a clip's loop count allows another
    /// pass.
    fn restart(&mut self);
}

/// Test/placeholder source that never produces audio. Used where a real
/// wave-decoder collaborator hasn't been wired in — e.g. a cue played
/// purely to exercise state-machine and RPC behavior in tests.
pub struct SilentWaveSource {
    frames_total: u64,
    frames_rendered: u64,
}

impl SilentWaveSource {
    pub fn new(frames_total: u64) -> Self {
        Self {
            frames_total,
            frames_rendered: 0,
        }
    }
}

impl WaveSource for SilentWaveSource {
    fn render(&mut self, out: &mut [f32]) {
        self.frames_rendered += out.len() as u64;
    }

    fn finished(&self) -> bool {
        self.frames_rendered >= self.frames_total
    }

    fn restart(&mut self) {
        self.frames_rendered = 0;
    }
}

/// Test double that plays back a fixed, in-memory sample buffer. Used by
/// `integration-tests` to assert the mixer actually produces the samples a
/// wave contributes.
pub struct FixtureWaveSource {
    samples: Vec<f32>,
    pos: usize,
}

impl FixtureWaveSource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples, pos: 0 }
    }
}

impl WaveSource for FixtureWaveSource {
    fn render(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            if self.pos >= self.samples.len() {
                break;
            }
            *s += self.samples[self.pos];
            self.pos += 1;
        }
    }

    fn finished(&self) -> bool {
        self.pos >= self.samples.len()
    }

    fn restart(&mut self) {
        self.pos = 0;
    }
}

/// A single playing wave: static gain/pitch resolved from its owning clip
/// and `PlayWave` track variation, plus remaining loop count.
pub struct WaveVoice {
    pub wave_index: u16,
    pub wavebank_index: u16,
    pub source: Box<dyn WaveSource>,
    pub gain_linear: f32,
    /// `None` means infinite looping.
    pub loops_remaining: Option<u32>,
}

impl WaveVoice {
    /// Renders one quantum, looping or marking itself finished as needed.
    /// `envelope` is the cue's per-tick `finalVolume` scalar (§4.5:
    /// category chain x sound x clip x RPC x fade), folded in alongside
    /// this voice's own static/variation gain. Returns `true` while the
    /// voice should keep being polled.
    pub fn render(&mut self, out: &mut [f32], envelope: f32) -> bool {
        self.source.render(out);
        for s in out.iter_mut() {
            *s *= self.gain_linear * envelope;
        }
        if self.source.finished() {
            match self.loops_remaining {
                None => {
                    self.source.restart();
                    true
                }
                Some(0) => false,
                Some(n) => {
                    self.loops_remaining = Some(n - 1);
                    self.source.restart();
                    true
                }
            }
        } else {
            true
        }
    }
}
