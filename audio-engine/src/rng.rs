//! Deterministic randomness for variation selection and `SetValueEvent`'s
//! `RandomInRange` curve (§9 open question: the engine must be able to
//! reproduce a playback exactly given the same seed, so every "random"
//! decision draws from one seeded generator instead of thread-local
//! entropy).

use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct EngineRng {
    inner: StdRng,
}

impl EngineRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.inner
    }
}
