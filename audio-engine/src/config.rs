//! Engine-wide construction parameters, modeled after
//! `asset-manager::asset_pkg::AssetPkg::open`'s explicit `memory_budget`
//! argument: every resource guard the engine enforces is passed in at
//! construction rather than hard-coded.

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Frames rendered per `MixDriver` tick.
    pub quantum_frames: usize,
    pub sample_rate: u32,
    pub output_channels: u16,
    pub max_categories: usize,
    pub max_cues: usize,
    pub max_waves: usize,
    /// Bounded capacity of the notification queue (§6).
    pub notification_capacity: usize,
    /// Seed for every "random" decision the engine makes (§9 open
    /// question, resolved: deterministic given a fixed seed).
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quantum_frames: 1024,
            sample_rate: 48_000,
            output_channels: 2,
            max_categories: 256,
            max_cues: 4096,
            max_waves: 8192,
            notification_capacity: 1024,
            rng_seed: 0,
        }
    }
}
