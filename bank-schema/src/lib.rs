//! In-memory sound-bank schema and byte-stream loader contract (spec §3,
//! §4.1). Parsing of an actual on-disk bank file format is out of scope —
//! only the schema this crate produces, and the loader's validation and
//! error behavior, are specified. See `SPEC_FULL.md` at the workspace root.

pub mod error;
pub mod loader;
pub mod reader;
pub mod schema;
pub mod units;
pub mod wavebank;

pub use error::BankError;
pub use loader::{load_engine_data, load_sound_bank, ByteStream};
pub use schema::*;
pub use wavebank::{load_wave_bank, WaveBank, WaveBankEntry};
