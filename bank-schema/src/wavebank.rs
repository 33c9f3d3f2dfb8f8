//! Wave bank metadata (§3 "Wave", §6 "Wave decoder" collaborator).
//!
//! This generalizes `asset-manager::asset_pkg::AssetPkg`'s flat
//! `AssetIndexEntry` table to the fields a `PlayWave` event needs to
//! resolve a `(wave_index, wavebank_index)` pair, without decoding any
//! PCM/ADPCM/xWMA payload — that's the external wave-decoder collaborator's
//! job (§6), out of scope here.

use std::io::Read;

use crate::error::BankError;
use crate::loader::ByteStream;
use crate::reader::Reader;

const WAVEBANK_MAGIC: u32 = 0x4B42_4157; // "WABK"
const WAVEBANK_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy)]
pub struct WaveBankEntry {
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_offset: u64,
    pub byte_length: u64,
    pub loop_start: u32,
    pub loop_length: u32,
}

#[derive(Debug, Clone)]
pub struct WaveBank {
    pub entries: Vec<WaveBankEntry>,
}

impl WaveBank {
    pub fn entry(&self, wave_index: u16) -> Option<&WaveBankEntry> {
        self.entries.get(wave_index as usize)
    }
}

pub fn load_wave_bank(stream: impl ByteStream) -> Result<WaveBank, BankError> {
    let mut s = stream;
    let mut bytes = Vec::new();
    s.read_to_end(&mut bytes)?;
    let mut r = Reader::new(&bytes);

    let magic = r.u32()?;
    if magic != WAVEBANK_MAGIC {
        return Err(BankError::BadMagic(magic));
    }
    let version = r.u16()?;
    if version != WAVEBANK_VERSION {
        return Err(BankError::UnsupportedVersion(version));
    }

    let entry_count = r.u16()?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        entries.push(WaveBankEntry {
            sample_rate: r.u32()?,
            channels: r.u16()?,
            byte_offset: r.u64()?,
            byte_length: r.u64()?,
            loop_start: r.u32()?,
            loop_length: r.u32()?,
        });
    }
    Ok(WaveBank { entries })
}
