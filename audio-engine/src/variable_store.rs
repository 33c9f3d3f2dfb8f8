//! Variable value storage (spec §4.2). `EngineData` (from `bank-schema`)
//! holds the immutable definitions — name, flags, range; `VariableStore`
//! holds the mutable current values, indexed the same way.
//!
//! Global variables live in one store shared by every `Cue`, guarded by
//! the engine's top-level `parking_lot::Mutex` (§5). Non-global variables
//! are copied into a fresh per-`Cue` store at creation time and are never
//! touched by another thread, so no lock is needed to read or write them.

use bank_schema::{EngineData, VariableFlags};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct VariableStore {
    values: Vec<f32>,
}

impl VariableStore {
    /// One slot per variable in `engine`, seeded with each variable's
    /// initial value.
    pub fn new(engine: &EngineData) -> Self {
        Self {
            values: engine.variables.iter().map(|v| v.initial).collect(),
        }
    }

    pub fn get(&self, index: u16) -> f32 {
        self.values.get(index as usize).copied().unwrap_or(0.0)
    }

    /// Applies `value`, clamped to the variable's declared range. Rejects
    /// writes to `RESERVED` variables — those are computed properties
    /// (e.g. listener distance) the engine updates itself, not inputs a
    /// caller can set (§4.2).
    pub fn set(&mut self, engine: &EngineData, index: u16, value: f32) -> Result<(), EngineError> {
        let def = engine
            .variables
            .get(index as usize)
            .ok_or_else(|| EngineError::NotFound(format!("variable {index}")))?;
        if def.flags.contains(VariableFlags::RESERVED) {
            return Err(EngineError::InvalidCall(format!(
                "variable '{}' is reserved and cannot be set directly",
                def.name
            )));
        }
        if def.flags.contains(VariableFlags::READONLY) {
            return Err(EngineError::InvalidCall(format!(
                "variable '{}' is read-only",
                def.name
            )));
        }
        self.values[index as usize] = def.clamp(value);
        Ok(())
    }

    /// Bypasses the reserved/read-only checks `set` enforces — used by the
    /// engine itself to update computed properties.
    pub fn set_reserved(&mut self, engine: &EngineData, index: u16, value: f32) {
        if let Some(def) = engine.variables.get(index as usize) {
            self.values[index as usize] = def.clamp(value);
        }
    }

    /// Refreshes the engine-computed reserved variables a cue carries
    /// (§4.2, §4.5 step 1), looked up by name since a bank only declares
    /// the ones it actually reads. `Distance`/`OrientationAngle`/
    /// `DopplerPitchScalar`/`SpeedOfSound` are not in `inputs` — this
    /// engine has no listener/emitter position model, so those stay at
    /// their loaded initial values rather than being computed from
    /// nothing.
    pub fn refresh_reserved(&mut self, engine: &EngineData, inputs: &ReservedInputs) {
        for (name, value) in [
            ("NumCueInstances", inputs.num_cue_instances),
            ("AttackTime", inputs.attack_time_ms),
            ("ReleaseTime", inputs.release_time_ms),
        ] {
            if let Some(index) = engine.lookup_variable(name) {
                self.set_reserved(engine, index, value);
            }
        }
    }
}

/// Per-tick computed values fed into [`VariableStore::refresh_reserved`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReservedInputs {
    pub num_cue_instances: f32,
    pub attack_time_ms: f32,
    pub release_time_ms: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_schema::Variable;

    fn engine_with(flags: VariableFlags) -> EngineData {
        EngineData::new(
            vec![],
            vec![Variable {
                name: "v".into(),
                flags,
                initial: 5.0,
                min: 0.0,
                max: 10.0,
            }],
            vec![],
        )
    }

    #[test]
    fn set_clamps_to_range() {
        let engine = engine_with(VariableFlags::PUBLIC);
        let mut store = VariableStore::new(&engine);
        store.set(&engine, 0, 999.0).unwrap();
        assert_eq!(store.get(0), 10.0);
    }

    #[test]
    fn set_rejects_reserved() {
        let engine = engine_with(VariableFlags::RESERVED);
        let mut store = VariableStore::new(&engine);
        assert!(matches!(
            store.set(&engine, 0, 1.0),
            Err(EngineError::InvalidCall(_))
        ));
    }

    #[test]
    fn set_rejects_readonly() {
        let engine = engine_with(VariableFlags::READONLY);
        let mut store = VariableStore::new(&engine);
        assert!(matches!(
            store.set(&engine, 0, 1.0),
            Err(EngineError::InvalidCall(_))
        ));
    }

    #[test]
    fn refresh_reserved_updates_named_variable_bypassing_the_reserved_flag() {
        let engine = EngineData::new(
            vec![],
            vec![Variable {
                name: "NumCueInstances".into(),
                flags: VariableFlags::RESERVED,
                initial: 0.0,
                min: 0.0,
                max: 255.0,
            }],
            vec![],
        );
        let mut store = VariableStore::new(&engine);
        store.refresh_reserved(
            &engine,
            &ReservedInputs {
                num_cue_instances: 3.0,
                attack_time_ms: 0.0,
                release_time_ms: 0.0,
            },
        );
        assert_eq!(store.get(0), 3.0);
    }

    #[test]
    fn refresh_reserved_ignores_undeclared_names() {
        let engine = engine_with(VariableFlags::PUBLIC);
        let mut store = VariableStore::new(&engine);
        store.refresh_reserved(&engine, &ReservedInputs::default());
        assert_eq!(store.get(0), 5.0);
    }
}
