//! Dirty-checked persistence of engine state.

use tracing::{debug, error};

use crate::{
    engine::{GameEngine, Store},
    error::Result,
};

/// What a save pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Serialization matched the last persisted bytes; nothing written.
    Unchanged,
    /// New bytes were persisted.
    Saved {
        /// Size of the persisted serialization.
        bytes: usize,
    },
}

/// Skips persistence when the serialized game has not changed.
#[derive(Debug, Clone)]
pub struct SaveGate {
    /// Serialization as of load or last successful save.
    baseline: Vec<u8>,
}

impl SaveGate {
    /// Start from the serialization the session was loaded from.
    pub fn new(baseline: Vec<u8>) -> Self {
        Self { baseline }
    }

    /// Bytes the next pass compares against.
    pub fn baseline(&self) -> &[u8] {
        &self.baseline
    }

    /// Run one save pass.
    ///
    /// The engine is first allowed to finish pending server work so a move
    /// shown in a dialog is not dropped from the saved state. On a store
    /// failure the engine is not told the save succeeded and the baseline is
    /// kept.
    pub fn check<E>(
        &mut self,
        engine: &mut E,
        store: &mut dyn Store,
        dict_override: Option<&str>,
    ) -> Result<SaveOutcome>
    where
        E: GameEngine + ?Sized,
    {
        engine.server_do();
        let mut gi = engine.game_info();
        if let Some(dict) = dict_override {
            gi.dict_name = dict.to_string();
        }

        let state = engine.save_to_stream(&gi);
        if state == self.baseline {
            debug!(bytes = state.len(), "save_skipped_unchanged");
            return Ok(SaveOutcome::Unchanged);
        }

        let summary = engine.summarize(&gi);
        if let Err(e) = store.persist(&state, &summary) {
            error!(error = %e, "save_failed");
            return Err(e.into());
        }
        engine.save_succeeded();
        let bytes = state.len();
        self.baseline = state;
        debug!(bytes, "save_persisted");
        Ok(SaveOutcome::Saved { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        test_support::{MemoryStore, ScriptedEngine},
    };

    #[test]
    fn unchanged_state_skips_persist() {
        let (mut engine, probe) = ScriptedEngine::new();
        let mut store = MemoryStore::new();
        let mut gate = SaveGate::new(probe.serialized());
        let out = gate.check(&mut engine, &mut store, None).unwrap();
        assert_eq!(out, SaveOutcome::Unchanged);
        assert_eq!(store.save_count(), 0);
        assert_eq!(probe.count("save_succeeded"), 0);
        // pending server work still ran first
        assert_eq!(probe.call_names()[..2], ["server_do", "save_to_stream"]);
    }

    #[test]
    fn changed_state_persists_then_rebaselines() {
        let (mut engine, probe) = ScriptedEngine::new();
        let mut store = MemoryStore::new();
        let mut gate = SaveGate::new(probe.serialized());
        probe.with(|s| s.revision = 3);

        let out = gate.check(&mut engine, &mut store, None).unwrap();
        assert!(matches!(out, SaveOutcome::Saved { .. }));
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.saved()[0].state, probe.serialized());
        assert_eq!(store.saved()[0].summary.n_moves, 3);
        assert_eq!(probe.with(|s| s.save_succeeded), 1);
        assert_eq!(gate.baseline(), probe.serialized().as_slice());

        // no intervening mutation: identical bytes, skipped
        let again = gate.check(&mut engine, &mut store, None).unwrap();
        assert_eq!(again, SaveOutcome::Unchanged);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn dict_override_counts_as_change() {
        let (mut engine, probe) = ScriptedEngine::new();
        let mut store = MemoryStore::new();
        let mut gate = SaveGate::new(probe.serialized());
        gate.check(&mut engine, &mut store, Some("Spanish")).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.saved()[0].summary.dict_name, "Spanish");
    }

    #[test]
    fn persist_failure_keeps_baseline_and_skips_ack() {
        let (mut engine, probe) = ScriptedEngine::new();
        let mut store = MemoryStore::new();
        store.set_failing(true);
        let baseline = probe.serialized();
        let mut gate = SaveGate::new(baseline.clone());
        probe.with(|s| s.revision = 1);
        let err = gate.check(&mut engine, &mut store, None).unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
        assert_eq!(gate.baseline(), baseline.as_slice());
        assert_eq!(probe.count("save_succeeded"), 0);
    }
}
