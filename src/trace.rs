//! The persisted trace format (spec.md §6): an ordered list of
//! `(step_index, choice_kind, value)` tuples sufficient, given an identical
//! test body and config, to reproduce an interleaving bit-for-bit.

use crate::operation::OperationId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceKind {
    Operation,
    Bool,
    Int,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceValue {
    Operation(OperationId),
    Bool(bool),
    Int(i32),
}

impl Serialize for OperationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0 as u64)
    }
}

impl<'de> Deserialize<'de> for OperationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        Ok(OperationId(raw as usize))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step_index: usize,
    pub choice_kind: ChoiceKind,
    pub value: ChoiceValue,
}

/// A full replay anchor list for one iteration, plus the seed it was
/// captured under (so a `Trace` alone documents how it was produced, even
/// though replaying it never re-consults the PRNG).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub seed: u64,
    pub steps: Vec<TraceEntry>,
}

impl Trace {
    pub fn new(seed: u64) -> Self {
        Trace {
            seed,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, choice_kind: ChoiceKind, value: ChoiceValue) {
        let step_index = self.steps.len();
        self.steps.push(TraceEntry {
            step_index,
            choice_kind,
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
