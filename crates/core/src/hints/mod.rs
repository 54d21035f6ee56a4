//! Optional disassembler export consumed as classification hints.
//!
//! The export is a JSON bundle of function ranges, per-function data
//! references, and label tables. The detector only ever uses it as a negative
//! signal: an offset the disassembler already accounts for is code- or
//! label-adjacent, so the classifier refuses to guess a physical meaning.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A function range exported by the disassembler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionHint {
    pub name: String,
    pub start_address: u32,
    pub end_address: u32,
    /// Addresses this function references as data.
    #[serde(default)]
    pub data_refs: BTreeSet<u32>,
    /// Function-local labels.
    #[serde(default)]
    pub labels: BTreeMap<String, u32>,
}

/// Symbol information for one image, loaded once and read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassemblerHints {
    #[serde(default)]
    pub functions: Vec<FunctionHint>,
    /// Process-wide labels.
    #[serde(default)]
    pub labels: BTreeMap<String, u32>,
}

impl DisassemblerHints {
    /// True when `offset` falls inside a known function range, is referenced
    /// as data by some function, or carries a process-wide label.
    pub fn covers_offset(&self, offset: usize) -> bool {
        let Ok(address) = u32::try_from(offset) else {
            return false;
        };
        self.functions.iter().any(|function| {
            function.data_refs.contains(&address)
                || (function.start_address <= address && address <= function.end_address)
        }) || self.labels.values().any(|&label| label == address)
    }
}
