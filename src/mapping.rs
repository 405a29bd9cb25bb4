//! Bytecode line <-> recreated source line correspondence for one decompiled unit.
//!
//! The table is kept exactly as the engine reported it. Pairs may repeat or
//! arrive unsorted; lookups scan in insertion order and the first match wins.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LineMapping {
    pairs: Vec<(u32, u32)>,
}

impl LineMapping {
    /// Builds a mapping from the engine's flat `[bytecode, source, bytecode, source, ...]`
    /// table. A trailing unpaired value is dropped.
    pub fn from_flat(table: &[u32]) -> Self {
        let pairs = table
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        Self { pairs }
    }

    pub fn from_pairs(pairs: Vec<(u32, u32)>) -> Self {
        Self { pairs }
    }

    pub fn bytecode_to_source(&self, line: u32) -> Option<u32> {
        self.pairs
            .iter()
            .find(|(bytecode, _)| *bytecode == line)
            .map(|(_, source)| *source)
    }

    pub fn source_to_bytecode(&self, line: u32) -> Option<u32> {
        self.pairs
            .iter()
            .find(|(_, source)| *source == line)
            .map(|(bytecode, _)| *bytecode)
    }

    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
