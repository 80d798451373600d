//! Peptide aggregation: merges each transcript's `neopeptides()` output
//! into a single `peptide -> [metadata, …]` map, skipping an entry
//! already present under that peptide via a full-tuple membership test,
//! not just a peptide-string match. Shared across haplotype blocks and
//! transcript copies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::edit::EditInfo;

/// Everything the engine knows about why a peptide was emitted: the
/// contributing variant(s), any translation warnings (`"nonstop"`), and
/// the transcript that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideMetadata {
    pub info: Vec<EditInfo>,
    pub warnings: Vec<String>,
    pub transcript_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct PeptideAggregator {
    peptides: HashMap<String, Vec<PeptideMetadata>>,
}

impl PeptideAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one transcript/haplotype's `neopeptides()` output in,
    /// skipping any `(peptide, metadata)` pair already present under full
    /// metadata equality.
    pub fn merge(&mut self, found: HashMap<String, Vec<PeptideMetadata>>) {
        for (peptide, metas) in found {
            let entry = self.peptides.entry(peptide).or_default();
            for meta in metas {
                if !entry.contains(&meta) {
                    entry.push(meta);
                }
            }
        }
    }

    pub fn into_map(self) -> HashMap<String, Vec<PeptideMetadata>> {
        self.peptides
    }

    pub fn is_empty(&self) -> bool {
        self.peptides.is_empty()
    }

    pub fn len(&self) -> usize {
        self.peptides.len()
    }
}
