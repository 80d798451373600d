//! The edit data model: what a single phased variant looks like once it
//! has been accepted onto a [`crate::transcript::Transcript`]'s edit
//! store.

use serde::{Deserialize, Serialize};

/// Somatic vs. germline provenance of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Somatic,
    Germline,
}

/// The three edit kinds this engine supports: SNV, insertion, deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    V,
    I,
    D,
}

/// The `(chrom, pos, ref, alt, kind, vaf)` metadata tuple carried by every
/// edit, surfaced verbatim in peptide output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditInfo {
    pub chrom: String,
    /// 1-based genomic position, as recorded at the call site of `apply_edit`.
    pub pos: i64,
    pub ref_bases: String,
    pub alt_bases: String,
    pub kind: EditKind,
    pub vaf: Option<f64>,
}

/// A single-nucleotide variant or insertion anchored at a 0-based genomic
/// coordinate. Stored in [`crate::transcript::Transcript`]'s `snv_ins` map,
/// keyed by that coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEdit {
    /// Alt base(s) for a V, inserted bases for an I.
    pub seq: String,
    pub kind: EditKind,
    pub source: Source,
    pub info: EditInfo,
}

/// A deletion spanning a 0-based, half-open genomic interval.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionInterval {
    pub start: i64,
    pub end: i64,
    pub source: Source,
    pub info: EditInfo,
}
