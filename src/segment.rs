//! The annotated-sequence segment model: each piece of a spliced,
//! edited coding sequence tagged with where it came from — untouched
//! reference, a somatic or germline edit, or a hybrid deletion where
//! both sources merged.

use crate::edit::{EditInfo, Source};

/// Provenance of a segment of the annotated/mutated coding sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Untouched reference sequence.
    Reference,
    Germline,
    Somatic,
    /// A deletion merged from both sources; the pair records which side's
    /// interval was encountered first during the sweep in `expressed_edits`
    /// (`Hybrid(Germline, Somatic)` renders as `GS`, the reverse as `SG`).
    Hybrid(Source, Source),
}

impl Origin {
    pub fn from_source(source: Source) -> Self {
        match source {
            Source::Somatic => Origin::Somatic,
            Source::Germline => Origin::Germline,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Origin::Reference)
    }
}

/// One piece of the ordered list `annotated_seq` produces: either a run of
/// reference nucleotides, a short SNV/insertion run, or a zero-length
/// deletion marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub nucleotides: String,
    pub origin: Origin,
    /// Variant metadata contributing to this segment; empty for reference
    /// segments, one entry for a plain edit, two for a hybrid deletion.
    pub info: Vec<EditInfo>,
    /// 1-based genomic position of the first base of this segment (on the
    /// + strand coordinate system, regardless of transcript strand).
    pub genomic_anchor: i64,
    /// Genomic span this marker removed, for a deletion segment; `0` for
    /// every other kind of segment. `nucleotides` stays empty for a
    /// deletion marker, so the merged span's length (which can differ
    /// from any single contributing deletion's own length once somatic
    /// and germline deletions have merged) has to be carried separately
    /// for the frame-shift bookkeeping in `neopeptides`.
    pub deleted_length: i64,
}

impl Segment {
    pub fn reference(nucleotides: impl Into<String>, genomic_anchor: i64) -> Self {
        Segment {
            nucleotides: nucleotides.into(),
            origin: Origin::Reference,
            info: Vec::new(),
            genomic_anchor,
            deleted_length: 0,
        }
    }
}
