//! Transcript annotation: exon/start-codon/stop-codon rows for a single
//! transcript, and the immutable record the engine builds from them.
//!
//! Parsing a GTF/GFF file into rows is a caller concern. What this
//! module owns is turning a transcript's already-parsed rows into the
//! immutable `TranscriptAnnotation` record the engine operates on.

use std::collections::HashMap;

use crate::error::NeoepitopeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Minus)
    }
}

/// One row of a transcript's materialized annotation, as produced by the
/// external annotation store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Exon,
    StartCodon,
    StopCodon,
}

impl Feature {
    /// Parses a raw annotation-row feature field (`"exon"`,
    /// `"start_codon"`, `"stop_codon"`) into the closed set this engine
    /// understands. Any other value is a feature kind this engine has no
    /// handling for.
    pub fn parse(raw: &str) -> Result<Self, NeoepitopeError> {
        match raw {
            "exon" => Ok(Feature::Exon),
            "start_codon" => Ok(Feature::StartCodon),
            "stop_codon" => Ok(Feature::StopCodon),
            other => Err(NeoepitopeError::UnsupportedFeatureKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationRow {
    pub chrom: String,
    pub feature: Feature,
    pub start_1based: i64,
    pub end_1based: i64,
    pub strand: Strand,
}

impl AnnotationRow {
    /// Builds a row from raw text fields, rejecting a feature kind this
    /// engine doesn't understand. The caller that encounters this error
    /// should skip just the transcript the row belongs to.
    pub fn from_fields(
        chrom: impl Into<String>,
        feature: &str,
        start_1based: i64,
        end_1based: i64,
        strand: Strand,
    ) -> Result<Self, NeoepitopeError> {
        Ok(AnnotationRow {
            chrom: chrom.into(),
            feature: Feature::parse(feature)?,
            start_1based,
            end_1based,
            strand,
        })
    }
}

/// Immutable per-transcript record: exon intervals plus start/stop codon
/// positions and strand. `intervals` is the flat, sorted, 0-based
/// half-open boundary sequence: `(b0,b1), (b2,b3), …` are the exons in
/// genomic order.
#[derive(Debug, Clone)]
pub struct TranscriptAnnotation {
    pub transcript_id: String,
    pub chrom: String,
    pub strand: Strand,
    pub intervals: Vec<i64>,
    /// 1-based genomic position of the first base of the start codon.
    pub start_codon_1based: i64,
    /// 1-based genomic position of the first base of the stop codon.
    pub stop_codon_1based: i64,
    /// Index into `intervals` such that the start codon's first base falls
    /// in the exon pair ending at this index (cached for reuse).
    pub start_codon_index: usize,
    pub stop_codon_index: usize,
}

impl TranscriptAnnotation {
    /// Builds a transcript annotation from materialized rows, which are
    /// assumed already validated to the closed `Feature` set (see
    /// `AnnotationRow::from_fields` for the entry point that rejects an
    /// unsupported feature kind before it ever reaches here).
    ///
    /// Returns `Ok(None)` (silent exclusion) when either codon is absent.
    pub fn from_rows(
        transcript_id: impl Into<String>,
        rows: &[AnnotationRow],
    ) -> Result<Option<Self>, NeoepitopeError> {
        let transcript_id = transcript_id.into();
        if rows.is_empty() {
            return Ok(None);
        }
        let chrom = rows[0].chrom.clone();
        let strand = rows[0].strand;

        let mut intervals = Vec::new();
        let mut start_codon_1based = None;
        let mut stop_codon_1based = None;
        for row in rows {
            match row.feature {
                Feature::Exon => {
                    intervals.push(row.start_1based - 1);
                    intervals.push(row.end_1based);
                }
                Feature::StartCodon => start_codon_1based = Some(row.start_1based),
                Feature::StopCodon => stop_codon_1based = Some(row.start_1based),
            }
        }
        intervals.sort_unstable();

        let (start_codon_1based, stop_codon_1based) =
            match (start_codon_1based, stop_codon_1based) {
                (Some(s), Some(e)) => (s, e),
                _ => return Ok(None),
            };

        let start_codon_index = boundary_index(&intervals, start_codon_1based - 1);
        let stop_codon_index = boundary_index(&intervals, stop_codon_1based - 1);

        Ok(Some(TranscriptAnnotation {
            transcript_id,
            chrom,
            strand,
            intervals,
            start_codon_1based,
            stop_codon_1based,
            start_codon_index,
            stop_codon_index,
        }))
    }

    pub fn exon_count(&self) -> usize {
        self.intervals.len() / 2
    }
}

/// Half-open-interval membership index: `partition_point` over `<= pos`
/// gives an odd index exactly when `pos` falls inside one of the exon
/// pairs `(b0,b1), (b2,b3), …`.
pub fn boundary_index(intervals: &[i64], pos: i64) -> usize {
    intervals.partition_point(|&b| b <= pos)
}

/// Reads materialized annotation rows for a transcript id. External in
/// production (backed by a parsed GTF/GFF); this trait is the seam.
pub trait AnnotationStore: Sync {
    fn rows_for(&self, transcript_id: &str) -> Option<Vec<AnnotationRow>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotationStore {
    rows: HashMap<String, Vec<AnnotationRow>>,
}

impl InMemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(mut self, id: impl Into<String>, rows: Vec<AnnotationRow>) -> Self {
        self.rows.insert(id.into(), rows);
        self
    }
}

impl AnnotationStore for InMemoryAnnotationStore {
    fn rows_for(&self, transcript_id: &str) -> Option<Vec<AnnotationRow>> {
        self.rows.get(transcript_id).cloned()
    }
}
