use crate::edit::Source;

/// Error taxonomy for the transcript edit-and-translate engine.
///
/// `ReferenceMismatch` and `DuplicateVariantAtPosition` are the two
/// variants the router is expected to surface to its caller; everything
/// else is handled locally by the component that can raise it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NeoepitopeError {
    #[error(
        "deletion at {chrom}:{pos} expected reference `{expected}`, genome has `{found}`"
    )]
    ReferenceMismatch {
        chrom: String,
        pos: i64,
        expected: String,
        found: String,
    },

    #[error("duplicate {source:?} SNV at 0-based genomic position {pos} on {chrom}")]
    DuplicateVariantAtPosition {
        chrom: String,
        pos: i64,
        source: Source,
    },

    #[error("unsupported annotation feature kind `{0}`")]
    UnsupportedFeatureKind(String),

    #[error("genome accessor error: {0}")]
    GenomeAccess(String),

    #[error("{0}")]
    Validation(String),
}
