//! The genome accessor: random-access reference sequence retrieval.
//! External in production (a random-access FASTA/2bit backend); this
//! module supplies the trait boundary plus an in-memory fixture used by
//! tests.

use std::collections::HashMap;

use crate::error::NeoepitopeError;

/// Random-access retrieval of reference genome sequence.
///
/// `fetch` takes a 0-based start and a length, returning an uppercase
/// `A/C/G/T/N` string of exactly `length` bases. Positions outside the
/// chromosome are a hard error.
pub trait GenomeAccessor: Sync {
    fn fetch(&self, chrom: &str, start_0based: i64, length: i64) -> Result<String, NeoepitopeError>;
}

/// A trivial in-memory genome, for tests and small fixtures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGenome {
    sequences: HashMap<String, String>,
}

impl InMemoryGenome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chrom(mut self, chrom: impl Into<String>, sequence: impl Into<String>) -> Self {
        self.sequences.insert(chrom.into(), sequence.into().to_ascii_uppercase());
        self
    }
}

impl GenomeAccessor for InMemoryGenome {
    fn fetch(&self, chrom: &str, start_0based: i64, length: i64) -> Result<String, NeoepitopeError> {
        let seq = self.sequences.get(chrom).ok_or_else(|| {
            NeoepitopeError::GenomeAccess(format!("unknown chromosome `{chrom}`"))
        })?;
        if start_0based < 0 || length < 0 {
            return Err(NeoepitopeError::GenomeAccess(format!(
                "negative coordinates requested on {chrom}: start={start_0based}, length={length}"
            )));
        }
        let start = start_0based as usize;
        let end = start + length as usize;
        let bytes = seq.as_bytes();
        if end > bytes.len() {
            return Err(NeoepitopeError::GenomeAccess(format!(
                "requested stretch {chrom}:{start_0based}-{} past end of chromosome (len {})",
                start_0based + length,
                bytes.len()
            )));
        }
        Ok(seq[start..end].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_returns_requested_stretch() {
        let genome = InMemoryGenome::new().with_chrom("chr1", "ACGTACGTACGT");
        assert_eq!(genome.fetch("chr1", 4, 4).unwrap(), "ACGT");
    }

    #[test]
    fn fetch_errors_past_end_of_chromosome() {
        let genome = InMemoryGenome::new().with_chrom("chr1", "ACGT");
        assert!(genome.fetch("chr1", 0, 100).is_err());
    }

    #[test]
    fn fetch_errors_on_unknown_chromosome() {
        let genome = InMemoryGenome::new().with_chrom("chr1", "ACGT");
        assert!(genome.fetch("chr2", 0, 1).is_err());
    }
}
