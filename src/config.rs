//! Engine configuration: the tunables that control peptide enumeration
//! (k-mer window range, start-codon policy, the VAF field position, and
//! the upstream-ATG scan cap), gathered into one builder-constructed
//! struct rather than threaded as loose arguments.

use derive_builder::Builder;

use crate::transcript::StartCodonPolicy;

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct NeoepitopeConfig {
    /// Smallest k-mer window size to emit, inclusive.
    #[builder(default = "8")]
    pub min_kmer_size: usize,

    /// Largest k-mer window size to emit, inclusive.
    #[builder(default = "11")]
    pub max_kmer_size: usize,

    /// Start-codon selection policy applied to every transcript.
    #[builder(default = "StartCodonPolicy::Novel")]
    pub start_codon_policy: StartCodonPolicy,

    /// 0-based index of the colon-separated sub-field within a variant's
    /// genotype-info column that carries the VAF.
    #[builder(default = "0")]
    pub vaf_field_index: usize,

    /// How many ATG candidates past the annotated start to examine
    /// before giving up.
    #[builder(default = "2")]
    pub atg_scan_limit: usize,
}

impl NeoepitopeConfig {
    pub fn builder() -> NeoepitopeConfigBuilder {
        NeoepitopeConfigBuilder::default()
    }
}

impl Default for NeoepitopeConfig {
    fn default() -> Self {
        NeoepitopeConfig {
            min_kmer_size: 8,
            max_kmer_size: 11,
            start_codon_policy: StartCodonPolicy::Novel,
            vaf_field_index: 0,
            atg_scan_limit: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_tunables() {
        let cfg = NeoepitopeConfig::default();
        assert_eq!(cfg.min_kmer_size, 8);
        assert_eq!(cfg.max_kmer_size, 11);
        assert_eq!(cfg.atg_scan_limit, 2);
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = NeoepitopeConfig::builder()
            .min_kmer_size(9usize)
            .atg_scan_limit(4usize)
            .build()
            .unwrap();
        assert_eq!(cfg.min_kmer_size, 9);
        assert_eq!(cfg.atg_scan_limit, 4);
        assert_eq!(cfg.max_kmer_size, 11);
    }
}
