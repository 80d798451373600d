//! The haplotype router: for each phased block, route each variant to
//! the transcripts whose exons it overlaps (via the interval index),
//! apply it to the A and/or B chromosomal copy per its genotype bits,
//! then call `neopeptides` on both copies and merge into the
//! aggregator. Parsing the on-disk phased-haplotype file format is a
//! caller concern; this module starts from the typed
//! `PhasedBlock`/`RawVariant` structs a caller populates from that
//! format.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::aggregator::{PeptideAggregator, PeptideMetadata};
use crate::annotation::{AnnotationStore, TranscriptAnnotation};
use crate::config::NeoepitopeConfig;
use crate::edit::{EditKind, Source};
use crate::genome::GenomeAccessor;
use crate::interval_index::IntervalIndex;
use crate::transcript::{EditArg, Inclusion, Transcript};

/// One tab-separated variant line from the phased-haplotype format,
/// already split into fields by the caller.
#[derive(Debug, Clone)]
pub struct RawVariant {
    pub idx: i64,
    pub allele_a: bool,
    pub allele_b: bool,
    pub chrom: String,
    pub pos_1based: i64,
    pub ref_bases: String,
    pub alt_bases: String,
    /// The raw genotype-info column; ends in `*` iff germline, and
    /// carries the VAF in a colon-separated sub-field.
    pub genotype_info: String,
}

impl RawVariant {
    fn is_germline(&self) -> bool {
        self.genotype_info.ends_with('*')
    }

    fn source(&self) -> Source {
        if self.is_germline() {
            Source::Germline
        } else {
            Source::Somatic
        }
    }

    fn vaf(&self, field_index: usize) -> Option<f64> {
        let trimmed = self.genotype_info.trim_end_matches('*');
        trimmed.split(':').nth(field_index)?.parse::<f64>().ok()
    }

    /// Derives edit kind, position, and edit argument from the ref/alt
    /// length comparison: equal length -> SNV, ref longer -> deletion
    /// (position shifted past the shared prefix, arg is the deletion's
    /// own size, not the ref allele's length), alt longer -> insertion
    /// (of the trailing alt bases).
    fn normalize(&self) -> (EditKind, i64, EditArg) {
        let ref_len = self.ref_bases.chars().count();
        let alt_len = self.alt_bases.chars().count();
        if ref_len == alt_len {
            (EditKind::V, self.pos_1based, EditArg::Bases(self.alt_bases.clone()))
        } else if ref_len > alt_len {
            let del_size = ref_len - alt_len;
            let pos = self.pos_1based + (ref_len - del_size) as i64;
            (EditKind::D, pos, EditArg::Length(del_size as i64))
        } else {
            let inserted: String = self.alt_bases.chars().skip(ref_len).collect();
            (EditKind::I, self.pos_1based, EditArg::Bases(inserted))
        }
    }
}

/// A phased haplotype block: a set of variants phased to the same pair
/// of chromosomal copies.
#[derive(Debug, Clone, Default)]
pub struct PhasedBlock {
    pub variants: Vec<RawVariant>,
}

/// Routes phased haplotype blocks onto transcript copies and collects
/// the resulting neopeptides. Owns no mutable transcript state between
/// calls; transcript instances are built fresh (or reused via `reset`)
/// per block.
pub struct HaplotypeRouter<'a, G: GenomeAccessor, A: AnnotationStore> {
    genome: &'a G,
    annotations: &'a A,
    index: &'a IntervalIndex,
    config: &'a NeoepitopeConfig,
}

impl<'a, G: GenomeAccessor, A: AnnotationStore> HaplotypeRouter<'a, G, A> {
    pub fn new(genome: &'a G, annotations: &'a A, index: &'a IntervalIndex, config: &'a NeoepitopeConfig) -> Self {
        HaplotypeRouter { genome, annotations, index, config }
    }

    /// Sequential routing loop over `blocks`, the default single-threaded
    /// mode.
    pub fn route_blocks(&self, blocks: &[PhasedBlock]) -> HashMap<String, Vec<PeptideMetadata>> {
        let mut aggregator = PeptideAggregator::new();
        for block in blocks {
            let found = self.route_block(block);
            aggregator.merge(found);
        }
        aggregator.into_map()
    }

    /// Shards routing across haplotype blocks using `rayon`, then merges
    /// every block's contribution into one aggregator. Transcript
    /// objects and annotation records are never shared across threads;
    /// only the read-only `genome`/`annotations`/`index` are.
    pub fn route_blocks_parallel(&self, blocks: &[PhasedBlock]) -> HashMap<String, Vec<PeptideMetadata>>
    where
        G: Sync,
        A: Sync,
    {
        let per_block: Vec<HashMap<String, Vec<PeptideMetadata>>> =
            blocks.par_iter().map(|block| self.route_block(block)).collect();
        let mut aggregator = PeptideAggregator::new();
        for found in per_block {
            aggregator.merge(found);
        }
        aggregator.into_map()
    }

    fn route_block(&self, block: &PhasedBlock) -> HashMap<String, Vec<PeptideMetadata>> {
        let mut aggregator = PeptideAggregator::new();
        let mut transcripts: HashMap<String, (Transcript<'a, G>, Transcript<'a, G>)> = HashMap::new();
        let mut has_somatic = false;

        for variant in &block.variants {
            if !variant.is_germline() {
                has_somatic = true;
            }
            let ref_len = variant.ref_bases.chars().count() as i64;
            let transcript_ids = self.index.transcripts_overlapping(
                &variant.chrom,
                variant.pos_1based - 1,
                variant.pos_1based - 1 + ref_len.max(1),
            );

            for transcript_id in transcript_ids {
                let (a, b) = match transcripts.get_mut(&transcript_id) {
                    Some(pair) => pair,
                    None => {
                        let Some(rows) = self.annotations.rows_for(&transcript_id) else {
                            continue;
                        };
                        let annotation = match TranscriptAnnotation::from_rows(transcript_id.clone(), &rows) {
                            Ok(Some(ann)) => ann,
                            Ok(None) => continue,
                            Err(err) => {
                                warn!(%transcript_id, %err, "skipping transcript with unsupported annotation");
                                continue;
                            }
                        };
                        let a = Transcript::new(self.genome, annotation.clone());
                        let b = Transcript::new(self.genome, annotation);
                        transcripts.entry(transcript_id.clone()).or_insert((a, b))
                    }
                };

                let (kind, pos, arg) = variant.normalize();
                let vaf = variant.vaf(self.config.vaf_field_index);
                let source = variant.source();

                if variant.allele_a {
                    if let Err(err) = a.apply_edit(arg.clone(), pos, kind, source, vaf) {
                        error!(%transcript_id, %err, copy = "A", "failed to apply edit");
                        continue;
                    }
                }
                if variant.allele_b {
                    if let Err(err) = b.apply_edit(arg, pos, kind, source, vaf) {
                        error!(%transcript_id, %err, copy = "B", "failed to apply edit");
                        continue;
                    }
                }
            }
        }

        if has_somatic {
            for (transcript_id, (a, b)) in &transcripts {
                debug!(%transcript_id, "enumerating neopeptides for haplotype block");
                if let Ok(found) = a.neopeptides(
                    self.config.min_kmer_size,
                    self.config.max_kmer_size,
                    Inclusion::Variant,
                    Inclusion::Variant,
                    self.config.start_codon_policy,
                    self.config.atg_scan_limit,
                ) {
                    aggregator.merge(found);
                }
                if let Ok(found) = b.neopeptides(
                    self.config.min_kmer_size,
                    self.config.max_kmer_size,
                    Inclusion::Variant,
                    Inclusion::Variant,
                    self.config.start_codon_policy,
                    self.config.atg_scan_limit,
                ) {
                    aggregator.merge(found);
                }
            }
        }

        aggregator.into_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationRow, Feature, InMemoryAnnotationStore, Strand};
    use crate::genome::InMemoryGenome;

    fn genome() -> InMemoryGenome {
        let mut seq = String::new();
        seq.push_str(&"N".repeat(99));
        seq.push_str("ATGGGGCCCAAACCCGGGAAACCCTAA");
        seq.push_str(&"N".repeat(50));
        InMemoryGenome::new().with_chrom("chr1", seq)
    }

    fn annotations() -> InMemoryAnnotationStore {
        InMemoryAnnotationStore::new().with_transcript(
            "T1",
            vec![
                AnnotationRow { chrom: "chr1".into(), feature: Feature::Exon, start_1based: 100, end_1based: 126, strand: Strand::Plus },
                AnnotationRow { chrom: "chr1".into(), feature: Feature::StartCodon, start_1based: 100, end_1based: 102, strand: Strand::Plus },
                AnnotationRow { chrom: "chr1".into(), feature: Feature::StopCodon, start_1based: 124, end_1based: 126, strand: Strand::Plus },
            ],
        )
    }

    fn index() -> IntervalIndex {
        let rows = vec![
            AnnotationRow { chrom: "chr1".into(), feature: Feature::Exon, start_1based: 100, end_1based: 126, strand: Strand::Plus },
            AnnotationRow { chrom: "chr1".into(), feature: Feature::StartCodon, start_1based: 100, end_1based: 102, strand: Strand::Plus },
            AnnotationRow { chrom: "chr1".into(), feature: Feature::StopCodon, start_1based: 124, end_1based: 126, strand: Strand::Plus },
        ];
        let ann = TranscriptAnnotation::from_rows("T1", &rows).unwrap().unwrap();
        IntervalIndex::build(&[ann])
    }

    #[test]
    fn routes_somatic_snv_into_peptide_output() {
        let genome = genome();
        let annotations = annotations();
        let index = index();
        let config = NeoepitopeConfig::default();
        let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

        let block = PhasedBlock {
            variants: vec![RawVariant {
                idx: 0,
                allele_a: true,
                allele_b: false,
                chrom: "chr1".into(),
                pos_1based: 103,
                ref_bases: "G".into(),
                alt_bases: "A".into(),
                genotype_info: "0/1:30".into(),
            }],
        };

        let peptides = router.route_blocks(&[block]);
        assert!(!peptides.is_empty());
    }

    #[test]
    fn block_with_only_germline_variants_emits_nothing() {
        let genome = genome();
        let annotations = annotations();
        let index = index();
        let config = NeoepitopeConfig::default();
        let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

        let block = PhasedBlock {
            variants: vec![RawVariant {
                idx: 0,
                allele_a: true,
                allele_b: false,
                chrom: "chr1".into(),
                pos_1based: 103,
                ref_bases: "G".into(),
                alt_bases: "A".into(),
                genotype_info: "0/1:30*".into(),
            }],
        };

        let peptides = router.route_blocks(&[block]);
        assert!(peptides.is_empty());
    }
}
