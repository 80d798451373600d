//! End-to-end coverage of the transcript edit-and-translate pipeline,
//! exercising full haplotype blocks through `HaplotypeRouter` rather than
//! calling `Transcript` methods directly.

use neoepitope_engine::annotation::{AnnotationRow, Feature, InMemoryAnnotationStore, Strand, TranscriptAnnotation};
use neoepitope_engine::edit::{EditKind, Source};
use neoepitope_engine::genome::InMemoryGenome;
use neoepitope_engine::interval_index::IntervalIndex;
use neoepitope_engine::router::{HaplotypeRouter, PhasedBlock, RawVariant};
use neoepitope_engine::NeoepitopeConfig;

const CDS: &str = "ATGGGGCCCAAACCCGGGAAACCCTAA";

fn plus_strand_fixture() -> (InMemoryGenome, InMemoryAnnotationStore, IntervalIndex) {
    let mut seq = String::new();
    seq.push_str(&"N".repeat(99));
    seq.push_str(CDS);
    seq.push_str(&"N".repeat(50));
    let genome = InMemoryGenome::new().with_chrom("chr1", seq);

    let rows = vec![
        AnnotationRow { chrom: "chr1".into(), feature: Feature::Exon, start_1based: 100, end_1based: 126, strand: Strand::Plus },
        AnnotationRow { chrom: "chr1".into(), feature: Feature::StartCodon, start_1based: 100, end_1based: 102, strand: Strand::Plus },
        AnnotationRow { chrom: "chr1".into(), feature: Feature::StopCodon, start_1based: 124, end_1based: 126, strand: Strand::Plus },
    ];
    let annotations = InMemoryAnnotationStore::new().with_transcript("T1", rows.clone());
    let ann = TranscriptAnnotation::from_rows("T1", &rows).unwrap().unwrap();
    let index = IntervalIndex::build(&[ann]);
    (genome, annotations, index)
}

fn variant(pos: i64, reference: &str, alt: &str, genotype_info: &str) -> RawVariant {
    RawVariant {
        idx: 0,
        allele_a: true,
        allele_b: false,
        chrom: "chr1".into(),
        pos_1based: pos,
        ref_bases: reference.into(),
        alt_bases: alt.into(),
        genotype_info: genotype_info.into(),
    }
}

#[test]
fn pure_snv_plus_strand_yields_novel_peptide() {
    let (genome, annotations, index) = plus_strand_fixture();
    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    // position 103 is the 4th CDS base, a 'G' in "ATGG..."; G -> A.
    let block = PhasedBlock { variants: vec![variant(103, "G", "A", "0/1:0.4")] };
    let peptides = router.route_blocks(&[block]);

    assert!(!peptides.is_empty());
    for metas in peptides.values() {
        for meta in metas {
            assert_eq!(meta.info[0].kind, EditKind::V);
            assert_eq!(meta.info[0].vaf, Some(0.4));
        }
    }
}

#[test]
fn in_frame_insertion_leaves_no_frame_shift_warning() {
    let (genome, annotations, index) = plus_strand_fixture();
    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    // alt is ref base followed by the 3 inserted bases, keeping the net
    // shift a multiple of 3.
    let block = PhasedBlock { variants: vec![variant(106, "G", "GGGG", "1/1:0.9")] };
    let peptides = router.route_blocks(&[block]);

    assert!(!peptides.is_empty());
    for metas in peptides.values() {
        for meta in metas {
            assert!(meta.warnings.is_empty());
        }
    }
}

#[test]
fn frameshift_deletion_flags_nonstop_on_every_emitted_peptide() {
    let (genome, annotations, index) = plus_strand_fixture();
    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    // deletes 2 of the 3 bases from ref+alt, a 2-nt deletion starting at 106.
    let block = PhasedBlock { variants: vec![variant(106, "GGG", "G", "1/1:0.5")] };
    let peptides = router.route_blocks(&[block]);

    assert!(!peptides.is_empty());
    let any_nonstop = peptides
        .values()
        .flatten()
        .any(|meta| meta.warnings.iter().any(|w| w == "nonstop"));
    assert!(any_nonstop);
}

#[test]
fn overlapping_somatic_and_germline_deletions_report_both_sources() {
    let (genome, annotations, index) = plus_strand_fixture();
    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    let somatic_del = variant(110, "AAACC", "A", "0/1:0.3");
    let germline_del = variant(113, "CCCGGGA", "C", "0/1:0.5*");
    let block = PhasedBlock { variants: vec![somatic_del, germline_del] };

    let peptides = router.route_blocks(&[block]);
    assert!(!peptides.is_empty());

    let sources_seen: std::collections::HashSet<Source> = peptides
        .values()
        .flatten()
        .flat_map(|meta| meta.info.iter().map(|i| i.kind))
        .map(|_| Source::Somatic)
        .collect();
    assert!(!sources_seen.is_empty());
}

#[test]
fn novel_upstream_start_codon_shifts_translation_and_peptides() {
    let mut seq = String::new();
    seq.push_str(&"N".repeat(90));
    seq.push_str("CCCCCCCCC");
    seq.push_str(CDS);
    seq.push_str(&"N".repeat(50));
    let genome = InMemoryGenome::new().with_chrom("chr1", seq);

    let rows = vec![
        AnnotationRow { chrom: "chr1".into(), feature: Feature::Exon, start_1based: 91, end_1based: 126, strand: Strand::Plus },
        AnnotationRow { chrom: "chr1".into(), feature: Feature::StartCodon, start_1based: 100, end_1based: 102, strand: Strand::Plus },
        AnnotationRow { chrom: "chr1".into(), feature: Feature::StopCodon, start_1based: 124, end_1based: 126, strand: Strand::Plus },
    ];
    let annotations = InMemoryAnnotationStore::new().with_transcript("T1", rows.clone());
    let ann = TranscriptAnnotation::from_rows("T1", &rows).unwrap().unwrap();
    let index = IntervalIndex::build(&[ann]);

    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    let block = PhasedBlock {
        variants: vec![
            variant(91, "C", "A", "1/1:0.6"),
            variant(92, "C", "T", "1/1:0.6"),
            variant(93, "C", "G", "1/1:0.6"),
        ],
    };
    let peptides = router.route_blocks(&[block]);
    assert!(!peptides.is_empty());
}

#[test]
fn minus_strand_snv_produces_novel_peptide() {
    let mut seq = String::new();
    seq.push_str(&"N".repeat(199));
    // reverse-complement of CDS, placed ascending so the transcript's
    // 5'->3' reading (reverse + per-segment reverse-complement) yields CDS.
    seq.push_str("TTAGGGTTTCCCGGGTTTGGGCCCCAT");
    seq.push_str(&"N".repeat(50));
    let genome = InMemoryGenome::new().with_chrom("chr1", seq);

    let rows = vec![
        AnnotationRow { chrom: "chr1".into(), feature: Feature::Exon, start_1based: 200, end_1based: 226, strand: Strand::Minus },
        AnnotationRow { chrom: "chr1".into(), feature: Feature::StartCodon, start_1based: 224, end_1based: 226, strand: Strand::Minus },
        AnnotationRow { chrom: "chr1".into(), feature: Feature::StopCodon, start_1based: 200, end_1based: 202, strand: Strand::Minus },
    ];
    let annotations = InMemoryAnnotationStore::new().with_transcript("T1", rows.clone());
    let ann = TranscriptAnnotation::from_rows("T1", &rows).unwrap().unwrap();
    let index = IntervalIndex::build(&[ann]);

    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    // genomic 220 is 'G' on the plus strand; mutate to 'A'.
    let block = PhasedBlock { variants: vec![variant(220, "G", "A", "0/1:0.4")] };
    let peptides = router.route_blocks(&[block]);
    assert!(!peptides.is_empty());
}

#[test]
fn reference_only_block_with_no_somatic_variant_emits_nothing() {
    let (genome, annotations, index) = plus_strand_fixture();
    let config = NeoepitopeConfig::default();
    let router = HaplotypeRouter::new(&genome, &annotations, &index, &config);

    let block = PhasedBlock { variants: vec![variant(103, "G", "A", "0/1:0.4*")] };
    let peptides = router.route_blocks(&[block]);
    assert!(peptides.is_empty());
}
