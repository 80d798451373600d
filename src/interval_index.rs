//! Genomic-position -> transcript lookup: one interval tree per
//! chromosome, built from every transcript's exon spans, used to route
//! a variant to the transcripts whose coding sequence it can touch.

use std::collections::HashMap;

use bio::data_structures::interval_tree::IntervalTree;

use crate::annotation::TranscriptAnnotation;

/// Per-chromosome interval trees mapping exon spans to transcript ids.
pub struct IntervalIndex {
    trees: HashMap<String, IntervalTree<i64, String>>,
}

impl IntervalIndex {
    /// Indexes every exon of every annotation, one tree per chromosome.
    pub fn build(annotations: &[TranscriptAnnotation]) -> Self {
        let mut trees: HashMap<String, IntervalTree<i64, String>> = HashMap::new();
        for ann in annotations {
            let tree = trees.entry(ann.chrom.clone()).or_default();
            let mut i = 0;
            while i + 1 < ann.intervals.len() {
                let start = ann.intervals[i];
                let end = ann.intervals[i + 1];
                if end > start {
                    tree.insert(start..end, ann.transcript_id.clone());
                }
                i += 2;
            }
        }
        IntervalIndex { trees }
    }

    /// Returns the ids of every transcript with at least one exon
    /// overlapping the 0-based half-open span `[start, end)` on `chrom`.
    /// Results are deduplicated but not otherwise ordered.
    pub fn transcripts_overlapping(&self, chrom: &str, start: i64, end: i64) -> Vec<String> {
        let Some(tree) = self.trees.get(chrom) else {
            return Vec::new();
        };
        let span = if end > start { start..end } else { start..start + 1 };
        let mut ids: Vec<String> = tree
            .find(span)
            .map(|entry| entry.data().clone())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
