//! The transcript edit-and-translate engine. This is the heart of the
//! crate: a `Transcript` owns an immutable annotation and an accumulated
//! edit store, and knows how to splice those edits into the coding
//! sequence, compute reading frame, and enumerate novel peptide k-mers.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::aggregator::PeptideMetadata;
use crate::annotation::{boundary_index, Strand, TranscriptAnnotation};
use crate::edit::{DeletionInterval, EditInfo, EditKind, PointEdit, Source};
use crate::error::NeoepitopeError;
use crate::genome::GenomeAccessor;
use crate::segment::{Origin, Segment};
use crate::sequence::{kmerize, reverse_complement, translate, STOP};

/// Either literal bases or a bare length: a deletion may be given as a
/// length to cut or as the expected reference bases to verify against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditArg {
    Bases(String),
    Length(i64),
}

/// Tri-state inclusion policy for a variant source in `neopeptides`:
/// excluded, included as a variant, or folded into the reference side as
/// background so it no longer counts as novel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Exclude,
    Variant,
    Background,
}

impl Inclusion {
    fn mutated_side(self) -> bool {
        self != Inclusion::Exclude
    }

    fn reference_side(self) -> bool {
        self == Inclusion::Background
    }
}

/// Start-codon selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCodonPolicy {
    Novel,
    All,
    None,
    Reference,
}

/// One transcript, one chromosomal copy. Owns its annotation and the
/// edits accumulated against it so far.
pub struct Transcript<'g, G: GenomeAccessor> {
    genome: &'g G,
    annotation: TranscriptAnnotation,
    snv_ins: BTreeMap<i64, Vec<PointEdit>>,
    deletions: Vec<DeletionInterval>,
    checkpoint: Option<(BTreeMap<i64, Vec<PointEdit>>, Vec<DeletionInterval>)>,
}

impl<'g, G: GenomeAccessor> Transcript<'g, G> {
    pub fn new(genome: &'g G, annotation: TranscriptAnnotation) -> Self {
        Transcript {
            genome,
            annotation,
            snv_ins: BTreeMap::new(),
            deletions: Vec::new(),
            checkpoint: None,
        }
    }

    pub fn annotation(&self) -> &TranscriptAnnotation {
        &self.annotation
    }

    pub fn has_edits(&self) -> bool {
        !self.snv_ins.is_empty() || !self.deletions.is_empty()
    }

    // ---- 4.1 edit accumulation -------------------------------------------------

    pub fn apply_edit(
        &mut self,
        arg: EditArg,
        pos_1based: i64,
        kind: EditKind,
        source: Source,
        vaf: Option<f64>,
    ) -> Result<(), NeoepitopeError> {
        match kind {
            EditKind::V => self.apply_snv(arg, pos_1based, source, vaf),
            EditKind::I => self.apply_insertion(arg, pos_1based, source, vaf),
            EditKind::D => self.apply_deletion(arg, pos_1based, source, vaf),
        }
    }

    fn apply_snv(
        &mut self,
        arg: EditArg,
        pos_1based: i64,
        source: Source,
        vaf: Option<f64>,
    ) -> Result<(), NeoepitopeError> {
        let seq = match arg {
            EditArg::Bases(s) => s,
            EditArg::Length(_) => {
                return Err(NeoepitopeError::Validation(
                    "an SNV requires literal alt bases, not a bare length".into(),
                ))
            }
        };
        let pos0 = pos_1based - 1;
        if self.snv_ins.get(&pos0).is_some_and(|existing| {
            existing.iter().any(|e| e.kind == EditKind::V && e.source == source)
        }) {
            return Err(NeoepitopeError::DuplicateVariantAtPosition {
                chrom: self.annotation.chrom.clone(),
                pos: pos_1based,
                source,
            });
        }
        let ref_bases = self.genome.fetch(&self.annotation.chrom, pos0, seq.len() as i64)?;
        let info = EditInfo {
            chrom: self.annotation.chrom.clone(),
            pos: pos_1based,
            ref_bases,
            alt_bases: seq.clone(),
            kind: EditKind::V,
            vaf,
        };
        self.snv_ins.entry(pos0).or_default().push(PointEdit {
            seq,
            kind: EditKind::V,
            source,
            info,
        });
        Ok(())
    }

    fn apply_insertion(
        &mut self,
        arg: EditArg,
        pos_1based: i64,
        source: Source,
        vaf: Option<f64>,
    ) -> Result<(), NeoepitopeError> {
        let seq = match arg {
            EditArg::Bases(s) => s,
            EditArg::Length(_) => {
                return Err(NeoepitopeError::Validation(
                    "an insertion requires literal inserted bases, not a bare length".into(),
                ))
            }
        };
        let pos0 = pos_1based - 1;
        let info = EditInfo {
            chrom: self.annotation.chrom.clone(),
            pos: pos_1based,
            ref_bases: String::new(),
            alt_bases: seq.clone(),
            kind: EditKind::I,
            vaf,
        };
        self.snv_ins.entry(pos0).or_default().push(PointEdit {
            seq,
            kind: EditKind::I,
            source,
            info,
        });
        Ok(())
    }

    fn apply_deletion(
        &mut self,
        arg: EditArg,
        pos_1based: i64,
        source: Source,
        vaf: Option<f64>,
    ) -> Result<(), NeoepitopeError> {
        let pos0 = pos_1based - 1;
        let (size, expected) = match &arg {
            EditArg::Length(n) => (*n, None),
            EditArg::Bases(s) => (s.chars().count() as i64, Some(s.clone())),
        };
        let fetched = self.genome.fetch(&self.annotation.chrom, pos0, size)?;
        if let Some(expected) = expected {
            if expected.to_ascii_uppercase() != fetched {
                return Err(NeoepitopeError::ReferenceMismatch {
                    chrom: self.annotation.chrom.clone(),
                    pos: pos_1based,
                    expected,
                    found: fetched,
                });
            }
        }
        let info = EditInfo {
            chrom: self.annotation.chrom.clone(),
            pos: pos_1based,
            ref_bases: fetched,
            alt_bases: String::new(),
            kind: EditKind::D,
            vaf,
        };
        self.deletions.push(DeletionInterval {
            start: pos0,
            end: pos0 + size,
            source,
            info,
        });
        Ok(())
    }

    // ---- save/restore -------------------------------------------------

    pub fn save(&mut self) {
        self.checkpoint = Some((self.snv_ins.clone(), self.deletions.clone()));
    }

    pub fn reset(&mut self, to_reference: bool) {
        if to_reference {
            self.snv_ins.clear();
            self.deletions.clear();
            self.checkpoint = None;
            return;
        }
        match self.checkpoint.clone() {
            Some((snv, dels)) => {
                self.snv_ins = snv;
                self.deletions = dels;
            }
            None => {
                self.snv_ins.clear();
                self.deletions.clear();
            }
        }
    }

    // ---- 4.2 expressed edits -------------------------------------------------

    /// Restricts the exon sequence to `[start_1based, end_1based]`
    /// (snapped to exon boundaries), merges overlapping deletions by
    /// source inclusion, and filters point edits by source and coding
    /// membership. Returns the filtered point-edit map and the
    /// re-annotated boundary segment list.
    pub fn expressed_edits(
        &self,
        start_1based: i64,
        end_1based: i64,
        include_somatic: bool,
        include_germline: bool,
    ) -> (BTreeMap<i64, Vec<PointEdit>>, Vec<BoundarySegment>) {
        let start0 = start_1based - 1;
        let end0 = end_1based;

        let mut exons: Vec<(i64, i64)> = Vec::new();
        let intervals = &self.annotation.intervals;
        let mut i = 0;
        while i + 1 < intervals.len() {
            let (b0, b1) = (intervals[i], intervals[i + 1]);
            let s = b0.max(start0);
            let e = b1.min(end0);
            if e > s {
                exons.push((s, e));
            }
            i += 2;
        }

        let mut dels: Vec<&DeletionInterval> = self
            .deletions
            .iter()
            .filter(|d| match d.source {
                Source::Somatic => include_somatic,
                Source::Germline => include_germline,
            })
            .collect();
        dels.sort_by_key(|d| (d.start, d.end));

        let mut merged: Vec<(i64, i64, Vec<Source>, Vec<EditInfo>)> = Vec::new();
        for d in dels {
            if let Some(last) = merged.last_mut() {
                if d.start <= last.1 {
                    last.1 = last.1.max(d.end);
                    if !last.2.contains(&d.source) {
                        last.2.push(d.source);
                    }
                    last.3.push(d.info.clone());
                    continue;
                }
            }
            merged.push((d.start, d.end, vec![d.source], vec![d.info.clone()]));
        }

        let mut boundaries = Vec::new();
        for (ex_start, ex_end) in &exons {
            let mut cursor = *ex_start;
            for (d_start, d_end, sources, infos) in &merged {
                if *d_end <= *ex_start || *d_start >= *ex_end {
                    continue;
                }
                let clipped_start = (*d_start).max(*ex_start);
                let clipped_end = (*d_end).min(*ex_end);
                if clipped_start > cursor {
                    boundaries.push(BoundarySegment {
                        start: cursor,
                        end: clipped_start,
                        origin: Origin::Reference,
                        info: Vec::new(),
                    });
                }
                let origin = if sources.len() == 1 {
                    Origin::from_source(sources[0])
                } else {
                    Origin::Hybrid(sources[0], sources[1])
                };
                boundaries.push(BoundarySegment {
                    start: clipped_start,
                    end: clipped_end,
                    origin,
                    info: infos.clone(),
                });
                cursor = clipped_end;
            }
            if cursor < *ex_end {
                boundaries.push(BoundarySegment {
                    start: cursor,
                    end: *ex_end,
                    origin: Origin::Reference,
                    info: Vec::new(),
                });
            }
        }

        let in_exon = |pos: i64, allow_boundary: bool| {
            exons.iter().any(|&(s, e)| {
                if allow_boundary {
                    pos >= s && pos <= e
                } else {
                    pos >= s && pos < e
                }
            })
        };

        let mut filtered: BTreeMap<i64, Vec<PointEdit>> = BTreeMap::new();
        for (&pos, edits) in &self.snv_ins {
            if pos < start0 || pos >= end0 {
                continue;
            }
            let mut kept: Vec<PointEdit> = edits
                .iter()
                .filter(|e| match e.source {
                    Source::Somatic => include_somatic,
                    Source::Germline => include_germline,
                })
                .filter(|e| match e.kind {
                    EditKind::V => in_exon(pos, false),
                    EditKind::I => in_exon(pos, true),
                    EditKind::D => false,
                })
                .cloned()
                .collect();
            if kept.iter().filter(|e| e.kind == EditKind::V).count() > 1 {
                if let Some(somatic_idx) = kept
                    .iter()
                    .position(|e| e.kind == EditKind::V && e.source == Source::Somatic)
                {
                    let somatic = kept[somatic_idx].clone();
                    kept.retain(|e| e.kind != EditKind::V);
                    kept.push(somatic);
                }
            }
            if !kept.is_empty() {
                filtered.insert(pos, kept);
            }
        }

        (filtered, boundaries)
    }

    // ---- 4.3 annotated sequence assembly -------------------------------------------------

    /// Splices filtered point edits into the reference exon pieces and
    /// attaches deletion markers, producing the ordered segment list.
    /// Segments are emitted in genomic order and then, for minus-strand
    /// transcripts, reversed and reverse-complemented as a whole.
    pub fn annotated_seq(
        &self,
        include_somatic: bool,
        include_germline: bool,
    ) -> Result<Vec<Segment>, NeoepitopeError> {
        let intervals = &self.annotation.intervals;
        if intervals.is_empty() {
            return Ok(Vec::new());
        }
        let whole_start = intervals[0] + 1;
        let whole_end = intervals[intervals.len() - 1];
        let (filtered_snv, boundaries) =
            self.expressed_edits(whole_start, whole_end, include_somatic, include_germline);

        let mut segments: Vec<Segment> = Vec::new();
        for b in &boundaries {
            if !b.origin.is_reference() {
                segments.push(Segment {
                    nucleotides: String::new(),
                    origin: b.origin.clone(),
                    info: b.info.clone(),
                    genomic_anchor: b.start + 1,
                    deleted_length: b.end - b.start,
                });
                continue;
            }
            let mut cursor = b.start;
            while cursor < b.end {
                let next = filtered_snv.range(cursor..b.end).next();
                match next {
                    Some((&pos, edits)) => {
                        if pos > cursor {
                            let refseq = self.genome.fetch(&self.annotation.chrom, cursor, pos - cursor)?;
                            segments.push(Segment::reference(refseq, cursor + 1));
                        }
                        let v_edit = edits.iter().find(|e| e.kind == EditKind::V);
                        match v_edit {
                            Some(ve) => {
                                segments.push(Segment {
                                    nucleotides: ve.seq.clone(),
                                    origin: Origin::from_source(ve.source),
                                    info: vec![ve.info.clone()],
                                    genomic_anchor: pos + 1,
                                    deleted_length: 0,
                                });
                                cursor = pos + ve.seq.chars().count() as i64;
                            }
                            None => {
                                let refbase = self.genome.fetch(&self.annotation.chrom, pos, 1)?;
                                segments.push(Segment::reference(refbase, pos + 1));
                                cursor = pos + 1;
                            }
                        }
                        for ie in edits.iter().filter(|e| e.kind == EditKind::I) {
                            segments.push(Segment {
                                nucleotides: ie.seq.clone(),
                                origin: Origin::from_source(ie.source),
                                info: vec![ie.info.clone()],
                                genomic_anchor: pos + 1,
                                deleted_length: 0,
                            });
                        }
                    }
                    None => {
                        let refseq = self.genome.fetch(&self.annotation.chrom, cursor, b.end - cursor)?;
                        segments.push(Segment::reference(refseq, cursor + 1));
                        cursor = b.end;
                    }
                }
            }
        }

        if self.annotation.strand.is_reverse() {
            segments.reverse();
            for seg in &mut segments {
                seg.nucleotides = reverse_complement(&seg.nucleotides);
            }
        }

        Ok(segments)
    }

    // ---- 4.4 reading frame -------------------------------------------------

    /// Returns the coding reading frame (0/1/2) at a 1-based genomic
    /// position, or `None` if the position isn't coding — either outside
    /// every exon, or on the wrong side of the start codon for this
    /// transcript's strand.
    pub fn reading_frame(&self, pos_1based: i64) -> Option<u8> {
        let target0 = pos_1based - 1;
        let idx = boundary_index(&self.annotation.intervals, target0);
        if idx % 2 == 0 {
            return None;
        }
        let dist = match self.annotation.strand {
            Strand::Plus => self.coding_distance_plus(target0)?,
            Strand::Minus => self.coding_distance_minus(target0)?,
        };
        Some(dist.rem_euclid(3) as u8)
    }

    fn coding_distance_plus(&self, target0: i64) -> Option<i64> {
        let start0 = self.annotation.start_codon_1based - 1;
        if target0 < start0 {
            return None;
        }
        let mut dist = 0i64;
        let intervals = &self.annotation.intervals;
        let mut i = 0;
        while i + 1 < intervals.len() {
            let (b0, b1) = (intervals[i], intervals[i + 1]);
            let ex_s = b0.max(start0);
            let ex_e = b1;
            if ex_e > ex_s {
                if target0 >= ex_s && target0 < ex_e {
                    return Some(dist + (target0 - ex_s));
                } else if target0 >= ex_e {
                    dist += ex_e - ex_s;
                } else {
                    return None;
                }
            }
            i += 2;
        }
        None
    }

    fn coding_distance_minus(&self, target0: i64) -> Option<i64> {
        let start0 = self.annotation.start_codon_1based - 1;
        if target0 > start0 {
            return None;
        }
        let mut dist = 0i64;
        let intervals = &self.annotation.intervals;
        let mut i = intervals.len();
        while i >= 2 {
            let (b0, b1) = (intervals[i - 2], intervals[i - 1]);
            let ex_s = b0;
            let ex_e = b1.min(start0 + 1);
            if ex_e > ex_s {
                if target0 >= ex_s && target0 < ex_e {
                    return Some(dist + (ex_e - 1 - target0));
                } else if target0 < ex_s {
                    dist += ex_e - ex_s;
                } else {
                    return None;
                }
            }
            i -= 2;
        }
        None
    }

    // ---- 4.5 neopeptide enumeration -------------------------------------------------

    /// Enumerates mutation-adjacent peptide k-mers absent from the
    /// reference translation.
    pub fn neopeptides(
        &self,
        min_size: usize,
        max_size: usize,
        include_somatic: Inclusion,
        include_germline: Inclusion,
        policy: StartCodonPolicy,
        atg_scan_limit: usize,
    ) -> Result<HashMap<String, Vec<PeptideMetadata>>, NeoepitopeError> {
        let mut out: HashMap<String, Vec<PeptideMetadata>> = HashMap::new();
        if !self.has_edits() || min_size < 2 {
            return Ok(out);
        }
        if include_somatic == Inclusion::Exclude && include_germline == Inclusion::Exclude {
            return Ok(out);
        }

        let mutated_segments =
            self.annotated_seq(include_somatic.mutated_side(), include_germline.mutated_side())?;
        let ref_segments =
            self.annotated_seq(include_somatic.reference_side(), include_germline.reference_side())?;

        let mutated_seq: String = mutated_segments.iter().map(|s| s.nucleotides.as_str()).collect();
        let ref_seq: String = ref_segments.iter().map(|s| s.nucleotides.as_str()).collect();

        let Some(ref_start) =
            offset_of_anchor(&ref_segments, self.annotation.strand, self.annotation.start_codon_1based)
        else {
            return Ok(out);
        };
        let mutated_start =
            offset_of_anchor(&mutated_segments, self.annotation.strand, self.annotation.start_codon_1based);

        let Some((chosen_mut_pos, _frame)) = choose_start_codon(
            &mutated_seq,
            &ref_seq,
            mutated_start,
            ref_start,
            policy,
            atg_scan_limit,
        ) else {
            return Ok(out);
        };

        let mutated_protein = translate(&mutated_seq[chosen_mut_pos..]);
        let ref_protein = translate(&ref_seq[ref_start..]);
        let nonstop = !mutated_protein.ends_with(STOP);
        let warnings: Vec<String> = if nonstop { vec!["nonstop".to_string()] } else { Vec::new() };

        let (variant_windows, shift_records) = self.collect_variant_windows(&mutated_segments, chosen_mut_pos);

        let ref_kmer_cache: HashMap<usize, HashSet<String>> = (min_size..=max_size)
            .map(|k| (k, kmerize(&ref_protein, k, k).into_iter().collect()))
            .collect();
        let mutated_chars: Vec<char> = mutated_protein.chars().collect();

        for (w_start, w_end, info) in variant_windows.into_iter().chain(shift_records) {
            for k in min_size..=max_size {
                let aa_start = (w_start / 3).saturating_sub(k.saturating_sub(1));
                let aa_end = (w_end / 3 + k).min(mutated_chars.len());
                if aa_start >= aa_end {
                    continue;
                }
                let window: String = mutated_chars[aa_start..aa_end].iter().collect();
                let ref_set = &ref_kmer_cache[&k];
                for kmer in kmerize(&window, k, k) {
                    if ref_set.contains(&kmer) {
                        continue;
                    }
                    out.entry(kmer).or_default().push(PeptideMetadata {
                        info: info.clone(),
                        warnings: warnings.clone(),
                        transcript_id: self.annotation.transcript_id.clone(),
                    });
                }
            }
        }

        Ok(out)
    }

    /// Walks the mutated segment list from the chosen start, producing
    /// the variant coordinate windows and the frame-shift open/close
    /// records. Stops early (returning whatever was accumulated so far)
    /// the moment a deletion's endpoint falls outside any exon — a
    /// splice-crossing deletion with no well-defined reading frame.
    fn collect_variant_windows(
        &self,
        mutated_segments: &[Segment],
        chosen_mut_pos: usize,
    ) -> (Vec<(usize, usize, Vec<EditInfo>)>, Vec<(usize, usize, Vec<EditInfo>)>) {
        let mut offset = 0usize;
        let mut variant_windows = Vec::new();
        let mut shift_records = Vec::new();
        let mut open_shift: Option<(usize, Vec<EditInfo>)> = None;
        let mut net_shift_mod3: i64 = 0;

        for seg in mutated_segments {
            let len = seg.nucleotides.chars().count();
            if seg.origin.is_reference() {
                offset += len;
                continue;
            }

            let is_deletion_marker = len == 0 && !seg.info.is_empty();
            let del_ref_len = seg.deleted_length;

            if is_deletion_marker {
                let end_anchor = seg.genomic_anchor + del_ref_len;
                if self.reading_frame(seg.genomic_anchor).is_none() || self.reading_frame(end_anchor).is_none()
                {
                    break;
                }
            }

            let window_start = offset.max(chosen_mut_pos);
            let window_end = (offset + len).max(window_start);
            if offset + len > chosen_mut_pos {
                variant_windows.push((
                    window_start - chosen_mut_pos,
                    window_end - chosen_mut_pos,
                    seg.info.clone(),
                ));
            }

            let mutated_len = len as i64;
            let ref_len = if del_ref_len > 0 {
                del_ref_len
            } else {
                seg.info.iter().map(|i| i.ref_bases.chars().count() as i64).next().unwrap_or(0)
            };
            let delta = (mutated_len - ref_len).rem_euclid(3);
            if delta != 0 {
                net_shift_mod3 = (net_shift_mod3 + delta).rem_euclid(3);
            }
            if net_shift_mod3 != 0 {
                if open_shift.is_none() {
                    open_shift = Some((window_start.saturating_sub(chosen_mut_pos), seg.info.clone()));
                }
            } else if let Some((start, info)) = open_shift.take() {
                shift_records.push((start, window_end.saturating_sub(chosen_mut_pos), info));
            }

            offset += len;
        }

        if let Some((start, info)) = open_shift.take() {
            let end = offset.saturating_sub(chosen_mut_pos);
            shift_records.push((start, end, info));
        }

        (variant_windows, shift_records)
    }
}

/// A piece of the re-annotated boundary list `expressed_edits` produces:
/// either a kept reference run (`origin = Reference`, nonzero length) or
/// a zero-length deletion marker carrying the merged deletion's origin
/// and info.
#[derive(Debug, Clone)]
pub struct BoundarySegment {
    pub start: i64,
    pub end: i64,
    pub origin: Origin,
    pub info: Vec<EditInfo>,
}

/// Locates the absolute string offset of `target_1based` within a
/// segment list produced by `annotated_seq`, accounting for the
/// whole-list reversal and per-segment reverse-complementing that
/// happens for minus-strand transcripts.
fn offset_of_anchor(segments: &[Segment], strand: Strand, target_1based: i64) -> Option<usize> {
    let mut offset = 0usize;
    for seg in segments {
        let len = seg.nucleotides.chars().count();
        if seg.origin.is_reference() && len > 0 {
            let a = seg.genomic_anchor;
            match strand {
                Strand::Plus => {
                    if target_1based >= a && target_1based < a + len as i64 {
                        return Some(offset + (target_1based - a) as usize);
                    }
                }
                Strand::Minus => {
                    // On the minus strand translation reads high -> low, so
                    // the codon's reading start is its highest genomic base,
                    // not the lowest coordinate callers pass in.
                    let codon_high = target_1based + 2;
                    let last = a + len as i64 - 1;
                    if codon_high >= a && codon_high <= last {
                        return Some(offset + (last - codon_high) as usize);
                    }
                }
            }
        } else if len == 0 && target_1based == seg.genomic_anchor {
            return Some(offset);
        }
        offset += len;
    }
    None
}

fn find_atg_candidates(seq: &str, reference_offset: usize, limit_past_start: usize) -> Vec<usize> {
    let bytes = seq.as_bytes();
    let mut candidates = Vec::new();
    let mut past_start = 0usize;
    if bytes.len() < 3 {
        return candidates;
    }
    for i in 0..=bytes.len() - 3 {
        if &bytes[i..i + 3] == b"ATG" {
            candidates.push(i);
            if i >= reference_offset {
                past_start += 1;
                if past_start > limit_past_start {
                    break;
                }
            }
        }
    }
    candidates
}

/// Picks the translation start offset within `mutated`, returning
/// `(offset, frame)` where `frame` is the reading-frame shift relative
/// to the annotated start's reference position.
fn choose_start_codon(
    mutated: &str,
    reference: &str,
    mutated_start: Option<usize>,
    ref_start: usize,
    policy: StartCodonPolicy,
    atg_scan_limit: usize,
) -> Option<(usize, i64)> {
    if let Some(m_start) = mutated_start {
        if policy != StartCodonPolicy::None
            && mutated.as_bytes().get(m_start..m_start + 3) == Some(b"ATG")
            && reference.as_bytes().get(ref_start..ref_start + 3) == Some(b"ATG")
        {
            return Some((m_start, 0));
        }
    }

    let anchor = mutated_start.unwrap_or(ref_start);
    let candidates = find_atg_candidates(mutated, anchor, atg_scan_limit);

    let is_novel = |pos: usize| -> bool {
        let rel = pos as i64 - anchor as i64;
        let ref_pos = ref_start as i64 + rel;
        if ref_pos < 0 {
            return true;
        }
        reference.as_bytes().get(ref_pos as usize..ref_pos as usize + 3) != Some(b"ATG")
    };
    let downstream_or_eq = |pos: usize| pos >= anchor;

    let filtered: Vec<usize> = match policy {
        StartCodonPolicy::Reference => candidates.into_iter().filter(|&p| Some(p) == mutated_start).collect(),
        StartCodonPolicy::None => candidates.into_iter().filter(|&p| downstream_or_eq(p)).collect(),
        StartCodonPolicy::Novel => candidates
            .into_iter()
            .filter(|&p| downstream_or_eq(p) || is_novel(p))
            .collect(),
        StartCodonPolicy::All => candidates,
    };

    let chosen = *filtered.first()?;
    let frame = (chosen as i64 - ref_start as i64).rem_euclid(3);
    Some((chosen, frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Feature, AnnotationRow};
    use crate::genome::InMemoryGenome;

    fn plus_strand_annotation() -> TranscriptAnnotation {
        // exon [100,126] 1-based inclusive, 27 nt, matches "ATGGGGCCCAAACCCGGGAAACCCTAA".
        let rows = vec![
            AnnotationRow { chrom: "chr1".into(), feature: Feature::Exon, start_1based: 100, end_1based: 126, strand: Strand::Plus },
            AnnotationRow { chrom: "chr1".into(), feature: Feature::StartCodon, start_1based: 100, end_1based: 102, strand: Strand::Plus },
            AnnotationRow { chrom: "chr1".into(), feature: Feature::StopCodon, start_1based: 124, end_1based: 126, strand: Strand::Plus },
        ];
        TranscriptAnnotation::from_rows("T1", &rows).unwrap().unwrap()
    }

    fn genome_with_flank() -> InMemoryGenome {
        let mut seq = String::new();
        seq.push_str(&"N".repeat(99));
        seq.push_str("ATGGGGCCCAAACCCGGGAAACCCTAA");
        seq.push_str(&"N".repeat(50));
        InMemoryGenome::new().with_chrom("chr1", seq)
    }

    #[test]
    fn reference_idempotence_no_edits_yields_no_peptides() {
        let genome = genome_with_flank();
        let ann = plus_strand_annotation();
        let t = Transcript::new(&genome, ann);
        let peptides = t
            .neopeptides(8, 8, Inclusion::Exclude, Inclusion::Exclude, StartCodonPolicy::Novel, 2)
            .unwrap();
        assert!(peptides.is_empty());
    }

    #[test]
    fn annotated_seq_matches_reference_cds_with_no_edits() {
        let genome = genome_with_flank();
        let ann = plus_strand_annotation();
        let t = Transcript::new(&genome, ann);
        let segs = t.annotated_seq(true, true).unwrap();
        let full: String = segs.iter().map(|s| s.nucleotides.as_str()).collect();
        assert_eq!(full, "ATGGGGCCCAAACCCGGGAAACCCTAA");
    }

    #[test]
    fn save_reset_round_trip_restores_edit_store() {
        let genome = genome_with_flank();
        let ann = plus_strand_annotation();
        let mut t = Transcript::new(&genome, ann);
        t.apply_edit(EditArg::Bases("A".into()), 103, EditKind::V, Source::Somatic, None)
            .unwrap();
        t.save();
        t.apply_edit(EditArg::Bases("C".into()), 110, EditKind::V, Source::Germline, None)
            .unwrap();
        assert_eq!(t.snv_ins.len(), 2);
        t.reset(false);
        assert_eq!(t.snv_ins.len(), 1);
        t.reset(true);
        assert!(t.snv_ins.is_empty());
    }

    #[test]
    fn somatic_snv_produces_novel_peptide() {
        let genome = genome_with_flank();
        let ann = plus_strand_annotation();
        let mut t = Transcript::new(&genome, ann);
        // position 103 is the 4th base of the CDS (0-based offset 3), a 'G' in "ATGG...".
        t.apply_edit(EditArg::Bases("A".into()), 103, EditKind::V, Source::Somatic, None)
            .unwrap();
        let peptides = t
            .neopeptides(8, 8, Inclusion::Variant, Inclusion::Exclude, StartCodonPolicy::Novel, 2)
            .unwrap();
        assert!(!peptides.is_empty());
    }

    #[test]
    fn overlapping_somatic_and_germline_deletions_merge_as_hybrid() {
        let genome = genome_with_flank();
        let ann = plus_strand_annotation();
        let mut t = Transcript::new(&genome, ann);
        t.apply_edit(EditArg::Length(5), 110, EditKind::D, Source::Somatic, None).unwrap();
        t.apply_edit(EditArg::Length(7), 113, EditKind::D, Source::Germline, None).unwrap();
        let (_snv, boundaries) = t.expressed_edits(100, 130, true, true);
        let hybrid = boundaries.iter().find(|b| matches!(b.origin, Origin::Hybrid(_, _)));
        assert!(hybrid.is_some());
    }

    #[test]
    fn coordinate_monotonicity_of_boundary_list() {
        let genome = genome_with_flank();
        let ann = plus_strand_annotation();
        let mut t = Transcript::new(&genome, ann);
        t.apply_edit(EditArg::Length(3), 110, EditKind::D, Source::Somatic, None).unwrap();
        let (_snv, boundaries) = t.expressed_edits(100, 130, true, true);
        for pair in boundaries.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }
}
