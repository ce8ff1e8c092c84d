//! Timeline mapper: turns a DTW path plus word-index tables into a nested
//! sentence/segment timeline, and remaps cropped-audio times back onto an
//! uncropped time axis.
//!
//! No direct teacher analog — `kannaka-memory` has no transcript layer.
//! Grounded on the corpus's serde conventions (`Debug, Clone, Serialize,
//! Deserialize` in that order, as in `kannaka-memory::working_memory`)
//! for the entry types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AlignError;

/// Fixed set of timeline entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineEntryKind {
    Segment,
    Paragraph,
    Sentence,
    Clause,
    Phrase,
    Word,
    Token,
    Letter,
    Phone,
    Subphone,
}

/// A node in the timeline tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub kind: TimelineEntryKind,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TimelineEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_utf16: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset_utf16: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_utf32: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset_utf32: Option<usize>,
}

impl TimelineEntry {
    fn leaf(kind: TimelineEntryKind, text: String, start_time: f64, end_time: f64) -> Self {
        Self {
            kind,
            text,
            start_time,
            end_time,
            children: Vec::new(),
            confidence: None,
            start_offset_utf16: None,
            end_offset_utf16: None,
            start_offset_utf32: None,
            end_offset_utf32: None,
        }
    }
}

/// Known timing for one reference-side word.
#[derive(Debug, Clone, Copy)]
pub struct RefWord {
    pub start: f64,
    pub end: f64,
}

/// One target word as it appears in the external segmenter's output.
#[derive(Debug, Clone)]
pub struct TargetWordSpec {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SentenceSpec {
    pub words: Vec<TargetWordSpec>,
}

#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub sentences: Vec<SentenceSpec>,
}

/// The target-side segmentation supplied by an external segmenter,
/// reshaped into the sentence/word tree the mapper needs.
#[derive(Debug, Clone)]
pub struct TargetSegmentation {
    pub segments: Vec<SegmentSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespacePolicy {
    Preserve,
    Collapse,
}

/// Turn a DTW path plus a reference word timeline into a nested
/// segment/sentence/word timeline over the target side: word-pair
/// accumulation, equal-duration time slicing, nested sentence/segment
/// assembly, and character-offset attachment, in that order.
pub fn word_path_to_timeline(
    ref_words: &[RefWord],
    path: &[(usize, usize)],
    ref_word_of_index: impl Fn(usize) -> Option<usize>,
    tgt_word_of_index: impl Fn(usize) -> Option<usize>,
    segmentation: &TargetSegmentation,
    transcript: &str,
    whitespace_policy: WhitespacePolicy,
) -> Result<Vec<TimelineEntry>, AlignError> {
    let mapped = accumulate_word_pairs(path, &ref_word_of_index, &tgt_word_of_index);
    let tgt_spans = slice_and_gather(ref_words, &mapped)?;

    let ordered_texts: Vec<String> = segmentation
        .segments
        .iter()
        .flat_map(|seg| seg.sentences.iter())
        .flat_map(|sent| sent.words.iter())
        .map(|w| w.text.clone())
        .collect();
    let offsets = attach_offsets(transcript, &ordered_texts);

    let mut offset_cursor = 0usize;
    let mut segment_entries = Vec::with_capacity(segmentation.segments.len());
    for seg in &segmentation.segments {
        let mut sentence_entries = Vec::with_capacity(seg.sentences.len());
        for sent in &seg.sentences {
            let mut word_entries = Vec::with_capacity(sent.words.len());
            for w in &sent.words {
                let (start, end) = tgt_spans
                    .get(&w.index)
                    .copied()
                    .unwrap_or((f64::NAN, f64::NAN));
                let (su16, eu16, su32, eu32) = offsets[offset_cursor];
                offset_cursor += 1;
                let mut entry = TimelineEntry::leaf(TimelineEntryKind::Word, w.text.clone(), start, end);
                entry.start_offset_utf16 = Some(su16);
                entry.end_offset_utf16 = Some(eu16);
                entry.start_offset_utf32 = Some(su32);
                entry.end_offset_utf32 = Some(eu32);
                word_entries.push(entry);
            }

            let (s, e) = nan_safe_span(&word_entries);
            let text = join_texts(&word_entries, whitespace_policy);
            let mut sentence = TimelineEntry::leaf(TimelineEntryKind::Sentence, text, s, e);
            sentence.children = word_entries;
            sentence_entries.push(sentence);
        }

        let (s, e) = nan_safe_span(&sentence_entries);
        let text = join_texts(&sentence_entries, whitespace_policy);
        let mut segment = TimelineEntry::leaf(TimelineEntryKind::Segment, text, s, e);
        segment.children = sentence_entries;
        segment_entries.push(segment);
    }

    Ok(segment_entries)
}

fn accumulate_word_pairs(
    path: &[(usize, usize)],
    ref_word_of_index: &impl Fn(usize) -> Option<usize>,
    tgt_word_of_index: &impl Fn(usize) -> Option<usize>,
) -> HashMap<usize, Vec<usize>> {
    let mut mapped: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(src_i, dst_j) in path {
        let (Some(w1), Some(w2)) = (ref_word_of_index(src_i), tgt_word_of_index(dst_j)) else {
            continue;
        };
        let slot = mapped.entry(w1).or_default();
        if !slot.contains(&w2) {
            slot.push(w2);
        }
    }
    mapped
}

fn slice_and_gather(
    ref_words: &[RefWord],
    mapped: &HashMap<usize, Vec<usize>>,
) -> Result<HashMap<usize, (f64, f64)>, AlignError> {
    let mut tgt_spans: HashMap<usize, (f64, f64)> = HashMap::new();
    for (&w1, tgt_list) in mapped.iter() {
        let rw = ref_words
            .get(w1)
            .ok_or_else(|| AlignError::InvalidArgument(format!("ref word index {w1} out of range")))?;
        let k = tgt_list.len();
        if k == 0 {
            continue;
        }
        let width = (rw.end - rw.start) / k as f64;
        for (slot, &w2) in tgt_list.iter().enumerate() {
            let slice_start = rw.start + slot as f64 * width;
            let slice_end = rw.start + (slot + 1) as f64 * width;
            let span = tgt_spans
                .entry(w2)
                .or_insert((f64::INFINITY, f64::NEG_INFINITY));
            span.0 = span.0.min(slice_start);
            span.1 = span.1.max(slice_end);
        }
    }
    Ok(tgt_spans)
}

/// Min start / max end across children, ignoring `NaN` entries — a
/// parent with no aligned children gets a `NaN` span rather than a
/// bogus zero-width one.
fn nan_safe_span(children: &[TimelineEntry]) -> (f64, f64) {
    let mut start = f64::NAN;
    let mut end = f64::NAN;
    for c in children {
        if c.start_time.is_nan() || c.end_time.is_nan() {
            continue;
        }
        start = if start.is_nan() { c.start_time } else { start.min(c.start_time) };
        end = if end.is_nan() { c.end_time } else { end.max(c.end_time) };
    }
    (start, end)
}

fn join_texts(children: &[TimelineEntry], policy: WhitespacePolicy) -> String {
    let joined = children
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    match policy {
        WhitespacePolicy::Preserve => joined,
        WhitespacePolicy::Collapse => joined.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Scan `transcript` left-to-right assigning each word's `(start, end)`
/// UTF-16 and UTF-32 offsets. Multi-token words are matched part-by-part;
/// an unmatched word inherits the previous entry's end offset.
fn attach_offsets(transcript: &str, words: &[String]) -> Vec<(usize, usize, usize, usize)> {
    let mut out = Vec::with_capacity(words.len());
    let mut cursor = 0usize;
    let mut prev_end_u16 = 0usize;
    let mut prev_end_u32 = 0usize;

    for word in words {
        let parts: Vec<&str> = word.split_whitespace().collect();
        if parts.is_empty() {
            out.push((prev_end_u16, prev_end_u16, prev_end_u32, prev_end_u32));
            continue;
        }

        let mut local_cursor = cursor;
        let mut first_start_u16 = 0usize;
        let mut first_start_u32 = 0usize;
        let mut last_end_u16 = 0usize;
        let mut last_end_u32 = 0usize;
        let mut found_all = true;

        for (pi, part) in parts.iter().enumerate() {
            match transcript.get(local_cursor..).and_then(|rest| rest.find(part)) {
                Some(rel) => {
                    let abs_start = local_cursor + rel;
                    let abs_end = abs_start + part.len();
                    let start_u16 = transcript[..abs_start].encode_utf16().count();
                    let start_u32 = transcript[..abs_start].chars().count();
                    let end_u16 = transcript[..abs_end].encode_utf16().count();
                    let end_u32 = transcript[..abs_end].chars().count();
                    if pi == 0 {
                        first_start_u16 = start_u16;
                        first_start_u32 = start_u32;
                    }
                    last_end_u16 = end_u16;
                    last_end_u32 = end_u32;
                    local_cursor = abs_end;
                }
                None => {
                    found_all = false;
                    break;
                }
            }
        }

        if found_all {
            cursor = local_cursor;
            prev_end_u16 = last_end_u16;
            prev_end_u32 = last_end_u32;
            out.push((first_start_u16, last_end_u16, first_start_u32, last_end_u32));
        } else {
            out.push((prev_end_u16, prev_end_u16, prev_end_u32, prev_end_u32));
        }
    }

    out
}

/// One contiguous segment of an uncrop timeline: a source `[start, end]`
/// span. Segments are assumed contiguous in cropped time, in the order
/// given.
#[derive(Debug, Clone, Copy)]
pub struct UncropSegment {
    pub source_start: f64,
    pub source_end: f64,
}

struct CroppedSpan {
    cropped_start: f64,
    cropped_end: f64,
    source_start: f64,
    source_end: f64,
}

fn build_cropped_spans(segments: &[UncropSegment]) -> Vec<CroppedSpan> {
    let mut out = Vec::with_capacity(segments.len());
    let mut cursor = 0.0f64;
    for seg in segments {
        let duration = seg.source_end - seg.source_start;
        let cropped_end = cursor + duration;
        out.push(CroppedSpan {
            cropped_start: cursor,
            cropped_end,
            source_start: seg.source_start,
            source_end: seg.source_end,
        });
        cursor = cropped_end;
    }
    out
}

fn remap_interval(spans: &[CroppedSpan], s: f64, e: f64) -> (f64, f64) {
    if spans.is_empty() {
        return (s, e);
    }

    let mut best_idx = None;
    let mut best_overlap = 0.0f64;
    for (idx, span) in spans.iter().enumerate() {
        let overlap = (e.min(span.cropped_end) - s.max(span.cropped_start)).max(0.0);
        if overlap > best_overlap {
            best_overlap = overlap;
            best_idx = Some(idx);
        }
    }

    match best_idx {
        Some(idx) => {
            let span = &spans[idx];
            let src_s = span.source_start + (s - span.cropped_start);
            let src_e = span.source_start + (e - span.cropped_start);
            (
                src_s.clamp(span.source_start, span.source_end),
                src_e.clamp(span.source_start, span.source_end),
            )
        }
        None => {
            let last = spans.last().unwrap();
            if s >= last.cropped_end {
                (last.source_end, last.source_end)
            } else {
                let first = &spans[0];
                (first.source_start, first.source_start)
            }
        }
    }
}

/// Rewrite every entry's `[start_time, end_time]` in place, recursing
/// into children, mapping cropped-audio time back onto the original
/// uncropped time axis. Entries with `NaN` times (unaligned sentences)
/// are left untouched.
pub fn remap_cropped_to_uncropped(timeline: &mut [TimelineEntry], uncrop: &[UncropSegment]) {
    let spans = build_cropped_spans(uncrop);
    remap_recursive(timeline, &spans);
}

fn remap_recursive(entries: &mut [TimelineEntry], spans: &[CroppedSpan]) {
    for entry in entries.iter_mut() {
        if !entry.start_time.is_nan() && !entry.end_time.is_nan() {
            let (s, e) = remap_interval(spans, entry.start_time, entry.end_time);
            entry.start_time = s;
            entry.end_time = e;
        }
        remap_recursive(&mut entry.children, spans);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmentation_of(words: &[(usize, &str)]) -> TargetSegmentation {
        TargetSegmentation {
            segments: vec![SegmentSpec {
                sentences: vec![SentenceSpec {
                    words: words
                        .iter()
                        .map(|&(i, t)| TargetWordSpec {
                            index: i,
                            text: t.to_string(),
                        })
                        .collect(),
                }],
            }],
        }
    }

    #[test]
    fn word_pair_accumulation_dedups_in_insertion_order() {
        let path = vec![(0, 0), (0, 1), (0, 1), (1, 2)];
        let mapped = accumulate_word_pairs(&path, &|i| Some(i), &|j| Some(j));
        assert_eq!(mapped.get(&0), Some(&vec![0, 1]));
        assert_eq!(mapped.get(&1), Some(&vec![2]));
    }

    #[test]
    fn word_pair_accumulation_skips_special_tokens() {
        let path = vec![(0, 0), (1, 1)];
        let mapped = accumulate_word_pairs(&path, &|i| if i == 0 { None } else { Some(i) }, &|j| Some(j));
        assert!(!mapped.contains_key(&0));
        assert_eq!(mapped.get(&1), Some(&vec![1]));
    }

    #[test]
    fn equal_duration_slicing_splits_one_ref_word_over_two_targets() {
        let ref_words = vec![RefWord { start: 0.0, end: 2.0 }];
        let mut mapped = HashMap::new();
        mapped.insert(0usize, vec![0usize, 1usize]);
        let spans = slice_and_gather(&ref_words, &mapped).unwrap();
        assert_eq!(spans.get(&0), Some(&(0.0, 1.0)));
        assert_eq!(spans.get(&1), Some(&(1.0, 2.0)));
    }

    #[test]
    fn many_to_one_target_word_spans_earliest_to_latest_slice() {
        let ref_words = vec![
            RefWord { start: 0.0, end: 1.0 },
            RefWord { start: 1.0, end: 3.0 },
        ];
        let mut mapped = HashMap::new();
        mapped.insert(0usize, vec![0usize]);
        mapped.insert(1usize, vec![0usize]);
        let spans = slice_and_gather(&ref_words, &mapped).unwrap();
        assert_eq!(spans.get(&0), Some(&(0.0, 3.0)));
    }

    #[test]
    fn full_pipeline_builds_nested_timeline() {
        let ref_words = vec![
            RefWord { start: 0.0, end: 1.0 },
            RefWord { start: 1.0, end: 2.0 },
        ];
        let path = vec![(0, 0), (1, 1)];
        let segmentation = segmentation_of(&[(0, "hello"), (1, "world")]);
        let timeline = word_path_to_timeline(
            &ref_words,
            &path,
            |i| Some(i),
            |j| Some(j),
            &segmentation,
            "hello world",
            WhitespacePolicy::Collapse,
        )
        .unwrap();

        assert_eq!(timeline.len(), 1);
        let segment = &timeline[0];
        assert_eq!(segment.kind, TimelineEntryKind::Segment);
        assert_eq!(segment.start_time, 0.0);
        assert_eq!(segment.end_time, 2.0);
        assert_eq!(segment.children.len(), 1);

        let sentence = &segment.children[0];
        assert_eq!(sentence.children.len(), 2);
        assert_eq!(sentence.children[0].text, "hello");
        assert_eq!(sentence.children[0].start_offset_utf16, Some(0));
        assert_eq!(sentence.children[0].end_offset_utf16, Some(5));
        assert_eq!(sentence.children[1].start_offset_utf16, Some(6));
        assert_eq!(sentence.children[1].end_offset_utf16, Some(11));
    }

    #[test]
    fn unmatched_word_inherits_previous_end_offset() {
        let offsets = attach_offsets("hello world", &["hello".into(), "xyz".into()]);
        assert_eq!(offsets[0], (0, 5, 0, 5));
        assert_eq!(offsets[1], (5, 5, 5, 5));
    }

    #[test]
    fn sentence_with_no_aligned_words_gets_nan_safe_span() {
        let ref_words = vec![RefWord { start: 0.0, end: 1.0 }];
        let path: Vec<(usize, usize)> = vec![];
        let segmentation = segmentation_of(&[(0, "orphan")]);
        let timeline = word_path_to_timeline(
            &ref_words,
            &path,
            |i| Some(i),
            |j| Some(j),
            &segmentation,
            "orphan",
            WhitespacePolicy::Collapse,
        )
        .unwrap();

        let sentence = &timeline[0].children[0];
        assert!(sentence.start_time.is_nan());
        assert!(sentence.end_time.is_nan());
        assert!(sentence.children[0].start_time.is_nan());
    }

    #[test]
    fn timeline_entry_round_trips_through_json() {
        let entry = TimelineEntry::leaf(TimelineEntryKind::Word, "hello".into(), 0.0, 1.0);
        let json = serde_json::to_string(&entry).unwrap();
        let back: TimelineEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, TimelineEntryKind::Word);
        assert_eq!(back.text, "hello");
        assert_eq!(back.start_time, 0.0);
        assert_eq!(back.end_time, 1.0);
        assert!(back.children.is_empty());
    }

    #[test]
    fn crop_uncrop_remap_examples() {
        let uncrop = vec![
            UncropSegment { source_start: 0.0, source_end: 3.0 },
            UncropSegment { source_start: 5.0, source_end: 7.0 },
        ];

        let mut timeline = vec![TimelineEntry::leaf(TimelineEntryKind::Word, "a".into(), 1.0, 2.5)];
        remap_cropped_to_uncropped(&mut timeline, &uncrop);
        assert_eq!((timeline[0].start_time, timeline[0].end_time), (1.0, 2.5));

        let mut timeline = vec![TimelineEntry::leaf(TimelineEntryKind::Word, "b".into(), 3.5, 4.5)];
        remap_cropped_to_uncropped(&mut timeline, &uncrop);
        assert_eq!((timeline[0].start_time, timeline[0].end_time), (5.5, 6.5));

        let mut timeline = vec![TimelineEntry::leaf(TimelineEntryKind::Word, "c".into(), 100.0, 101.0)];
        remap_cropped_to_uncropped(&mut timeline, &uncrop);
        assert_eq!((timeline[0].start_time, timeline[0].end_time), (7.0, 7.0));
    }
}
