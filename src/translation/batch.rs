/*!
 * Token budget batching.
 *
 * Subtitle segments are packed greedily, in order, into chunks whose combined
 * token cost (delimiters included) stays under a ceiling. A segment that is
 * larger than the ceiling on its own becomes a single-segment chunk. Chunks
 * can later be bisected when the backend truncates its answer.
 */

use std::fmt;
use std::sync::Arc;
use log::{debug, error};

use crate::subtitle_processor::SubtitleEntry;
use super::tokens::{HeuristicTokenCounter, TokenCounter};

// @const: Stands in for the unit delimiter inside segment text while in flight
pub const DELIMITER_STAND_IN: char = '¦';

/// One subtitle unit to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    // @field: 1-based position in the source file
    pub index: usize,

    // @field: Text as read from the source, line breaks included
    pub text: String,
}

impl Segment {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self { index, text: text.into() }
    }

    /// Build segments from parsed subtitle entries
    pub fn from_entries(entries: &[SubtitleEntry]) -> Vec<Segment> {
        entries.iter()
            .map(|entry| Segment::new(entry.seq_num, entry.text.clone()))
            .collect()
    }
}

/// Ordered, contiguous, non-empty run of segments sent in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    segments: Vec<Segment>,
}

impl Chunk {
    /// Returns `None` for an empty segment list
    pub fn new(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    // Always false, chunks are never empty
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn first_index(&self) -> usize {
        self.segments[0].index
    }

    pub fn last_index(&self) -> usize {
        self.segments[self.segments.len() - 1].index
    }

    /// Texts joined with the unit delimiter, as sent to the backend.
    ///
    /// A delimiter inside a segment text is swapped for `DELIMITER_STAND_IN`
    /// so that every delimiter in the payload separates two segments. Use
    /// `restore_delimiter` on the translated units.
    pub fn joined_text(&self, delimiter: char) -> String {
        let mut joined = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                joined.push(delimiter);
            }
            if delimiter != DELIMITER_STAND_IN && segment.text.contains(delimiter) {
                debug!("Segment {} contains the delimiter '{}', masking it", segment.index, delimiter);
                joined.extend(segment.text.chars().map(|c| if c == delimiter { DELIMITER_STAND_IN } else { c }));
            } else {
                joined.push_str(&segment.text);
            }
        }
        joined
    }

    /// Source texts, used as the fallback translation
    pub fn original_texts(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.text.clone()).collect()
    }

    /// Split at the midpoint, the first half taking the extra segment.
    /// Returns `None` for single-segment chunks.
    pub fn bisect(&self) -> Option<(Chunk, Chunk)> {
        if self.segments.len() < 2 {
            return None;
        }
        let mid = self.segments.len().div_ceil(2);
        let (first, second) = self.segments.split_at(mid);
        Some((
            Chunk { segments: first.to_vec() },
            Chunk { segments: second.to_vec() },
        ))
    }
}

/// Summary line of the chunk plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub number: usize,
    pub first_index: usize,
    pub last_index: usize,
    pub segment_count: usize,
    pub tokens: usize,
}

impl fmt::Display for ChunkPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Chunk {}: segments {}-{} ({} subtitles, ~{} tokens)",
            self.number, self.first_index, self.last_index, self.segment_count, self.tokens
        )
    }
}

/// Undo the masking done by `Chunk::joined_text` on one translated unit
pub fn restore_delimiter(unit: &str, delimiter: char) -> String {
    if delimiter == DELIMITER_STAND_IN {
        return unit.to_string();
    }
    unit.replace(DELIMITER_STAND_IN, &delimiter.to_string())
}

/// Greedy token budget batcher
#[derive(Clone)]
pub struct Batcher {
    ceiling: usize,
    counter: Arc<dyn TokenCounter>,
}

impl fmt::Debug for Batcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Batcher").field("ceiling", &self.ceiling).finish()
    }
}

impl Batcher {
    /// Batcher using the heuristic token counter
    pub fn new(ceiling: usize) -> Self {
        Self::with_counter(ceiling, Arc::new(HeuristicTokenCounter::new()))
    }

    pub fn with_counter(ceiling: usize, counter: Arc<dyn TokenCounter>) -> Self {
        Self { ceiling, counter }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Partition segments into chunks. Concatenating the result yields the
    /// input again, in order.
    pub fn batch(&self, segments: &[Segment]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<Segment> = Vec::new();
        let mut running = 0usize;

        for segment in segments {
            let cost = self.counter.count(&segment.text);
            let delimiter_cost = if current.is_empty() { 0 } else { 1 };

            if running + delimiter_cost + cost <= self.ceiling {
                running += delimiter_cost + cost;
                current.push(segment.clone());
                continue;
            }

            if !current.is_empty() {
                chunks.push(Chunk { segments: std::mem::take(&mut current) });
            }
            running = cost;
            current.push(segment.clone());
        }

        if !current.is_empty() {
            chunks.push(Chunk { segments: current });
        }

        let batched: usize = chunks.iter().map(Chunk::len).sum();
        if batched != segments.len() {
            error!("CRITICAL ERROR: Lost segments while batching: {} in, {} out", segments.len(), batched);
        }
        debug!(
            "Batched {} segments into {} chunks (ceiling {} tokens)",
            segments.len(), chunks.len(), self.ceiling
        );

        chunks
    }

    /// Describe each chunk without translating anything
    pub fn plan(&self, chunks: &[Chunk]) -> Vec<ChunkPlan> {
        chunks.iter().enumerate().map(|(i, chunk)| {
            let text_tokens: usize = chunk.segments().iter().map(|s| self.counter.count(&s.text)).sum();
            ChunkPlan {
                number: i + 1,
                first_index: chunk.first_index(),
                last_index: chunk.last_index(),
                segment_count: chunk.len(),
                tokens: text_tokens + chunk.len() - 1,
            }
        }).collect()
    }
}
