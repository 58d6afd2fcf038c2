//! Grouping of subtitle entries into size-bounded batches.

use crate::srt::SubtitleEntry;
use std::ops::Range;

/// Default character cost allowed per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// A contiguous run of entries, addressed by position in the owning list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `entries` into ordered chunks whose total cost stays within
/// `max_cost`. Entries are never split; an entry that alone exceeds the
/// limit gets a chunk of its own.
pub fn split(entries: &[SubtitleEntry], max_cost: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut cost = 0;
    for (i, entry) in entries.iter().enumerate() {
        let entry_cost = entry.cost();
        if cost + entry_cost > max_cost && i > start {
            chunks.push(Chunk { start, end: i });
            start = i;
            cost = 0;
        }
        cost += entry_cost;
    }
    if start < entries.len() {
        chunks.push(Chunk {
            start,
            end: entries.len(),
        });
    }
    chunks
}
