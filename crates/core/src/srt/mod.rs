//! This module is responsible for splitting subtitle text into entries and
//! writing them back out. Index and timing lines are kept as opaque strings so
//! they survive translation byte-for-byte.

/// A single subtitle block (index line, timing line, text lines).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: String,
    pub timestamp: String,
    pub text: Vec<String>,
}

impl SubtitleEntry {
    /// Approximate character cost of the text: every character plus one per
    /// line for its terminator.
    pub fn cost(&self) -> usize {
        self.text.iter().map(|l| l.chars().count()).sum::<usize>() + self.text.len()
    }
}

/// Parse subtitle text into entries.
/// Blocks are separated by one or more blank lines. A block with fewer than
/// three lines still yields an entry with the missing fields left empty.
pub fn parse(input: &str) -> Vec<SubtitleEntry> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in input.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                entries.push(entry_from_block(&block));
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        entries.push(entry_from_block(&block));
    }
    entries
}

fn entry_from_block(lines: &[&str]) -> SubtitleEntry {
    let mut it = lines.iter().map(|l| l.to_string());
    SubtitleEntry {
        index: it.next().unwrap_or_default(),
        timestamp: it.next().unwrap_or_default(),
        text: it.collect(),
    }
}

/// Format entries back to text.
/// Each entry is written as index, timing, then its text lines; entries are
/// joined by a single blank line.
pub fn format(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            let mut lines = Vec::with_capacity(e.text.len() + 2);
            lines.push(e.index.as_str());
            lines.push(e.timestamp.as_str());
            lines.extend(e.text.iter().map(String::as_str));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
