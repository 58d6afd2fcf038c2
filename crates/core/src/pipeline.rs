//! File level orchestration: parse, chunk, translate each chunk in order,
//! then write the reconstructed subtitles.

use crate::translate::{Attempt, Backoff, ChunkTranslator, Translator};
use crate::{chunk, srt};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, trace, warn};

/// File extensions picked up by [`translate_dir`], compared case-insensitively.
pub const SUBTITLE_EXTENSIONS: [&str; 2] = ["srt", "txt"];

/// Summary of one translated file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub entries: usize,
    pub chunks: usize,
    /// Chunks written with their original text after all attempts failed.
    pub fallback_chunks: usize,
}

/// Whether `path` has one of the [`SUBTITLE_EXTENSIONS`].
pub fn is_subtitle_file(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            SUBTITLE_EXTENSIONS
                .iter()
                .any(|ext| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Translate the subtitles at `input` and write them to `output`.
/// Translation failures only leave chunks untranslated; I/O errors propagate.
pub async fn translate_file<T, B>(
    input: &Path,
    output: &Path,
    client: &ChunkTranslator<T, B>,
) -> Result<FileReport>
where
    T: Translator,
    B: Backoff,
{
    trace!("translate_file input={} output={}", input.display(), output.display());
    let name = input
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let content =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let mut entries = srt::parse(&content);
    let chunks = chunk::split(&entries, client.config().chunk_size);

    let mut report = FileReport {
        entries: entries.len(),
        chunks: chunks.len(),
        fallback_chunks: 0,
    };
    for (i, c) in chunks.iter().enumerate() {
        info!("translating chunk {}/{} of {name}", i + 1, chunks.len());
        if client.translate_chunk(&mut entries[c.range()]).await == Attempt::FallbackOriginal {
            warn!(
                "chunk {}/{} of {name} kept its original text",
                i + 1,
                chunks.len()
            );
            report.fallback_chunks += 1;
        }
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(output, srt::format(&entries))
        .with_context(|| format!("writing {}", output.display()))?;
    info!(
        "saved translation to {} ({} entries, {} chunks, {} untranslated)",
        output.display(),
        report.entries,
        report.chunks,
        report.fallback_chunks
    );
    Ok(report)
}

/// Translate every subtitle file directly inside `source` into `output`,
/// keeping file names. Files are processed one at a time in name order.
pub async fn translate_dir<T, B>(
    source: &Path,
    output: &Path,
    client: &ChunkTranslator<T, B>,
) -> Result<Vec<PathBuf>>
where
    T: Translator,
    B: Backoff,
{
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    let mut inputs = Vec::new();
    for entry in fs::read_dir(source).with_context(|| format!("listing {}", source.display()))? {
        let path = entry?.path();
        if path.is_file() && is_subtitle_file(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    if inputs.is_empty() {
        warn!("no .srt or .txt files found in {}", source.display());
    }

    let mut written = Vec::with_capacity(inputs.len());
    for input in inputs {
        let Some(name) = input.file_name() else {
            continue;
        };
        let out = output.join(name);
        translate_file(&input, &out, client).await?;
        written.push(out);
    }
    Ok(written)
}
