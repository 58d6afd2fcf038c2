//! Batched translation of subtitle chunks.
//! Text lines are framed with numbered block markers, sent to a remote
//! [`Translator`] and the reply is split back onto the entries by position.

use crate::config::TranslationConfig;
use crate::srt::SubtitleEntry;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

pub mod openai;

/// Prefix of the per-block marker line, followed by the 1-based ordinal and `###`.
pub const BLOCK_MARKER: &str = "### BLOCK ";

/// Ordinal and closing token left at the head of each reply segment.
static MARKER_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*###").unwrap());

/// Remote service that turns a framed payload into translated text.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Send `payload` under the `system` instruction and return the raw reply.
    async fn complete(&self, system: &str, payload: &str) -> Result<String>;
}

/// Waits between attempts.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// [`Backoff`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Backoff for TokioSleep {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// State of a chunk translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Attempt `n` (1-based) is in flight.
    Attempting(u32),
    /// Entries carry the translated text.
    Succeeded,
    /// Every attempt failed; entries keep their original text.
    FallbackOriginal,
}

/// Render the marker line for the block at 1-based `ordinal`.
pub fn marker(ordinal: usize) -> String {
    format!("{BLOCK_MARKER}{ordinal} ###")
}

/// Build the request payload for a chunk.
/// Every entry gets a numbered slot, even when it has no text.
pub fn build_request(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&marker(i + 1));
        out.push('\n');
        out.push_str(&entry.text.join("\n"));
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

/// Split a reply into per-block text lines, in the order they appear.
/// A reply with no segments at all is rejected so the chunk is retried.
pub fn parse_reply(reply: &str) -> Result<Vec<Vec<String>>> {
    let segments: Vec<Vec<String>> = reply
        .trim()
        .split(BLOCK_MARKER)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            MARKER_TAIL
                .replace(raw, "")
                .trim()
                .lines()
                .map(str::to_string)
                .collect()
        })
        .collect();
    if segments.is_empty() {
        return Err(anyhow!("reply contained no blocks"));
    }
    Ok(segments)
}

/// Assign translated segments to entries by position. Entries beyond the
/// last segment keep their text; surplus segments are dropped.
fn apply(entries: &mut [SubtitleEntry], segments: Vec<Vec<String>>) {
    if segments.len() != entries.len() {
        warn!(
            "reply had {} blocks for {} entries; unmatched entries keep their original text",
            segments.len(),
            entries.len()
        );
    }
    for (entry, text) in entries.iter_mut().zip(segments) {
        entry.text = text;
    }
}

/// Translates chunks one request at a time, retrying with a fixed delay and
/// falling back to the original text once attempts run out.
pub struct ChunkTranslator<T, B = TokioSleep> {
    translator: T,
    backoff: B,
    config: TranslationConfig,
}

impl<T: Translator> ChunkTranslator<T> {
    pub fn new(translator: T, config: TranslationConfig) -> Self {
        Self::with_backoff(translator, config, TokioSleep)
    }
}

impl<T: Translator, B: Backoff> ChunkTranslator<T, B> {
    pub fn with_backoff(translator: T, config: TranslationConfig, backoff: B) -> Self {
        Self {
            translator,
            backoff,
            config,
        }
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    /// Translate `entries` in place and return the terminal state.
    /// Failures never escape: after the last attempt the entries are left
    /// exactly as they were.
    pub async fn translate_chunk(&self, entries: &mut [SubtitleEntry]) -> Attempt {
        if entries.is_empty() {
            return Attempt::Succeeded;
        }
        let system = self.config.system_instruction();
        let payload = build_request(entries);
        debug!(
            "request for {} entries ({} bytes)",
            entries.len(),
            payload.len()
        );
        trace!("payload:\n{payload}");

        let attempts = self.config.attempts();
        let mut state = Attempt::Attempting(1);
        loop {
            state = match state {
                Attempt::Attempting(n) => match self.request(&system, &payload).await {
                    Ok(segments) => {
                        apply(entries, segments);
                        Attempt::Succeeded
                    }
                    Err(err) => {
                        warn!("attempt {n}/{attempts} failed: {err:#}");
                        if n < attempts {
                            let delay = self.config.retry_delay;
                            info!("retrying in {} seconds", delay.as_secs_f32());
                            self.backoff.wait(delay).await;
                            Attempt::Attempting(n + 1)
                        } else {
                            warn!("max retries reached, keeping original text");
                            Attempt::FallbackOriginal
                        }
                    }
                },
                done => return done,
            };
        }
    }

    async fn request(&self, system: &str, payload: &str) -> Result<Vec<Vec<String>>> {
        let reply = self.translator.complete(system, payload).await?;
        trace!("reply:\n{reply}");
        parse_reply(&reply)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Translator that plays back queued replies and records every payload.
    #[derive(Clone, Default)]
    pub(crate) struct Scripted {
        pub replies: Arc<Mutex<VecDeque<Result<String>>>>,
        pub payloads: Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        pub fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                payloads: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Translator for Scripted {
        async fn complete(&self, _system: &str, payload: &str) -> Result<String> {
            self.payloads.lock().unwrap().push(payload.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("service unavailable")))
        }
    }

    /// Backoff that returns immediately and remembers the requested delays.
    #[derive(Clone, Default)]
    pub(crate) struct NoDelay {
        pub waits: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Backoff for NoDelay {
        async fn wait(&self, delay: Duration) {
            self.waits.lock().unwrap().push(delay);
        }
    }

    fn entry(index: &str, text: &[&str]) -> SubtitleEntry {
        SubtitleEntry {
            index: index.into(),
            timestamp: format!("ts{index}"),
            text: text.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn client(tr: Scripted, backoff: NoDelay) -> ChunkTranslator<Scripted, NoDelay> {
        ChunkTranslator::with_backoff(tr, TranslationConfig::default(), backoff)
    }

    #[test]
    fn frames_every_entry_with_a_numbered_marker() {
        let entries = vec![entry("1", &["Hello", "you"]), entry("2", &[]), entry("3", &["Bye"])];
        assert_eq!(
            build_request(&entries),
            "### BLOCK 1 ###\nHello\nyou\n\n### BLOCK 2 ###\n\n\n### BLOCK 3 ###\nBye"
        );
    }

    #[test]
    fn parses_reply_segments_in_order() {
        let segments = parse_reply("### BLOCK 1 ###\nCześć\nty\n\n### BLOCK 2###\n\n### BLOCK 3 ###\nPa\n").unwrap();
        assert_eq!(
            segments,
            vec![
                vec!["Cześć".to_string(), "ty".to_string()],
                vec![],
                vec!["Pa".to_string()],
            ]
        );
    }

    #[test]
    fn blank_reply_is_an_error() {
        assert!(parse_reply("").is_err());
        assert!(parse_reply("  \n\n").is_err());
    }

    #[tokio::test]
    async fn replaces_text_and_keeps_index_and_timing() {
        let tr = Scripted::new(vec![Ok("### BLOCK 1 ###\nCześć\n\n### BLOCK 2 ###\nŚwiat".into())]);
        let client = client(tr.clone(), NoDelay::default());
        let mut entries = vec![entry("1", &["Hello"]), entry("2", &["World"])];

        let state = client.translate_chunk(&mut entries).await;

        assert_eq!(state, Attempt::Succeeded);
        assert_eq!(entries[0], entry("1", &["Cześć"]));
        assert_eq!(entries[1], entry("2", &["Świat"]));
        let payloads = tr.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert!(!payloads[0].contains("ts1"));
    }

    #[tokio::test]
    async fn empty_entry_stays_empty() {
        let tr = Scripted::new(vec![Ok("### BLOCK 1 ###\n\n### BLOCK 2 ###\nHej".into())]);
        let client = client(tr.clone(), NoDelay::default());
        let mut entries = vec![entry("1", &[]), entry("2", &["Hi"])];

        client.translate_chunk(&mut entries).await;

        assert!(entries[0].text.is_empty());
        assert_eq!(entries[1].text, vec!["Hej".to_string()]);
        assert!(tr.payloads.lock().unwrap()[0].starts_with("### BLOCK 1 ###\n\n\n### BLOCK 2 ###"));
    }

    #[tokio::test]
    async fn retries_after_failure_with_fixed_delay() {
        let tr = Scripted::new(vec![
            Err(anyhow!("boom")),
            Ok(String::new()),
            Ok("### BLOCK 1 ###\nCześć".into()),
        ]);
        let backoff = NoDelay::default();
        let client = client(tr.clone(), backoff.clone());
        let mut entries = vec![entry("1", &["Hello"])];

        let state = client.translate_chunk(&mut entries).await;

        assert_eq!(state, Attempt::Succeeded);
        assert_eq!(entries[0].text, vec!["Cześć".to_string()]);
        assert_eq!(tr.payloads.lock().unwrap().len(), 3);
        assert_eq!(
            *backoff.waits.lock().unwrap(),
            vec![Duration::from_secs(30), Duration::from_secs(30)]
        );
    }

    #[tokio::test]
    async fn falls_back_to_original_after_max_retries() {
        let tr = Scripted::new(vec![]);
        let backoff = NoDelay::default();
        let client = client(tr.clone(), backoff.clone());
        let original = vec![entry("1", &["Hello", "there"]), entry("2", &[])];
        let mut entries = original.clone();

        let state = client.translate_chunk(&mut entries).await;

        assert_eq!(state, Attempt::FallbackOriginal);
        assert_eq!(entries, original);
        assert_eq!(tr.payloads.lock().unwrap().len(), 3);
        assert_eq!(backoff.waits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn short_reply_leaves_trailing_entries_untouched() {
        let tr = Scripted::new(vec![Ok("### BLOCK 1 ###\nJeden".into())]);
        let client = client(tr, NoDelay::default());
        let mut entries = vec![entry("1", &["One"]), entry("2", &["Two"])];

        assert_eq!(client.translate_chunk(&mut entries).await, Attempt::Succeeded);
        assert_eq!(entries[0].text, vec!["Jeden".to_string()]);
        assert_eq!(entries[1].text, vec!["Two".to_string()]);
    }

    /// Text before the first marker is taken as a block of its own, which
    /// shifts the following blocks down by one position.
    #[tokio::test]
    async fn preamble_counts_as_first_block() {
        assert_eq!(
            parse_reply("Here you go:\n### BLOCK 1 ###\nJeden").unwrap(),
            vec![vec!["Here you go:".to_string()], vec!["Jeden".to_string()]]
        );

        let tr = Scripted::new(vec![Ok("Here you go:\n### BLOCK 1 ###\nJeden\n\n### BLOCK 2 ###\nDwa".into())]);
        let client = client(tr, NoDelay::default());
        let mut entries = vec![entry("1", &["One"]), entry("2", &["Two"])];

        assert_eq!(client.translate_chunk(&mut entries).await, Attempt::Succeeded);
        assert_eq!(entries[0].text, vec!["Here you go:".to_string()]);
        assert_eq!(entries[1].text, vec!["Jeden".to_string()]);
        assert_eq!(entries[1].timestamp, "ts2");
    }

    #[tokio::test]
    async fn zero_retries_makes_a_single_attempt() {
        let tr = Scripted::new(vec![Err(anyhow!("boom"))]);
        let backoff = NoDelay::default();
        let config = TranslationConfig {
            max_retries: 0,
            ..Default::default()
        };
        let client = ChunkTranslator::with_backoff(tr.clone(), config, backoff.clone());
        let original = vec![entry("1", &["Hello"])];
        let mut entries = original.clone();

        let state = client.translate_chunk(&mut entries).await;

        assert_eq!(state, Attempt::FallbackOriginal);
        assert_eq!(entries, original);
        assert_eq!(tr.payloads.lock().unwrap().len(), 1);
        assert!(backoff.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn surplus_reply_blocks_are_ignored() {
        let tr = Scripted::new(vec![Ok("### BLOCK 1 ###\nJeden\n\n### BLOCK 2 ###\nDwa".into())]);
        let client = client(tr, NoDelay::default());
        let mut entries = vec![entry("1", &["One"])];

        client.translate_chunk(&mut entries).await;

        assert_eq!(entries, vec![entry("1", &["Jeden"])]);
    }
}
