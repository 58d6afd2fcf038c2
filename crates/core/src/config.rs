//! Settings shared by the translation client and the file pipeline.

use crate::chunk::DEFAULT_CHUNK_SIZE;
use std::time::Duration;

pub const DEFAULT_TARGET_LANGUAGE: &str = "Polish";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Translation settings injected at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Language name interpolated into the system instruction.
    pub target_language: String,
    /// Maximum character cost per request (see [`crate::chunk::split`]).
    pub chunk_size: usize,
    /// Total attempts per chunk before keeping the original text.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl TranslationConfig {
    /// Attempts actually made; zero is treated as a single try.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Build the fixed system instruction for the configured language.
    pub fn system_instruction(&self) -> String {
        let lang = &self.target_language;
        format!(
            "You are a translator for an API. Translate into {lang}. \
             Only translate the subtitle text lines, never the index numbers or timestamps. \
             Keep the same number of blocks and the same line breaks, \
             and keep the blocks in exactly the same order in your response. \
             Respond with plain text only, block by block. \
             Make it sound natural in {lang}."
        )
    }
}
