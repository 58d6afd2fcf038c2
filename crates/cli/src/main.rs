//! Binary entry point for the subtitle translator.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use subtrans_core::chunk::DEFAULT_CHUNK_SIZE;
use subtrans_core::config::{
    TranslationConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TARGET_LANGUAGE,
};
use subtrans_core::pipeline::translate_dir;
use subtrans_core::translate::openai::{
    OpenAiTranslator, DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT,
};
use subtrans_core::translate::ChunkTranslator;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line options for the binary.
#[derive(Parser)]
struct Cli {
    /// Folder containing the .srt/.txt files to translate.
    #[arg(long, default_value = "input")]
    source: PathBuf,

    /// Folder the translated files are written to.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Language to translate into.
    #[arg(long, default_value = DEFAULT_TARGET_LANGUAGE)]
    target_language: String,

    /// Chat model used for translation.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Approximate number of characters sent per request.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Attempts per chunk before keeping the original text.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Seconds to wait between attempts.
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs())]
    retry_delay: u64,

    /// Seconds before a single translation request is abandoned.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    request_timeout: u64,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// API key for the translation service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Enable verbose debug and trace logs.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("subtrans=trace".parse()?)
            .add_directive("subtrans_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("subtrans=info".parse()?)
            .add_directive("subtrans_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = TranslationConfig {
        target_language: cli.target_language,
        chunk_size: cli.chunk_size,
        max_retries: cli.max_retries,
        retry_delay: Duration::from_secs(cli.retry_delay),
    };
    let translator = OpenAiTranslator::new(cli.api_key, cli.model)
        .with_base_url(cli.api_base)
        .with_timeout(Duration::from_secs(cli.request_timeout));
    let client = ChunkTranslator::new(translator, config);
    let written = translate_dir(&cli.source, &cli.output, &client).await?;
    info!("translated {} file(s) into {}", written.len(), cli.output.display());
    Ok(())
}
