// =============================================================================
// main.rs — THE CHAT KEYWORD ENGINE, FROM THE COMMAND LINE
// =============================================================================
//
// Reads chat messages from stdin, one per line, and writes one JSON report
// per line to stdout. A line may be a JSON object ({"id": .., "text": ..})
// or plain text. Keyword tables are read from KEYWORD_ENGINE_KEYWORD_DIR and
// re-read whenever a domain's TTL runs out, so editing the JSON files while
// this runs works.
//
//   cat messages.txt | chat_keyword_engine > reports.jsonl
// =============================================================================

use anyhow::{Context, Result};
use std::io::{self, BufRead, BufWriter, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use chat_keyword_engine::{ChatMessage, Config, JsonDirStore, KeywordEngine};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the reports.
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env();
    info!(
        keyword_dir = %config.keyword_dir.display(),
        transaction_ttl_secs = config.transaction_ttl.as_secs(),
        restricted_ttl_secs = config.restricted_ttl.as_secs(),
        geography_ttl_secs = config.geography_ttl.as_secs(),
        case_sensitive = config.case_sensitive,
        "Configuration loaded"
    );

    if !config.keyword_dir.is_dir() {
        warn!(
            keyword_dir = %config.keyword_dir.display(),
            "Keyword directory not found — every domain will match nothing"
        );
    }

    let store = Arc::new(JsonDirStore::new(config.keyword_dir.clone()));
    let engine = KeywordEngine::new(&config, store);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut batch: Vec<ChatMessage> = Vec::with_capacity(config.batch_size);

    for line in stdin.lock().lines() {
        let line = line.context("failed to read message from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        batch.push(parse_message(&line));

        if batch.len() >= config.batch_size {
            flush(&engine, &mut batch, &mut out)?;
        }
    }
    flush(&engine, &mut batch, &mut out)?;
    out.flush().context("failed to flush reports")?;

    let metrics = engine.metrics();
    info!(
        analyzed = metrics.messages_analyzed,
        flagged = metrics.messages_flagged,
        degraded_builds = metrics.degraded_builds,
        failed_builds = metrics.failed_builds,
        "Done"
    );
    for snapshot in engine.cache_snapshots() {
        info!(cache = %snapshot.name, snapshot = %serde_json::to_string(&snapshot)?, "Cache state");
    }

    Ok(())
}

fn parse_message(line: &str) -> ChatMessage {
    if line.trim_start().starts_with('{') {
        if let Ok(message) = serde_json::from_str::<ChatMessage>(line) {
            return message;
        }
    }
    ChatMessage::from_text(line)
}

fn flush<W: Write>(engine: &KeywordEngine, batch: &mut Vec<ChatMessage>, out: &mut W) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    for report in engine.analyze_batch(batch) {
        serde_json::to_writer(&mut *out, &report).context("failed to serialize report")?;
        out.write_all(b"\n").context("failed to write report")?;
    }
    batch.clear();
    Ok(())
}
