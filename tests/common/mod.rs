/*!
 * Common test utilities for the resub test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use std::sync::Arc;
use anyhow::Result;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use resub::app_config::Config;
use resub::translation::{Batcher, ProgressEvent, ProgressKind, Segment};
use resub::translation::tokens::TokenCounter;

/// Route library logs to the test output; repeated calls are harmless
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
-Is it working? -It is.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// A key long enough to pass the credential filter
pub fn key(tag: char) -> String {
    std::iter::repeat(tag).take(32).collect()
}

/// `count` segments with distinct texts, indexed from 1
pub fn segments(count: usize) -> Vec<Segment> {
    (1..=count).map(|i| Segment::new(i, format!("Line {}", i))).collect()
}

/// Every text costs the same number of tokens
pub struct FixedCost(pub usize);

impl TokenCounter for FixedCost {
    fn count(&self, _text: &str) -> usize {
        self.0
    }
}

/// Batcher where each segment costs 10 tokens: a ceiling of 54 holds exactly
/// five segments plus their four delimiters
pub fn five_per_chunk_batcher() -> Batcher {
    Batcher::with_counter(54, Arc::new(FixedCost(10)))
}

/// Default configuration with the given credentials and a French target
pub fn test_config(api_keys: &str) -> Config {
    let mut config = Config::default();
    config.target_language = "fr".to_string();
    config.translation.api_keys = api_keys.to_string();
    config.translation.retry.backoff_base_ms = 10;
    config
}

/// Every event already sent on the channel
pub fn drain_events(receiver: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Events of one kind, in order
pub fn events_of(events: &[ProgressEvent], kind: ProgressKind) -> Vec<&ProgressEvent> {
    events.iter().filter(|e| e.kind == kind).collect()
}
