/*!
 * Integration tests for full translation runs.
 *
 * Every test runs the pipeline against a scripted backend with a batcher that
 * puts exactly five segments in a chunk, so twelve segments give chunks of
 * 5, 5 and 2.
 */

use std::sync::Arc;
use resub::errors::TranslationError;
use resub::providers::mock::{MockBehavior, MockProvider};
use resub::translation::{ProgressKind, ProgressReporter, TranslationPipeline};
use crate::common::{self, key};

fn pipeline(mock: &MockProvider) -> TranslationPipeline {
    common::init_test_logging();
    let config = common::test_config("");
    TranslationPipeline::new(Arc::new(mock.clone()), &config.translation, "French", None)
        .with_batcher(common::five_per_chunk_batcher())
}

#[tokio::test(start_paused = true)]
async fn test_run_allChunksSucceed_shouldTranslateInOrder() {
    let mock = MockProvider::working();
    let segments = common::segments(12);
    let (reporter, mut receiver) = ProgressReporter::channel();

    let output = pipeline(&mock).run(&segments, &key('a'), reporter).await.unwrap();

    let expected: Vec<String> = segments.iter().map(|s| MockProvider::translated(&s.text)).collect();
    assert_eq!(output.translations, expected);
    assert_eq!(output.stats.chunks, 3);
    assert_eq!(mock.calls().iter().map(|c| c.units).collect::<Vec<_>>(), vec![5, 5, 2]);

    let events = common::drain_events(&mut receiver);
    let first = &events[0];
    assert_eq!(first.kind, ProgressKind::Progress);
    assert_eq!((first.translated, first.current_chunk, first.total_chunks), (0, Some(0), Some(3)));

    let progress: Vec<&str> = common::events_of(&events, ProgressKind::Progress)
        .iter()
        .skip(1)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(progress, vec![
        "Chunk 1/3 completed (5/12 subtitles)",
        "Chunk 2/3 completed (10/12 subtitles)",
        "Chunk 3/3 completed (12/12 subtitles)",
    ]);

    let last = events.last().unwrap();
    assert_eq!(last.kind, ProgressKind::Complete);
    assert_eq!(last.percentage, 100);
    assert_eq!(last.message, "Translation completed successfully!");
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_truncatedChunk_shouldBisectAndKeepAlignment() {
    // chunk 2 loses three of its five units
    let mock = MockProvider::working().with_script([
        MockBehavior::Translating,
        MockBehavior::Truncating { keep: 2 },
    ]);
    let segments = common::segments(12);
    let (reporter, mut receiver) = ProgressReporter::channel();

    let output = pipeline(&mock).run(&segments, &key('a'), reporter).await.unwrap();

    let expected: Vec<String> = segments.iter().map(|s| MockProvider::translated(&s.text)).collect();
    assert_eq!(output.translations, expected);
    assert_eq!(output.stats.bisections, 1);
    assert_eq!(mock.calls().iter().map(|c| c.units).collect::<Vec<_>>(), vec![5, 5, 3, 2, 2]);

    let events = common::drain_events(&mut receiver);
    assert!(events.iter().any(|e| e.message == "Chunk 2 too large, splitting into smaller parts (5 → 3 + 2 subtitles)..."));
    assert_eq!(events.last().unwrap().kind, ProgressKind::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_run_persistentServerError_shouldKeepSourceText() {
    let mock = MockProvider::working().with_script([
        MockBehavior::ServerError,
        MockBehavior::ServerError,
        MockBehavior::ServerError,
    ]);
    let segments = common::segments(7);

    let output = pipeline(&mock).run(&segments, &key('a'), ProgressReporter::disabled()).await.unwrap();

    // chunk 1 gave up after three attempts, chunk 2 went through
    assert_eq!(&output.translations[..5], &["Line 1", "Line 2", "Line 3", "Line 4", "Line 5"]);
    assert_eq!(output.translations[5], MockProvider::translated("Line 6"));
    assert_eq!(output.stats.fallback_segments, 5);
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_run_authFailure_shouldStopWithoutRotating() {
    let mock = MockProvider::working().with_credential_behavior(key('a'), MockBehavior::AuthFailure);
    let (reporter, mut receiver) = ProgressReporter::channel();

    let result = pipeline(&mock)
        .run(&common::segments(12), &format!("{},{}", key('a'), key('b')), reporter)
        .await;

    assert!(matches!(result, Err(TranslationError::Authentication { credential: 1, .. })));
    assert_eq!(mock.credentials_used(), vec![key('a')]);

    let events = common::drain_events(&mut receiver);
    let last = events.last().unwrap();
    assert_eq!(last.kind, ProgressKind::Error);
    assert!(last.message.contains("credential #1"));
    assert!(common::events_of(&events, ProgressKind::Complete).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_withoutValidCredential_shouldFailBeforeAnyRequest() {
    let mock = MockProvider::working();
    let (reporter, mut receiver) = ProgressReporter::channel();

    let result = pipeline(&mock).run(&common::segments(3), "too-short, also-short", reporter).await;

    assert!(matches!(result, Err(TranslationError::InvalidInput(_))));
    assert_eq!(mock.request_count(), 0);
    let events = common::drain_events(&mut receiver);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ProgressKind::Error);
}

#[tokio::test(start_paused = true)]
async fn test_run_emptyInput_shouldFailBeforeAnyRequest() {
    let mock = MockProvider::working();
    let (reporter, mut receiver) = ProgressReporter::channel();

    let result = pipeline(&mock).run(&[], &key('a'), reporter).await;

    assert!(matches!(result, Err(TranslationError::InvalidInput(_))));
    assert_eq!(mock.request_count(), 0);
    let events = common::drain_events(&mut receiver);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ProgressKind::Error);
    assert_eq!(events[0].percentage, 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_surplusAndBlankUnits_shouldStayAligned() {
    let mock = MockProvider::new(MockBehavior::Fixed("un|  |trois|quatre|cinq|six".to_string()));
    let segments = common::segments(5);

    let output = pipeline(&mock).run(&segments, &key('a'), ProgressReporter::disabled()).await.unwrap();

    assert_eq!(output.translations, vec!["un", "Line 2", "trois", "quatre", "cinq"]);
}
