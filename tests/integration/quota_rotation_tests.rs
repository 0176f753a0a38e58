/*!
 * Integration tests for credential rotation and the quota cooldown.
 *
 * Tests run on tokio's paused clock: sleeps complete instantly while the
 * virtual time still moves, so waiting periods can be asserted.
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use resub::errors::TranslationError;
use resub::providers::mock::{MockBehavior, MockProvider};
use resub::translation::{ProgressKind, ProgressReporter, TranslationPipeline};
use crate::common::{self, key};

fn pipeline(mock: &MockProvider, cooldown_rounds: u32) -> TranslationPipeline {
    common::init_test_logging();
    let mut config = common::test_config("");
    config.translation.retry.quota_cooldown_rounds = cooldown_rounds;
    TranslationPipeline::new(Arc::new(mock.clone()), &config.translation, "French", None)
        .with_batcher(common::five_per_chunk_batcher())
}

#[tokio::test(start_paused = true)]
async fn test_quota_onFirstKey_shouldSwitchToSecondWithoutWaiting() {
    let mock = MockProvider::working().with_credential_behavior(key('a'), MockBehavior::QuotaExceeded);
    let segments = common::segments(12);
    let (reporter, mut receiver) = ProgressReporter::channel();
    let started = Instant::now();

    let output = pipeline(&mock, 1)
        .run(&segments, &format!("{},{}", key('a'), key('b')), reporter)
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(output.translations.len(), 12);
    assert_eq!(output.stats.rotations, 1);
    assert_eq!(mock.credentials_used(), vec![key('a'), key('b'), key('b'), key('b')]);

    let events = common::drain_events(&mut receiver);
    let quota_at = events.iter().position(|e| e.kind == ProgressKind::QuotaError).unwrap();
    let quota = &events[quota_at];
    assert_eq!(quota.retry_after, Some(0));
    assert_eq!(quota.current_chunk, Some(1));
    assert!(quota.message.contains("credential #1"));
    assert!(quota.message.contains("credential #2"));

    let retry = &events[quota_at + 1];
    assert_eq!(retry.kind, ProgressKind::Retry);
    assert!(retry.message.contains("credential #2"));
    assert_eq!(events.last().unwrap().kind, ProgressKind::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_quota_rotation_shouldNeverReuseExhaustedKeys() {
    let mock = MockProvider::working()
        .with_credential_behavior(key('a'), MockBehavior::QuotaExceeded)
        .with_credential_behavior(key('b'), MockBehavior::QuotaExceeded);
    let keys = format!("{},{},{}", key('a'), key('b'), key('c'));

    let output = pipeline(&mock, 1)
        .run(&common::segments(12), &keys, ProgressReporter::disabled())
        .await
        .unwrap();

    assert_eq!(output.stats.rotations, 2);
    assert_eq!(mock.credentials_used(), vec![key('a'), key('b'), key('c'), key('c'), key('c')]);
}

#[tokio::test(start_paused = true)]
async fn test_quota_allKeysExhausted_shouldCooldownAndResumeSameChunk() {
    // chunks 1 and 2 on A, chunk 3 throttled on A then on B until the cooldown
    let mock = MockProvider::working().with_script([
        MockBehavior::Translating,
        MockBehavior::Translating,
        MockBehavior::QuotaExceeded,
        MockBehavior::QuotaExceeded,
        MockBehavior::QuotaExceeded,
        MockBehavior::QuotaExceeded,
    ]);
    let segments = common::segments(12);
    let (reporter, mut receiver) = ProgressReporter::channel();
    let started = Instant::now();

    let output = pipeline(&mock, 1)
        .run(&segments, &format!("{},{}", key('a'), key('b')), reporter)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(65));
    assert_eq!(output.stats.quota_pauses, 1);
    let expected: Vec<String> = segments.iter().map(|s| MockProvider::translated(&s.text)).collect();
    assert_eq!(output.translations, expected);
    assert_eq!(
        mock.credentials_used(),
        vec![key('a'), key('a'), key('a'), key('b'), key('b'), key('b'), key('b')]
    );

    let events = common::drain_events(&mut receiver);
    let cooldown = events.iter()
        .find(|e| e.kind == ProgressKind::QuotaError && e.retry_after == Some(65))
        .unwrap();
    assert_eq!(cooldown.current_chunk, Some(3));
    assert_eq!(cooldown.translated, 10);
    assert_eq!(
        cooldown.message,
        "API quota limit reached! Translation paused at chunk 3/3. Waiting 65s for quota reset..."
    );
    assert!(events.iter().any(|e| e.kind == ProgressKind::Retry
        && e.message == "Quota reset window passed! Resuming translation from chunk 3/3..."));

    let last = events.last().unwrap();
    assert_eq!(last.kind, ProgressKind::Complete);
    assert_eq!(last.percentage, 100);
}

#[tokio::test(start_paused = true)]
async fn test_quota_stillExhaustedAfterCooldown_shouldFailRun() {
    let mock = MockProvider::new(MockBehavior::QuotaExceeded);
    let (reporter, mut receiver) = ProgressReporter::channel();

    let result = pipeline(&mock, 1)
        .run(&common::segments(3), &key('a'), reporter)
        .await;

    assert!(matches!(result, Err(TranslationError::QuotaExhausted { chunk: 1 })));
    // three attempts before the cooldown, three after
    assert_eq!(mock.request_count(), 6);

    let events = common::drain_events(&mut receiver);
    assert_eq!(events.last().unwrap().kind, ProgressKind::Error);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_quota_duringBisection_shouldRotateOnceForBothHalves() {
    // A truncates the 4-segment chunk, then throttles both halves while they run side by side
    let mock = MockProvider::working().with_script([
        MockBehavior::Truncating { keep: 2 },
        MockBehavior::QuotaExceeded,
        MockBehavior::QuotaExceeded,
    ]);
    let segments = common::segments(4);
    let (reporter, mut receiver) = ProgressReporter::channel();

    let output = pipeline(&mock, 1)
        .run(&segments, &format!("{},{}", key('a'), key('b')), reporter)
        .await
        .unwrap();

    let expected: Vec<String> = segments.iter().map(|s| MockProvider::translated(&s.text)).collect();
    assert_eq!(output.translations, expected);
    assert_eq!(output.stats.bisections, 1);
    assert_eq!(output.stats.rotations, 1);

    // both halves saw A throttled before either moved on, then both finished on B
    let used = mock.credentials_used();
    assert_eq!(used, vec![key('a'), key('a'), key('a'), key('b'), key('b')]);
    let first_b = used.iter().position(|k| *k == key('b')).unwrap();
    assert!(used[first_b..].iter().all(|k| *k == key('b')));
    let half_sizes: Vec<usize> = mock.calls()[first_b..].iter().map(|c| c.units).collect();
    assert_eq!(half_sizes, vec![2, 2]);

    let events = common::drain_events(&mut receiver);
    assert_eq!(common::events_of(&events, ProgressKind::QuotaError).len(), 1);
    assert_eq!(common::events_of(&events, ProgressKind::Retry).len(), 1);
    assert_eq!(events.last().unwrap().kind, ProgressKind::Complete);
}
