/*!
 * Tests for batching with the default token estimate and for the credential pool
 */

use resub::errors::TranslationError;
use resub::translation::{Batcher, CredentialPool, Segment};
use resub::translation::tokens::{HeuristicTokenCounter, TokenCounter};
use crate::common;

#[test]
fn test_heuristic_counter_shouldWeightScripts() {
    let counter = HeuristicTokenCounter::new();
    assert_eq!(counter.count(""), 0);
    assert_eq!(counter.count("a"), 1);
    // 12 latin letters weigh 3 tokens, 4 ideographs weigh 4
    assert_eq!(counter.count("abcdefghijkl"), 3);
    assert_eq!(counter.count("你好世界"), 4);
}

#[test]
fn test_default_batcher_shouldKeepEveryChunkUnderCeiling() {
    let batcher = Batcher::new(40);
    let counter = HeuristicTokenCounter::new();
    let input: Vec<Segment> = (1..=50)
        .map(|i| Segment::new(i, format!("Subtitle number {} says something short.", i)))
        .collect();

    let chunks = batcher.batch(&input);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        let cost: usize = chunk.segments().iter().map(|s| counter.count(&s.text)).sum::<usize>() + chunk.len() - 1;
        assert!(chunk.is_single() || cost <= 40, "chunk of {} segments costs {}", chunk.len(), cost);
    }
    assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 50);
}

#[test]
fn test_fixed_cost_batcher_shouldHoldFivePerChunk() {
    let chunks = common::five_per_chunk_batcher().batch(&common::segments(12));
    let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(chunks[1].first_index(), 6);
}

#[test]
fn test_credential_pool_shouldKeepSuppliedOrder() {
    let raw = format!("{}, {} ,{}", common::key('a'), common::key('b'), common::key('c'));
    let pool = CredentialPool::parse(&raw, 30).unwrap();

    let keys: Vec<&str> = pool.iter().map(|c| c.expose()).collect();
    assert_eq!(keys, vec![common::key('a'), common::key('b'), common::key('c')]);
    assert_eq!(pool.active_index(), 0);
}

#[test]
fn test_credential_pool_emptyInput_shouldBeInvalid() {
    assert!(matches!(CredentialPool::parse("", 30), Err(TranslationError::InvalidInput(_))));
    assert!(matches!(CredentialPool::parse(" , ,", 30), Err(TranslationError::InvalidInput(_))));
}

#[test]
fn test_credential_display_shouldMaskKey() {
    let pool = CredentialPool::parse(&common::key('q'), 30).unwrap();
    let (_, credential) = pool.current();
    assert_eq!(credential.to_string(), "****qqqq");
}
