//! Integration tests for the content-addressed index cache.

use std::fs;

use dsr_index::{IndexCache, content_hash};
use dsr_model::{ExtractedDocument, TextBlock};
use tempfile::TempDir;

fn doc(text: &str) -> ExtractedDocument {
    ExtractedDocument {
        blocks: vec![
            TextBlock {
                page: 1,
                text: "1 SUMMARY\nSummary body".to_string(),
            },
            TextBlock {
                page: 2,
                text: text.to_string(),
            },
        ],
        tables: Vec::new(),
    }
}

#[test]
fn reindexing_identical_input_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let cache = IndexCache::new(dir.path()).unwrap();
    let input = doc("2 RISKS\nRisk body");

    let (first, rebuilt_first) = cache.load_or_build(&input, false).unwrap();
    assert!(rebuilt_first);
    let bytes_first = fs::read(cache.path_for(&first.source_hash)).unwrap();

    let (second, rebuilt_second) = cache.load_or_build(&input, false).unwrap();
    assert!(!rebuilt_second);
    assert_eq!(first, second);
    let bytes_second = fs::read(cache.path_for(&second.source_hash)).unwrap();
    assert_eq!(bytes_first, bytes_second);
}

#[test]
fn changed_block_invalidates_the_cache() {
    let dir = TempDir::new().unwrap();
    let cache = IndexCache::new(dir.path()).unwrap();

    let (first, _) = cache.load_or_build(&doc("2 RISKS\nRisk body"), false).unwrap();
    let (second, rebuilt) = cache
        .load_or_build(&doc("2 RISKS\nAmended risk body"), false)
        .unwrap();

    assert!(rebuilt);
    assert_ne!(first.source_hash, second.source_hash);
    assert_ne!(first, second);
}

#[test]
fn force_rebuild_bypasses_a_valid_cache_entry() {
    let dir = TempDir::new().unwrap();
    let cache = IndexCache::new(dir.path()).unwrap();
    let input = doc("2 RISKS\nRisk body");

    cache.load_or_build(&input, false).unwrap();
    let (_, rebuilt) = cache.load_or_build(&input, true).unwrap();
    assert!(rebuilt);
}

#[test]
fn corrupt_cache_entry_is_recovered_by_rebuild() {
    let dir = TempDir::new().unwrap();
    let cache = IndexCache::new(dir.path()).unwrap();
    let input = doc("2 RISKS\nRisk body");

    let hash = content_hash(&input);
    fs::write(cache.path_for(&hash), "{ not json").unwrap();

    let (index, rebuilt) = cache.load_or_build(&input, false).unwrap();
    assert!(rebuilt);
    assert_eq!(index.source_hash, hash);
    assert!(index.get("2").is_some());
}

#[test]
fn cache_entry_with_foreign_hash_is_ignored() {
    let dir = TempDir::new().unwrap();
    let cache = IndexCache::new(dir.path()).unwrap();
    let input = doc("2 RISKS\nRisk body");

    let (mut index, _) = cache.load_or_build(&input, false).unwrap();
    // Tamper: store an index claiming a different source under this key.
    index.source_hash = "deadbeef".to_string();
    fs::write(
        cache.path_for(&content_hash(&input)),
        serde_json::to_string(&index).unwrap(),
    )
    .unwrap();

    let (fresh, rebuilt) = cache.load_or_build(&input, false).unwrap();
    assert!(rebuilt);
    assert_eq!(fresh.source_hash, content_hash(&input));
}
