//! Manifest persistence and diff tests.

use strand_storage::{Manifest, ManifestEntry, ShardStatus};
use tempfile::TempDir;

fn entry(file: &str, hash: u64, status: ShardStatus) -> ManifestEntry {
    ManifestEntry {
        file: file.to_string(),
        language: "python".to_string(),
        content_hash: hash,
        status,
        functions: 1,
        calls: 2,
        persisted: status != ShardStatus::Skipped,
        error: None,
    }
}

#[test]
fn entries_are_sorted_and_searchable() {
    let manifest = Manifest::new(
        vec![
            entry("z.py", 1, ShardStatus::Extracted),
            entry("a.py", 2, ShardStatus::Reused),
        ],
        false,
    );
    assert_eq!(manifest.entries[0].file, "a.py");
    assert_eq!(manifest.get("z.py").map(|e| e.content_hash), Some(1));
    assert!(manifest.get("m.py").is_none());
    assert_eq!(manifest.count(ShardStatus::Reused), 1);
}

#[test]
fn save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let manifest = Manifest::new(vec![entry("a.py", 2, ShardStatus::Extracted)], true);
    manifest.save(dir.path()).unwrap();
    assert_eq!(Manifest::load(dir.path()).unwrap(), Some(manifest));
}

#[test]
fn missing_or_garbled_manifest_loads_as_none() {
    let dir = TempDir::new().unwrap();
    assert_eq!(Manifest::load(dir.path()).unwrap(), None);
    std::fs::write(dir.path().join("manifest.json"), b"not json").unwrap();
    assert_eq!(Manifest::load(dir.path()).unwrap(), None);
}

#[test]
fn diff_classifies_files() {
    let previous = Manifest::new(
        vec![
            entry("same.py", 1, ShardStatus::Extracted),
            entry("edit.py", 1, ShardStatus::Extracted),
            entry("gone.py", 1, ShardStatus::Extracted),
        ],
        false,
    );
    let current = Manifest::new(
        vec![
            entry("same.py", 1, ShardStatus::Reused),
            entry("edit.py", 2, ShardStatus::Extracted),
            entry("new.py", 1, ShardStatus::Extracted),
        ],
        false,
    );
    let diff = current.diff(&previous);
    assert_eq!(diff.added, vec!["new.py"]);
    assert_eq!(diff.modified, vec!["edit.py"]);
    assert_eq!(diff.removed, vec!["gone.py"]);
    assert_eq!(diff.unchanged, vec!["same.py"]);
    assert_eq!(diff.changed(), vec!["edit.py", "gone.py", "new.py"]);
}

#[test]
fn skipped_entries_do_not_count_as_shards() {
    let manifest = Manifest::new(
        vec![
            entry("a.py", 1, ShardStatus::Extracted),
            entry("b.py", 1, ShardStatus::Skipped),
        ],
        true,
    );
    assert_eq!(manifest.with_shards().count(), 1);
}

#[test]
fn fingerprint_tracks_shard_set() {
    let a = Manifest::new(vec![entry("a.py", 1, ShardStatus::Extracted)], false);
    let b = Manifest::new(vec![entry("a.py", 1, ShardStatus::Reused)], false);
    let c = Manifest::new(vec![entry("a.py", 2, ShardStatus::Extracted)], false);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}
