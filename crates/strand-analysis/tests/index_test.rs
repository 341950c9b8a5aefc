//! Resolution index: spilling, invalidation, persistence.

use std::sync::Arc;

use strand_analysis::call_graph::index::{ResolutionIndex, SpillTarget};
use strand_analysis::call_graph::types::Shard;
use strand_analysis::extractors::extract_file;
use strand_analysis::syntax::{FileDescriptor, FileSyntax, FunctionDecl};
use strand_core::config::IndexConfig;
use strand_core::types::{FunctionId, SymbolInterner};
use strand_storage::IndexStore;
use tempfile::TempDir;

fn shard(interner: &SymbolInterner, path: &str, names: &[&str]) -> Shard {
    let functions = names
        .iter()
        .enumerate()
        .map(|(i, n)| FunctionDecl::new(*n, (i as u32) * 10 + 1, (i as u32) * 10 + 5))
        .collect();
    let syntax = FileSyntax {
        functions,
        calls: vec![],
    };
    extract_file(&FileDescriptor::new(path, "typescript", 1), &syntax, interner)
}

fn tiny_budget() -> IndexConfig {
    IndexConfig {
        memory_budget_bytes: Some(1),
        ..IndexConfig::default()
    }
}

fn ids(index: &ResolutionIndex, interner: &SymbolInterner, name: &str) -> Vec<FunctionId> {
    index
        .lookup(interner.intern(name))
        .unwrap()
        .into_iter()
        .map(|e| e.function_id)
        .collect()
}

#[test]
fn lookup_returns_candidates_sorted_by_id() {
    let interner = Arc::new(SymbolInterner::new());
    let mut index = ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::Scratch);
    index.absorb(&shard(&interner, "b.ts", &["save", "load"])).unwrap();
    index.absorb(&shard(&interner, "a.ts", &["save"])).unwrap();

    let found = ids(&index, &interner, "save");
    assert_eq!(found.len(), 2);
    assert!(found.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(index.candidate_count(interner.intern("load")).unwrap(), 1);
    assert!(ids(&index, &interner, "missing").is_empty());
    assert!(!index.is_spilled());
    assert_eq!(index.len().unwrap(), 3);
}

#[test]
fn reabsorbing_a_file_replaces_its_entries() {
    let interner = Arc::new(SymbolInterner::new());
    let mut index = ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::Scratch);
    index.absorb(&shard(&interner, "a.ts", &["save", "load"])).unwrap();
    index.absorb(&shard(&interner, "a.ts", &["save"])).unwrap();

    assert_eq!(ids(&index, &interner, "save").len(), 1);
    assert!(ids(&index, &interner, "load").is_empty());
    assert_eq!(index.resident_entries(), 1);
}

#[test]
fn invalidate_file_removes_only_that_file() {
    let interner = Arc::new(SymbolInterner::new());
    let mut index = ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::Scratch);
    index.absorb(&shard(&interner, "a.ts", &["save"])).unwrap();
    index.absorb(&shard(&interner, "b.ts", &["save", "load"])).unwrap();

    let removed = index.invalidate_file(interner.intern_path("b.ts")).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(ids(&index, &interner, "save").len(), 1);
    assert!(ids(&index, &interner, "load").is_empty());
    assert_eq!(index.invalidate_file(interner.intern_path("b.ts")).unwrap(), 0);
}

#[test]
fn exceeding_the_budget_spills_without_changing_answers() {
    let interner = Arc::new(SymbolInterner::new());
    let mut resident = ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::Scratch);
    let mut spilled = ResolutionIndex::new(Arc::clone(&interner), &tiny_budget(), SpillTarget::Scratch);

    for (path, names) in [
        ("a.ts", vec!["save", "load"]),
        ("b.ts", vec!["save"]),
        ("c.ts", vec!["render", "load"]),
    ] {
        let s = shard(&interner, path, &names);
        resident.absorb(&s).unwrap();
        spilled.absorb(&s).unwrap();
    }

    assert!(spilled.is_spilled());
    assert!(spilled.spill_count() >= 1);
    assert_eq!(spilled.resident_entries(), 0);
    assert!(!resident.is_spilled());
    for name in ["save", "load", "render", "missing"] {
        assert_eq!(ids(&resident, &interner, name), ids(&spilled, &interner, name), "{name}");
    }
    assert_eq!(spilled.len().unwrap(), 5);
}

#[test]
fn invalidation_reaches_spilled_entries_and_the_cache() {
    let interner = Arc::new(SymbolInterner::new());
    let mut index = ResolutionIndex::new(Arc::clone(&interner), &tiny_budget(), SpillTarget::Scratch);
    index.absorb(&shard(&interner, "a.ts", &["save"])).unwrap();
    index.absorb(&shard(&interner, "b.ts", &["save"])).unwrap();

    // Warm the cache, then invalidate underneath it.
    assert_eq!(ids(&index, &interner, "save").len(), 2);
    assert_eq!(index.invalidate_file(interner.intern_path("a.ts")).unwrap(), 1);
    assert_eq!(ids(&index, &interner, "save").len(), 1);

    index.absorb(&shard(&interner, "a.ts", &["save", "extra"])).unwrap();
    assert_eq!(ids(&index, &interner, "save").len(), 2);
    assert_eq!(ids(&index, &interner, "extra").len(), 1);
}

#[test]
fn persisted_index_reloads_into_a_fresh_interner() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    let expected: Vec<FunctionId>;
    {
        let interner = Arc::new(SymbolInterner::new());
        let mut index =
            ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::File(path.clone()));
        index.absorb(&shard(&interner, "a.ts", &["save", "load"])).unwrap();
        index.absorb(&shard(&interner, "b.ts", &["save"])).unwrap();
        expected = ids(&index, &interner, "save");
        index.persist(0xfeed).unwrap();
        assert_eq!(index.resident_entries(), 0);
        assert_eq!(ids(&index, &interner, "save"), expected);
    }

    let interner = Arc::new(SymbolInterner::new());
    interner.intern("shift the handles");
    let store = IndexStore::open_verified(&path, 0xfeed).unwrap();
    let mut index = ResolutionIndex::from_store(Arc::clone(&interner), &IndexConfig::default(), store).unwrap();
    assert_eq!(ids(&index, &interner, "save"), expected);

    let hit = index.lookup(interner.intern("load")).unwrap();
    assert_eq!(interner.resolve(hit[0].file), "a.ts");
    assert_eq!(interner.resolve(hit[0].qualified_name), "load");

    assert_eq!(index.invalidate_file(interner.intern_path("a.ts")).unwrap(), 2);
    assert_eq!(ids(&index, &interner, "save").len(), 1);
}

#[test]
fn persisted_index_rejects_a_different_fingerprint() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    let interner = Arc::new(SymbolInterner::new());
    let mut index =
        ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::File(path.clone()));
    index.absorb(&shard(&interner, "a.ts", &["save"])).unwrap();
    index.persist(1).unwrap();
    drop(index);

    assert!(IndexStore::open_verified(&path, 2).is_err());
}

#[test]
fn scratch_index_has_nothing_to_persist() {
    let interner = Arc::new(SymbolInterner::new());
    let mut index = ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::Scratch);
    index.absorb(&shard(&interner, "a.ts", &["save"])).unwrap();
    index.persist(1).unwrap();
    assert_eq!(index.resident_entries(), 1);
    assert!(!index.is_spilled());
}
