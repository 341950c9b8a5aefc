//! End-to-end runs over a syntax directory: build, reload, rebuild.

use std::fs;
use std::path::Path;

use glob::Pattern;
use serde_json::json;
use strand_analysis::call_graph::summary::IndexSource;
use strand_analysis::call_graph::types::{ResolutionRule, ResolutionStatus};
use strand_analysis::graph::impact::DeadCodeReason;
use strand_analysis::graph::reachability::SecurityAnnotations;
use strand_analysis::syntax::{CallExpr, FileSyntax, FunctionDecl, JsonDirProvider, MemoryProvider};
use strand_analysis::CallGraphSession;
use strand_core::config::StrandConfig;
use strand_core::constants::{INDEX_DB_FILE, MANIFEST_FILE};
use strand_core::errors::{PipelineError, ScanError, StorageError};
use strand_core::traits::Cancellable;
use strand_core::types::FunctionId;
use strand_storage::{Manifest, StoreLock};
use tempfile::TempDir;
use xxhash_rust::xxh3::xxh3_64;

fn project() -> Vec<(&'static str, FileSyntax)> {
    vec![
        (
            "src/server.ts",
            FileSyntax {
                functions: vec![FunctionDecl::new("main", 1, 10).entry_point()],
                calls: vec![
                    CallExpr::new("handleLogin", 3, 4).imported_from("./auth"),
                    CallExpr::new("log", 4, 4),
                ],
            },
        ),
        (
            "src/auth.ts",
            FileSyntax {
                functions: vec![FunctionDecl::new("handleLogin", 1, 8), FunctionDecl::new("checkPassword", 10, 15)],
                calls: vec![
                    CallExpr::new("checkPassword", 2, 4),
                    CallExpr::new("query", 3, 4).imported_from("./db"),
                ],
            },
        ),
        (
            "src/db.ts",
            FileSyntax {
                functions: vec![FunctionDecl::new("query", 1, 5), FunctionDecl::new("unused", 7, 9)],
                calls: vec![],
            },
        ),
        (
            "src/legacy.ts",
            FileSyntax {
                functions: vec![FunctionDecl::new("oldQuery", 1, 4)],
                calls: vec![CallExpr::new("query", 2, 4)],
            },
        ),
    ]
}

/// Write `files.json` plus one document per file, the way an external
/// parser would export them.
fn write_syntax_dir(root: &Path, files: &[(&str, FileSyntax)]) {
    fs::create_dir_all(root.join("docs")).unwrap();
    let mut index = Vec::new();
    for (i, (path, syntax)) in files.iter().enumerate() {
        let bytes = serde_json::to_vec(syntax).unwrap();
        let document = format!("docs/{i}.json");
        fs::write(root.join(&document), &bytes).unwrap();
        index.push(json!({
            "path": path,
            "language": "typescript",
            "content_hash": xxh3_64(&bytes),
            "document": document,
        }));
    }
    fs::write(root.join("files.json"), serde_json::to_vec_pretty(&index).unwrap()).unwrap();
}

fn config() -> StrandConfig {
    let mut config = StrandConfig::default();
    config.build.workers = Some(2);
    config
}

fn id(file: &str, name: &str, line: u32) -> FunctionId {
    FunctionId::derive(file, name, line)
}

#[test]
fn build_resolves_and_assembles_the_project() {
    let input = TempDir::new().unwrap();
    let shards = TempDir::new().unwrap();
    write_syntax_dir(input.path(), &project());
    let provider = JsonDirProvider::open(input.path()).unwrap();

    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let summary = session.build(&provider).unwrap();

    assert_eq!(summary.files_total, 4);
    assert_eq!(summary.files_processed, 4);
    assert_eq!(summary.files_skipped, 0);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(summary.functions, 6);
    assert_eq!(summary.call_sites, 5);
    assert_eq!(summary.graph_edges, 4);
    assert_eq!(summary.index_source, IndexSource::Fresh);
    assert!(!summary.index_spilled);
    assert!((summary.resolution_rate() - 0.8).abs() < 1e-9);
    assert!((summary.rate(ResolutionStatus::UnresolvedExternal) - 0.2).abs() < 1e-9);
    assert_eq!(summary.resolution.by_rule.get("import_binding"), Some(&2));
    assert_eq!(summary.resolution.by_rule.get("same_scope"), Some(&1));
    assert_eq!(summary.resolution.by_rule.get("unique_name"), Some(&1));

    let main = id("src/server.ts", "main", 1);
    let login = id("src/auth.ts", "handleLogin", 1);
    let check = id("src/auth.ts", "checkPassword", 10);
    let query = id("src/db.ts", "query", 1);
    let old = id("src/legacy.ts", "oldQuery", 1);

    let graph = session.graph();
    assert_eq!(graph.callees(main), vec![login]);
    let mut login_callees = vec![check, query];
    login_callees.sort();
    assert_eq!(graph.callees(login), login_callees);
    let mut query_callers = vec![login, old];
    query_callers.sort();
    assert_eq!(graph.callers(query), query_callers);

    let edge = session
        .edges()
        .iter()
        .find(|e| e.caller() == main && e.callee == Some(login))
        .unwrap();
    assert_eq!(edge.rule, Some(ResolutionRule::ImportBinding));
    assert_eq!(edge.confidence, 0.9);

    assert_eq!(session.function_by_name("src/auth.ts", "checkPassword").unwrap().id, check);
    assert!(session.function_by_name("src/auth.ts", "nope").is_none());
    assert!(shards.path().join(MANIFEST_FILE).is_file());
    assert!(shards.path().join(INDEX_DB_FILE).is_file());
}

#[test]
fn graph_queries_over_a_built_session() {
    let input = TempDir::new().unwrap();
    let shards = TempDir::new().unwrap();
    write_syntax_dir(input.path(), &project());
    let provider = JsonDirProvider::open(input.path()).unwrap();
    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    session.build(&provider).unwrap();

    let main = id("src/server.ts", "main", 1);
    let login = id("src/auth.ts", "handleLogin", 1);
    let check = id("src/auth.ts", "checkPassword", 10);
    let query = id("src/db.ts", "query", 1);
    let unused = id("src/db.ts", "unused", 7);
    let old = id("src/legacy.ts", "oldQuery", 1);

    let queries = session.queries();
    let reachable = queries.forward_reachable(&[main]);
    assert_eq!(reachable.into_iter().collect::<Vec<_>>(), {
        let mut v = vec![main, login, check, query];
        v.sort();
        v
    });
    assert_eq!(queries.inverse_reachable(query).into_iter().collect::<Vec<_>>(), vec![main]);
    assert!(queries.inverse_reachable(old).is_empty());

    let dead = queries.dead_code(&session.default_allowlist());
    let dead_ids: Vec<FunctionId> = dead.iter().map(|d| d.function_id).collect();
    let mut expected = vec![unused, old];
    expected.sort();
    assert_eq!(dead_ids, expected);
    assert!(dead.iter().all(|d| d.reason == DeadCodeReason::NoCallers));

    let impact = queries.impact(query).unwrap();
    assert_eq!(impact.affected_entry_points, vec![main]);
    assert_eq!(impact.transitive_callers.len(), 3);

    let annotations = SecurityAnnotations::from_patterns(
        session.graph(),
        session.interner(),
        &[Pattern::new("query").unwrap()],
        &[],
    );
    let exposures = queries.unauthenticated_exposures(&annotations);
    assert_eq!(exposures.len(), 1);
    assert_eq!(exposures[0].path, vec![main, login, query]);
}

#[test]
fn allow_patterns_from_config_suppress_dead_code() {
    let input = TempDir::new().unwrap();
    let shards = TempDir::new().unwrap();
    write_syntax_dir(input.path(), &project());
    let provider = JsonDirProvider::open(input.path()).unwrap();

    let mut config = config();
    config.dead_code.allow_patterns = vec!["old*".to_string()];
    let mut session = CallGraphSession::open(shards.path(), config).unwrap();
    session.build(&provider).unwrap();

    let dead = session.queries().dead_code(&session.default_allowlist());
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].function_id, id("src/db.ts", "unused", 7));
}

#[test]
fn second_session_reuses_shards_and_reloads_the_index() {
    let input = TempDir::new().unwrap();
    let shards = TempDir::new().unwrap();
    write_syntax_dir(input.path(), &project());
    let provider = JsonDirProvider::open(input.path()).unwrap();

    let first_edges = {
        let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
        session.build(&provider).unwrap();
        session.graph().edge_list()
    };

    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let summary = session.build(&provider).unwrap();
    assert_eq!(summary.files_skipped, 4);
    assert_eq!(summary.files_processed, 0);
    assert_eq!(summary.index_source, IndexSource::Reloaded);
    assert_eq!(session.graph().edge_list(), first_edges);
}

#[test]
fn damaged_index_is_rebuilt_from_shards() {
    let input = TempDir::new().unwrap();
    let shards = TempDir::new().unwrap();
    write_syntax_dir(input.path(), &project());
    let provider = JsonDirProvider::open(input.path()).unwrap();

    let first_edges = {
        let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
        session.build(&provider).unwrap();
        session.graph().edge_list()
    };
    fs::write(shards.path().join(INDEX_DB_FILE), b"definitely not sqlite").unwrap();

    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let summary = session.build(&provider).unwrap();
    assert_eq!(summary.index_source, IndexSource::Rebuilt);
    assert_eq!(session.graph().edge_list(), first_edges);

    // The rebuilt index is sound again.
    drop(session);
    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    assert_eq!(session.build(&provider).unwrap().index_source, IndexSource::Reloaded);
}

#[test]
fn spilled_index_gives_the_same_graph() {
    let input = TempDir::new().unwrap();
    write_syntax_dir(input.path(), &project());
    let provider = JsonDirProvider::open(input.path()).unwrap();

    let resident_dir = TempDir::new().unwrap();
    let mut resident = CallGraphSession::open(resident_dir.path(), config()).unwrap();
    resident.build(&provider).unwrap();

    let spilled_dir = TempDir::new().unwrap();
    let mut tight = config();
    tight.index.memory_budget_bytes = Some(1);
    let mut spilled = CallGraphSession::open(spilled_dir.path(), tight).unwrap();
    let summary = spilled.build(&provider).unwrap();

    assert!(summary.index_spilled);
    assert_eq!(spilled.graph().edge_list(), resident.graph().edge_list());
}

#[test]
fn persistence_can_be_turned_off() {
    let shards = TempDir::new().unwrap();
    let mut provider = MemoryProvider::new();
    for (path, syntax) in project() {
        provider.add_file(path, "typescript", syntax);
    }
    let mut config = config();
    config.index.persist = Some(false);
    let mut session = CallGraphSession::open(shards.path(), config).unwrap();
    let summary = session.build(&provider).unwrap();

    assert_eq!(summary.index_source, IndexSource::Fresh);
    assert_eq!(summary.graph_edges, 4);
    assert!(!shards.path().join(INDEX_DB_FILE).exists());
}

#[test]
fn duplicate_paths_abort_the_run() {
    let input = TempDir::new().unwrap();
    let shards = TempDir::new().unwrap();
    let syntax = FileSyntax::default();
    write_syntax_dir(input.path(), &[("src/a.ts", syntax.clone()), ("./src/a.ts", syntax)]);
    let provider = JsonDirProvider::open(input.path()).unwrap();

    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let err = session.build(&provider).unwrap_err();
    assert!(
        matches!(err, PipelineError::Scan(ScanError::DuplicateFile { ref path }) if path == "src/a.ts"),
        "{err}"
    );
}

#[test]
fn missing_syntax_directory_is_fatal() {
    let input = TempDir::new().unwrap();
    let err = JsonDirProvider::open(&input.path().join("nowhere")).unwrap_err();
    assert!(matches!(err, ScanError::RootUnreadable { .. }));
}

#[test]
fn cancelled_build_reports_progress_and_saves_a_manifest() {
    let shards = TempDir::new().unwrap();
    let mut provider = MemoryProvider::new();
    for (path, syntax) in project() {
        provider.add_file(path, "typescript", syntax);
    }
    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let token = session.cancel_token();
    token.cancel();

    let err = session.build(&provider).unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled { completed: 0, total: 4 }), "{err}");
    assert!(session.manifest().is_none());
    assert!(Manifest::load(shards.path()).unwrap().unwrap().cancelled);

    token.reset();
    let summary = session.build(&provider).unwrap();
    assert_eq!(summary.files_processed, 4);
    assert_eq!(summary.index_source, IndexSource::Fresh);
}

#[test]
fn a_locked_store_is_refused() {
    let shards = TempDir::new().unwrap();
    let mut lock = StoreLock::open(shards.path()).unwrap();
    let _held = lock.try_exclusive().unwrap();

    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let err = session.build(&MemoryProvider::new()).unwrap_err();
    assert!(matches!(err, PipelineError::Storage(StorageError::Locked { .. })), "{err}");
}

#[test]
fn failed_files_are_counted_but_do_not_abort() {
    let shards = TempDir::new().unwrap();
    let mut provider = MemoryProvider::new();
    for (path, syntax) in project() {
        provider.add_file(path, "typescript", syntax);
    }
    provider.add_file("ios/App.swift", "swift", FileSyntax::default());

    let mut session = CallGraphSession::open(shards.path(), config()).unwrap();
    let summary = session.build(&provider).unwrap();
    assert_eq!(summary.files_total, 5);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.graph_edges, 4);
}

#[test]
fn from_root_places_shards_under_the_project() {
    let root = TempDir::new().unwrap();
    let mut provider = MemoryProvider::new();
    for (path, syntax) in project() {
        provider.add_file(path, "typescript", syntax);
    }
    let mut session = CallGraphSession::from_root(root.path(), config()).unwrap();
    session.build(&provider).unwrap();
    assert!(root.path().join(".strand/shards").join(MANIFEST_FILE).is_file());
}

#[test]
fn invalid_config_is_rejected_at_open() {
    let shards = TempDir::new().unwrap();
    let mut config = config();
    config.resolution.unique_confidence = Some(1.5);
    let err = CallGraphSession::open(shards.path(), config).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}
