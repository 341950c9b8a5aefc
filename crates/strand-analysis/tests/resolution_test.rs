//! Ordered resolution rules, confidences, and determinism.

use std::sync::Arc;

use strand_analysis::call_graph::index::{ResolutionIndex, SpillTarget};
use strand_analysis::call_graph::resolution::{CallResolver, ResolutionDiagnostics, ResolutionPolicy};
use strand_analysis::call_graph::types::{
    CallSite, FunctionRecord, ResolutionEdge, ResolutionRule, ResolutionStatus,
};
use strand_analysis::extractors::extract_file;
use strand_analysis::language::Language;
use strand_analysis::syntax::{CallExpr, FileDescriptor, FileSyntax, FunctionDecl};
use strand_core::config::{IndexConfig, ResolutionConfig};
use strand_core::errors::CallGraphError;
use strand_core::types::{FunctionId, FxHashMap, SymbolInterner};

struct Fixture {
    interner: Arc<SymbolInterner>,
    index: ResolutionIndex,
    functions: FxHashMap<FunctionId, FunctionRecord>,
    sites: Vec<CallSite>,
}

impl Fixture {
    fn new(files: &[(&str, &str, FileSyntax)]) -> Self {
        let interner = Arc::new(SymbolInterner::new());
        let mut index = ResolutionIndex::new(Arc::clone(&interner), &IndexConfig::default(), SpillTarget::Scratch);
        let mut functions = FxHashMap::default();
        let mut sites = Vec::new();
        for (path, lang, syntax) in files {
            let shard = extract_file(&FileDescriptor::new(*path, *lang, 1), syntax, &interner);
            assert!(shard.error.is_none(), "{path}: {:?}", shard.error);
            index.absorb(&shard).unwrap();
            for f in &shard.functions {
                functions.insert(f.id, *f);
            }
            sites.extend(shard.calls.iter().copied());
        }
        Self {
            interner,
            index,
            functions,
            sites,
        }
    }

    fn resolve_with(&self, policy: ResolutionPolicy) -> Vec<ResolutionEdge> {
        CallResolver::new(&self.index, &self.interner, policy)
            .resolve_all(&self.sites, &self.functions)
            .unwrap()
    }

    fn resolve(&self) -> Vec<ResolutionEdge> {
        self.resolve_with(ResolutionPolicy::default())
    }

    /// The edge for the only call whose target text is `target`.
    fn edge(&self, target: &str) -> ResolutionEdge {
        let mut matching = self
            .resolve()
            .into_iter()
            .filter(|e| self.interner.resolve(e.call_site.target) == target);
        let edge = matching.next().unwrap();
        assert!(matching.next().is_none(), "more than one call to {target}");
        edge
    }

    fn id(&self, file: &str, qualified_name: &str) -> FunctionId {
        self.functions
            .values()
            .find(|f| {
                self.interner.resolve(f.file) == file && self.interner.resolve(f.qualified_name) == qualified_name
            })
            .map(|f| f.id)
            .unwrap()
    }
}

fn file(functions: Vec<FunctionDecl>, calls: Vec<CallExpr>) -> FileSyntax {
    FileSyntax { functions, calls }
}

#[test]
fn same_file_definition_wins_with_full_confidence() {
    let fx = Fixture::new(&[
        (
            "src/a.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("run", 1, 5), FunctionDecl::new("helper", 7, 9)],
                vec![CallExpr::new("helper", 2, 4)],
            ),
        ),
        ("src/b.ts", "typescript", file(vec![FunctionDecl::new("helper", 1, 3)], vec![])),
    ]);
    let edge = fx.edge("helper");
    assert_eq!(edge.status, ResolutionStatus::Resolved);
    assert_eq!(edge.rule, Some(ResolutionRule::SameScope));
    assert_eq!(edge.callee, Some(fx.id("src/a.ts", "helper")));
    assert_eq!(edge.confidence, 1.0);
    assert!(edge.candidates.is_empty());
}

#[test]
fn innermost_lexical_scope_is_preferred() {
    let fx = Fixture::new(&[(
        "svc.py",
        "python",
        file(
            vec![
                FunctionDecl::new("Service.run", 1, 5),
                FunctionDecl::new("Service.helper", 6, 8),
                FunctionDecl::new("helper", 10, 12),
            ],
            vec![CallExpr::new("self.helper", 2, 8), CallExpr::new("helper", 11, 4)],
        ),
    )]);
    let method_call = fx.edge("self.helper");
    assert_eq!(method_call.rule, Some(ResolutionRule::SameScope));
    assert_eq!(method_call.callee, Some(fx.id("svc.py", "Service.helper")));

    // From top level only the top-level definition is visible by scope.
    let top_call = fx.edge("helper");
    assert_eq!(top_call.callee, Some(fx.id("svc.py", "helper")));
}

#[test]
fn import_binding_picks_the_named_module() {
    let fx = Fixture::new(&[
        (
            "src/app.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("render", 1, 9)],
                vec![CallExpr::new("format", 3, 2).imported_from("./utils/strings")],
            ),
        ),
        ("src/utils/strings.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
        ("src/lib/dates.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
    ]);
    let edge = fx.edge("format");
    assert_eq!(edge.status, ResolutionStatus::Resolved);
    assert_eq!(edge.rule, Some(ResolutionRule::ImportBinding));
    assert_eq!(edge.callee, Some(fx.id("src/utils/strings.ts", "format")));
    assert_eq!(edge.confidence, 0.9);
}

#[test]
fn relative_import_binds_the_sibling_module() {
    let fx = Fixture::new(&[
        (
            "src/pages/home.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("render", 1, 9)],
                vec![CallExpr::new("format", 3, 2).imported_from("./utils")],
            ),
        ),
        ("src/pages/utils.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
        ("src/admin/utils.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
    ]);
    let edge = fx.edge("format");
    assert_eq!(edge.status, ResolutionStatus::Resolved);
    assert_eq!(edge.rule, Some(ResolutionRule::ImportBinding));
    assert_eq!(edge.callee, Some(fx.id("src/pages/utils.ts", "format")));
}

#[test]
fn relative_import_climbs_to_parent_directories() {
    let fx = Fixture::new(&[
        (
            "src/pages/home.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("render", 1, 9)],
                vec![CallExpr::new("format", 3, 2).imported_from("../admin/utils.js")],
            ),
        ),
        ("src/pages/utils.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
        ("src/admin/utils.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
        ("src/admin/index.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
    ]);
    assert_eq!(fx.edge("format").callee, Some(fx.id("src/admin/utils.ts", "format")));

    let fx = Fixture::new(&[
        (
            "src/pages/home.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("render", 1, 9)],
                vec![CallExpr::new("format", 3, 2).imported_from("../admin")],
            ),
        ),
        ("src/admin/index.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
        ("lib/admin.ts", "typescript", file(vec![FunctionDecl::new("format", 1, 4)], vec![])),
    ]);
    let edge = fx.edge("format");
    assert_eq!(edge.rule, Some(ResolutionRule::ImportBinding));
    assert_eq!(edge.callee, Some(fx.id("src/admin/index.ts", "format")));
}

#[test]
fn relative_import_never_binds_a_same_named_module_elsewhere() {
    let fx = Fixture::new(&[
        (
            "src/a.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("run", 1, 9)],
                vec![CallExpr::new("helper", 3, 2).imported_from("./b")],
            ),
        ),
        ("src/b.ts", "typescript", file(vec![FunctionDecl::new("other", 1, 4)], vec![])),
        ("vendor/b.ts", "typescript", file(vec![FunctionDecl::new("helper", 1, 4)], vec![])),
        ("src/c.ts", "typescript", file(vec![FunctionDecl::new("helper", 1, 4)], vec![])),
    ]);
    let edge = fx.edge("helper");
    assert_eq!(edge.status, ResolutionStatus::UnresolvedAmbiguous);
    assert_eq!(edge.rule, None);
    let mut expected = vec![fx.id("vendor/b.ts", "helper"), fx.id("src/c.ts", "helper")];
    expected.sort();
    assert_eq!(edge.candidates.to_vec(), expected);
}

#[test]
fn import_of_a_package_index_binds_its_directory() {
    let fx = Fixture::new(&[
        (
            "main.py",
            "python",
            file(
                vec![FunctionDecl::new("main", 1, 4)],
                vec![CallExpr::new("connect", 2, 0).imported_from("app.db")],
            ),
        ),
        ("app/db/__init__.py", "python", file(vec![FunctionDecl::new("connect", 1, 3)], vec![])),
        ("app/cache.py", "python", file(vec![FunctionDecl::new("connect", 1, 3)], vec![])),
    ]);
    let edge = fx.edge("connect");
    assert_eq!(edge.rule, Some(ResolutionRule::ImportBinding));
    assert_eq!(edge.callee, Some(fx.id("app/db/__init__.py", "connect")));
}

#[test]
fn single_global_candidate_resolves_uniquely() {
    let fx = Fixture::new(&[
        (
            "handlers.go",
            "go",
            file(vec![FunctionDecl::new("Handle", 1, 9)], vec![CallExpr::new("SendMail", 4, 2)]),
        ),
        ("mail/mailer.go", "go", file(vec![FunctionDecl::new("SendMail", 3, 20)], vec![])),
    ]);
    let edge = fx.edge("SendMail");
    assert_eq!(edge.rule, Some(ResolutionRule::UniqueName));
    assert_eq!(edge.confidence, 0.75);
    assert_eq!(edge.callee, Some(fx.id("mail/mailer.go", "SendMail")));
}

#[test]
fn several_candidates_are_ambiguous_and_kept_sorted() {
    let fx = Fixture::new(&[
        ("a.rb", "ruby", file(vec![FunctionDecl::new("go", 1, 3)], vec![CallExpr::new("save", 2, 0)])),
        ("b.rb", "ruby", file(vec![FunctionDecl::new("save", 1, 3)], vec![])),
        ("c.rb", "ruby", file(vec![FunctionDecl::new("save", 1, 3)], vec![])),
    ]);
    let edge = fx.edge("save");
    assert_eq!(edge.status, ResolutionStatus::UnresolvedAmbiguous);
    assert_eq!(edge.callee, None);
    assert_eq!(edge.confidence, 0.0);
    assert_eq!(edge.rule, None);

    let mut expected = vec![fx.id("b.rb", "save"), fx.id("c.rb", "save")];
    expected.sort();
    assert_eq!(edge.candidates.to_vec(), expected);
}

#[test]
fn unknown_name_is_external() {
    let fx = Fixture::new(&[(
        "a.js",
        "javascript",
        file(vec![FunctionDecl::new("main", 1, 3)], vec![CallExpr::new("console.log", 2, 0)]),
    )]);
    let edge = fx.edge("console.log");
    assert_eq!(edge.status, ResolutionStatus::UnresolvedExternal);
    assert_eq!(edge.callee, None);
    assert_eq!(edge.confidence, 0.0);
    assert!(edge.candidates.is_empty());
}

#[test]
fn same_file_tie_falls_through_to_global_rules() {
    let fx = Fixture::new(&[(
        "dup.ts",
        "typescript",
        file(
            vec![
                FunctionDecl::new("caller", 1, 3),
                FunctionDecl::new("helper", 5, 7),
                FunctionDecl::new("helper", 9, 11),
            ],
            vec![CallExpr::new("helper", 2, 0)],
        ),
    )]);
    let edge = fx.edge("helper");
    assert_eq!(edge.status, ResolutionStatus::UnresolvedAmbiguous);
    assert_eq!(edge.candidates.len(), 2);
}

#[test]
fn calls_do_not_cross_language_families() {
    let fx = Fixture::new(&[
        ("web/app.ts", "typescript", file(vec![FunctionDecl::new("boot", 1, 4)], vec![CallExpr::new("hash", 2, 0)])),
        ("tools/hash.py", "python", file(vec![FunctionDecl::new("hash", 1, 4)], vec![])),
        ("web/legacy.js", "javascript", file(vec![FunctionDecl::new("boot", 1, 4)], vec![CallExpr::new("hash", 3, 0)])),
    ]);
    for edge in fx.resolve() {
        assert_eq!(edge.status, ResolutionStatus::UnresolvedExternal);
    }

    // TypeScript and JavaScript do share a family.
    let fx = Fixture::new(&[
        ("web/app.ts", "typescript", file(vec![FunctionDecl::new("boot", 1, 4)], vec![CallExpr::new("hash", 2, 0)])),
        ("web/hash.js", "javascript", file(vec![FunctionDecl::new("hash", 1, 4)], vec![])),
    ]);
    assert_eq!(fx.edge("hash").rule, Some(ResolutionRule::UniqueName));
}

#[test]
fn qualifier_picks_a_same_file_scope() {
    let fx = Fixture::new(&[
        (
            "jobs.ts",
            "typescript",
            file(
                vec![
                    FunctionDecl::new("run", 1, 4),
                    FunctionDecl::new("Mailer.send", 6, 9),
                    FunctionDecl::new("Queue.send", 11, 14),
                ],
                vec![CallExpr::new("Mailer.send", 2, 0)],
            ),
        ),
        ("other.ts", "typescript", file(vec![FunctionDecl::new("Mailer.send", 1, 4)], vec![])),
    ]);
    let edge = fx.edge("Mailer.send");
    assert_eq!(edge.rule, Some(ResolutionRule::SameScope));
    assert_eq!(edge.callee, Some(fx.id("jobs.ts", "Mailer.send")));
}

#[test]
fn qualifier_does_not_make_a_shared_name_unique() {
    let fx = Fixture::new(&[
        (
            "jobs.ts",
            "typescript",
            file(vec![FunctionDecl::new("run", 1, 4)], vec![CallExpr::new("Mailer.send", 2, 0)]),
        ),
        ("mailer.ts", "typescript", file(vec![FunctionDecl::new("Mailer.send", 1, 4)], vec![])),
        ("queue.ts", "typescript", file(vec![FunctionDecl::new("Queue.send", 1, 4)], vec![])),
    ]);
    let edge = fx.edge("Mailer.send");
    assert_eq!(edge.status, ResolutionStatus::UnresolvedAmbiguous);
    assert_eq!(edge.rule, None);
    assert_eq!(edge.candidates.len(), 2);
}

#[test]
fn qualifier_narrows_import_bound_candidates() {
    let fx = Fixture::new(&[
        (
            "src/jobs.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("run", 1, 4)],
                vec![CallExpr::new("Mailer.send", 2, 0).imported_from("./mail")],
            ),
        ),
        (
            "src/mail.ts",
            "typescript",
            file(vec![FunctionDecl::new("Mailer.send", 1, 4), FunctionDecl::new("Digest.send", 6, 9)], vec![]),
        ),
    ]);
    let edge = fx.edge("Mailer.send");
    assert_eq!(edge.rule, Some(ResolutionRule::ImportBinding));
    assert_eq!(edge.callee, Some(fx.id("src/mail.ts", "Mailer.send")));
}

#[test]
fn qualifier_that_matches_nothing_does_not_discard_candidates() {
    let fx = Fixture::new(&[
        (
            "jobs.ts",
            "typescript",
            file(vec![FunctionDecl::new("run", 1, 4)], vec![CallExpr::new("client.send", 2, 0)]),
        ),
        ("mailer.ts", "typescript", file(vec![FunctionDecl::new("Mailer.send", 1, 4)], vec![])),
    ]);
    assert_eq!(fx.edge("client.send").rule, Some(ResolutionRule::UniqueName));
}

#[test]
fn module_level_calls_resolve_against_top_level_definitions() {
    let fx = Fixture::new(&[(
        "script.py",
        "python",
        file(
            vec![FunctionDecl::new("setup", 1, 3), FunctionDecl::new("Runner.setup", 5, 7)],
            vec![CallExpr::new("setup", 10, 0)],
        ),
    )]);
    let edge = fx.edge("setup");
    assert_eq!(edge.rule, Some(ResolutionRule::SameScope));
    assert_eq!(edge.callee, Some(fx.id("script.py", "setup")));
}

#[test]
fn confidences_come_from_config() {
    let config = ResolutionConfig {
        same_scope_confidence: Some(0.95),
        import_confidence: Some(0.8),
        unique_confidence: Some(0.5),
        low_resolution_warning: None,
    };
    let policy = ResolutionPolicy::from_config(&config);
    assert_eq!(policy.confidence(ResolutionRule::SameScope), 0.95);
    assert_eq!(policy.confidence(ResolutionRule::ImportBinding), 0.8);

    let fx = Fixture::new(&[
        ("a.go", "go", file(vec![FunctionDecl::new("A", 1, 3)], vec![CallExpr::new("B", 2, 0)])),
        ("b.go", "go", file(vec![FunctionDecl::new("B", 1, 3)], vec![])),
    ]);
    let edges = fx.resolve_with(policy);
    assert_eq!(edges[0].confidence, 0.5);
}

#[test]
fn resolution_ignores_input_order() {
    let files = vec![
        ("a.ts", "typescript", file(vec![FunctionDecl::new("a", 1, 5)], vec![CallExpr::new("b", 2, 0), CallExpr::new("c", 3, 0)])),
        ("b.ts", "typescript", file(vec![FunctionDecl::new("b", 1, 5)], vec![CallExpr::new("c", 2, 0)])),
        ("c.ts", "typescript", file(vec![FunctionDecl::new("c", 1, 5)], vec![])),
        ("d.ts", "typescript", file(vec![FunctionDecl::new("c", 1, 5)], vec![CallExpr::new("a", 2, 0)])),
    ];
    let forward = Fixture::new(&files);
    let mut reversed_files = files.clone();
    reversed_files.reverse();
    let reversed = Fixture::new(&reversed_files);

    let key = |fx: &Fixture| {
        let mut edges: Vec<_> = fx
            .resolve()
            .into_iter()
            .map(|e| (e.call_site.id, e.callee, e.status, e.candidates.to_vec()))
            .collect();
        edges.sort_by_key(|e| e.0);
        edges
    };
    assert_eq!(key(&forward), key(&reversed));
}

#[test]
fn unknown_caller_is_an_error() {
    let fx = Fixture::new(&[(
        "a.ts",
        "typescript",
        file(vec![FunctionDecl::new("a", 1, 5)], vec![CallExpr::new("b", 2, 0)]),
    )]);
    let resolver = CallResolver::new(&fx.index, &fx.interner, ResolutionPolicy::default());
    let err = resolver.resolve_all(&fx.sites, &FxHashMap::default()).unwrap_err();
    assert!(matches!(err, CallGraphError::UnknownFunction { .. }));
}

#[test]
fn diagnostics_report_rates_by_status_rule_and_language() {
    let fx = Fixture::new(&[
        (
            "a.ts",
            "typescript",
            file(
                vec![FunctionDecl::new("a", 1, 9), FunctionDecl::new("b", 10, 12)],
                vec![CallExpr::new("b", 2, 0), CallExpr::new("fetch", 3, 0), CallExpr::new("x", 4, 0)],
            ),
        ),
        ("x1.ts", "typescript", file(vec![FunctionDecl::new("x", 1, 2)], vec![])),
        ("x2.ts", "typescript", file(vec![FunctionDecl::new("x", 1, 2)], vec![])),
    ]);
    let mut diagnostics = ResolutionDiagnostics::new();
    for edge in fx.resolve() {
        diagnostics.record(&edge, Language::TypeScript);
    }
    assert_eq!(diagnostics.total_call_sites, 3);
    assert_eq!(diagnostics.count(ResolutionStatus::Resolved), 1);
    assert_eq!(diagnostics.count(ResolutionStatus::UnresolvedAmbiguous), 1);
    assert_eq!(diagnostics.count(ResolutionStatus::UnresolvedExternal), 1);
    assert!((diagnostics.resolution_rate() - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(diagnostics.by_rule.get("same_scope"), Some(&1));
    assert_eq!(diagnostics.by_language.get("typescript"), Some(&(1, 3)));

    assert_eq!(diagnostics.low_resolution_warnings(0.5).len(), 1);
    assert!(diagnostics.low_resolution_warnings(0.2).is_empty());
    assert_eq!(ResolutionDiagnostics::new().resolution_rate(), 0.0);
}
