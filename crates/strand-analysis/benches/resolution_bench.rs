//! Resolution benchmarks: resident vs spilled index, full build vs update.
//!
//! Run with: cargo bench -p strand-analysis --bench resolution_bench

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use strand_analysis::call_graph::index::{ResolutionIndex, SpillTarget};
use strand_analysis::call_graph::resolution::{CallResolver, ResolutionPolicy};
use strand_analysis::extractors::extract_file;
use strand_analysis::syntax::{CallExpr, FileDescriptor, FileSyntax, FunctionDecl, MemoryProvider};
use strand_analysis::CallGraphSession;
use strand_core::config::{IndexConfig, StrandConfig};
use strand_core::types::{FxHashMap, SymbolInterner};
use tempfile::TempDir;

/// N files of ten functions each. Every function calls two neighbours in
/// the next file, one of them through an import.
fn synthetic(files: usize) -> Vec<(FileDescriptor, FileSyntax)> {
    (0..files)
        .map(|i| {
            let next = (i + 1) % files;
            let functions = (0..10)
                .map(|j| FunctionDecl::new(format!("fn_{i}_{j}"), j * 10 + 1, j * 10 + 9))
                .collect();
            let calls = (0..10)
                .flat_map(|j| {
                    [
                        CallExpr::new(format!("fn_{next}_{j}"), j * 10 + 2, 4),
                        CallExpr::new(format!("fn_{next}_{}", (j + 1) % 10), j * 10 + 3, 4)
                            .imported_from(format!("./f{next}")),
                    ]
                })
                .collect();
            (
                FileDescriptor::new(format!("src/f{i}.ts"), "typescript", i as u64),
                FileSyntax { functions, calls },
            )
        })
        .collect()
}

fn resolve_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_all");
    group.sample_size(10);

    for size in [100, 1000] {
        let input = synthetic(size);
        for (label, budget) in [("resident", None), ("spilled", Some(1))] {
            let interner = Arc::new(SymbolInterner::new());
            let config = IndexConfig {
                memory_budget_bytes: budget,
                ..IndexConfig::default()
            };
            let mut index = ResolutionIndex::new(Arc::clone(&interner), &config, SpillTarget::Scratch);
            let mut functions = FxHashMap::default();
            let mut sites = Vec::new();
            for (descriptor, syntax) in &input {
                let shard = extract_file(descriptor, syntax, &interner);
                index.absorb(&shard).unwrap();
                functions.extend(shard.functions.iter().map(|f| (f.id, *f)));
                sites.extend(shard.calls.iter().copied());
            }

            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| {
                    CallResolver::new(&index, &interner, ResolutionPolicy::default())
                        .resolve_all(&sites, &functions)
                        .unwrap()
                });
            });
        }
    }
    group.finish();
}

fn build_vs_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.sample_size(10);

    let mut provider = MemoryProvider::new();
    for (descriptor, syntax) in synthetic(500) {
        provider.insert(descriptor, syntax);
    }

    group.bench_function("cold_build_500", |b| {
        b.iter(|| {
            let dir = TempDir::new().unwrap();
            let mut session = CallGraphSession::open(dir.path(), StrandConfig::default()).unwrap();
            session.build(&provider).unwrap();
        });
    });

    let dir = TempDir::new().unwrap();
    let mut session = CallGraphSession::open(dir.path(), StrandConfig::default()).unwrap();
    session.build(&provider).unwrap();
    let mut edited = provider.clone();
    let (descriptor, mut syntax) = synthetic(500).swap_remove(7);
    syntax.functions.push(FunctionDecl::new("extra", 200, 201));
    edited.insert(FileDescriptor::new(descriptor.path, "typescript", u64::MAX), syntax);

    group.bench_function("update_one_file_500", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let input = if flip { &edited } else { &provider };
            session.update(input).unwrap();
        });
    });
    group.finish();
}

criterion_group!(benches, resolve_index, build_vs_update);
criterion_main!(benches);
