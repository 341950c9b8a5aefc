//! Conversion between in-memory shards and their on-disk records.
//!
//! Records carry strings; shards carry interner handles. Loading a record
//! re-interns every name into the current run's interner.

use strand_core::constants::SHARD_FORMAT_VERSION;
use strand_core::errors::{ExtractError, StorageError};
use strand_core::types::{CallSiteId, FxHashSet, FunctionId, SymbolInterner};
use strand_storage::shards::{CallRow, FunctionRow};
use strand_storage::ShardRecord;

use super::types::{CallSite, FunctionRecord, Shard};
use crate::extractors::extractor_for;
use crate::language::Language;

pub fn to_record(shard: &Shard, interner: &SymbolInterner) -> ShardRecord {
    let file = interner.resolve(shard.file).to_string();
    if let Some(error) = &shard.error {
        return ShardRecord::failed(&file, &shard.language_tag, shard.content_hash, error.to_string());
    }

    let functions = shard
        .functions
        .iter()
        .map(|f| FunctionRow {
            id: f.id.value(),
            qualified_name: interner.resolve(f.qualified_name).to_string(),
            short_name: interner.resolve(f.short_name).to_string(),
            scope: f.scope.map(|s| interner.resolve(s).to_string()),
            start_line: f.start_line,
            end_line: f.end_line,
            visibility: f.visibility,
            is_entry_point: f.is_entry_point,
        })
        .collect();
    let calls = shard
        .calls
        .iter()
        .map(|c| CallRow {
            id: c.id.value(),
            caller: c.caller.value(),
            target: interner.resolve(c.target).to_string(),
            imported_scope: c.imported_scope.map(|s| interner.resolve(s).to_string()),
            line: c.line,
            column: c.column,
        })
        .collect();

    ShardRecord {
        format_version: SHARD_FORMAT_VERSION,
        file,
        language: shard.language_tag.clone(),
        content_hash: shard.content_hash,
        functions,
        calls,
        error: None,
    }
}

pub fn from_record(record: &ShardRecord, interner: &SymbolInterner) -> Result<Shard, StorageError> {
    let file = interner.intern_path(&record.file);
    let language = Language::from_tag(&record.language);
    let corrupt = |message: String| StorageError::CorruptShard {
        path: record.file.clone(),
        message,
    };

    if let Some(message) = &record.error {
        return Ok(Shard {
            file,
            language,
            language_tag: record.language.clone(),
            content_hash: record.content_hash,
            functions: Vec::new(),
            calls: Vec::new(),
            error: Some(ExtractError::Malformed {
                path: record.file.clone(),
                message: message.clone(),
            }),
        });
    }

    let (language, extractor) = match language.and_then(|l| extractor_for(l).map(|e| (l, e))) {
        Some(pair) => pair,
        None if record.functions.is_empty() && record.calls.is_empty() => {
            return Ok(Shard {
                file,
                language,
                language_tag: record.language.clone(),
                content_hash: record.content_hash,
                functions: Vec::new(),
                calls: Vec::new(),
                error: None,
            });
        }
        None => return Err(corrupt(format!("no extractor for language `{}`", record.language))),
    };

    let functions: Vec<FunctionRecord> = record
        .functions
        .iter()
        .map(|row| FunctionRecord {
            id: FunctionId(row.id),
            qualified_name: interner.intern(&row.qualified_name),
            short_name: interner.intern(&row.short_name),
            scope: row.scope.as_deref().map(|s| interner.intern(s)),
            file,
            language,
            start_line: row.start_line,
            end_line: row.end_line,
            visibility: row.visibility,
            is_entry_point: row.is_entry_point,
        })
        .collect();

    let known: FxHashSet<FunctionId> = functions.iter().map(|f| f.id).collect();
    let mut calls = Vec::with_capacity(record.calls.len());
    for row in &record.calls {
        let caller = FunctionId(row.caller);
        if !known.contains(&caller) {
            return Err(corrupt(format!("call {:016x} has unknown caller {caller}", row.id)));
        }
        let (qualifier, short) = extractor.split_target(&row.target);
        calls.push(CallSite {
            id: CallSiteId(row.id),
            caller,
            target: interner.intern(&row.target),
            short_name: interner.intern(short),
            qualifier: qualifier.map(|q| interner.intern(q)),
            imported_scope: row.imported_scope.as_deref().map(|s| interner.intern(s)),
            line: row.line,
            column: row.column,
        });
    }

    Ok(Shard {
        file,
        language: Some(language),
        language_tag: record.language.clone(),
        content_hash: record.content_hash,
        functions,
        calls,
        error: None,
    })
}
