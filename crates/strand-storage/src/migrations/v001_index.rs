//! Resolution index tables.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS index_entries (
    function_id INTEGER PRIMARY KEY,
    short_name TEXT NOT NULL,
    file TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    scope TEXT,
    visibility TEXT NOT NULL,
    language TEXT NOT NULL,
    start_line INTEGER NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_index_entries_short_name ON index_entries(short_name);
CREATE INDEX IF NOT EXISTS idx_index_entries_file ON index_entries(file);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
) WITHOUT ROWID;
";
