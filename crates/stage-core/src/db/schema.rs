//! Canonical SQLite schema for the stage store.
//!
//! The layout follows the host CMS's relational shape:
//! - `items` holds one row per content item with its short status name
//! - `item_fields` is the key-value bag (keys non-unique, insertion order
//!   preserved by the autoincrement rowkey); the fork origin pointer lives
//!   here under a reserved key
//! - `item_terms` holds taxonomy associations keyed by taxonomy name
//! - `open_forks` is the storage-level guard enforcing the single open fork
//!   per source invariant
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type TEXT NOT NULL DEFAULT 'post' CHECK (length(trim(item_type)) > 0),
    status TEXT NOT NULL CHECK (status IN (
        'publish', 'private', 'draft', 'pending', 'trash',
        'stg-draft', 'stg-pending', 'stg-archived'
    )),
    parent_id INTEGER REFERENCES items(item_id) ON DELETE SET NULL,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    excerpt TEXT NOT NULL DEFAULT '',
    slug TEXT NOT NULL DEFAULT '',
    guid TEXT NOT NULL DEFAULT '',
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS item_fields (
    field_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    field_key TEXT NOT NULL CHECK (length(trim(field_key)) > 0),
    field_value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS item_terms (
    item_id INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    taxonomy TEXT NOT NULL CHECK (length(trim(taxonomy)) > 0),
    term TEXT NOT NULL CHECK (length(trim(term)) > 0),
    PRIMARY KEY (item_id, taxonomy, term)
);

CREATE TABLE IF NOT EXISTS open_forks (
    source_id INTEGER PRIMARY KEY REFERENCES items(item_id) ON DELETE CASCADE,
    fork_id INTEGER NOT NULL UNIQUE REFERENCES items(item_id) ON DELETE CASCADE,
    CHECK (source_id <> fork_id)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
"#;

/// Migration v2: read-path indexes for the relationship queries.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_items_status_updated
    ON items(status, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_items_type_status
    ON items(item_type, status);

CREATE INDEX IF NOT EXISTS idx_item_fields_item
    ON item_fields(item_id, field_id);

CREATE INDEX IF NOT EXISTS idx_item_fields_key_value
    ON item_fields(field_key, field_value, item_id);

CREATE INDEX IF NOT EXISTS idx_item_terms_item
    ON item_terms(item_id, taxonomy);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the relationship index query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_items_status_updated",
    "idx_items_type_status",
    "idx_item_fields_item",
    "idx_item_fields_key_value",
    "idx_item_terms_item",
];
