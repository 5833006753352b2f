//! SQL schema for the gemdex SQLite store.
//!
//! Unique indexes back the find-or-insert logic in `ops.rs`: inserts use
//! `ON CONFLICT` so two writers racing on the same package, version or edge
//! converge on one row even without the in-process coordinator.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS packages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    id                        INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id                INTEGER NOT NULL REFERENCES packages(id),
    number                    TEXT NOT NULL,
    platform                  TEXT NOT NULL,   -- index platform, not the spec's
    indexed                   INTEGER NOT NULL DEFAULT 1,
    prerelease                INTEGER NOT NULL DEFAULT 0,
    full_name                 TEXT NOT NULL,
    required_ruby_version     TEXT NOT NULL DEFAULT '',
    required_rubygems_version TEXT NOT NULL DEFAULT '',
    checksum                  TEXT,
    info_checksum             TEXT,
    created_at                TEXT NOT NULL    -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS dependencies (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id    INTEGER NOT NULL REFERENCES versions(id),
    package_id    INTEGER NOT NULL REFERENCES packages(id),
    requirements  TEXT NOT NULL,
    scope         TEXT NOT NULL    -- 'runtime' | 'development'
);

-- Digests owned by the index-serving layer. Only ever cleared here.
CREATE TABLE IF NOT EXISTS checksums (
    name    TEXT PRIMARY KEY,
    digest  TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS packages_name_idx     ON packages(name);
CREATE UNIQUE INDEX IF NOT EXISTS versions_lookup_idx   ON versions(package_id, number, platform);
CREATE UNIQUE INDEX IF NOT EXISTS dependencies_edge_idx ON dependencies(version_id, package_id);

PRAGMA user_version = 1;
";
