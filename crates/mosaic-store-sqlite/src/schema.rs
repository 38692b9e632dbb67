//! SQL schema for the Mosaic SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Exact-match lookup rows; one per (domain, raw_value).
-- Updates go through the explicit update path, never a second insert.
CREATE TABLE IF NOT EXISTS lookup_entries (
    domain        TEXT NOT NULL,
    raw_value     TEXT NOT NULL,   -- stored normalized (trimmed, case-folded)
    matched_value TEXT NOT NULL,
    PRIMARY KEY (domain, raw_value)
);

-- Ordered fallback pattern rules; first matching position wins.
CREATE TABLE IF NOT EXISTS fallback_rules (
    domain        TEXT NOT NULL,
    position      INTEGER NOT NULL,
    pattern       TEXT NOT NULL,   -- regex source text
    matched_value TEXT NOT NULL,
    PRIMARY KEY (domain, position)
);

-- One row per (entity, domain, source); updated in place by the conditional
-- upsert. matched_value never goes non-null -> null.
CREATE TABLE IF NOT EXISTS source_facts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_key    TEXT NOT NULL,
    domain        TEXT NOT NULL,
    source        TEXT NOT NULL,
    raw_value     TEXT NOT NULL,
    matched_value TEXT,
    captured_at   TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    UNIQUE (entity_key, domain, source)
);

-- Append-only stints. start_date may be NULL (excluded from temporal scans);
-- SQLite treats NULLs as distinct in the UNIQUE constraint, which is fine
-- because undated rows never feed detection.
CREATE TABLE IF NOT EXISTS work_history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_key  TEXT NOT NULL,
    company_key TEXT NOT NULL,
    title       TEXT NOT NULL,
    start_date  TEXT,              -- ISO 8601 calendar date
    end_date    TEXT,              -- NULL = ongoing
    source      TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE (entity_key, company_key, start_date, source)
);

-- Derived events, deduplicated on the full natural key so rescans are
-- idempotent.
CREATE TABLE IF NOT EXISTS promotion_events (
    entity_key     TEXT NOT NULL,
    company_key    TEXT NOT NULL,
    previous_title TEXT NOT NULL,
    new_title      TEXT NOT NULL,
    promotion_date TEXT NOT NULL,
    detected_at    TEXT NOT NULL,
    UNIQUE (entity_key, company_key, previous_title, new_title, promotion_date)
);

CREATE INDEX IF NOT EXISTS source_facts_entity_idx
    ON source_facts(entity_key, domain);
CREATE INDEX IF NOT EXISTS work_history_entity_idx
    ON work_history(entity_key);
CREATE INDEX IF NOT EXISTS promotion_events_entity_idx
    ON promotion_events(entity_key);

PRAGMA user_version = 1;
";
