//! SQL schema for the Mull SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schedules (
    user_id                  TEXT NOT NULL,
    content_id               TEXT NOT NULL,
    interval_index           INTEGER NOT NULL DEFAULT 0 CHECK (interval_index >= 0),
    next_review_date         TEXT NOT NULL,   -- ISO 8601 UTC
    initial_review_completed INTEGER NOT NULL DEFAULT 0,
    is_active                INTEGER NOT NULL DEFAULT 1,
    category                 TEXT,            -- denormalised from the owning content
    created_at               TEXT NOT NULL,
    PRIMARY KEY (user_id, content_id)
);

-- Review outcomes are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS review_outcomes (
    outcome_id      TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    content_id      TEXT NOT NULL,
    result          TEXT NOT NULL,   -- 'remembered' | 'partial' | 'forgot'
    review_date     TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    time_spent_secs INTEGER,
    notes           TEXT
);

-- Composite index backing the due-selection predicate, plus a partial index
-- for rows that have never completed their initial review.
CREATE INDEX IF NOT EXISTS schedules_due_idx
    ON schedules(user_id, is_active, next_review_date);
CREATE INDEX IF NOT EXISTS schedules_initial_idx
    ON schedules(user_id) WHERE initial_review_completed = 0;

CREATE INDEX IF NOT EXISTS outcomes_pair_idx
    ON review_outcomes(user_id, content_id, review_date);

PRAGMA user_version = 1;
";
