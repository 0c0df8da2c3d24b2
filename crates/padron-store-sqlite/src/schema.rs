//! SQL schema for the Padrón SQLite store.
//!
//! Executed once at connection startup. Tables are created with
//! `IF NOT EXISTS`, so reopening an existing file is a no-op.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per document. `fields` is the JSON object the client wrote;
-- id and timestamps live in their own columns and are never part of it.
CREATE TABLE IF NOT EXISTS documents (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, microseconds, 'Z'
    updated_at  TEXT NOT NULL,
    fields      TEXT NOT NULL,
    UNIQUE (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS documents_created_idx ON documents(collection, created_at);

CREATE TABLE IF NOT EXISTS accounts (
    uid            TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    display_name   TEXT,
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    disabled       INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);

-- Bearer tokens, stored as SHA-256 hex digests only.
CREATE TABLE IF NOT EXISTS auth_tokens (
    token_hash  TEXT PRIMARY KEY,
    uid         TEXT NOT NULL REFERENCES accounts(uid) ON DELETE CASCADE,
    created_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
