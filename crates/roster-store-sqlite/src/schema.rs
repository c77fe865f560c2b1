//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The implicit rowid records insertion order and breaks sort ties.
CREATE TABLE IF NOT EXISTS students (
    id              TEXT PRIMARY KEY,
    student_code    TEXT,            -- upper-cased; NULL when absent
    student_number  TEXT,
    photo           TEXT,            -- JSON-encoded PhotoRef or NULL
    first_name      TEXT NOT NULL CHECK (first_name <> ''),
    last_name       TEXT NOT NULL CHECK (last_name <> ''),
    sex             TEXT NOT NULL CHECK (sex IN ('M', 'F', 'O')),
    date_of_birth   TEXT NOT NULL,   -- YYYY-MM-DD
    level           TEXT NOT NULL,   -- code from the configured level set
    room            TEXT NOT NULL,   -- code from the configured room set
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC, fixed microsecond width
    updated_at      TEXT NOT NULL,
    CHECK (created_at <= updated_at)
);

CREATE UNIQUE INDEX IF NOT EXISTS students_code_idx   ON students(student_code);
CREATE UNIQUE INDEX IF NOT EXISTS students_number_idx ON students(student_number);
CREATE INDEX IF NOT EXISTS students_level_idx   ON students(level);
CREATE INDEX IF NOT EXISTS students_room_idx    ON students(room);
CREATE INDEX IF NOT EXISTS students_name_idx    ON students(last_name, first_name);
CREATE INDEX IF NOT EXISTS students_created_idx ON students(created_at);

-- Scores are derived from the answers on read and never stored.
CREATE TABLE IF NOT EXISTS assessments (
    id              TEXT PRIMARY KEY,
    student_id      TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    questionnaire   TEXT NOT NULL,   -- kebab-case Questionnaire name
    answers         TEXT NOT NULL,   -- JSON array, question 1 first
    taken_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS assessments_student_idx ON assessments(student_id, taken_at);

PRAGMA user_version = 2;
";
