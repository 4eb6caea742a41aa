//! SQL schema for the AulaClass SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `*_key` columns hold lowercased copies used for case-insensitive
/// uniqueness (SQLite's NOCASE only folds ASCII).
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS staff (
    staff_id      TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    full_name     TEXT NOT NULL,
    national_id   TEXT,
    role          TEXT NOT NULL,   -- 'teacher' | 'coordinator' | 'inspector' | 'admin'
    is_superuser  INTEGER NOT NULL DEFAULT 0,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    course_id    TEXT PRIMARY KEY,
    year         TEXT NOT NULL,
    name         TEXT NOT NULL,
    room         TEXT NOT NULL,
    course_key   TEXT NOT NULL UNIQUE,   -- lower(year, name, room)
    lead_teacher TEXT REFERENCES staff(staff_id) ON DELETE SET NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    course_id   TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    teacher_id  TEXT NOT NULL REFERENCES staff(staff_id),
    name        TEXT NOT NULL,
    name_key    TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    UNIQUE (course_id, name_key)
);

CREATE TABLE IF NOT EXISTS students (
    student_id        TEXT PRIMARY KEY,
    national_id       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    given_names       TEXT NOT NULL,
    family_names      TEXT NOT NULL,
    birth_date        TEXT,            -- YYYY-MM-DD
    emergency_contact TEXT,
    course_id         TEXT REFERENCES courses(course_id) ON DELETE SET NULL,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grades (
    grade_id    TEXT PRIMARY KEY,
    student_id  TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id) ON DELETE CASCADE,
    slot        INTEGER NOT NULL CHECK (slot BETWEEN 1 AND 10),
    value       REAL NOT NULL CHECK (value BETWEEN 1.0 AND 7.0),
    recorded_by TEXT NOT NULL REFERENCES staff(staff_id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (student_id, subject_id, slot)
);

-- Status text is stored verbatim; unrecognised values are filtered on read.
CREATE TABLE IF NOT EXISTS attendance (
    record_id  TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    course_id  TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    date       TEXT NOT NULL,
    status     TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (student_id, course_id, date)
);

CREATE TABLE IF NOT EXISTS notes (
    note_id    TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    author_id  TEXT NOT NULL REFERENCES staff(staff_id),
    text       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- No foreign keys: entries outlive the records they describe.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id    TEXT PRIMARY KEY,
    actor_id    TEXT NOT NULL,
    entity_kind TEXT NOT NULL,
    entity_id   TEXT,
    entity_repr TEXT NOT NULL,
    action      TEXT NOT NULL,   -- 'create' | 'update' | 'delete'
    summary     TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS grades_subject_idx     ON grades(subject_id);
CREATE INDEX IF NOT EXISTS attendance_course_idx  ON attendance(course_id, date);
CREATE INDEX IF NOT EXISTS students_course_idx    ON students(course_id);
CREATE INDEX IF NOT EXISTS notes_student_idx      ON notes(student_id);
CREATE INDEX IF NOT EXISTS audit_recorded_idx     ON audit_log(recorded_at);

PRAGMA user_version = 1;
";
