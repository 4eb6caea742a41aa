//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed nine-digit fraction so that
//! text order matches time order and values round-trip exactly. Dates are
//! `YYYY-MM-DD`. UUIDs are hyphenated lowercase strings. Enums use their
//! canonical `strum` names.

use std::str::FromStr;

use aula_core::{
  attendance::AttendanceRecord,
  audit::{AuditAction, AuditEntry, EntityKind},
  grade::{Grade, Slot},
  school::{Course, Note, Student, Subject},
  staff::{Role, Staff},
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current time, truncated to what [`encode_dt`] can represent.
pub fn now() -> DateTime<Utc> {
  let now = Utc::now();
  decode_dt(&encode_dt(now)).unwrap_or(now)
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode { kind, value: s.to_owned() })
}

/// Lowercased lookup key for case-insensitive uniqueness.
pub fn fold_key(parts: &[&str]) -> String {
  parts.iter().map(|p| p.to_lowercase()).collect::<Vec<_>>().join("\u{1f}")
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const STAFF_COLUMNS: &str = "staff_id, username, full_name, national_id, role, is_superuser, \
                                 password_hash, created_at";

pub struct RawStaff {
  pub staff_id:      String,
  pub username:      String,
  pub full_name:     String,
  pub national_id:   Option<String>,
  pub role:          String,
  pub is_superuser:  bool,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawStaff {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      staff_id:      row.get(0)?,
      username:      row.get(1)?,
      full_name:     row.get(2)?,
      national_id:   row.get(3)?,
      role:          row.get(4)?,
      is_superuser:  row.get(5)?,
      password_hash: row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_staff(self) -> Result<Staff> {
    Ok(Staff {
      staff_id:      decode_uuid(&self.staff_id)?,
      username:      self.username,
      full_name:     self.full_name,
      national_id:   self.national_id,
      role:          decode_enum::<Role>("role", &self.role)?,
      is_superuser:  self.is_superuser,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const COURSE_COLUMNS: &str = "course_id, year, name, room, lead_teacher, created_at";

pub struct RawCourse {
  pub course_id:    String,
  pub year:         String,
  pub name:         String,
  pub room:         String,
  pub lead_teacher: Option<String>,
  pub created_at:   String,
}

impl RawCourse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id:    row.get(0)?,
      year:         row.get(1)?,
      name:         row.get(2)?,
      room:         row.get(3)?,
      lead_teacher: row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:    decode_uuid(&self.course_id)?,
      year:         self.year,
      name:         self.name,
      room:         self.room,
      lead_teacher: decode_opt_uuid(self.lead_teacher)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const SUBJECT_COLUMNS: &str = "subject_id, course_id, teacher_id, name, description, created_at";

pub struct RawSubject {
  pub subject_id:  String,
  pub course_id:   String,
  pub teacher_id:  String,
  pub name:        String,
  pub description: String,
  pub created_at:  String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:  row.get(0)?,
      course_id:   row.get(1)?,
      teacher_id:  row.get(2)?,
      name:        row.get(3)?,
      description: row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id:  decode_uuid(&self.subject_id)?,
      course_id:   decode_uuid(&self.course_id)?,
      teacher_id:  decode_uuid(&self.teacher_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const STUDENT_COLUMNS: &str = "student_id, national_id, given_names, family_names, birth_date, \
                                   emergency_contact, course_id, created_at";

pub struct RawStudent {
  pub student_id:        String,
  pub national_id:       String,
  pub given_names:       String,
  pub family_names:      String,
  pub birth_date:        Option<String>,
  pub emergency_contact: Option<String>,
  pub course_id:         Option<String>,
  pub created_at:        String,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:        row.get(0)?,
      national_id:       row.get(1)?,
      given_names:       row.get(2)?,
      family_names:      row.get(3)?,
      birth_date:        row.get(4)?,
      emergency_contact: row.get(5)?,
      course_id:         row.get(6)?,
      created_at:        row.get(7)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:        decode_uuid(&self.student_id)?,
      national_id:       self.national_id,
      given_names:       self.given_names,
      family_names:      self.family_names,
      birth_date:        self.birth_date.as_deref().map(decode_date).transpose()?,
      emergency_contact: self.emergency_contact,
      course_id:         decode_opt_uuid(self.course_id)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub const GRADE_COLUMNS: &str =
  "grade_id, student_id, subject_id, slot, value, recorded_by, created_at, updated_at";

pub struct RawGrade {
  pub grade_id:    String,
  pub student_id:  String,
  pub subject_id:  String,
  pub slot:        u8,
  pub value:       f64,
  pub recorded_by: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawGrade {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      grade_id:    row.get(0)?,
      student_id:  row.get(1)?,
      subject_id:  row.get(2)?,
      slot:        row.get(3)?,
      value:       row.get(4)?,
      recorded_by: row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_grade(self) -> Result<Grade> {
    Ok(Grade {
      grade_id:    decode_uuid(&self.grade_id)?,
      student_id:  decode_uuid(&self.student_id)?,
      subject_id:  decode_uuid(&self.subject_id)?,
      slot:        Slot::new(self.slot)?,
      value:       self.value,
      recorded_by: decode_uuid(&self.recorded_by)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const ATTENDANCE_COLUMNS: &str = "record_id, student_id, course_id, date, status, updated_at";

pub struct RawAttendance {
  pub record_id:  String,
  pub student_id: String,
  pub course_id:  String,
  pub date:       String,
  pub status:     String,
  pub updated_at: String,
}

impl RawAttendance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:  row.get(0)?,
      student_id: row.get(1)?,
      course_id:  row.get(2)?,
      date:       row.get(3)?,
      status:     row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:  decode_uuid(&self.record_id)?,
      student_id: decode_uuid(&self.student_id)?,
      course_id:  decode_uuid(&self.course_id)?,
      date:       decode_date(&self.date)?,
      status:     self.status,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const NOTE_COLUMNS: &str = "note_id, student_id, author_id, text, created_at";

pub struct RawNote {
  pub note_id:    String,
  pub student_id: String,
  pub author_id:  String,
  pub text:       String,
  pub created_at: String,
}

impl RawNote {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      note_id:    row.get(0)?,
      student_id: row.get(1)?,
      author_id:  row.get(2)?,
      text:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_note(self) -> Result<Note> {
    Ok(Note {
      note_id:    decode_uuid(&self.note_id)?,
      student_id: decode_uuid(&self.student_id)?,
      author_id:  decode_uuid(&self.author_id)?,
      text:       self.text,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const AUDIT_COLUMNS: &str =
  "audit_id, actor_id, entity_kind, entity_id, entity_repr, action, summary, recorded_at";

pub struct RawAudit {
  pub audit_id:    String,
  pub actor_id:    String,
  pub entity_kind: String,
  pub entity_id:   Option<String>,
  pub entity_repr: String,
  pub action:      String,
  pub summary:     String,
  pub recorded_at: String,
}

impl RawAudit {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      audit_id:    row.get(0)?,
      actor_id:    row.get(1)?,
      entity_kind: row.get(2)?,
      entity_id:   row.get(3)?,
      entity_repr: row.get(4)?,
      action:      row.get(5)?,
      summary:     row.get(6)?,
      recorded_at: row.get(7)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      audit_id:    decode_uuid(&self.audit_id)?,
      actor_id:    decode_uuid(&self.actor_id)?,
      entity_kind: decode_enum::<EntityKind>("entity kind", &self.entity_kind)?,
      entity_id:   decode_opt_uuid(self.entity_id)?,
      entity_repr: self.entity_repr,
      action:      decode_enum::<AuditAction>("audit action", &self.action)?,
      summary:     self.summary,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let a = DateTime::parse_from_rfc3339("2025-03-01T10:00:00.5Z").unwrap().with_timezone(&Utc);
    let b = DateTime::parse_from_rfc3339("2025-03-01T10:00:00.123456789Z")
      .unwrap()
      .with_timezone(&Utc);
    assert!(encode_dt(b) < encode_dt(a));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn fold_key_ignores_case() {
    assert_eq!(fold_key(&["2025", "1° BÁSICO", "A"]), fold_key(&["2025", "1° básico", "a"]));
    assert_ne!(fold_key(&["ab", "c"]), fold_key(&["a", "bc"]));
  }

  #[test]
  fn roles_decode_from_canonical_names() {
    assert_eq!(decode_enum::<Role>("role", "coordinator").unwrap(), Role::Coordinator);
    assert!(decode_enum::<Role>("role", "janitor").is_err());
  }
}
