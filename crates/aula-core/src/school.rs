//! Courses, subjects, students and behavioural notes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Course ──────────────────────────────────────────────────────────────────

/// A year-grouped cohort. `(year, name, room)` is unique, compared
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
  pub course_id:    Uuid,
  pub year:         String,
  pub name:         String,
  pub room:         String,
  pub lead_teacher: Option<Uuid>,
  pub created_at:   DateTime<Utc>,
}

impl Course {
  /// Human-readable label, e.g. `"2025 1° Básico A (Sala 4)"`.
  pub fn label(&self) -> String { format!("{} {} ({})", self.year, self.name, self.room) }
}

/// Input to [`crate::store::SchoolStore::add_course`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
  pub year:         String,
  pub name:         String,
  pub room:         String,
  pub lead_teacher: Option<Uuid>,
}

impl NewCourse {
  /// Trim every field and reject blanks, non-numeric years, and rooms with
  /// characters other than letters, digits, spaces and hyphens.
  pub fn normalized(self) -> Result<Self> {
    let CourseEdit { year, name, room } =
      CourseEdit { year: self.year, name: self.name, room: self.room }.normalized()?;
    Ok(Self { year, name, room, lead_teacher: self.lead_teacher })
  }
}

/// Replacement identity for an existing course. The lead teacher is changed
/// separately.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseEdit {
  pub year: String,
  pub name: String,
  pub room: String,
}

impl CourseEdit {
  /// Same rules as [`NewCourse::normalized`].
  pub fn normalized(self) -> Result<Self> {
    let year = self.year.trim().to_owned();
    let name = self.name.trim().to_owned();
    let room = self.room.trim().to_owned();

    if year.is_empty() || name.is_empty() || room.is_empty() {
      return Err(Error::Invalid("year, name and room must not be blank".into()));
    }
    if !year.chars().all(|c| c.is_ascii_digit()) {
      return Err(Error::Invalid(format!("year must be numeric: {year:?}")));
    }
    if !room.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '-') {
      return Err(Error::Invalid(format!("room contains invalid characters: {room:?}")));
    }

    Ok(Self { year, name, room })
  }
}

/// Sort key that lists "Básico" levels before "Medio" ones, each in numeric
/// order, and everything else last.
pub fn grade_level_key(name: &str) -> (u8, u32, String) {
  let lower = name.to_lowercase();
  let tier = if lower.contains("básico") || lower.contains("basico") {
    0
  } else if lower.contains("medio") {
    1
  } else {
    2
  };
  let number = lower
    .chars()
    .skip_while(|c| !c.is_ascii_digit())
    .take_while(char::is_ascii_digit)
    .collect::<String>()
    .parse()
    .unwrap_or(99);
  (tier, number, lower)
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// A subject taught in exactly one course by exactly one teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id:  Uuid,
  pub course_id:   Uuid,
  pub teacher_id:  Uuid,
  pub name:        String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
  pub course_id:   Uuid,
  pub teacher_id:  Uuid,
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

impl NewSubject {
  pub fn normalized(self) -> Result<Self> {
    Ok(Self { name: normalize_subject_name(&self.name)?, ..self })
  }
}

/// New name and description for a subject. Course and teacher are not part
/// of an edit.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectEdit {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

impl SubjectEdit {
  pub fn normalized(self) -> Result<Self> {
    Ok(Self { name: normalize_subject_name(&self.name)?, ..self })
  }
}

fn normalize_subject_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  if name.is_empty() {
    return Err(Error::Invalid("subject name must not be blank".into()));
  }
  Ok(name.to_owned())
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id:        Uuid,
  /// Chilean RUT, e.g. `12.345.678-9`.
  pub national_id:       String,
  pub given_names:       String,
  pub family_names:      String,
  pub birth_date:        Option<NaiveDate>,
  pub emergency_contact: Option<String>,
  pub course_id:         Option<Uuid>,
  pub created_at:        DateTime<Utc>,
}

impl Student {
  /// `"Family, Given"` as printed on class lists.
  pub fn list_name(&self) -> String { format!("{}, {}", self.family_names, self.given_names) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
  pub national_id:       String,
  pub given_names:       String,
  pub family_names:      String,
  pub birth_date:        Option<NaiveDate>,
  pub emergency_contact: Option<String>,
  pub course_id:         Option<Uuid>,
}

impl NewStudent {
  pub fn normalized(self) -> Result<Self> {
    let (national_id, given_names, family_names) =
      normalize_identity(&self.national_id, &self.given_names, &self.family_names)?;
    Ok(Self { national_id, given_names, family_names, ..self })
  }
}

/// Replacement personal data for a student. Course placement goes through
/// [`crate::store::SchoolStore::assign_student_course`].
#[derive(Debug, Clone, Deserialize)]
pub struct StudentEdit {
  pub national_id:       String,
  pub given_names:       String,
  pub family_names:      String,
  pub birth_date:        Option<NaiveDate>,
  pub emergency_contact: Option<String>,
}

impl StudentEdit {
  pub fn normalized(self) -> Result<Self> {
    let (national_id, given_names, family_names) =
      normalize_identity(&self.national_id, &self.given_names, &self.family_names)?;
    Ok(Self { national_id, given_names, family_names, ..self })
  }
}

fn normalize_identity(
  national_id: &str,
  given_names: &str,
  family_names: &str,
) -> Result<(String, String, String)> {
  let national_id = national_id.trim().to_owned();
  if !is_valid_rut(&national_id) {
    return Err(Error::Invalid(format!(
      "national id must look like 12.345.678-9 or 12345678-9: {national_id:?}"
    )));
  }
  let given_names = given_names.trim().to_owned();
  let family_names = family_names.trim().to_owned();
  if given_names.is_empty() || family_names.is_empty() {
    return Err(Error::Invalid("student names must not be blank".into()));
  }
  Ok((national_id, given_names, family_names))
}

/// Format check for a RUT: 7–8 body digits (optionally grouped with dots),
/// a hyphen, and a check character `0-9`/`k`/`K`. The check digit itself is
/// not verified.
pub fn is_valid_rut(s: &str) -> bool {
  let Some((body, check)) = s.rsplit_once('-') else {
    return false;
  };
  let mut check_chars = check.chars();
  let valid_check = matches!(
    (check_chars.next(), check_chars.next()),
    (Some(c), None) if c.is_ascii_digit() || c == 'k' || c == 'K'
  );
  if !valid_check {
    return false;
  }

  let digits: String = body.chars().filter(|c| *c != '.').collect();
  if digits.len() < 7 || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
    return false;
  }
  if body.contains('.') {
    // Grouped form must be exactly `d{1,2}.ddd.ddd`.
    let groups: Vec<&str> = body.split('.').collect();
    return groups.len() == 3
      && (1..=2).contains(&groups[0].len())
      && groups[1].len() == 3
      && groups[2].len() == 3;
  }
  true
}

// ─── Note ────────────────────────────────────────────────────────────────────

/// A behavioural annotation ("anotación") written by a staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
  pub note_id:    Uuid,
  pub student_id: Uuid,
  pub author_id:  Uuid,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
  pub student_id: Uuid,
  pub author_id:  Uuid,
  pub text:       String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rut_formats() {
    assert!(is_valid_rut("12.345.678-9"));
    assert!(is_valid_rut("12345678-K"));
    assert!(is_valid_rut("9.876.543-k"));
    assert!(is_valid_rut("9876543-0"));
    assert!(!is_valid_rut("12345678"));
    assert!(!is_valid_rut("12.34.5678-9"));
    assert!(!is_valid_rut("12345678-X"));
    assert!(!is_valid_rut("123-4"));
  }

  #[test]
  fn course_rejects_blank_fields() {
    let input = NewCourse {
      year:         "2025".into(),
      name:         "  ".into(),
      room:         "A-1".into(),
      lead_teacher: None,
    };
    assert!(matches!(input.normalized(), Err(Error::Invalid(_))));
  }

  #[test]
  fn course_trims_fields() {
    let input = NewCourse {
      year:         " 2025 ".into(),
      name:         " 1° Básico ".into(),
      room:         "Sala 4".into(),
      lead_teacher: None,
    };
    let course = input.normalized().unwrap();
    assert_eq!(course.year, "2025");
    assert_eq!(course.name, "1° Básico");
  }

  #[test]
  fn edits_follow_the_creation_rules() {
    let course = CourseEdit { year: "25a".into(), name: "1° Medio".into(), room: "B".into() };
    assert!(matches!(course.normalized(), Err(Error::Invalid(_))));

    let subject = SubjectEdit { name: "  Música ".into(), description: String::new() };
    assert_eq!(subject.normalized().unwrap().name, "Música");

    let student = StudentEdit {
      national_id:       " 9.876.543-k ".into(),
      given_names:       "Luis".into(),
      family_names:      " ".into(),
      birth_date:        None,
      emergency_contact: None,
    };
    assert!(matches!(student.clone().normalized(), Err(Error::Invalid(_))));
    let fixed = StudentEdit { family_names: "Soto".into(), ..student }.normalized().unwrap();
    assert_eq!(fixed.national_id, "9.876.543-k");
  }

  #[test]
  fn basico_sorts_before_medio() {
    let mut names = vec!["2° Medio", "8° Básico", "1° Basico", "Taller"];
    names.sort_by_key(|n| grade_level_key(n));
    assert_eq!(names, vec!["1° Basico", "8° Básico", "2° Medio", "Taller"]);
  }
}
