//! Grades and the ten-slot gradebook aggregation.
//!
//! Every (student, subject) pair owns up to [`SLOT_COUNT`] grades, one per
//! numbered slot. Averages are computed over the slots that hold a value and
//! rounded with [`round_display`]; empty slots never count as zero.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  rounding::round_display,
  school::{Student, Subject},
};

/// Number of evaluation slots per student and subject.
pub const SLOT_COUNT: usize = 10;

/// Lowest grade on the Chilean 1.0–7.0 scale.
pub const MIN_GRADE: f64 = 1.0;
/// Highest grade on the Chilean 1.0–7.0 scale.
pub const MAX_GRADE: f64 = 7.0;
/// Values below this are failing and flagged on reports.
pub const PASSING_GRADE: f64 = 4.0;

// ─── Slot ────────────────────────────────────────────────────────────────────

/// An evaluation number in `1..=10`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
  pub fn new(n: u8) -> Result<Self> {
    if (1..=SLOT_COUNT as u8).contains(&n) {
      Ok(Self(n))
    } else {
      Err(Error::InvalidSlot(n))
    }
  }

  pub fn get(self) -> u8 { self.0 }

  /// Zero-based position in a slot row.
  pub fn index(self) -> usize { usize::from(self.0) - 1 }

  /// All slots in order.
  pub fn all() -> impl Iterator<Item = Slot> { (1..=SLOT_COUNT as u8).map(Slot) }
}

impl TryFrom<u8> for Slot {
  type Error = Error;

  fn try_from(n: u8) -> Result<Self> { Self::new(n) }
}

impl From<Slot> for u8 {
  fn from(slot: Slot) -> u8 { slot.0 }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

// ─── Grade ───────────────────────────────────────────────────────────────────

/// A stored grade. `(student_id, subject_id, slot)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
  pub grade_id:    Uuid,
  pub student_id:  Uuid,
  pub subject_id:  Uuid,
  pub slot:        Slot,
  /// Always within `[MIN_GRADE, MAX_GRADE]` and already rounded.
  pub value:       f64,
  /// The staff member who last wrote this slot.
  pub recorded_by: Uuid,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::SchoolStore::upsert_grade`]. The store stamps
/// `updated_at` (and `created_at` on first write).
#[derive(Debug, Clone)]
pub struct GradeWrite {
  pub student_id:  Uuid,
  pub subject_id:  Uuid,
  pub slot:        Slot,
  pub value:       f64,
  pub recorded_by: Uuid,
}

/// Whether an upsert inserted a new row or overwrote an existing slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
  Created,
  Updated,
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// One value per slot; index `i` holds slot `i + 1`.
pub type SlotValues = [Option<f64>; SLOT_COUNT];

pub fn is_failing(value: f64) -> bool { value < PASSING_GRADE }

/// Lay out the grades of one (student, subject) pair by slot.
///
/// The caller passes grades for a single pair; if duplicates were to appear
/// the last one wins.
pub fn slot_values<'a>(grades: impl IntoIterator<Item = &'a Grade>) -> SlotValues {
  let mut slots = [None; SLOT_COUNT];
  for grade in grades {
    slots[grade.slot.index()] = Some(grade.value);
  }
  slots
}

/// Mean of the present slot values, rounded; `None` when every slot is empty.
pub fn subject_average(slots: &SlotValues) -> Option<f64> {
  let (sum, count) = slots
    .iter()
    .flatten()
    .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
  (count > 0).then(|| round_display(sum / f64::from(count)))
}

/// Mean of the subject averages that exist, rounded.
///
/// Subjects without grades are excluded from numerator and denominator. With
/// no graded subject at all the result is `0.0`, not absent.
pub fn overall_average(averages: impl IntoIterator<Item = Option<f64>>) -> f64 {
  let (sum, count) = averages
    .into_iter()
    .flatten()
    .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
  if count == 0 { 0.0 } else { round_display(sum / f64::from(count)) }
}

/// One subject's line in a student's grade summary.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectRow {
  pub subject_id:   Uuid,
  pub subject_name: String,
  pub slots:        SlotValues,
  pub average:      Option<f64>,
  pub failing:      bool,
}

impl SubjectRow {
  pub fn new(subject: &Subject, grades: &[Grade]) -> Self {
    let slots = slot_values(grades.iter().filter(|g| g.subject_id == subject.subject_id));
    let average = subject_average(&slots);
    Self {
      subject_id: subject.subject_id,
      subject_name: subject.name.clone(),
      slots,
      average,
      failing: average.is_some_and(is_failing),
    }
  }
}

/// Every subject of a student's course with slot values and averages, plus
/// the overall average.
#[derive(Debug, Clone, Serialize)]
pub struct StudentGrades {
  pub student_id:      Uuid,
  pub subjects:        Vec<SubjectRow>,
  pub overall_average: f64,
}

impl StudentGrades {
  /// Build the summary from the course's subjects and all of the student's
  /// grades. Subjects are listed by name.
  pub fn build(student_id: Uuid, subjects: &[Subject], grades: &[Grade]) -> Self {
    let mut ordered: Vec<&Subject> = subjects.iter().collect();
    ordered.sort_by_key(|s| s.name.to_lowercase());

    let rows: Vec<SubjectRow> = ordered
      .into_iter()
      .map(|subject| SubjectRow::new(subject, grades))
      .collect();
    let overall_average = overall_average(rows.iter().map(|r| r.average));

    Self { student_id, subjects: rows, overall_average }
  }
}

/// One student's line in a (course, subject) gradebook.
#[derive(Debug, Clone, Serialize)]
pub struct GradebookRow {
  pub student_id: Uuid,
  pub name:       String,
  pub slots:      SlotValues,
  pub average:    Option<f64>,
}

/// The "libro de notas" for one subject of one course.
#[derive(Debug, Clone, Serialize)]
pub struct GradebookView {
  pub course_id:  Uuid,
  pub subject_id: Uuid,
  pub rows:       Vec<GradebookRow>,
  /// Whether the viewing actor may submit changes.
  pub can_edit:   bool,
}

impl GradebookView {
  /// Build the view for `students` (the course roster) from every grade of the
  /// subject. Rows follow family-name, then given-name order.
  pub fn build(
    course_id: Uuid,
    subject_id: Uuid,
    students: &[Student],
    grades: &[Grade],
    can_edit: bool,
  ) -> Self {
    let mut roster: Vec<&Student> = students.iter().collect();
    roster.sort_by(|a, b| {
      (a.family_names.to_lowercase(), a.given_names.to_lowercase())
        .cmp(&(b.family_names.to_lowercase(), b.given_names.to_lowercase()))
    });

    let rows = roster
      .into_iter()
      .map(|student| {
        let slots = slot_values(
          grades
            .iter()
            .filter(|g| g.student_id == student.student_id && g.subject_id == subject_id),
        );
        GradebookRow {
          student_id: student.student_id,
          name: student.list_name(),
          average: subject_average(&slots),
          slots,
        }
      })
      .collect();

    Self { course_id, subject_id, rows, can_edit }
  }
}
