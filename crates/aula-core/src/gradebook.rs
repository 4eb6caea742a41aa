//! Gradebook submission: parsing a form-style batch and applying it.
//!
//! A batch arrives as `slot_<student_id>_<n>` keys with free-text values.
//! Each entry is validated on its own; bad entries are skipped and reported,
//! good ones are upserted. Only missing records and permission failures abort
//! the whole batch, and they do so before anything is written.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use strum::Display;
use uuid::Uuid;

use crate::{
  Error, Result,
  access::can_edit,
  audit::{AuditAction, EntityKind, NewAuditEntry},
  grade::{GradeWrite, GradebookView, MAX_GRADE, MIN_GRADE, Slot, UpsertOutcome},
  rounding::round_display,
  school::{Course, Student, Subject},
  staff::Actor,
  store::SchoolStore,
};

/// Default cap on the per-entry change lines kept in a [`BatchReport`].
pub const CHANGE_LINES: usize = 10;

// ─── Batch input ─────────────────────────────────────────────────────────────

/// One submitted value for a (student, slot) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEntry {
  /// The form key the value arrived under.
  pub key:        String,
  pub student_id: Uuid,
  pub slot:       Slot,
  pub raw:        String,
}

/// Split `slot_<uuid>_<n>` (or the older `nota_<uuid>_<n>`) into its parts.
pub fn parse_form_key(key: &str) -> Option<(Uuid, Slot)> {
  let rest = key.strip_prefix("slot_").or_else(|| key.strip_prefix("nota_"))?;
  let (student, slot) = rest.rsplit_once('_')?;
  let student_id = Uuid::parse_str(student).ok()?;
  let slot = Slot::new(slot.parse().ok()?).ok()?;
  Some((student_id, slot))
}

/// A set of submitted cells, at most one per (student, slot).
#[derive(Debug, Clone, Default)]
pub struct GradeBatch {
  entries: Vec<GradeEntry>,
}

impl GradeBatch {
  /// Collect the grade cells out of form pairs. Keys that are not grade cells
  /// are ignored; when a cell appears twice the later pair wins.
  pub fn from_form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut cells: BTreeMap<(Uuid, Slot), GradeEntry> = BTreeMap::new();
    for (key, value) in pairs {
      let key = key.as_ref();
      let Some((student_id, slot)) = parse_form_key(key) else {
        continue;
      };
      cells.insert((student_id, slot), GradeEntry {
        key: key.to_owned(),
        student_id,
        slot,
        raw: value.as_ref().to_owned(),
      });
    }
    Self { entries: cells.into_values().collect() }
  }

  pub fn entries(&self) -> &[GradeEntry] { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Why an entry was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
  Empty,
  NotANumber,
  OutOfRange,
  NotEnrolled,
}

/// Parse a submitted grade. Accepts `,` or `.` as decimal separator. The range
/// is checked on the value as typed; the result is rounded for storage.
pub fn parse_grade(raw: &str) -> Result<f64, SkipReason> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(SkipReason::Empty);
  }
  let value: f64 = trimmed
    .replace(',', ".")
    .parse()
    .map_err(|_| SkipReason::NotANumber)?;
  if !value.is_finite() {
    return Err(SkipReason::NotANumber);
  }
  if !(MIN_GRADE..=MAX_GRADE).contains(&value) {
    return Err(SkipReason::OutOfRange);
  }
  Ok(round_display(value))
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
  pub key:    String,
  pub reason: SkipReason,
}

/// Outcome of [`apply_batch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
  /// Entries written (created or updated).
  pub accepted: usize,
  /// Non-blank entries that were not written. Blank cells are not listed.
  pub skipped:  Vec<SkippedEntry>,
  /// Descriptions of the first written entries.
  pub changes:  Vec<String>,
}

impl BatchReport {
  pub fn message(&self) -> String {
    match self.accepted {
      1 => "1 change saved".to_owned(),
      n => format!("{n} changes saved"),
    }
  }

  fn skip(&mut self, entry: &GradeEntry, reason: SkipReason) {
    self.skipped.push(SkippedEntry { key: entry.key.clone(), reason });
  }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
  /// How many change lines to keep in the report and the audit entry.
  pub change_lines: usize,
}

impl Default for BatchOptions {
  fn default() -> Self { Self { change_lines: CHANGE_LINES } }
}

// ─── Operations ──────────────────────────────────────────────────────────────

async fn load_pair<S: SchoolStore>(
  store: &S,
  course_id: Uuid,
  subject_id: Uuid,
) -> Result<(Course, Subject)> {
  let course = store
    .get_course(course_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::CourseNotFound(course_id))?;
  let subject = store
    .get_subject(subject_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::SubjectNotFound(subject_id))?;
  if subject.course_id != course.course_id {
    return Err(Error::SubjectNotInCourse { subject: subject_id, course: course_id });
  }
  Ok((course, subject))
}

/// Validate and store a batch of grades for one subject of one course.
///
/// The actor's staff record is read fresh so that role or assignment changes
/// apply immediately. A cell naming a student that does not exist fails the
/// whole batch with [`Error::StudentNotFound`] before anything is written;
/// existing students of another course are skipped as not enrolled. Store
/// failures during the write phase abort the batch and entries already
/// written stay written.
#[tracing::instrument(skip(store, batch, options), fields(entries = batch.len()))]
pub async fn apply_batch<S: SchoolStore>(
  store: &S,
  actor_id: Uuid,
  course_id: Uuid,
  subject_id: Uuid,
  batch: &GradeBatch,
  options: BatchOptions,
) -> Result<BatchReport> {
  let staff = store
    .get_staff(actor_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::StaffNotFound(actor_id))?;
  let (course, subject) = load_pair(store, course_id, subject_id).await?;

  if !can_edit(&Actor::from(&staff), &course, &subject) {
    return Err(Error::Forbidden(format!(
      "{} may not edit grades of {} in {}",
      staff.username,
      subject.name,
      course.label()
    )));
  }

  let roster: HashMap<Uuid, Student> = store
    .list_students(Some(course_id))
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|s| (s.student_id, s))
    .collect();

  let mut checked = HashSet::new();
  for entry in batch.entries() {
    let id = entry.student_id;
    if roster.contains_key(&id) || !checked.insert(id) {
      continue;
    }
    if store.get_student(id).await.map_err(Error::store)?.is_none() {
      return Err(Error::StudentNotFound(id));
    }
  }

  let mut report = BatchReport::default();
  for entry in batch.entries() {
    let value = match parse_grade(&entry.raw) {
      Ok(v) => v,
      Err(SkipReason::Empty) => continue,
      Err(reason) => {
        report.skip(entry, reason);
        continue;
      }
    };
    let Some(student) = roster.get(&entry.student_id) else {
      report.skip(entry, SkipReason::NotEnrolled);
      continue;
    };

    let (grade, outcome) = store
      .upsert_grade(GradeWrite {
        student_id: student.student_id,
        subject_id,
        slot: entry.slot,
        value,
        recorded_by: actor_id,
      })
      .await
      .map_err(Error::store)?;
    report.accepted += 1;

    if report.changes.len() < options.change_lines {
      let verb = match outcome {
        UpsertOutcome::Created => "Created",
        UpsertOutcome::Updated => "Updated",
      };
      report.changes.push(format!(
        "{verb} slot {} for {}: {:.1}",
        grade.slot,
        student.list_name(),
        grade.value
      ));
    }
  }

  if report.accepted > 0 {
    let mut summary = format!("{}.", report.message());
    for line in &report.changes {
      summary.push('\n');
      summary.push_str(line);
    }
    let entry = NewAuditEntry::new(
      actor_id,
      AuditAction::Update,
      EntityKind::Grade,
      Some(subject_id),
      format!("{} / {}", course.label(), subject.name),
      summary,
    );
    if let Err(e) = store.append_audit(entry).await {
      tracing::warn!(error = %e, "failed to record audit entry for grade batch");
    }
  }

  tracing::info!(
    accepted = report.accepted,
    skipped = report.skipped.len(),
    "applied grade batch"
  );
  Ok(report)
}

/// A loaded gradebook together with the raw grades it was built from.
#[derive(Debug, Clone)]
pub struct Gradebook {
  pub course:  Course,
  pub subject: Subject,
  pub view:    GradebookView,
  pub grades:  Vec<crate::grade::Grade>,
}

/// Load the gradebook of `subject_id` in `course_id` for `actor`.
///
/// Any staff member may read it; `view.can_edit` tells whether the actor may
/// also save changes through [`apply_batch`].
pub async fn load_gradebook<S: SchoolStore>(
  store: &S,
  actor: &Actor,
  course_id: Uuid,
  subject_id: Uuid,
) -> Result<Gradebook> {
  let (course, subject) = load_pair(store, course_id, subject_id).await?;
  let allowed = can_edit(actor, &course, &subject);

  let students = store.list_students(Some(course_id)).await.map_err(Error::store)?;
  let grades = store.grades_for_subject(subject_id).await.map_err(Error::store)?;
  let view = GradebookView::build(course_id, subject_id, &students, &grades, allowed);
  Ok(Gradebook { course, subject, view, grades })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn form_keys() {
    let id = Uuid::new_v4();
    assert_eq!(parse_form_key(&format!("slot_{id}_3")), Some((id, Slot::new(3).unwrap())));
    assert_eq!(parse_form_key(&format!("nota_{id}_10")), Some((id, Slot::new(10).unwrap())));
    assert_eq!(parse_form_key(&format!("slot_{id}_11")), None);
    assert_eq!(parse_form_key(&format!("grade_{id}_1")), None);
    assert_eq!(parse_form_key("slot_12_1"), None);
    assert_eq!(parse_form_key("csrfmiddlewaretoken"), None);
  }

  #[test]
  fn batch_ignores_foreign_keys_and_keeps_the_last_duplicate() {
    let id = Uuid::new_v4();
    let batch = GradeBatch::from_form([
      ("csrf".to_owned(), "x".to_owned()),
      (format!("nota_{id}_1"), "4,0".to_owned()),
      (format!("slot_{id}_1"), "5,0".to_owned()),
      (format!("slot_{id}_2"), "".to_owned()),
    ]);
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.entries()[0].raw, "5,0");
  }

  #[test]
  fn grade_parsing() {
    assert_eq!(parse_grade(" 5,5 "), Ok(5.5));
    assert_eq!(parse_grade("6.45"), Ok(6.5));
    assert_eq!(parse_grade("1"), Ok(1.0));
    assert_eq!(parse_grade("7.0"), Ok(7.0));
    assert_eq!(parse_grade(""), Err(SkipReason::Empty));
    assert_eq!(parse_grade("   "), Err(SkipReason::Empty));
    assert_eq!(parse_grade("abc"), Err(SkipReason::NotANumber));
    assert_eq!(parse_grade("NaN"), Err(SkipReason::NotANumber));
    assert_eq!(parse_grade("7.5"), Err(SkipReason::OutOfRange));
    assert_eq!(parse_grade("0.9"), Err(SkipReason::OutOfRange));
    assert_eq!(parse_grade("7.04"), Err(SkipReason::OutOfRange));
  }

  #[test]
  fn message_pluralises() {
    let mut report = BatchReport::default();
    assert_eq!(report.message(), "0 changes saved");
    report.accepted = 1;
    assert_eq!(report.message(), "1 change saved");
  }
}
