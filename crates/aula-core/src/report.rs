//! Printable reports: the per-student progress report and the per-course
//! attendance consolidation.

use std::{collections::HashMap, fmt::Write as _};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  attendance::{
    AttendancePolicy, AttendanceQuery, AttendanceRecord, AttendanceStatus, AttendanceSummary,
    summarize, whole_percent, CRITICAL_ATTENDANCE,
  },
  grade::StudentGrades,
  rounding::format_display,
  school::{Course, Student},
  store::SchoolStore,
};

// ─── Student report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ReportNote {
  pub author:     String,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
  pub student:      Student,
  pub course:       Option<Course>,
  pub lead_teacher: Option<String>,
  pub grades:       StudentGrades,
  pub attendance:   AttendanceSummary,
  /// Newest first.
  pub notes:        Vec<ReportNote>,
  pub generated_at: DateTime<Utc>,
}

async fn staff_name<S: SchoolStore>(store: &S, id: Uuid) -> Result<String> {
  Ok(
    store
      .get_staff(id)
      .await
      .map_err(Error::store)?
      .map_or_else(|| "(unknown)".to_owned(), |s| s.display_name().to_owned()),
  )
}

/// Gather everything printed on a student's report.
///
/// Grades cover every subject of the student's current course; attendance is
/// scoped to that course. A student without a course gets an empty grade
/// table and attendance over all of their records.
pub async fn build_student_report<S: SchoolStore>(
  store: &S,
  student_id: Uuid,
  policy: &AttendancePolicy,
) -> Result<StudentReport> {
  let student = store
    .get_student(student_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::StudentNotFound(student_id))?;

  let course = match student.course_id {
    Some(id) => store.get_course(id).await.map_err(Error::store)?,
    None => None,
  };
  let lead_teacher = match course.as_ref().and_then(|c| c.lead_teacher) {
    Some(id) => Some(staff_name(store, id).await?),
    None => None,
  };

  let subjects = match &course {
    Some(c) => store.list_subjects(Some(c.course_id)).await.map_err(Error::store)?,
    None => Vec::new(),
  };
  let grades = store.grades_for_student(student_id).await.map_err(Error::store)?;
  let grades = StudentGrades::build(student_id, &subjects, &grades);

  let records = store
    .list_attendance(AttendanceQuery {
      student_id: Some(student_id),
      course_id: course.as_ref().map(|c| c.course_id),
      date: None,
    })
    .await
    .map_err(Error::store)?;
  let attendance = summarize(&records, policy);

  let mut authors: HashMap<Uuid, String> = HashMap::new();
  let mut notes = Vec::new();
  for note in store.list_notes(student_id).await.map_err(Error::store)? {
    let author = match authors.get(&note.author_id) {
      Some(name) => name.clone(),
      None => {
        let name = staff_name(store, note.author_id).await?;
        authors.insert(note.author_id, name.clone());
        name
      }
    };
    notes.push(ReportNote { author, text: note.text, created_at: note.created_at });
  }

  Ok(StudentReport {
    student,
    course,
    lead_teacher,
    grades,
    attendance,
    notes,
    generated_at: Utc::now(),
  })
}

// ─── Course attendance report ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StudentAttendanceRow {
  pub student_id: Uuid,
  pub name:       String,
  pub summary:    AttendanceSummary,
  /// Whole-number percentage.
  pub percent:    f64,
  pub critical:   bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseAttendanceReport {
  pub course:       Course,
  pub lead_teacher: Option<String>,
  /// Earliest and latest recorded date in the course.
  pub period:       (Option<NaiveDate>, Option<NaiveDate>),
  pub rows:         Vec<StudentAttendanceRow>,
  pub generated_at: DateTime<Utc>,
}

pub async fn build_course_attendance_report<S: SchoolStore>(
  store: &S,
  course_id: Uuid,
  policy: &AttendancePolicy,
) -> Result<CourseAttendanceReport> {
  let course = store
    .get_course(course_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::CourseNotFound(course_id))?;
  let lead_teacher = match course.lead_teacher {
    Some(id) => Some(staff_name(store, id).await?),
    None => None,
  };

  let students = store.list_students(Some(course_id)).await.map_err(Error::store)?;
  let records = store
    .list_attendance(AttendanceQuery { course_id: Some(course_id), ..Default::default() })
    .await
    .map_err(Error::store)?;

  let mut by_student: HashMap<Uuid, Vec<&AttendanceRecord>> = HashMap::new();
  for record in &records {
    by_student.entry(record.student_id).or_default().push(record);
  }

  let rows = students
    .iter()
    .map(|student| {
      let own = by_student.get(&student.student_id).map(Vec::as_slice).unwrap_or_default();
      let summary = summarize(own.iter().copied(), policy);
      let percent = whole_percent(&summary);
      StudentAttendanceRow {
        student_id: student.student_id,
        name: student.list_name(),
        critical: summary.total > 0 && percent < CRITICAL_ATTENDANCE,
        percent,
        summary,
      }
    })
    .collect();

  Ok(CourseAttendanceReport {
    course,
    lead_teacher,
    period: summarize(&records, policy).date_range,
    rows,
    generated_at: Utc::now(),
  })
}

// ─── Rendering ───────────────────────────────────────────────────────────────

/// Render a student report as Markdown. Failing averages and critical
/// attendance are set in bold.
pub fn render_markdown(report: &StudentReport) -> String {
  let mut out = String::new();
  let student = &report.student;

  let _ = writeln!(out, "# Progress report: {} {}", student.given_names, student.family_names);
  out.push('\n');
  let _ = writeln!(out, "- **National ID:** {}", student.national_id);
  let course = report.course.as_ref().map_or_else(|| "(none)".to_owned(), Course::label);
  let _ = writeln!(out, "- **Course:** {course}");
  if let Some(lead) = &report.lead_teacher {
    let _ = writeln!(out, "- **Lead teacher:** {lead}");
  }
  let _ = writeln!(out, "- **Generated:** {}", report.generated_at.format("%Y-%m-%d %H:%M UTC"));

  out.push_str("\n## Grades\n\n");
  if report.grades.subjects.is_empty() {
    out.push_str("No subjects.\n");
  } else {
    out.push_str("| Subject | N1 | N2 | N3 | N4 | N5 | N6 | N7 | N8 | N9 | N10 | Average |\n");
    out.push_str("|---|---|---|---|---|---|---|---|---|---|---|---|\n");
    for row in &report.grades.subjects {
      let _ = write!(out, "| {} |", row.subject_name);
      for value in row.slots {
        let _ = write!(out, " {} |", format_display(value));
      }
      let average = format_display(row.average);
      if row.failing {
        let _ = writeln!(out, " **{average}** |");
      } else {
        let _ = writeln!(out, " {average} |");
      }
    }
  }
  let _ = writeln!(out, "\n**Overall average:** {:.1}", report.grades.overall_average);

  let a = &report.attendance;
  out.push_str("\n## Attendance\n\n");
  let percentage = format!("{:.1}%", a.percentage);
  if a.is_critical() {
    let _ = writeln!(out, "- **Attendance:** **{percentage}** (critical)");
  } else {
    let _ = writeln!(out, "- **Attendance:** {percentage}");
  }
  let _ = writeln!(out, "- **Days recorded:** {} ({} attended)", a.total, a.effective_present);
  for status in [
    AttendanceStatus::Present,
    AttendanceStatus::Late,
    AttendanceStatus::Absent,
    AttendanceStatus::Justified,
  ] {
    let _ = writeln!(out, "- {status}: {}", a.count(status));
  }
  if let (Some(first), Some(last)) = a.date_range {
    let _ = writeln!(out, "- **Period:** {first} to {last}");
  }

  out.push_str("\n## Notes\n\n");
  if report.notes.is_empty() {
    out.push_str("No notes.\n");
  }
  for note in &report.notes {
    let _ = writeln!(
      out,
      "- {} ({}): {}",
      note.created_at.format("%Y-%m-%d"),
      note.author,
      note.text.replace('\n', " ")
    );
  }

  out
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::grade::{SLOT_COUNT, SubjectRow};

  fn report() -> StudentReport {
    let mut slots = [None; SLOT_COUNT];
    slots[0] = Some(3.0);
    slots[1] = Some(3.5);
    StudentReport {
      student:      Student {
        student_id:        Uuid::nil(),
        national_id:       "12.345.678-9".into(),
        given_names:       "Ana".into(),
        family_names:      "Pérez".into(),
        birth_date:        None,
        emergency_contact: None,
        course_id:         None,
        created_at:        Utc::now(),
      },
      course:       None,
      lead_teacher: None,
      grades:       StudentGrades {
        student_id:      Uuid::nil(),
        subjects:        vec![SubjectRow {
          subject_id:   Uuid::nil(),
          subject_name: "Matemática".into(),
          slots,
          average:      Some(3.3),
          failing:      true,
        }],
        overall_average: 3.3,
      },
      attendance:   AttendanceSummary {
        total:             10,
        effective_present: 8,
        percentage:        80.0,
        breakdown:         BTreeMap::new(),
        date_range:        (None, None),
      },
      notes:        vec![ReportNote {
        author:     "M. Rojas".into(),
        text:       "Excellent\nparticipation".into(),
        created_at: Utc::now(),
      }],
      generated_at: Utc::now(),
    }
  }

  #[test]
  fn markdown_flags_failing_and_critical_values() {
    let md = render_markdown(&report());
    assert!(md.starts_with("# Progress report: Ana Pérez"));
    assert!(md.contains("| Matemática | 3.0 | 3.5 |  |"));
    assert!(md.contains("**3.3** |"));
    assert!(md.contains("**80.0%** (critical)"));
    assert!(md.contains("(M. Rojas): Excellent participation"));
    assert!(md.contains("- **Course:** (none)"));
  }
}
