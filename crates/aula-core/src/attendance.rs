//! Attendance records and their aggregation.
//!
//! Records keep the status text exactly as it was written so that imported or
//! hand-edited rows survive a round trip. Aggregation only counts rows whose
//! status parses to an [`AttendanceStatus`]; anything else is excluded from
//! the denominator rather than being treated as an absence.

use std::{
  collections::{BTreeMap, BTreeSet},
  str::FromStr,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _};
use uuid::Uuid;

use crate::rounding::{round_display, round_whole};

/// Attendance below this percentage is flagged as critical on reports.
pub const CRITICAL_ATTENDANCE: f64 = 85.0;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The recognised attendance statuses. Spanish labels used by older data
/// parse to the same variants.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
  #[strum(to_string = "present", serialize = "presente")]
  Present,
  #[strum(to_string = "absent", serialize = "ausente")]
  Absent,
  #[strum(to_string = "justified", serialize = "justificado")]
  Justified,
  #[strum(to_string = "late", serialize = "atraso", serialize = "atrasado")]
  Late,
}

impl AttendanceStatus {
  /// Parse free text, trimming whitespace. `None` for anything unrecognised.
  pub fn parse(raw: &str) -> Option<Self> { Self::from_str(raw.trim()).ok() }
}

/// Which statuses count towards attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePolicy {
  pub counts_as_attended: BTreeSet<AttendanceStatus>,
}

impl Default for AttendancePolicy {
  /// Present and Late both count as attended.
  fn default() -> Self {
    Self {
      counts_as_attended: [AttendanceStatus::Present, AttendanceStatus::Late]
        .into_iter()
        .collect(),
    }
  }
}

impl AttendancePolicy {
  pub fn counts(&self, status: AttendanceStatus) -> bool {
    self.counts_as_attended.contains(&status)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One day's attendance for one student in one course.
/// `(student_id, course_id, date)` is unique; later writes overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub record_id:  Uuid,
  pub student_id: Uuid,
  pub course_id:  Uuid,
  pub date:       NaiveDate,
  /// Status text as stored; see [`AttendanceRecord::status`].
  pub status:     String,
  pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
  pub fn status(&self) -> Option<AttendanceStatus> { AttendanceStatus::parse(&self.status) }
}

/// Input to [`crate::store::SchoolStore::record_attendance`].
#[derive(Debug, Clone)]
pub struct NewAttendance {
  pub student_id: Uuid,
  pub course_id:  Uuid,
  pub date:       NaiveDate,
  pub status:     String,
}

/// Filters for [`crate::store::SchoolStore::list_attendance`]. Unset fields
/// do not filter.
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  pub student_id: Option<Uuid>,
  pub course_id:  Option<Uuid>,
  pub date:       Option<NaiveDate>,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Aggregated attendance over a set of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
  /// Records with a recognised status.
  pub total:             usize,
  /// Records whose status counts as attended under the policy.
  pub effective_present: usize,
  /// `effective_present / total * 100`, one decimal; `0.0` when `total == 0`.
  pub percentage:        f64,
  pub breakdown:         BTreeMap<AttendanceStatus, usize>,
  /// Earliest and latest date among recognised records.
  pub date_range:        (Option<NaiveDate>, Option<NaiveDate>),
}

impl AttendanceSummary {
  pub fn is_critical(&self) -> bool { self.total > 0 && self.percentage < CRITICAL_ATTENDANCE }

  pub fn count(&self, status: AttendanceStatus) -> usize {
    self.breakdown.get(&status).copied().unwrap_or(0)
  }
}

fn percentage(attended: usize, total: usize) -> f64 {
  if total == 0 {
    0.0
  } else {
    round_display(attended as f64 / total as f64 * 100.0)
  }
}

/// Summarise `records`. Callers scope the input (one student, optionally one
/// course) before calling.
pub fn summarize<'a>(
  records: impl IntoIterator<Item = &'a AttendanceRecord>,
  policy: &AttendancePolicy,
) -> AttendanceSummary {
  let mut breakdown: BTreeMap<AttendanceStatus, usize> =
    AttendanceStatus::iter().map(|s| (s, 0)).collect();
  let mut total = 0;
  let mut effective_present = 0;
  let mut first: Option<NaiveDate> = None;
  let mut last: Option<NaiveDate> = None;

  for record in records {
    let Some(status) = record.status() else {
      continue;
    };
    total += 1;
    if policy.counts(status) {
      effective_present += 1;
    }
    *breakdown.entry(status).or_default() += 1;
    first = Some(first.map_or(record.date, |d| d.min(record.date)));
    last = Some(last.map_or(record.date, |d| d.max(record.date)));
  }

  AttendanceSummary {
    total,
    effective_present,
    percentage: percentage(effective_present, total),
    breakdown,
    date_range: (first, last),
  }
}

/// Attendance of a whole course on one date.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
  pub date:              NaiveDate,
  pub total:             usize,
  pub effective_present: usize,
  pub percentage:        f64,
  pub records:           Vec<AttendanceRecord>,
}

/// Group a course's records by date, newest first.
pub fn daily_history(
  records: Vec<AttendanceRecord>,
  policy: &AttendancePolicy,
) -> Vec<DaySummary> {
  let mut by_date: BTreeMap<NaiveDate, Vec<AttendanceRecord>> = BTreeMap::new();
  for record in records {
    by_date.entry(record.date).or_default().push(record);
  }

  by_date
    .into_iter()
    .rev()
    .map(|(date, records)| {
      let summary = summarize(&records, policy);
      DaySummary {
        date,
        total: summary.total,
        effective_present: summary.effective_present,
        percentage: summary.percentage,
        records,
      }
    })
    .collect()
}

/// Whole-number percentage shown in per-course attendance tables.
pub fn whole_percent(summary: &AttendanceSummary) -> f64 {
  if summary.total == 0 {
    0.0
  } else {
    round_whole(summary.effective_present as f64 / summary.total as f64 * 100.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(date: (i32, u32, u32), status: &str) -> AttendanceRecord {
    AttendanceRecord {
      record_id:  Uuid::new_v4(),
      student_id: Uuid::nil(),
      course_id:  Uuid::nil(),
      date:       NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
      status:     status.into(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn parses_english_and_spanish_labels() {
    assert_eq!(AttendanceStatus::parse("Present"), Some(AttendanceStatus::Present));
    assert_eq!(AttendanceStatus::parse(" presente "), Some(AttendanceStatus::Present));
    assert_eq!(AttendanceStatus::parse("ATRASO"), Some(AttendanceStatus::Late));
    assert_eq!(AttendanceStatus::parse("Justificado"), Some(AttendanceStatus::Justified));
    assert_eq!(AttendanceStatus::parse(""), None);
    assert_eq!(AttendanceStatus::parse("garbage"), None);
  }

  #[test]
  fn unrecognised_statuses_are_excluded_from_the_total() {
    let records = vec![
      record((2025, 3, 3), "Present"),
      record((2025, 3, 4), "Present"),
      record((2025, 3, 5), "Absent"),
      record((2025, 3, 6), "garbage"),
    ];
    let summary = summarize(&records, &AttendancePolicy::default());
    assert_eq!(summary.total, 3);
    assert_eq!(summary.effective_present, 2);
    assert_eq!(summary.percentage, 66.7);
    assert_eq!(
      summary.date_range,
      (NaiveDate::from_ymd_opt(2025, 3, 3), NaiveDate::from_ymd_opt(2025, 3, 5))
    );
  }

  #[test]
  fn late_counts_as_attended_by_default() {
    let records = vec![record((2025, 3, 3), "Late"), record((2025, 3, 4), "Justified")];
    let summary = summarize(&records, &AttendancePolicy::default());
    assert_eq!(summary.effective_present, 1);
    assert_eq!(summary.percentage, 50.0);
    assert_eq!(summary.count(AttendanceStatus::Late), 1);
    assert_eq!(summary.count(AttendanceStatus::Absent), 0);
  }

  #[test]
  fn policy_is_configurable() {
    let strict = AttendancePolicy {
      counts_as_attended: [AttendanceStatus::Present].into_iter().collect(),
    };
    let records = vec![record((2025, 3, 3), "Late"), record((2025, 3, 4), "Present")];
    assert_eq!(summarize(&records, &strict).effective_present, 1);
  }

  #[test]
  fn empty_input_is_zero_not_an_error() {
    let summary = summarize(std::iter::empty(), &AttendancePolicy::default());
    assert_eq!(summary.total, 0);
    assert_eq!(summary.percentage, 0.0);
    assert_eq!(summary.date_range, (None, None));
    assert!(!summary.is_critical());
  }

  #[test]
  fn history_is_newest_first() {
    let records = vec![
      record((2025, 3, 3), "Present"),
      record((2025, 3, 4), "Absent"),
      record((2025, 3, 4), "Present"),
    ];
    let history = daily_history(records, &AttendancePolicy::default());
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    assert_eq!(history[0].total, 2);
    assert_eq!(history[0].percentage, 50.0);
    assert_eq!(history[1].percentage, 100.0);
  }

  #[test]
  fn whole_percent_rounds_half_up() {
    let records: Vec<_> = ["Present", "Present", "Absent"]
      .iter()
      .enumerate()
      .map(|(i, s)| record((2025, 4, i as u32 + 1), s))
      .collect();
    let summary = summarize(&records, &AttendancePolicy::default());
    assert_eq!(whole_percent(&summary), 67.0);
    assert!(summary.is_critical());
  }
}
