//! Attendance handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/courses/{id}/attendance` | `?date=YYYY-MM-DD`; records of one day (all days if omitted) |
//! | `POST` | `/courses/{id}/attendance` | Record a whole day; see [`RecordDayBody`] |
//! | `GET`  | `/courses/{id}/attendance/history` | Per-day totals, newest first |
//! | `GET`  | `/students/{id}/attendance` | Summary; optional `?course_id=<uuid>` |

use std::collections::BTreeMap;

use aula_core::{
  attendance::{
    AttendanceQuery, AttendanceRecord, AttendanceStatus, AttendanceSummary, DaySummary,
    NewAttendance, daily_history, summarize,
  },
  audit::{AuditAction, EntityKind},
  staff::Actor,
  store::SchoolStore,
};
use axum::{
  Extension, Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, audit, courses::load_course, error::ApiError, students::load_student};

// ─── Day ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DayParams {
  pub date: Option<NaiveDate>,
}

/// `GET /courses/{id}/attendance[?date=YYYY-MM-DD]`
pub async fn day<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(course_id): Path<Uuid>,
  Query(params): Query<DayParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
  load_course(state.store.as_ref(), course_id).await?;
  let records = state
    .store
    .list_attendance(AttendanceQuery {
      course_id: Some(course_id),
      date: params.date,
      ..Default::default()
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Record a day ─────────────────────────────────────────────────────────────

/// Body of `POST /courses/{id}/attendance`: one status per student id.
///
/// ```json
/// {"date": "2025-03-10", "statuses": {"<student uuid>": "present"}}
/// ```
#[derive(Debug, Deserialize)]
pub struct RecordDayBody {
  pub date:     NaiveDate,
  pub statuses: BTreeMap<Uuid, String>,
}

#[derive(Debug, Serialize)]
pub struct RecordDayResponse {
  pub saved:   usize,
  /// Students that are not enrolled in the course or whose status was not
  /// recognised.
  pub skipped: Vec<Uuid>,
  pub message: String,
}

/// `POST /courses/{id}/attendance`
///
/// Existing records for the same student and date are overwritten. Status
/// text is stored trimmed but otherwise as given.
pub async fn record_day<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(course_id): Path<Uuid>,
  Json(body): Json<RecordDayBody>,
) -> Result<Json<RecordDayResponse>, ApiError> {
  let course = load_course(state.store.as_ref(), course_id).await?;
  let roster: Vec<Uuid> = state
    .store
    .list_students(Some(course_id))
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|s| s.student_id)
    .collect();

  let mut saved = 0;
  let mut skipped = Vec::new();
  for (student_id, status) in body.statuses {
    if !roster.contains(&student_id) || AttendanceStatus::parse(&status).is_none() {
      skipped.push(student_id);
      continue;
    }
    state
      .store
      .record_attendance(NewAttendance {
        student_id,
        course_id,
        date: body.date,
        status: status.trim().to_owned(),
      })
      .await
      .map_err(ApiError::store)?;
    saved += 1;
  }

  let message = format!("Attendance for {} saved: {saved} students", body.date);
  if saved > 0 {
    audit::record(
      state.store.as_ref(),
      &actor,
      AuditAction::Update,
      EntityKind::Attendance,
      Some(course_id),
      course.label(),
      format!("{message} in {}", course.label()),
    )
    .await;
  }
  tracing::info!(%course_id, date = %body.date, saved, skipped = skipped.len(), "recorded attendance");
  Ok(Json(RecordDayResponse { saved, skipped, message }))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /courses/{id}/attendance/history`
pub async fn history<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<DaySummary>>, ApiError> {
  load_course(state.store.as_ref(), course_id).await?;
  let records = state
    .store
    .list_attendance(AttendanceQuery { course_id: Some(course_id), ..Default::default() })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(daily_history(records, &state.attendance)))
}

// ─── Student summary ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub course_id: Option<Uuid>,
}

/// `GET /students/{id}/attendance[?course_id=<uuid>]`
pub async fn student_summary<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(student_id): Path<Uuid>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<AttendanceSummary>, ApiError> {
  load_student(state.store.as_ref(), student_id).await?;
  let records = state
    .store
    .list_attendance(AttendanceQuery {
      student_id: Some(student_id),
      course_id: params.course_id,
      ..Default::default()
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(summarize(&records, &state.attendance)))
}
