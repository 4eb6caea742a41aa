//! Report handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/students/{id}` | JSON, or Markdown with `?format=markdown` |
//! | `GET`  | `/reports/courses/{id}/attendance` | Per-student attendance table |

use aula_core::{
  report::{
    CourseAttendanceReport, build_course_attendance_report, build_student_report,
    render_markdown,
  },
  store::SchoolStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
  #[default]
  Json,
  Markdown,
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  #[serde(default)]
  pub format: ReportFormat,
}

/// `GET /reports/students/{id}[?format=json|markdown]`
pub async fn student<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ReportParams>,
) -> Result<Response, ApiError> {
  let report = build_student_report(state.store.as_ref(), id, &state.attendance).await?;
  Ok(match params.format {
    ReportFormat::Json => Json(report).into_response(),
    ReportFormat::Markdown => (
      [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
      render_markdown(&report),
    )
      .into_response(),
  })
}

/// `GET /reports/courses/{id}/attendance`
pub async fn course_attendance<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseAttendanceReport>, ApiError> {
  let report = build_course_attendance_report(state.store.as_ref(), id, &state.attendance).await?;
  Ok(Json(report))
}
