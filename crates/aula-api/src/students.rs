//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students` | Optional `?course_id=<uuid>`; ordered by family name |
//! | `POST`   | `/students` | 409 on a duplicate national id |
//! | `GET`    | `/students/{id}` | 404 if not found |
//! | `PUT`    | `/students/{id}` | Personal data only; 409 on a duplicate national id |
//! | `DELETE` | `/students/{id}` | Deletes grades, attendance and notes |
//! | `PUT`    | `/students/{id}/course` | Coordinator only; body: `{"course_id": <uuid>\|null}` |
//! | `GET`    | `/students/{id}/grades` | Grade table over the current course's subjects |

use aula_core::{
  audit::{AuditAction, EntityKind},
  grade::StudentGrades,
  school::{NewStudent, Student, StudentEdit},
  staff::Actor,
  store::SchoolStore,
};
use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, audit, courses::load_course, error::ApiError, require_coordinator};

pub(crate) async fn load_student<S: SchoolStore>(store: &S, id: Uuid) -> Result<Student, ApiError> {
  store
    .get_student(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub course_id: Option<Uuid>,
}

/// `GET /students[?course_id=<uuid>]`
pub async fn list<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let students = state.store.list_students(params.course_id).await.map_err(ApiError::store)?;
  Ok(Json(students))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /students`
pub async fn create<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  let input = body.normalized()?;
  if let Some(course_id) = input.course_id {
    load_course(state.store.as_ref(), course_id).await?;
  }

  let student = state.store.add_student(input).await.map_err(ApiError::store)?;
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Create,
    EntityKind::Student,
    Some(student.student_id),
    student.list_name(),
    format!("Enrolled student {} ({})", student.list_name(), student.national_id),
  )
  .await;
  Ok((StatusCode::CREATED, Json(student)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /students/{id}`
pub async fn get_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(load_student(state.store.as_ref(), id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /students/{id}`
pub async fn update<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<StudentEdit>,
) -> Result<Json<Student>, ApiError> {
  let input = body.normalized()?;
  let student = state
    .store
    .update_student(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Student,
    Some(id),
    student.list_name(),
    format!("Updated student {} ({})", student.list_name(), student.national_id),
  )
  .await;
  Ok(Json(student))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /students/{id}`
pub async fn delete_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let student = load_student(state.store.as_ref(), id).await?;
  if !state.store.delete_student(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("student {id} not found")));
  }

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Delete,
    EntityKind::Student,
    Some(id),
    student.list_name(),
    format!("Deleted student {} ({})", student.list_name(), student.national_id),
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Course assignment ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignCourseBody {
  pub course_id: Option<Uuid>,
}

/// `PUT /students/{id}/course`
pub async fn assign_course<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignCourseBody>,
) -> Result<Json<Student>, ApiError> {
  require_coordinator(&actor)?;
  let course = match body.course_id {
    Some(course_id) => Some(load_course(state.store.as_ref(), course_id).await?),
    None => None,
  };

  let student = state
    .store
    .assign_student_course(id, body.course_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;

  let summary = match &course {
    Some(course) => format!("Moved {} to {}", student.list_name(), course.label()),
    None => format!("Removed {} from their course", student.list_name()),
  };
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Student,
    Some(id),
    student.list_name(),
    summary,
  )
  .await;
  Ok(Json(student))
}

// ─── Grades ───────────────────────────────────────────────────────────────────

/// `GET /students/{id}/grades`
///
/// One row per subject of the student's current course, even subjects with no
/// grades yet. A student without a course gets an empty table.
pub async fn grades<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StudentGrades>, ApiError> {
  let student = load_student(state.store.as_ref(), id).await?;
  let subjects = match student.course_id {
    Some(course_id) => {
      state.store.list_subjects(Some(course_id)).await.map_err(ApiError::store)?
    }
    None => Vec::new(),
  };
  let grades = state.store.grades_for_student(id).await.map_err(ApiError::store)?;
  Ok(Json(StudentGrades::build(id, &subjects, &grades)))
}
