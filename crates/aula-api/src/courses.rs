//! Handlers for `/courses` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/courses` | Year descending, then grade level and room |
//! | `POST`   | `/courses` | Coordinator only; 409 on a duplicate year/name/room |
//! | `GET`    | `/courses/{id}` | 404 if not found |
//! | `PUT`    | `/courses/{id}` | Coordinator only; rename, 409 on a duplicate year/name/room |
//! | `DELETE` | `/courses/{id}` | Coordinator only; cascades to subjects and grades |
//! | `PUT`    | `/courses/{id}/lead-teacher` | Body: `{"teacher_id": <uuid>\|null}` |
//! | `GET`    | `/courses/{id}/subjects` | Only the subjects visible to the caller |

use aula_core::{
  access,
  audit::{AuditAction, EntityKind},
  school::{Course, CourseEdit, NewCourse, Subject},
  staff::Actor,
  store::SchoolStore,
};
use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, audit, error::ApiError, require_coordinator};

pub(crate) async fn load_course<S: SchoolStore>(store: &S, id: Uuid) -> Result<Course, ApiError> {
  store
    .get_course(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))
}

/// A referenced staff member must exist before it is assigned anywhere.
pub(crate) async fn require_staff<S: SchoolStore>(store: &S, id: Uuid) -> Result<(), ApiError> {
  match store.get_staff(id).await.map_err(ApiError::store)? {
    Some(_) => Ok(()),
    None => Err(ApiError::BadRequest(format!("staff member {id} does not exist"))),
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /courses`
pub async fn list<S: SchoolStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Course>>, ApiError> {
  let courses = state.store.list_courses().await.map_err(ApiError::store)?;
  Ok(Json(courses))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /courses`
pub async fn create<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Json(body): Json<NewCourse>,
) -> Result<impl IntoResponse, ApiError> {
  require_coordinator(&actor)?;
  let input = body.normalized()?;
  if let Some(teacher) = input.lead_teacher {
    require_staff(state.store.as_ref(), teacher).await?;
  }

  let course = state.store.add_course(input).await.map_err(ApiError::store)?;
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Create,
    EntityKind::Course,
    Some(course.course_id),
    course.label(),
    format!("Created course {}", course.label()),
  )
  .await;
  Ok((StatusCode::CREATED, Json(course)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /courses/{id}`
pub async fn get_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Course>, ApiError> {
  Ok(Json(load_course(state.store.as_ref(), id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /courses/{id}`
pub async fn update<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<CourseEdit>,
) -> Result<Json<Course>, ApiError> {
  require_coordinator(&actor)?;
  let input = body.normalized()?;
  let before = load_course(state.store.as_ref(), id).await?;

  let course = state
    .store
    .update_course(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))?;

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Course,
    Some(id),
    course.label(),
    format!("Renamed course {} to {}", before.label(), course.label()),
  )
  .await;
  Ok(Json(course))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /courses/{id}`
pub async fn delete_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_coordinator(&actor)?;
  let course = load_course(state.store.as_ref(), id).await?;
  if !state.store.delete_course(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("course {id} not found")));
  }

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Delete,
    EntityKind::Course,
    Some(id),
    course.label(),
    format!("Deleted course {}", course.label()),
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Lead teacher ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignTeacherBody {
  pub teacher_id: Option<Uuid>,
}

/// `PUT /courses/{id}/lead-teacher`
pub async fn set_lead_teacher<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignTeacherBody>,
) -> Result<Json<Course>, ApiError> {
  require_coordinator(&actor)?;
  if let Some(teacher) = body.teacher_id {
    require_staff(state.store.as_ref(), teacher).await?;
  }

  let course = state
    .store
    .set_lead_teacher(id, body.teacher_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))?;

  let summary = match body.teacher_id {
    Some(teacher) => format!("Assigned lead teacher {teacher} to {}", course.label()),
    None => format!("Removed the lead teacher of {}", course.label()),
  };
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Course,
    Some(id),
    course.label(),
    summary,
  )
  .await;
  Ok(Json(course))
}

// ─── Visible subjects ─────────────────────────────────────────────────────────

/// `GET /courses/{id}/subjects`
///
/// Coordinators and the course's lead teacher see every subject; other
/// teachers see the subjects they teach.
pub async fn visible_subjects<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let course = load_course(state.store.as_ref(), id).await?;
  let subjects = state.store.list_subjects(Some(id)).await.map_err(ApiError::store)?;
  let visible = access::visible_subjects(&actor, &course, &subjects).into_iter().cloned().collect();
  Ok(Json(visible))
}
