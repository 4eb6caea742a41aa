//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?course_id=<uuid>` |
//! | `POST`   | `/subjects` | Coordinator only; 409 on a duplicate name within the course |
//! | `GET`    | `/subjects/{id}` | 404 if not found |
//! | `PUT`    | `/subjects/{id}` | Coordinator only; body: `{"name", "description"}`, 409 on a duplicate name |
//! | `DELETE` | `/subjects/{id}` | Coordinator only; deletes the subject's grades |
//! | `PUT`    | `/subjects/{id}/teacher` | Body: `{"teacher_id": <uuid>}` |

use aula_core::{
  audit::{AuditAction, EntityKind},
  school::{NewSubject, Subject, SubjectEdit},
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

use crate::{
  ApiState, audit,
  courses::{load_course, require_staff},
  error::ApiError,
  require_coordinator,
};

async fn load_subject<S: SchoolStore>(store: &S, id: Uuid) -> Result<Subject, ApiError> {
  store
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub course_id: Option<Uuid>,
}

/// `GET /subjects[?course_id=<uuid>]`
pub async fn list<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = state.store.list_subjects(params.course_id).await.map_err(ApiError::store)?;
  Ok(Json(subjects))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /subjects`
pub async fn create<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError> {
  require_coordinator(&actor)?;
  let input = body.normalized()?;
  let course = load_course(state.store.as_ref(), input.course_id).await?;
  require_staff(state.store.as_ref(), input.teacher_id).await?;

  let subject = state.store.add_subject(input).await.map_err(ApiError::store)?;
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Create,
    EntityKind::Subject,
    Some(subject.subject_id),
    format!("{} / {}", course.label(), subject.name),
    format!("Created subject {} in {}", subject.name, course.label()),
  )
  .await;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}`
pub async fn get_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError> {
  Ok(Json(load_subject(state.store.as_ref(), id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /subjects/{id}`
pub async fn update<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<SubjectEdit>,
) -> Result<Json<Subject>, ApiError> {
  require_coordinator(&actor)?;
  let input = body.normalized()?;
  let before = load_subject(state.store.as_ref(), id).await?;

  let subject = state
    .store
    .update_subject(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;

  let summary = if before.name == subject.name {
    format!("Updated the description of {}", subject.name)
  } else {
    format!("Renamed subject {} to {}", before.name, subject.name)
  };
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Subject,
    Some(id),
    subject.name.clone(),
    summary,
  )
  .await;
  Ok(Json(subject))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /subjects/{id}`
pub async fn delete_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_coordinator(&actor)?;
  let subject = load_subject(state.store.as_ref(), id).await?;
  if !state.store.delete_subject(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("subject {id} not found")));
  }

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Delete,
    EntityKind::Subject,
    Some(id),
    subject.name.clone(),
    format!("Deleted subject {} and its grades", subject.name),
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Teacher ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignTeacherBody {
  pub teacher_id: Uuid,
}

/// `PUT /subjects/{id}/teacher`
pub async fn set_teacher<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignTeacherBody>,
) -> Result<Json<Subject>, ApiError> {
  require_coordinator(&actor)?;
  require_staff(state.store.as_ref(), body.teacher_id).await?;

  let subject = state
    .store
    .set_subject_teacher(id, body.teacher_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Subject,
    Some(id),
    subject.name.clone(),
    format!("Assigned teacher {} to {}", body.teacher_id, subject.name),
  )
  .await;
  Ok(Json(subject))
}
