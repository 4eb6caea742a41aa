//! Handlers for student observation notes.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students/{id}/notes` | Newest first |
//! | `POST`   | `/students/{id}/notes` | Body: `{"text": "..."}`; the caller is the author |
//! | `DELETE` | `/notes/{id}` | Author or coordinator only |

use aula_core::{
  access,
  audit::{AuditAction, EntityKind},
  school::{NewNote, Note},
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

use crate::{ApiState, audit, error::ApiError, students::load_student};

/// `GET /students/{id}/notes`
pub async fn list<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
  load_student(state.store.as_ref(), student_id).await?;
  let notes = state.store.list_notes(student_id).await.map_err(ApiError::store)?;
  Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub text: String,
}

/// `POST /students/{id}/notes`
pub async fn create<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(student_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let text = body.text.trim().to_owned();
  if text.is_empty() {
    return Err(ApiError::BadRequest("note text must not be blank".into()));
  }
  let student = load_student(state.store.as_ref(), student_id).await?;

  let note = state
    .store
    .add_note(NewNote { student_id, author_id: actor.staff_id(), text })
    .await
    .map_err(ApiError::store)?;
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Create,
    EntityKind::Note,
    Some(note.note_id),
    student.list_name(),
    format!("Added a note for {}", student.list_name()),
  )
  .await;
  Ok((StatusCode::CREATED, Json(note)))
}

/// `DELETE /notes/{id}`
pub async fn delete_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let note = state
    .store
    .get_note(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("note {id} not found")))?;
  if note.author_id != actor.staff_id() && !access::is_coordinator(&actor) {
    return Err(ApiError::Forbidden("only the author or a coordinator may delete a note".into()));
  }

  if !state.store.delete_note(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("note {id} not found")));
  }
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Delete,
    EntityKind::Note,
    Some(id),
    format!("note on student {}", note.student_id),
    "Deleted a note",
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}
