//! Gradebook handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/gradebook/{course_id}/{subject_id}` | Returns an `ETag` header |
//! | `POST` | `/gradebook/{course_id}/{subject_id}` | Batch save; honours `If-Match` |
//!
//! Any staff member may read a gradebook; the response's `can_edit` flag says
//! whether the caller may also save it. Saving requires permission to edit the
//! subject. A `POST` whose `If-Match` no longer matches the stored grades is
//! rejected with 412 and nothing is written.

use std::collections::HashMap;

use aula_core::{
  gradebook::{BatchOptions, BatchReport, GradeBatch, apply_batch, load_gradebook},
  grade::GradebookView,
  school::{Course, Subject},
  staff::Actor,
  store::SchoolStore,
};
use axum::{
  Extension, Json,
  extract::{Path, State},
  http::{HeaderMap, HeaderValue, header},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  etag::{self, compute_etag},
};

fn with_etag(body: impl IntoResponse, etag: &str) -> Response {
  let mut response = body.into_response();
  if let Ok(value) = HeaderValue::from_str(etag) {
    response.headers_mut().insert(header::ETAG, value);
  }
  response
}

// ─── View ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GradebookResponse {
  pub course:  Course,
  pub subject: Subject,
  #[serde(flatten)]
  pub view:    GradebookView,
}

/// `GET /gradebook/{course_id}/{subject_id}`
pub async fn view<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path((course_id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
  let book = load_gradebook(state.store.as_ref(), &actor, course_id, subject_id).await?;
  let etag = compute_etag(&book.grades);
  let body = GradebookResponse { course: book.course, subject: book.subject, view: book.view };
  Ok(with_etag(Json(body), &etag))
}

// ─── Submit ───────────────────────────────────────────────────────────────────

/// Body of a batch save. Keys are form cell names, `slot_<student>_<n>`
/// (the legacy `nota_` prefix is also accepted); values are the raw text the
/// user typed, with either `.` or `,` as decimal separator. Blank values are
/// ignored.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub values: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  #[serde(flatten)]
  pub report:  BatchReport,
  pub message: String,
}

/// `POST /gradebook/{course_id}/{subject_id}`
pub async fn submit<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path((course_id, subject_id)): Path<(Uuid, Uuid)>,
  headers: HeaderMap,
  Json(body): Json<SubmitBody>,
) -> Result<Response, ApiError> {
  let store = state.store.as_ref();

  if let Some(expected) = etag::if_match(&headers) {
    let book = load_gradebook(store, &actor, course_id, subject_id).await?;
    if !book.view.can_edit {
      return Err(ApiError::Forbidden(format!(
        "no permission to edit the gradebook of {}",
        book.subject.name
      )));
    }
    if !etag::matches(expected, &compute_etag(&book.grades)) {
      return Err(ApiError::PreconditionFailed);
    }
  }

  let batch = GradeBatch::from_form(body.values);
  let report = apply_batch(
    store,
    actor.staff_id(),
    course_id,
    subject_id,
    &batch,
    BatchOptions::default(),
  )
  .await?;

  let grades = store.grades_for_subject(subject_id).await.map_err(ApiError::store)?;
  let message = report.message();
  Ok(with_etag(Json(SubmitResponse { report, message }), &compute_etag(&grades)))
}
