//! Handlers for `/audit` endpoints, plus the helper other handlers use to
//! append entries.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/audit` | `?actor_id=&action=&entity_kind=&limit=`, newest first |
//! | `DELETE` | `/audit` | Clears the log; returns `{"removed": n}` |
//! | `DELETE` | `/audit/{id}` | 404 if not found |
//!
//! All three require the coordinator role.

use aula_core::{
  audit::{AuditAction, AuditEntry, AuditQuery, EntityKind, NewAuditEntry},
  staff::Actor,
  store::SchoolStore,
};
use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require_coordinator};

/// Append an audit entry. A failed write is logged and otherwise ignored so
/// the mutation it describes still succeeds.
pub(crate) async fn record<S: SchoolStore>(
  store: &S,
  actor: &Actor,
  action: AuditAction,
  entity_kind: EntityKind,
  entity_id: Option<Uuid>,
  entity_repr: impl Into<String>,
  summary: impl Into<String>,
) {
  let entry =
    NewAuditEntry::new(actor.staff_id(), action, entity_kind, entity_id, entity_repr, summary);
  if let Err(e) = store.append_audit(entry).await {
    tracing::warn!(error = %e, kind = %entity_kind, "failed to record audit entry");
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /audit`
pub async fn list<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
  require_coordinator(&actor)?;
  let entries = state.store.list_audit(query).await.map_err(ApiError::store)?;
  Ok(Json(entries))
}

// ─── Clear ────────────────────────────────────────────────────────────────────

/// `DELETE /audit`
pub async fn clear<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, ApiError> {
  require_coordinator(&actor)?;
  let removed = state.store.clear_audit().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "removed": removed })))
}

// ─── Delete one ───────────────────────────────────────────────────────────────

/// `DELETE /audit/{id}`
pub async fn delete_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_coordinator(&actor)?;
  if state.store.delete_audit(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("audit entry {id} not found")))
  }
}
