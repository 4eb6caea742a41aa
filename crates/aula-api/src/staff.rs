//! Handlers for `/staff` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/staff` | Ordered by username |
//! | `POST` | `/staff` | Coordinator only; superusers may only be created by superusers |
//! | `GET`  | `/staff/{id}` | 404 if not found |
//! | `PUT`  | `/staff/{id}` | Coordinator only; 409 on a taken username |
//! | `DELETE` | `/staff/{id}` | Coordinator only; 409 while the account teaches, graded or wrote notes |
//! | `PUT`  | `/staff/{id}/password` | The account itself or a coordinator |
//!
//! Password hashes are never serialised. Accounts with superuser rights can
//! only be granted, edited or deleted by a superuser.

use aula_core::{
  access,
  audit::{AuditAction, EntityKind},
  staff::{Actor, NewStaff, Role, Staff, StaffEdit, normalize_username},
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

use crate::{ApiState, audit, error::ApiError, password::hash_password, require_coordinator};

async fn load_staff<S: SchoolStore>(store: &S, id: Uuid) -> Result<Staff, ApiError> {
  store
    .get_staff(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("staff member {id} not found")))
}

fn new_password_hash(password: &str) -> Result<String, ApiError> {
  if password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }
  hash_password(password).map_err(|e| ApiError::Store(e.to_string().into()))
}

fn require_superuser_for(actor: &Actor, target: &Staff) -> Result<(), ApiError> {
  if target.is_superuser && !actor.is_superuser() {
    return Err(ApiError::Forbidden(format!(
      "only a superuser may change the superuser account {}",
      target.username
    )));
  }
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /staff`
pub async fn list<S: SchoolStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Staff>>, ApiError> {
  let staff = state.store.list_staff().await.map_err(ApiError::store)?;
  Ok(Json(staff))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username:     String,
  #[serde(default)]
  pub full_name:    String,
  pub national_id:  Option<String>,
  pub role:         Role,
  #[serde(default)]
  pub is_superuser: bool,
  pub password:     String,
}

/// `POST /staff`
pub async fn create<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  require_coordinator(&actor)?;
  if body.is_superuser && !actor.is_superuser() {
    return Err(ApiError::Forbidden("only a superuser may create superusers".into()));
  }

  let username = normalize_username(&body.username)?;
  let password_hash = new_password_hash(&body.password)?;
  let staff = state
    .store
    .add_staff(NewStaff {
      username,
      full_name: body.full_name.trim().to_owned(),
      national_id: body.national_id.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()),
      role: body.role,
      is_superuser: body.is_superuser,
      password_hash,
    })
    .await
    .map_err(ApiError::store)?;

  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Create,
    EntityKind::Staff,
    Some(staff.staff_id),
    staff.username.clone(),
    format!("Created staff account {} ({})", staff.username, staff.role),
  )
  .await;
  Ok((StatusCode::CREATED, Json(staff)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /staff/{id}`
pub async fn get_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Staff>, ApiError> {
  Ok(Json(load_staff(state.store.as_ref(), id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /staff/{id}`
pub async fn update<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<StaffEdit>,
) -> Result<Json<Staff>, ApiError> {
  require_coordinator(&actor)?;
  let input = body.normalized()?;
  let before = load_staff(state.store.as_ref(), id).await?;
  require_superuser_for(&actor, &before)?;
  if input.is_superuser && !actor.is_superuser() {
    return Err(ApiError::Forbidden("only a superuser may grant superuser rights".into()));
  }

  let staff = state
    .store
    .update_staff(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("staff member {id} not found")))?;

  let mut summary = format!("Updated staff account {}", staff.username);
  if before.username != staff.username {
    summary.push_str(&format!(" (was {})", before.username));
  }
  if before.role != staff.role {
    summary.push_str(&format!("; role {} -> {}", before.role, staff.role));
  }
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Staff,
    Some(id),
    staff.username.clone(),
    summary,
  )
  .await;
  Ok(Json(staff))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /staff/{id}`
pub async fn delete_one<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_coordinator(&actor)?;
  if id == actor.staff_id() {
    return Err(ApiError::BadRequest("staff members cannot delete their own account".into()));
  }
  let staff = load_staff(state.store.as_ref(), id).await?;
  require_superuser_for(&actor, &staff)?;

  if !state.store.delete_staff(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("staff member {id} not found")));
  }
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Delete,
    EntityKind::Staff,
    Some(id),
    staff.username.clone(),
    format!("Deleted staff account {} ({})", staff.username, staff.role),
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Password ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
  pub password: String,
}

/// `PUT /staff/{id}/password`
///
/// Staff change their own password; coordinators may reset anyone else's.
pub async fn set_password<S: SchoolStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<PasswordBody>,
) -> Result<StatusCode, ApiError> {
  let own = id == actor.staff_id();
  if !own && !access::is_coordinator(&actor) {
    return Err(ApiError::Forbidden("only a coordinator may reset another password".into()));
  }
  let staff = load_staff(state.store.as_ref(), id).await?;
  if !own {
    require_superuser_for(&actor, &staff)?;
  }

  let password_hash = new_password_hash(&body.password)?;
  if !state.store.set_password(id, password_hash).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("staff member {id} not found")));
  }
  let summary = if own {
    format!("{} changed their password", staff.username)
  } else {
    format!("Reset the password of {}", staff.username)
  };
  audit::record(
    state.store.as_ref(),
    &actor,
    AuditAction::Update,
    EntityKind::Staff,
    Some(id),
    staff.username.clone(),
    summary,
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}
