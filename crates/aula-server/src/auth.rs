//! HTTP Basic-auth against the staff table.
//!
//! Every `/api` request is authenticated afresh: the staff record is loaded
//! by username, the password is checked against its argon2 hash, and the
//! resulting [`Actor`] is attached to the request for the API handlers.

use aula_api::password::{DUMMY_HASH, verify_password};
use aula_core::{
  staff::{Actor, Staff},
  store::SchoolStore,
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::{AppState, error::Error};

/// Decode `Authorization: Basic ...` into a username and password.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| Error::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Resolve the staff member behind a request's credentials.
pub async fn authenticate<S: SchoolStore>(headers: &HeaderMap, store: &S) -> Result<Staff, Error> {
  let (username, password) = basic_credentials(headers)?;

  let staff = store
    .find_staff_by_username(username.clone())
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  let Some(staff) = staff else {
    // Unknown usernames pay for one argon2 run too.
    verify_password(&password, DUMMY_HASH);
    tracing::debug!(%username, "login attempt for unknown user");
    return Err(Error::Unauthorized);
  };

  if !verify_password(&password, &staff.password_hash) {
    tracing::debug!(%username, "wrong password");
    return Err(Error::Unauthorized);
  }
  Ok(staff)
}

/// Middleware: reject unauthenticated requests with 401, otherwise insert the
/// caller's [`Actor`] as a request extension.
pub async fn require_staff<S: SchoolStore>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let staff = authenticate(req.headers(), state.store.as_ref()).await?;
  tracing::trace!(username = %staff.username, role = %staff.role, "authenticated");
  req.extensions_mut().insert(Actor::from(&staff));
  Ok(next.run(req).await)
}
