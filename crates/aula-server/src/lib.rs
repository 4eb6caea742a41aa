//! HTTP server for AulaClass.
//!
//! Wraps the [`aula_api`] router with Basic authentication against the staff
//! table, request tracing, and an unauthenticated `/health` probe.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use aula_core::{attendance::AttendancePolicy, store::SchoolStore};
use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `AULA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Username of the superuser created when the staff table is empty.
  #[serde(default = "default_admin_username")]
  pub admin_username:      String,
  /// argon2 PHC string for that superuser; see `--hash-password`.
  pub admin_password_hash: Option<String>,
  /// Which attendance statuses count as attended.
  #[serde(default)]
  pub attendance:          AttendancePolicy,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("aulaclass.db") }

fn default_admin_username() -> String { "admin".to_owned() }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the server-level middleware.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: Arc::clone(&self.config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SchoolStore + 'static,
{
  let api = aula_api::api_router(state.store.clone(), state.config.attendance.clone())
    .layer(middleware::from_fn_with_state(state, auth::require_staff::<S>));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Integration tests ────────────────────────────────────────────────────────
