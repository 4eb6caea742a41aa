//! JSON REST API for AulaClass.
//!
//! Exposes an axum [`Router`] backed by any [`aula_core::store::SchoolStore`].
//! Authentication is the caller's responsibility: every request must carry an
//! [`Actor`] request extension, built from the staff record by the server's
//! auth middleware.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", aula_api::api_router(store.clone(), policy))
//! ```

pub mod attendance;
pub mod audit;
pub mod courses;
pub mod error;
pub mod etag;
pub mod gradebook;
pub mod notes;
pub mod password;
pub mod reports;
pub mod staff;
pub mod students;
pub mod subjects;

use std::sync::Arc;

use aula_core::{access, attendance::AttendancePolicy, staff::Actor, store::SchoolStore};
use axum::{
  Router,
  routing::{delete, get, put},
};

pub use error::ApiError;

/// Shared state for every API handler.
pub struct ApiState<S> {
  pub store:      Arc<S>,
  pub attendance: Arc<AttendancePolicy>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), attendance: Arc::clone(&self.attendance) }
  }
}

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, attendance: AttendancePolicy) -> Router<()>
where
  S: SchoolStore + 'static,
{
  let state = ApiState { store, attendance: Arc::new(attendance) };

  Router::new()
    // Staff
    .route("/staff", get(staff::list::<S>).post(staff::create::<S>))
    .route(
      "/staff/{id}",
      get(staff::get_one::<S>).put(staff::update::<S>).delete(staff::delete_one::<S>),
    )
    .route("/staff/{id}/password", put(staff::set_password::<S>))
    // Courses
    .route("/courses", get(courses::list::<S>).post(courses::create::<S>))
    .route(
      "/courses/{id}",
      get(courses::get_one::<S>).put(courses::update::<S>).delete(courses::delete_one::<S>),
    )
    .route("/courses/{id}/lead-teacher", put(courses::set_lead_teacher::<S>))
    .route("/courses/{id}/subjects", get(courses::visible_subjects::<S>))
    .route(
      "/courses/{id}/attendance",
      get(attendance::day::<S>).post(attendance::record_day::<S>),
    )
    .route("/courses/{id}/attendance/history", get(attendance::history::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S>).put(subjects::update::<S>).delete(subjects::delete_one::<S>),
    )
    .route("/subjects/{id}/teacher", put(subjects::set_teacher::<S>))
    // Students
    .route("/students", get(students::list::<S>).post(students::create::<S>))
    .route(
      "/students/{id}",
      get(students::get_one::<S>).put(students::update::<S>).delete(students::delete_one::<S>),
    )
    .route("/students/{id}/course", put(students::assign_course::<S>))
    .route("/students/{id}/grades", get(students::grades::<S>))
    .route("/students/{id}/attendance", get(attendance::student_summary::<S>))
    .route("/students/{id}/notes", get(notes::list::<S>).post(notes::create::<S>))
    .route("/notes/{id}", delete(notes::delete_one::<S>))
    // Gradebook
    .route(
      "/gradebook/{course_id}/{subject_id}",
      get(gradebook::view::<S>).post(gradebook::submit::<S>),
    )
    // Reports
    .route("/reports/students/{id}", get(reports::student::<S>))
    .route("/reports/courses/{id}/attendance", get(reports::course_attendance::<S>))
    // Audit log
    .route("/audit", get(audit::list::<S>).delete(audit::clear::<S>))
    .route("/audit/{id}", delete(audit::delete_one::<S>))
    .with_state(state)
}

/// Administrative endpoints are limited to coordinators, admins and
/// superusers.
pub(crate) fn require_coordinator(actor: &Actor) -> Result<(), ApiError> {
  if access::is_coordinator(actor) {
    Ok(())
  } else {
    Err(ApiError::Forbidden("this action requires the coordinator role".into()))
  }
}

#[cfg(test)]
mod tests;
