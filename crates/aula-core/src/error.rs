//! Error types for `aula-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("staff member not found: {0}")]
  StaffNotFound(Uuid),

  #[error("course not found: {0}")]
  CourseNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("subject {subject} does not belong to course {course}")]
  SubjectNotInCourse { subject: Uuid, course: Uuid },

  /// The acting staff member may not perform the operation.
  #[error("access denied: {0}")]
  Forbidden(String),

  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("invalid slot number {0}; slots run from 1 to 10")]
  InvalidSlot(u8),

  #[error("unknown {kind}: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error so it can travel through core operations that are
  /// generic over the store.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
