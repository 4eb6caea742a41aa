//! Error type for `aula-store-sqlite`.

use aula_core::store::StoreError;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] aula_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// A unique constraint rejected the write.
  #[error("already exists: {0}")]
  Conflict(String),

  /// A foreign key pointed at a missing row.
  #[error("referenced record does not exist: {0}")]
  MissingReference(String),

  /// A delete was refused because other rows still reference the target.
  #[error("still in use: {0}")]
  InUse(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unrecognised {kind} in database: {value:?}")]
  Decode { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, msg)) = &e {
      let detail = msg.clone().unwrap_or_else(|| failure.to_string());
      match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
          return Self::Conflict(detail);
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::MissingReference(detail),
        _ => {}
      }
    }
    Self::Database(e)
  }
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool { matches!(self, Self::Conflict(_)) }

  fn is_missing_reference(&self) -> bool { matches!(self, Self::MissingReference(_)) }

  fn is_in_use(&self) -> bool { matches!(self, Self::InUse(_)) }
}
