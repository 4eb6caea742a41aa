//! The administrative audit log.
//!
//! One entry per mutation. Entries are append-only from the application's
//! point of view; coordinators may delete single entries or clear the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuditAction {
  Create,
  Update,
  Delete,
}

/// What kind of record an audit entry refers to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EntityKind {
  Course,
  Subject,
  Student,
  Grade,
  Attendance,
  Note,
  Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub audit_id:    Uuid,
  pub actor_id:    Uuid,
  pub entity_kind: EntityKind,
  /// Absent for batch operations that touch many records.
  pub entity_id:   Option<Uuid>,
  /// Human-readable description of the entity at the time of the change.
  pub entity_repr: String,
  pub action:      AuditAction,
  pub summary:     String,
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::SchoolStore::append_audit`].
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub actor_id:    Uuid,
  pub entity_kind: EntityKind,
  pub entity_id:   Option<Uuid>,
  pub entity_repr: String,
  pub action:      AuditAction,
  pub summary:     String,
}

impl NewAuditEntry {
  pub fn new(
    actor_id: Uuid,
    action: AuditAction,
    entity_kind: EntityKind,
    entity_id: Option<Uuid>,
    entity_repr: impl Into<String>,
    summary: impl Into<String>,
  ) -> Self {
    Self {
      actor_id,
      entity_kind,
      entity_id,
      entity_repr: entity_repr.into(),
      action,
      summary: summary.into(),
    }
  }
}

/// Filters for [`crate::store::SchoolStore::list_audit`]. Results are newest
/// first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
  pub actor_id:    Option<Uuid>,
  pub action:      Option<AuditAction>,
  pub entity_kind: Option<EntityKind>,
  pub limit:       Option<usize>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn kinds_round_trip_through_text() {
    for kind in [EntityKind::Grade, EntityKind::Attendance, EntityKind::Staff] {
      assert_eq!(EntityKind::from_str(&kind.to_string()).unwrap(), kind);
    }
    assert_eq!(AuditAction::from_str("DELETE").unwrap(), AuditAction::Delete);
  }

  #[test]
  fn query_deserialises_from_partial_input() {
    let q: AuditQuery = serde_json::from_str(r#"{"action":"update"}"#).unwrap();
    assert_eq!(q.action, Some(AuditAction::Update));
    assert!(q.actor_id.is_none());
  }
}
