//! Staff accounts and the per-request [`Actor`] derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// What a staff member is allowed to do, independent of course assignments.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
  /// Classroom teacher ("docente").
  #[strum(to_string = "teacher", serialize = "docente")]
  Teacher,
  /// Academic coordinator ("UTP"); full read/write access to every course.
  #[strum(to_string = "coordinator", serialize = "utp")]
  Coordinator,
  Inspector,
  Admin,
}

/// A staff account. The password hash is never serialised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
  pub staff_id:      Uuid,
  pub username:      String,
  pub full_name:     String,
  pub national_id:   Option<String>,
  pub role:          Role,
  pub is_superuser:  bool,
  #[serde(skip)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

impl Staff {
  /// Name shown on reports: the full name, or the username when blank.
  pub fn display_name(&self) -> &str {
    let name = self.full_name.trim();
    if name.is_empty() { &self.username } else { name }
  }
}

/// Input to [`crate::store::SchoolStore::add_staff`].
#[derive(Debug, Clone)]
pub struct NewStaff {
  pub username:      String,
  pub full_name:     String,
  pub national_id:   Option<String>,
  pub role:          Role,
  pub is_superuser:  bool,
  /// argon2 PHC string.
  pub password_hash: String,
}

/// Replacement account data for an existing staff member. The password is
/// changed separately.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffEdit {
  pub username:     String,
  #[serde(default)]
  pub full_name:    String,
  pub national_id:  Option<String>,
  pub role:         Role,
  #[serde(default)]
  pub is_superuser: bool,
}

impl StaffEdit {
  pub fn normalized(self) -> Result<Self> {
    Ok(Self {
      username:     normalize_username(&self.username)?,
      full_name:    self.full_name.trim().to_owned(),
      national_id:  self.national_id.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()),
      role:         self.role,
      is_superuser: self.is_superuser,
    })
  }
}

/// Trim a username and reject blanks and embedded whitespace.
pub fn normalize_username(raw: &str) -> Result<String> {
  let username = raw.trim();
  if username.is_empty() || username.chars().any(char::is_whitespace) {
    return Err(Error::Invalid(format!("invalid username: {raw:?}")));
  }
  Ok(username.to_owned())
}

/// The authenticated caller of an operation.
///
/// Built from the staff record on every request; never cached across requests,
/// so a role change takes effect on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  staff_id:     Uuid,
  role:         Role,
  is_superuser: bool,
}

impl Actor {
  pub fn new(staff_id: Uuid, role: Role, is_superuser: bool) -> Self {
    Self { staff_id, role, is_superuser }
  }

  pub fn staff_id(&self) -> Uuid { self.staff_id }

  pub fn role(&self) -> Role { self.role }

  pub fn is_superuser(&self) -> bool { self.is_superuser }
}

impl From<&Staff> for Actor {
  fn from(staff: &Staff) -> Self {
    Self::new(staff.staff_id, staff.role, staff.is_superuser)
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn role_parses_legacy_labels() {
    assert_eq!(Role::from_str("UTP").unwrap(), Role::Coordinator);
    assert_eq!(Role::from_str("docente").unwrap(), Role::Teacher);
    assert_eq!(Role::from_str("Inspector").unwrap(), Role::Inspector);
    assert!(Role::from_str("janitor").is_err());
  }

  #[test]
  fn usernames_are_trimmed_and_single_words() {
    assert_eq!(normalize_username("  mrojas ").unwrap(), "mrojas");
    assert!(matches!(normalize_username("m rojas"), Err(Error::Invalid(_))));
    assert!(matches!(normalize_username("   "), Err(Error::Invalid(_))));
  }

  #[test]
  fn role_displays_canonical_name() {
    assert_eq!(Role::Coordinator.to_string(), "coordinator");
  }

  #[test]
  fn password_hash_is_not_serialised() {
    let staff = Staff {
      staff_id:      Uuid::nil(),
      username:      "mrojas".into(),
      full_name:     "".into(),
      national_id:   None,
      role:          Role::Teacher,
      is_superuser:  false,
      password_hash: "$argon2id$secret".into(),
      created_at:    Utc::now(),
    };
    let json = serde_json::to_string(&staff).unwrap();
    assert!(!json.contains("argon2"));
    assert_eq!(staff.display_name(), "mrojas");
  }
}
