//! ETags for gradebook views.
//!
//! An ETag is a SHA-256 hash over the sorted (grade_id, updated_at) pairs of
//! every grade in the gradebook, so any write to any slot changes it.

use aula_core::grade::Grade;
use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Compute the ETag for a set of grades.
///
/// Stable: the same grades in any order give the same ETag.
pub fn compute_etag(grades: &[Grade]) -> String {
  let mut pairs: Vec<(Uuid, DateTime<Utc>)> =
    grades.iter().map(|g| (g.grade_id, g.updated_at)).collect();
  compute_etag_from_pairs(&mut pairs)
}

/// Compute an ETag directly from (grade_id, updated_at) pairs.
///
/// The slice is sorted in place.
pub fn compute_etag_from_pairs(pairs: &mut [(Uuid, DateTime<Utc>)]) -> String {
  pairs.sort_by_key(|(id, _)| *id);

  let mut hasher = Sha256::new();
  for (id, ts) in pairs.iter() {
    hasher.update(id.as_bytes());
    hasher.update(ts.timestamp_nanos_opt().unwrap_or(ts.timestamp_micros()).to_le_bytes());
  }
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// The `If-Match` header value, if any.
pub fn if_match(headers: &HeaderMap) -> Option<&str> {
  headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok())
}

/// Compare an `If-Match` value with a current ETag. Quotes and a weak prefix
/// are ignored; `*` matches anything.
pub fn matches(if_match: &str, current: &str) -> bool {
  let wanted = strip_etag(if_match);
  wanted == "*" || wanted == strip_etag(current)
}

fn strip_etag(s: &str) -> &str { s.trim().trim_start_matches("W/").trim_matches('"') }

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn ts(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  #[test]
  fn etag_is_order_independent() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut forward = [(a, ts(1)), (b, ts(2))];
    let mut reverse = [(b, ts(2)), (a, ts(1))];
    assert_eq!(compute_etag_from_pairs(&mut forward), compute_etag_from_pairs(&mut reverse));
  }

  #[test]
  fn etag_changes_when_a_grade_is_rewritten() {
    let a = Uuid::new_v4();
    let before = compute_etag_from_pairs(&mut [(a, ts(1))]);
    let after = compute_etag_from_pairs(&mut [(a, ts(2))]);
    assert_ne!(before, after);
  }

  #[test]
  fn empty_gradebook_has_a_quoted_etag() {
    let etag = compute_etag(&[]);
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert_eq!(etag.len(), 66);
  }

  #[test]
  fn if_match_comparison() {
    assert!(matches("\"abc\"", "\"abc\""));
    assert!(matches("abc", "\"abc\""));
    assert!(matches("W/\"abc\"", "\"abc\""));
    assert!(matches("*", "\"abc\""));
    assert!(!matches("\"stale\"", "\"abc\""));
  }
}
