//! Display rounding for grades, averages and percentages.
//!
//! Everything shown to staff is rounded to one decimal, half-up: a value whose
//! second decimal is exactly 5 rounds the first decimal up (`3.95 → 4.0`,
//! `6.45 → 6.5`), never to even.

/// Absorbs binary representation error so that literals such as `6.45`
/// (stored as `6.4499999…`) still land on the upper side of the boundary.
const EPSILON: f64 = 1e-9;

/// Round `raw` half-up to one decimal place.
///
/// Non-finite input is returned unchanged.
pub fn round_display(raw: f64) -> f64 {
  if !raw.is_finite() {
    return raw;
  }
  (raw * 10.0 + 0.5 + EPSILON).floor() / 10.0
}

/// [`round_display`] lifted over an optional value.
pub fn round_display_opt(raw: Option<f64>) -> Option<f64> { raw.map(round_display) }

/// Round half-up to a whole number; used for per-course attendance columns.
pub fn round_whole(raw: f64) -> f64 {
  if !raw.is_finite() {
    return raw;
  }
  (raw + 0.5 + EPSILON).floor()
}

/// Render a value with exactly one decimal and a dot separator (`"5.8"`).
/// Absent values render as the empty string.
pub fn format_display(value: Option<f64>) -> String {
  match value {
    Some(v) => format!("{:.1}", round_display(v)),
    None => String::new(),
  }
}
