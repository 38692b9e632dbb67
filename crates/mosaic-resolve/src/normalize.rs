//! Raw-value normalization — the required pre-step before exact-match lookup.
//!
//! Matching was observed to silently miss values differing only in case or
//! whitespace; we fix that here once instead of duplicating table entries per
//! variant.

/// Trim, case-fold, and collapse internal whitespace runs to single spaces.
///
/// Returns an empty string for all-whitespace input; callers treat that as
/// absence of signal.
pub fn normalize(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for word in raw.split_whitespace() {
    if !out.is_empty() {
      out.push(' ');
    }
    for c in word.chars() {
      out.extend(c.to_lowercase());
    }
  }
  out
}
