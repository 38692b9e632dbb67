//! Lookup tables and fallback pattern rules.
//!
//! These are the data-driven inputs to the resolver. They are curated through
//! the administrative path and loaded into immutable snapshots; nothing in
//! the hot resolve path reads them directly.

use serde::{Deserialize, Serialize};

use crate::fact::AttributeDomain;

/// An exact-match mapping `raw_value → matched_value` for one domain.
///
/// Unique per `(domain, raw_value)`; a duplicate insert is a conflict and
/// callers must use the explicit update path instead. `raw_value` is expected
/// to be stored in normalized form (trimmed, case-folded) — case variants are
/// handled by normalizing the probe, never by duplicating rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
  pub domain:        AttributeDomain,
  pub raw_value:     String,
  pub matched_value: String,
}

/// An ordered pattern rule consulted only when no exact entry matches.
///
/// Rules for a domain are evaluated strictly in ascending `position`; the
/// first matching pattern wins. Ties are a configuration decision, never
/// inferred from pattern specificity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
  pub domain:        AttributeDomain,
  pub position:      u32,
  /// Regex source text; compiled at snapshot build time.
  pub pattern:       String,
  pub matched_value: String,
}
