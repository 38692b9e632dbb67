//! Entity identity — thin envelopes around externally-assigned keys.
//!
//! Entity identity is resolved upstream of this core. We never generate keys
//! here; every key arrives from the ingestion boundary already deduplicated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stable, externally-assigned entity key.
///
/// Opaque to this core: we only ever compare and store it.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
  pub fn new(key: impl Into<String>) -> Self { Self(key.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for EntityKey {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for EntityKey {
  fn from(s: String) -> Self { Self(s) }
}

/// The tag identifying which enrichment source contributed a fact.
///
/// Ordering is plain lexicographic; the *configured* source priority lives in
/// the coalescing configuration, not here.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
  pub fn new(tag: impl Into<String>) -> Self { Self(tag.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SourceTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SourceTag {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for SourceTag {
  fn from(s: String) -> Self { Self(s) }
}
