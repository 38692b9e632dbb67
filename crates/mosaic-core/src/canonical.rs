//! The canonical attribute — the computed read model for one
//! `(entity, domain)` pair. Never stored, always derived.

use serde::{Deserialize, Serialize};

use crate::{
  entity::{EntityKey, SourceTag},
  fact::AttributeDomain,
};

/// Where a canonical value came from, computed at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CanonicalValue {
  /// The first non-null normalized value in source-priority order.
  Matched { value: String, source: SourceTag },
  /// No source had a normalized value; this is the first raw value in the
  /// same priority order.
  Raw { value: String, source: SourceTag },
  /// No source contributed anything usable.
  Absent,
}

impl CanonicalValue {
  pub fn value(&self) -> Option<&str> {
    match self {
      Self::Matched { value, .. } | Self::Raw { value, .. } => Some(value),
      Self::Absent => None,
    }
  }

  pub fn source(&self) -> Option<&SourceTag> {
    match self {
      Self::Matched { source, .. } | Self::Raw { source, .. } => Some(source),
      Self::Absent => None,
    }
  }

  pub fn is_absent(&self) -> bool { matches!(self, Self::Absent) }
}

/// The merged, attributable answer for one attribute of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAttribute {
  pub entity_key: EntityKey,
  pub domain:     AttributeDomain,
  pub value:      CanonicalValue,
}
