//! The resolver handle shared across the engine.

use std::{
  collections::BTreeMap,
  sync::{Arc, Mutex, PoisonError, RwLock},
};

use mosaic_core::fact::AttributeDomain;

use crate::{normalize::normalize, snapshot::RuleSnapshot};

/// A shared, refreshable resolver.
///
/// Reads clone the current snapshot `Arc` under a read lock held only for
/// the pointer copy; a refresh builds its snapshot off-lock and swaps it in
/// one write. In-flight resolves keep their old snapshot alive until they
/// finish.
///
/// Lock poisoning is recovered from rather than propagated: both guarded
/// values stay valid across a panic (the snapshot pointer and the counters
/// are replaced whole, never left half-written), so a panic on some other
/// thread never turns a resolve into one.
pub struct Resolver {
  snapshot: RwLock<Arc<RuleSnapshot>>,
  /// Per-domain unmatched counts; touched only on the miss path.
  misses:   Mutex<BTreeMap<AttributeDomain, u64>>,
}

impl Resolver {
  pub fn new(snapshot: RuleSnapshot) -> Self {
    Self {
      snapshot: RwLock::new(Arc::new(snapshot)),
      misses:   Mutex::new(BTreeMap::new()),
    }
  }

  /// A resolver with no rules; everything misses until the first refresh.
  pub fn empty() -> Self { Self::new(RuleSnapshot::default()) }

  /// Resolve a raw value for a domain.
  ///
  /// Null-equivalent input (empty or all-whitespace) short-circuits to
  /// `None` without consulting any rules. A genuine miss is counted and
  /// logged, never raised.
  pub fn resolve(
    &self,
    domain: &AttributeDomain,
    raw_value: &str,
  ) -> Option<String> {
    let normalized = normalize(raw_value);
    if normalized.is_empty() {
      return None;
    }

    let snapshot = self.current();
    match snapshot.lookup(domain, &normalized) {
      Some(matched) => Some(matched.to_owned()),
      None => {
        self.record_miss(domain, &normalized);
        None
      }
    }
  }

  /// Swap in a freshly-built snapshot. Atomic from the point of view of
  /// concurrent resolves.
  pub fn refresh(&self, snapshot: RuleSnapshot) {
    let domains = snapshot.domain_count();
    *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) =
      Arc::new(snapshot);
    tracing::info!(domains, "resolver rule snapshot refreshed");
  }

  /// The snapshot in effect right now.
  pub fn current(&self) -> Arc<RuleSnapshot> {
    Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
  }

  /// Unmatched-value count for one domain since construction.
  pub fn miss_count(&self, domain: &AttributeDomain) -> u64 {
    self
      .misses
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(domain)
      .copied()
      .unwrap_or(0)
  }

  /// All per-domain miss counts, for coverage metrics.
  pub fn miss_counts(&self) -> BTreeMap<AttributeDomain, u64> {
    self
      .misses
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  fn record_miss(&self, domain: &AttributeDomain, normalized: &str) {
    *self
      .misses
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(domain.clone())
      .or_insert(0) += 1;
    tracing::debug!(%domain, raw = %normalized, "unmatched raw value");
  }
}
