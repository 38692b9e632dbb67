//! Engine configuration.
//!
//! Everything here is data the product owns, not the code: source priorities
//! per domain, the promotion adjacency threshold, the treatment of
//! overlapping stints. Loaded from a TOML file with a `MOSAIC_` environment
//! overlay.

use std::{collections::BTreeMap, path::Path};

use mosaic_core::{entity::SourceTag, fact::AttributeDomain};
use serde::{Deserialize, Serialize};

use crate::Result;

// ─── Coalescing ──────────────────────────────────────────────────────────────

/// Per-domain source priority for coalescing.
///
/// A domain with no entry degrades to alphabetical source order (with a
/// warning) rather than failing the read. Changing priorities never requires
/// reprocessing history; the merged value is recomputed on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoalesceConfig {
  pub priorities: BTreeMap<AttributeDomain, Vec<SourceTag>>,
}

impl CoalesceConfig {
  pub fn priority_for(&self, domain: &AttributeDomain) -> Option<&[SourceTag]> {
    self.priorities.get(domain).map(Vec::as_slice)
  }

  /// Builder-style helper, mostly for tests and embedded setups.
  pub fn with_priority(
    mut self,
    domain: AttributeDomain,
    sources: Vec<SourceTag>,
  ) -> Self {
    self.priorities.insert(domain, sources);
    self
  }
}

// ─── Promotion detection ─────────────────────────────────────────────────────

/// How to treat a pair of stints whose date ranges overlap.
///
/// The source material was inconsistent here; both behaviors are live
/// product options, so neither is hardcoded.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
  /// An overlap counts as a zero-day gap and stays eligible.
  #[default]
  TreatAsAdjacent,
  /// Overlapping pairs are skipped entirely.
  Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
  /// Maximum gap, in days, between one stint's end and the next stint's
  /// start for the pair to count as a promotion.
  pub adjacency_days: i64,
  pub overlap:        OverlapPolicy,
}

impl Default for PromotionConfig {
  fn default() -> Self {
    Self {
      adjacency_days: 90,
      overlap:        OverlapPolicy::default(),
    }
  }
}

// ─── Top-level ───────────────────────────────────────────────────────────────

fn default_scan_queue_depth() -> usize { 256 }
fn default_backfill_chunk_size() -> usize { 500 }
fn default_rule_refresh_secs() -> u64 { 300 }

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub coalesce:  CoalesceConfig,
  pub promotion: PromotionConfig,
  /// Global source order used for tie-breaks in temporal scans.
  pub source_priority: Vec<SourceTag>,
  /// Bound on the promotion-scan channel; inserts beyond it apply
  /// backpressure to the ingest path.
  #[serde(default = "default_scan_queue_depth")]
  pub scan_queue_depth: usize,
  /// Rows per backfill chunk; each chunk commits independently.
  #[serde(default = "default_backfill_chunk_size")]
  pub backfill_chunk_size: usize,
  /// Seconds between resolver snapshot refreshes from the curated tables.
  #[serde(default = "default_rule_refresh_secs")]
  pub rule_refresh_secs: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      coalesce:            CoalesceConfig::default(),
      promotion:           PromotionConfig::default(),
      source_priority:     Vec::new(),
      scan_queue_depth:    default_scan_queue_depth(),
      backfill_chunk_size: default_backfill_chunk_size(),
      rule_refresh_secs:   default_rule_refresh_secs(),
    }
  }
}

impl EngineConfig {
  /// Load from a TOML file (optional) overlaid with `MOSAIC_*` environment
  /// variables.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let settings = ::config::Config::builder()
      .add_source(::config::File::from(path.as_ref()).required(false))
      .add_source(::config::Environment::with_prefix("MOSAIC"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }
}
