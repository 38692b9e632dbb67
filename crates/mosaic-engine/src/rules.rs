//! Loading resolver snapshots from the curated tables.
//!
//! Administrative changes to lookup entries and fallback rules take effect
//! for future resolves through this path, without re-ingesting historical
//! payloads. Applying them to history is the backfill's job.

use std::{sync::Arc, time::Duration};

use mosaic_core::store::EnrichmentStore;
use mosaic_resolve::{Resolver, RuleSnapshot};

/// Build a fresh snapshot from the store and swap it into the resolver.
pub async fn refresh_resolver<S: EnrichmentStore>(
  store: &S,
  resolver: &Resolver,
) -> Result<(), S::Error> {
  let entries = store.list_lookup_entries(None).await?;
  let rules = store.list_fallback_rules(None).await?;
  resolver.refresh(RuleSnapshot::build(entries, rules));
  Ok(())
}

/// Refresh on a fixed schedule until the task is dropped.
///
/// A failed refresh keeps the previous snapshot in place; resolves continue
/// against the last good rule set.
pub async fn refresh_loop<S: EnrichmentStore>(
  store: S,
  resolver: Arc<Resolver>,
  period: Duration,
) {
  let mut interval = tokio::time::interval(period);
  interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

  loop {
    interval.tick().await;
    if let Err(err) = refresh_resolver(&store, &resolver).await {
      tracing::error!(%err, "resolver rule refresh failed");
    }
  }
}
