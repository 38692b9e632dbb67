//! Chunked re-resolution of stored facts against an updated rule set.
//!
//! Rule changes take effect for future resolves immediately; this is the
//! controlled path for applying them to history. The walk is bounded and
//! resumable: each chunk commits independently, so an interrupted run can
//! pick up from the reported cursor without redoing finished work.

use std::sync::Arc;

use mosaic_core::{
  fact::NewObservation,
  store::{EnrichmentStore, ScanCursor},
};
use mosaic_resolve::Resolver;

/// What one backfill pass covered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
  pub scanned: usize,
  pub updated: usize,
  /// Pass this back to continue where the run stopped.
  pub cursor:  ScanCursor,
  pub done:    bool,
}

/// Re-resolves existing source facts chunk by chunk.
pub struct Backfill<S> {
  store:      S,
  resolver:   Arc<Resolver>,
  chunk_size: usize,
}

impl<S: EnrichmentStore> Backfill<S> {
  pub fn new(store: S, resolver: Arc<Resolver>, chunk_size: usize) -> Self {
    Self { store, resolver, chunk_size: chunk_size.max(1) }
  }

  /// Process one chunk starting after `cursor`.
  ///
  /// Each fact's stored raw value is re-run through the resolver and handed
  /// back as a fresh observation; the store's monotonic upsert rules decide
  /// whether anything changes, so a miss never clears an existing match.
  pub async fn run_chunk(
    &self,
    cursor: ScanCursor,
  ) -> Result<BackfillReport, S::Error> {
    let rows = self.store.scan_source_facts(cursor, self.chunk_size).await?;
    let done = rows.len() < self.chunk_size;

    let mut report = BackfillReport {
      scanned: rows.len(),
      cursor,
      done,
      ..BackfillReport::default()
    };

    for (row_id, fact) in rows {
      let matched_value = self.resolver.resolve(&fact.domain, &fact.raw_value);
      let outcome = self
        .store
        .upsert_source_fact(NewObservation {
          entity_key: fact.entity_key,
          domain: fact.domain,
          source: fact.source,
          raw_value: fact.raw_value,
          matched_value,
        })
        .await?;

      if !outcome.is_unchanged() {
        report.updated += 1;
      }
      report.cursor = Some(row_id);
    }

    tracing::info!(
      scanned = report.scanned,
      updated = report.updated,
      done = report.done,
      "backfill chunk committed"
    );
    Ok(report)
  }

  /// Run chunks until the table is exhausted, accumulating totals.
  pub async fn run_to_completion(&self) -> Result<BackfillReport, S::Error> {
    let mut totals = BackfillReport::default();

    loop {
      let chunk = self.run_chunk(totals.cursor).await?;
      totals.scanned += chunk.scanned;
      totals.updated += chunk.updated;
      totals.cursor = chunk.cursor;
      if chunk.done {
        totals.done = true;
        return Ok(totals);
      }
    }
  }
}
