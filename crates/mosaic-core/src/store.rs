//! The `EnrichmentStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `mosaic-store-sqlite`).
//! Higher layers (`mosaic-engine`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  entity::{EntityKey, SourceTag},
  fact::{
    AttributeDomain, NewObservation, NewWorkHistoryEntry, PromotionEvent,
    SourceFact, UpsertOutcome, WorkHistoryEntry,
  },
  lookup::{FallbackRule, LookupEntry},
};

/// A resumable position in a full source-fact scan, opaque to callers.
/// `None` starts from the beginning; each chunk returns the cursor to pass
/// back for the next one.
pub type ScanCursor = Option<i64>;

/// Abstraction over a Mosaic enrichment store backend.
///
/// Source-fact writes are conditional upserts keyed by
/// `(entity_key, domain, source)`; the backend must serialize writes to the
/// same tuple so duplicate or out-of-order redelivery cannot lose updates.
/// Work history and promotion events are append-only with natural-key
/// deduplication.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait EnrichmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Lookup tables ─────────────────────────────────────────────────────

  /// Insert an exact-match lookup entry.
  ///
  /// Returns a conflict error if an entry already exists for
  /// `(domain, raw_value)`; callers must use the explicit update path to
  /// change an existing mapping.
  fn insert_lookup_entry(
    &self,
    entry: LookupEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Re-point an existing exact-match entry at a new matched value.
  /// Returns an error if no entry exists for `(domain, raw_value)`.
  fn update_lookup_entry(
    &self,
    entry: LookupEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// List exact-match entries, optionally restricted to one domain.
  fn list_lookup_entries(
    &self,
    domain: Option<AttributeDomain>,
  ) -> impl Future<Output = Result<Vec<LookupEntry>, Self::Error>> + Send + '_;

  /// Insert an ordered fallback pattern rule.
  fn insert_fallback_rule(
    &self,
    rule: FallbackRule,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// List fallback rules in ascending position order, optionally restricted
  /// to one domain.
  fn list_fallback_rules(
    &self,
    domain: Option<AttributeDomain>,
  ) -> impl Future<Output = Result<Vec<FallbackRule>, Self::Error>> + Send + '_;

  // ── Source facts ──────────────────────────────────────────────────────

  /// Conditionally upsert one source's observation.
  ///
  /// Write rules, applied atomically per tuple:
  /// - no existing row: insert;
  /// - `raw_value` changed: update raw and matched, but never replace an
  ///   existing matched value with null;
  /// - same raw, previously unmatched, now matched: set matched;
  /// - same raw, matched to a different non-null value: refresh matched;
  /// - otherwise: no write ([`UpsertOutcome::Unchanged`]).
  fn upsert_source_fact(
    &self,
    observation: NewObservation,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Fetch one source's fact for `(entity_key, domain, source)`.
  fn get_source_fact(
    &self,
    entity_key: EntityKey,
    domain: AttributeDomain,
    source: SourceTag,
  ) -> impl Future<Output = Result<Option<SourceFact>, Self::Error>> + Send + '_;

  /// All facts for an entity, optionally restricted to one domain.
  fn list_source_facts(
    &self,
    entity_key: EntityKey,
    domain: Option<AttributeDomain>,
  ) -> impl Future<Output = Result<Vec<SourceFact>, Self::Error>> + Send + '_;

  /// One bounded chunk of the global source-fact table, in stable insertion
  /// order, starting after `cursor`. Used by backfill; never called on the
  /// request path.
  fn scan_source_facts(
    &self,
    cursor: ScanCursor,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<(i64, SourceFact)>, Self::Error>> + Send + '_;

  // ── Work history ──────────────────────────────────────────────────────

  /// Append one stint; deduplicated on
  /// `(entity_key, company_key, start_date, source)`.
  /// Returns `true` if a new row was inserted.
  fn append_work_history(
    &self,
    entry: NewWorkHistoryEntry,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All stints for an entity, ordered by start date ascending with missing
  /// start dates last, then by insertion order.
  fn list_work_history(
    &self,
    entity_key: EntityKey,
  ) -> impl Future<Output = Result<Vec<WorkHistoryEntry>, Self::Error>> + Send + '_;

  // ── Promotion events ──────────────────────────────────────────────────

  /// Record detected promotions, ignoring any that already exist under their
  /// natural key. Returns the number of genuinely new events.
  fn record_promotions(
    &self,
    events: Vec<PromotionEvent>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All recorded promotion events for an entity, ordered by promotion date.
  fn list_promotions(
    &self,
    entity_key: EntityKey,
  ) -> impl Future<Output = Result<Vec<PromotionEvent>, Self::Error>> + Send + '_;
}
