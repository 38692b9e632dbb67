//! The temporal signal detector — promotions derived from work history.
//!
//! Detection is a pure scan over one entity's time-ordered stints; the async
//! scanner wraps it behind a bounded channel so the write path never computes
//! signals inline and replays are harmless (events deduplicate on their
//! natural key in the store).

use mosaic_core::{
  entity::{EntityKey, SourceTag},
  fact::{NewWorkHistoryEntry, PromotionEvent, WorkHistoryEntry},
  store::EnrichmentStore,
};
use tokio::sync::mpsc;

use crate::config::{OverlapPolicy, PromotionConfig};

// ─── Pure detection ──────────────────────────────────────────────────────────

/// Scan an entity's stints for promotions.
///
/// Entries are ordered by start date ascending, ties broken by source
/// priority and then insertion order (the order of `entries`). Entries with
/// no start date are excluded and the scan continues over the rest. A pair
/// of adjacent entries yields a promotion when the company is the same, the
/// title differs, and the gap from the earlier entry's end (ongoing counts
/// as no gap) to the later entry's start is within the configured threshold.
pub fn detect_promotions(
  entries: &[WorkHistoryEntry],
  config: &PromotionConfig,
  source_priority: &[SourceTag],
) -> Vec<PromotionEvent> {
  let mut dated: Vec<&WorkHistoryEntry> =
    entries.iter().filter(|e| e.start_date.is_some()).collect();

  // Stable sort: equal keys keep the caller's insertion order.
  dated.sort_by(|a, b| {
    a.start_date
      .cmp(&b.start_date)
      .then_with(|| {
        source_rank(source_priority, &a.source)
          .cmp(&source_rank(source_priority, &b.source))
      })
  });

  let mut events = Vec::new();

  for pair in dated.windows(2) {
    let (prev, next) = (pair[0], pair[1]);

    if prev.company_key != next.company_key || prev.title == next.title {
      continue;
    }
    let Some(next_start) = next.start_date else { continue };

    let gap_days = match prev.end_date {
      // Ongoing stint: the new title starts while the old one is open.
      None => 0,
      Some(end) => (next_start - end).num_days(),
    };

    if gap_days < 0 && config.overlap == OverlapPolicy::Skip {
      continue;
    }
    if gap_days.max(0) > config.adjacency_days {
      continue;
    }

    events.push(PromotionEvent {
      entity_key:     next.entity_key.clone(),
      company_key:    next.company_key.clone(),
      previous_title: prev.title.clone(),
      new_title:      next.title.clone(),
      promotion_date: next_start,
    });
  }

  events
}

fn source_rank(priority: &[SourceTag], source: &SourceTag) -> usize {
  priority
    .iter()
    .position(|s| s == source)
    .unwrap_or(priority.len())
}

// ─── Async trigger ───────────────────────────────────────────────────────────

/// Build the bounded channel between ingest and scanner.
pub fn scan_channel(
  depth: usize,
) -> (mpsc::Sender<EntityKey>, mpsc::Receiver<EntityKey>) {
  mpsc::channel(depth)
}

/// Appends work history and nudges the scanner for the affected entity.
///
/// Only a genuinely new row triggers a rescan; redelivered duplicates are
/// absorbed by the store's natural-key dedupe.
pub struct WorkHistoryIngest<S> {
  store: S,
  tx:    mpsc::Sender<EntityKey>,
}

impl<S: EnrichmentStore> WorkHistoryIngest<S> {
  pub fn new(store: S, tx: mpsc::Sender<EntityKey>) -> Self {
    Self { store, tx }
  }

  /// Returns `true` if a new stint was recorded.
  pub async fn record(
    &self,
    entry: NewWorkHistoryEntry,
  ) -> Result<bool, S::Error> {
    let entity_key = entry.entity_key.clone();
    let inserted = self.store.append_work_history(entry).await?;

    if inserted && self.tx.send(entity_key).await.is_err() {
      tracing::warn!("promotion scanner channel closed; rescan not queued");
    }

    Ok(inserted)
  }
}

/// The per-entity promotion scanner.
///
/// Each run is bounded to one entity's history; the total entity population
/// never matters. Rescanning is idempotent: recomputed events that already
/// exist are ignored by the store.
pub struct PromotionScanner<S> {
  store:           S,
  config:          PromotionConfig,
  source_priority: Vec<SourceTag>,
}

impl<S: EnrichmentStore> PromotionScanner<S> {
  pub fn new(
    store: S,
    config: PromotionConfig,
    source_priority: Vec<SourceTag>,
  ) -> Self {
    Self { store, config, source_priority }
  }

  /// Recompute and record promotions for one entity. Returns the number of
  /// genuinely new events.
  pub async fn rescan(
    &self,
    entity_key: &EntityKey,
  ) -> Result<usize, S::Error> {
    let history = self.store.list_work_history(entity_key.clone()).await?;
    let events =
      detect_promotions(&history, &self.config, &self.source_priority);
    let new_events = self.store.record_promotions(events).await?;

    if new_events > 0 {
      tracing::info!(%entity_key, new_events, "recorded promotion events");
    }
    Ok(new_events)
  }

  /// Consume rescan requests until the channel closes. Failures are logged
  /// and the worker keeps going; the next insert for the entity retriggers.
  pub async fn run(self, mut rx: mpsc::Receiver<EntityKey>) {
    while let Some(entity_key) = rx.recv().await {
      if let Err(err) = self.rescan(&entity_key).await {
        tracing::error!(%entity_key, %err, "promotion rescan failed");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use mosaic_core::fact::WorkHistoryEntry;

  use super::detect_promotions;
  use crate::config::{OverlapPolicy, PromotionConfig};

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn stint(
    company: &str,
    title: &str,
    start: Option<&str>,
    end: Option<&str>,
  ) -> WorkHistoryEntry {
    WorkHistoryEntry {
      entity_key:  "person-1".into(),
      company_key: company.into(),
      title:       title.into(),
      start_date:  start.map(date),
      end_date:    end.map(date),
      source:      "crawler".into(),
      recorded_at: Utc::now(),
    }
  }

  #[test]
  fn title_change_within_threshold_is_a_promotion() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("acme", "Senior Engineer", Some("2021-06-15"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].previous_title, "Engineer");
    assert_eq!(events[0].new_title, "Senior Engineer");
    assert_eq!(events[0].promotion_date, date("2021-06-15"));
  }

  #[test]
  fn gap_beyond_threshold_is_not_a_promotion() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("acme", "Senior Engineer", Some("2021-12-18"), None),
    ];
    // 200-day gap, 90-day threshold.
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert!(events.is_empty());
  }

  #[test]
  fn same_title_is_not_a_promotion() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("acme", "Engineer", Some("2021-06-15"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert!(events.is_empty());
  }

  #[test]
  fn different_company_is_not_a_promotion() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("globex", "Senior Engineer", Some("2021-06-15"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert!(events.is_empty());
  }

  #[test]
  fn intervening_employer_breaks_adjacency() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2020-06-01")),
      stint("globex", "Engineer", Some("2020-06-10"), Some("2020-08-01")),
      stint("acme", "Senior Engineer", Some("2020-08-10"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert!(events.is_empty());
  }

  #[test]
  fn ongoing_previous_stint_counts_as_adjacent() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), None),
      stint("acme", "Staff Engineer", Some("2022-03-01"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].promotion_date, date("2022-03-01"));
  }

  #[test]
  fn missing_start_date_is_excluded_not_fatal() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("acme", "Mystery Role", None, None),
      stint("acme", "Senior Engineer", Some("2021-06-15"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].new_title, "Senior Engineer");
  }

  #[test]
  fn overlap_policy_governs_overlapping_stints() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("acme", "Senior Engineer", Some("2021-05-01"), None),
    ];

    let adjacent = PromotionConfig::default();
    assert_eq!(detect_promotions(&history, &adjacent, &[]).len(), 1);

    let skipping = PromotionConfig {
      overlap: OverlapPolicy::Skip,
      ..PromotionConfig::default()
    };
    assert!(detect_promotions(&history, &skipping, &[]).is_empty());
  }

  #[test]
  fn chain_of_promotions_emits_one_event_per_step() {
    let history = vec![
      stint("acme", "Engineer", Some("2019-01-01"), Some("2020-01-01")),
      stint("acme", "Senior Engineer", Some("2020-01-15"), Some("2021-01-01")),
      stint("acme", "Staff Engineer", Some("2021-01-10"), None),
    ];
    let events =
      detect_promotions(&history, &PromotionConfig::default(), &[]);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].new_title, "Senior Engineer");
    assert_eq!(events[1].new_title, "Staff Engineer");
  }

  #[test]
  fn custom_threshold_is_honored() {
    let history = vec![
      stint("acme", "Engineer", Some("2020-01-01"), Some("2021-06-01")),
      stint("acme", "Senior Engineer", Some("2021-12-18"), None),
    ];
    let generous = PromotionConfig {
      adjacency_days: 365,
      ..PromotionConfig::default()
    };
    assert_eq!(detect_promotions(&history, &generous, &[]).len(), 1);
  }
}
