//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use mosaic_core::{
  fact::{
    AttributeDomain, MatchState, NewObservation, NewWorkHistoryEntry,
    PromotionEvent, UpsertOutcome,
  },
  lookup::{FallbackRule, LookupEntry},
  store::EnrichmentStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(s: &str) -> NaiveDate {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn observation(
  entity: &str,
  domain: AttributeDomain,
  source: &str,
  raw: &str,
  matched: Option<&str>,
) -> NewObservation {
  NewObservation {
    entity_key: entity.into(),
    domain,
    source: source.into(),
    raw_value: raw.into(),
    matched_value: matched.map(str::to_owned),
  }
}

fn stint(
  entity: &str,
  company: &str,
  title: &str,
  start: Option<&str>,
  end: Option<&str>,
  source: &str,
) -> NewWorkHistoryEntry {
  NewWorkHistoryEntry {
    entity_key:  entity.into(),
    company_key: company.into(),
    title:       title.into(),
    start_date:  start.map(date),
    end_date:    end.map(date),
    source:      source.into(),
  }
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_list_lookup_entries() {
  let s = store().await;

  s.insert_lookup_entry(LookupEntry {
    domain:        AttributeDomain::Industry,
    raw_value:     "fintech".into(),
    matched_value: "financial_services".into(),
  })
  .await
  .unwrap();

  let all = s
    .list_lookup_entries(Some(AttributeDomain::Industry))
    .await
    .unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].matched_value, "financial_services");
}

#[tokio::test]
async fn duplicate_lookup_entry_conflicts() {
  let s = store().await;

  let entry = LookupEntry {
    domain:        AttributeDomain::Industry,
    raw_value:     "fintech".into(),
    matched_value: "financial_services".into(),
  };
  s.insert_lookup_entry(entry.clone()).await.unwrap();

  let err = s.insert_lookup_entry(entry).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(mosaic_core::Error::DuplicateLookupEntry { .. })
  ));
}

#[tokio::test]
async fn update_lookup_entry_repoints_existing_row() {
  let s = store().await;

  s.insert_lookup_entry(LookupEntry {
    domain:        AttributeDomain::Industry,
    raw_value:     "fintech".into(),
    matched_value: "financial_services".into(),
  })
  .await
  .unwrap();

  s.update_lookup_entry(LookupEntry {
    domain:        AttributeDomain::Industry,
    raw_value:     "fintech".into(),
    matched_value: "banking".into(),
  })
  .await
  .unwrap();

  let all = s
    .list_lookup_entries(Some(AttributeDomain::Industry))
    .await
    .unwrap();
  assert_eq!(all[0].matched_value, "banking");
}

#[tokio::test]
async fn update_missing_lookup_entry_errors() {
  let s = store().await;

  let err = s
    .update_lookup_entry(LookupEntry {
      domain:        AttributeDomain::Industry,
      raw_value:     "nope".into(),
      matched_value: "x".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(mosaic_core::Error::LookupEntryNotFound { .. })
  ));
}

#[tokio::test]
async fn fallback_rules_list_in_position_order() {
  let s = store().await;

  for (position, pattern, matched) in
    [(2u32, "b", "two"), (1, "a", "one"), (3, "c", "three")]
  {
    s.insert_fallback_rule(FallbackRule {
      domain: AttributeDomain::Seniority,
      position,
      pattern: pattern.into(),
      matched_value: matched.into(),
    })
    .await
    .unwrap();
  }

  let rules = s
    .list_fallback_rules(Some(AttributeDomain::Seniority))
    .await
    .unwrap();
  let order: Vec<u32> = rules.iter().map(|r| r.position).collect();
  assert_eq!(order, vec![1, 2, 3]);
}

// ─── Source-fact upserts ─────────────────────────────────────────────────────

#[tokio::test]
async fn first_observation_inserts() {
  let s = store().await;

  let outcome = s
    .upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Industry,
      "crawler",
      "FinTech",
      Some("financial_services"),
    ))
    .await
    .unwrap();

  let fact = match outcome {
    UpsertOutcome::Inserted(f) => f,
    other => panic!("expected insert, got {other:?}"),
  };
  assert_eq!(fact.raw_value, "FinTech");
  assert_eq!(fact.matched_value.as_deref(), Some("financial_services"));
}

#[tokio::test]
async fn identical_replay_is_unchanged() {
  let s = store().await;
  let obs = observation(
    "person-1",
    AttributeDomain::Industry,
    "crawler",
    "FinTech",
    Some("financial_services"),
  );

  s.upsert_source_fact(obs.clone()).await.unwrap();
  let replay = s.upsert_source_fact(obs).await.unwrap();
  assert!(replay.is_unchanged());
}

#[tokio::test]
async fn matched_value_is_never_nulled_out() {
  let s = store().await;

  s.upsert_source_fact(observation(
    "person-1",
    AttributeDomain::Industry,
    "crawler",
    "FinTech",
    Some("financial_services"),
  ))
  .await
  .unwrap();

  // Same raw value arrives again, this time unresolved: no write.
  let outcome = s
    .upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Industry,
      "crawler",
      "FinTech",
      None,
    ))
    .await
    .unwrap();
  assert!(outcome.is_unchanged());

  // A changed raw value that misses resolution keeps the old match.
  let outcome = s
    .upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Industry,
      "crawler",
      "Fin-Tech Inc",
      None,
    ))
    .await
    .unwrap();
  let fact = outcome.written().expect("raw change writes");
  assert_eq!(fact.raw_value, "Fin-Tech Inc");
  assert_eq!(fact.matched_value.as_deref(), Some("financial_services"));
}

#[tokio::test]
async fn unmatched_fact_improves_to_matched() {
  let s = store().await;

  let outcome = s
    .upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Seniority,
      "enrich-api",
      "VP Eng",
      None,
    ))
    .await
    .unwrap();
  let fact = outcome.written().expect("first observation inserts");
  assert_eq!(fact.match_state(), MatchState::Unmatched);

  let outcome = s
    .upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Seniority,
      "enrich-api",
      "VP Eng",
      Some("vp"),
    ))
    .await
    .unwrap();

  let fact = outcome.written().expect("improvement writes");
  assert_eq!(fact.match_state(), MatchState::Matched);
  assert_eq!(fact.matched_value.as_deref(), Some("vp"));
}

#[tokio::test]
async fn matched_value_refreshes_to_new_non_null() {
  let s = store().await;

  s.upsert_source_fact(observation(
    "person-1",
    AttributeDomain::Seniority,
    "enrich-api",
    "VP Eng",
    Some("vp"),
  ))
  .await
  .unwrap();

  let outcome = s
    .upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Seniority,
      "enrich-api",
      "VP Eng",
      Some("executive"),
    ))
    .await
    .unwrap();

  let fact = outcome.written().expect("refresh writes");
  assert_eq!(fact.matched_value.as_deref(), Some("executive"));
}

#[tokio::test]
async fn facts_are_isolated_per_source_and_domain() {
  let s = store().await;

  for source in ["a", "b"] {
    s.upsert_source_fact(observation(
      "person-1",
      AttributeDomain::Industry,
      source,
      "fintech",
      None,
    ))
    .await
    .unwrap();
  }
  s.upsert_source_fact(observation(
    "person-1",
    AttributeDomain::Seniority,
    "a",
    "vp",
    None,
  ))
  .await
  .unwrap();

  let industry = s
    .list_source_facts("person-1".into(), Some(AttributeDomain::Industry))
    .await
    .unwrap();
  assert_eq!(industry.len(), 2);

  let all = s.list_source_facts("person-1".into(), None).await.unwrap();
  assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn scan_source_facts_pages_by_cursor() {
  let s = store().await;

  for i in 0..5 {
    s.upsert_source_fact(observation(
      &format!("person-{i}"),
      AttributeDomain::Industry,
      "crawler",
      "fintech",
      None,
    ))
    .await
    .unwrap();
  }

  let first = s.scan_source_facts(None, 2).await.unwrap();
  assert_eq!(first.len(), 2);

  let (last_id, _) = first.last().unwrap();
  let second = s.scan_source_facts(Some(*last_id), 10).await.unwrap();
  assert_eq!(second.len(), 3);

  // Chunks never overlap.
  let first_ids: Vec<i64> = first.iter().map(|(id, _)| *id).collect();
  assert!(second.iter().all(|(id, _)| !first_ids.contains(id)));
}

// ─── Work history ────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_work_history_dedupes_on_natural_key() {
  let s = store().await;

  let entry = stint(
    "person-1",
    "acme",
    "Engineer",
    Some("2020-01-01"),
    None,
    "crawler",
  );
  assert!(s.append_work_history(entry.clone()).await.unwrap());
  assert!(!s.append_work_history(entry).await.unwrap());

  let history = s.list_work_history("person-1".into()).await.unwrap();
  assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn work_history_orders_by_start_date_with_undated_last() {
  let s = store().await;

  s.append_work_history(stint(
    "person-1",
    "acme",
    "Senior Engineer",
    Some("2021-06-15"),
    None,
    "crawler",
  ))
  .await
  .unwrap();
  s.append_work_history(stint(
    "person-1", "acme", "Unknown", None, None, "resume",
  ))
  .await
  .unwrap();
  s.append_work_history(stint(
    "person-1",
    "acme",
    "Engineer",
    Some("2020-01-01"),
    Some("2021-06-01"),
    "crawler",
  ))
  .await
  .unwrap();

  let history = s.list_work_history("person-1".into()).await.unwrap();
  let titles: Vec<&str> =
    history.iter().map(|e| e.title.as_str()).collect();
  assert_eq!(titles, vec!["Engineer", "Senior Engineer", "Unknown"]);
}

#[tokio::test]
async fn same_stint_from_two_sources_both_stored() {
  let s = store().await;

  assert!(
    s.append_work_history(stint(
      "person-1",
      "acme",
      "Engineer",
      Some("2020-01-01"),
      None,
      "crawler",
    ))
    .await
    .unwrap()
  );
  assert!(
    s.append_work_history(stint(
      "person-1",
      "acme",
      "Engineer",
      Some("2020-01-01"),
      None,
      "resume",
    ))
    .await
    .unwrap()
  );

  let history = s.list_work_history("person-1".into()).await.unwrap();
  assert_eq!(history.len(), 2);
}

// ─── Promotion events ────────────────────────────────────────────────────────

fn promotion(entity: &str) -> PromotionEvent {
  PromotionEvent {
    entity_key:     entity.into(),
    company_key:    "acme".into(),
    previous_title: "Engineer".into(),
    new_title:      "Senior Engineer".into(),
    promotion_date: date("2021-06-15"),
  }
}

#[tokio::test]
async fn record_promotions_dedupes_on_natural_key() {
  let s = store().await;

  let first = s.record_promotions(vec![promotion("person-1")]).await.unwrap();
  assert_eq!(first, 1);

  // Replaying the same derived event inserts nothing.
  let replay = s.record_promotions(vec![promotion("person-1")]).await.unwrap();
  assert_eq!(replay, 0);

  let events = s.list_promotions("person-1".into()).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0], promotion("person-1"));
}

#[tokio::test]
async fn promotions_are_listed_per_entity_only() {
  let s = store().await;

  s.record_promotions(vec![promotion("person-1"), promotion("person-2")])
    .await
    .unwrap();

  let events = s.list_promotions("person-1".into()).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].entity_key.as_str(), "person-1");
}
