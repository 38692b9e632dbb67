//! [`SqliteStore`] — the SQLite implementation of [`EnrichmentStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use mosaic_core::{
  entity::{EntityKey, SourceTag},
  fact::{
    AttributeDomain, NewObservation, NewWorkHistoryEntry, PromotionEvent,
    SourceFact, UpsertOutcome, WorkHistoryEntry,
  },
  lookup::{FallbackRule, LookupEntry},
  store::{EnrichmentStore, ScanCursor},
};

use crate::{
  encode::{
    RawFallbackRule, RawLookupEntry, RawPromotionEvent, RawSourceFact,
    RawWorkHistoryEntry, encode_date, encode_domain, encode_dt,
  },
  schema::SCHEMA,
  Error, Result,
};

/// What the conditional source-fact upsert decided, before the domain types
/// are reassembled outside the connection closure.
enum UpsertRow {
  Inserted,
  Updated,
  Unchanged,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mosaic enrichment store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All access
/// funnels through one connection, which serializes same-tuple writes.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EnrichmentStore impl ────────────────────────────────────────────────────

impl EnrichmentStore for SqliteStore {
  type Error = Error;

  // ── Lookup tables ─────────────────────────────────────────────────────────

  async fn insert_lookup_entry(&self, entry: LookupEntry) -> Result<()> {
    let domain_str = encode_domain(&entry.domain);
    let raw = entry.raw_value.clone();
    let matched = entry.matched_value;

    let domain_for_err = domain_str.clone();
    let raw_for_err = raw.clone();

    let inserted: bool = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO lookup_entries (domain, raw_value, matched_value)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![domain_str, raw, matched],
        ) {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(
        mosaic_core::Error::DuplicateLookupEntry {
          domain:    domain_for_err,
          raw_value: raw_for_err,
        }
        .into(),
      );
    }
    Ok(())
  }

  async fn update_lookup_entry(&self, entry: LookupEntry) -> Result<()> {
    let domain_str = encode_domain(&entry.domain);
    let raw = entry.raw_value.clone();
    let matched = entry.matched_value;

    let domain_for_err = domain_str.clone();
    let raw_for_err = raw.clone();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE lookup_entries SET matched_value = ?3
           WHERE domain = ?1 AND raw_value = ?2",
          rusqlite::params![domain_str, raw, matched],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(
        mosaic_core::Error::LookupEntryNotFound {
          domain:    domain_for_err,
          raw_value: raw_for_err,
        }
        .into(),
      );
    }
    Ok(())
  }

  async fn list_lookup_entries(
    &self,
    domain: Option<AttributeDomain>,
  ) -> Result<Vec<LookupEntry>> {
    let domain_str = domain.as_ref().map(encode_domain);

    let raws: Vec<RawLookupEntry> = self
      .conn
      .call(move |conn| {
        let map_row = |row: &rusqlite::Row<'_>| {
          Ok(RawLookupEntry {
            domain:        row.get(0)?,
            raw_value:     row.get(1)?,
            matched_value: row.get(2)?,
          })
        };

        let rows = if let Some(d) = domain_str {
          let mut stmt = conn.prepare(
            "SELECT domain, raw_value, matched_value FROM lookup_entries
             WHERE domain = ?1 ORDER BY raw_value",
          )?;
          stmt
            .query_map(rusqlite::params![d], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT domain, raw_value, matched_value FROM lookup_entries
             ORDER BY domain, raw_value",
          )?;
          stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawLookupEntry::into_entry).collect())
  }

  async fn insert_fallback_rule(&self, rule: FallbackRule) -> Result<()> {
    let domain_str = encode_domain(&rule.domain);
    let position = rule.position;
    let pattern = rule.pattern;
    let matched = rule.matched_value;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO fallback_rules (domain, position, pattern, matched_value)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![domain_str, position, pattern, matched],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_fallback_rules(
    &self,
    domain: Option<AttributeDomain>,
  ) -> Result<Vec<FallbackRule>> {
    let domain_str = domain.as_ref().map(encode_domain);

    let raws: Vec<RawFallbackRule> = self
      .conn
      .call(move |conn| {
        let map_row = |row: &rusqlite::Row<'_>| {
          Ok(RawFallbackRule {
            domain:        row.get(0)?,
            position:      row.get(1)?,
            pattern:       row.get(2)?,
            matched_value: row.get(3)?,
          })
        };

        let rows = if let Some(d) = domain_str {
          let mut stmt = conn.prepare(
            "SELECT domain, position, pattern, matched_value
             FROM fallback_rules WHERE domain = ?1 ORDER BY position",
          )?;
          stmt
            .query_map(rusqlite::params![d], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT domain, position, pattern, matched_value
             FROM fallback_rules ORDER BY domain, position",
          )?;
          stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawFallbackRule::into_rule).collect())
  }

  // ── Source facts ──────────────────────────────────────────────────────────

  async fn upsert_source_fact(
    &self,
    observation: NewObservation,
  ) -> Result<UpsertOutcome> {
    let now = Utc::now();
    let now_str = encode_dt(now);

    let entity_str = observation.entity_key.as_str().to_owned();
    let domain_str = encode_domain(&observation.domain);
    let source_str = observation.source.as_str().to_owned();
    let raw = observation.raw_value.clone();
    let matched = observation.matched_value.clone();

    let row: UpsertRow = self
      .conn
      .call(move |conn| {
        let existing: Option<(String, Option<String>)> = conn
          .query_row(
            "SELECT raw_value, matched_value FROM source_facts
             WHERE entity_key = ?1 AND domain = ?2 AND source = ?3",
            rusqlite::params![entity_str, domain_str, source_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let Some((old_raw, old_matched)) = existing else {
          conn.execute(
            "INSERT INTO source_facts
               (entity_key, domain, source, raw_value, matched_value, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
              entity_str, domain_str, source_str, raw, matched, now_str,
            ],
          )?;
          return Ok(UpsertRow::Inserted);
        };

        if old_raw != raw {
          // New raw value: write it, but never degrade matched to null.
          let final_matched = matched.or(old_matched);
          conn.execute(
            "UPDATE source_facts
             SET raw_value = ?4, matched_value = ?5, captured_at = ?6
             WHERE entity_key = ?1 AND domain = ?2 AND source = ?3",
            rusqlite::params![
              entity_str, domain_str, source_str, raw, final_matched, now_str,
            ],
          )?;
          return Ok(UpsertRow::Updated);
        }

        let improves = old_matched.is_none() && matched.is_some();
        let refreshes = matched.is_some() && matched != old_matched;
        if improves || refreshes {
          conn.execute(
            "UPDATE source_facts
             SET matched_value = ?4, captured_at = ?5
             WHERE entity_key = ?1 AND domain = ?2 AND source = ?3",
            rusqlite::params![
              entity_str, domain_str, source_str, matched, now_str,
            ],
          )?;
          return Ok(UpsertRow::Updated);
        }

        Ok(UpsertRow::Unchanged)
      })
      .await?;

    let fact = |matched_value| SourceFact {
      entity_key: observation.entity_key.clone(),
      domain: observation.domain.clone(),
      source: observation.source.clone(),
      raw_value: observation.raw_value.clone(),
      matched_value,
      captured_at: now,
    };

    Ok(match row {
      UpsertRow::Inserted => {
        UpsertOutcome::Inserted(fact(observation.matched_value.clone()))
      }
      UpsertRow::Updated => {
        // Re-read the tuple so the returned fact reflects exactly what was
        // written (matched may have been preserved from the old row).
        match self
          .get_source_fact(
            observation.entity_key.clone(),
            observation.domain.clone(),
            observation.source.clone(),
          )
          .await?
        {
          Some(written) => UpsertOutcome::Updated(written),
          None => UpsertOutcome::Updated(fact(observation.matched_value.clone())),
        }
      }
      UpsertRow::Unchanged => UpsertOutcome::Unchanged,
    })
  }

  async fn get_source_fact(
    &self,
    entity_key: EntityKey,
    domain: AttributeDomain,
    source: SourceTag,
  ) -> Result<Option<SourceFact>> {
    let entity_str = entity_key.as_str().to_owned();
    let domain_str = encode_domain(&domain);
    let source_str = source.as_str().to_owned();

    let raw: Option<RawSourceFact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT entity_key, domain, source, raw_value, matched_value,
                      captured_at
               FROM source_facts
               WHERE entity_key = ?1 AND domain = ?2 AND source = ?3",
              rusqlite::params![entity_str, domain_str, source_str],
              |row| {
                Ok(RawSourceFact {
                  entity_key:    row.get(0)?,
                  domain:        row.get(1)?,
                  source:        row.get(2)?,
                  raw_value:     row.get(3)?,
                  matched_value: row.get(4)?,
                  captured_at:   row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSourceFact::into_fact).transpose()
  }

  async fn list_source_facts(
    &self,
    entity_key: EntityKey,
    domain: Option<AttributeDomain>,
  ) -> Result<Vec<SourceFact>> {
    let entity_str = entity_key.as_str().to_owned();
    let domain_str = domain.as_ref().map(encode_domain);

    let raws: Vec<RawSourceFact> = self
      .conn
      .call(move |conn| {
        let map_row = |row: &rusqlite::Row<'_>| {
          Ok(RawSourceFact {
            entity_key:    row.get(0)?,
            domain:        row.get(1)?,
            source:        row.get(2)?,
            raw_value:     row.get(3)?,
            matched_value: row.get(4)?,
            captured_at:   row.get(5)?,
          })
        };

        let rows = if let Some(d) = domain_str {
          let mut stmt = conn.prepare(
            "SELECT entity_key, domain, source, raw_value, matched_value,
                    captured_at
             FROM source_facts
             WHERE entity_key = ?1 AND domain = ?2
             ORDER BY source",
          )?;
          stmt
            .query_map(rusqlite::params![entity_str, d], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT entity_key, domain, source, raw_value, matched_value,
                    captured_at
             FROM source_facts
             WHERE entity_key = ?1
             ORDER BY domain, source",
          )?;
          stmt
            .query_map(rusqlite::params![entity_str], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSourceFact::into_fact).collect()
  }

  async fn scan_source_facts(
    &self,
    cursor: ScanCursor,
    limit: usize,
  ) -> Result<Vec<(i64, SourceFact)>> {
    let after = cursor.unwrap_or(0);
    let limit = limit as i64;

    let raws: Vec<(i64, RawSourceFact)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, entity_key, domain, source, raw_value, matched_value,
                  captured_at
           FROM source_facts
           WHERE id > ?1
           ORDER BY id
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after, limit], |row| {
            Ok((
              row.get::<_, i64>(0)?,
              RawSourceFact {
                entity_key:    row.get(1)?,
                domain:        row.get(2)?,
                source:        row.get(3)?,
                raw_value:     row.get(4)?,
                matched_value: row.get(5)?,
                captured_at:   row.get(6)?,
              },
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(id, raw)| Ok((id, raw.into_fact()?)))
      .collect()
  }

  // ── Work history ──────────────────────────────────────────────────────────

  async fn append_work_history(
    &self,
    entry: NewWorkHistoryEntry,
  ) -> Result<bool> {
    let now_str = encode_dt(Utc::now());
    let entity_str = entry.entity_key.as_str().to_owned();
    let company_str = entry.company_key.as_str().to_owned();
    let title = entry.title;
    let start_str = entry.start_date.map(encode_date);
    let end_str = entry.end_date.map(encode_date);
    let source_str = entry.source.as_str().to_owned();

    let inserted: bool = self
      .conn
      .call(move |conn| {
        // `IS` rather than `=` so undated rows also deduplicate.
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM work_history
             WHERE entity_key = ?1 AND company_key = ?2 AND source = ?3
               AND start_date IS ?4",
            rusqlite::params![entity_str, company_str, source_str, start_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO work_history
             (entity_key, company_key, title, start_date, end_date, source,
              recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            entity_str, company_str, title, start_str, end_str, source_str,
            now_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    Ok(inserted)
  }

  async fn list_work_history(
    &self,
    entity_key: EntityKey,
  ) -> Result<Vec<WorkHistoryEntry>> {
    let entity_str = entity_key.as_str().to_owned();

    let raws: Vec<RawWorkHistoryEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_key, company_key, title, start_date, end_date,
                  source, recorded_at
           FROM work_history
           WHERE entity_key = ?1
           ORDER BY start_date IS NULL, start_date, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![entity_str], |row| {
            Ok(RawWorkHistoryEntry {
              entity_key:  row.get(0)?,
              company_key: row.get(1)?,
              title:       row.get(2)?,
              start_date:  row.get(3)?,
              end_date:    row.get(4)?,
              source:      row.get(5)?,
              recorded_at: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawWorkHistoryEntry::into_entry)
      .collect()
  }

  // ── Promotion events ──────────────────────────────────────────────────────

  async fn record_promotions(
    &self,
    events: Vec<PromotionEvent>,
  ) -> Result<usize> {
    if events.is_empty() {
      return Ok(0);
    }
    let now_str = encode_dt(Utc::now());

    let rows: Vec<(String, String, String, String, String)> = events
      .into_iter()
      .map(|e| {
        (
          e.entity_key.as_str().to_owned(),
          e.company_key.as_str().to_owned(),
          e.previous_title,
          e.new_title,
          encode_date(e.promotion_date),
        )
      })
      .collect();

    let new_count: usize = self
      .conn
      .call(move |conn| {
        let mut inserted = 0;
        for (entity, company, prev, new, date) in rows {
          inserted += conn.execute(
            "INSERT OR IGNORE INTO promotion_events
               (entity_key, company_key, previous_title, new_title,
                promotion_date, detected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![entity, company, prev, new, date, now_str],
          )?;
        }
        Ok(inserted)
      })
      .await?;

    Ok(new_count)
  }

  async fn list_promotions(
    &self,
    entity_key: EntityKey,
  ) -> Result<Vec<PromotionEvent>> {
    let entity_str = entity_key.as_str().to_owned();

    let raws: Vec<RawPromotionEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_key, company_key, previous_title, new_title,
                  promotion_date
           FROM promotion_events
           WHERE entity_key = ?1
           ORDER BY promotion_date, company_key, new_title",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![entity_str], |row| {
            Ok(RawPromotionEvent {
              entity_key:     row.get(0)?,
              company_key:    row.get(1)?,
              previous_title: row.get(2)?,
              new_title:      row.get(3)?,
              promotion_date: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawPromotionEvent::into_event)
      .collect()
  }
}
