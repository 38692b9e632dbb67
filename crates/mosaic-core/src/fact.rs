//! Fact types — the fundamental unit of the Mosaic enrichment store.
//!
//! A source fact is one source's contribution to one attribute of one entity.
//! Facts carry attribution and are upserted in place per
//! `(entity_key, attribute_domain, source)`; the canonical merged view is
//! always computed on read, never stored on the fact itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityKey, SourceTag};

// ─── Attribute domains ───────────────────────────────────────────────────────

/// A category of normalized enrichment data.
///
/// The well-known domains get variants; anything else rides in `Custom` so a
/// new domain never requires a code change to store facts for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeDomain {
  Industry,
  Seniority,
  JobFunction,
  Location,
  EmployeeRange,
  Custom(String),
}

impl AttributeDomain {
  /// The discriminant string stored in the `domain` column.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Industry => "industry",
      Self::Seniority => "seniority",
      Self::JobFunction => "job_function",
      Self::Location => "location",
      Self::EmployeeRange => "employee_range",
      Self::Custom(name) => name,
    }
  }
}

impl From<&str> for AttributeDomain {
  fn from(s: &str) -> Self {
    match s {
      "industry" => Self::Industry,
      "seniority" => Self::Seniority,
      "job_function" => Self::JobFunction,
      "location" => Self::Location,
      "employee_range" => Self::EmployeeRange,
      other => Self::Custom(other.to_owned()),
    }
  }
}

impl From<String> for AttributeDomain {
  fn from(s: String) -> Self { Self::from(s.as_str()) }
}

impl From<AttributeDomain> for String {
  fn from(d: AttributeDomain) -> Self { d.as_str().to_owned() }
}

impl std::fmt::Display for AttributeDomain {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── SourceFact ──────────────────────────────────────────────────────────────

/// Whether a fact's raw value has been resolved to a normalized value.
///
/// Transitions are monotonic: `Unmatched → Matched` and `Matched → Matched`
/// (refresh to a different normalized value) are allowed;
/// `Matched → Unmatched` is forbidden and enforced by the upsert path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
  Unmatched,
  Matched,
}

/// One source's raw and normalized contribution to one attribute of one
/// entity. At most one row exists per `(entity_key, domain, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFact {
  pub entity_key:    EntityKey,
  pub domain:        AttributeDomain,
  pub source:        SourceTag,
  pub raw_value:     String,
  pub matched_value: Option<String>,
  /// Server-assigned timestamp of the last accepted write.
  pub captured_at:   DateTime<Utc>,
}

impl SourceFact {
  pub fn match_state(&self) -> MatchState {
    if self.matched_value.is_some() {
      MatchState::Matched
    } else {
      MatchState::Unmatched
    }
  }
}

/// Input to [`crate::store::EnrichmentStore::upsert_source_fact`].
/// `captured_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewObservation {
  pub entity_key:    EntityKey,
  pub domain:        AttributeDomain,
  pub source:        SourceTag,
  pub raw_value:     String,
  pub matched_value: Option<String>,
}

/// What a conditional source-fact upsert actually did.
///
/// `Unchanged` is the idempotence case: replaying an identical observation
/// writes nothing and bumps no timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
  Inserted(SourceFact),
  Updated(SourceFact),
  Unchanged,
}

impl UpsertOutcome {
  /// The written fact, if any write happened.
  pub fn written(self) -> Option<SourceFact> {
    match self {
      Self::Inserted(f) | Self::Updated(f) => Some(f),
      Self::Unchanged => None,
    }
  }

  pub fn is_unchanged(&self) -> bool { matches!(self, Self::Unchanged) }
}

// ─── Work history ────────────────────────────────────────────────────────────

/// One stint a person served at a company, as reported by one source.
///
/// Append-only per source; the natural key is
/// `(entity_key, company_key, start_date, source)`. A missing `start_date`
/// keeps the row storable but excludes it from temporal scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHistoryEntry {
  pub entity_key:  EntityKey,
  pub company_key: EntityKey,
  pub title:       String,
  pub start_date:  Option<NaiveDate>,
  /// `None` means the stint is ongoing as far as this source knows.
  pub end_date:    Option<NaiveDate>,
  pub source:      SourceTag,
  /// Server-assigned; insertion order is the final tie-break in scans.
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::EnrichmentStore::append_work_history`].
#[derive(Debug, Clone)]
pub struct NewWorkHistoryEntry {
  pub entity_key:  EntityKey,
  pub company_key: EntityKey,
  pub title:       String,
  pub start_date:  Option<NaiveDate>,
  pub end_date:    Option<NaiveDate>,
  pub source:      SourceTag,
}

// ─── Promotion events ────────────────────────────────────────────────────────

/// A derived signal: a title change within the same employer without an
/// intervening employer change. Never written directly by callers; the
/// detector recomputes and the store deduplicates on the full natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionEvent {
  pub entity_key:     EntityKey,
  pub company_key:    EntityKey,
  pub previous_title: String,
  pub new_title:      String,
  pub promotion_date: NaiveDate,
}
