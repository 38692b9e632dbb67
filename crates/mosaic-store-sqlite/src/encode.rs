//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! domains and entity keys as their plain string forms.

use chrono::{DateTime, NaiveDate, Utc};
use mosaic_core::{
  fact::{AttributeDomain, PromotionEvent, SourceFact, WorkHistoryEntry},
  lookup::{FallbackRule, LookupEntry},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AttributeDomain ─────────────────────────────────────────────────────────

pub fn encode_domain(d: &AttributeDomain) -> String { d.as_str().to_owned() }

pub fn decode_domain(s: &str) -> AttributeDomain { AttributeDomain::from(s) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `source_facts` row.
pub struct RawSourceFact {
  pub entity_key:    String,
  pub domain:        String,
  pub source:        String,
  pub raw_value:     String,
  pub matched_value: Option<String>,
  pub captured_at:   String,
}

impl RawSourceFact {
  pub fn into_fact(self) -> Result<SourceFact> {
    Ok(SourceFact {
      entity_key:    self.entity_key.into(),
      domain:        decode_domain(&self.domain),
      source:        self.source.into(),
      raw_value:     self.raw_value,
      matched_value: self.matched_value,
      captured_at:   decode_dt(&self.captured_at)?,
    })
  }
}

/// Raw strings read directly from a `work_history` row.
pub struct RawWorkHistoryEntry {
  pub entity_key:  String,
  pub company_key: String,
  pub title:       String,
  pub start_date:  Option<String>,
  pub end_date:    Option<String>,
  pub source:      String,
  pub recorded_at: String,
}

impl RawWorkHistoryEntry {
  pub fn into_entry(self) -> Result<WorkHistoryEntry> {
    Ok(WorkHistoryEntry {
      entity_key:  self.entity_key.into(),
      company_key: self.company_key.into(),
      title:       self.title,
      start_date:  self.start_date.as_deref().map(decode_date).transpose()?,
      end_date:    self.end_date.as_deref().map(decode_date).transpose()?,
      source:      self.source.into(),
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `promotion_events` row.
pub struct RawPromotionEvent {
  pub entity_key:     String,
  pub company_key:    String,
  pub previous_title: String,
  pub new_title:      String,
  pub promotion_date: String,
}

impl RawPromotionEvent {
  pub fn into_event(self) -> Result<PromotionEvent> {
    Ok(PromotionEvent {
      entity_key:     self.entity_key.into(),
      company_key:    self.company_key.into(),
      previous_title: self.previous_title,
      new_title:      self.new_title,
      promotion_date: decode_date(&self.promotion_date)?,
    })
  }
}

/// Raw strings read directly from a `lookup_entries` row.
pub struct RawLookupEntry {
  pub domain:        String,
  pub raw_value:     String,
  pub matched_value: String,
}

impl RawLookupEntry {
  pub fn into_entry(self) -> LookupEntry {
    LookupEntry {
      domain:        decode_domain(&self.domain),
      raw_value:     self.raw_value,
      matched_value: self.matched_value,
    }
  }
}

/// Raw values read directly from a `fallback_rules` row.
pub struct RawFallbackRule {
  pub domain:        String,
  pub position:      u32,
  pub pattern:       String,
  pub matched_value: String,
}

impl RawFallbackRule {
  pub fn into_rule(self) -> FallbackRule {
    FallbackRule {
      domain:        decode_domain(&self.domain),
      position:      self.position,
      pattern:       self.pattern,
      matched_value: self.matched_value,
    }
  }
}
