//! The extraction matcher — payloads in, source-fact upserts out.
//!
//! An [`ExtractionPlan`] describes which attribute domains a payload shape
//! carries and where each raw value lives (as a JSON pointer). Applying a
//! payload pulls each raw value, runs it through the resolver, and hands the
//! store a conditional upsert. Nothing else is touched: canonical values and
//! derived events are computed elsewhere, on read.

use std::sync::Arc;

use mosaic_core::{
  entity::{EntityKey, SourceTag},
  fact::{AttributeDomain, NewObservation, SourceFact},
  store::EnrichmentStore,
};
use mosaic_resolve::Resolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Plan ────────────────────────────────────────────────────────────────────

/// One extractable field: an attribute domain and the JSON pointer to its raw
/// value within the payload (e.g. `/company/industry`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
  pub domain:  AttributeDomain,
  pub pointer: String,
}

/// The set of fields extractable from one payload shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionPlan {
  pub fields: Vec<FieldSpec>,
}

impl ExtractionPlan {
  pub fn new(fields: Vec<FieldSpec>) -> Self { Self { fields } }

  /// Builder-style helper.
  pub fn field(
    mut self,
    domain: AttributeDomain,
    pointer: impl Into<String>,
  ) -> Self {
    self.fields.push(FieldSpec { domain, pointer: pointer.into() });
    self
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Applies enrichment payloads against a store through a resolver.
pub struct Extractor<S> {
  store:    S,
  resolver: Arc<Resolver>,
  plan:     ExtractionPlan,
}

impl<S: EnrichmentStore> Extractor<S> {
  pub fn new(store: S, resolver: Arc<Resolver>, plan: ExtractionPlan) -> Self {
    Self { store, resolver, plan }
  }

  /// Apply one payload for one `(entity, source)`, returning the facts that
  /// were actually written.
  ///
  /// Idempotent: replaying an identical payload writes nothing. A missing,
  /// empty, or wrongly-typed field skips that one domain and the rest of the
  /// payload still processes. Only storage failures propagate.
  pub async fn apply(
    &self,
    entity_key: &EntityKey,
    source: &SourceTag,
    payload: &Value,
  ) -> Result<Vec<SourceFact>, S::Error> {
    let mut written = Vec::new();

    for spec in &self.plan.fields {
      let raw_value = match raw_at(payload, &spec.pointer) {
        Some(raw) => raw,
        None => {
          tracing::debug!(
            %entity_key,
            %source,
            domain = %spec.domain,
            pointer = %spec.pointer,
            "no usable raw value in payload; skipping domain"
          );
          continue;
        }
      };

      let matched_value = self.resolver.resolve(&spec.domain, &raw_value);

      let outcome = self
        .store
        .upsert_source_fact(NewObservation {
          entity_key: entity_key.clone(),
          domain: spec.domain.clone(),
          source: source.clone(),
          raw_value,
          matched_value,
        })
        .await?;

      if let Some(fact) = outcome.written() {
        written.push(fact);
      }
    }

    Ok(written)
  }
}

/// Pull a raw value out of the payload at `pointer`.
///
/// Strings are trimmed; empty strings and non-scalar values are treated as
/// absence of signal. Numbers are accepted as their decimal rendering
/// (employee counts arrive as integers from some sources).
fn raw_at(payload: &Value, pointer: &str) -> Option<String> {
  match payload.pointer(pointer)? {
    Value::String(s) => {
      let trimmed = s.trim();
      if trimmed.is_empty() {
        None
      } else {
        Some(trimmed.to_owned())
      }
    }
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}
