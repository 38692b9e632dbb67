//! The coalescing view engine — merging per-source facts into one canonical
//! value by configured source priority.
//!
//! Coalescing is a pure function of the facts on hand and the priority list;
//! it takes no locks and may run concurrently with any number of in-flight
//! writes. A read issued after a committed write on the same store handle
//! sees that write.

use mosaic_core::{
  canonical::{CanonicalAttribute, CanonicalValue},
  entity::{EntityKey, SourceTag},
  fact::{AttributeDomain, SourceFact},
  store::EnrichmentStore,
};

use crate::config::CoalesceConfig;

/// The read-side engine over any store backend.
pub struct Coalescer<S> {
  store:  S,
  config: CoalesceConfig,
}

impl<S: EnrichmentStore> Coalescer<S> {
  pub fn new(store: S, config: CoalesceConfig) -> Self {
    Self { store, config }
  }

  /// The canonical value for one `(entity, domain)` pair.
  ///
  /// A domain with no configured priority degrades to alphabetical source
  /// order and logs a configuration warning; the read still succeeds.
  pub async fn coalesce(
    &self,
    entity_key: &EntityKey,
    domain: &AttributeDomain,
  ) -> Result<CanonicalAttribute, S::Error> {
    let facts = self
      .store
      .list_source_facts(entity_key.clone(), Some(domain.clone()))
      .await?;

    let value = match self.config.priority_for(domain) {
      Some(priority) => coalesce_facts(&facts, priority),
      None => {
        tracing::warn!(
          %domain,
          "no source priority configured; using alphabetical source order"
        );
        coalesce_facts(&facts, &[])
      }
    };

    Ok(CanonicalAttribute {
      entity_key: entity_key.clone(),
      domain: domain.clone(),
      value,
    })
  }

  /// Batch form: exactly equivalent to calling [`Coalescer::coalesce`] once
  /// per `(entity, domain)` pair, in order.
  pub async fn coalesce_many(
    &self,
    entity_keys: &[EntityKey],
    domains: &[AttributeDomain],
  ) -> Result<Vec<CanonicalAttribute>, S::Error> {
    let mut out = Vec::with_capacity(entity_keys.len() * domains.len());
    for entity_key in entity_keys {
      for domain in domains {
        out.push(self.coalesce(entity_key, domain).await?);
      }
    }
    Ok(out)
  }
}

/// Merge facts by priority: first non-null matched value wins; failing that,
/// first non-empty raw value in the same order; failing that, absent.
///
/// Sources missing from the priority list sort after the listed ones,
/// alphabetically; an empty priority list is therefore plain alphabetical
/// order.
pub fn coalesce_facts(
  facts: &[SourceFact],
  priority: &[SourceTag],
) -> CanonicalValue {
  let mut ordered: Vec<&SourceFact> = facts.iter().collect();
  ordered.sort_by(|a, b| {
    source_rank(priority, &a.source)
      .cmp(&source_rank(priority, &b.source))
      .then_with(|| a.source.cmp(&b.source))
  });

  for fact in &ordered {
    if let Some(matched) = &fact.matched_value {
      return CanonicalValue::Matched {
        value:  matched.clone(),
        source: fact.source.clone(),
      };
    }
  }

  for fact in &ordered {
    if !fact.raw_value.trim().is_empty() {
      return CanonicalValue::Raw {
        value:  fact.raw_value.clone(),
        source: fact.source.clone(),
      };
    }
  }

  CanonicalValue::Absent
}

fn source_rank(priority: &[SourceTag], source: &SourceTag) -> usize {
  priority
    .iter()
    .position(|s| s == source)
    .unwrap_or(priority.len())
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use mosaic_core::{
    canonical::CanonicalValue,
    entity::SourceTag,
    fact::{AttributeDomain, SourceFact},
  };

  use super::coalesce_facts;

  fn fact(source: &str, raw: &str, matched: Option<&str>) -> SourceFact {
    SourceFact {
      entity_key:    "person-1".into(),
      domain:        AttributeDomain::Industry,
      source:        source.into(),
      raw_value:     raw.into(),
      matched_value: matched.map(str::to_owned),
      captured_at:   Utc::now(),
    }
  }

  fn tags(names: &[&str]) -> Vec<SourceTag> {
    names.iter().map(|n| SourceTag::from(*n)).collect()
  }

  #[test]
  fn priority_order_picks_the_winning_matched_value() {
    let facts = vec![
      fact("zeta", "fintech", Some("financial_services")),
      fact("alpha", "banks", Some("banking")),
    ];
    // zeta outranks alpha by configuration, not alphabet.
    let value = coalesce_facts(&facts, &tags(&["zeta", "alpha"]));
    assert!(matches!(
      value,
      CanonicalValue::Matched { value, source }
        if value == "financial_services" && source.as_str() == "zeta"
    ));
  }

  #[test]
  fn unmatched_high_priority_source_yields_to_matched_lower_one() {
    // Priority [A, B], facts {A: unmatched, B: "X"} → "X".
    let facts = vec![
      fact("a", "weird value", None),
      fact("b", "fintech", Some("X")),
    ];
    let value = coalesce_facts(&facts, &tags(&["a", "b"]));
    assert!(matches!(
      value,
      CanonicalValue::Matched { value, .. } if value == "X"
    ));
  }

  #[test]
  fn falls_back_to_raw_in_priority_order_when_nothing_matched() {
    let facts = vec![fact("b", "raw-b", None), fact("a", "raw-a", None)];
    let value = coalesce_facts(&facts, &tags(&["b", "a"]));
    assert!(matches!(
      value,
      CanonicalValue::Raw { value, source }
        if value == "raw-b" && source.as_str() == "b"
    ));
  }

  #[test]
  fn empty_priority_list_is_alphabetical() {
    let facts = vec![fact("zeta", "z", None), fact("alpha", "a", None)];
    let value = coalesce_facts(&facts, &[]);
    assert!(matches!(
      value,
      CanonicalValue::Raw { source, .. } if source.as_str() == "alpha"
    ));
  }

  #[test]
  fn unlisted_sources_sort_after_listed_ones() {
    let facts = vec![
      fact("unlisted", "u", Some("from-unlisted")),
      fact("listed", "l", Some("from-listed")),
    ];
    let value = coalesce_facts(&facts, &tags(&["listed"]));
    assert!(matches!(
      value,
      CanonicalValue::Matched { value, .. } if value == "from-listed"
    ));
  }

  #[test]
  fn no_facts_is_absent() {
    assert!(coalesce_facts(&[], &[]).is_absent());
  }

  #[test]
  fn idempotent_over_identical_input() {
    let facts = vec![fact("a", "x", Some("m"))];
    let first = coalesce_facts(&facts, &[]);
    let second = coalesce_facts(&facts, &[]);
    assert_eq!(first, second);
  }
}
