//! Immutable rule snapshots.
//!
//! A snapshot is built once from the curated lookup entries and fallback
//! rules and then only ever read. Refreshing the resolver means building a
//! new snapshot and swapping it in whole.

use std::collections::HashMap;

use mosaic_core::{
  fact::AttributeDomain,
  lookup::{FallbackRule, LookupEntry},
};
use regex::Regex;

use crate::normalize::normalize;

/// A fallback rule with its pattern compiled.
#[derive(Debug)]
struct CompiledRule {
  pattern:       Regex,
  matched_value: String,
}

/// Per-domain exact entries and ordered fallback rules.
#[derive(Debug, Default)]
struct DomainRules {
  exact:    HashMap<String, String>,
  fallback: Vec<CompiledRule>,
}

/// A consistent, immutable view of every domain's rules.
#[derive(Debug, Default)]
pub struct RuleSnapshot {
  domains: HashMap<AttributeDomain, DomainRules>,
}

impl RuleSnapshot {
  /// Build a snapshot from curated table rows.
  ///
  /// Exact-entry keys are normalized here so the probe-side normalization in
  /// [`crate::Resolver::resolve`] lines up even if a row was curated with
  /// stray case or whitespace. Rules are ordered by their configured
  /// position; a rule whose pattern fails to compile is skipped with a
  /// warning rather than poisoning the whole refresh.
  pub fn build(entries: Vec<LookupEntry>, mut rules: Vec<FallbackRule>) -> Self {
    let mut domains: HashMap<AttributeDomain, DomainRules> = HashMap::new();

    for entry in entries {
      let key = normalize(&entry.raw_value);
      if key.is_empty() {
        continue;
      }
      domains
        .entry(entry.domain)
        .or_default()
        .exact
        .insert(key, entry.matched_value);
    }

    rules.sort_by(|a, b| {
      a.domain.cmp(&b.domain).then(a.position.cmp(&b.position))
    });

    for rule in rules {
      let pattern = match Regex::new(&rule.pattern) {
        Ok(p) => p,
        Err(err) => {
          tracing::warn!(
            domain = %rule.domain,
            position = rule.position,
            pattern = %rule.pattern,
            %err,
            "skipping fallback rule with invalid pattern"
          );
          continue;
        }
      };
      domains.entry(rule.domain).or_default().fallback.push(CompiledRule {
        pattern,
        matched_value: rule.matched_value,
      });
    }

    Self { domains }
  }

  /// Resolve an already-normalized probe: exact entry first, then the first
  /// matching fallback rule in position order.
  pub(crate) fn lookup(
    &self,
    domain: &AttributeDomain,
    normalized: &str,
  ) -> Option<&str> {
    let rules = self.domains.get(domain)?;

    if let Some(matched) = rules.exact.get(normalized) {
      return Some(matched);
    }

    rules
      .fallback
      .iter()
      .find(|rule| rule.pattern.is_match(normalized))
      .map(|rule| rule.matched_value.as_str())
  }

  /// Number of domains with any rules at all; used in refresh logging.
  pub fn domain_count(&self) -> usize { self.domains.len() }
}
