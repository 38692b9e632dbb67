//! The Mosaic enrichment engine.
//!
//! Orchestrates the core flow over any [`mosaic_core::store::EnrichmentStore`]
//! backend:
//!
//! payload → [`extract::Extractor`] (via the resolver) → source facts →
//! [`coalesce::Coalescer`] (read path) → canonical value; separately,
//! work-history inserts nudge the [`promotion::PromotionScanner`], which
//! derives deduplicated promotion events per entity.
//!
//! Concurrency model: applies for different `(entity, source)` tuples run
//! freely in parallel; the store serializes writes to the same tuple.
//! Coalescing is read-only and lock-free. Promotion scans are bounded to one
//! entity's history and run off the write path behind a channel. Backfill
//! after a rule change proceeds in bounded, resumable chunks.

pub mod backfill;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod extract;
pub mod promotion;
pub mod rules;

pub use error::{Error, Result};
