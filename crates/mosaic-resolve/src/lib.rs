//! The Mosaic lookup resolver.
//!
//! Maps raw attribute values to normalized values: exact match against the
//! curated lookup table first, then ordered fallback pattern rules. The
//! active rule set is an immutable snapshot swapped atomically on refresh, so
//! concurrent resolves never block each other or the refresh, and every
//! resolve sees a consistent rule set.
//!
//! A resolver never fails: a miss is `None`, counted per domain for coverage
//! metrics and logged for later curation.

mod normalize;
mod resolver;
mod snapshot;

pub use normalize::normalize;
pub use resolver::Resolver;
pub use snapshot::RuleSnapshot;
