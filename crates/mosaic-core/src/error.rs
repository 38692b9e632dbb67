//! Error types for `mosaic-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An exact-match entry already exists for `(domain, raw_value)`; the
  /// explicit update path must be used instead.
  #[error("duplicate lookup entry for domain {domain:?}, raw value {raw_value:?}")]
  DuplicateLookupEntry { domain: String, raw_value: String },

  #[error("lookup entry not found for domain {domain:?}, raw value {raw_value:?}")]
  LookupEntryNotFound { domain: String, raw_value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
