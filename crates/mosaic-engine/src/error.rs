//! Error types for `mosaic-engine`.
//!
//! Most engine operations surface the backend's error type directly; this
//! enum only covers the engine's own concerns.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
