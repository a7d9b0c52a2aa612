//! Error types for `kindred-analysis`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown founder: {0}")]
  UnknownFounder(String),

  #[error("invalid parameter `{name}`: {reason}")]
  InvalidParameter {
    name:   &'static str,
    reason: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
