//! Error type for `gemdex-fetch`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET {url} → {status}")]
  Status { url: String, status: reqwest::StatusCode },

  #[error("inflate error: {0}")]
  Inflate(#[from] std::io::Error),

  #[error("decode error: {0}")]
  Decode(#[from] gemdex_core::Error),

  #[error("could not download {full_name} after {attempts} attempts: {last}")]
  Exhausted {
    full_name: String,
    attempts:  u32,
    #[source]
    last:      Box<Error>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
