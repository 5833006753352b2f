//! Retrieval of gem specifications from the remote registry.
//!
//! Specifications are addressed as `{name}-{version}[-{platform}].gemspec.rz`
//! under the configured registry URL. The payload is a zlib-deflated JSON
//! document; see [`codec`].

pub mod codec;
pub mod error;
mod fetcher;

pub use error::{Error, Result};
pub use fetcher::SpecFetcher;
