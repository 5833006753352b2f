//! The `.gemspec.rz` payload: zlib-deflated JSON.

use std::io::{Read as _, Write as _};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use gemdex_core::spec::GemSpec;

use crate::Result;

/// Inflate and deserialize a registry payload.
pub fn decode_spec(body: &[u8]) -> Result<GemSpec> {
  let mut json = Vec::new();
  ZlibDecoder::new(body).read_to_end(&mut json)?;
  Ok(GemSpec::from_json(&json)?)
}

/// Serialize and deflate a specification into a registry payload.
pub fn encode_spec(spec: &GemSpec) -> Result<Vec<u8>> {
  let json = spec.to_json()?;
  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
  encoder.write_all(&json)?;
  Ok(encoder.finish()?)
}

/// File name of a specification on the registry.
pub fn spec_file_name(name: &str, number: &str, platform: &str) -> String {
  format!(
    "{}.gemspec.rz",
    gemdex_core::platform::full_name(name, number, platform)
  )
}
