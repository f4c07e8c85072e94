//! Byte-level fixture stages.

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use strata_middleware::{Context, Middleware, Outcome, StrataError, StrataResult, Value};

/// Encodes a value as JSON bytes.
///
/// Only values with a JSON form are accepted; bytes and lazy values are
/// rejected on serialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMiddleware;

impl Middleware for JsonMiddleware {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let json = data.to_json()?;
        Ok(Outcome::ready(serde_json::to_vec(&json)?))
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let bytes = data
            .as_bytes()
            .ok_or_else(|| StrataError::unexpected("bytes", data.type_name()))?;
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Outcome::ready(json))
    }
}

/// Gzip-compresses byte buffers.
///
/// The level can be overridden per call with an integer
/// `compression_level` context entry.
#[derive(Debug, Clone, Copy)]
pub struct GzipMiddleware {
    level: Compression,
}

impl GzipMiddleware {
    /// Context key read for a per-call compression level.
    pub const LEVEL_KEY: &'static str = "compression_level";

    /// Creates a gzip stage with the default compression level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Creates a gzip stage with a fixed level (0-9).
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    fn level_for(&self, ctx: &Context) -> Compression {
        ctx.get(Self::LEVEL_KEY)
            .and_then(serde_json::Value::as_u64)
            .and_then(|level| u32::try_from(level).ok())
            .map_or(self.level, |level| Compression::new(level.min(9)))
    }
}

impl Default for GzipMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for GzipMiddleware {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn serialize(&self, data: Value, ctx: &Context) -> StrataResult<Outcome> {
        let bytes = data
            .as_bytes()
            .ok_or_else(|| StrataError::unexpected("bytes", data.type_name()))?;

        let mut encoder = GzEncoder::new(Vec::new(), self.level_for(ctx));
        encoder.write_all(bytes)?;
        let compressed = encoder.finish()?;

        Ok(Outcome::ready(Bytes::from(compressed)))
    }

    fn deserialize(&self, data: Value, _ctx: &Context) -> StrataResult<Outcome> {
        let bytes = data
            .as_bytes()
            .ok_or_else(|| StrataError::unexpected("bytes", data.type_name()))?;

        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        Ok(Outcome::ready(decompressed))
    }
}
