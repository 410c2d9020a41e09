//! Input byte handling and the shared HTTP runtime.
//!
//! Batch files are read fully into memory and gunzipped when they carry the
//! gzip magic bytes, whatever their extension. HTTP goes through async
//! reqwest on a shared tokio runtime, with a sync facade for rayon workers.

use std::borrow::Cow;
use std::io::{self, Read};
use std::sync::LazyLock;
use std::time::Duration;

use flate2::read::MultiGzDecoder;

use crate::error::TransportError;

/// Gzip member header magic
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Initial capacity multiplier when inflating (OAI XML compresses ~8x)
const INFLATE_RATIO: usize = 8;

/// Upper bound on the up-front reservation; `read_to_end` grows past it
const MAX_INFLATE_RESERVE: usize = 64 * 1024 * 1024;

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Timeouts for the index HTTP client
#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

/// Build a pooled async HTTP client.
///
/// Unlike a process-wide static, a failure here is returned to the caller.
pub fn http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .pool_max_idle_per_host(8)
        .build()
        .map_err(|e| TransportError::from_reqwest(&e))
}

/// Whether `bytes` starts with a gzip header.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Inflate gzip input, or borrow plain input unchanged.
///
/// Concatenated gzip members are all decoded.
pub fn gunzip_if_needed(bytes: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    if !is_gzip(bytes) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut out = Vec::with_capacity(inflate_reserve(bytes.len()));
    MultiGzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(Cow::Owned(out))
}

fn inflate_reserve(compressed: usize) -> usize {
    compressed
        .saturating_mul(INFLATE_RATIO)
        .min(MAX_INFLATE_RESERVE)
}
