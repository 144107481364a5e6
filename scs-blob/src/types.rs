use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;

/// Stream of bytes for object content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn stream_from_bytes(data: Bytes) -> ByteStream {
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}

/// Request to store one object
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub content_type: String,
    pub size: u64,
}

impl PutObject {
    pub fn new<K: Into<String>, C: Into<String>>(key: K, content_type: C, size: u64) -> Self {
        Self {
            key: key.into(),
            content_type: content_type.into(),
            size,
        }
    }
}

/// Result of a successful put operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    /// Key the object is retrievable under
    pub key: String,
    /// Size the store actually persisted
    pub size_bytes: u64,
    pub etag: Option<String>,
}
