//! # scs-blob: object storage for incident media
//!
//! `scs-blob` stores uploaded incident photos and videos in an object
//! store and tells the caller where they can be fetched from.
//!
//! ```text
//! ┌──────────────────┐
//! │ Mission workflow │  ← decides what to store
//! ├──────────────────┤
//! │ ObjectKeyStrategy│  ← decides where (<incident>/<file>)
//! ├──────────────────┤
//! │ BlobStore        │  ← MinIO / S3 / memory
//! └──────────────────┘
//! ```
//!
//! ```rust
//! use bytes::Bytes;
//! use scs_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryBlobStore::new("incident-media");
//! let key = IncidentKeyStrategy.object_key("I1", "photo.png");
//! let data = Bytes::from_static(b"\x89PNG\r\n\x1a\n");
//!
//! let put = PutObject::new(key, "image/png", data.len() as u64);
//! let stored = store.put_object(put, stream_from_bytes(data)).await?;
//!
//! let urls = BlobConfig::new("localhost:9000", "incident-media").public_urls();
//! assert_eq!(urls.url_for(&stored.key), "http://localhost:9000/incident-media/I1/photo.png");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod memory_store;
mod s3_store;
pub mod store;
mod types;

pub use config::{BlobConfig, PublicUrl};
pub use error::{BlobError, BlobResult};
pub use memory_store::{MemoryBlobStore, StoredObject};
pub use s3_store::S3CompatibleStore;
pub use store::{file_base_name, BlobStore, IncidentKeyStrategy, ObjectKeyStrategy};
pub use types::{stream_from_bytes, ByteStream, PutObject, PutResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        file_base_name, stream_from_bytes, BlobConfig, BlobError, BlobResult, BlobStore, ByteStream,
        IncidentKeyStrategy, MemoryBlobStore, ObjectKeyStrategy, PublicUrl, PutObject, PutResult,
    };
}
