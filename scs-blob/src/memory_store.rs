use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::RwLock;

use crate::{BlobError, BlobResult, BlobStore, ByteStream, PutObject, PutResult};

/// An object held by [`MemoryBlobStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Bytes,
}

/// In-process blob store for tests and local runs
pub struct MemoryBlobStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Stored keys in lexical order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(&self, put: PutObject, mut stream: ByteStream) -> BlobResult<PutResult> {
        let mut data = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        if data.len() as u64 != put.size {
            return Err(BlobError::upload_failed(
                &put.key,
                format!("declared size {} but stream carried {} bytes", put.size, data.len()),
            ));
        }

        let size_bytes = data.len() as u64;
        self.objects.write().await.insert(
            put.key.clone(),
            StoredObject {
                content_type: put.content_type,
                data: data.freeze(),
            },
        );

        Ok(PutResult {
            key: put.key,
            size_bytes,
            etag: None,
        })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
