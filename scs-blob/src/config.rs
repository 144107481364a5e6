use crate::{BlobError, BlobResult};

/// Connection settings for an S3-compatible object store
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// `host:port` of the store, without scheme
    pub endpoint: String,

    pub bucket: String,

    pub region: String,

    pub access_key_id: String,

    pub secret_access_key: String,

    /// Use https for both the client and composed public URLs
    pub secure: bool,
}

impl BlobConfig {
    pub fn new<E: Into<String>, B: Into<String>>(endpoint: E, bucket: B) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            secure: false,
        }
    }

    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_credentials<A: Into<String>, S: Into<String>>(mut self, access: A, secret: S) -> Self {
        self.access_key_id = access.into();
        self.secret_access_key = secret.into();
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn validate(&self) -> BlobResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(BlobError::invalid("blob store endpoint is required"));
        }
        if self.bucket.trim().is_empty() {
            return Err(BlobError::invalid("blob store bucket is required"));
        }
        if self.endpoint.contains("://") {
            return Err(BlobError::invalid(
                "blob store endpoint must be host:port without a scheme",
            ));
        }
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Endpoint URL for the S3 client.
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.endpoint)
    }

    pub fn public_urls(&self) -> PublicUrl {
        PublicUrl::new(self.endpoint_url(), self.bucket.clone())
    }
}

/// Builds retrievable URLs from the store endpoint, bucket and object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrl {
    base: String,
    bucket: String,
}

impl PublicUrl {
    pub fn new<B: Into<String>, K: Into<String>>(base: B, bucket: K) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base, self.bucket, key.trim_start_matches('/'))
    }
}
