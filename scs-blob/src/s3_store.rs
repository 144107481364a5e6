use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use futures::StreamExt;

use crate::{BlobConfig, BlobError, BlobResult, BlobStore, ByteStream, PutObject, PutResult};

/// Production store for MinIO and other S3-compatible services
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3CompatibleStore {
    /// Build a client for `config`. No network call is made here; use
    /// [`S3CompatibleStore::ensure_bucket`] to verify connectivity.
    pub async fn connect(config: &BlobConfig) -> BlobResult<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "scs-blob",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url())
            .load()
            .await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true) // MinIO serves buckets by path
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        })
    }

    /// Create the bucket, or accept it if it already exists.
    pub async fn ensure_bucket(&self) -> BlobResult<()> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        let create_err = match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, "created bucket");
                return Ok(());
            }
            Err(err) => err,
        };

        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket = %self.bucket, "bucket already exists");
                Ok(())
            }
            Err(_) => Err(Self::map_aws_error(create_err)),
        }
    }

    async fn collect_stream(stream: &mut ByteStream) -> BlobResult<Vec<u8>> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> BlobError {
        BlobError::backend(err)
    }
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn put_object(&self, put: PutObject, mut stream: ByteStream) -> BlobResult<PutResult> {
        let data = Self::collect_stream(&mut stream).await?;
        let size = data.len() as u64;
        if size != put.size {
            return Err(BlobError::upload_failed(
                &put.key,
                format!("declared size {} but stream carried {} bytes", put.size, size),
            ));
        }

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&put.key)
            .content_type(&put.content_type)
            .content_length(size as i64)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(|err| {
                tracing::error!(key = %put.key, error = %err, "failed to upload object");
                Self::map_aws_error(err)
            })?;

        Ok(PutResult {
            key: put.key,
            size_bytes: size,
            etag: result.e_tag().map(str::to_string),
        })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
