pub mod config;
pub mod logging;
pub mod media;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use scs_axum::{ApiOptions, AxumApp, MultipartConfig};
use scs_blob::{BlobStore, PublicUrl, S3CompatibleStore};
use scs_core::MissionStore;

use crate::config::Settings;
use crate::media::MediaValidator;
use crate::services::adapters::PostgresStore;

/// Connect the production stores and build the HTTP app.
pub async fn build(settings: &Settings) -> Result<AxumApp> {
    let store = PostgresStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("creating tables")?;

    let blob_config = settings.minio.blob_config();
    let blobs = S3CompatibleStore::connect(&blob_config)
        .await
        .context("configuring object storage")?;
    blobs
        .ensure_bucket()
        .await
        .with_context(|| format!("preparing bucket '{}'", blob_config.bucket))?;

    Ok(build_with(
        settings,
        Arc::new(store),
        Arc::new(blobs),
        blob_config.public_urls(),
    ))
}

/// Build the HTTP app over any store implementations.
pub fn build_with(
    settings: &Settings,
    store: Arc<dyn MissionStore>,
    blobs: Arc<dyn BlobStore>,
    urls: PublicUrl,
) -> AxumApp {
    let upload = settings.upload;
    let validator = MediaValidator::new(upload.max_file_bytes, upload.sniff_len);
    let svcs = services::configure(store, blobs, urls, validator);

    let max_file = usize::try_from(upload.max_file_bytes).unwrap_or(usize::MAX);
    let options = ApiOptions {
        request_timeout: Some(settings.server.request_timeout),
        multipart: MultipartConfig::new()
            .max_file_size(max_file)
            .max_total_size(max_file.saturating_mul(8)),
    };

    AxumApp::new(svcs.missions, options)
}
