use std::time::Duration;

use anyhow::{Context, Result};
use scs_blob::BlobConfig;
use scs_core::{ConfigSnapshot, ConfigStore};

use crate::media::{DEFAULT_MAX_BYTES, DEFAULT_SNIFF_LEN};

/// Environment variables with this prefix override configuration keys:
/// `SCS__MINIO__BUCKET_NAME` sets `minio.bucket_name`.
pub const ENV_PREFIX: &str = "SCS__";

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub mode: String,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEncoding {
    Console,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggerSettings {
    pub level: String,
    pub encoding: LogEncoding,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct MinioSettings {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    pub region: String,
    pub secure: bool,
}

impl MinioSettings {
    pub fn blob_config(&self) -> BlobConfig {
        BlobConfig::new(self.endpoint.clone(), self.bucket_name.clone())
            .with_region(self.region.clone())
            .with_credentials(self.access_key.clone(), self.secret_key.clone())
            .secure(self.secure)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UploadSettings {
    pub max_file_bytes: u64,
    pub sniff_len: usize,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logger: LoggerSettings,
    pub database: DatabaseSettings,
    pub minio: MinioSettings,
    pub upload: UploadSettings,
}

/// Defaults for every optional key.
pub fn defaults(cfg: &mut ConfigStore) {
    cfg.set_default("server.host", "127.0.0.1");
    cfg.set_default("server.port", "8080");
    cfg.set_default("server.mode", "development");
    cfg.set_default("server.request_timeout_secs", "30");
    cfg.set_default("server.shutdown_timeout_secs", "30");

    cfg.set_default("logger.level", "info");
    cfg.set_default("logger.encoding", "console");

    cfg.set_default("database.max_connections", "5");

    cfg.set_default("minio.region", "us-east-1");
    cfg.set_default("minio.secure", "false");

    cfg.set_default("upload.max_file_bytes", DEFAULT_MAX_BYTES.to_string());
    cfg.set_default("upload.sniff_len", DEFAULT_SNIFF_LEN.to_string());
}

/// Read `.env`, overlay `SCS__*` environment variables, apply defaults.
pub fn load() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let mut cfg = ConfigStore::new();
    cfg.load_env(ENV_PREFIX);
    defaults(&mut cfg);

    Settings::from_snapshot(&cfg.snapshot())
}

fn parsed<T>(snap: &ConfigSnapshot, key: &str, value: Option<T>) -> Result<T> {
    value.with_context(|| {
        format!(
            "invalid value for configuration key '{key}': {:?}",
            snap.get(key).unwrap_or_default()
        )
    })
}

impl Settings {
    pub fn from_snapshot(snap: &ConfigSnapshot) -> Result<Self> {
        let encoding = match snap.get("logger.encoding").unwrap_or("console") {
            "json" => LogEncoding::Json,
            "console" => LogEncoding::Console,
            other => anyhow::bail!("unknown logger.encoding '{other}', expected console or json"),
        };

        Ok(Self {
            server: ServerSettings {
                host: snap.require("server.host")?,
                port: parsed(snap, "server.port", snap.get_u16("server.port"))?,
                mode: snap.get_string("server.mode").unwrap_or_else(|| "development".into()),
                request_timeout: Duration::from_secs(parsed(
                    snap,
                    "server.request_timeout_secs",
                    snap.get_u64("server.request_timeout_secs"),
                )?),
                shutdown_timeout: Duration::from_secs(parsed(
                    snap,
                    "server.shutdown_timeout_secs",
                    snap.get_u64("server.shutdown_timeout_secs"),
                )?),
            },
            logger: LoggerSettings {
                level: snap.get_string("logger.level").unwrap_or_else(|| "info".into()),
                encoding,
            },
            database: DatabaseSettings {
                url: snap.require("database.url")?,
                max_connections: parsed(
                    snap,
                    "database.max_connections",
                    snap.get_u32("database.max_connections"),
                )?,
            },
            minio: MinioSettings {
                endpoint: snap.require("minio.endpoint")?,
                access_key: snap.require("minio.access_key")?,
                secret_key: snap.require("minio.secret_key")?,
                bucket_name: snap.require("minio.bucket_name")?,
                region: snap.get_string("minio.region").unwrap_or_else(|| "us-east-1".into()),
                secure: parsed(snap, "minio.secure", snap.get_bool("minio.secure"))?,
            },
            upload: UploadSettings {
                max_file_bytes: parsed(
                    snap,
                    "upload.max_file_bytes",
                    snap.get_u64("upload.max_file_bytes"),
                )?,
                sniff_len: parsed(snap, "upload.sniff_len", snap.get_usize("upload.sniff_len"))?,
            },
        })
    }
}
