//! Configuration module
//!
//! Settings are read from the environment (after loading a `.env` file if
//! present). Every value except `DATABASE_URL` has a default.

use std::env;
use std::path::PathBuf;

use crate::constants::{DATASETS_DIR, UPLOADS_DIR};

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const INGEST_MAX_WORKERS: usize = 2;
const INGEST_QUEUE_CAPACITY: usize = 64;
const ARCHIVE_MAX_TOTAL_BYTES: u64 = 4 * 1024 * 1024 * 1024;
const ARCHIVE_MAX_ENTRIES: usize = 100_000;

/// Output format for log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Resource bounds applied while unpacking one archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractionLimits {
    /// Maximum total uncompressed bytes written.
    pub max_total_bytes: u64,
    /// Maximum number of archive entries (files and directories).
    pub max_entries: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_total_bytes: ARCHIVE_MAX_TOTAL_BYTES,
            max_entries: ARCHIVE_MAX_ENTRIES,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TroveConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Root holding `datasets/` and `uploads/`.
    pub data_dir: PathBuf,
    pub ingest_max_workers: usize,
    pub ingest_queue_capacity: usize,
    pub extraction_limits: ExtractionLimits,
    pub log_format: LogFormat,
}

impl Default for TroveConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            data_dir: PathBuf::from("./data"),
            ingest_max_workers: INGEST_MAX_WORKERS,
            ingest_queue_capacity: INGEST_QUEUE_CAPACITY,
            extraction_limits: ExtractionLimits::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl TroveConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(anyhow::anyhow!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                ))
            }
        };

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            data_dir: env::var("TROVE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            ingest_max_workers: env::var("INGEST_MAX_WORKERS")
                .unwrap_or_else(|_| INGEST_MAX_WORKERS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("INGEST_MAX_WORKERS must be a valid number"))?,
            ingest_queue_capacity: env::var("INGEST_QUEUE_CAPACITY")
                .unwrap_or_else(|_| INGEST_QUEUE_CAPACITY.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("INGEST_QUEUE_CAPACITY must be a valid number"))?,
            extraction_limits: ExtractionLimits {
                max_total_bytes: env::var("ARCHIVE_MAX_TOTAL_BYTES")
                    .unwrap_or_else(|_| ARCHIVE_MAX_TOTAL_BYTES.to_string())
                    .parse()
                    .map_err(|_| {
                        anyhow::anyhow!("ARCHIVE_MAX_TOTAL_BYTES must be a valid number")
                    })?,
                max_entries: env::var("ARCHIVE_MAX_ENTRIES")
                    .unwrap_or_else(|_| ARCHIVE_MAX_ENTRIES.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("ARCHIVE_MAX_ENTRIES must be a valid number"))?,
            },
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.ingest_max_workers == 0 {
            return Err(anyhow::anyhow!("INGEST_MAX_WORKERS must be at least 1"));
        }
        if self.ingest_queue_capacity == 0 {
            return Err(anyhow::anyhow!("INGEST_QUEUE_CAPACITY must be at least 1"));
        }
        if self.extraction_limits.max_total_bytes == 0 {
            return Err(anyhow::anyhow!("ARCHIVE_MAX_TOTAL_BYTES must be greater than 0"));
        }
        if self.extraction_limits.max_entries == 0 {
            return Err(anyhow::anyhow!("ARCHIVE_MAX_ENTRIES must be greater than 0"));
        }
        Ok(())
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.data_dir.join(DATASETS_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR)
    }
}
