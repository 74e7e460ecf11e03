//! Configuration module
//!
//! Ferry is configured from the environment (a `.env` file is honoured). The upload
//! core consumes these values but does not own them: limits, the type table,
//! timeouts and the reaper interval are handed to the components at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::MAX_CHUNK_COUNT;
use crate::models::MediaCategory;
use crate::validation::TypeTable;

const SERVER_PORT: u16 = 3000;
const MAX_ARTIFACT_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const UPLOAD_IDLE_TIMEOUT_SECS: u64 = 60;
const UPLOAD_MAX_LIFETIME_SECS: u64 = 3600;
const UPLOAD_REAPER_INTERVAL_SECS: u64 = 10;
const UPLOAD_TOMBSTONE_RETENTION_SECS: u64 = 300;
const UPLOAD_EVENT_CHANNEL_CAPACITY: usize = 64;
const WS_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;
const UPLOAD_MAX_OPEN_SESSIONS_PER_UPLOADER: usize = 8;
const WS_MAX_INFLIGHT_CHUNKS: usize = 16;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Size limits enforced while an upload is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_artifact_size: u64,
    pub max_chunk_count: u32,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_artifact_size: MAX_ARTIFACT_SIZE_BYTES,
            max_chunk_count: MAX_CHUNK_COUNT,
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
    /// "compact" (default) or "json"
    pub log_format: String,
}

/// Upload pipeline settings
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub limits: UploadLimits,
    pub type_table: TypeTable,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub reaper_interval_secs: u64,
    pub tombstone_retention_secs: u64,
    pub event_channel_capacity: usize,
    pub ws_max_message_bytes: usize,
    /// Open sessions one uploader may hold at once
    pub max_open_sessions_per_uploader: usize,
    /// Chunk frames one connection may have decoded and waiting at once
    pub max_inflight_chunks: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct FerryConfig {
    pub base: BaseConfig,
    pub uploads: UploadConfig,
}

impl FerryConfig {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = env::var("SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?;

        let mut type_table = TypeTable::default();
        for category in MediaCategory::ALL {
            let var = format!("{}_TYPES", category_env_prefix(category));
            if let Ok(list) = env::var(&var) {
                let rules = TypeTable::parse_category(category, &list)
                    .map_err(|e| anyhow::anyhow!("{}: {}", var, e))?;
                type_table.set_category(category, rules);
            }
        }

        let config = FerryConfig {
            base: BaseConfig {
                server_port,
                cors_origins,
                environment,
                http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                    .max(1),
                log_format: env::var("LOG_FORMAT")
                    .unwrap_or_else(|_| "compact".to_string())
                    .to_lowercase(),
            },
            uploads: UploadConfig {
                storage_root: env::var("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|_| "./data".to_string())
                    .into(),
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
                limits: UploadLimits {
                    max_artifact_size: env::var("MAX_ARTIFACT_SIZE_BYTES")
                        .unwrap_or_else(|_| MAX_ARTIFACT_SIZE_BYTES.to_string())
                        .parse()
                        .unwrap_or(MAX_ARTIFACT_SIZE_BYTES),
                    max_chunk_count: env::var("MAX_CHUNK_COUNT")
                        .unwrap_or_else(|_| MAX_CHUNK_COUNT.to_string())
                        .parse()
                        .unwrap_or(MAX_CHUNK_COUNT),
                },
                type_table,
                idle_timeout_secs: env::var("UPLOAD_IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| UPLOAD_IDLE_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_IDLE_TIMEOUT_SECS),
                max_lifetime_secs: env::var("UPLOAD_MAX_LIFETIME_SECS")
                    .unwrap_or_else(|_| UPLOAD_MAX_LIFETIME_SECS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_MAX_LIFETIME_SECS),
                reaper_interval_secs: env::var("UPLOAD_REAPER_INTERVAL_SECS")
                    .unwrap_or_else(|_| UPLOAD_REAPER_INTERVAL_SECS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_REAPER_INTERVAL_SECS),
                tombstone_retention_secs: env::var("UPLOAD_TOMBSTONE_RETENTION_SECS")
                    .unwrap_or_else(|_| UPLOAD_TOMBSTONE_RETENTION_SECS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_TOMBSTONE_RETENTION_SECS),
                event_channel_capacity: env::var("UPLOAD_EVENT_CHANNEL_CAPACITY")
                    .unwrap_or_else(|_| UPLOAD_EVENT_CHANNEL_CAPACITY.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_EVENT_CHANNEL_CAPACITY),
                ws_max_message_bytes: env::var("WS_MAX_MESSAGE_BYTES")
                    .unwrap_or_else(|_| WS_MAX_MESSAGE_BYTES.to_string())
                    .parse()
                    .unwrap_or(WS_MAX_MESSAGE_BYTES),
                max_open_sessions_per_uploader: env::var("UPLOAD_MAX_OPEN_SESSIONS_PER_UPLOADER")
                    .unwrap_or_else(|_| UPLOAD_MAX_OPEN_SESSIONS_PER_UPLOADER.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_MAX_OPEN_SESSIONS_PER_UPLOADER),
                max_inflight_chunks: env::var("WS_MAX_INFLIGHT_CHUNKS")
                    .unwrap_or_else(|_| WS_MAX_INFLIGHT_CHUNKS.to_string())
                    .parse()
                    .unwrap_or(WS_MAX_INFLIGHT_CHUNKS),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let uploads = &self.uploads;

        if uploads.limits.max_artifact_size == 0 {
            return Err(anyhow::anyhow!(
                "MAX_ARTIFACT_SIZE_BYTES must be greater than 0"
            ));
        }

        if uploads.limits.max_chunk_count == 0 {
            return Err(anyhow::anyhow!("MAX_CHUNK_COUNT must be greater than 0"));
        }

        if uploads.idle_timeout_secs == 0 || uploads.max_lifetime_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_IDLE_TIMEOUT_SECS and UPLOAD_MAX_LIFETIME_SECS must be greater than 0"
            ));
        }

        if uploads.max_lifetime_secs < uploads.idle_timeout_secs {
            return Err(anyhow::anyhow!(
                "UPLOAD_MAX_LIFETIME_SECS must not be shorter than UPLOAD_IDLE_TIMEOUT_SECS"
            ));
        }

        if uploads.reaper_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_REAPER_INTERVAL_SECS must be greater than 0"
            ));
        }

        if uploads.event_channel_capacity == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_EVENT_CHANNEL_CAPACITY must be greater than 0"
            ));
        }

        if uploads.max_open_sessions_per_uploader == 0 || uploads.max_inflight_chunks == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_MAX_OPEN_SESSIONS_PER_UPLOADER and WS_MAX_INFLIGHT_CHUNKS must be greater than 0"
            ));
        }

        if uploads.type_table.rules().is_empty() {
            return Err(anyhow::anyhow!(
                "At least one content type must be allowed"
            ));
        }

        if !["compact", "json"].contains(&self.base.log_format.as_str()) {
            return Err(anyhow::anyhow!("LOG_FORMAT must be 'compact' or 'json'"));
        }

        Ok(())
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.base.http_concurrency_limit
    }

    pub fn log_format(&self) -> &str {
        &self.base.log_format
    }

    pub fn storage_root(&self) -> &PathBuf {
        &self.uploads.storage_root
    }

    pub fn public_base_url(&self) -> &str {
        &self.uploads.public_base_url
    }

    pub fn upload_limits(&self) -> UploadLimits {
        self.uploads.limits
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.uploads.type_table
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.uploads.idle_timeout_secs)
    }

    pub fn max_session_lifetime(&self) -> Duration {
        Duration::from_secs(self.uploads.max_lifetime_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.uploads.reaper_interval_secs)
    }

    pub fn tombstone_retention(&self) -> Duration {
        Duration::from_secs(self.uploads.tombstone_retention_secs)
    }

    pub fn event_channel_capacity(&self) -> usize {
        self.uploads.event_channel_capacity
    }

    pub fn ws_max_message_bytes(&self) -> usize {
        self.uploads.ws_max_message_bytes
    }

    pub fn max_open_sessions_per_uploader(&self) -> usize {
        self.uploads.max_open_sessions_per_uploader
    }

    pub fn max_inflight_chunks(&self) -> usize {
        self.uploads.max_inflight_chunks
    }
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
                log_format: "compact".to_string(),
            },
            uploads: UploadConfig {
                storage_root: PathBuf::from("./data"),
                public_base_url: format!("http://localhost:{}", SERVER_PORT),
                limits: UploadLimits::default(),
                type_table: TypeTable::default(),
                idle_timeout_secs: UPLOAD_IDLE_TIMEOUT_SECS,
                max_lifetime_secs: UPLOAD_MAX_LIFETIME_SECS,
                reaper_interval_secs: UPLOAD_REAPER_INTERVAL_SECS,
                tombstone_retention_secs: UPLOAD_TOMBSTONE_RETENTION_SECS,
                event_channel_capacity: UPLOAD_EVENT_CHANNEL_CAPACITY,
                ws_max_message_bytes: WS_MAX_MESSAGE_BYTES,
                max_open_sessions_per_uploader: UPLOAD_MAX_OPEN_SESSIONS_PER_UPLOADER,
                max_inflight_chunks: WS_MAX_INFLIGHT_CHUNKS,
            },
        }
    }
}

fn category_env_prefix(category: MediaCategory) -> &'static str {
    match category {
        MediaCategory::Images => "IMAGE",
        MediaCategory::Documents => "DOCUMENT",
        MediaCategory::Video => "VIDEO",
        MediaCategory::Other => "OTHER",
    }
}
