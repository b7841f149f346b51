//! Configuration module
//!
//! Settings are read from the environment (with `.env` support via dotenvy).
//! Every variable has a default except `DATABASE_URL`; `validate()` checks
//! cross-field requirements such as backend credentials before startup.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const DB_MAX_CONNECTIONS: u32 = 10;
const SERVER_PORT: u16 = 8000;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub cors_allowed_origins: Vec<String>,
    pub db_max_connections: u32,
    pub http_concurrency_limit: usize,
    // Upload admission
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub staging_dir: String,
    // Object storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Transfer queue
    pub transfer_max_workers: usize,
    pub transfer_poll_interval_ms: u64,
    pub transfer_task_timeout_secs: u64,
    pub transfer_max_retries: i32,
    pub transfer_retry_base_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const MAX_FILE_SIZE_BYTES: usize = 100 * 1024 * 1024;
        const TRANSFER_MAX_WORKERS: usize = 4;
        const TRANSFER_POLL_INTERVAL_MS: u64 = 1000;
        const TRANSFER_TASK_TIMEOUT_SECS: u64 = 600;
        const TRANSFER_MAX_RETRIES: i32 = 3;
        const TRANSFER_RETRY_BASE_SECS: u64 = 60;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str =
            env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ALLOWED_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_allowed_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,gif,pdf,txt,doc,docx".to_string())
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse::<StorageBackend>()?;

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            environment,
            cors_allowed_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            max_file_size_bytes: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            allowed_extensions,
            staging_dir: env::var("STAGING_DIR").unwrap_or_else(|_| "./temp_uploads".to_string()),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").or_else(|_| env::var("AWS_REGION")).ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            transfer_max_workers: env::var("TRANSFER_MAX_WORKERS")
                .unwrap_or_else(|_| TRANSFER_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(TRANSFER_MAX_WORKERS),
            transfer_poll_interval_ms: env::var("TRANSFER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| TRANSFER_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(TRANSFER_POLL_INTERVAL_MS),
            transfer_task_timeout_secs: env::var("TRANSFER_TASK_TIMEOUT_SECS")
                .unwrap_or_else(|_| TRANSFER_TASK_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(TRANSFER_TASK_TIMEOUT_SECS),
            transfer_max_retries: env::var("TRANSFER_MAX_RETRIES")
                .unwrap_or_else(|_| TRANSFER_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(TRANSFER_MAX_RETRIES),
            transfer_retry_base_secs: env::var("TRANSFER_RETRY_BASE_SECS")
                .unwrap_or_else(|_| TRANSFER_RETRY_BASE_SECS.to_string())
                .parse()
                .unwrap_or(TRANSFER_RETRY_BASE_SECS),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than zero"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must not be empty"));
        }
        if self.transfer_max_workers == 0 {
            return Err(anyhow::anyhow!("TRANSFER_MAX_WORKERS must be greater than zero"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.as_deref().is_none_or(str::is_empty) {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
                if self.s3_region.as_deref().is_none_or(str::is_empty) {
                    return Err(anyhow::anyhow!(
                        "S3_REGION (or AWS_REGION) must be set for the s3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.as_deref().is_none_or(str::is_empty) {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set for the local backend"
                    ));
                }
                if self
                    .local_storage_base_url
                    .as_deref()
                    .is_none_or(str::is_empty)
                {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set for the local backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/conveyor".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            environment: "development".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
            db_max_connections: 10,
            http_concurrency_limit: 10_000,
            max_file_size_bytes: 100 * 1024 * 1024,
            allowed_extensions: vec!["jpg".to_string(), "pdf".to_string()],
            staging_dir: "./temp_uploads".to_string(),
            storage_backend: StorageBackend::S3,
            s3_bucket: Some("uploads".to_string()),
            s3_region: Some("us-east-1".to_string()),
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            transfer_max_workers: 4,
            transfer_poll_interval_ms: 1000,
            transfer_task_timeout_secs: 600,
            transfer_max_retries: 3,
            transfer_retry_base_secs: 60,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_file_size() {
        let mut config = base_config();
        config.max_file_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_s3_settings() {
        let mut config = base_config();
        config.s3_bucket = None;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.s3_region = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_local_settings() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Local;
        assert!(config.validate().is_err());

        config.local_storage_path = Some("/var/lib/conveyor".to_string());
        config.local_storage_base_url = Some("http://localhost:8000/files".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
        config.environment = "prod".to_string();
        assert!(config.is_production());
    }
}
