//! Configuration module
//!
//! Configuration is read from the environment (after loading an optional `.env` file)
//! and validated once at startup.

use std::env;

use crate::constants::{DEFAULT_THUMBNAIL_QUALITY, DEFAULT_THUMBNAIL_SIZE};

const DEFAULT_PORT: u16 = 8087;
const DB_MAX_CONNECTIONS: u32 = 5;
const MAX_UPLOAD_SIZE_MB: usize = 10;

/// Settings shared by every process that embeds the store.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    /// Public base URL used to build image links handed back to clients.
    pub base_url: String,
    pub environment: String,
    /// `text` or `json`.
    pub log_format: String,
}

/// Image store configuration
#[derive(Clone, Debug)]
pub struct ImageStoreConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub db_max_connections: u32,
    pub storage_root: String,
    pub max_upload_bytes: usize,
    pub thumbnail_size: u32,
    pub thumbnail_quality: u8,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ImageStoreConfig>);

impl Config {
    fn inner(&self) -> &ImageStoreConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.inner().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ImageStoreConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn base_url(&self) -> &str {
        &self.inner().base.base_url
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn storage_root(&self) -> &str {
        &self.inner().storage_root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner().max_upload_bytes
    }

    pub fn thumbnail_size(&self) -> u32 {
        self.inner().thumbnail_size
    }

    pub fn thumbnail_quality(&self) -> u8 {
        self.inner().thumbnail_quality
    }
}

impl ImageStoreConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let base = BaseConfig {
            server_port,
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string())
                .to_lowercase(),
        };

        let max_upload_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let config = ImageStoreConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://imagestore.db?mode=rwc".to_string()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./images".to_string()),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            thumbnail_size: env::var("THUMBNAIL_SIZE")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_THUMBNAIL_SIZE),
            thumbnail_quality: env::var("THUMBNAIL_QUALITY")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_QUALITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_THUMBNAIL_QUALITY),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_root.trim().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_ROOT must not be empty"));
        }
        if self.database_url.trim().is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL must not be empty"));
        }
        if self.thumbnail_size == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_SIZE must be greater than zero"));
        }
        if !(1..=100).contains(&self.thumbnail_quality) {
            return Err(anyhow::anyhow!("THUMBNAIL_QUALITY must be between 1 and 100"));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than zero"));
        }
        if !matches!(self.base.log_format.as_str(), "text" | "json") {
            return Err(anyhow::anyhow!("LOG_FORMAT must be 'text' or 'json'"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageStoreConfig {
        ImageStoreConfig {
            base: BaseConfig {
                server_port: 8087,
                base_url: "http://localhost:8087".to_string(),
                environment: "development".to_string(),
                log_format: "text".to_string(),
            },
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            storage_root: "./images".to_string(),
            max_upload_bytes: 1024,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
        }
    }

    #[test]
    fn test_sample_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_thumbnail_size() {
        let mut config = sample();
        config.thumbnail_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let mut config = sample();
        config.thumbnail_quality = 0;
        assert!(config.validate().is_err());
        config.thumbnail_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_storage_root() {
        let mut config = sample();
        config.storage_root = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_detection() {
        let mut config = sample();
        config.base.environment = "Prod".to_string();
        assert!(Config(Box::new(config)).is_production());
        assert!(!Config(Box::new(sample())).is_production());
    }
}
