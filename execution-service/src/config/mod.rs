use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const MB: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub smtp: SmtpConfig,
    pub mail: MailConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub local_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_photo_bytes: usize,
    pub max_photos_per_request: usize,
    pub max_request_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub max_attachment_mb: u64,
}

impl MailConfig {
    pub fn max_attachment_bytes(&self) -> u64 {
        self.max_attachment_mb.saturating_mul(MB as u64)
    }
}

impl ExecutionConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = common_config.environment.is_prod();

        Ok(ExecutionConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://127.0.0.1:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("project_execution"), is_prod)?,
            },
            storage: StorageConfig {
                local_path: get_env("STORAGE_LOCAL_PATH", Some("uploads"), is_prod)?,
            },
            uploads: UploadConfig {
                max_photo_bytes: parse_env("UPLOAD_MAX_PHOTO_MB", 10usize)?.saturating_mul(MB),
                max_photos_per_request: parse_env("UPLOAD_MAX_PHOTOS", 10usize)?,
                max_request_bytes: parse_env("UPLOAD_MAX_REQUEST_MB", 100usize)?.saturating_mul(MB),
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: parse_env("SMTP_PORT", 587u16)?,
                user: get_env("SMTP_USER", Some(""), is_prod)?,
                password: get_env("SMTP_PASSWORD", Some(""), is_prod)?,
                from_email: get_env("SMTP_FROM_EMAIL", Some("noreply@company.com"), is_prod)?,
                from_name: get_env("SMTP_FROM_NAME", Some("Materials Tracking System"), is_prod)?,
                enabled: parse_env("SMTP_ENABLED", false)?,
            },
            mail: MailConfig {
                max_attachment_mb: parse_env("MAIL_MAX_ATTACHMENT_MB", 25u64)?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Optional tunables: fall back to `default` when unset, reject garbage.
fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, val, e))
        }),
        _ => Ok(default),
    }
}
