//! Configuration validation for Laba services.
//!
//! Checks that required values are present and within valid ranges before
//! the service binds its listener.

use thiserror::Error;

use crate::config::{
    CacheBackend, CacheConfig, Config, ObservabilityConfig, ServerConfig, UpstreamConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port} for {field}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ValidationError> = [
            self.server.validate(),
            self.cache.validate(),
            self.upstream.validate(),
            self.observability.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Config {
    /// Load, apply environment overrides, and validate.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "server.port".into(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "server.host".into(),
            });
        }
        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cache.ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.backend == CacheBackend::Redis {
            let parsed =
                url::Url::parse(&self.redis_url).map_err(|e| ValidationError::InvalidValue {
                    field: "cache.redis_url".into(),
                    reason: e.to_string(),
                })?;
            if !matches!(parsed.scheme(), "redis" | "rediss") {
                return Err(ValidationError::InvalidValue {
                    field: "cache.redis_url".into(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }

        Ok(())
    }
}

impl Validate for UpstreamConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.runtime.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "upstream.runtime".into(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "upstream.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        let parsed = url::Url::parse(&self.forecast_base_url).map_err(|e| {
            ValidationError::InvalidValue {
                field: "upstream.forecast_base_url".into(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidValue {
                field: "upstream.forecast_base_url".into(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}
