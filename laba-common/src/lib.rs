//! Laba Common - Shared configuration, logging, and utilities for the Laba services.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.laba/config.json` + `LABA_*` overrides)
//! - Configuration validation
//! - Logging setup with noise filtering
//! - Small string helpers used when logging upstream output

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    CacheBackend, CacheConfig, Config, DatasetsConfig, ObservabilityConfig, ServerConfig,
    UpstreamConfig,
};
pub use validation::{Validate, ValidationError, ValidationResult};
