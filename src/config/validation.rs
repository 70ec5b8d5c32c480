//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (shard count)
//! - Check references (cookie strategy exists)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControllerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ControllerConfig;
use crate::resolver::ResolverRegistry;

/// Upper bound of `store.shards`.
pub const MAX_SHARDS: usize = 1024;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("store.shards must be at most {max}, got {value}")]
    TooManyShards { value: usize, max: usize },

    #[error("resolver.cookie_strategy '{0}' is not a known strategy")]
    UnknownCookieStrategy(String),

    #[error("observability.log_level '{0}' is not a valid level")]
    InvalidLogLevel(String),
}

/// Check a parsed configuration against the registry of built-in strategies.
pub fn validate_config(config: &ControllerConfig) -> Result<(), Vec<ValidationError>> {
    validate_with(config, &ResolverRegistry::with_builtins())
}

/// Check a parsed configuration against a given strategy registry.
pub fn validate_with(config: &ControllerConfig, registry: &ResolverRegistry) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.shards > MAX_SHARDS {
        errors.push(ValidationError::TooManyShards {
            value: config.store.shards,
            max: MAX_SHARDS,
        });
    }

    let strategy = &config.resolver.cookie_strategy;
    if !strategy.is_empty() && !registry.names().contains(&strategy.as_str()) {
        errors.push(ValidationError::UnknownCookieStrategy(strategy.clone()));
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
