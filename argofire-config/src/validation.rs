// Settings validation

use crate::{ConfigError, Result};

/// Implemented by settings types that can check their own invariants.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}",
                field, min, max
            )));
        }
        Ok(())
    }

    /// Require an absolute http(s) URL with a host.
    pub fn is_http_url(value: &str, field: &str) -> Result<()> {
        let parsed = url::Url::parse(value).map_err(|e| {
            ConfigError::ValidationError(format!("{} is not a valid URL: {}", field, e))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http(s) URL",
                field
            )));
        }
        Ok(())
    }
}
