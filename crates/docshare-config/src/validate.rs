//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest lifetime any token may be configured with (30 days).
const MAX_TTL_SECS: u64 = 2_592_000;

/// Largest tolerated clock skew (5 minutes).
const MAX_LEEWAY_SECS: u64 = 300;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_tokens(config)?;
    validate_server(config)?;
    validate_storage(config)?;
    validate_passwords(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_tokens(config: &Config) -> ConfigResult<()> {
    let t = &config.tokens;

    if !["HS256", "HS384", "HS512"]
        .iter()
        .any(|alg| alg.eq_ignore_ascii_case(t.algorithm.trim()))
    {
        return Err(ConfigError::invalid(
            "tokens.algorithm",
            format!(
                "unsupported algorithm '{}'; expected one of: HS256, HS384, HS512",
                t.algorithm
            ),
        ));
    }

    if t.secret.as_deref().is_some_and(|s| !s.is_empty())
        && t.secret_file.as_deref().is_some_and(|s| !s.is_empty())
    {
        return Err(ConfigError::invalid(
            "tokens.secret",
            "set either secret or secret_file, not both",
        ));
    }

    for (field, value) in [
        ("tokens.download_ttl_secs", t.download_ttl_secs),
        ("tokens.verification_ttl_secs", t.verification_ttl_secs),
        ("tokens.session_ttl_secs", t.session_ttl_secs),
    ] {
        if value == 0 || value > MAX_TTL_SECS {
            return Err(ConfigError::invalid(
                field,
                format!("must be between 1 and {MAX_TTL_SECS} seconds"),
            ));
        }
    }

    if t.leeway_secs > MAX_LEEWAY_SECS {
        return Err(ConfigError::invalid(
            "tokens.leeway_secs",
            format!("must be at most {MAX_LEEWAY_SECS} seconds"),
        ));
    }

    Ok(())
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let url = config.server.public_base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::invalid(
            "server.public_base_url",
            format!("'{url}' must start with http:// or https://"),
        ));
    }
    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let s = &config.storage;

    if s.upload_dir.trim().is_empty() {
        return Err(ConfigError::invalid(
            "storage.upload_dir",
            "must not be empty",
        ));
    }

    if s.allowed_extensions.is_empty() {
        return Err(ConfigError::invalid(
            "storage.allowed_extensions",
            "at least one extension is required",
        ));
    }

    for ext in &s.allowed_extensions {
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::invalid(
                "storage.allowed_extensions",
                format!("'{ext}' must be alphanumeric with no leading dot"),
            ));
        }
    }

    if s.max_upload_bytes == 0 {
        return Err(ConfigError::invalid(
            "storage.max_upload_bytes",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_passwords(config: &Config) -> ConfigResult<()> {
    let p = &config.passwords;

    if !(4..=31).contains(&p.bcrypt_cost) {
        return Err(ConfigError::invalid(
            "passwords.bcrypt_cost",
            format!("{} is out of range; must be 4-31", p.bcrypt_cost),
        ));
    }

    // bcrypt ignores input past 72 bytes.
    if p.min_length == 0 || p.min_length > 72 {
        return Err(ConfigError::invalid(
            "passwords.min_length",
            "must be between 1 and 72",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(
        l.format.to_lowercase().as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(ConfigError::invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        let mut config = Config::default();
        config.tokens.algorithm = "RS256".to_owned();
        assert_eq!(field_of(validate(&config)), "tokens.algorithm");

        config.tokens.algorithm = "hs512".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let mut config = Config::default();
        config.tokens.download_ttl_secs = 0;
        assert_eq!(field_of(validate(&config)), "tokens.download_ttl_secs");
    }

    #[test]
    fn test_rejects_both_secret_sources() {
        let mut config = Config::default();
        config.tokens.secret = Some("x".repeat(32));
        config.tokens.secret_file = Some("/tmp/key".to_owned());
        assert_eq!(field_of(validate(&config)), "tokens.secret");
    }

    #[test]
    fn test_rejects_dotted_extension() {
        let mut config = Config::default();
        config.storage.allowed_extensions = vec![".pdf".to_owned()];
        assert_eq!(field_of(validate(&config)), "storage.allowed_extensions");
    }

    #[test]
    fn test_rejects_bad_url() {
        let mut config = Config::default();
        config.server.public_base_url = "localhost:8000".to_owned();
        assert_eq!(field_of(validate(&config)), "server.public_base_url");
    }

    #[test]
    fn test_rejects_bcrypt_cost() {
        let mut config = Config::default();
        config.passwords.bcrypt_cost = 3;
        assert_eq!(field_of(validate(&config)), "passwords.bcrypt_cost");
    }

    #[test]
    fn test_rejects_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }
}
