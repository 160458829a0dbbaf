//! Bridge from `docshare_config::Config` to the service's domain types.
//!
//! The config crate knows nothing about keys or issuers; this module turns
//! its plain strings and integers into a [`SigningSecret`], a
//! [`TokenConfig`], a [`TtlPolicy`] and [`ServiceSettings`].

use std::sync::Arc;

use chrono::Duration;
use docshare_capabilities::{TokenAuthority, TokenConfig, TtlPolicy};
use docshare_config::{Config, TokensSection};
use docshare_crypto::{SigningAlgorithm, SigningSecret};
use docshare_storage::{LocalBlobStore, MemoryFileCatalog, MemoryUserDirectory};
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::service::FileShareService;
use crate::settings::ServiceSettings;

/// Prefix marking an inline secret as base64 rather than a passphrase.
pub const BASE64_SECRET_PREFIX: &str = "base64:";

/// Load the master signing secret described by `[tokens]`.
///
/// `secret = "base64:<data>"` is decoded; any other inline value is used as
/// a passphrase. `secret_file` is read (or created with a fresh random key)
/// as raw bytes.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if neither source is set, and
/// [`GatewayError::Crypto`] if the key is too short or cannot be read.
pub fn signing_secret(tokens: &TokensSection) -> GatewayResult<SigningSecret> {
    match (tokens.secret.as_deref(), tokens.secret_file.as_deref()) {
        (Some(inline), _) => match inline.strip_prefix(BASE64_SECRET_PREFIX) {
            Some(encoded) => Ok(SigningSecret::from_base64(encoded.trim())?),
            None => Ok(SigningSecret::from_passphrase(inline)?),
        },
        (None, Some(path)) => Ok(SigningSecret::load_or_generate(path)?),
        (None, None) => Err(GatewayError::Config(
            "no signing secret: set tokens.secret, tokens.secret_file or DOCSHARE_TOKEN_SECRET"
                .into(),
        )),
    }
}

fn seconds(field: &str, secs: u64) -> GatewayResult<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| GatewayError::Config(format!("tokens.{field} out of range: {secs}")))
}

/// Token lifetimes from `[tokens]`.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if a lifetime does not fit a duration.
pub fn ttl_policy(tokens: &TokensSection) -> GatewayResult<TtlPolicy> {
    Ok(TtlPolicy {
        email_verification: seconds("verification_ttl_secs", tokens.verification_ttl_secs)?,
        download: seconds("download_ttl_secs", tokens.download_ttl_secs)?,
        session: seconds("session_ttl_secs", tokens.session_ttl_secs)?,
    })
}

/// Signing configuration from `[tokens]`.
///
/// # Errors
///
/// Returns an error if the secret cannot be loaded or the algorithm is not
/// an HMAC variant.
pub fn token_config(tokens: &TokensSection) -> GatewayResult<TokenConfig> {
    let algorithm: SigningAlgorithm = tokens.algorithm.parse()?;
    let leeway = seconds("leeway_secs", tokens.leeway_secs)?;
    Ok(TokenConfig::new(signing_secret(tokens)?)
        .with_algorithm(algorithm)
        .with_leeway(leeway))
}

/// Per-purpose issuers from `[tokens]`.
///
/// # Errors
///
/// See [`token_config`] and [`ttl_policy`].
pub fn token_authority(tokens: &TokensSection) -> GatewayResult<TokenAuthority> {
    let config = token_config(tokens)?;
    let authority = TokenAuthority::new(&config, ttl_policy(tokens)?);
    info!(
        algorithm = %config.algorithm,
        master_key = %config.secret.key_id(),
        "token signing configured"
    );
    Ok(authority)
}

/// Link, upload and password settings.
#[must_use]
pub fn service_settings(cfg: &Config) -> ServiceSettings {
    ServiceSettings {
        min_password_length: cfg.passwords.min_length,
        ..ServiceSettings::default()
    }
    .with_public_base_url(cfg.server.public_base_url.as_str())
    .with_allowed_extensions(&cfg.storage.allowed_extensions)
    .with_max_upload_bytes(cfg.storage.max_upload_bytes)
    .with_bcrypt_cost(cfg.passwords.bcrypt_cost)
}

/// Assemble a service from configuration.
///
/// Account and file metadata live in memory; uploaded bytes go to
/// `storage.upload_dir`, which is created if missing.
///
/// # Errors
///
/// Returns an error if the signing key cannot be loaded or the upload
/// directory cannot be created.
pub async fn from_config(cfg: &Config) -> GatewayResult<FileShareService> {
    let tokens = token_authority(&cfg.tokens)?;
    let blobs = LocalBlobStore::new(&cfg.storage.upload_dir).await?;
    info!(upload_dir = %blobs.root().display(), "blob store ready");

    Ok(FileShareService::new(
        Arc::new(MemoryUserDirectory::new()),
        Arc::new(MemoryFileCatalog::new()),
        Arc::new(blobs),
        tokens,
        service_settings(cfg),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshare_capabilities::TokenPurpose;
    use docshare_core::{FileId, UserId};
    use docshare_crypto::CryptoError;

    const PASSPHRASE: &str = "correct horse battery staple, but longer";

    fn tokens_with_secret(secret: &str) -> TokensSection {
        TokensSection {
            secret: Some(secret.to_owned()),
            ..TokensSection::default()
        }
    }

    #[test]
    fn test_passphrase_secret() {
        let secret = signing_secret(&tokens_with_secret(PASSPHRASE)).unwrap();
        assert_eq!(secret.expose_bytes(), PASSPHRASE.as_bytes());
    }

    #[test]
    fn test_base64_secret() {
        let original = SigningSecret::generate();
        let inline = format!("{BASE64_SECRET_PREFIX}{}", original.to_base64().as_str());
        let secret = signing_secret(&tokens_with_secret(&inline)).unwrap();
        assert_eq!(secret.key_id(), original.key_id());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            signing_secret(&tokens_with_secret("too short")),
            Err(GatewayError::Crypto(CryptoError::InvalidKeyLength { .. }))
        ));
    }

    #[test]
    fn test_secret_file_created_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = TokensSection {
            secret_file: Some(dir.path().join("keys/token.key").display().to_string()),
            ..TokensSection::default()
        };
        let first = signing_secret(&tokens).unwrap();
        let second = signing_secret(&tokens).unwrap();
        assert_eq!(first.key_id(), second.key_id());
    }

    #[test]
    fn test_missing_secret() {
        assert!(matches!(
            signing_secret(&TokensSection::default()),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_ttl_policy_from_defaults() {
        let policy = ttl_policy(&TokensSection::default()).unwrap();
        assert_eq!(policy, TtlPolicy::default());
    }

    #[test]
    fn test_token_config() {
        let tokens = TokensSection {
            algorithm: "hs512".to_owned(),
            leeway_secs: 30,
            ..tokens_with_secret(PASSPHRASE)
        };
        let config = token_config(&tokens).unwrap();
        assert_eq!(config.algorithm, SigningAlgorithm::HS512);
        assert_eq!(config.leeway, Duration::seconds(30));

        let bad = TokensSection {
            algorithm: "RS256".to_owned(),
            ..tokens_with_secret(PASSPHRASE)
        };
        assert!(token_config(&bad).is_err());
    }

    #[test]
    fn test_same_config_same_keys() {
        let a = token_authority(&tokens_with_secret(PASSPHRASE)).unwrap();
        let b = token_authority(&tokens_with_secret(PASSPHRASE)).unwrap();

        let issued = a
            .issue(TokenPurpose::Download, UserId(3), FileId(9))
            .unwrap();
        let claim = b.verify(TokenPurpose::Download, issued.as_str()).unwrap();
        assert_eq!(claim.resource_id, FileId(9));
    }

    #[test]
    fn test_service_settings() {
        let mut cfg = Config::default();
        cfg.server.public_base_url = "https://docs.example.com/".to_owned();
        cfg.storage.allowed_extensions = vec!["PDF".to_owned()];
        cfg.passwords.bcrypt_cost = 4;

        let settings = service_settings(&cfg);
        assert_eq!(settings.public_base_url, "https://docs.example.com");
        assert_eq!(settings.allowed_extensions, ["pdf"]);
        assert_eq!(settings.bcrypt_cost, 4);
        assert_eq!(settings.min_password_length, cfg.passwords.min_length);
    }

    #[tokio::test]
    async fn test_from_config_creates_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.tokens.secret = Some(PASSPHRASE.to_owned());
        cfg.storage.upload_dir = dir.path().join("uploads").display().to_string();

        let service = from_config(&cfg).await.unwrap();
        assert!(dir.path().join("uploads").is_dir());
        assert_eq!(service.settings().public_base_url, "http://localhost:8000");
    }
}
