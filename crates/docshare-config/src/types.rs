//! Configuration types for the docshare backend.
//!
//! Self-contained: no dependencies on other internal docshare crates.
//! Conversion into domain types happens where the service is assembled.
//! Every struct implements [`Default`] so that a bare `[section]` header
//! produces a working configuration.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token signing key, algorithm and lifetimes.
    pub tokens: TokensSection,
    /// Public URLs.
    pub server: ServerSection,
    /// Upload location and accepted file types.
    pub storage: StorageSection,
    /// Password hashing policy.
    pub passwords: PasswordsSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// TokensSection
// ---------------------------------------------------------------------------

/// Token signing settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TokensSection {
    /// Inline secret: a passphrase, or `base64:<data>`. Prefer
    /// `DOCSHARE_TOKEN_SECRET` or `secret_file` over storing it here.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    /// Path to a file holding the raw secret bytes. Created with a fresh
    /// random secret if missing.
    pub secret_file: Option<String>,
    /// `HS256`, `HS384` or `HS512`.
    pub algorithm: String,
    /// Download link lifetime.
    pub download_ttl_secs: u64,
    /// Email verification link lifetime.
    pub verification_ttl_secs: u64,
    /// Bearer session lifetime.
    pub session_ttl_secs: u64,
    /// Clock-skew tolerance applied to `exp`.
    pub leeway_secs: u64,
}

impl std::fmt::Debug for TokensSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokensSection")
            .field("has_secret", &self.secret.is_some())
            .field("secret_file", &self.secret_file)
            .field("algorithm", &self.algorithm)
            .field("download_ttl_secs", &self.download_ttl_secs)
            .field("verification_ttl_secs", &self.verification_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl Serialize for TokensSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TokensSection", 6)?;
        // secret is intentionally omitted.
        state.serialize_field("secret_file", &self.secret_file)?;
        state.serialize_field("algorithm", &self.algorithm)?;
        state.serialize_field("download_ttl_secs", &self.download_ttl_secs)?;
        state.serialize_field("verification_ttl_secs", &self.verification_ttl_secs)?;
        state.serialize_field("session_ttl_secs", &self.session_ttl_secs)?;
        state.serialize_field("leeway_secs", &self.leeway_secs)?;
        state.end()
    }
}

impl Default for TokensSection {
    fn default() -> Self {
        Self {
            secret: None,
            secret_file: None,
            algorithm: "HS256".to_owned(),
            download_ttl_secs: 900,
            verification_ttl_secs: 86_400,
            session_ttl_secs: 1_800,
            leeway_secs: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// Public-facing server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Base URL that verification and download links are built on.
    pub public_base_url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8000".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Uploaded file storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory uploaded bytes are written to.
    pub upload_dir: String,
    /// Accepted extensions, without the dot, compared case-insensitively.
    pub allowed_extensions: Vec<String>,
    /// Largest accepted upload.
    pub max_upload_bytes: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            upload_dir: "./uploads".to_owned(),
            allowed_extensions: vec!["pptx".to_owned(), "docx".to_owned(), "xlsx".to_owned()],
            max_upload_bytes: 52_428_800,
        }
    }
}

// ---------------------------------------------------------------------------
// PasswordsSection
// ---------------------------------------------------------------------------

/// Password policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordsSection {
    /// bcrypt work factor (4-31).
    pub bcrypt_cost: u32,
    /// Minimum password length in characters.
    pub min_length: usize,
}

impl Default for PasswordsSection {
    fn default() -> Self {
        Self {
            bcrypt_cost: 12,
            min_length: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["docshare_gateway=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
