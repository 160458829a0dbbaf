//! Symmetric signing secrets with secure memory handling.
//!
//! The secret signs and verifies every capability and session token. It is
//! loaded once at startup and shared read-only; rotating it invalidates all
//! outstanding tokens.

use std::fmt;
use std::io::Write;
use std::path::Path;

use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Shortest secret accepted (256 bits).
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest secret accepted.
const MAX_SECRET_LENGTH: usize = 512;

/// Length of freshly generated secrets (covers HS512's block size).
const GENERATED_SECRET_LENGTH: usize = 64;

/// Domain string for deriving key fingerprints.
const KEY_ID_DOMAIN: &str = "docshare 2024 signing-secret key-id";

/// Short, non-reversible fingerprint of a signing secret.
///
/// Derived with BLAKE3 in key-derivation mode so that logging it reveals
/// nothing about the secret itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId([u8; 8]);

impl KeyId {
    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Encode as hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_hex())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An HMAC signing secret.
///
/// The bytes are zeroized on drop and never appear in `Debug` output.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SigningSecret {
    bytes: Vec<u8>,
}

impl SigningSecret {
    /// Generate a new random secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_SECRET_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create from raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is shorter than
    /// [`MIN_SECRET_LENGTH`] or absurdly long.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if !(MIN_SECRET_LENGTH..=MAX_SECRET_LENGTH).contains(&bytes.len()) {
            return Err(CryptoError::InvalidKeyLength {
                min: MIN_SECRET_LENGTH,
                max: MAX_SECRET_LENGTH,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Decode from a standard base64 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid base64 or the decoded
    /// length is out of range.
    pub fn from_base64(s: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .map_err(|_| CryptoError::InvalidBase64Encoding)?,
        );
        Self::from_bytes(&bytes)
    }

    /// Decode from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or the decoded length
    /// is out of range.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes =
            Zeroizing::new(hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHexEncoding)?);
        Self::from_bytes(&bytes)
    }

    /// Use a passphrase verbatim as the secret (UTF-8 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the passphrase is too short.
    pub fn from_passphrase(passphrase: &str) -> CryptoResult<Self> {
        Self::from_bytes(passphrase.as_bytes())
    }

    /// Encode as standard base64 (careful - sensitive!).
    #[must_use]
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(&self.bytes))
    }

    /// Borrow the secret bytes (careful - sensitive!).
    #[must_use]
    pub fn expose_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fingerprint identifying this secret in logs.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        let mut hasher = blake3::Hasher::new_derive_key(KEY_ID_DOMAIN);
        hasher.update(&self.bytes);
        let digest = hasher.finalize();
        let mut id = [0u8; 8];
        id.copy_from_slice(&digest.as_bytes()[..8]);
        KeyId(id)
    }

    /// Derive an independent subkey for a named purpose.
    ///
    /// Tokens signed with one purpose's subkey never verify under another's,
    /// even though both come from the same configured secret.
    #[must_use]
    pub fn derive(&self, context: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        hasher.update(&self.bytes);
        Self {
            bytes: hasher.finalize().as_bytes().to_vec(),
        }
    }

    /// Key for producing HMAC signatures.
    #[must_use]
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.bytes)
    }

    /// Key for checking HMAC signatures.
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.bytes)
    }

    /// Load an existing secret from a file, or generate and save a new one.
    ///
    /// The file holds the raw secret bytes. New files are created atomically
    /// with mode 0o600 on Unix. Symlinks are refused, and read buffers are
    /// zeroized. Parent directories are created if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] on I/O failures or symlink detection,
    /// or [`CryptoError::InvalidKeyLength`] if the file has the wrong length.
    pub fn load_or_generate(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CryptoError::IoError(e.to_string()))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(path)
            {
                Ok(mut file) => {
                    let secret = Self::generate();
                    file.write_all(secret.expose_bytes())
                        .map_err(|e| CryptoError::IoError(e.to_string()))?;
                    return Ok(secret);
                },
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {},
                Err(e) => return Err(CryptoError::IoError(e.to_string())),
            }
        }

        #[cfg(not(unix))]
        if !path.exists() {
            let secret = Self::generate();
            let mut file =
                std::fs::File::create(path).map_err(|e| CryptoError::IoError(e.to_string()))?;
            file.write_all(secret.expose_bytes())
                .map_err(|e| CryptoError::IoError(e.to_string()))?;
            return Ok(secret);
        }

        Self::load(path)
    }

    /// Load a secret from an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] if the file is missing, unreadable or
    /// a symlink, or [`CryptoError::InvalidKeyLength`] for a bad length.
    pub fn load(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();
        let meta =
            std::fs::symlink_metadata(path).map_err(|e| CryptoError::IoError(e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(CryptoError::IoError(
                "refusing to read key file: path is a symlink".into(),
            ));
        }

        let bytes =
            Zeroizing::new(std::fs::read(path).map_err(|e| CryptoError::IoError(e.to_string()))?);
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

impl PartialEq for SigningSecret {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SigningSecret {}
