//! Service settings that are not key material.

/// Link prefixes, upload rules and password policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Base URL links are built on, without a trailing slash.
    pub public_base_url: String,
    /// Accepted upload extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Largest accepted upload.
    pub max_upload_bytes: u64,
    /// bcrypt work factor for new passwords.
    pub bcrypt_cost: u32,
    /// Shortest accepted password.
    pub min_password_length: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8000".to_owned(),
            allowed_extensions: vec!["pptx".to_owned(), "docx".to_owned(), "xlsx".to_owned()],
            max_upload_bytes: 52_428_800,
            bcrypt_cost: 12,
            min_password_length: 8,
        }
    }
}

impl ServiceSettings {
    /// Set the base URL, dropping any trailing slashes.
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Replace the accepted extensions (normalized to lowercase, no dot).
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Set the bcrypt cost.
    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Set the upload size limit.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Link that confirms an email address.
    #[must_use]
    pub fn verify_link(&self, token: &str) -> String {
        format!("{}/client/verify-email/{token}", self.public_base_url)
    }

    /// Link that fetches a file.
    #[must_use]
    pub fn download_link(&self, token: &str) -> String {
        format!("{}/client/secure-download/{token}", self.public_base_url)
    }

    /// Whether `filename` ends in an accepted extension (case-insensitive).
    #[must_use]
    pub fn is_allowed_extension(&self, filename: &str) -> bool {
        filename.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && self
                    .allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
    }
}
