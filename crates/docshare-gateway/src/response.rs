//! Values returned to the transport layer.

use std::fmt;

use docshare_storage::BlobStream;
use serde::{Deserialize, Serialize};

/// Result of a successful signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    /// Link the new user follows to confirm their email.
    pub verify_link: String,
}

/// Bearer credential returned by login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Session token.
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
}

impl AccessToken {
    pub(crate) fn bearer(token: String) -> Self {
        Self {
            access_token: token,
            token_type: "bearer".to_owned(),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// A time-limited download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    /// URL carrying the download capability.
    #[serde(rename = "download-link")]
    pub download_link: String,
}

/// An authorized download: the original file name and its bytes.
#[derive(Debug)]
pub struct Download {
    /// Name to present the file under.
    pub filename: String,
    /// The file contents.
    pub stream: BlobStream,
}
