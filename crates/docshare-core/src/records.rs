//! Metadata records for users and files.
//!
//! These are the shapes the storage layer persists and returns. Password
//! hashes are opaque strings; hashing lives in `docshare-crypto`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{FileId, Role, Timestamp, UserId};

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account identifier.
    pub id: UserId,
    /// Login email (unique).
    pub email: String,
    /// Password hash (bcrypt modular-crypt string).
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Whether the email address has been confirmed.
    pub is_verified: bool,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Input for creating a user; the store assigns the id and creation time.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Password hash.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
}

/// A stored file's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File identifier.
    pub id: FileId,
    /// Original file name (final path component only).
    pub filename: String,
    /// Location of the bytes inside the blob store.
    pub filepath: PathBuf,
    /// Ops user who uploaded the file.
    pub uploader_id: UserId,
    /// Upload time.
    pub created_at: Timestamp,
}

impl FileRecord {
    /// Client-facing listing entry.
    #[must_use]
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id,
            filename: self.filename.clone(),
            created_at: self.created_at,
        }
    }
}

/// Input for registering a file; the catalog assigns the id and time.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Original file name.
    pub filename: String,
    /// Location of the bytes inside the blob store.
    pub filepath: PathBuf,
    /// Uploading user.
    pub uploader_id: UserId,
}

/// Listing entry returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// File identifier.
    pub id: FileId,
    /// File name.
    pub filename: String,
    /// Upload time.
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = UserRecord {
            id: UserId(1),
            email: "a@example.com".to_owned(),
            password_hash: "$2b$12$secret".to_owned(),
            role: Role::Client,
            is_verified: false,
            created_at: Timestamp::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"role\":\"client\""));
    }

    #[test]
    fn test_summary() {
        let record = FileRecord {
            id: FileId(3),
            filename: "report.docx".to_owned(),
            filepath: PathBuf::from("uploads/report.docx"),
            uploader_id: UserId(1),
            created_at: Timestamp::now(),
        };
        let summary = record.summary();
        assert_eq!(summary.id, FileId(3));
        assert_eq!(summary.filename, "report.docx");
    }
}
