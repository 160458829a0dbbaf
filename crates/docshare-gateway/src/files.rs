//! Upload, listing and capability-gated download.

use docshare_capabilities::TokenPurpose;
use docshare_core::{FileId, FileRecord, FileSummary, NewFile, Role, UserRecord};
use docshare_storage::StorageError;
use docshare_telemetry::RequestContext;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult, reject_token};
use crate::response::{Download, DownloadLink};
use crate::service::{FileShareService, traced};

const FILE_NOT_FOUND: &str = "File not found.";

/// Longest accepted base name, in bytes. Blob keys prepend a 32-character
/// uuid and `_`, and must fit a 255-byte file name.
const MAX_NAME_BYTES: usize = 222;

/// Reduce an uploaded name to its final path component.
///
/// Both `/` and `\` count as separators, so `..\..\x.docx` becomes `x.docx`.
fn base_name(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name if name.contains('\0') => None,
        name => Some(name),
    }
}

fn require_role(caller: &UserRecord, role: Role, message: &str) -> GatewayResult<()> {
    if caller.role == role {
        Ok(())
    } else {
        debug!(user_id = %caller.id, role = %caller.role, required = %role, "role check failed");
        Err(GatewayError::Forbidden(message.to_owned()))
    }
}

impl FileShareService {
    /// Store an uploaded document.
    ///
    /// The name is reduced to its final path component and stored alongside
    /// a unique blob key, so two uploads with the same name never collide.
    ///
    /// # Errors
    ///
    /// - 403 "Only Ops users can upload files." for non-ops callers
    /// - 400 "Invalid file type." for names without an accepted extension
    /// - 400 "Filename too long." for base names over 222 bytes
    /// - 400 "File too large." above the configured size limit
    pub async fn upload_file(
        &self,
        caller: &UserRecord,
        filename: &str,
        bytes: &[u8],
    ) -> GatewayResult<FileRecord> {
        let ctx = RequestContext::new("upload_file").with_user_id(caller.id.get());
        traced(ctx, async {
            require_role(caller, Role::Ops, "Only Ops users can upload files.")?;

            let name = base_name(filename)
                .filter(|name| self.settings.is_allowed_extension(name))
                .ok_or_else(|| GatewayError::BadRequest("Invalid file type.".into()))?;
            if name.len() > MAX_NAME_BYTES {
                debug!(len = name.len(), "upload name too long");
                return Err(GatewayError::BadRequest("Filename too long.".into()));
            }

            let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
            if len > self.settings.max_upload_bytes {
                debug!(len, limit = self.settings.max_upload_bytes, "upload too large");
                return Err(GatewayError::BadRequest("File too large.".into()));
            }

            let key = format!("{}_{name}", Uuid::new_v4().simple());
            let location = self.blobs.put(&key, bytes).await?;

            let record = match self
                .files
                .insert(NewFile {
                    filename: name.to_owned(),
                    filepath: location.clone(),
                    uploader_id: caller.id,
                })
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    if let Err(cleanup) = self.blobs.delete(&location).await {
                        warn!(
                            path = %location.display(),
                            error = %cleanup,
                            "orphaned blob left after catalog failure"
                        );
                    }
                    return Err(e.into());
                },
            };

            info!(file_id = %record.id, filename = %record.filename, len, "file uploaded");
            Ok(record)
        })
        .await
    }

    /// Every stored file, oldest first.
    ///
    /// # Errors
    ///
    /// 403 "Only clients can list files." for non-client callers.
    pub async fn list_files(&self, caller: &UserRecord) -> GatewayResult<Vec<FileSummary>> {
        let ctx = RequestContext::new("list_files").with_user_id(caller.id.get());
        traced(ctx, async {
            require_role(caller, Role::Client, "Only clients can list files.")?;
            let files = self.files.list().await?;
            Ok(files.iter().map(FileRecord::summary).collect())
        })
        .await
    }

    /// Mint a download link for `file_id`, bound to the caller.
    ///
    /// # Errors
    ///
    /// - 403 "Only clients can download files." for non-client callers
    /// - 404 "File not found." if no such file is stored
    pub async fn download_link(
        &self,
        caller: &UserRecord,
        file_id: FileId,
    ) -> GatewayResult<DownloadLink> {
        let ctx = RequestContext::new("download_link").with_user_id(caller.id.get());
        traced(ctx, async {
            require_role(caller, Role::Client, "Only clients can download files.")?;

            if file_id.is_none() || self.files.get(file_id).await?.is_none() {
                return Err(GatewayError::NotFound(FILE_NOT_FOUND.into()));
            }

            let issued = self.tokens.issue(TokenPurpose::Download, caller.id, file_id)?;
            info!(
                %file_id,
                expires_at = %issued.claim().expires_at,
                "download link issued"
            );
            Ok(DownloadLink {
                download_link: self.settings.download_link(issued.as_str()),
            })
        })
        .await
    }

    /// Redeem a download link.
    ///
    /// The token must verify as a download capability, name the caller as
    /// its subject and point at a stored file. It stays usable until it
    /// expires.
    ///
    /// # Errors
    ///
    /// - 403 "Access denied" if the token is malformed, forged or expired
    /// - 403 "Token is not valid for this user." if issued to someone else
    /// - 404 "File not found." if the file or its bytes are gone
    pub async fn secure_download(
        &self,
        caller: &UserRecord,
        token: &str,
    ) -> GatewayResult<Download> {
        let ctx = RequestContext::new("secure_download").with_user_id(caller.id.get());
        traced(ctx, async {
            let purpose = TokenPurpose::Download;
            let claim = self
                .tokens
                .verify(purpose, token.trim())
                .map_err(|e| reject_token(purpose, e))?;
            claim
                .ensure_subject(caller.id)
                .map_err(|e| reject_token(purpose, e))?;

            if !claim.is_resource_scoped() {
                return Err(GatewayError::NotFound(FILE_NOT_FOUND.into()));
            }
            let Some(file) = self.files.get(claim.resource_id).await? else {
                debug!(file_id = %claim.resource_id, "download for missing file");
                return Err(GatewayError::NotFound(FILE_NOT_FOUND.into()));
            };

            let stream = match self.blobs.open(&file.filepath).await {
                Ok(stream) => stream,
                Err(StorageError::NotFound(_)) => {
                    warn!(file_id = %file.id, path = %file.filepath.display(), "catalogued file has no bytes");
                    return Err(GatewayError::NotFound(FILE_NOT_FOUND.into()));
                },
                Err(e) => return Err(e.into()),
            };

            info!(file_id = %file.id, len = stream.len, "download served");
            Ok(Download {
                filename: file.filename,
                stream,
            })
        })
        .await
    }
}
