//! The file-sharing service.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use docshare_capabilities::TokenAuthority;
use docshare_storage::{
    BlobStore, FileCatalog, MemoryBlobStore, MemoryFileCatalog, MemoryUserDirectory,
    UserDirectory,
};
use docshare_telemetry::RequestContext;
use tracing::{Instrument, debug, error, info};

use crate::error::GatewayResult;
use crate::settings::ServiceSettings;

/// Accounts, uploads and capability-gated downloads.
///
/// Cheap to clone; every clone shares the same stores and keys. Operations
/// are split across `accounts` (signup, email verification, login, bearer
/// authentication) and `files` (upload, list, download link, secure
/// download).
#[derive(Clone)]
pub struct FileShareService {
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) files: Arc<dyn FileCatalog>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) tokens: TokenAuthority,
    pub(crate) settings: ServiceSettings,
}

impl FileShareService {
    /// Assemble a service over the given stores.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        files: Arc<dyn FileCatalog>,
        blobs: Arc<dyn BlobStore>,
        tokens: TokenAuthority,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            users,
            files,
            blobs,
            tokens,
            settings,
        }
    }

    /// A service with every store in memory.
    #[must_use]
    pub fn in_memory(tokens: TokenAuthority, settings: ServiceSettings) -> Self {
        Self::new(
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(MemoryFileCatalog::new()),
            Arc::new(MemoryBlobStore::new()),
            tokens,
            settings,
        )
    }

    /// Token issuers.
    #[must_use]
    pub fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    /// Link, upload and password settings.
    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }
}

/// Run one operation inside its request span and log how it ended.
pub(crate) async fn traced<T>(
    ctx: RequestContext,
    operation: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    let span = ctx.span();
    let result = operation.instrument(span.clone()).await;

    let _entered = span.enter();
    let elapsed_ms = ctx.elapsed_ms();
    match &result {
        Ok(_) => debug!(elapsed_ms, "request completed"),
        Err(e) if e.is_server_error() => {
            error!(kind = e.kind(), error = %e, elapsed_ms, "request failed");
        },
        Err(e) => info!(status = e.status(), kind = e.kind(), elapsed_ms, "request rejected"),
    }
    result
}

impl fmt::Debug for FileShareService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileShareService")
            .field("tokens", &self.tokens)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
