//! Per-call request context for log correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one service call in the logs.
///
/// Every log line emitted inside [`RequestContext::span`] carries the
/// request id and operation name, so a rejected download can be traced from
/// the boundary error back to the token failure that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Operation being performed (e.g. `secure_download`).
    pub operation: String,
    /// Authenticated caller, once known.
    pub user_id: Option<u64>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Start a context for `operation`.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation: operation.into(),
            user_id: None,
            started_at: Utc::now(),
        }
    }

    /// Record the authenticated caller.
    #[must_use]
    pub fn with_user_id(mut self, id: u64) -> Self {
        self.user_id = Some(id);
        self
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Short identifier for log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }

    /// A span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.short_id(),
            operation = %self.operation,
            user_id = self.user_id,
        )
    }
}
