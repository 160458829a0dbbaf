//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Identifiers and time
pub use crate::{FileId, Role, Timestamp, UserId};

// Records
pub use crate::{FileRecord, FileSummary, NewFile, NewUser, UserRecord};
