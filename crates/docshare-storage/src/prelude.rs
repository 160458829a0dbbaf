//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_storage::prelude::*;` to import all essential types.

// Errors
pub use crate::{StorageError, StorageResult};

// Traits
pub use crate::{BlobStore, FileCatalog, UserDirectory};

// Implementations
pub use crate::{LocalBlobStore, MemoryBlobStore, MemoryFileCatalog, MemoryUserDirectory};
