//! Docshare Storage - Persistence behind the file-sharing service.
//!
//! Three async seams, each with an in-memory implementation for tests and
//! single-process use:
//!
//! - [`UserDirectory`]: accounts keyed by id and (case-insensitive) email
//! - [`FileCatalog`]: file metadata keyed by id
//! - [`BlobStore`]: the uploaded bytes themselves, with a local-disk
//!   implementation ([`LocalBlobStore`]) for real deployments
//!
//! Ids are assigned by the stores and start at 1; `0` is reserved as the
//! "no file" marker in capability tokens.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod blob;
mod catalog;
mod directory;
mod error;

pub use blob::{BlobStore, BlobStream, LocalBlobStore, MemoryBlobStore, validate_blob_key};
pub use catalog::{FileCatalog, MemoryFileCatalog};
pub use directory::{MemoryUserDirectory, UserDirectory};
pub use error::{StorageError, StorageResult};
