//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_config::prelude::*;` to import all essential types.

// Errors
pub use crate::{ConfigError, ConfigResult};

// Loading
pub use crate::{Config, ConfigLayer, ConfigPaths, ResolvedConfig, ShowFormat};

// Sections
pub use crate::{LoggingSection, PasswordsSection, ServerSection, StorageSection, TokensSection};
