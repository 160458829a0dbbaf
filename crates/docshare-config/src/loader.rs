//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/docshare/config.toml` (system)
//! 3. Merge `~/.docshare/config.toml`, or `$DOCSHARE_HOME/config.toml` (user)
//! 4. Merge the explicitly named file, if any
//! 5. Apply env var fallbacks for fields no file set
//! 6. Resolve `${VAR}` references
//! 7. Deserialize merged tree → `Config`
//! 8. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config location.
const SYSTEM_CONFIG_PATH: &str = "/etc/docshare/config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Where each file layer is read from.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// System layer, usually `/etc/docshare/config.toml`.
    pub system: Option<PathBuf>,
    /// User layer.
    pub user: Option<PathBuf>,
    /// Explicit file (highest file priority).
    pub explicit: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard discovery for the current user.
    ///
    /// `home_override` is treated as the `.docshare` directory itself,
    /// bypassing `~/.docshare` and `DOCSHARE_HOME`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if no home directory can be found
    /// and no override is given.
    pub fn discover<S: ::std::hash::BuildHasher>(
        explicit: Option<&Path>,
        home_override: Option<&Path>,
        env_vars: &HashMap<String, String, S>,
    ) -> ConfigResult<Self> {
        let user = if let Some(h) = home_override {
            Some(h.join("config.toml"))
        } else {
            let home_dir = home_directory()?;
            let default_path = home_dir.join(".docshare").join("config.toml");
            if default_path.is_file() {
                Some(default_path)
            } else if let Some(raw) = env_vars.get("DOCSHARE_HOME") {
                if let Some(canonical) = validate_docshare_home(raw, &home_dir) {
                    Some(canonical.join("config.toml"))
                } else {
                    warn!(
                        path = raw.as_str(),
                        "DOCSHARE_HOME is not a valid directory owned by current user; ignoring"
                    );
                    None
                }
            } else {
                None
            }
        };

        Ok(Self {
            system: Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
            user,
            explicit: explicit.map(Path::to_path_buf),
        })
    }
}

/// Load the configuration with layered file precedence.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, the explicit
/// file is missing, or the final configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    let paths = ConfigPaths::discover(explicit, home_override, &env_vars)?;
    load_layers(&paths, &env_vars)
}

/// Load from explicit layer paths and an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_layers<S: ::std::hash::BuildHasher>(
    paths: &ConfigPaths,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    // 2-3. Optional file layers.
    for (path, layer) in [
        (&paths.system, ConfigLayer::System),
        (&paths.user, ConfigLayer::User),
    ] {
        let Some(path) = path else { continue };
        if let Some(overlay) = try_load_file(path)? {
            deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
            loaded_files.push(path.display().to_string());
            info!(path = %path.display(), layer = %layer, "loaded config");
        }
    }

    // 4. Explicit file must exist.
    if let Some(path) = &paths.explicit {
        let overlay = read_file(path)?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    // 5. Env var fallbacks.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 6-7. Resolve ${VAR} references, then deserialize.
    resolve_env_references(&mut merged, env_vars);
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 8. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file on top of the built-in defaults (no
/// other layers, no environment).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let paths = ConfigPaths {
        explicit: Some(path.to_path_buf()),
        ..ConfigPaths::default()
    };
    load_layers(&paths, &HashMap::<String, String>::new()).map(|resolved| resolved.config)
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_file(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

/// Read and parse one TOML file.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Validate that a `DOCSHARE_HOME` path is a real directory owned by the
/// same user who owns `home_dir`. Returns the canonicalized path on success.
fn validate_docshare_home(raw_path: &str, home_dir: &Path) -> Option<PathBuf> {
    let canonical = PathBuf::from(raw_path).canonicalize().ok()?;

    if !canonical.is_dir() {
        return None;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let dir_uid = canonical.metadata().ok()?.uid();
        let home_uid = home_dir.metadata().ok()?.uid();
        if dir_uid != home_uid {
            return None;
        }
    }

    #[cfg(not(unix))]
    let _ = home_dir;

    Some(canonical)
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.tokens.algorithm, "HS256");
        assert_eq!(config.tokens.download_ttl_secs, 900);
        assert_eq!(config.tokens.verification_ttl_secs, 86_400);
        assert_eq!(config.tokens.leeway_secs, 0);
        assert_eq!(config.server.public_base_url, "http://localhost:8000");
        assert_eq!(
            config.storage.allowed_extensions,
            vec!["pptx", "docx", "xlsx"]
        );
        assert!(config.tokens.secret.is_none());
    }

    #[test]
    fn test_defaults_only() {
        let resolved = load_layers(&ConfigPaths::default(), &env(&[])).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources.get("tokens.download_ttl_secs"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_layer_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let system = write(
            dir.path(),
            "system.toml",
            "[tokens]\ndownload_ttl_secs = 600\nsession_ttl_secs = 60\n",
        );
        let user = write(dir.path(), "user.toml", "[tokens]\ndownload_ttl_secs = 300\n");
        let explicit = write(
            dir.path(),
            "explicit.toml",
            "[server]\npublic_base_url = \"https://files.example.com\"\n",
        );

        let paths = ConfigPaths {
            system: Some(system),
            user: Some(user),
            explicit: Some(explicit),
        };
        let resolved = load_layers(&paths, &env(&[])).unwrap();

        assert_eq!(resolved.config.tokens.download_ttl_secs, 300);
        assert_eq!(resolved.config.tokens.session_ttl_secs, 60);
        assert_eq!(
            resolved.config.server.public_base_url,
            "https://files.example.com"
        );
        assert_eq!(resolved.loaded_files.len(), 3);
        assert_eq!(
            resolved.field_sources.get("tokens.download_ttl_secs"),
            Some(&ConfigLayer::User)
        );
        assert_eq!(
            resolved.field_sources.get("tokens.session_ttl_secs"),
            Some(&ConfigLayer::System)
        );
    }

    #[test]
    fn test_missing_optional_layers_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths {
            system: Some(dir.path().join("absent.toml")),
            user: Some(dir.path().join("also-absent.toml")),
            explicit: None,
        };
        assert!(load_layers(&paths, &env(&[])).is_ok());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = load_file(Path::new("/nonexistent/docshare.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_env_fallback_and_reference() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(
            dir.path(),
            "c.toml",
            "[tokens]\nsecret_file = \"${STATE_DIR}/token.key\"\n",
        );
        let paths = ConfigPaths {
            explicit: Some(explicit),
            ..ConfigPaths::default()
        };
        let resolved = load_layers(
            &paths,
            &env(&[
                ("STATE_DIR", "/var/lib/docshare"),
                ("DOCSHARE_SESSION_TTL_SECS", "120"),
            ]),
        )
        .unwrap();

        assert_eq!(
            resolved.config.tokens.secret_file.as_deref(),
            Some("/var/lib/docshare/token.key")
        );
        assert_eq!(resolved.config.tokens.session_ttl_secs, 120);
        assert_eq!(
            resolved.field_sources.get("tokens.session_ttl_secs"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_file_beats_env() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "c.toml", "[logging]\nlevel = \"warn\"\n");
        let paths = ConfigPaths {
            explicit: Some(explicit),
            ..ConfigPaths::default()
        };
        let resolved = load_layers(&paths, &env(&[("DOCSHARE_LOG_LEVEL", "trace")])).unwrap();
        assert_eq!(resolved.config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_merged_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "c.toml", "[tokens]\nalgorithm = \"none\"\n");
        let result = load_file(&explicit);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "broken.toml", "[tokens\n");
        match load_file(&explicit) {
            Err(ConfigError::ParseError { path, .. }) => assert!(path.ends_with("broken.toml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        let path = write(dir.path(), "huge.toml", &data);

        let result = try_load_file(&path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }

    #[test]
    fn test_home_override() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::discover(None, Some(dir.path()), &env(&[])).unwrap();
        assert_eq!(paths.user, Some(dir.path().join("config.toml")));
        assert_eq!(paths.system, Some(PathBuf::from(SYSTEM_CONFIG_PATH)));
    }
}
