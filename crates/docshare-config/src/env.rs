//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Supported `DOCSHARE_*` mappings, plus the legacy `SECRET_KEY` /
/// `ALGORITHM` pair older deployments set.
///
/// The legacy names only let an existing environment start the service.
/// Tokens are signed with per-purpose keys derived from the secret, so
/// tokens an older deployment signed with the raw `SECRET_KEY` do not
/// verify and their holders must sign in again.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "DOCSHARE_TOKEN_SECRET",
        field_path: "tokens.secret",
    },
    EnvMapping {
        var_name: "DOCSHARE_TOKEN_SECRET_FILE",
        field_path: "tokens.secret_file",
    },
    EnvMapping {
        var_name: "DOCSHARE_TOKEN_ALGORITHM",
        field_path: "tokens.algorithm",
    },
    EnvMapping {
        var_name: "DOCSHARE_DOWNLOAD_TTL_SECS",
        field_path: "tokens.download_ttl_secs",
    },
    EnvMapping {
        var_name: "DOCSHARE_VERIFICATION_TTL_SECS",
        field_path: "tokens.verification_ttl_secs",
    },
    EnvMapping {
        var_name: "DOCSHARE_SESSION_TTL_SECS",
        field_path: "tokens.session_ttl_secs",
    },
    EnvMapping {
        var_name: "DOCSHARE_TOKEN_LEEWAY_SECS",
        field_path: "tokens.leeway_secs",
    },
    EnvMapping {
        var_name: "DOCSHARE_PUBLIC_BASE_URL",
        field_path: "server.public_base_url",
    },
    EnvMapping {
        var_name: "DOCSHARE_UPLOAD_DIR",
        field_path: "storage.upload_dir",
    },
    EnvMapping {
        var_name: "DOCSHARE_MAX_UPLOAD_BYTES",
        field_path: "storage.max_upload_bytes",
    },
    EnvMapping {
        var_name: "DOCSHARE_BCRYPT_COST",
        field_path: "passwords.bcrypt_cost",
    },
    EnvMapping {
        var_name: "DOCSHARE_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "DOCSHARE_LOG_FORMAT",
        field_path: "logging.format",
    },
    // Legacy names.
    EnvMapping {
        var_name: "SECRET_KEY",
        field_path: "tokens.secret",
    },
    EnvMapping {
        var_name: "ALGORITHM",
        field_path: "tokens.algorithm",
    },
];

/// `(variable, field path)` for every supported environment fallback, in
/// priority order.
pub fn env_fallbacks() -> impl Iterator<Item = (&'static str, &'static str)> {
    ENV_MAPPINGS.iter().map(|m| (m.var_name, m.field_path))
}

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer. Earlier mappings win over later ones for the same
/// field.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        // Only apply if no config file (or earlier mapping) set this field.
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

/// Replace `${VAR}` references in a string with their env var values.
fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            let mut closed = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = var_name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                // Malformed reference, leave as-is.
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Set a field in the TOML tree from a string value, creating intermediate
/// tables as needed.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), toml_val);
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Coerce a string env var value to the TOML type the field expects.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(
        path,
        "tokens.download_ttl_secs"
            | "tokens.verification_ttl_secs"
            | "tokens.session_ttl_secs"
            | "tokens.leeway_secs"
            | "storage.max_upload_bytes"
            | "passwords.bcrypt_cost"
            | "passwords.min_length"
    ) && let Ok(i) = val.trim().parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
