//! CLI handlers for the `docshare config` subcommand.

use std::path::Path;

use anyhow::Result;
use docshare_config::env::{collect_env_vars, env_fallbacks};
use docshare_config::{Config, ConfigPaths, ShowFormat};

use crate::theme::Theme;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(explicit: Option<&Path>, format: &str, section: Option<&str>) -> Result<()> {
    let resolved = Config::load(explicit)?;

    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };

    let output = resolved
        .show(show_format, section)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;

    println!("{output}");
    Ok(())
}

/// Validate the current configuration, including that a signing secret
/// can actually be loaded.
///
/// Returns whether the configuration is usable.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn validate_config(explicit: Option<&Path>) -> Result<bool> {
    let resolved = match Config::load(explicit) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("Configuration error: {e}")));
            return Ok(false);
        },
    };

    if let Err(e) = docshare_gateway::config_bridge::token_config(&resolved.config.tokens) {
        eprintln!("{}", Theme::error(&format!("Signing key error: {e}")));
        return Ok(false);
    }

    println!("{}", Theme::success("Configuration is valid."));
    if !resolved.loaded_files.is_empty() {
        println!("\nLoaded files:");
        for path in &resolved.loaded_files {
            println!("  - {path}");
        }
    }
    Ok(true)
}

/// Show all config file paths that are checked.
pub(crate) fn show_paths(explicit: Option<&Path>) -> Result<()> {
    let env_vars = collect_env_vars();
    let paths = ConfigPaths::discover(explicit, None, &env_vars)?;

    println!("Configuration files checked (lowest to highest precedence):\n");
    let layers = [
        ("system", paths.system.as_deref()),
        ("user", paths.user.as_deref()),
        ("file", paths.explicit.as_deref()),
    ];
    for (layer, path) in layers {
        match path {
            Some(path) => {
                let status = if path.is_file() { "found" } else { "not found" };
                println!("  {layer:<6} {}  [{status}]", path.display());
            },
            None => println!("  {layer:<6} {}", Theme::dimmed("(none)")),
        }
    }

    println!("\nEnvironment variable fallbacks:");
    for (var, field) in env_fallbacks() {
        let set = if env_vars.contains_key(var) { " (set)" } else { "" };
        println!("  {var:<32} -> {field}{set}");
    }

    Ok(())
}
