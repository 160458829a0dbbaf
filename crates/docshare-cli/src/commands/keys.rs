//! Keys command: create the token signing secret.

use std::path::Path;

use anyhow::{Context, Result, bail};
use docshare_crypto::SigningSecret;

use crate::OutputFormat;
use crate::theme::Theme;

/// Generate a signing secret.
///
/// With `output`, the raw secret is written there (mode 0600) for use as
/// `tokens.secret_file`. Without it, the secret is printed as a
/// `base64:` value for `tokens.secret` / `DOCSHARE_TOKEN_SECRET`.
pub(crate) fn generate_key(output: Option<&Path>, force: bool, format: OutputFormat) -> Result<()> {
    let (secret, location) = match output {
        Some(path) => {
            if path.exists() {
                if !force {
                    bail!(
                        "{} already exists; pass --force to replace it (outstanding tokens stop verifying)",
                        path.display()
                    );
                }
                std::fs::remove_file(path)
                    .with_context(|| format!("removing old key {}", path.display()))?;
            }
            let secret = SigningSecret::load_or_generate(path)
                .with_context(|| format!("writing key to {}", path.display()))?;
            (secret, Some(path.display().to_string()))
        },
        None => (SigningSecret::generate(), None),
    };

    let key_id = secret.key_id().to_hex();
    let inline = location
        .is_none()
        .then(|| format!("base64:{}", secret.to_base64().as_str()));

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "key_id": key_id,
                "key_file": location,
                "secret": inline,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        OutputFormat::Pretty => {
            println!("{}", Theme::success("New signing secret generated."));
            println!("  Key ID:   {key_id}");
            match (&location, &inline) {
                (Some(path), _) => println!("  Key file: {path}"),
                (None, Some(value)) => {
                    println!("  Secret:   {value}");
                    println!(
                        "{}",
                        Theme::dimmed("  Set it as DOCSHARE_TOKEN_SECRET or tokens.secret.")
                    );
                },
                (None, None) => {},
            }
        },
    }

    Ok(())
}
