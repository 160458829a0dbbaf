//! Token commands: mint and inspect capability tokens offline.

use anyhow::{Context, Result};
use docshare_capabilities::{TokenAuthority, TokenPurpose, VerifyOutcome};
use docshare_config::Config;
use docshare_core::{FileId, UserId};
use docshare_gateway::ServiceSettings;
use docshare_gateway::config_bridge;

use crate::OutputFormat;
use crate::theme::Theme;

fn authority(cfg: &Config) -> Result<TokenAuthority> {
    config_bridge::token_authority(&cfg.tokens).context("loading token signing configuration")
}

fn link_for(settings: &ServiceSettings, purpose: TokenPurpose, token: &str) -> Option<String> {
    match purpose {
        TokenPurpose::EmailVerification => Some(settings.verify_link(token)),
        TokenPurpose::Download => Some(settings.download_link(token)),
        TokenPurpose::Session => None,
    }
}

/// Mint a `purpose` token for `subject` / `resource` with the configured
/// lifetime.
pub(crate) fn issue_token(
    cfg: &Config,
    purpose: TokenPurpose,
    subject: u64,
    resource: u64,
    format: OutputFormat,
) -> Result<()> {
    let issued = authority(cfg)?.issue(purpose, UserId(subject), FileId(resource))?;
    let settings = config_bridge::service_settings(cfg);
    let link = link_for(&settings, purpose, issued.as_str());
    let claim = issued.claim();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "purpose": purpose.as_str(),
                "token": issued.as_str(),
                "sub": claim.subject_id.get(),
                "file_id": claim.resource_id.get(),
                "expires_at": claim.expires_at.to_string(),
                "link": link,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        OutputFormat::Pretty => {
            println!("{}", Theme::header(&format!("{purpose} token")));
            println!("  Subject:  {}", claim.subject_id);
            println!("  Resource: {}", claim.resource_id);
            println!("  Expires:  {}", claim.expires_at);
            if let Some(link) = &link {
                println!("  Link:     {link}");
            }
            println!();
            println!("{issued}");
        },
    }
    Ok(())
}

/// Check a token as a `purpose` token, optionally bound to `caller`.
///
/// Returns whether the token was accepted.
pub(crate) fn verify_token(
    cfg: &Config,
    purpose: TokenPurpose,
    token: &str,
    caller: Option<u64>,
    format: OutputFormat,
) -> Result<bool> {
    let authority = authority(cfg)?;
    let outcome = authority.issuer(purpose).inspect(token.trim());

    let subject_check = match (&outcome, caller) {
        (VerifyOutcome::Valid(claim), Some(caller)) => {
            Some(claim.ensure_subject(UserId(caller)).is_ok())
        },
        _ => None,
    };
    let accepted = outcome.is_valid() && subject_check.unwrap_or(true);

    let status = match &outcome {
        VerifyOutcome::Valid(_) => "valid",
        VerifyOutcome::Malformed => "malformed",
        VerifyOutcome::BadSignature => "bad_signature",
        VerifyOutcome::Expired { .. } => "expired",
    };

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::json!({
                "purpose": purpose.as_str(),
                "status": status,
                "accepted": accepted,
            });
            match &outcome {
                VerifyOutcome::Valid(claim) => {
                    value["sub"] = claim.subject_id.get().into();
                    value["file_id"] = claim.resource_id.get().into();
                    value["expires_at"] = claim.expires_at.to_string().into();
                },
                VerifyOutcome::Expired { expired_at } => {
                    value["expired_at"] = expired_at.to_string().into();
                },
                VerifyOutcome::Malformed | VerifyOutcome::BadSignature => {},
            }
            if let Some(matches) = subject_check {
                value["subject_matches"] = matches.into();
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        OutputFormat::Pretty => {
            match &outcome {
                VerifyOutcome::Valid(claim) => {
                    println!("{}", Theme::success(&format!("valid {purpose} token")));
                    println!("  Subject:  {}", claim.subject_id);
                    println!("  Resource: {}", claim.resource_id);
                    println!("  Expires:  {}", claim.expires_at);
                },
                VerifyOutcome::Expired { expired_at } => {
                    println!("{}", Theme::error(&format!("expired at {expired_at}")));
                },
                VerifyOutcome::Malformed => println!("{}", Theme::error("malformed token")),
                VerifyOutcome::BadSignature => println!(
                    "{}",
                    Theme::error(&format!(
                        "signature does not verify as a {purpose} token under this key"
                    ))
                ),
            }
            if subject_check == Some(false) {
                println!("{}", Theme::warning("token was issued to a different user"));
            }
        },
    }

    Ok(accepted)
}
