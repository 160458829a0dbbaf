//! Signup, email verification, login and bearer authentication.

use docshare_capabilities::TokenPurpose;
use docshare_core::{FileId, NewUser, Role, UserRecord};
use docshare_crypto::{CryptoError, hash_password, validate_password, verify_password};
use docshare_storage::StorageError;
use docshare_telemetry::RequestContext;
use tracing::{debug, info};

use crate::error::{
    GatewayError, GatewayResult, INVALID_CREDENTIALS, log_rejection, reject_token,
};
use crate::response::{AccessToken, SignupResponse};
use crate::service::{FileShareService, traced};

const EMAIL_TAKEN: &str = "Email already registered";
const BAD_CREDENTIALS: &str = "Incorrect credentials";
const INVALID_TOKEN: &str = "Invalid token";

/// Trim `email` and check it looks like `local@domain.tld`.
fn normalize_email(email: &str) -> GatewayResult<String> {
    let email = email.trim();
    let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
            && !domain.ends_with('.')
    }) && !email.chars().any(char::is_whitespace);

    if well_formed {
        Ok(email.to_owned())
    } else {
        Err(GatewayError::BadRequest("Invalid email address".into()))
    }
}

impl FileShareService {
    /// Create an unverified account and return its email verification link.
    ///
    /// The link carries an email-verification capability for the new user
    /// id with no resource, valid for the verification lifetime.
    ///
    /// # Errors
    ///
    /// - 400 "Email already registered" for a duplicate email
    /// - 400 for a malformed email or a password outside the length policy
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> GatewayResult<SignupResponse> {
        traced(RequestContext::new("signup"), async {
            let email = normalize_email(email)?;
            validate_password(password, self.settings.min_password_length).map_err(
                |e| match e {
                    CryptoError::InvalidPassword(reason) => GatewayError::BadRequest(reason),
                    other => GatewayError::Crypto(other),
                },
            )?;

            if self.users.find_by_email(&email).await?.is_some() {
                return Err(GatewayError::BadRequest(EMAIL_TAKEN.into()));
            }

            let cost = self.settings.bcrypt_cost;
            let owned = password.to_owned();
            let password_hash = tokio::task::spawn_blocking(move || hash_password(&owned, cost))
                .await
                .map_err(|e| GatewayError::Internal(format!("hashing task failed: {e}")))??;

            let user = match self
                .users
                .insert(NewUser {
                    email,
                    password_hash,
                    role,
                })
                .await
            {
                Ok(user) => user,
                Err(StorageError::Conflict(_)) => {
                    return Err(GatewayError::BadRequest(EMAIL_TAKEN.into()));
                },
                Err(e) => return Err(e.into()),
            };

            let issued =
                self.tokens
                    .issue(TokenPurpose::EmailVerification, user.id, FileId::NONE)?;
            info!(user_id = %user.id, %role, expires_at = %issued.claim().expires_at, "account created");

            Ok(SignupResponse {
                verify_link: self.settings.verify_link(issued.as_str()),
            })
        })
        .await
    }

    /// Confirm the email address named by a verification token.
    ///
    /// Verifying an already confirmed account succeeds again; the token is
    /// reusable until it expires.
    ///
    /// # Errors
    ///
    /// - 403 "Access denied" if the token is malformed, forged or expired
    /// - 400 "Invalid token" if it names no account or carries a resource
    pub async fn verify_email(&self, token: &str) -> GatewayResult<UserRecord> {
        traced(RequestContext::new("verify_email"), async {
            let purpose = TokenPurpose::EmailVerification;
            let claim = self
                .tokens
                .verify(purpose, token.trim())
                .map_err(|e| reject_token(purpose, e))?;

            if claim.is_resource_scoped() {
                debug!(resource_id = %claim.resource_id, "verification token carries a resource");
                return Err(GatewayError::BadRequest(INVALID_TOKEN.into()));
            }

            match self.users.mark_verified(claim.subject_id).await {
                Ok(user) => {
                    info!(user_id = %user.id, "email verified");
                    Ok(user)
                },
                Err(StorageError::NotFound(_)) => {
                    debug!(subject = %claim.subject_id, "verification token for unknown user");
                    Err(GatewayError::BadRequest(INVALID_TOKEN.into()))
                },
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Check credentials and mint a session bearer.
    ///
    /// Ops accounts may log in before confirming their email; clients may
    /// not.
    ///
    /// # Errors
    ///
    /// - 400 "Incorrect credentials" for an unknown email or wrong password
    /// - 400 "Email not verified" for an unconfirmed client
    pub async fn login(&self, email: &str, password: &str) -> GatewayResult<AccessToken> {
        traced(RequestContext::new("login"), async {
            let Some(user) = self.users.find_by_email(email.trim()).await? else {
                debug!("login for unknown email");
                return Err(GatewayError::BadRequest(BAD_CREDENTIALS.into()));
            };

            let owned = password.to_owned();
            let stored = user.password_hash.clone();
            let matches = tokio::task::spawn_blocking(move || verify_password(&owned, &stored))
                .await
                .map_err(|e| GatewayError::Internal(format!("hashing task failed: {e}")))??;
            if !matches {
                debug!(user_id = %user.id, "wrong password");
                return Err(GatewayError::BadRequest(BAD_CREDENTIALS.into()));
            }

            if user.role == Role::Client && !user.is_verified {
                return Err(GatewayError::BadRequest("Email not verified".into()));
            }

            let issued = self
                .tokens
                .issue(TokenPurpose::Session, user.id, FileId::NONE)?;
            info!(user_id = %user.id, role = %user.role, "logged in");
            Ok(AccessToken::bearer(issued.into_string()))
        })
        .await
    }

    /// Resolve a session bearer to its account.
    ///
    /// Accepts the raw token or an `Authorization` header value
    /// (`Bearer <token>`).
    ///
    /// # Errors
    ///
    /// Returns 401 "Could not validate credentials" if the token does not
    /// verify as a session token or its account no longer exists.
    pub async fn authenticate(&self, bearer: &str) -> GatewayResult<UserRecord> {
        traced(RequestContext::new("authenticate"), async {
            let bearer = bearer.trim();
            let token = bearer
                .strip_prefix("Bearer ")
                .or_else(|| bearer.strip_prefix("bearer "))
                .unwrap_or(bearer)
                .trim();

            let purpose = TokenPurpose::Session;
            let claim = self.tokens.verify(purpose, token).map_err(|e| {
                log_rejection(purpose, &e);
                GatewayError::Unauthorized(INVALID_CREDENTIALS.into())
            })?;

            self.users.get(claim.subject_id).await?.ok_or_else(|| {
                debug!(subject = %claim.subject_id, "session for unknown user");
                GatewayError::Unauthorized(INVALID_CREDENTIALS.into())
            })
        })
        .await
    }
}
