//! Issuing and verifying capability tokens.
//!
//! Tokens use the JWS compact form (`header.payload.signature`, base64url
//! without padding), so they are safe to embed in a URL path segment. The
//! payload is [`WireClaims`].

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use docshare_core::{FileId, UserId};
use docshare_crypto::{KeyId, SigningAlgorithm, SigningSecret};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, trace};

use crate::claim::{Claim, WireClaims};
use crate::clock::{Clock, SystemClock};
use crate::error::{TokenError, TokenResult};
use crate::outcome::VerifyOutcome;

/// Shortest lifetime a token may be issued with. `exp` has whole-second
/// precision, so anything shorter could be expired on arrival.
const MIN_TTL_SECS: i64 = 1;

/// Immutable signing configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric signing secret.
    pub secret: SigningSecret,
    /// HMAC variant.
    pub algorithm: SigningAlgorithm,
    /// Clock-skew tolerance applied to `exp` during verification.
    pub leeway: Duration,
}

impl TokenConfig {
    /// HS256, no leeway.
    #[must_use]
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            algorithm: SigningAlgorithm::default(),
            leeway: Duration::zero(),
        }
    }

    /// Set the signing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the clock-skew tolerance.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

/// A freshly minted token together with the claim it encodes.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    token: String,
    claim: Claim,
}

impl IssuedToken {
    /// The encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// The claim exactly as a later `verify` will reproduce it.
    #[must_use]
    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    /// Take the encoded token.
    #[must_use]
    pub fn into_string(self) -> String {
        self.token
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("claim", &self.claim)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Mints and verifies capability tokens under a single key.
///
/// Stateless apart from the read-only key material: cheap to clone and safe
/// to share across threads.
#[derive(Clone)]
pub struct CapabilityIssuer {
    algorithm: SigningAlgorithm,
    key_id: KeyId,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    leeway: Duration,
    clock: Arc<dyn Clock>,
}

impl CapabilityIssuer {
    /// Build an issuer from configuration, using the system clock.
    #[must_use]
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(config.algorithm.to_jwt());
        // Expiry is checked against our own clock with our own leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            algorithm: config.algorithm,
            key_id: config.secret.key_id(),
            encoding_key: config.secret.encoding_key(),
            decoding_key: config.secret.decoding_key(),
            validation,
            leeway: config.leeway,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fingerprint of the signing key.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    /// Signing algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Mint a token granting `subject` access to `resource` for `ttl`.
    ///
    /// `expires_at` is `now + ttl` rounded down to whole seconds. Expiry
    /// checks also round `now` down, so the token is accepted for at least
    /// `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidTtl`] if `ttl` is under one second or
    /// overflows the calendar, and [`TokenError::Signing`] if encoding fails.
    pub fn issue(
        &self,
        subject: UserId,
        resource: FileId,
        ttl: Duration,
    ) -> TokenResult<IssuedToken> {
        if ttl < Duration::seconds(MIN_TTL_SECS) {
            return Err(TokenError::InvalidTtl {
                seconds: ttl.num_seconds(),
            });
        }

        let expires_at = self
            .clock
            .now()
            .checked_add(ttl)
            .ok_or(TokenError::InvalidTtl {
                seconds: ttl.num_seconds(),
            })?
            .truncated_to_seconds();

        let claim = Claim {
            subject_id: subject,
            resource_id: resource,
            expires_at,
        };

        let header = Header::new(self.algorithm.to_jwt());
        let token = jsonwebtoken::encode(&header, &WireClaims::from(&claim), &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!(
            subject = %subject,
            resource = %resource,
            expires_at = %expires_at,
            key_id = %self.key_id,
            "issued capability token"
        );

        Ok(IssuedToken { token, claim })
    }

    /// Validate a presented token and recover its claim.
    ///
    /// Checks structure, then signature, then expiry. Never touches storage
    /// and never consumes the token: the same token verifies again on the
    /// next call until it expires.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Malformed`] if the input is not a decodable envelope
    /// - [`TokenError::BadSignature`] if the signature does not match under
    ///   this issuer's key and algorithm
    /// - [`TokenError::Expired`] if the signature is good but `exp` has passed
    pub fn verify(&self, token: &str) -> TokenResult<Claim> {
        let data =
            jsonwebtoken::decode::<WireClaims>(token, &self.decoding_key, &self.validation)
                .map_err(map_decode_error)?;
        let claim = Claim::try_from(data.claims)?;

        if claim.is_expired_at(self.clock.now(), self.leeway) {
            return Err(TokenError::Expired {
                expired_at: claim.expires_at,
            });
        }

        trace!(subject = %claim.subject_id, resource = %claim.resource_id, "token verified");
        Ok(claim)
    }

    /// Like [`verify`](Self::verify), returning a tagged outcome instead of
    /// a `Result`.
    #[must_use]
    pub fn inspect(&self, token: &str) -> VerifyOutcome {
        VerifyOutcome::from(self.verify(token))
    }
}

impl fmt::Debug for CapabilityIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityIssuer")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("leeway", &self.leeway)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        // A header naming another algorithm was not signed under ours.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        _ => TokenError::malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::TimeZone;
    use docshare_core::Timestamp;

    fn test_issuer() -> CapabilityIssuer {
        CapabilityIssuer::new(TokenConfig::new(SigningSecret::generate()))
    }

    fn fixed_issuer(start: Timestamp) -> (CapabilityIssuer, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start));
        let issuer = test_issuer().with_clock(clock.clone());
        (issuer, clock)
    }

    /// Clock with millisecond resolution.
    #[derive(Debug)]
    struct MillisClock(std::sync::atomic::AtomicI64);

    impl MillisClock {
        fn advance_millis(&self, ms: i64) {
            self.0.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl Clock for MillisClock {
        fn now(&self) -> Timestamp {
            let ms = self.0.load(std::sync::atomic::Ordering::SeqCst);
            Timestamp::from_datetime(chrono::Utc.timestamp_millis_opt(ms).unwrap())
        }
    }

    /// Replace one character in the given segment with a different
    /// base64url character.
    fn flip_char(token: &str, segment: usize) -> String {
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        let target = &mut parts[segment];
        let mid = target.len() / 2;
        let original = target.as_bytes()[mid];
        let replacement = if original == b'A' { 'B' } else { 'A' };
        target.replace_range(mid..=mid, &replacement.to_string());
        parts.join(".")
    }

    #[test]
    fn test_round_trip() {
        let issuer = test_issuer();
        let before = Timestamp::now();
        let issued = issuer
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();

        let claim = issuer.verify(issued.as_str()).unwrap();
        assert_eq!(claim, *issued.claim());
        assert_eq!(claim.subject_id, UserId(42));
        assert_eq!(claim.resource_id, FileId(7));

        let earliest = before
            .checked_add(Duration::minutes(15))
            .unwrap()
            .truncated_to_seconds();
        let latest = Timestamp::now().checked_add(Duration::minutes(15)).unwrap();
        assert!(claim.expires_at >= earliest && claim.expires_at <= latest);
    }

    #[test]
    fn test_token_is_three_url_safe_segments() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(1), FileId::NONE, Duration::hours(24))
            .unwrap();
        let token = issued.as_str();

        assert_eq!(token.split('.').count(), 3);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn test_payload_field_names() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();

        let payload = issued.as_str().split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(json["sub"], "42");
        assert_eq!(json["file_id"], 7);
        assert_eq!(
            json["exp"].as_i64().unwrap(),
            issued.claim().expires_at.unix_seconds()
        );
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_example_timeline() {
        let t0 = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let (issuer, clock) = fixed_issuer(t0);

        let issued = issuer
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();

        clock.advance(Duration::minutes(5));
        let claim = issuer.verify(issued.as_str()).unwrap();
        assert_eq!(claim.subject_id, UserId(42));
        assert_eq!(claim.resource_id, FileId(7));
        assert_eq!(claim.expires_at.unix_seconds(), 1_700_000_900);

        clock.advance(Duration::minutes(11));
        assert_eq!(
            issuer.verify(issued.as_str()),
            Err(TokenError::Expired {
                expired_at: claim.expires_at
            })
        );
    }

    #[test]
    fn test_expiry_boundary_real_clock() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(1), FileId(1), Duration::seconds(1))
            .unwrap();

        assert!(issuer.verify(issued.as_str()).is_ok());

        std::thread::sleep(std::time::Duration::from_secs(2));
        assert!(matches!(
            issuer.verify(issued.as_str()),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_one_second_ttl_issued_late_in_second() {
        let clock = Arc::new(MillisClock(std::sync::atomic::AtomicI64::new(
            1_700_000_000_999,
        )));
        let issuer = test_issuer().with_clock(clock.clone());
        let issued = issuer
            .issue(UserId(1), FileId(1), Duration::seconds(1))
            .unwrap();
        assert_eq!(issued.claim().expires_at.unix_seconds(), 1_700_000_001);

        clock.advance_millis(2);
        assert!(issuer.verify(issued.as_str()).is_ok());

        // 1_700_000_001.999
        clock.advance_millis(998);
        assert!(issuer.verify(issued.as_str()).is_ok());

        // 1_700_000_002.000
        clock.advance_millis(1);
        assert!(matches!(
            issuer.verify(issued.as_str()),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_leeway_tolerates_skew() {
        let t0 = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let clock = Arc::new(FixedClock::new(t0));
        let issuer = CapabilityIssuer::new(
            TokenConfig::new(SigningSecret::generate()).with_leeway(Duration::seconds(30)),
        )
        .with_clock(clock.clone());

        let issued = issuer
            .issue(UserId(5), FileId(5), Duration::seconds(60))
            .unwrap();

        clock.advance(Duration::seconds(80));
        assert!(issuer.verify(issued.as_str()).is_ok());

        clock.advance(Duration::seconds(20));
        assert!(matches!(
            issuer.verify(issued.as_str()),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_tampered_signature() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();

        let tampered = flip_char(issued.as_str(), 2);
        assert_ne!(tampered, issued.as_str());
        assert_eq!(issuer.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_payload() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();

        // Re-encode the payload with a different file id, keep the signature.
        let parts: Vec<&str> = issued.as_str().split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&serde_json::json!({
                "sub": "42",
                "file_id": 8,
                "exp": issued.claim().expires_at.unix_seconds(),
            }))
            .unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(issuer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_key_rotation() {
        let k1 = test_issuer();
        let k2 = test_issuer();
        assert_ne!(k1.key_id(), k2.key_id());

        let issued = k1
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();
        assert_eq!(k2.verify(issued.as_str()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_algorithm_mismatch() {
        let secret = SigningSecret::generate();
        let hs256 = CapabilityIssuer::new(TokenConfig::new(secret.clone()));
        let hs512 = CapabilityIssuer::new(
            TokenConfig::new(secret).with_algorithm(SigningAlgorithm::HS512),
        );

        let issued = hs512
            .issue(UserId(1), FileId(1), Duration::minutes(1))
            .unwrap();
        assert!(hs512.verify(issued.as_str()).is_ok());
        assert_eq!(hs256.verify(issued.as_str()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_inputs() {
        let issuer = test_issuer();
        for input in ["", "not-a-token", "a.b", "a.b.c", "....", "%%%.%%%.%%%"] {
            let result = issuer.verify(input);
            assert!(
                matches!(result, Err(TokenError::Malformed { .. })),
                "expected malformed for {input:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_non_single_use() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(42), FileId(7), Duration::minutes(15))
            .unwrap();

        let first = issuer.verify(issued.as_str()).unwrap();
        let second = issuer.verify(issued.as_str()).unwrap();
        let third = issuer.verify(issued.as_str()).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_subject_binding_is_callers_job() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(1), FileId(7), Duration::minutes(15))
            .unwrap();

        // The issuer accepts the token regardless of who presents it.
        let claim = issuer.verify(issued.as_str()).unwrap();
        // The caller-side check rejects the wrong user.
        assert!(matches!(
            claim.ensure_subject(UserId(2)),
            Err(TokenError::SubjectMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let issuer = test_issuer();
        for ttl in [
            Duration::zero(),
            Duration::seconds(-60),
            Duration::milliseconds(500),
        ] {
            assert!(matches!(
                issuer.issue(UserId(1), FileId(1), ttl),
                Err(TokenError::InvalidTtl { .. })
            ));
        }
    }

    #[test]
    fn test_deterministic_encoding() {
        let t0 = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let (issuer, _clock) = fixed_issuer(t0);

        let a = issuer
            .issue(UserId(3), FileId(4), Duration::minutes(1))
            .unwrap();
        let b = issuer
            .issue(UserId(3), FileId(4), Duration::minutes(1))
            .unwrap();
        assert_eq!(a.as_str(), b.as_str());

        let c = issuer
            .issue(UserId(3), FileId(5), Duration::minutes(1))
            .unwrap();
        assert_ne!(a.as_str(), c.as_str());
    }

    #[test]
    fn test_debug_hides_token() {
        let issuer = test_issuer();
        let issued = issuer
            .issue(UserId(1), FileId(1), Duration::minutes(1))
            .unwrap();
        let debug = format!("{issued:?}");
        assert!(!debug.contains(issued.as_str()));
        assert!(format!("{issuer:?}").contains("key_id"));
    }
}
