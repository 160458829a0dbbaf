//! End-to-end flows through the file-sharing service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use docshare_capabilities::{FixedClock, TokenAuthority, TokenConfig, TokenPurpose, TtlPolicy};
use docshare_core::{FileId, FileRecord, NewFile, Role, Timestamp, UserId, UserRecord};
use docshare_crypto::SigningSecret;
use docshare_gateway::{ACCESS_DENIED, FileShareService, GatewayError, ServiceSettings};
use docshare_storage::{
    FileCatalog, MemoryBlobStore, MemoryUserDirectory, StorageError, StorageResult,
};
use tokio::io::AsyncReadExt;

const PASSWORD: &str = "hunter2-but-longer";

struct Harness {
    service: FileShareService,
    clock: Arc<FixedClock>,
}

fn settings() -> ServiceSettings {
    ServiceSettings::default().with_bcrypt_cost(4)
}

fn authority(clock: &Arc<FixedClock>) -> TokenAuthority {
    TokenAuthority::new(
        &TokenConfig::new(SigningSecret::generate()),
        TtlPolicy::default(),
    )
    .with_clock(clock.clone())
}

fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(
        Timestamp::from_unix_seconds(1_700_000_000).unwrap(),
    ));
    let service = FileShareService::in_memory(authority(&clock), settings());
    Harness { service, clock }
}

fn token_of(link: &str) -> &str {
    link.rsplit('/').next().unwrap()
}

async fn read_all(download: docshare_gateway::Download) -> Vec<u8> {
    let mut reader = download.stream.reader;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    buf
}

impl Harness {
    /// Sign up, verify and log in; returns the authenticated account.
    async fn account(&self, email: &str, role: Role) -> UserRecord {
        let signup = self.service.signup(email, PASSWORD, role).await.unwrap();
        self.service
            .verify_email(token_of(&signup.verify_link))
            .await
            .unwrap();
        let session = self.service.login(email, PASSWORD).await.unwrap();
        self.service
            .authenticate(&session.access_token)
            .await
            .unwrap()
    }

    async fn upload(&self, ops: &UserRecord, name: &str, bytes: &[u8]) -> FileRecord {
        self.service.upload_file(ops, name, bytes).await.unwrap()
    }
}

#[tokio::test]
async fn test_full_share_flow() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let client = h.account("client@example.com", Role::Client).await;

    let record = h.upload(&ops, "Q3 report.docx", b"quarterly numbers").await;
    assert_eq!(record.filename, "Q3 report.docx");
    assert_eq!(record.uploader_id, ops.id);

    let listing = h.service.list_files(&client).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, record.id);
    assert_eq!(listing[0].filename, "Q3 report.docx");

    let link = h.service.download_link(&client, record.id).await.unwrap();
    assert!(
        link.download_link
            .starts_with("http://localhost:8000/client/secure-download/")
    );

    let download = h
        .service
        .secure_download(&client, token_of(&link.download_link))
        .await
        .unwrap();
    assert_eq!(download.filename, "Q3 report.docx");
    assert_eq!(download.stream.len, 17);
    assert_eq!(read_all(download).await, b"quarterly numbers");
}

#[tokio::test]
async fn test_signup_link_and_claim() {
    let h = harness();
    let signup = h
        .service
        .signup("new@example.com", PASSWORD, Role::Client)
        .await
        .unwrap();
    assert!(
        signup
            .verify_link
            .starts_with("http://localhost:8000/client/verify-email/")
    );

    let claim = h
        .service
        .tokens()
        .verify(TokenPurpose::EmailVerification, token_of(&signup.verify_link))
        .unwrap();
    assert_eq!(claim.subject_id, UserId(1));
    assert_eq!(claim.resource_id, FileId::NONE);
    assert_eq!(claim.expires_at.unix_seconds(), 1_700_086_400);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let h = harness();
    h.service
        .signup("dup@example.com", PASSWORD, Role::Client)
        .await
        .unwrap();

    let err = h
        .service
        .signup("DUP@example.com", PASSWORD, Role::Ops)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.public_message(), "Email already registered");
}

#[tokio::test]
async fn test_signup_validation() {
    let h = harness();

    let err = h
        .service
        .signup("not-an-email", PASSWORD, Role::Client)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);

    let err = h
        .service
        .signup("short@example.com", "abc", Role::Client)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_login_failures() {
    let h = harness();
    h.service
        .signup("client@example.com", PASSWORD, Role::Client)
        .await
        .unwrap();

    let err = h
        .service
        .login("client@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Email not verified");

    let err = h
        .service
        .login("client@example.com", "wrong password")
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Incorrect credentials");

    let err = h
        .service
        .login("nobody@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.public_message(), "Incorrect credentials");
}

#[tokio::test]
async fn test_unverified_ops_may_log_in() {
    let h = harness();
    h.service
        .signup("ops@example.com", PASSWORD, Role::Ops)
        .await
        .unwrap();

    let session = h.service.login("ops@example.com", PASSWORD).await.unwrap();
    assert_eq!(session.token_type, "bearer");
    let ops = h
        .service
        .authenticate(&format!("Bearer {}", session.access_token))
        .await
        .unwrap();
    assert_eq!(ops.role, Role::Ops);
    assert!(!ops.is_verified);
}

#[tokio::test]
async fn test_verification_link_reusable_then_expires() {
    let h = harness();
    let signup = h
        .service
        .signup("client@example.com", PASSWORD, Role::Client)
        .await
        .unwrap();
    let token = token_of(&signup.verify_link);

    assert!(h.service.verify_email(token).await.unwrap().is_verified);
    assert!(h.service.verify_email(token).await.unwrap().is_verified);

    h.clock.advance(Duration::seconds(86_401));
    let err = h.service.verify_email(token).await.unwrap_err();
    assert_eq!(err.status(), 403);
    assert_eq!(err.public_message(), ACCESS_DENIED);
}

#[tokio::test]
async fn test_verification_for_unknown_user() {
    let h = harness();
    let stray = h
        .service
        .tokens()
        .issue(TokenPurpose::EmailVerification, UserId(99), FileId::NONE)
        .unwrap();

    let err = h.service.verify_email(stray.as_str()).await.unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.public_message(), "Invalid token");
}

#[tokio::test]
async fn test_role_checks() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let client = h.account("client@example.com", Role::Client).await;
    let record = h.upload(&ops, "deck.pptx", b"slides").await;

    let err = h
        .service
        .upload_file(&client, "deck.pptx", b"x")
        .await
        .unwrap_err();
    assert_eq!(err.status(), 403);
    assert_eq!(err.public_message(), "Only Ops users can upload files.");

    let err = h.service.list_files(&ops).await.unwrap_err();
    assert_eq!(err.public_message(), "Only clients can list files.");

    let err = h.service.download_link(&ops, record.id).await.unwrap_err();
    assert_eq!(err.status(), 403);
    assert_eq!(err.public_message(), "Only clients can download files.");
}

#[tokio::test]
async fn test_upload_rules() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;

    for bad in ["notes.txt", "docx", "script.docx.sh", "../"] {
        let err = h.service.upload_file(&ops, bad, b"x").await.unwrap_err();
        assert_eq!(err.status(), 400, "{bad:?}");
        assert_eq!(err.public_message(), "Invalid file type.");
    }

    let upper = h.upload(&ops, "SHEET.XLSX", b"cells").await;
    assert_eq!(upper.filename, "SHEET.XLSX");

    let traversal = h.upload(&ops, "../../etc/evil.docx", b"x").await;
    assert_eq!(traversal.filename, "evil.docx");
}

#[tokio::test]
async fn test_upload_size_limit() {
    let clock = Arc::new(FixedClock::new(Timestamp::now()));
    let service = FileShareService::in_memory(
        authority(&clock),
        settings().with_max_upload_bytes(4),
    );
    let h = Harness { service, clock };
    let ops = h.account("ops@example.com", Role::Ops).await;

    assert!(h.service.upload_file(&ops, "a.docx", b"1234").await.is_ok());
    let err = h
        .service
        .upload_file(&ops, "b.docx", b"12345")
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_long_names_rejected_before_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = docshare_config::Config::default();
    cfg.tokens.secret = Some("a passphrase that is long enough to sign".to_owned());
    cfg.storage.upload_dir = dir.path().join("uploads").display().to_string();
    cfg.passwords.bcrypt_cost = 4;

    let service = docshare_gateway::config_bridge::from_config(&cfg)
        .await
        .unwrap();
    service
        .signup("ops@example.com", PASSWORD, Role::Ops)
        .await
        .unwrap();
    let session = service.login("ops@example.com", PASSWORD).await.unwrap();
    let ops = service.authenticate(&session.access_token).await.unwrap();

    // 222 bytes fits once the uuid prefix is added.
    let longest = format!("{}.docx", "a".repeat(217));
    let record = service.upload_file(&ops, &longest, b"doc").await.unwrap();
    assert_eq!(record.filename, longest);
    assert!(record.filepath.is_file());

    let too_long = format!("{}.docx", "a".repeat(218));
    let err = service
        .upload_file(&ops, &too_long, b"doc")
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.public_message(), "Filename too long.");
    let stored = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_same_name_uploads_do_not_collide() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let client = h.account("client@example.com", Role::Client).await;

    let first = h.upload(&ops, "report.docx", b"v1").await;
    let second = h.upload(&ops, "report.docx", b"v2").await;
    assert_ne!(first.id, second.id);
    assert_ne!(first.filepath, second.filepath);

    for (record, expected) in [(first, b"v1"), (second, b"v2")] {
        let link = h.service.download_link(&client, record.id).await.unwrap();
        let download = h
            .service
            .secure_download(&client, token_of(&link.download_link))
            .await
            .unwrap();
        assert_eq!(read_all(download).await, expected);
    }
}

#[tokio::test]
async fn test_download_link_bound_to_subject() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let alice = h.account("alice@example.com", Role::Client).await;
    let bob = h.account("bob@example.com", Role::Client).await;
    let record = h.upload(&ops, "deck.pptx", b"slides").await;

    let link = h.service.download_link(&alice, record.id).await.unwrap();
    let token = token_of(&link.download_link);

    let err = h.service.secure_download(&bob, token).await.unwrap_err();
    assert_eq!(err.status(), 403);
    assert_eq!(err.public_message(), "Token is not valid for this user.");

    assert!(h.service.secure_download(&alice, token).await.is_ok());
}

#[tokio::test]
async fn test_download_link_replays_until_expiry() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let client = h.account("client@example.com", Role::Client).await;
    let record = h.upload(&ops, "deck.pptx", b"slides").await;

    let link = h.service.download_link(&client, record.id).await.unwrap();
    let token = token_of(&link.download_link);

    assert!(h.service.secure_download(&client, token).await.is_ok());
    h.clock.advance(Duration::minutes(15));
    assert!(h.service.secure_download(&client, token).await.is_ok());

    h.clock.advance(Duration::seconds(1));
    let err = h.service.secure_download(&client, token).await.unwrap_err();
    assert!(matches!(err, GatewayError::Token(_)));
    assert_eq!(err.status(), 403);
    assert_eq!(err.public_message(), ACCESS_DENIED);
}

#[tokio::test]
async fn test_tampered_and_foreign_tokens_denied() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let client = h.account("client@example.com", Role::Client).await;
    let record = h.upload(&ops, "deck.pptx", b"slides").await;

    let link = h.service.download_link(&client, record.id).await.unwrap();
    let (signed, signature) = token_of(&link.download_link).rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{signed}.{flipped}{}", &signature[1..]);

    // Garbage, a flipped signature, and a token from another deployment.
    let other = harness();
    let foreign = other
        .service
        .tokens()
        .issue(TokenPurpose::Download, client.id, record.id)
        .unwrap();
    for token in ["not-a-token", tampered.as_str(), foreign.as_str()] {
        let err = h.service.secure_download(&client, token).await.unwrap_err();
        assert_eq!(err.status(), 403, "{token}");
        assert_eq!(err.public_message(), ACCESS_DENIED);
    }
}

#[tokio::test]
async fn test_tokens_do_not_cross_purposes() {
    let h = harness();
    let ops = h.account("ops@example.com", Role::Ops).await;
    let client = h.account("client@example.com", Role::Client).await;
    let record = h.upload(&ops, "deck.pptx", b"slides").await;

    let link = h.service.download_link(&client, record.id).await.unwrap();
    let download_token = token_of(&link.download_link);
    let err = h.service.authenticate(download_token).await.unwrap_err();
    assert_eq!(err.status(), 401);

    let session = h
        .service
        .login("client@example.com", PASSWORD)
        .await
        .unwrap();
    let err = h
        .service
        .secure_download(&client, &session.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), ACCESS_DENIED);
}

#[tokio::test]
async fn test_missing_files() {
    let h = harness();
    let client = h.account("client@example.com", Role::Client).await;

    let err = h
        .service
        .download_link(&client, FileId(404))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(err.public_message(), "File not found.");

    // A valid capability for a file that is not in the catalog.
    let stray = h
        .service
        .tokens()
        .issue(TokenPurpose::Download, client.id, FileId(404))
        .unwrap();
    let err = h
        .service
        .secure_download(&client, stray.as_str())
        .await
        .unwrap_err();
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn test_session_expiry() {
    let h = harness();
    h.account("client@example.com", Role::Client).await;
    let session = h
        .service
        .login("client@example.com", PASSWORD)
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(1_801));
    let err = h
        .service
        .authenticate(&session.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(err.public_message(), docshare_gateway::INVALID_CREDENTIALS);
}

/// Catalog that refuses every insert.
struct BrokenCatalog;

#[async_trait]
impl FileCatalog for BrokenCatalog {
    async fn insert(&self, _file: NewFile) -> StorageResult<FileRecord> {
        Err(StorageError::Internal("catalog offline".into()))
    }

    async fn get(&self, _id: FileId) -> StorageResult<Option<FileRecord>> {
        Ok(None)
    }

    async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_failed_catalog_insert_removes_blob() {
    let clock = Arc::new(FixedClock::new(Timestamp::now()));
    let blobs = Arc::new(MemoryBlobStore::new());
    let service = FileShareService::new(
        Arc::new(MemoryUserDirectory::new()),
        Arc::new(BrokenCatalog),
        blobs.clone(),
        authority(&clock),
        settings(),
    );
    let h = Harness { service, clock };
    let ops = h.account("ops@example.com", Role::Ops).await;

    let err = h
        .service
        .upload_file(&ops, "deck.pptx", b"slides")
        .await
        .unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(err.public_message(), "Internal server error");

    assert!(blobs.is_empty().unwrap());
}

#[tokio::test]
async fn test_from_config_writes_inside_upload_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = docshare_config::Config::default();
    cfg.tokens.secret = Some("a passphrase that is long enough to sign".to_owned());
    cfg.storage.upload_dir = dir.path().join("uploads").display().to_string();
    cfg.passwords.bcrypt_cost = 4;

    let service = docshare_gateway::config_bridge::from_config(&cfg)
        .await
        .unwrap();
    service
        .signup("ops@example.com", PASSWORD, Role::Ops)
        .await
        .unwrap();
    let session = service.login("ops@example.com", PASSWORD).await.unwrap();
    let ops = service.authenticate(&session.access_token).await.unwrap();

    let record = service
        .upload_file(&ops, "../../outside.docx", b"doc")
        .await
        .unwrap();
    assert_eq!(record.filename, "outside.docx");
    assert!(record.filepath.starts_with(dir.path().join("uploads")));
    assert!(record.filepath.is_file());
    assert!(!dir.path().join("outside.docx").exists());
}
