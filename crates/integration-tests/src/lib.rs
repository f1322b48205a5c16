//! Shared harness for the end-to-end tests: the real router over in-memory
//! adapters, a real JWT service, a temporary upload directory and a captcha
//! stub that trusts one magic token.

use std::net::IpAddr;
use std::sync::Arc;

use api_adapters::{AppState, HttpConfig, Metrics};
use async_trait::async_trait;
use auth_adapters::{Argon2Hasher, JwtTokenService};
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use domains::{
    AdminUser, CaptchaVerdict, CaptchaVerifier, CredentialHasher, PhotoRepository, Role,
    TokenService, UploadPolicy, UserRepository,
};
use secrecy::SecretString;
use serde_json::Value;
use services::{AuthService, AuthSettings, GalleryService, PhotoAdminService};
use storage_adapters::{
    InMemoryVisitLimiter, LocalMediaStorage, MemoryHistoryRepository, MemoryPhotoRepository,
    MemoryUserRepository, DEFAULT_VISIT_WINDOW, PUBLIC_PREFIX,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-secret-0123456789abcdef";
pub const ADMIN_USERNAME: &str = "curator";
pub const ADMIN_EMAIL: &str = "curator@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Passes with the expected development hostname.
pub const HUMAN_CAPTCHA: &str = "human";
/// Passes, but reports a foreign hostname.
pub const FOREIGN_CAPTCHA: &str = "foreign";

/// Smallest valid PNG header plus padding; content is never decoded.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR-folio-test-image";

pub struct StubCaptcha;

#[async_trait]
impl CaptchaVerifier for StubCaptcha {
    async fn verify(
        &self,
        token: &str,
        _remote_ip: Option<IpAddr>,
    ) -> domains::Result<CaptchaVerdict> {
        let verdict = match token {
            HUMAN_CAPTCHA => CaptchaVerdict {
                success: true,
                hostname: Some("localhost".into()),
            },
            FOREIGN_CAPTCHA => CaptchaVerdict {
                success: true,
                hostname: Some("evil.example".into()),
            },
            _ => CaptchaVerdict::default(),
        };
        Ok(verdict)
    }
}

/// Decoded response; non-JSON bodies come back as a string value.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub photos: Arc<MemoryPhotoRepository>,
    pub history: Arc<MemoryHistoryRepository>,
    pub admin: AdminUser,
    /// Valid bearer token for [`Self::admin`].
    pub token: String,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with_upload_limit(UploadPolicy::default().max_bytes).await
    }

    pub async fn with_upload_limit(max_bytes: usize) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp dir");
        let photos = Arc::new(MemoryPhotoRepository::new());
        let history = Arc::new(MemoryHistoryRepository::new());
        let users = Arc::new(MemoryUserRepository::new());
        let hasher = Arc::new(Argon2Hasher::new());
        let tokens = Arc::new(JwtTokenService::new(&SecretString::from(JWT_SECRET.to_string())));

        let admin = AdminUser {
            id: Uuid::now_v7(),
            username: ADMIN_USERNAME.into(),
            email: ADMIN_EMAIL.into(),
            password_hash: hasher.hash(ADMIN_PASSWORD).expect("hash"),
            role: Role::Admin,
            created_at: Utc::now(),
            last_login: None,
        };
        users.insert(&admin).await.expect("seed admin");
        let token = tokens.issue(&admin).expect("token");

        let media = Arc::new(LocalMediaStorage::new(upload_dir.path(), "").expect("media dir"));
        let auth = AuthService::new(
            users,
            hasher,
            tokens,
            Arc::new(StubCaptcha),
            AuthSettings::default(),
        );
        let state = AppState {
            auth: Arc::new(auth),
            photos: Arc::new(PhotoAdminService::new(photos.clone(), history.clone(), media)),
            gallery: Arc::new(GalleryService::new(
                photos.clone(),
                Arc::new(InMemoryVisitLimiter::new(DEFAULT_VISIT_WINDOW)),
            )),
            upload: UploadPolicy::new(max_bytes),
            metrics: Arc::new(Metrics::new()),
        };
        let http = HttpConfig {
            cors_origins: Vec::new(),
            upload_dir: upload_dir.path().to_path_buf(),
            uploads_path: PUBLIC_PREFIX.to_string(),
        };

        Self {
            router: api_adapters::router(state, &http),
            photos,
            history,
            admin,
            token,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).expect("request")).await
    }

    pub async fn get_authed(&self, uri: &str) -> TestResponse {
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// JSON request; `authed` attaches the admin bearer token.
    pub async fn json(&self, method: Method, uri: &str, body: Value, authed: bool) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if authed {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request")).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    /// Creates a photo with a PNG and the given text fields; panics unless 201.
    pub async fn create_photo(&self, fields: &[(&str, &str)]) -> Value {
        let mut form = MultipartForm::new().file("image", "shot.png", "image/png", PNG_BYTES);
        for (name, value) in fields {
            form = form.text(name, value);
        }
        let response = self.multipart(Method::POST, "/api/photos", form).await;
        assert_eq!(response.status, StatusCode::CREATED, "create failed: {}", response.body);
        response.body
    }

    /// Creates a visible photo and returns its id.
    pub async fn create_public_photo(&self, title: &str, extra: &[(&str, &str)]) -> String {
        let mut fields = vec![("title", title), ("descriptionMd", "desc"), ("isVisible", "true")];
        fields.extend_from_slice(extra);
        let photo = self.create_photo(&fields).await;
        photo["id"].as_str().expect("id").to_string()
    }

    pub async fn stored(&self, id: &str) -> domains::Photo {
        let id = id.parse().expect("photo id");
        self.photos
            .find_by_id(id)
            .await
            .expect("repository")
            .expect("photo exists")
    }

    pub fn uploaded_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

/// Hand-assembled `multipart/form-data` body.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("folio-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}
