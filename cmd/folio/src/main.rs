//! # folio
//!
//! Composition root: loads settings, picks the adapters, wires the services
//! and serves the HTTP API until Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{AppState, HttpConfig, Metrics};
use auth_adapters::{Argon2Hasher, JwtTokenService, RecaptchaVerifier};
use configs::{DatabaseBackend, LogFormat, Settings};
use domains::{HistoryRepository, PhotoRepository, UploadPolicy, UserRepository};
use services::{AuthService, AuthSettings, GalleryService, PhotoAdminService};
use storage_adapters::{
    InMemoryVisitLimiter, LocalMediaStorage, MemoryHistoryRepository, MemoryPhotoRepository,
    MemoryUserRepository, PUBLIC_PREFIX,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    photos: Arc<dyn PhotoRepository>,
    history: Arc<dyn HistoryRepository>,
    users: Arc<dyn UserRepository>,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn open_stores(settings: &Settings) -> anyhow::Result<Stores> {
    match settings.database.backend {
        DatabaseBackend::Memory => {
            warn!("using the in-memory backend; data is lost on restart");
            Ok(Stores {
                photos: Arc::new(MemoryPhotoRepository::new()),
                history: Arc::new(MemoryHistoryRepository::new()),
                users: Arc::new(MemoryUserRepository::new()),
            })
        }
        #[cfg(feature = "db-postgres")]
        DatabaseBackend::Postgres => {
            use secrecy::ExposeSecret;
            use storage_adapters::{
                connect, PgHistoryRepository, PgPhotoRepository, PgUserRepository,
            };

            let url = settings
                .database
                .url
                .as_ref()
                .context("database.url is not set")?;
            let pool = connect(url.expose_secret(), settings.database.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            info!("connected to PostgreSQL; migrations applied");
            Ok(Stores {
                photos: Arc::new(PgPhotoRepository::new(pool.clone())),
                history: Arc::new(PgHistoryRepository::new(pool.clone())),
                users: Arc::new(PgUserRepository::new(pool)),
            })
        }
        #[cfg(not(feature = "db-postgres"))]
        DatabaseBackend::Postgres => {
            anyhow::bail!(
                "built without the db-postgres feature; set FOLIO__DATABASE__BACKEND=memory"
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(settings.app.log_format);
    info!(env = ?settings.app.env, backend = ?settings.database.backend, "starting folio");

    let stores = open_stores(&settings).await?;

    let media = Arc::new(
        LocalMediaStorage::new(
            settings.uploads.dir.clone(),
            settings.server.public_base_url.clone(),
        )
        .context("preparing the upload directory")?,
    );
    let limiter = Arc::new(InMemoryVisitLimiter::new(Duration::from_secs(
        settings.visits.window_secs,
    )));
    let captcha = Arc::new(
        RecaptchaVerifier::new(settings.auth.recaptcha_secret.clone())
            .context("building the captcha client")?,
    );
    if settings.auth.recaptcha_secret.is_none() {
        warn!("RECAPTCHA_SECRET_KEY is not set; every login will fail");
    }

    let auth = AuthService::new(
        stores.users,
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtTokenService::new(&settings.auth.jwt_secret)),
        captcha,
        AuthSettings {
            production: settings.is_production(),
            expected_dev_hostname: settings.auth.captcha_dev_hostname.clone(),
        },
    );
    let photos = PhotoAdminService::new(stores.photos.clone(), stores.history, media);
    let gallery = GalleryService::new(stores.photos, limiter);

    let state = AppState {
        auth: Arc::new(auth),
        photos: Arc::new(photos),
        gallery: Arc::new(gallery),
        upload: UploadPolicy::new(settings.uploads.max_bytes),
        metrics: Arc::new(Metrics::new()),
    };
    let http = HttpConfig {
        cors_origins: settings.server.cors_origins.clone(),
        upload_dir: settings.uploads.dir.clone(),
        uploads_path: PUBLIC_PREFIX.to_string(),
    };
    let app = api_adapters::router(state, &http);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
