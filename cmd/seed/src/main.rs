//! # seed
//!
//! Creates the single admin account from `ADMIN_USERNAME`, `ADMIN_EMAIL`
//! and `ADMIN_PASSWORD`. Safe to run on every deploy: it does nothing when
//! a variable is missing or the account already exists.

use anyhow::Context;
use chrono::Utc;
use configs::{AdminSettings, DatabaseBackend, Settings};
use domains::{AdminUser, CredentialHasher, Role, UserRepository};
use secrecy::ExposeSecret;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    MissingVariables,
    AlreadyExists,
    Created { username: String },
}

async fn seed_admin(
    admin: &AdminSettings,
    users: &dyn UserRepository,
    hasher: &dyn CredentialHasher,
) -> anyhow::Result<Outcome> {
    let (Some(username), Some(email), Some(password)) =
        (admin.username.as_deref(), admin.email.as_deref(), admin.password.as_ref())
    else {
        return Ok(Outcome::MissingVariables);
    };
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if users.find_by_login(username, &email).await?.is_some() {
        return Ok(Outcome::AlreadyExists);
    }

    let user = AdminUser {
        id: Uuid::now_v7(),
        username: username.to_string(),
        email,
        password_hash: hasher.hash(password.expose_secret())?,
        role: Role::Admin,
        created_at: Utc::now(),
        last_login: None,
    };
    users.insert(&user).await?;
    Ok(Outcome::Created {
        username: user.username,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().context("loading configuration")?;
    if settings.database.backend != DatabaseBackend::Postgres {
        anyhow::bail!("seeding only makes sense against the postgres backend");
    }
    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url is not set")?;
    let pool = storage_adapters::connect(url.expose_secret(), 1)
        .await
        .context("connecting to PostgreSQL")?;
    let users = storage_adapters::PgUserRepository::new(pool);
    let hasher = auth_adapters::Argon2Hasher::new();

    match seed_admin(&settings.admin, &users, &hasher).await? {
        Outcome::MissingVariables => {
            info!("ADMIN_USERNAME, ADMIN_EMAIL or ADMIN_PASSWORD missing; nothing to seed")
        }
        Outcome::AlreadyExists => info!("admin account already present; nothing to seed"),
        Outcome::Created { username } => info!(%username, "admin account created"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_adapters::Argon2Hasher;
    use secrecy::SecretString;
    use storage_adapters::MemoryUserRepository;

    fn admin(username: Option<&str>, email: Option<&str>, password: Option<&str>) -> AdminSettings {
        AdminSettings {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password: password.map(|p| SecretString::from(p.to_string())),
        }
    }

    #[tokio::test]
    async fn creates_once_then_skips() {
        let users = MemoryUserRepository::new();
        let hasher = Argon2Hasher::new();
        let settings = admin(Some(" owner "), Some("Owner@Example.COM"), Some("correct horse"));

        let first = seed_admin(&settings, &users, &hasher).await.unwrap();
        assert_eq!(first, Outcome::Created { username: "owner".into() });

        let stored = users
            .find_by_login("owner", "owner@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email, "owner@example.com");
        assert_eq!(stored.id.get_version_num(), 7);
        assert!(hasher.verify("correct horse", &stored.password_hash));

        let second = seed_admin(&settings, &users, &hasher).await.unwrap();
        assert_eq!(second, Outcome::AlreadyExists);
    }

    #[tokio::test]
    async fn missing_variable_skips() {
        let users = MemoryUserRepository::new();
        let settings = admin(Some("owner"), None, Some("pw"));
        let outcome = seed_admin(&settings, &users, &Argon2Hasher::new())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::MissingVariables);
    }
}
