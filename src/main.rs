use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use clarifi::app;
use clarifi::auth::AuthConfig;
use clarifi::client::EmailClient;
use clarifi::crypto::{SigningKey, TokenKeys};
use clarifi::settings::Settings;
use clarifi::storage::LocalFileStore;
use clarifi::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    let subscriber = telemetry::create_subscriber(
        settings.app.log_filter().to_string(),
        std::io::stdout,
    );
    telemetry::set_subscriber(subscriber)?;

    let pool = PgPool::connect_with(settings.database.with_db())
        .await
        .context("Failed to connect to the database")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let auth_config = {
        let auth = &settings.auth;
        let keys = TokenKeys::new(
            SigningKey::new(auth.access_token_secret())?,
            SigningKey::new(auth.refresh_token_secret())?,
            auth.access_token_ttl(),
            auth.refresh_token_ttl(),
            auth.reset_token_ttl(),
        );
        AuthConfig {
            keys,
            secure_cookies: auth.secure_cookies(),
            password_reset_url: auth.password_reset_url()?,
        }
    };

    let email_client = EmailClient::new(
        settings.email.sender()?,
        settings.email.api_timeout(),
        settings.email.api_base_url()?,
        settings.email.api_auth_token(),
    )?;

    let store = Arc::new(LocalFileStore::new(settings.uploads.directory()));

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!(addr = ?listener.local_addr()?, "Listening");

    app::run(
        listener,
        pool,
        auth_config,
        email_client,
        store,
        settings.uploads.max_file_size(),
    )?
    .await
    .context("Failed to run app")
}
