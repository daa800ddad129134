// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use exampro::ai::{GeminiClient, SharedGenerator};
use exampro::config::Config;
use exampro::handlers::auth::{create_account, find_user};
use exampro::models::user::Role;
use exampro::routes;
use exampro::session::SessionRegistry;
use exampro::state::AppState;
use exampro::store::{DocumentStore, MemoryStore, PgDocumentStore, SharedStore};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: SharedStore = match &config.database_url {
        Some(url) => Arc::new(connect_postgres(url).await),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let generator: Option<SharedGenerator> = match GeminiClient::from_config(&config) {
        Ok(Some(client)) => {
            tracing::info!("Generative text service enabled (model {})", config.gemini_model);
            Some(Arc::new(client))
        }
        Ok(None) => {
            tracing::warn!("GEMINI_API_KEY not set, AI endpoints will answer 503");
            None
        }
        Err(e) => {
            tracing::error!("Failed to initialise generative text client: {}", e);
            None
        }
    };

    let state = AppState {
        store,
        config: config.clone(),
        sessions: SessionRegistry::new(),
        generator,
    };

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listening address");

    axum::serve(listener, app).await.expect("Server error");
}

/// Connects with a bounded retry loop and applies migrations.
async fn connect_postgres(url: &str) -> PgDocumentStore {
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    PgDocumentStore::new(pool)
}

async fn seed_admin_user(
    store: &dyn DocumentStore,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if find_user(store, username).await?.is_none() {
            tracing::info!("Seeding admin user: {}", username);
            create_account(store, username, password, Role::Admin).await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
