use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use user_api::{
    auth::{InMemoryUserStore, PgUserStore, UserStore},
    config::{AppConfig, StoreBackend},
    create_router, db, AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG controls verbosity, info by default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("User API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    let store: Arc<dyn UserStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            Arc::new(PgUserStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory user store; accounts are lost on restart");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let state = AppState::from_config(&config, store).expect("Failed to initialise services");

    if let Some(admin) = &config.admin {
        state
            .auth_service
            .ensure_admin(&admin.email, &admin.password)
            .await
            .expect("Failed to seed administrator account");
    }

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("User API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
