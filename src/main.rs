use academy_portal::{
    AppState, HtmlDocumentGenerator, InMemoryRepository, PostgresRepository, RepositoryState,
    SessionContext,
    config::{AppConfig, Env},
    create_router,
    documents::DocumentState,
    session::{FileIdentityStore, IdentityStore, MemoryIdentityStore},
};
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, installs logging, wires the repository, identity store and
/// document generator into the shared state, and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "academy_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // Pretty output for humans locally, JSON for the log aggregator in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Repository Initialization (Postgres, or in-memory without DATABASE_URL)
    let repo: RepositoryState = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory repository");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 5. Identity Store Initialization
    let store: Arc<dyn IdentityStore> = match &config.session_store_path {
        Some(path) => Arc::new(
            FileIdentityStore::open(path).expect("FATAL: cannot open SESSION_STORE_PATH"),
        ),
        None => Arc::new(MemoryIdentityStore::new()),
    };

    let sessions =
        SessionContext::new(store).with_ttl(Duration::seconds(config.session_ttl_secs));

    // 6. Unified State Assembly
    let documents: DocumentState = Arc::new(HtmlDocumentGenerator::new());
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(repo, documents, sessions, config);

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: cannot bind BIND_ADDR");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("server error");
}
