use mall_gate::{
    AppConfig, AppState, Env, MemoryRepository, RepositoryState, create_router,
    repository::seed_demo_catalog,
    session_layer,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, seed data, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on bad values or missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging: RUST_LOG wins, otherwise debug for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mall_gate=debug,tower_http=info".into());

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

    // 3. Persistence: in-memory, seeded with the back-office account.
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    repo.create_admin(&config.admin_username, &config.admin_password)
        .await
        .expect("FATAL: failed to seed the administrator account");
    if config.env == Env::Local {
        seed_demo_catalog(repo.as_ref()).await;
    }

    // 4. Router, sessions and gatekeeper.
    let bind_addr = config.bind_addr;
    let sessions = session_layer(&config);
    let state = AppState::new(repo, config).expect("FATAL: invalid gatekeeper configuration");
    let app = create_router(state, sessions);

    let listener = TcpListener::bind(bind_addr)
        .await
        .expect("FATAL: failed to bind listener");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("Storefront: http://{bind_addr}/mall/index.html");

    axum::serve(listener, app)
        .await
        .expect("FATAL: server terminated unexpectedly");
}
