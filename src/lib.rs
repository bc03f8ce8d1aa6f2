use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
};
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore, cookie::SameSite};
use tracing::{Level, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// --- Module Structure ---

pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;

// Routers grouped by access tier (public, front-office, back-office).
pub mod routes;
use routes::{admin, public, shopper};

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::Error;
pub use gatekeeper::{Gatekeeper, GatekeeperConfig};
pub use repository::{MemoryRepository, RepositoryState};

/// Context path every mall route is mounted under.
pub const CONTEXT_PATH: &str = "/mall";

/// ApiDoc
///
/// OpenAPI description of the JSON `.do` endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::check_username, handlers::list_classifications, handlers::hot_products,
        handlers::get_product, handlers::new_products, handlers::category_products,
        handlers::add_to_cart, handlers::list_cart,
        handlers::list_orders, handlers::order_detail,
        handlers::list_users, handlers::admin_list_products, handlers::admin_list_orders
    ),
    components(
        schemas(
            models::User, models::Classification, models::Product, models::Order,
            models::OrderItem
        )
    ),
    tags(
        (name = "mall", description = "Demo mall storefront and back-office API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for everything handlers and the gatekeeper need.
#[derive(Clone)]
pub struct AppState {
    /// Users, administrators and the catalog.
    pub repo: RepositoryState,
    /// The loaded configuration.
    pub config: AppConfig,
    /// Access policy, built once from `config.gatekeeper`.
    pub gate: Arc<Gatekeeper>,
}

impl AppState {
    /// Fails when the gatekeeper configuration is unusable.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Result<Self, Error> {
        let gate = Arc::new(Gatekeeper::new(config.gatekeeper.clone())?);
        Ok(Self { repo, config, gate })
    }
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<Gatekeeper> {
    fn from_ref(app_state: &AppState) -> Arc<Gatekeeper> {
        app_state.gate.clone()
    }
}

/// found
///
/// `302 Found` to `location`, the redirect used by login, logout and the gatekeeper.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// session_layer
///
/// In-memory session store with cookies that are HTTP-only, `SameSite=Lax`, secure
/// in production, and expire after the configured idle time.
pub fn session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.env == Env::Production)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            config.session_idle_minutes,
        )))
}

/// create_router
///
/// Assembles the mall. Layers, from the outside in:
/// request id, tracing, request id propagation, sessions, gatekeeper, routes.
/// The gatekeeper sits inside the session layer so it can read login state, and
/// wraps the fallback too, so unknown `.do`/`.html` paths are gated like real ones.
pub fn create_router<Store>(state: AppState, sessions: SessionManagerLayer<Store>) -> Router
where
    Store: SessionStore + Clone,
{
    let x_request_id = HeaderName::from_static("x-request-id");

    let mall = Router::new()
        .merge(public::public_routes())
        .merge(shopper::shopper_routes())
        .nest("/admin", admin::admin_routes(&state.config.static_dir))
        // Scripts, styles, fonts: never gated.
        .nest_service("/static", ServeDir::new(&state.config.static_dir));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(CONTEXT_PATH, mall)
        .fallback(handlers::not_found)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            gatekeeper::gatekeeper_middleware,
        ))
        .layer(sessions)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
}

/// trace_span_logger
///
/// Span for one request, carrying the method, URI and `x-request-id` so every log
/// line of the request, including the gatekeeper's, is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
