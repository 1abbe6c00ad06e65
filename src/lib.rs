use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation core.
pub mod guard;
pub mod navigation;
pub mod session;
pub mod shell;
pub mod views;

// Application services and HTTP surface.
pub mod auth;
pub mod config;
pub mod documents;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod screens;

// Routing split: public versus guarded.
pub mod routes;
use routes::{guarded, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use documents::{DocumentState, HtmlDocumentGenerator, MockDocumentGenerator};
pub use navigation::Catalog;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use session::SessionContext;
pub use views::ViewRegistry;

use auth::AuthorizedRoute;
use guard::GuardDecision;

/// Where unauthenticated navigation is sent.
pub const LOGIN_PATH: &str = "/login";
/// Response header carrying the notice of a denied navigation.
pub const NOTICE_HEADER: &str = "x-guard-notice";

/// ApiDoc
///
/// OpenAPI document for the named endpoints, served at `/api-docs/openapi.json`.
/// The generated CRUD screens share the `ShellView` envelope documented here.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::profile, handlers::navigation,
        handlers::toggle_shell, handlers::reports, handlers::print_report
    ),
    components(
        schemas(
            models::Role, models::Identity, models::LoginRequest, models::SessionResponse,
            models::Icon, models::NavigationItem, models::Notice, models::NoticeLevel,
            models::ShellView, models::ShellHeader, models::SidePanel, models::ShellFooter,
            models::ScreenView, models::ShellToggleResponse, models::ReportLink,
        )
    ),
    tags(
        (name = "academy-portal", description = "School administration portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container of every service a request may need. Cloned per request;
/// all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Data-access layer. Only reachable from screens the guard has cleared.
    pub repo: RepositoryState,
    /// Printable-document generator used by report screens.
    pub documents: DocumentState,
    /// Session identities.
    pub sessions: SessionContext,
    /// Per-session route guards, shells and notices.
    pub views: Arc<ViewRegistry>,
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Assembles the state around the release navigation catalog.
    pub fn new(
        repo: RepositoryState,
        documents: DocumentState,
        sessions: SessionContext,
        config: AppConfig,
    ) -> Self {
        Self::with_catalog(repo, documents, sessions, config, Catalog::default())
    }

    pub fn with_catalog(
        repo: RepositoryState,
        documents: DocumentState,
        sessions: SessionContext,
        config: AppConfig,
        catalog: Catalog,
    ) -> Self {
        let views = Arc::new(ViewRegistry::new(Arc::new(catalog), config.brand.clone()));
        Self {
            repo,
            documents,
            sessions,
            views,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionContext {
    fn from_ref(app_state: &AppState) -> SessionContext {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// route_guard
///
/// The one route guard, run for every request that reaches the guarded router.
///
/// *Ordering*: the decision is taken from resident state only (session header, identity
/// store, catalog) before `next` runs, so a screen handler, and with it any repository
/// call, only ever executes after authorization succeeded. Outcomes are never errors:
/// - no identity (missing, malformed, unknown role, login in flight): 303 to `/login`;
/// - authenticated but not entitled: 303 to the role's landing screen, with a notice;
/// - authorized: the request proceeds carrying an `AuthorizedRoute`.
async fn route_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(session) = auth::session_id(request.headers()) else {
        tracing::debug!(uri = %request.uri(), "no session; redirecting to login");
        return Redirect::to(LOGIN_PATH).into_response();
    };
    let identity = state.sessions.get_identity(session);
    let path = request.uri().path().to_string();

    match state.views.navigate(session, identity.as_ref(), &path) {
        GuardDecision::Render(grant) => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(AuthorizedRoute {
                    session,
                    identity,
                    grant,
                });
            }
            next.run(request).await
        }
        GuardDecision::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
        GuardDecision::Deny {
            redirect_to,
            notice,
        } => {
            let mut response = Redirect::to(redirect_to).into_response();
            if let Ok(value) = HeaderValue::from_str(&notice.message) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(NOTICE_HEADER), value);
            }
            response
        }
    }
}

/// create_router
///
/// Assembles the routing structure: the guarded router wrapped by `route_guard`, the
/// public router and the API docs, then the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(NOTICE_HEADER)]);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    // The guard layer is applied before merging so it covers the guarded routes and
    // their fallback, and nothing else.
    let base_router = guarded::guarded_routes()
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .merge(public::public_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a fresh UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span around the whole request/response.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (applied last)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, correlated by its `x-request-id`.
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
