use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that run without the route guard. None of them reads screen data: login
/// only looks up the profile of the user being authenticated.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /login, POST /login
        // Where the route guard sends unauthenticated navigation; POST exchanges an
        // external auth token for a session identity.
        .route("/login", get(handlers::login_screen).post(handlers::login))
        // POST /logout
        // Clears the identity of the session named in `x-session-id`.
        .route("/logout", post(handlers::logout))
}
