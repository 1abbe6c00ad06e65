use crate::{AppState, auth::AuthorizedRoute, handlers, screens::SCREENS};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde_json::Value;
use uuid::Uuid;

/// Guarded Router Module
///
/// Every screen of the portal. The route guard is layered over this router (fallback
/// included) in `create_router`, so no handler here runs before the guard has cleared the
/// current role for the requested path, and handlers take `AuthorizedRoute` as proof.
///
/// Which role may open what is not decided here: that is the navigation catalog.
pub fn guarded_routes() -> Router<AppState> {
    let mut router = Router::new()
        // --- Role-agnostic ---
        .route("/", get(handlers::home))
        .route("/profile", get(handlers::profile))
        .route("/navigation", get(handlers::navigation))
        .route("/shell/toggle", post(handlers::toggle_shell))
        // --- Landing dashboards ---
        .route("/admin", get(handlers::dashboard))
        .route("/instructor", get(handlers::dashboard))
        .route("/student", get(handlers::dashboard))
        // --- Reports ---
        .route("/reports", get(handlers::reports))
        .route("/reports/{collection}/print", get(handlers::print_report));

    // --- CRUD screens, one pair of routes per row of the screen table ---
    for screen in SCREENS {
        router = router
            .route(
                screen.path,
                get(move |route: AuthorizedRoute, State(state): State<AppState>| {
                    handlers::list_records(screen, route, state)
                })
                .post(
                    move |route: AuthorizedRoute,
                          State(state): State<AppState>,
                          Json(payload): Json<Value>| {
                        handlers::create_record(screen, route, state, payload)
                    },
                ),
            )
            .route(
                &format!("{}/{{id}}", screen.path),
                get(
                    move |route: AuthorizedRoute,
                          State(state): State<AppState>,
                          Path(id): Path<Uuid>| {
                        handlers::show_record(screen, route, state, id)
                    },
                )
                .put(
                    move |route: AuthorizedRoute,
                          State(state): State<AppState>,
                          Path(id): Path<Uuid>,
                          Json(payload): Json<Value>| {
                        handlers::update_record(screen, route, state, id, payload)
                    },
                )
                .delete(
                    move |route: AuthorizedRoute,
                          State(state): State<AppState>,
                          Path(id): Path<Uuid>| {
                        handlers::delete_record(screen, route, state, id)
                    },
                ),
            );
    }

    router.fallback(handlers::unknown_screen)
}
