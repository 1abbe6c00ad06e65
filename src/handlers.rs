use crate::{
    AppState,
    auth::{self, AuthorizedRoute},
    documents::{DocumentRequest, DocumentSection},
    error::ApiError,
    models::{
        IdentityDraft, LoginRequest, NavigationItem, ReportLink, ScreenView, SessionResponse,
        ShellToggleResponse, ShellView,
    },
    repository::Collection,
    screens::{self, SCREENS, Screen},
    session::SessionId,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::{Value, json};
use uuid::Uuid;

// --- Session Handlers (public) ---

/// login
///
/// [Public Route] Turns an external authentication result into a session identity.
///
/// *Flow*: every login gets a freshly generated session id; one sent in the session
/// header is cleared first. The new session's guard sits in `Authenticating` until the
/// identity is stored. The user id comes from the provider token (or the local bypass
/// header), the role and display name from the user's profile. Any failure drops the
/// session's view state and nothing is stored.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 401, description = "Authentication failed")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    // A session the caller brings along is signed out, never promoted.
    if let Some(previous) = auth::session_id(&headers) {
        state.sessions.clear_identity(previous)?;
        state.views.logout(previous);
    }
    let session = SessionId::generate();
    state.views.begin_authentication(session);

    match establish_identity(&state, session, &headers, payload).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            state.views.abort_authentication(session);
            Err(e)
        }
    }
}

async fn establish_identity(
    state: &AppState,
    session: SessionId,
    headers: &HeaderMap,
    payload: LoginRequest,
) -> Result<SessionResponse, ApiError> {
    let subject = auth::resolve_subject(&state.config, headers, payload.token.as_deref())?;
    let profile = state
        .repo
        .get_profile(subject.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let identity = state.sessions.set_identity(
        session,
        IdentityDraft {
            id: Some(profile.id.to_string()),
            role: Some(profile.role),
            display_name: Some(profile.display_name),
            expires_at: subject.expires_at,
        },
    )?;
    state.views.complete_authentication(session, &identity);

    Ok(SessionResponse {
        session_id: session.0,
        landing_path: identity.role.landing_path().to_string(),
        navigation: state.views.catalog().items_for(identity.role),
        identity,
    })
}

/// login_screen
///
/// [Public Route] Target of every redirect-to-login. Tells the client how to sign in.
pub async fn login_screen() -> Json<Value> {
    Json(json!({
        "screen": "login",
        "message": "authentication required",
        "submit": { "method": "POST", "path": "/login" },
    }))
}

/// logout
///
/// [Public Route] Clears the session identity and unmounts its shell. Idempotent.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Logged out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(session) = auth::session_id(&headers) {
        state.sessions.clear_identity(session)?;
        state.views.logout(session);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Role-agnostic Screens ---

/// home
///
/// [Guarded, any role] The bare root sends each role to its own dashboard.
pub async fn home(route: AuthorizedRoute) -> Redirect {
    Redirect::to(route.identity.role.landing_path())
}

/// profile
///
/// [Guarded, any role] The current identity, inside the shell.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Profile screen", body = ShellView))
)]
pub async fn profile(route: AuthorizedRoute, State(state): State<AppState>) -> Json<ShellView> {
    let data = json!(route.identity);
    render(&state, &route, data)
}

/// navigation
///
/// [Guarded, any role] The navigation model of the current role.
#[utoipa::path(
    get,
    path = "/navigation",
    responses((status = 200, description = "Navigation entries", body = [NavigationItem]))
)]
pub async fn navigation(
    route: AuthorizedRoute,
    State(state): State<AppState>,
) -> Json<Vec<NavigationItem>> {
    Json(state.views.catalog().items_for(route.identity.role))
}

/// toggle_shell
///
/// [Guarded, any role] Collapses or expands the side panel of the session's shell.
#[utoipa::path(
    post,
    path = "/shell/toggle",
    responses((status = 200, description = "New side panel state", body = ShellToggleResponse))
)]
pub async fn toggle_shell(
    route: AuthorizedRoute,
    State(state): State<AppState>,
) -> Json<ShellToggleResponse> {
    let collapsed = state.views.toggle_side_panel(route.session);
    Json(ShellToggleResponse { collapsed })
}

/// dashboard
///
/// [Guarded, landing screens] Record counts for every screen in the role's navigation.
/// Owner-scoped screens count only the user's own records.
pub async fn dashboard(
    route: AuthorizedRoute,
    State(state): State<AppState>,
) -> Result<Json<ShellView>, ApiError> {
    let role = route.identity.role;
    let mut tiles = Vec::new();
    for screen in screens::visible_screens(state.views.catalog(), role) {
        let count = match screen.scope_for(role, &route.identity.id) {
            Some(filter) => state.repo.list(screen.collection, Some(filter)).await?.len() as i64,
            None => state.repo.count(screen.collection).await?,
        };
        tiles.push(json!({
            "title": screen.collection.title(),
            "path": screen.path,
            "count": count,
        }));
    }
    Ok(render(&state, &route, json!({ "tiles": tiles })))
}

// --- CRUD Screens ---

fn check_editor(screen: &Screen, route: &AuthorizedRoute) -> Result<(), ApiError> {
    if screen.can_edit(route.identity.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "{} cannot modify {}",
            route.identity.role, screen.path
        )))
    }
}

// A scoped screen hides records owned by someone else as if they did not exist.
fn visible_record(screen: &Screen, route: &AuthorizedRoute, record: &Value) -> bool {
    match screen.scope_for(route.identity.role, &route.identity.id) {
        Some(filter) => {
            record.get(filter.field).and_then(Value::as_str) == Some(filter.value.as_str())
        }
        None => true,
    }
}

async fn find_visible(
    screen: &Screen,
    route: &AuthorizedRoute,
    state: &AppState,
    id: Uuid,
) -> Result<Value, ApiError> {
    state
        .repo
        .get(screen.collection, id)
        .await?
        .filter(|record| visible_record(screen, route, record))
        .ok_or_else(|| ApiError::NotFound(format!("record {id}")))
}

/// list_records
///
/// [Guarded] Lists a screen's collection, scoped to the user where the screen says so.
pub async fn list_records(
    screen: &'static Screen,
    route: AuthorizedRoute,
    state: AppState,
) -> Result<Json<ShellView>, ApiError> {
    let filter = screen.scope_for(route.identity.role, &route.identity.id);
    let records = state.repo.list(screen.collection, filter).await?;
    Ok(render(
        &state,
        &route,
        json!({ "records": records, "editable": screen.can_edit(route.identity.role) }),
    ))
}

pub async fn show_record(
    screen: &'static Screen,
    route: AuthorizedRoute,
    state: AppState,
    id: Uuid,
) -> Result<Json<ShellView>, ApiError> {
    let record = find_visible(screen, &route, &state, id).await?;
    Ok(render(&state, &route, json!({ "record": record })))
}

/// create_record
///
/// [Guarded, editors only] Inserts a record; the author field, if any, is always the
/// current identity regardless of what the payload says.
pub async fn create_record(
    screen: &'static Screen,
    route: AuthorizedRoute,
    state: AppState,
    mut payload: Value,
) -> Result<(StatusCode, Json<ShellView>), ApiError> {
    check_editor(screen, &route)?;
    if let (Some(field), Value::Object(map)) = (screen.author_field, &mut payload) {
        map.insert(field.to_string(), Value::String(route.identity.id.clone()));
    }
    let record = state.repo.create(screen.collection, payload).await?;
    tracing::info!(path = screen.path, role = %route.identity.role, "record created");
    Ok((
        StatusCode::CREATED,
        render(&state, &route, json!({ "record": record })),
    ))
}

pub async fn update_record(
    screen: &'static Screen,
    route: AuthorizedRoute,
    state: AppState,
    id: Uuid,
    mut payload: Value,
) -> Result<Json<ShellView>, ApiError> {
    check_editor(screen, &route)?;
    find_visible(screen, &route, &state, id).await?;
    if let Value::Object(map) = &mut payload {
        for field in screen.locked_fields(route.identity.role) {
            map.remove(field);
        }
    }
    let record = state
        .repo
        .update(screen.collection, id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("record {id}")))?;
    Ok(render(&state, &route, json!({ "record": record })))
}

pub async fn delete_record(
    screen: &'static Screen,
    route: AuthorizedRoute,
    state: AppState,
    id: Uuid,
) -> Result<StatusCode, ApiError> {
    check_editor(screen, &route)?;
    find_visible(screen, &route, &state, id).await?;
    if state.repo.delete(screen.collection, id).await? {
        tracing::info!(path = screen.path, %id, "record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("record {id}")))
    }
}

// --- Reports ---

/// reports
///
/// [Guarded] The list of printable reports, one per screen collection.
#[utoipa::path(
    get,
    path = "/reports",
    responses((status = 200, description = "Report list", body = ShellView))
)]
pub async fn reports(route: AuthorizedRoute, State(state): State<AppState>) -> Json<ShellView> {
    let mut links: Vec<ReportLink> = Vec::new();
    for screen in SCREENS.iter().filter(|s| s.owner_field.is_none()) {
        let collection = screen.collection.table().to_string();
        if links.iter().any(|l| l.collection == collection) {
            continue;
        }
        links.push(ReportLink {
            title: screen.collection.title().to_string(),
            print_path: format!("/reports/{collection}/print"),
            collection,
        });
    }
    render(&state, &route, json!({ "reports": links }))
}

/// print_report
///
/// [Guarded] Hands a collection's records to the document generator and returns the
/// print-ready artifact.
#[utoipa::path(
    get,
    path = "/reports/{collection}/print",
    params(("collection" = String, Path, description = "Collection name, e.g. `students`")),
    responses(
        (status = 200, description = "Printable document", content_type = "text/html"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn print_report(
    _route: AuthorizedRoute,
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Response, ApiError> {
    let collection: Collection = collection.parse()?;
    let rows = state.repo.list(collection, None).await?;
    let request = DocumentRequest {
        title: format!("{} Report", collection.title()),
        sections: vec![DocumentSection {
            heading: format!("{} ({} records)", collection.title(), rows.len()),
            rows,
        }],
    };
    let document = state.documents.render(&request).await?;
    Ok(([(header::CONTENT_TYPE, document.content_type)], document.body).into_response())
}

/// unknown_screen
///
/// [Guarded fallback] Reached only when the guard authorized a path (for instance by
/// prefix) that no screen serves.
pub async fn unknown_screen(route: AuthorizedRoute) -> ApiError {
    ApiError::NotFound(format!("screen {}", route.grant.path))
}

fn render(state: &AppState, route: &AuthorizedRoute, data: Value) -> Json<ShellView> {
    let screen = ScreenView {
        path: route.grant.path.clone(),
        title: route.grant.title.clone(),
        data,
    };
    Json(state.views.render(route.session, &route.identity, screen))
}
