use crate::{
    models::{Identity, Notice, Role},
    navigation::{Catalog, normalize_path},
};

/// RouteAuthorization
///
/// Derived per navigation event, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAuthorization {
    /// Path is open to every authenticated role.
    RoleAgnostic,
    /// Path falls under a catalog entry the role may see.
    Entry { label: &'static str },
    Unauthorized,
}

impl RouteAuthorization {
    pub fn is_authorized(&self) -> bool {
        !matches!(self, RouteAuthorization::Unauthorized)
    }
}

/// authorize_route
///
/// The single authorization rule shared by every route: role-agnostic paths by exact
/// match, otherwise the first catalog entry (in catalog order) that allows the role and
/// matches the path exactly or by segment prefix.
pub fn authorize_route(catalog: &Catalog, role: Role, path: &str) -> RouteAuthorization {
    let Some(path) = normalize_path(path) else {
        return RouteAuthorization::Unauthorized;
    };
    if catalog.is_role_agnostic(&path) {
        return RouteAuthorization::RoleAgnostic;
    }
    match catalog.entry_for(role, &path) {
        Some(entry) => RouteAuthorization::Entry { label: entry.label },
        None => RouteAuthorization::Unauthorized,
    }
}

/// GuardState
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Unauthenticated,
    /// External authentication is in flight. Navigation is blocked until it resolves.
    Authenticating,
    Authorized { role: Role, path: String },
    Denied { role: Role, attempted: String },
}

/// RenderGrant
///
/// Proof that the guard cleared a transition. Screens receive it before they fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGrant {
    pub role: Role,
    pub path: String,
    pub title: String,
}

/// GuardDecision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render(RenderGrant),
    RedirectToLogin,
    /// Authenticated but not entitled: back to the role's landing screen, with a notice.
    Deny {
        redirect_to: &'static str,
        notice: Notice,
    },
}

/// RouteGuard
///
/// One guard per session. Long-lived: it has no terminal state.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    state: GuardState,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn begin_authentication(&mut self) {
        self.state = GuardState::Authenticating;
    }

    /// complete_authentication
    ///
    /// The only way out of `Unauthenticated`/`Authenticating` into `Authorized`: an
    /// identity produced by a successful external authentication. The user starts on the
    /// role's landing screen.
    pub fn complete_authentication(&mut self, identity: &Identity) {
        self.state = GuardState::Authorized {
            role: identity.role,
            path: identity.role.landing_path().to_string(),
        };
    }

    pub fn abort_authentication(&mut self) {
        self.state = GuardState::Unauthenticated;
    }

    pub fn logout(&mut self) {
        self.state = GuardState::Unauthenticated;
    }

    /// navigate
    ///
    /// Evaluates one navigation request. `identity` is whatever the session context
    /// currently resolves; `None` covers missing, malformed and unknown-role identities
    /// alike. A session whose identity outlived the guard (for instance a restart over
    /// a durable identity store) is resumed, since that identity came from a completed
    /// authentication.
    pub fn navigate(
        &mut self,
        catalog: &Catalog,
        identity: Option<&Identity>,
        requested: &str,
    ) -> GuardDecision {
        if self.state == GuardState::Authenticating {
            tracing::debug!(requested, "navigation while authentication is in flight");
            return GuardDecision::RedirectToLogin;
        }
        let Some(identity) = identity else {
            self.state = GuardState::Unauthenticated;
            tracing::debug!(requested, "no identity; redirecting to login");
            return GuardDecision::RedirectToLogin;
        };
        if self.state == GuardState::Unauthenticated {
            self.complete_authentication(identity);
        }

        let role = identity.role;
        let path = normalize_path(requested).unwrap_or_else(|| requested.to_string());
        match authorize_route(catalog, role, requested) {
            RouteAuthorization::Unauthorized => {
                tracing::warn!(%role, path = %path, "route denied");
                self.state = GuardState::Denied {
                    role,
                    attempted: path.clone(),
                };
                GuardDecision::Deny {
                    redirect_to: role.landing_path(),
                    notice: Notice::access_denied(&path),
                }
            }
            authorized => {
                let title = match authorized {
                    RouteAuthorization::Entry { label } => label.to_string(),
                    _ => screen_title(&path),
                };
                self.state = GuardState::Authorized {
                    role,
                    path: path.clone(),
                };
                GuardDecision::Render(RenderGrant { role, path, title })
            }
        }
    }
}

// Title for role-agnostic screens, which have no catalog label.
fn screen_title(path: &str) -> String {
    match path.trim_start_matches('/').split('/').next() {
        Some("") | None => "Home".to_string(),
        Some(first) => {
            let mut chars = first.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}
