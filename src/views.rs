use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    guard::{GuardDecision, GuardState, RouteGuard},
    models::{Identity, Notice, ScreenView, ShellView},
    navigation::Catalog,
    session::SessionId,
    shell::LayoutShell,
};

/// SessionView
///
/// Everything one browser session keeps between navigation events besides its identity.
#[derive(Debug, Default)]
struct SessionView {
    guard: RouteGuard,
    shell: LayoutShell,
    notices: Vec<Notice>,
}

/// ViewRegistry
///
/// Per-session route guards, layout shells and pending notices. The lock is never held
/// across an await point: every method does its work synchronously and returns.
/// Only sessions with an identity, or a login in flight, hold an entry.
pub struct ViewRegistry {
    catalog: Arc<Catalog>,
    brand: String,
    views: Mutex<HashMap<SessionId, SessionView>>,
}

impl ViewRegistry {
    pub fn new(catalog: Arc<Catalog>, brand: impl Into<String>) -> Self {
        Self {
            catalog,
            brand: brand.into(),
            views: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionView>> {
        // Session views are cosmetic plus a guard that re-derives from the identity
        // store on every event, so a poisoned map is still safe to keep using.
        self.views.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn guard_state(&self, session: SessionId) -> GuardState {
        self.lock()
            .get(&session)
            .map(|view| view.guard.state().clone())
            .unwrap_or_default()
    }

    pub fn begin_authentication(&self, session: SessionId) {
        self.lock().entry(session).or_default().guard.begin_authentication();
    }

    pub fn complete_authentication(&self, session: SessionId, identity: &Identity) {
        let mut views = self.lock();
        let view = views.entry(session).or_default();
        view.guard.complete_authentication(identity);
        view.shell.sync(&self.catalog, Some(identity.role));
    }

    /// Drops the session's entry; an absent entry reads as `Unauthenticated`.
    pub fn abort_authentication(&self, session: SessionId) {
        self.lock().remove(&session);
    }

    /// navigate
    ///
    /// Runs the session's guard for one request. Denial notices are queued so the
    /// landing screen the user is redirected to can show them. A request without an
    /// identity never creates an entry and drops a stale one.
    pub fn navigate(
        &self,
        session: SessionId,
        identity: Option<&Identity>,
        path: &str,
    ) -> GuardDecision {
        let mut views = self.lock();
        if identity.is_none() {
            let authenticating = views
                .get(&session)
                .is_some_and(|view| matches!(view.guard.state(), GuardState::Authenticating));
            if !authenticating {
                views.remove(&session);
                return GuardDecision::RedirectToLogin;
            }
        }
        let view = views.entry(session).or_default();
        let decision = view.guard.navigate(&self.catalog, identity, path);
        if let GuardDecision::Deny { notice, .. } = &decision {
            view.notices.push(notice.clone());
        }
        decision
    }

    /// render
    ///
    /// Wraps a screen in the session's shell and hands over any pending notices.
    pub fn render(&self, session: SessionId, identity: &Identity, screen: ScreenView) -> ShellView {
        let mut views = self.lock();
        let view = views.entry(session).or_default();
        let notices = std::mem::take(&mut view.notices);
        view.shell
            .render(&self.catalog, &self.brand, identity, notices, screen)
    }

    pub fn toggle_side_panel(&self, session: SessionId) -> bool {
        self.lock().entry(session).or_default().shell.toggle_collapsed()
    }

    /// logout
    ///
    /// Unmounts the session's shell and drops its notices by removing the entry. The
    /// guard of a session with no entry is `Unauthenticated`.
    pub fn logout(&self, session: SessionId) {
        if self.lock().remove(&session).is_some() {
            tracing::debug!(%session, "session view dropped");
        }
    }
}
