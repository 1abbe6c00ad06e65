use academy_portal::{
    Catalog, ViewRegistry,
    guard::{GuardDecision, GuardState},
    models::{Identity, Role},
    session::SessionId,
};
use std::sync::Arc;

fn registry() -> ViewRegistry {
    ViewRegistry::new(Arc::new(Catalog::default()), "Academy Portal")
}

fn identity(role: Role) -> Identity {
    Identity {
        id: format!("{role}-1"),
        role,
        display_name: "Test User".to_string(),
    }
}

fn signed_in(views: &ViewRegistry, role: Role) -> SessionId {
    let session = SessionId::generate();
    views.begin_authentication(session);
    views.complete_authentication(session, &identity(role));
    session
}

#[test]
fn test_anonymous_navigation_allocates_nothing() {
    let views = registry();
    for _ in 0..10_000 {
        let decision = views.navigate(SessionId::generate(), None, "/admin");
        assert_eq!(decision, GuardDecision::RedirectToLogin);
    }
    assert!(views.is_empty());
}

#[test]
fn test_logout_removes_the_entry() {
    let views = registry();
    let session = signed_in(&views, Role::Admin);
    assert_eq!(views.len(), 1);

    views.logout(session);
    assert!(views.is_empty());
    assert_eq!(views.guard_state(session), GuardState::Unauthenticated);

    // Logging out twice is harmless.
    views.logout(session);
    assert!(views.is_empty());
}

#[test]
fn test_abort_authentication_removes_the_entry() {
    let views = registry();
    let session = SessionId::generate();
    views.begin_authentication(session);
    assert_eq!(views.guard_state(session), GuardState::Authenticating);

    views.abort_authentication(session);
    assert!(views.is_empty());
    assert_eq!(views.guard_state(session), GuardState::Unauthenticated);
}

#[test]
fn test_login_in_flight_survives_anonymous_navigation() {
    let views = registry();
    let session = SessionId::generate();
    views.begin_authentication(session);

    assert_eq!(
        views.navigate(session, None, "/student"),
        GuardDecision::RedirectToLogin
    );
    assert_eq!(views.guard_state(session), GuardState::Authenticating);

    views.complete_authentication(session, &identity(Role::Student));
    assert!(matches!(
        views.navigate(session, Some(&identity(Role::Student)), "/grades"),
        GuardDecision::Render(_)
    ));
}

#[test]
fn test_lost_identity_drops_stale_entry() {
    let views = registry();
    let session = signed_in(&views, Role::Instructor);
    views.toggle_side_panel(session);

    // The identity store no longer knows the session, e.g. after expiry.
    assert_eq!(
        views.navigate(session, None, "/instructor"),
        GuardDecision::RedirectToLogin
    );
    assert!(views.is_empty());
}
