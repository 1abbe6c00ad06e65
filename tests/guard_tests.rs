use academy_portal::{
    Catalog,
    guard::{GuardDecision, GuardState, RouteAuthorization, RouteGuard, authorize_route},
    models::{Identity, NoticeLevel, Role},
};

fn identity(role: Role) -> Identity {
    Identity {
        id: format!("{role}-1"),
        role,
        display_name: "Test User".to_string(),
    }
}

fn signed_in(role: Role) -> RouteGuard {
    let mut guard = RouteGuard::new();
    guard.begin_authentication();
    guard.complete_authentication(&identity(role));
    guard
}

#[test]
fn test_initial_state_is_unauthenticated() {
    assert_eq!(RouteGuard::new().state(), &GuardState::Unauthenticated);
}

#[test]
fn test_navigation_without_identity_redirects_to_login() {
    let catalog = Catalog::default();
    let mut guard = RouteGuard::new();

    assert_eq!(
        guard.navigate(&catalog, None, "/users"),
        GuardDecision::RedirectToLogin
    );
    assert_eq!(guard.state(), &GuardState::Unauthenticated);
}

#[test]
fn test_authentication_lands_on_role_dashboard() {
    let guard = signed_in(Role::Instructor);
    assert_eq!(
        guard.state(),
        &GuardState::Authorized {
            role: Role::Instructor,
            path: "/instructor".to_string()
        }
    );
}

#[test]
fn test_authentication_in_flight_never_authorizes() {
    let catalog = Catalog::default();
    let admin = identity(Role::Admin);
    let mut guard = RouteGuard::new();
    guard.begin_authentication();

    // Even with an identity visible, nothing renders until authentication resolves.
    assert_eq!(
        guard.navigate(&catalog, Some(&admin), "/admin"),
        GuardDecision::RedirectToLogin
    );
    assert_eq!(guard.state(), &GuardState::Authenticating);

    guard.abort_authentication();
    assert_eq!(guard.state(), &GuardState::Unauthenticated);
}

#[test]
fn test_student_requesting_users_is_denied() {
    let catalog = Catalog::default();
    let student = identity(Role::Student);
    let mut guard = signed_in(Role::Student);

    let decision = guard.navigate(&catalog, Some(&student), "/users");
    match decision {
        GuardDecision::Deny {
            redirect_to,
            notice,
        } => {
            assert_eq!(redirect_to, "/student");
            assert_eq!(notice.level, NoticeLevel::Warning);
            assert!(notice.message.contains("/users"));
        }
        other => panic!("expected denial, got {other:?}"),
    }
    assert_eq!(
        guard.state(),
        &GuardState::Denied {
            role: Role::Student,
            attempted: "/users".to_string()
        }
    );
}

#[test]
fn test_denied_user_can_continue_to_allowed_screen() {
    let catalog = Catalog::default();
    let student = identity(Role::Student);
    let mut guard = signed_in(Role::Student);

    guard.navigate(&catalog, Some(&student), "/reports");
    let decision = guard.navigate(&catalog, Some(&student), "/student");
    assert!(matches!(decision, GuardDecision::Render(_)));
    assert_eq!(
        guard.state(),
        &GuardState::Authorized {
            role: Role::Student,
            path: "/student".to_string()
        }
    );
}

#[test]
fn test_authorized_navigation_records_latest_path() {
    let catalog = Catalog::default();
    let admin = identity(Role::Admin);
    let mut guard = signed_in(Role::Admin);

    guard.navigate(&catalog, Some(&admin), "/courses");
    let decision = guard.navigate(&catalog, Some(&admin), "/users/42/");
    match decision {
        GuardDecision::Render(grant) => {
            assert_eq!(grant.path, "/users/42");
            assert_eq!(grant.title, "Users");
            assert_eq!(grant.role, Role::Admin);
        }
        other => panic!("expected render, got {other:?}"),
    }
    assert_eq!(
        guard.state(),
        &GuardState::Authorized {
            role: Role::Admin,
            path: "/users/42".to_string()
        }
    );
}

#[test]
fn test_logout_from_any_state() {
    let catalog = Catalog::default();
    let student = identity(Role::Student);

    let mut guard = signed_in(Role::Student);
    guard.navigate(&catalog, Some(&student), "/users");
    guard.logout();
    assert_eq!(guard.state(), &GuardState::Unauthenticated);

    let mut guard = RouteGuard::new();
    guard.begin_authentication();
    guard.logout();
    assert_eq!(guard.state(), &GuardState::Unauthenticated);
}

#[test]
fn test_cleared_identity_redirects_to_login_despite_cached_role() {
    let catalog = Catalog::default();
    let mut guard = signed_in(Role::Admin);

    assert_eq!(
        guard.navigate(&catalog, None, "/admin"),
        GuardDecision::RedirectToLogin
    );
    assert_eq!(guard.state(), &GuardState::Unauthenticated);
}

#[test]
fn test_persisted_identity_resumes_session() {
    let catalog = Catalog::default();
    let instructor = identity(Role::Instructor);
    let mut guard = RouteGuard::new();

    let decision = guard.navigate(&catalog, Some(&instructor), "/classes");
    assert!(matches!(decision, GuardDecision::Render(_)));
}

#[test]
fn test_role_agnostic_paths_are_exact() {
    let catalog = Catalog::default();
    for role in Role::ALL {
        assert_eq!(
            authorize_route(&catalog, role, "/profile"),
            RouteAuthorization::RoleAgnostic
        );
        assert_eq!(
            authorize_route(&catalog, role, "/"),
            RouteAuthorization::RoleAgnostic
        );
    }
    // "/" is not a prefix of everything.
    assert_eq!(
        authorize_route(&catalog, Role::Student, "/contacts"),
        RouteAuthorization::Unauthorized
    );
    assert_eq!(
        authorize_route(&catalog, Role::Student, "/profile/edit"),
        RouteAuthorization::Unauthorized
    );
}

#[test]
fn test_prefix_authorization_and_traversal() {
    let catalog = Catalog::default();
    assert_eq!(
        authorize_route(&catalog, Role::Instructor, "/classes/7/roster"),
        RouteAuthorization::Entry { label: "Classes" }
    );
    assert!(!authorize_route(&catalog, Role::Instructor, "/classesx").is_authorized());
    assert!(!authorize_route(&catalog, Role::Student, "/student/../users").is_authorized());
}

#[test]
fn test_unknown_path_is_denied_for_every_role() {
    let catalog = Catalog::default();
    for role in Role::ALL {
        assert!(!authorize_route(&catalog, role, "/does-not-exist").is_authorized());
    }
}

#[test]
fn test_role_switch_is_picked_up_on_next_navigation() {
    let catalog = Catalog::default();
    let mut guard = signed_in(Role::Admin);

    let demoted = identity(Role::Student);
    let decision = guard.navigate(&catalog, Some(&demoted), "/users");
    assert!(matches!(
        decision,
        GuardDecision::Deny {
            redirect_to: "/student",
            ..
        }
    ));
}
