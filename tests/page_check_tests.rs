use civic_portal::{PageDirective, PageGate, Role, RouteTables, Session};
use uuid::Uuid;

// --- Helper Functions ---

fn gate() -> PageGate {
    PageGate::new(&RouteTables::default())
}

fn session(role: Role) -> Session {
    Session {
        subject: Uuid::from_u128(7),
        role,
    }
}

// --- Tests ---

#[test]
fn test_authenticated_page_renders() {
    assert_eq!(gate().check(true), PageDirective::Render);
}

#[test]
fn test_anonymous_visitor_is_sent_to_sign_in() {
    assert_eq!(
        gate().check(false),
        PageDirective::RedirectTo("/sign-in".to_string())
    );
}

#[test]
fn test_admin_page_bounces_anonymous_to_sign_in() {
    assert_eq!(
        gate().check_admin(None),
        PageDirective::RedirectTo("/sign-in".to_string())
    );
}

#[test]
fn test_admin_page_bounces_regular_user_to_dashboard() {
    let user = session(Role::User);

    assert_eq!(
        gate().check_admin(Some(&user)),
        PageDirective::RedirectTo("/dashboard".to_string())
    );
}

#[test]
fn test_admin_page_renders_for_admin() {
    let admin = session(Role::Admin);

    assert_eq!(gate().check_admin(Some(&admin)), PageDirective::Render);
}

#[test]
fn test_gate_uses_configured_paths() {
    let mut tables = RouteTables::default();
    tables.sign_in_path = "/auth/login".to_string();
    tables.dashboard_path = "/home".to_string();
    let gate = PageGate::new(&tables);
    let user = session(Role::User);

    assert_eq!(
        gate.check(false),
        PageDirective::RedirectTo("/auth/login".to_string())
    );
    assert_eq!(
        gate.check_admin(Some(&user)),
        PageDirective::RedirectTo("/home".to_string())
    );
}
