use crate::guard::RouteTables;
use crate::session::Session;

/// PageDirective
///
/// What a page should do at hydration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDirective {
    /// Render the page content.
    Render,
    /// Render nothing and send the browser to the given path.
    RedirectTo(String),
}

/// PageGate
///
/// The second enforcement layer, independent of the access guard. The guard
/// runs before a navigation commits; this gate runs again inside protected
/// pages at hydration, so a protected page never shows content to an
/// anonymous visitor even when it was reached without a guard pass.
pub struct PageGate {
    sign_in_path: String,
    dashboard_path: String,
}

impl PageGate {
    pub fn new(tables: &RouteTables) -> Self {
        Self {
            sign_in_path: tables.sign_in_path.clone(),
            dashboard_path: tables.dashboard_path.clone(),
        }
    }

    /// For pages that require any signed-in user.
    pub fn check(&self, authenticated: bool) -> PageDirective {
        if authenticated {
            PageDirective::Render
        } else {
            PageDirective::RedirectTo(self.sign_in_path.clone())
        }
    }

    /// For admin pages: anonymous visitors go to sign-in, signed-in
    /// non-admins to the dashboard.
    pub fn check_admin(&self, session: Option<&Session>) -> PageDirective {
        match session {
            None => PageDirective::RedirectTo(self.sign_in_path.clone()),
            Some(session) if !session.is_admin() => {
                PageDirective::RedirectTo(self.dashboard_path.clone())
            }
            Some(_) => PageDirective::Render,
        }
    }
}
