use std::sync::Arc;

use crate::error::{ConfigError, GuardDecisionError};
use crate::navigation::EpochClock;
use crate::session::{Session, SessionProviderState};

// --- Route Classification ---

/// RouteClass
///
/// What a path requires of its visitor. Classification is derived purely
/// from the configured route tables; anything not listed is `Protected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Anyone may view, signed in or not.
    Public,
    /// Requires a session with the admin role.
    AdminOnly,
    /// Requires a session; content degrades for anonymous visitors.
    Protected,
}

/// GuardDecision
///
/// The outcome of evaluating one navigation. `ContinueAsPublic` lets the
/// render proceed without an identity; per-page gates then decide what an
/// anonymous visitor actually sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
    ContinueAsPublic,
}

/// RouteTables
///
/// The configured path lists the guard classifies against. Entries match
/// exactly or as a prefix at a `/` boundary, so `/admin` covers
/// `/admin/issues` but not `/administrator`.
#[derive(Debug, Clone)]
pub struct RouteTables {
    pub public_paths: Vec<String>,
    pub admin_paths: Vec<String>,
    /// Pages that only make sense signed out; a live session is bounced to
    /// the dashboard instead.
    pub auth_entry_paths: Vec<String>,
    pub sign_in_path: String,
    pub dashboard_path: String,
}

impl Default for RouteTables {
    fn default() -> Self {
        Self {
            public_paths: vec![
                "/".to_string(),
                "/about".to_string(),
                "/sign-in".to_string(),
                "/sign-up".to_string(),
                "/verify-email".to_string(),
            ],
            admin_paths: vec!["/admin".to_string()],
            auth_entry_paths: vec![
                "/sign-in".to_string(),
                "/sign-up".to_string(),
                "/verify-email".to_string(),
            ],
            sign_in_path: "/sign-in".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

impl RouteTables {
    /// Checks every configured entry and normalizes trailing slashes.
    /// Called once at startup; a bad table is a deployment mistake and the
    /// process should not come up with it.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for list in [
            &mut self.public_paths,
            &mut self.admin_paths,
            &mut self.auth_entry_paths,
        ] {
            for entry in list.iter_mut() {
                normalize_entry(entry)?;
            }
        }

        normalize_entry(&mut self.sign_in_path)?;
        normalize_entry(&mut self.dashboard_path)?;

        // A path in both tables would make the admin check ambiguous.
        for admin in &self.admin_paths {
            if self.public_paths.iter().any(|p| p == admin) {
                return Err(ConfigError::OverlappingTables(admin.clone()));
            }
        }

        // The sign-in page is where anonymous visitors get redirected; a
        // table set that does not classify it public would redirect sign-in
        // to itself.
        if self.classify(&self.sign_in_path) != RouteClass::Public {
            return Err(ConfigError::UnreachableSignIn(self.sign_in_path.clone()));
        }

        Ok(())
    }

    /// Classifies a path against the tables. Admin entries win over public
    /// ones so that `/admin` stays locked even under a broad public prefix.
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.admin_paths.iter().any(|p| path_matches(path, p)) {
            return RouteClass::AdminOnly;
        }

        if self.public_paths.iter().any(|p| path_matches(path, p)) {
            return RouteClass::Public;
        }

        RouteClass::Protected
    }

    pub fn is_auth_entry(&self, path: &str) -> bool {
        self.auth_entry_paths.iter().any(|p| path_matches(path, p))
    }
}

fn normalize_entry(entry: &mut String) -> Result<(), ConfigError> {
    if entry.is_empty() {
        return Err(ConfigError::MalformedPath {
            entry: entry.clone(),
            reason: "path entries cannot be empty",
        });
    }

    if !entry.starts_with('/') {
        return Err(ConfigError::MalformedPath {
            entry: entry.clone(),
            reason: "path entries must start with '/'",
        });
    }

    if entry.chars().any(char::is_whitespace) {
        return Err(ConfigError::MalformedPath {
            entry: entry.clone(),
            reason: "path entries cannot contain whitespace",
        });
    }

    while entry.len() > 1 && entry.ends_with('/') {
        entry.pop();
    }

    Ok(())
}

/// Exact match, or prefix match at a path-segment boundary. The root entry
/// `/` only ever matches itself.
fn path_matches(path: &str, entry: &str) -> bool {
    path == entry
        || path
            .strip_prefix(entry)
            .is_some_and(|rest| rest.starts_with('/'))
}

// --- Access Guard ---

/// GuardPolicy
///
/// Tunable guard behavior. The portal's default is to let anonymous
/// visitors through everywhere and leave enforcement to the page gates;
/// deployments that prefer an up-front bounce to sign-in flip the flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardPolicy {
    pub redirect_anonymous_from_protected: bool,
}

/// AccessGuard
///
/// Runs once per navigation, before any page content loads. Resolves the
/// visitor's session and decides whether the navigation proceeds, redirects,
/// or continues without an identity.
pub struct AccessGuard {
    tables: RouteTables,
    policy: GuardPolicy,
    provider: SessionProviderState,
    clock: Arc<EpochClock>,
}

impl AccessGuard {
    pub fn new(
        tables: RouteTables,
        policy: GuardPolicy,
        provider: SessionProviderState,
        clock: Arc<EpochClock>,
    ) -> Self {
        Self {
            tables,
            policy,
            provider,
            clock,
        }
    }

    pub fn tables(&self) -> &RouteTables {
        &self.tables
    }

    /// The decision rules, as a pure function of path and session. Kept
    /// separate from credential resolution so the rules can be tested
    /// exhaustively without any async machinery.
    pub fn decide(&self, path: &str, session: Option<&Session>) -> GuardDecision {
        let class = self.tables.classify(path);

        let Some(session) = session else {
            // Anonymous visitors are never blocked outright; at most they
            // are pointed at sign-in when the deployment opts into that.
            if self.policy.redirect_anonymous_from_protected && class != RouteClass::Public {
                return GuardDecision::Redirect(self.tables.sign_in_path.clone());
            }
            return GuardDecision::ContinueAsPublic;
        };

        // Signed-in visitors have no business on the sign-in/sign-up pages.
        if self.tables.is_auth_entry(path) {
            return GuardDecision::Redirect(self.tables.dashboard_path.clone());
        }

        if class == RouteClass::AdminOnly && !session.is_admin() {
            return GuardDecision::Redirect(self.tables.dashboard_path.clone());
        }

        GuardDecision::Allow
    }

    /// Evaluates one navigation end to end: resolves the credential into a
    /// session, then applies the decision rules. Returns `None` when the
    /// navigation was superseded while the session was resolving, in which
    /// case no redirect must be issued.
    pub async fn evaluate(&self, path: &str, credential: Option<&str>) -> Option<GuardDecision> {
        let epoch = self.clock.current();

        let session = match self.provider.resolve(credential).await {
            Ok(session) => session,
            Err(GuardDecisionError::Expired) => {
                tracing::debug!(path, "Session token expired; continuing as anonymous");
                None
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Session resolution failed; continuing as anonymous");
                None
            }
        };

        if !self.clock.is_current(epoch) {
            tracing::debug!(path, "Navigation superseded during session resolution");
            return None;
        }

        Some(self.decide(path, session.as_ref()))
    }
}
