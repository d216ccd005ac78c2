use std::sync::Arc;

// --- Module Structure ---

// Core portal services and components.
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod session;
pub mod transport;
pub mod uploads;

// Access control (pre-navigation guard and in-page gate).
pub mod guard;
pub mod page;

// --- Public Re-exports ---

// Makes core types easily accessible to the shell entry point (main.rs).
pub use api::PortalApi;
pub use cache::{CacheCoordinator, CacheKey, Tag};
pub use config::{AppConfig, Env};
pub use error::{ConfigError, FetchError, GuardDecisionError, HttpError, MutationError};
pub use guard::{AccessGuard, GuardDecision, GuardPolicy, RouteClass, RouteTables};
pub use navigation::{Epoch, EpochClock};
pub use page::{PageDirective, PageGate};
pub use session::{
    JwtSessionVerifier, Role, Session, SessionProvider, SessionProviderState,
    StaticSessionProvider,
};
pub use transport::{
    CredentialStore, HttpTransport, MockTransport, Transport, TransportState, WriteMethod,
};

/// PortalCore
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe
/// container holding all portal services, built once at startup and shared
/// by every navigation.
pub struct PortalCore {
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// The navigation clock; advanced once per route change.
    pub clock: Arc<EpochClock>,
    /// Shared holder for the raw session token.
    pub credentials: CredentialStore,
    /// Access control: the pre-navigation guard.
    pub guard: AccessGuard,
    /// Access control: the in-page hydration gate.
    pub gate: PageGate,
    /// The cache coordinator all reads and writes flow through.
    pub cache: Arc<CacheCoordinator>,
    /// The typed API surface the pages call.
    pub api: PortalApi,
}

impl PortalCore {
    /// new
    ///
    /// Wires the core from explicit collaborators. Tests and local shells
    /// inject mocks here; production wiring goes through `from_config`.
    pub fn new(
        mut config: AppConfig,
        provider: SessionProviderState,
        transport: TransportState,
        credentials: CredentialStore,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let clock = Arc::new(EpochClock::new());
        let guard = AccessGuard::new(
            config.routes.clone(),
            config.policy,
            provider,
            clock.clone(),
        );
        let gate = PageGate::new(&config.routes);
        let cache = Arc::new(CacheCoordinator::new(transport, clock.clone()));
        let api = PortalApi::new(cache.clone());

        Ok(Self {
            config,
            clock,
            credentials,
            guard,
            gate,
            cache,
            api,
        })
    }

    /// from_config
    ///
    /// Production wiring: a JWT verifier over the configured secret and the
    /// HTTP transport against the configured API root.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let credentials = CredentialStore::new();
        let provider: SessionProviderState = Arc::new(JwtSessionVerifier::new(&config.jwt_secret));
        let transport: TransportState = Arc::new(HttpTransport::new(
            &config.api_base_url,
            credentials.clone(),
        )?);

        Self::new(config, provider, transport, credentials)
    }

    /// begin_navigation
    ///
    /// Called once per route change, before the guard runs. Advances the
    /// epoch so in-flight results from the previous navigation are discarded
    /// when they resolve.
    pub fn begin_navigation(&self) -> Epoch {
        self.clock.advance()
    }

    /// sign_in
    ///
    /// Stores the raw session token and wipes the cache: responses fetched
    /// anonymously must not be served to the signed-in identity.
    pub fn sign_in(&self, token: impl Into<String>) {
        self.credentials.set(token);
        self.cache.clear();
        tracing::info!("Session established; cache cleared");
    }

    /// sign_out
    ///
    /// Drops the token and wipes the cache.
    pub fn sign_out(&self) {
        self.credentials.clear();
        self.cache.clear();
        tracing::info!("Session ended; cache cleared");
    }
}
