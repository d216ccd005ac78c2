use std::env;

use crate::error::ConfigError;
use crate::guard::{GuardPolicy, RouteTables};

/// AppConfig
///
/// Holds the portal's entire configuration state. This struct is designed to
/// be immutable once loaded, ensuring consistency across everything built
/// from it (transport, guard, cache coordinator).
#[derive(Clone)]
pub struct AppConfig {
    // Backend API root, e.g. "https://portal.example.org/api".
    pub api_base_url: String,
    // Secret key used to decode and validate incoming session JWTs.
    pub jwt_secret: String,
    // Runtime environment marker. Controls logging format and which
    // variables are mandatory.
    pub env: Env,
    // The guard's path tables.
    pub routes: RouteTables,
    // Tunable guard behavior.
    pub policy: GuardPolicy,
}

/// Env
///
/// Defines the runtime context, used to switch between development
/// conveniences (fallback secrets, pretty logs) and production-grade
/// requirements (mandatory secrets, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup. This allows us to instantiate the configuration without
    /// needing to set environment variables for lightweight unit or
    /// integration testing state scaffolding.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            jwt_secret: "insecure-test-secret-value-local".to_string(),
            env: Env::Local,
            routes: RouteTables::default(),
            policy: GuardPolicy::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the configuration at startup.
    /// It reads all parameters from environment variables and implements the
    /// fail-fast principle: an incomplete or malformed configuration is
    /// reported as a typed error before anything else comes up.
    ///
    /// # Errors
    /// Returns a `ConfigError` when a variable required for the current
    /// runtime environment is missing, the API base URL is not an absolute
    /// http(s) URL, or the route tables fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The production API root and JWT secret are mandatory and must be
        // explicitly set. In local, both fall back to development defaults.
        let api_base_url = match env {
            Env::Production => env::var("PORTAL_API_URL")
                .map_err(|_| ConfigError::MissingVar("PORTAL_API_URL"))?,
            _ => env::var("PORTAL_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
        };

        let jwt_secret = match env {
            Env::Production => env::var("PORTAL_JWT_SECRET")
                .map_err(|_| ConfigError::MissingVar("PORTAL_JWT_SECRET"))?,
            _ => env::var("PORTAL_JWT_SECRET")
                .unwrap_or_else(|_| "insecure-test-secret-value-local".to_string()),
        };

        // Route tables ship with defaults; deployments override them with
        // comma-separated path lists.
        let mut routes = RouteTables::default();
        if let Ok(raw) = env::var("PORTAL_PUBLIC_PATHS") {
            routes.public_paths = split_paths(&raw);
        }
        if let Ok(raw) = env::var("PORTAL_ADMIN_PATHS") {
            routes.admin_paths = split_paths(&raw);
        }

        let policy = GuardPolicy {
            redirect_anonymous_from_protected: env::var("PORTAL_GUARD_BLOCKS_ANONYMOUS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        let mut config = Self {
            api_base_url,
            jwt_secret,
            env,
            routes,
            policy,
        };
        config.validate()?;

        Ok(config)
    }

    /// validate
    ///
    /// Checks the loaded values and normalizes the route tables. Split out
    /// of `load` so tests can validate hand-built configurations.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let parsed = reqwest::Url::parse(&self.api_base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.api_base_url.clone()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        }

        self.routes.validate()
    }
}

fn split_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
