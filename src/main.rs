use civic_portal::{
    PortalCore,
    config::{AppConfig, Env},
    guard::GuardDecision,
    models::IssueFilter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Headless shell around the portal core: loads configuration, wires the
/// services, runs the guard for one navigation and performs the first data
/// read, exactly as the browser shell would. Useful for smoke-testing a
/// deployment target from the command line.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet; this is the one place errors go to stderr.
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging Filter Setup
    // Sets the default log level. It prioritizes the RUST_LOG environment
    // variable, falling back to sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "civic_portal=debug".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability during local debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal core starting in {:?} mode", config.env);

    // 4. Core Assembly
    let core = match PortalCore::from_config(config) {
        Ok(core) => core,
        Err(e) => {
            tracing::error!(error = %e, "FATAL: Could not assemble portal core");
            std::process::exit(1);
        }
    };

    // A raw session token may be supplied for smoke-testing signed-in flows.
    if let Ok(token) = std::env::var("PORTAL_SESSION_TOKEN") {
        core.sign_in(token);
    }

    // 5. One Navigation, End to End
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dashboard".to_string());

    core.begin_navigation();

    let credential = core.credentials.current();
    let decision = core.guard.evaluate(&path, credential.as_deref()).await;

    match decision {
        None => {
            tracing::info!(path, "Navigation superseded before the guard finished");
        }
        Some(GuardDecision::Redirect(target)) => {
            tracing::info!(path, redirect = %target, "Guard redirected the navigation");
        }
        Some(decision) => {
            tracing::info!(path, ?decision, "Guard passed; loading issue list");

            match core.api.list_issues(&IssueFilter::default()).await {
                Ok(issues) => {
                    tracing::info!(count = issues.len(), "Issue list loaded");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Issue list fetch failed");
                    std::process::exit(1);
                }
            }
        }
    }
}
