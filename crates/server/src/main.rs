use shanraq_auth::AppResources;
use shanraq_auth::api::{shutdown_on_signal, start_webserver};
use shanraq_auth::config::load_config_or_panic;
use shanraq_auth::session::spawn_sweep_task;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log directives for a deployment environment; `RUST_LOG` overrides.
fn default_directives(environment: &str) -> &'static str {
    match environment.to_lowercase().as_str() {
        "debug" | "development" | "local" => "shanraq_auth=debug,tower_http=debug",
        "test" => "shanraq_auth=warn,tower_http=warn",
        _ => "shanraq_auth=info,tower_http=info",
    }
}

fn initialize_standard_tracing(environment: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(environment)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install().expect("Failed to install `color_eyre::install`");
    dotenvy::dotenv().ok();

    // Load config
    let config = load_config_or_panic();

    // -------- Tracing Initialization --------
    initialize_standard_tracing(&config.environment);

    let resources = AppResources::new(config);
    tracing::info!(
        providers = ?resources.registry.list(),
        demo_mode = resources.config.auth.demo_mode,
        session_ttl_secs = resources.sessions.ttl().as_secs(),
        cookie_secure = resources.config.cookie_secure(),
        enforce_state = resources.config.auth.state.enforce,
        "auth configuration"
    );
    let https = resources.config.public_base_url.starts_with("https://");
    if https && !resources.config.cookie_secure() {
        tracing::warn!("session cookies are not marked Secure on an https deployment");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    // Start background purge of expired sessions
    let sweep = spawn_sweep_task(
        resources.sessions.clone(),
        resources.states.clone(),
        resources.config.auth.session.sweep_interval(),
        shutdown.clone(),
    );

    start_webserver(resources, shutdown.clone()).await?;

    shutdown.cancel();
    if let Some(sweep) = sweep {
        sweep.await?;
    }
    Ok(())
}
