pub mod api;
pub mod assistant;
pub mod config;
pub mod core_state;
pub mod prediction;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env();
    let addr = app_config.bind_addr();

    // Blocking HTTP clients must be created outside the async runtime.
    let core = Arc::new(core_state::CoreState::from_config(app_config));
    core.enforce_audio_retention();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Cannot start async runtime: {e}");
            std::process::exit(1);
        }
    };

    // The last reference to `CoreState` is released here, after the
    // runtime is gone, so the blocking clients drop in a sync context.
    let result = runtime.block_on(api::server::serve_until_ctrl_c(core.clone(), &addr));
    drop(runtime);
    drop(core);

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
