/// Event site - HTTP entry point
use eventsite_core::{web, Config, SiteState};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // A corrupt or unreadable contacts file stops startup here
    let state = SiteState::open(config)
        .map_err(|e| anyhow::anyhow!("Failed to load contacts: {}", e))?;

    info!("🎉 Starting event site");
    info!("   Contacts file: {:?} ({} entries)", state.contacts.path(), state.contacts.len().await);
    info!("   Templates: {:?}", state.config.templates_dir);
    if state.config.expose_errors {
        info!("   API errors are returned verbatim (use --hide-errors to mask them)");
    }

    web::start_server(Arc::new(state)).await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Site stopped");
    Ok(())
}
