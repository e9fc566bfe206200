use std::path::Path;

use studentseed_core::config::read_config;
use studentseed_server::{bind_address, run_server, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = read_config(Path::new("."))?;
    let env = |key: &str| std::env::var(key).ok();

    let addr = bind_address(config.as_ref(), env)?;
    let state = AppState::from_config(config.as_ref(), env);

    tracing::info!(
        host = %state.connection_defaults.host,
        dbname = %state.connection_defaults.dbname,
        "Default database target"
    );

    run_server(state, addr).await
}
