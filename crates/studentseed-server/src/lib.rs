pub mod errors;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use studentseed_core::config::StudentSeedConfig;
use studentseed_core::pipeline::GenerationSettings;
use studentseed_core::store::{ConnectionParams, DatabaseStore, StoreOptions, StudentStore};
use studentseed_core::Result;

use crate::handlers::{generate_students, health_check, root};

/// Bind address used when neither the environment nor the config sets one.
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9000;

/// Opens a store for one request and closes it once the request is done.
pub trait Connector: Send + Sync + 'static {
    type Store: StudentStore;

    fn open(
        &self,
        params: &ConnectionParams,
    ) -> impl Future<Output = Result<Self::Store>> + Send;

    /// Called after every request that opened a store, whether or not
    /// generation succeeded.
    fn close(&self, store: Self::Store) -> impl Future<Output = ()> + Send;
}

/// Connects to PostgreSQL with the request's connection parameters.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnector {
    pub options: StoreOptions,
}

impl Connector for DatabaseConnector {
    type Store = DatabaseStore;

    async fn open(&self, params: &ConnectionParams) -> Result<DatabaseStore> {
        DatabaseStore::connect(&params.to_url()?, &self.options).await
    }

    async fn close(&self, store: DatabaseStore) {
        store.close().await;
    }
}

/// Shared, read-only state. Nothing here changes between requests.
pub struct AppState<C> {
    pub connector: C,
    pub connection_defaults: ConnectionParams,
    pub settings: GenerationSettings,
}

impl AppState<DatabaseConnector> {
    /// State for the real service, built from the optional config file.
    pub fn from_config(
        config: Option<&StudentSeedConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            connector: DatabaseConnector {
                options: config
                    .map(StudentSeedConfig::store_options)
                    .unwrap_or_default(),
            },
            connection_defaults: connection_defaults(config, env),
            settings: config
                .map(StudentSeedConfig::generation_settings)
                .unwrap_or_default(),
        }
    }
}

/// Connection defaults for requests that omit parameters: environment
/// (`POSTGRES_HOST`, `POSTGRES_PORT`, ...), then config, then built-in.
pub fn connection_defaults(
    config: Option<&StudentSeedConfig>,
    env: impl Fn(&str) -> Option<String>,
) -> ConnectionParams {
    let base = config
        .map(StudentSeedConfig::connection_params)
        .unwrap_or_default();
    ConnectionParams {
        host: env("POSTGRES_HOST").unwrap_or(base.host),
        port: env("POSTGRES_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(base.port),
        dbname: env("POSTGRES_DB").unwrap_or(base.dbname),
        user: env("POSTGRES_USER").unwrap_or(base.user),
        password: env("POSTGRES_PASSWORD").unwrap_or(base.password),
    }
}

/// Bind address: `HOST`/`PORT` env vars, then `[server]`, then defaults.
pub fn bind_address(
    config: Option<&StudentSeedConfig>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<SocketAddr> {
    let server = config.map(|c| &c.server);
    let host = env("HOST")
        .or_else(|| server.and_then(|s| s.host.clone()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match env("PORT") {
        Some(p) => p.parse::<u16>()?,
        None => server.and_then(|s| s.port).unwrap_or(DEFAULT_PORT),
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

pub fn create_router<C: Connector>(state: AppState<C>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/generate-students", post(generate_students::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn run_server<C: Connector>(
    state: AppState<C>,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
