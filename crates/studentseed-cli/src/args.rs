use clap::{Args, Parser, Subcommand, ValueEnum};

use studentseed_core::config::StudentSeedConfig;
use studentseed_core::store::ConnectionParams;

#[derive(Parser, Debug)]
#[command(
    name = "studentseed",
    about = "Generate synthetic student records from a sample of existing ones",
    version,
    after_help = "Examples:\n  studentseed generate --samples 20 --limit 100\n  studentseed generate -s 5 --host localhost --password secret\n  studentseed generate --db sqlite://students.db --seed 42\n  studentseed preview -s 10 --format json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate synthetic students and insert them into the database
    Generate(GenerateArgs),

    /// Generate synthetic students and print them without inserting
    Preview(PreviewArgs),
}

/// Where to connect. `--db` wins over the discrete PostgreSQL flags.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Database connection URL (postgres://, sqlite:)
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// PostgreSQL host [default: lms-postgres]
    #[arg(long, env = "POSTGRES_HOST")]
    pub host: Option<String>,

    /// PostgreSQL port [default: 5432]
    #[arg(long, env = "POSTGRES_PORT")]
    pub port: Option<u16>,

    /// PostgreSQL database name [default: lms_db]
    #[arg(long, env = "POSTGRES_DB")]
    pub dbname: Option<String>,

    /// PostgreSQL user [default: postgres]
    #[arg(long, env = "POSTGRES_USER")]
    pub user: Option<String>,

    /// PostgreSQL password [default: admin]
    #[arg(long, env = "POSTGRES_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Number of synthetic samples to generate [default: 5]
    #[arg(short, long)]
    pub samples: Option<usize>,

    /// Number of records to load from the database as reference [default: 100]
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Random seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Number of synthetic samples to show [default: 5]
    #[arg(short, long)]
    pub samples: Option<usize>,

    /// Number of records to load from the database as reference [default: 100]
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Random seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: PreviewFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum PreviewFormat {
    Table,
    Json,
}

/// CLI defaults, used when neither a flag, an env var, nor the config file
/// sets a value.
pub const DEFAULT_SAMPLES: usize = 5;
pub const DEFAULT_LIMIT: u64 = 100;

impl ConnectionArgs {
    fn has_discrete_params(&self) -> bool {
        self.host.is_some()
            || self.port.is_some()
            || self.dbname.is_some()
            || self.user.is_some()
            || self.password.is_some()
    }

    /// Discrete parameters: flag/env, then config file, then built-in default.
    pub fn connection_params(&self, config: Option<&StudentSeedConfig>) -> ConnectionParams {
        let base = config
            .map(StudentSeedConfig::connection_params)
            .unwrap_or_default();
        ConnectionParams {
            host: self.host.clone().unwrap_or(base.host),
            port: self.port.unwrap_or(base.port),
            dbname: self.dbname.clone().unwrap_or(base.dbname),
            user: self.user.clone().unwrap_or(base.user),
            password: self.password.clone().unwrap_or(base.password),
        }
    }

    /// Resolve the connection URL.
    ///
    /// Order: `--db`/`DATABASE_URL`, then any discrete flag, then
    /// `[database].url` in the config file, then discrete parameters built
    /// from config and defaults.
    pub fn resolve_url(
        &self,
        config: Option<&StudentSeedConfig>,
    ) -> studentseed_core::Result<String> {
        if let Some(url) = &self.db {
            return Ok(url.clone());
        }
        if !self.has_discrete_params() {
            if let Some(url) = config.and_then(|c| c.database.url.clone()) {
                return Ok(url);
            }
        }
        self.connection_params(config).to_url()
    }
}
