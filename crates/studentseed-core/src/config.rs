//! # Configuration File Parser
//!
//! Reads and parses `studentseed.toml`, the optional configuration file that
//! sets defaults for the CLI and the service. Every section is optional;
//! command-line flags and environment variables take precedence over
//! anything set here.
//!
//! - `[database]`: connection URL or discrete PostgreSQL parameters
//! - `[generate]`: default sample/limit counts, seed, pool thresholds and windows
//! - `[pools]`: fallback name/gender/status lists, email domains, phone format
//! - `[server]`: bind address for `studentseed-server`
//!
//! Example `studentseed.toml`:
//!
//! ```toml
//! [database]
//! host = "lms-postgres"
//! dbname = "lms_db"
//! connect_timeout_secs = 5
//!
//! [generate]
//! samples = 25
//! limit = 200
//! seed = 42
//!
//! [pools]
//! email_domains = ["mail.ee", "ut.ee"]
//! phone_prefix = "+372"
//! phone_digits = 7
//!
//! [server]
//! port = 9000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, StudentSeedError};
use crate::generate::synthesize::{PhoneFormat, SynthesisOptions};
use crate::pipeline::GenerationSettings;
use crate::record::StudentStatus;
use crate::sample::pools::{FallbackPools, PoolOptions, MAX_AGE_YEARS, MAX_ENROLLMENT_DAYS_AGO};
use crate::store::{ConnectionParams, StoreOptions};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "studentseed.toml";

/// Top-level studentseed.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentSeedConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
    pub pools: PoolsConfig,
    pub server: ServerConfig,
}

/// Database connection configuration.
///
/// `url` wins over the discrete parameters when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL (`postgres://...` or `sqlite:...`).
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Seconds to wait for a connection before failing.
    pub connect_timeout_secs: Option<u64>,
    /// Target table name (default `students`).
    pub table: Option<String>,
}

/// Default generation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Number of records to generate.
    pub samples: Option<usize>,
    /// Reference rows to load.
    pub limit: Option<u64>,
    /// Fixed random seed for reproducible batches.
    pub seed: Option<u64>,
    pub name_threshold: Option<usize>,
    pub categorical_threshold: Option<usize>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub enrollment_min_days_ago: Option<u32>,
    pub enrollment_max_days_ago: Option<u32>,
    /// Destination columns. Unknown names are ignored at insert time.
    pub columns: Option<Vec<String>>,
}

/// Fallback values and identity formats.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PoolsConfig {
    pub first_names: Option<Vec<String>>,
    pub last_names: Option<Vec<String>>,
    pub genders: Option<Vec<String>>,
    pub statuses: Option<Vec<StudentStatus>>,
    pub email_domains: Option<Vec<String>>,
    pub phone_prefix: Option<String>,
    pub phone_digits: Option<u32>,
    pub max_email_retries: Option<usize>,
}

/// Service bind settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Read and parse a studentseed.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or fails validation.
pub fn read_config(dir: &Path) -> Result<Option<StudentSeedConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| StudentSeedError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: StudentSeedConfig =
        toml::from_str(&content).map_err(|e| StudentSeedError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;

    config.validate()?;

    tracing::debug!(path = %path.display(), "Loaded configuration file");
    Ok(Some(config))
}

impl StudentSeedConfig {
    /// Reject settings that parse but can't produce well-formed records.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(StudentSeedError::Config { message });

        if let Some(domains) = &self.pools.email_domains {
            if domains.is_empty() {
                return invalid(
                    "pools.email_domains is empty. List at least one domain or remove the key."
                        .to_string(),
                );
            }
            if let Some(bad) = domains.iter().find(|d| d.trim().is_empty() || d.contains('@')) {
                return invalid(format!(
                    "pools.email_domains contains an invalid domain '{}'",
                    bad
                ));
            }
        }

        if let Some(digits) = self.pools.phone_digits {
            if !(1..=18).contains(&digits) {
                return invalid(format!(
                    "pools.phone_digits must be between 1 and 18, got {}",
                    digits
                ));
            }
        }

        if let (Some(min), Some(max)) = (self.generate.min_age, self.generate.max_age) {
            if min > max {
                return invalid(format!(
                    "generate.min_age ({}) is greater than generate.max_age ({})",
                    min, max
                ));
            }
        }

        let pool_options = self.pool_options();
        if pool_options.max_age > MAX_AGE_YEARS || pool_options.min_age > MAX_AGE_YEARS {
            return invalid(format!(
                "generate.min_age and generate.max_age must be at most {}, got {} and {}",
                MAX_AGE_YEARS, pool_options.min_age, pool_options.max_age
            ));
        }
        if pool_options.enrollment_max_days_ago > MAX_ENROLLMENT_DAYS_AGO {
            return invalid(format!(
                "generate.enrollment_max_days_ago must be at most {}, got {}",
                MAX_ENROLLMENT_DAYS_AGO, pool_options.enrollment_max_days_ago
            ));
        }
        if pool_options.enrollment_min_days_ago > pool_options.enrollment_max_days_ago {
            return invalid(format!(
                "generate.enrollment_min_days_ago ({}) is greater than \
                 generate.enrollment_max_days_ago ({})",
                pool_options.enrollment_min_days_ago, pool_options.enrollment_max_days_ago
            ));
        }

        if self.database.connect_timeout_secs == Some(0) {
            return invalid("database.connect_timeout_secs must be at least 1".to_string());
        }

        if let Some(columns) = &self.generate.columns {
            if columns.is_empty() {
                return invalid("generate.columns is empty".to_string());
            }
        }

        Ok(())
    }

    /// Fallback pools with configured lists replacing the built-in ones.
    pub fn fallback_pools(&self) -> FallbackPools {
        let defaults = FallbackPools::default();
        FallbackPools {
            first_names: self
                .pools
                .first_names
                .clone()
                .unwrap_or(defaults.first_names),
            last_names: self
                .pools
                .last_names
                .clone()
                .unwrap_or(defaults.last_names),
            genders: self.pools.genders.clone().unwrap_or(defaults.genders),
            statuses: self.pools.statuses.clone().unwrap_or(defaults.statuses),
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        let defaults = PoolOptions::default();
        let g = &self.generate;
        PoolOptions {
            name_threshold: g.name_threshold.unwrap_or(defaults.name_threshold),
            categorical_threshold: g
                .categorical_threshold
                .unwrap_or(defaults.categorical_threshold),
            min_age: g.min_age.unwrap_or(defaults.min_age),
            max_age: g.max_age.unwrap_or(defaults.max_age),
            enrollment_min_days_ago: g
                .enrollment_min_days_ago
                .unwrap_or(defaults.enrollment_min_days_ago),
            enrollment_max_days_ago: g
                .enrollment_max_days_ago
                .unwrap_or(defaults.enrollment_max_days_ago),
            today: None,
        }
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        let defaults = SynthesisOptions::default();
        let phone_defaults = PhoneFormat::default();
        SynthesisOptions {
            email_domains: self
                .pools
                .email_domains
                .clone()
                .unwrap_or(defaults.email_domains),
            phone: PhoneFormat {
                prefix: self
                    .pools
                    .phone_prefix
                    .clone()
                    .unwrap_or(phone_defaults.prefix),
                digits: self.pools.phone_digits.unwrap_or(phone_defaults.digits),
            },
            max_email_retries: self
                .pools
                .max_email_retries
                .unwrap_or(defaults.max_email_retries),
            seed: self.generate.seed,
            now: None,
        }
    }

    /// Everything the pipeline needs besides the store and the request.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            fallback: self.fallback_pools(),
            pool_options: self.pool_options(),
            synthesis: self.synthesis_options(),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        let defaults = StoreOptions::default();
        StoreOptions {
            connect_timeout: self
                .database
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            table: self.database.table.clone().unwrap_or(defaults.table),
            columns: self.generate.columns.clone().unwrap_or(defaults.columns),
        }
    }

    /// Discrete connection parameters, falling back to the built-in defaults.
    pub fn connection_params(&self) -> ConnectionParams {
        let defaults = ConnectionParams::default();
        let db = &self.database;
        ConnectionParams {
            host: db.host.clone().unwrap_or(defaults.host),
            port: db.port.unwrap_or(defaults.port),
            dbname: db.dbname.clone().unwrap_or(defaults.dbname),
            user: db.user.clone().unwrap_or(defaults.user),
            password: db.password.clone().unwrap_or(defaults.password),
        }
    }
}
