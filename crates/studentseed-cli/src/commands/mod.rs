pub mod generate;
pub mod preview;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use studentseed_core::config::{read_config, StudentSeedConfig};
use studentseed_core::pipeline::{GenerationRequest, GenerationSettings};
use studentseed_core::store::{sanitize_url, DatabaseStore};

use crate::args::{ConnectionArgs, DEFAULT_LIMIT, DEFAULT_SAMPLES};

/// Everything a command needs before touching the database.
pub struct Invocation {
    pub url: String,
    pub request: GenerationRequest,
    pub settings: GenerationSettings,
    pub config: Option<StudentSeedConfig>,
}

impl Invocation {
    /// Merge flags, the config file in `dir` and built-in defaults.
    pub fn resolve(
        dir: &Path,
        connection: &ConnectionArgs,
        samples: Option<usize>,
        limit: Option<u64>,
        seed: Option<u64>,
    ) -> Result<Self> {
        let config = read_config(dir)?;
        let url = connection.resolve_url(config.as_ref())?;

        let mut settings = config
            .as_ref()
            .map(StudentSeedConfig::generation_settings)
            .unwrap_or_default();
        if seed.is_some() {
            settings.synthesis.seed = seed;
        }

        let generate = config.as_ref().map(|c| &c.generate);
        let request = GenerationRequest {
            samples: samples
                .or_else(|| generate.and_then(|g| g.samples))
                .unwrap_or(DEFAULT_SAMPLES),
            limit: limit
                .or_else(|| generate.and_then(|g| g.limit))
                .unwrap_or(DEFAULT_LIMIT),
        };

        debug!(
            url = %sanitize_url(&url),
            samples = request.samples,
            limit = request.limit,
            seed = ?settings.synthesis.seed,
            "Resolved invocation"
        );

        Ok(Self {
            url,
            request,
            settings,
            config,
        })
    }

    pub async fn connect(&self) -> Result<DatabaseStore> {
        let options = self
            .config
            .as_ref()
            .map(StudentSeedConfig::store_options)
            .unwrap_or_default();
        DatabaseStore::connect(&self.url, &options)
            .await
            .with_context(|| format!("Error connecting to database {}", sanitize_url(&self.url)))
    }
}

/// A steady-ticking spinner labelled `[prefix]`.
pub fn spinner(prefix: &'static str, message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{prefix}] {msg}")?);
    pb.set_prefix(prefix);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
