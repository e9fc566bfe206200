//! Load → derive → synthesize → insert, as one call.
//!
//! Both front ends go through [`generate_and_insert`]; they differ only in
//! how they obtain a store and how they present the [`GenerationReport`].

use serde::Serialize;
use tracing::{error, info};

use crate::error::Result;
use crate::generate::synthesize::{synthesize, SynthesisOptions};
use crate::record::NewStudent;
use crate::sample::pools::{derive_pools, CandidatePools, FallbackPools, PoolOptions, PoolSource};
use crate::store::StudentStore;

/// How many records to make and how many reference rows to learn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub samples: usize,
    pub limit: u64,
}

/// Everything that shapes a batch apart from the reference sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSettings {
    pub fallback: FallbackPools,
    pub pool_options: PoolOptions,
    pub synthesis: SynthesisOptions,
}

/// Where each candidate pool came from in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSources {
    pub first_names: PoolSource,
    pub last_names: PoolSource,
    pub genders: PoolSource,
    pub statuses: PoolSource,
    pub birth_dates: PoolSource,
    pub enrollment_dates: PoolSource,
}

impl From<&CandidatePools> for PoolSources {
    fn from(pools: &CandidatePools) -> Self {
        Self {
            first_names: pools.first_names.source,
            last_names: pools.last_names.source,
            genders: pools.genders.source,
            statuses: pools.statuses.source,
            birth_dates: pools.birth_dates.source,
            enrollment_dates: pools.enrollment_dates.source,
        }
    }
}

/// Outcome of [`generate_and_insert`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub reference_rows: usize,
    pub sources: PoolSources,
    pub generated: usize,
    /// Empty when the insert failed and was rolled back.
    pub inserted_ids: Vec<i64>,
}

impl GenerationReport {
    pub fn inserted(&self) -> bool {
        !self.inserted_ids.is_empty()
    }
}

/// Load the reference sample and synthesize a batch, without inserting it.
pub async fn prepare_batch<S: StudentStore>(
    store: &S,
    request: GenerationRequest,
    settings: &GenerationSettings,
) -> Result<(usize, CandidatePools, Vec<NewStudent>)> {
    let sample = store.load_reference(request.limit).await?;
    info!(rows = sample.len(), limit = request.limit, "Loaded reference sample");

    let pools = derive_pools(&sample, &settings.fallback, &settings.pool_options);
    let records = synthesize(&pools, request.samples, &settings.synthesis);
    Ok((sample.len(), pools, records))
}

/// Insert a batch, turning any store failure into an empty result.
///
/// The store rolls the transaction back on failure, so an empty vector means
/// nothing from this batch was persisted.
pub async fn bulk_insert<S: StudentStore>(store: &S, records: &[NewStudent]) -> Vec<i64> {
    if records.is_empty() {
        return Vec::new();
    }
    match store.insert_batch(records).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, rows = records.len(), "Bulk insert failed, batch rolled back");
            Vec::new()
        }
    }
}

/// Run the whole pipeline against `store`.
///
/// Reference load errors propagate; insert errors become an empty
/// `inserted_ids`.
pub async fn generate_and_insert<S: StudentStore>(
    store: &S,
    request: GenerationRequest,
    settings: &GenerationSettings,
) -> Result<GenerationReport> {
    let (reference_rows, pools, records) = prepare_batch(store, request, settings).await?;
    let inserted_ids = bulk_insert(store, &records).await;

    Ok(GenerationReport {
        reference_rows,
        sources: PoolSources::from(&pools),
        generated: records.len(),
        inserted_ids,
    })
}
