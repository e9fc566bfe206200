use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use studentseed_core::generate::synthesize::synthesize;
use studentseed_core::pipeline::{
    bulk_insert, GenerationReport, GenerationRequest, GenerationSettings, PoolSources,
};
use studentseed_core::sample::pools::derive_pools;
use studentseed_core::store::StudentStore;

use super::{spinner, Invocation};
use crate::args::GenerateArgs;

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let invocation = Invocation::resolve(
        Path::new("."),
        &args.connection,
        args.samples,
        args.limit,
        args.seed,
    )?;

    let pb = spinner("1/4", "Connecting to database...")?;
    let store = match invocation.connect().await {
        Ok(store) => store,
        Err(e) => {
            pb.abandon_with_message("Connecting to database... failed");
            return Err(e);
        }
    };
    pb.finish_with_message(format!(
        "Connecting to database... ✓ {:?}",
        store.database_type()
    ));

    let mut stdout = std::io::stdout().lock();
    let result = execute(
        &store,
        invocation.request,
        &invocation.settings,
        &mut stdout,
    )
    .await;
    store.close().await;
    result.map(|_| ())
}

/// Load, derive, synthesize and insert, writing progress lines to `out`.
pub async fn execute<S: StudentStore>(
    store: &S,
    request: GenerationRequest,
    settings: &GenerationSettings,
    out: &mut impl Write,
) -> Result<GenerationReport> {
    // Phase 2: reference sample
    writeln!(
        out,
        "Loading up to {} students from database as reference data...",
        request.limit
    )?;
    let pb = spinner("2/4", "Loading reference sample...")?;
    let sample = store
        .load_reference(request.limit)
        .await
        .context("Error loading student data")?;
    pb.finish_with_message(format!(
        "Loading reference sample... ✓ {} rows",
        sample.len()
    ));
    if sample.is_empty() {
        writeln!(
            out,
            "No existing student data found. Using default values for synthetic data generation."
        )?;
    }

    // Phase 3: synthesize
    writeln!(out, "Generating {} synthetic student profiles...", request.samples)?;
    let pb = spinner("3/4", "Generating records...")?;
    let pools = derive_pools(&sample, &settings.fallback, &settings.pool_options);
    let records = synthesize(&pools, request.samples, &settings.synthesis);
    pb.finish_with_message(format!("Generating records... ✓ {}", records.len()));

    // Phase 4: insert
    writeln!(out, "Inserting synthetic data into database...")?;
    let pb = spinner("4/4", "Inserting records...")?;
    let inserted_ids = bulk_insert(store, &records).await;
    pb.finish_with_message(format!("Inserting records... ✓ {}", inserted_ids.len()));

    let report = GenerationReport {
        reference_rows: sample.len(),
        sources: PoolSources::from(&pools),
        generated: records.len(),
        inserted_ids,
    };
    write_summary(&report, out)?;
    Ok(report)
}

fn write_summary(report: &GenerationReport, out: &mut impl Write) -> Result<()> {
    if report.inserted() {
        writeln!(
            out,
            "Successfully generated and inserted {} synthetic student profiles",
            report.inserted_ids.len()
        )?;
        let ids: Vec<String> = report.inserted_ids.iter().map(|id| id.to_string()).collect();
        writeln!(out, "Inserted student IDs: {}", ids.join(", "))?;
    } else {
        writeln!(out, "No data was inserted")?;
    }
    Ok(())
}
