use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;

use studentseed_core::pipeline::{prepare_batch, PoolSources};
use studentseed_core::record::NewStudent;

use super::{spinner, Invocation};
use crate::args::{PreviewArgs, PreviewFormat};

pub async fn run(args: &PreviewArgs) -> Result<()> {
    let invocation = Invocation::resolve(
        Path::new("."),
        &args.connection,
        args.samples,
        args.limit,
        args.seed,
    )?;

    let pb = spinner("1/2", "Connecting to database...")?;
    let store = invocation.connect().await?;
    pb.set_prefix("2/2");
    pb.set_message("Loading reference sample...");

    let batch = prepare_batch(&store, invocation.request, &invocation.settings).await;
    store.close().await;
    let (reference_rows, pools, records) = batch.context("Error loading student data")?;
    pb.finish_and_clear();

    match args.format {
        PreviewFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        PreviewFormat::Table => {
            eprintln!(
                "Reference rows: {}  |  pools: {}",
                reference_rows,
                describe_sources(&PoolSources::from(&pools))
            );
            println!("{}", render_table(&records));
        }
    }
    Ok(())
}

fn render_table(records: &[NewStudent]) -> ComfyTable {
    let mut t = ComfyTable::new();
    t.set_header(vec![
        "first_name",
        "last_name",
        "email",
        "phone",
        "date_of_birth",
        "gender",
        "enrollment_date",
        "status",
    ]);
    for r in records {
        t.add_row(vec![
            r.first_name.clone(),
            r.last_name.clone(),
            r.email.clone(),
            r.phone.clone(),
            r.date_of_birth.to_string(),
            r.gender.clone().unwrap_or_else(|| "NULL".to_string()),
            r.enrollment_date.to_string(),
            r.status.to_string(),
        ]);
    }
    t
}

fn describe_sources(sources: &PoolSources) -> String {
    [
        ("first_names", sources.first_names),
        ("last_names", sources.last_names),
        ("genders", sources.genders),
        ("statuses", sources.statuses),
        ("birth_dates", sources.birth_dates),
        ("enrollment_dates", sources.enrollment_dates),
    ]
    .iter()
    .map(|(name, source)| format!("{}={}", name, source.as_str()))
    .collect::<Vec<_>>()
    .join(", ")
}
