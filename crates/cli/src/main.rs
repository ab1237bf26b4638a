mod provenance;
mod query;
mod sweep;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polycap::CapacityEngine;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;

use crate::provenance::Payload;

#[derive(Parser)]
#[command(name = "polycap")]
#[command(about = "Capacity polytopes and ellipsoids from JSON queries")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Run one query and write its result as JSON (plus a provenance sidecar)
    Query {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a list of queries and write a summary table (.csv or .parquet)
    Sweep {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the provenance block; optionally peek at a CSV summary
    Report {
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Query { input, out } => query(&input, &out),
        Action::Sweep { input, out } => sweep(&input, &out),
        Action::Report { summary } => report(summary.as_deref()),
    }
}

fn read_input(input: &Path) -> Result<Vec<query::QuerySpec>> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    query::parse_queries(&text)
}

fn query(input: &Path, out: &Path) -> Result<()> {
    tracing::info!(input = %input.display(), out = %out.display(), "query");
    let specs = read_input(input)?;
    let spec = match specs.as_slice() {
        [one] => one,
        _ => anyhow::bail!("query expects exactly one query, found {}", specs.len()),
    };
    let result = query::run_query(&CapacityEngine::default(), spec)?;
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(out, serde_json::to_vec_pretty(&result)?)
        .with_context(|| format!("writing {}", out.display()))?;
    let payload = Payload::new(serde_json::to_value(spec)?).with_input(input.to_string_lossy());
    let sidecar = provenance::write_sidecar(out, payload)?;
    tracing::info!(sidecar = %sidecar.display(), "wrote result");
    Ok(())
}

fn sweep(input: &Path, out: &Path) -> Result<()> {
    tracing::info!(input = %input.display(), out = %out.display(), "sweep");
    let specs = read_input(input)?;
    let mut df = sweep::summarize(&CapacityEngine::default(), &specs)?;
    sweep::write_table(&mut df, out)?;
    let payload = Payload::new(serde_json::json!({ "queries": specs.len() }))
        .with_input(input.to_string_lossy());
    provenance::write_sidecar(out, payload)?;
    tracing::info!(rows = df.height(), "wrote summary");
    Ok(())
}

fn report(summary: Option<&Path>) -> Result<()> {
    let mut params = serde_json::json!({});
    if let Some(path) = summary {
        let (rows, cols) = sweep::csv_head_shape(path)?;
        tracing::info!(rows, cols, "summary_head_shape");
        params["summary_head_shape"] = serde_json::json!([rows, cols]);
    }
    let obj = provenance::block(&Payload::new(params), &[]);
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
