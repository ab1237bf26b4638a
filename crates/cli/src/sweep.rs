//! Batch runs: one summary row per query, written as CSV or Parquet.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use polycap::CapacityEngine;

use crate::query::{run_query, QueryOutput, QuerySpec};

/// Summary columns: name, kind, dim, effective_dim, vertices, facets, outcome.
pub fn summarize(engine: &CapacityEngine, specs: &[QuerySpec]) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::with_capacity(specs.len());
    let mut kinds: Vec<String> = Vec::with_capacity(specs.len());
    let mut dims: Vec<u32> = Vec::with_capacity(specs.len());
    let mut effective: Vec<Option<u32>> = Vec::with_capacity(specs.len());
    let mut vertices: Vec<Option<u32>> = Vec::with_capacity(specs.len());
    let mut facets: Vec<Option<u32>> = Vec::with_capacity(specs.len());
    let mut outcomes: Vec<String> = Vec::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        let name = spec.name.clone().unwrap_or_else(|| format!("query_{i}"));
        kinds.push(spec.kind.label().to_string());
        match run_query(engine, spec) {
            Ok(QueryOutput::Polytope {
                outcome,
                dim,
                effective_dim,
                vertices: v,
                halfspaces,
                ..
            }) => {
                dims.push(dim as u32);
                effective.push(effective_dim.map(|k| k as u32));
                vertices.push(Some(v.len() as u32));
                facets.push(Some(halfspaces.b.len() as u32));
                outcomes.push(outcome);
            }
            Ok(QueryOutput::Ellipsoid { center, radii, .. }) => {
                let rank = radii.iter().filter(|&&r| r > 0.0).count();
                dims.push(center.len() as u32);
                effective.push(Some(rank as u32));
                vertices.push(None);
                facets.push(None);
                outcomes.push("ellipsoid".to_string());
            }
            Err(err) => {
                tracing::warn!(name, error = %err, "query failed");
                dims.push(0);
                effective.push(None);
                vertices.push(None);
                facets.push(None);
                outcomes.push(format!("error: {err}"));
            }
        }
        names.push(name);
    }

    let df = df!(
        "name" => names,
        "kind" => kinds,
        "dim" => dims,
        "effective_dim" => effective,
        "vertices" => vertices,
        "facets" => facets,
        "outcome" => outcomes,
    )?;
    Ok(df)
}

/// Write `df` to `out`; the format follows the extension (`csv` or `parquet`).
pub fn write_table(df: &mut DataFrame, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let ext = out.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext != "csv" && ext != "parquet" {
        bail!("unsupported summary format {ext:?}; use .csv or .parquet");
    }
    let mut file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    if ext == "csv" {
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
    } else {
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

/// Shape of the first rows of a previously written CSV summary.
pub fn csv_head_shape(path: &Path) -> Result<(usize, usize)> {
    let lf = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(100))
        .finish()?;
    let df = lf.limit(5).collect()?;
    Ok(df.shape())
}
