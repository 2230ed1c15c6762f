//! Output file naming and writers for the review tables.

use anyhow::{bail, Context};
use cbc_data::ConductanceEstimate;
use cbc_merge::MergeWarning;
use cbc_utils::dates::run_stamp;
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct OutputFiles {
    pub spec: PathBuf,
    pub timeseries: PathBuf,
    pub review: PathBuf,
    pub conductance: PathBuf,
}

impl OutputFiles {
    pub fn new(dir: &Path, run_date: &NaiveDate) -> OutputFiles {
        let stamp = run_stamp(run_date);
        OutputFiles {
            spec: dir.join(format!("cbc_specs_{stamp}.csv")),
            timeseries: dir.join(format!("cbc_timeseries_{stamp}.csv")),
            review: dir.join(format!("cbc_review_{stamp}.csv")),
            conductance: dir.join(format!("cbc_conductance_{stamp}.csv")),
        }
    }
}

/// Fail before anything is written when a target already exists and
/// overwriting was not asked for.
pub fn ensure_writable(paths: &[&Path], overwrite: bool) -> anyhow::Result<()> {
    if overwrite {
        return Ok(());
    }
    for path in paths {
        if path.exists() {
            bail!(
                "{} already exists; set overwrite or pass --overwrite to replace it",
                path.display()
            );
        }
    }
    Ok(())
}

pub fn create(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// One line of the operator review file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
    pub kind: String,
    pub subject: String,
    pub detail: String,
}

impl From<&MergeWarning> for ReviewRow {
    fn from(warning: &MergeWarning) -> Self {
        ReviewRow {
            kind: warning.kind().to_string(),
            subject: warning.subject(),
            detail: warning.detail(),
        }
    }
}

pub fn write_review(path: &Path, rows: &[ReviewRow]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(create(path)?);
    if rows.is_empty() {
        wtr.write_record(["kind", "subject", "detail"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_conductance(path: &Path, estimates: &[ConductanceEstimate]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(create(path)?);
    if estimates.is_empty() {
        wtr.write_record([
            "node_id",
            "vertical_conductivity",
            "layer_thickness",
            "nodal_area",
            "conductance",
        ])?;
    }
    for estimate in estimates {
        wtr.serialize(estimate)?;
    }
    wtr.flush()?;
    Ok(())
}
