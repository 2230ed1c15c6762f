//! The `build` and `conductance` commands.

use crate::cache::Cache;
use crate::config::PipelineConfig;
use crate::fetch::{fetch_all, load_cached, read_selection, SeriesSet, StationFailure};
use crate::output::{create, ensure_writable, write_conductance, write_review, OutputFiles, ReviewRow};
use anyhow::Context;
use cbc_cdec::StationSelection;
use cbc_data::{estimate_conductance, ConductanceEstimate, RatingCurve};
use cbc_iwfm::{
    parse_gw_main, parse_nodal_areas, parse_rating_table, parse_stratigraphy, SpecTable,
    TimeSeriesTable,
};
use cbc_merge::{merge, MergeConfig, MergeInput, NodeAssociation, ReservoirData};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub files: OutputFiles,
    pub added: Vec<String>,
    pub review_rows: usize,
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Existing specification, in the legacy layout or as a previous output.
pub fn read_spec(path: &Path) -> anyhow::Result<SpecTable> {
    let content = read_file(path)?;
    let label = file_label(path);
    let table = if is_csv(path) {
        SpecTable::from_csv(&label, &content)?
    } else {
        SpecTable::parse(&label, &content)?
    };
    info!("{}: {} specification rows", label, table.records.len());
    Ok(table)
}

/// Existing time series, in the legacy layout or as a previous output.
pub fn read_timeseries(path: &Path) -> anyhow::Result<TimeSeriesTable> {
    let content = read_file(path)?;
    let label = file_label(path);
    let table = if is_csv(path) {
        TimeSeriesTable::from_csv(&label, &content)?
    } else {
        TimeSeriesTable::parse(&label, &content)?
    };
    info!(
        "{}: {} rows of {} columns, {:?} to {:?}",
        label,
        table.rows.len(),
        table.column_count,
        table.first_date(),
        table.last_date()
    );
    Ok(table)
}

pub fn conductance_from_files(config: &PipelineConfig) -> anyhow::Result<Vec<ConductanceEstimate>> {
    let paths = &config.paths;
    let parameters = parse_gw_main(
        &file_label(&paths.gw_main),
        &read_file(&paths.gw_main)?,
        config.layer_count,
    )?;
    let stratigraphy = parse_stratigraphy(
        &file_label(&paths.stratigraphy),
        &read_file(&paths.stratigraphy)?,
    )?;
    let areas = parse_nodal_areas(
        &file_label(&paths.preprocessor_output),
        &read_file(&paths.preprocessor_output)?,
    )?;
    if !areas.in_acres() {
        warn!(
            "Nodal areas in {} are not labelled as acres; using them as square feet",
            paths.preprocessor_output.display()
        );
    }
    Ok(estimate_conductance(&parameters, &stratigraphy, &areas))
}

pub fn read_rating_curves(path: &Path) -> anyhow::Result<BTreeMap<String, RatingCurve>> {
    let rows = parse_rating_table(&file_label(path), &read_file(path)?)?;
    Ok(RatingCurve::from_rating_rows(&rows))
}

/// Attach elevations and dead pool levels to each selected reservoir.
/// Curve failures drop that reservoir's series and are recorded.
fn prepare_reservoirs(
    selections: &[StationSelection],
    set: &mut SeriesSet,
    curves: &BTreeMap<String, RatingCurve>,
) -> Vec<ReservoirData> {
    let mut reservoirs = Vec::with_capacity(selections.len());
    for selection in selections {
        let id = selection.station_id.as_str();
        let mut series = set.series.remove(id);
        let mut limiting_head = None;
        let curve = selection.rating_id.as_ref().and_then(|r| curves.get(r));
        match (curve, &selection.rating_id) {
            (Some(curve), _) => {
                match curve.dead_pool_elevation() {
                    Ok(elevation) => limiting_head = Some(elevation),
                    Err(e) => warn!("{id}: {e}"),
                }
                if let Some(monthly) = series.take() {
                    match curve.apply(&monthly) {
                        Ok(converted) => series = Some(converted),
                        Err(e) => set.failures.push(StationFailure {
                            station_id: id.to_string(),
                            message: e.to_string(),
                        }),
                    }
                }
            }
            (None, Some(rating_id)) => {
                warn!("{id}: rating id {rating_id} is not in the rating table")
            }
            (None, None) => {}
        }
        reservoirs.push(ReservoirData {
            selection: selection.clone(),
            series,
            limiting_head,
        });
    }
    reservoirs
}

/// Run the whole pipeline and write the specification, time-series and
/// review tables stamped with `run_date`.
pub async fn build(config: &PipelineConfig, run_date: NaiveDate) -> anyhow::Result<BuildReport> {
    let files = OutputFiles::new(&config.paths.output_dir, &run_date);
    ensure_writable(
        &[
            files.spec.as_path(),
            files.timeseries.as_path(),
            files.review.as_path(),
        ],
        config.overwrite,
    )?;

    // structural problems in the model files abort before any download
    let spec = read_spec(&config.paths.spec)?;
    let timeseries = read_timeseries(&config.paths.timeseries)?;
    let curves = read_rating_curves(&config.paths.rating_table)?;
    let conductance = conductance_from_files(config)?;
    let associations = NodeAssociation::parse_csv(&read_file(&config.paths.associations)?)
        .with_context(|| format!("Failed to parse {}", config.paths.associations.display()))?;
    let selections = read_selection(config)?;

    let cache = Cache::new(&config.paths.cache_dir)?;
    let mut set = if config.download_new {
        fetch_all(config, &selections, &cache).await?
    } else {
        info!("download_new is off; reading monthly caches");
        load_cached(&selections, &cache)
    };
    let reservoirs = prepare_reservoirs(&selections, &mut set, &curves);

    let input = MergeInput {
        spec: &spec,
        timeseries: &timeseries,
        associations: &associations,
        reservoirs: &reservoirs,
        conductance: &conductance,
    };
    let merge_config = MergeConfig {
        cutoff: config.cutoff,
        exclusions: config.exclusions.clone(),
        note_aliases: config.note_aliases.clone(),
    };
    let output = merge(&input, &merge_config)?;

    output.spec.write_csv(create(&files.spec)?)?;
    output.timeseries.write_csv(create(&files.timeseries)?)?;

    let mut review: Vec<ReviewRow> = set
        .failures
        .iter()
        .map(|f| ReviewRow {
            kind: "station".to_string(),
            subject: f.station_id.clone(),
            detail: f.message.clone(),
        })
        .collect();
    review.extend(output.warnings.iter().map(ReviewRow::from));
    write_review(&files.review, &review)?;

    info!(
        "Wrote {}, {} and {} ({} items to review)",
        files.spec.display(),
        files.timeseries.display(),
        files.review.display(),
        review.len()
    );
    Ok(BuildReport {
        files,
        added: output.added.iter().map(|a| a.station_id.clone()).collect(),
        review_rows: review.len(),
    })
}

fn today() -> NaiveDate {
    Local::now().naive_local().date()
}

pub async fn run_build(config_path: &str, offline: bool, overwrite: bool) -> anyhow::Result<()> {
    let mut config = PipelineConfig::load(config_path)?;
    if offline {
        config.download_new = false;
    }
    config.overwrite |= overwrite;
    let report = build(&config, today()).await?;
    info!(
        "Build complete: {} reservoirs added ({})",
        report.added.len(),
        report.added.join(", ")
    );
    Ok(())
}

pub fn run_conductance(config_path: &str, overwrite: bool) -> anyhow::Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let files = OutputFiles::new(&config.paths.output_dir, &today());
    ensure_writable(&[files.conductance.as_path()], config.overwrite || overwrite)?;
    let estimates = conductance_from_files(&config)?;
    write_conductance(&files.conductance, &estimates)?;
    info!(
        "Wrote {} conductance estimates to {}",
        estimates.len(),
        files.conductance.display()
    );
    Ok(())
}
