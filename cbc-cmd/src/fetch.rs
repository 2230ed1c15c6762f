//! Download and normalize the selected stations.

use crate::cache::Cache;
use crate::config::PipelineConfig;
use anyhow::Context;
use cbc_cdec::client::CdecClient;
use cbc_cdec::{Observation, StationSelection};
use cbc_data::{normalize_monthly, MonthlySeries};
use log::{info, warn};
use std::collections::BTreeMap;
use std::time::Duration;

/// A station dropped from the run, with the reason for the review file.
#[derive(Debug, Clone, PartialEq)]
pub struct StationFailure {
    pub station_id: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct SeriesSet {
    pub series: BTreeMap<String, MonthlySeries>,
    pub failures: Vec<StationFailure>,
}

impl SeriesSet {
    fn fail(&mut self, station_id: &str, message: String) {
        warn!("Skipping {station_id}: {message}");
        self.failures.push(StationFailure {
            station_id: station_id.to_string(),
            message,
        });
    }
}

pub fn read_selection(config: &PipelineConfig) -> anyhow::Result<Vec<StationSelection>> {
    let path = &config.paths.selection;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    StationSelection::parse_selection_csv(&content)
        .with_context(|| format!("Failed to parse station selection {}", path.display()))
}

async fn fetch_station(
    client: &CdecClient,
    cache: &Cache,
    config: &PipelineConfig,
    station: &StationSelection,
) -> anyhow::Result<MonthlySeries> {
    let body = client
        .fetch_csv(station, &config.start_date, config.end_date.as_ref())
        .await?;
    cache.write_raw(station, &body)?;
    let observations =
        Observation::parse_cdec_csv(&body, &station.station_id, station.sensor_type)?;
    let series = normalize_monthly(&station.station_id, &observations)?;
    cache.write_monthly(&series)?;
    Ok(series)
}

/// Fetch every CDEC station in the selection, one request at a time.
/// Stations that fail are recorded and skipped. Ids that are not CDEC
/// stations are served from the monthly cache when one exists.
pub async fn fetch_all(
    config: &PipelineConfig,
    selections: &[StationSelection],
    cache: &Cache,
) -> anyhow::Result<SeriesSet> {
    let client = CdecClient::new(config.allow_insecure_tls)?;
    let mut set = SeriesSet::default();
    let mut first = true;

    for station in selections {
        if !station.is_cdec_station() {
            load_cached_station(cache, station, &mut set);
            continue;
        }
        if !first && config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.request_delay_ms)).await;
        }
        first = false;

        info!("Fetching {} ({})", station.name, station.station_id);
        match fetch_station(&client, cache, config, station).await {
            Ok(series) => {
                info!(
                    "{}: {} months from {:?} to {:?}",
                    station.station_id,
                    series.records.len(),
                    series.first_month(),
                    series.last_month()
                );
                set.series.insert(station.station_id.clone(), series);
            }
            Err(e) => set.fail(&station.station_id, format!("{e:#}")),
        }
    }
    Ok(set)
}

/// A missing, empty or unreadable cache only drops this station.
fn load_cached_station(cache: &Cache, station: &StationSelection, set: &mut SeriesSet) {
    match cache.read_monthly(station) {
        Ok(Some(series)) if !series.records.is_empty() => {
            set.series.insert(station.station_id.clone(), series);
        }
        Ok(_) => set.fail(
            &station.station_id,
            format!(
                "no cached monthly series at {}",
                cache.monthly_path(&station.station_id).display()
            ),
        ),
        Err(e) => set.fail(&station.station_id, format!("{e:#}")),
    }
}

/// Read every station's monthly series from the cache.
pub fn load_cached(selections: &[StationSelection], cache: &Cache) -> SeriesSet {
    let mut set = SeriesSet::default();
    for station in selections {
        load_cached_station(cache, station, &mut set);
    }
    set
}

/// `fetch` command: refresh the raw and monthly caches.
pub async fn run_fetch(config_path: &str) -> anyhow::Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let selections = read_selection(&config)?;
    let cache = Cache::new(&config.paths.cache_dir)?;
    info!(
        "Fetching {} selected stations from {}",
        selections.len(),
        config.start_date
    );
    let set = fetch_all(&config, &selections, &cache).await?;
    info!(
        "Fetch complete: {} series cached in {}, {} stations skipped",
        set.series.len(),
        config.paths.cache_dir.display(),
        set.failures.len()
    );
    Ok(())
}
