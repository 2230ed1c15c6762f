//! On-disk caches of downloaded and normalized station series.
//!
//! `<ID>_<dur>.csv` keeps the raw CDEC response, `<ID>_agg_monthly.csv` the
//! normalized monthly series. Builds with `download_new: false` read the
//! monthly files instead of going to the network.

use anyhow::{bail, Context};
use cbc_cdec::StationSelection;
use cbc_data::{MonthlyRecord, MonthlySeries};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::{Path, PathBuf};

pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new<P: AsRef<Path>>(dir: P) -> anyhow::Result<Cache> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Cache { dir })
    }

    pub fn raw_path(&self, station: &StationSelection) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", station.station_id, station.duration.code()))
    }

    pub fn monthly_path(&self, station_id: &str) -> PathBuf {
        self.dir.join(format!("{station_id}_agg_monthly.csv"))
    }

    pub fn write_raw(&self, station: &StationSelection, body: &str) -> anyhow::Result<()> {
        let path = self.raw_path(station);
        std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn write_monthly(&self, series: &MonthlySeries) -> anyhow::Result<()> {
        let path = self.monthly_path(&series.reservoir_id);
        let mut wtr = WriterBuilder::new()
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for record in &series.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Cached monthly series of `station`, or `None` when there is no cache
    /// file yet.
    pub fn read_monthly(&self, station: &StationSelection) -> anyhow::Result<Option<MonthlySeries>> {
        let path = self.monthly_path(&station.station_id);
        if !path.exists() {
            return Ok(None);
        }
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut records = Vec::new();
        for row in rdr.deserialize::<MonthlyRecord>() {
            let record = row.with_context(|| format!("Bad row in {}", path.display()))?;
            if !record.value.is_finite() || record.value_elevation.is_some_and(|e| !e.is_finite()) {
                bail!(
                    "Non-finite value for {} in {}",
                    record.period_end,
                    path.display()
                );
            }
            records.push(record);
        }
        records.sort_by_key(|r| r.period_end);
        records.dedup_by_key(|r| r.period_end);
        Ok(Some(MonthlySeries {
            reservoir_id: station.station_id.clone(),
            sensor_type: station.sensor_type,
            records,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc_cdec::{Duration, SensorType};
    use chrono::NaiveDate;

    fn station() -> StationSelection {
        StationSelection {
            station_id: "BLB".to_string(),
            name: "Black Butte Lake".to_string(),
            sensor_type: SensorType::Storage,
            duration: Duration::Daily,
            rating_id: None,
        }
    }

    #[test]
    fn test_monthly_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        let station = station();
        assert!(cache.read_monthly(&station).unwrap().is_none());

        let series = MonthlySeries {
            reservoir_id: "BLB".to_string(),
            sensor_type: SensorType::Storage,
            records: vec![
                MonthlyRecord {
                    reservoir_id: "BLB".to_string(),
                    period_end: NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
                    value: 100.0,
                    value_elevation: None,
                },
                MonthlyRecord {
                    reservoir_id: "BLB".to_string(),
                    period_end: NaiveDate::from_ymd_opt(2020, 2, 29).unwrap(),
                    value: 102.5,
                    value_elevation: Some(301.0),
                },
            ],
        };
        cache.write_monthly(&series).unwrap();
        assert!(dir.path().join("BLB_agg_monthly.csv").exists());
        assert_eq!(cache.read_monthly(&station).unwrap(), Some(series));
    }

    #[test]
    fn test_non_finite_cached_value_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("BLB_agg_monthly.csv"),
            "reservoir_id,period_end,value,value_elevation\nBLB,2020-01-31,NaN,\n",
        )
        .unwrap();
        let err = cache.read_monthly(&station()).unwrap_err();
        assert!(err.to_string().contains("Non-finite value for 2020-01-31"));
    }

    #[test]
    fn test_raw_cache_name() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        cache.write_raw(&station(), "DATE TIME,VALUE\n").unwrap();
        assert!(dir.path().join("BLB_D.csv").exists());
    }
}
