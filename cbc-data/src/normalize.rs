use crate::error::{DataError, Result};
use crate::interpolation::fill_gaps;
use cbc_cdec::{Observation, SensorType};
use cbc_utils::dates::{format_legacy_date, month_end, MonthEnds};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Quantiles outside of which readings are dropped before averaging.
pub const LOWER_QUANTILE: f64 = 0.01;
pub const UPPER_QUANTILE: f64 = 0.99;

/// One month of a reservoir series, stamped at the month end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub reservoir_id: String,
    pub period_end: NaiveDate,
    /// Monthly mean in the sensor's unit
    pub value: f64,
    /// Elevation computed from a rating curve, for storage series
    pub value_elevation: Option<f64>,
}

impl MonthlyRecord {
    /// Row label in the legacy time-series layout.
    pub fn legacy_date(&self) -> String {
        format_legacy_date(&self.period_end)
    }

    /// Value written as a head: the computed elevation when there is one.
    pub fn head(&self) -> f64 {
        self.value_elevation.unwrap_or(self.value)
    }
}

/// Gap-free monthly series of one reservoir, in strictly increasing month
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    pub reservoir_id: String,
    pub sensor_type: SensorType,
    pub records: Vec<MonthlyRecord>,
}

impl MonthlySeries {
    pub fn first_month(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.period_end)
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.period_end)
    }

    pub fn get(&self, period_end: &NaiveDate) -> Option<&MonthlyRecord> {
        self.records
            .binary_search_by(|r| r.period_end.cmp(period_end))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Head on a month end, if the series covers it.
    pub fn head_on(&self, period_end: &NaiveDate) -> Option<f64> {
        self.get(period_end).map(MonthlyRecord::head)
    }
}

/// Order statistics bounding the kept range. The lower bound rounds its
/// position down and the upper bound rounds up, so samples of a hundred
/// readings or fewer are never trimmed.
fn quantile_bounds(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let last = (sorted.len() - 1) as f64;
    let lower = (LOWER_QUANTILE * last).floor() as usize;
    let upper = ((UPPER_QUANTILE * last).ceil() as usize).min(sorted.len() - 1);
    Some((sorted[lower], sorted[upper]))
}

/// Reduce raw observations of one station to a gap-free monthly series.
///
/// Missing readings are dropped, readings outside the 1st/99th percentile
/// are rejected, each calendar month is averaged, and months without data
/// between the first and last observed month are linearly interpolated.
pub fn normalize_monthly(station_id: &str, observations: &[Observation]) -> Result<MonthlySeries> {
    let sensors: BTreeSet<SensorType> = observations.iter().map(|o| o.sensor_type).collect();
    if sensors.len() > 1 {
        return Err(DataError::MixedSensors {
            station: station_id.to_string(),
            sensors: sensors
                .iter()
                .map(|s| s.number().to_string())
                .collect::<Vec<String>>()
                .join(", "),
        });
    }
    let no_data = || DataError::NoData {
        station: station_id.to_string(),
    };
    let sensor_type = *sensors.iter().next().ok_or_else(no_data)?;

    let readings: Vec<(NaiveDate, f64)> = observations
        .iter()
        .filter_map(|o| o.value.map(|v| (o.timestamp.date(), v)))
        .collect();
    let values: Vec<f64> = readings.iter().map(|(_, v)| *v).collect();
    let (lower, upper) = quantile_bounds(&values).ok_or_else(no_data)?;

    let mut months: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    let mut rejected = 0;
    for (date, value) in &readings {
        if *value < lower || *value > upper {
            rejected += 1;
            continue;
        }
        let entry = months.entry(month_end(date)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    if rejected > 0 {
        log::info!("{station_id}: dropped {rejected} readings outside [{lower}, {upper}]");
    }

    let (first, last) = match (months.keys().next(), months.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(no_data()),
    };
    let axis: Vec<NaiveDate> = MonthEnds::new(&first, &last).collect();
    let means: Vec<Option<f64>> = axis
        .iter()
        .map(|m| months.get(m).map(|(sum, count)| sum / *count as f64))
        .collect();
    let gaps = means.iter().filter(|m| m.is_none()).count();
    if gaps > 0 {
        log::info!("{station_id}: interpolated {gaps} months without readings");
    }

    let records = axis
        .into_iter()
        .zip(fill_gaps(&means))
        .filter_map(|(period_end, value)| {
            value.map(|value| MonthlyRecord {
                reservoir_id: station_id.to_string(),
                period_end,
                value,
                value_elevation: None,
            })
        })
        .collect();

    Ok(MonthlySeries {
        reservoir_id: station_id.to_string(),
        sensor_type,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn obs(date: &str, value: Option<f64>, sensor_type: SensorType) -> Observation {
        Observation {
            station_id: "BLB".to_string(),
            timestamp: NaiveDateTime::parse_from_str(&format!("{date} 0000"), "%Y%m%d %H%M")
                .unwrap(),
            value,
            sensor_type,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_month_is_interpolated() {
        let observations = vec![
            obs("20200115", Some(100.0), SensorType::Storage),
            obs("20200220", Some(102.0), SensorType::Storage),
            obs("20200310", None, SensorType::Storage),
            obs("20200412", Some(108.0), SensorType::Storage),
        ];
        let series = normalize_monthly("BLB", &observations).unwrap();
        let dates: Vec<NaiveDate> = series.records.iter().map(|r| r.period_end).collect();
        assert_eq!(
            dates,
            vec![ymd(2020, 1, 31), ymd(2020, 2, 29), ymd(2020, 3, 31), ymd(2020, 4, 30)]
        );
        let values: Vec<f64> = series.records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![100.0, 102.0, 105.0, 108.0]);
        assert_eq!(series.records[2].legacy_date(), "03/31/2020_24:00");
        assert_eq!(series.sensor_type, SensorType::Storage);
    }

    #[test]
    fn test_monthly_mean_and_spacing() {
        let mut observations = Vec::new();
        for day in 1..=28 {
            observations.push(obs(&format!("202301{day:02}"), Some(10.0 + day as f64), SensorType::Elevation));
        }
        observations.push(obs("20230615", Some(50.0), SensorType::Elevation));
        let series = normalize_monthly("FOL", &observations).unwrap();
        assert_eq!(series.records.len(), 6);
        assert_eq!(series.records[0].value, 24.5);
        for pair in series.records.windows(2) {
            assert_eq!(next_month(&pair[0].period_end), pair[1].period_end);
        }
        assert!(series.records.iter().all(|r| r.value.is_finite()));
        assert_eq!(series.head_on(&ymd(2023, 6, 30)), Some(50.0));
        assert_eq!(series.head_on(&ymd(2023, 7, 31)), None);
    }

    fn next_month(date: &NaiveDate) -> NaiveDate {
        cbc_utils::dates::next_month_end(date)
    }

    #[test]
    fn test_outliers_rejected_in_large_samples() {
        let mut observations: Vec<Observation> = (0..200)
            .map(|i| {
                let date = ymd(2020, 1, 1) + chrono::Duration::days(i);
                obs(&date.format("%Y%m%d").to_string(), Some(100.0), SensorType::Storage)
            })
            .collect();
        observations[10].value = Some(1.0e9);
        observations[20].value = Some(-1.0e9);
        let series = normalize_monthly("BLB", &observations).unwrap();
        assert!(series.records.iter().all(|r| r.value == 100.0));
    }

    #[test]
    fn test_all_missing_is_no_data() {
        let observations = vec![obs("20200115", None, SensorType::Storage)];
        match normalize_monthly("BLB", &observations) {
            Err(DataError::NoData { station }) => assert_eq!(station, "BLB"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            normalize_monthly("BLB", &[]),
            Err(DataError::NoData { .. })
        ));
    }

    #[test]
    fn test_mixed_sensors_rejected() {
        let observations = vec![
            obs("20200115", Some(100.0), SensorType::Storage),
            obs("20200215", Some(300.0), SensorType::Elevation),
        ];
        assert!(matches!(
            normalize_monthly("BLB", &observations),
            Err(DataError::MixedSensors { .. })
        ));
    }
}
