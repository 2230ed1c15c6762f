use crate::error::{DataError, Result};
use crate::interpolation::linear;
use crate::normalize::{MonthlyRecord, MonthlySeries};
use cbc_cdec::SensorType;
use cbc_iwfm::RatingRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage (acre-feet) to elevation (feet) anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingCurvePoint {
    pub storage: f64,
    pub elevation: f64,
}

/// A reservoir's storage-elevation relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingCurve {
    pub reservoir: String,
    /// Anchors ordered by storage; equal storages keep their input order
    points: Vec<RatingCurvePoint>,
}

impl RatingCurve {
    pub fn new(reservoir: &str, mut points: Vec<RatingCurvePoint>) -> RatingCurve {
        points.retain(|p| p.storage.is_finite() && p.elevation.is_finite());
        points.sort_by(|a, b| a.storage.total_cmp(&b.storage));
        RatingCurve {
            reservoir: reservoir.to_string(),
            points,
        }
    }

    /// One curve per reservoir key of a parsed rating table.
    pub fn from_rating_rows(rows: &[RatingRow]) -> BTreeMap<String, RatingCurve> {
        let mut grouped: BTreeMap<String, Vec<RatingCurvePoint>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.reservoir.clone())
                .or_default()
                .push(RatingCurvePoint {
                    storage: row.storage,
                    elevation: row.elevation,
                });
        }
        grouped
            .into_iter()
            .map(|(reservoir, points)| {
                let curve = RatingCurve::new(&reservoir, points);
                (reservoir, curve)
            })
            .collect()
    }

    pub fn points(&self) -> &[RatingCurvePoint] {
        &self.points
    }

    /// Elevation of the anchors sharing `storage`; they must agree.
    fn anchor_elevation(&self, storage: f64) -> Result<f64> {
        let start = self.points.partition_point(|p| p.storage < storage);
        let end = self.points.partition_point(|p| p.storage <= storage);
        let group = &self.points[start..end];
        let first = group.first().ok_or_else(|| DataError::EmptyRatingCurve {
            reservoir: self.reservoir.clone(),
        })?;
        if group.iter().any(|p| p.elevation != first.elevation) {
            return Err(DataError::AmbiguousRatingCurve {
                reservoir: self.reservoir.clone(),
                storage,
            });
        }
        Ok(first.elevation)
    }

    /// Elevation at `storage`: linear between the bracketing anchors, flat
    /// beyond either end of the curve.
    pub fn elevation_at(&self, storage: f64) -> Result<f64> {
        if !storage.is_finite() {
            return Err(DataError::NonFiniteStorage {
                reservoir: self.reservoir.clone(),
                storage,
            });
        }
        let (lowest, highest) = match (self.points.first(), self.points.last()) {
            (Some(lo), Some(hi)) => (lo.storage, hi.storage),
            _ => {
                return Err(DataError::EmptyRatingCurve {
                    reservoir: self.reservoir.clone(),
                })
            }
        };
        if storage <= lowest {
            return self.anchor_elevation(lowest);
        }
        if storage >= highest {
            return self.anchor_elevation(highest);
        }
        let below = self.points.partition_point(|p| p.storage < storage);
        let above = self.points.partition_point(|p| p.storage <= storage);
        if above > below {
            return self.anchor_elevation(storage);
        }
        let lo = self.points[below - 1].storage;
        let hi = self.points[above].storage;
        Ok(linear(
            storage,
            lo,
            self.anchor_elevation(lo)?,
            hi,
            self.anchor_elevation(hi)?,
        ))
    }

    /// Elevation of an empty reservoir.
    pub fn dead_pool_elevation(&self) -> Result<f64> {
        self.elevation_at(0.0)
    }

    /// Attach elevations to a storage series. Elevation series already hold
    /// elevations and are returned unchanged.
    pub fn apply(&self, series: &MonthlySeries) -> Result<MonthlySeries> {
        if series.sensor_type != SensorType::Storage {
            return Ok(series.clone());
        }
        let records = series
            .records
            .iter()
            .map(|r| {
                Ok(MonthlyRecord {
                    value_elevation: Some(self.elevation_at(r.value)?),
                    ..r.clone()
                })
            })
            .collect::<Result<Vec<MonthlyRecord>>>()?;
        Ok(MonthlySeries {
            reservoir_id: series.reservoir_id.clone(),
            sensor_type: series.sensor_type,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn curve(points: &[(f64, f64)]) -> RatingCurve {
        RatingCurve::new(
            "BLB",
            points
                .iter()
                .map(|(storage, elevation)| RatingCurvePoint {
                    storage: *storage,
                    elevation: *elevation,
                })
                .collect(),
        )
    }

    fn storage_series(values: &[f64]) -> MonthlySeries {
        let mut period_end = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        let mut records = Vec::new();
        for value in values {
            records.push(MonthlyRecord {
                reservoir_id: "BLB".to_string(),
                period_end,
                value: *value,
                value_elevation: None,
            });
            period_end = cbc_utils::dates::next_month_end(&period_end);
        }
        MonthlySeries {
            reservoir_id: "BLB".to_string(),
            sensor_type: SensorType::Storage,
            records,
        }
    }

    #[test]
    fn test_interpolates_between_anchors() {
        let c = curve(&[(1000.0, 320.0), (0.0, 300.0), (5000.0, 360.0)]);
        assert_eq!(c.elevation_at(500.0).unwrap(), 310.0);
        assert_eq!(c.elevation_at(3000.0).unwrap(), 340.0);
        assert_eq!(c.elevation_at(1000.0).unwrap(), 320.0);
        assert_eq!(c.dead_pool_elevation().unwrap(), 300.0);
    }

    #[test]
    fn test_flat_beyond_curve() {
        let c = curve(&[(100.0, 300.0), (200.0, 310.0)]);
        assert_eq!(c.elevation_at(0.0).unwrap(), 300.0);
        assert_eq!(c.elevation_at(1.0e6).unwrap(), 310.0);
    }

    #[test]
    fn test_monotonic_curve_gives_monotonic_elevations() {
        let c = curve(&[(0.0, 300.0), (1000.0, 320.0), (1000.0, 320.0), (4000.0, 321.0), (9000.0, 380.0)]);
        let storages: Vec<f64> = (0..100).map(|i| i as f64 * 100.0).collect();
        let elevations: Vec<f64> = storages.iter().map(|s| c.elevation_at(*s).unwrap()).collect();
        for pair in elevations.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_conflicting_anchor_is_ambiguous() {
        let c = curve(&[(0.0, 300.0), (1000.0, 320.0), (1000.0, 325.0), (2000.0, 340.0)]);
        assert!(matches!(
            c.elevation_at(500.0),
            Err(DataError::AmbiguousRatingCurve { .. })
        ));
        assert!(matches!(
            c.elevation_at(1000.0),
            Err(DataError::AmbiguousRatingCurve { .. })
        ));
        // brackets that avoid the conflict still resolve
        assert_eq!(c.elevation_at(0.0).unwrap(), 300.0);
    }

    #[test]
    fn test_non_finite_storage_is_an_error() {
        let c = curve(&[(0.0, 300.0), (1000.0, 400.0)]);
        assert!(matches!(
            c.elevation_at(f64::NAN),
            Err(DataError::NonFiniteStorage { .. })
        ));
        assert!(matches!(
            c.elevation_at(f64::INFINITY),
            Err(DataError::NonFiniteStorage { .. })
        ));
        let series = storage_series(&[500.0, f64::NAN]);
        assert!(c.apply(&series).is_err());
    }

    #[test]
    fn test_empty_curve() {
        let c = curve(&[]);
        assert!(matches!(
            c.dead_pool_elevation(),
            Err(DataError::EmptyRatingCurve { .. })
        ));
    }

    #[test]
    fn test_apply_keeps_time_order() {
        let c = curve(&[(0.0, 300.0), (1000.0, 400.0)]);
        let series = storage_series(&[800.0, 200.0, 500.0]);
        let converted = c.apply(&series).unwrap();
        let heads: Vec<f64> = converted.records.iter().map(|r| r.head()).collect();
        assert_eq!(heads, vec![380.0, 320.0, 350.0]);
        assert_eq!(converted.records[1].value, 200.0);
        assert_eq!(converted.records[0].period_end, series.records[0].period_end);
    }

    #[test]
    fn test_elevation_series_passes_through() {
        let c = curve(&[(0.0, 300.0)]);
        let mut series = storage_series(&[410.0]);
        series.sensor_type = SensorType::Elevation;
        let converted = c.apply(&series).unwrap();
        assert_eq!(converted, series);
    }

    #[test]
    fn test_from_rating_rows_groups_by_reservoir() {
        let rows = vec![
            RatingRow { reservoir: "1".into(), storage: 1000.0, area: None, elevation: 320.0 },
            RatingRow { reservoir: "2".into(), storage: 0.0, area: None, elevation: 100.0 },
            RatingRow { reservoir: "1".into(), storage: 0.0, area: None, elevation: 300.0 },
        ];
        let curves = RatingCurve::from_rating_rows(&rows);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves["1"].points()[0].storage, 0.0);
        assert_eq!(curves["1"].dead_pool_elevation().unwrap(), 300.0);
    }
}
