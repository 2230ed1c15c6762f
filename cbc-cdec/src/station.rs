use crate::error::{CdecError, Result};
use crate::observation::SensorType;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// The duration code of a CDEC sensor series.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Duration {
    Event,
    Hourly,
    Daily,
    Monthly,
}

impl Duration {
    pub fn code(&self) -> &'static str {
        match self {
            Duration::Event => "E",
            Duration::Hourly => "H",
            Duration::Daily => "D",
            Duration::Monthly => "M",
        }
    }

    pub fn from_code(code: &str) -> Option<Duration> {
        match code.trim().to_ascii_uppercase().as_str() {
            "E" => Some(Duration::Event),
            "H" => Some(Duration::Hourly),
            "D" => Some(Duration::Daily),
            "M" => Some(Duration::Monthly),
            _ => None,
        }
    }
}

/// A reservoir picked by the operator for inclusion in the boundary
/// condition build.
///
/// Selections are produced outside this workspace (the reservoir review
/// spreadsheet) and handed over as CSV with the columns
/// `ID,Name,Sensor_No,Duration_Code,Rating_ID`. `Sensor_No` may carry the
/// CDEC description after a colon (e.g. `15: RESERVOIR STORAGE`).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StationSelection {
    /// CDEC station identifier (e.g., "BLB"), or a longer id for reservoirs
    /// that only exist in the rating source
    pub station_id: String,
    /// Lake name as it appears in the node association source
    pub name: String,
    pub sensor_type: SensorType,
    pub duration: Duration,
    /// Reservoir number in the storage-elevation rating table
    pub rating_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SelectionRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Sensor_No", default)]
    sensor_no: String,
    #[serde(rename = "Duration_Code", default)]
    duration_code: String,
    #[serde(rename = "Rating_ID", default)]
    rating_id: String,
}

impl StationSelection {
    /// CDEC ids are three characters; anything longer is a placeholder for a
    /// reservoir that is matched to the rating table but never downloaded.
    pub fn is_cdec_station(&self) -> bool {
        let len = self.station_id.trim().len();
        len > 0 && len <= 3
    }

    /// Parse the operator's selection CSV.
    pub fn parse_selection_csv(csv_object: &str) -> Result<Vec<StationSelection>> {
        let mut selections = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_object.as_bytes());
        for row in rdr.deserialize::<SelectionRow>() {
            let row = row?;
            if row.id.is_empty() {
                continue;
            }
            let sensor_number = row
                .sensor_no
                .split(':')
                .next()
                .unwrap_or("")
                .trim()
                .parse::<u32>()
                .map_err(|_| {
                    CdecError::InvalidSelection(format!(
                        "station {} has sensor '{}'",
                        row.id, row.sensor_no
                    ))
                })?;
            let duration = if row.duration_code.is_empty() {
                Duration::Daily
            } else {
                Duration::from_code(&row.duration_code).ok_or_else(|| {
                    CdecError::InvalidSelection(format!(
                        "station {} has duration code '{}'",
                        row.id, row.duration_code
                    ))
                })?
            };
            let rating_id = Some(row.rating_id).filter(|r| !r.is_empty());
            selections.push(StationSelection {
                station_id: row.id,
                name: row.name,
                sensor_type: SensorType::from(sensor_number),
                duration,
                rating_id,
            });
        }
        Ok(selections)
    }
}
