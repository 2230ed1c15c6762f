use crate::error::{CdecError, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};

/// Date format used for CDEC CSV responses: "YYYYMMDD HHMM"
pub const DATE_FORMAT: &str = "%Y%m%d %H%M";

/// CDEC sensor number for reservoir storage (acre-feet).
pub const SENSOR_STORAGE: u32 = 15;

/// CDEC sensor number for reservoir elevation (feet).
pub const SENSOR_ELEVATION: u32 = 6;

/// Markers CDEC writes in the VALUE column instead of a number.
/// - `---`: missing or unavailable data
/// - `BRT` / `ART`: below / above rating table
pub const MISSING_MARKERS: [&str; 3] = ["---", "BRT", "ART"];

/// What a reservoir sensor reports.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum SensorType {
    Storage,
    Elevation,
    Other(u32),
}

impl SensorType {
    pub fn number(&self) -> u32 {
        match self {
            SensorType::Storage => SENSOR_STORAGE,
            SensorType::Elevation => SENSOR_ELEVATION,
            SensorType::Other(n) => *n,
        }
    }
}

impl From<u32> for SensorType {
    fn from(value: u32) -> Self {
        match value {
            SENSOR_STORAGE => SensorType::Storage,
            SENSOR_ELEVATION => SensorType::Elevation,
            n => SensorType::Other(n),
        }
    }
}

impl From<SensorType> for u32 {
    fn from(value: SensorType) -> Self {
        value.number()
    }
}

/// A single reservoir measurement from CDEC.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub station_id: String,
    pub timestamp: NaiveDateTime,
    /// `None` when CDEC reported a missing marker
    pub value: Option<f64>,
    pub sensor_type: SensorType,
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn parse_value(raw: &str) -> std::result::Result<Option<f64>, ()> {
    let raw = raw.trim();
    if raw.is_empty() || MISSING_MARKERS.contains(&raw) {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(()),
    }
}

impl Observation {
    /// Parse a CDEC CSV body (a live `CSVDataServlet` response or a cached
    /// copy of one) into observations.
    ///
    /// Only `DATE TIME` and `VALUE` are required. When the body lacks
    /// `STATION_ID` or `SENSOR_NUMBER`, `station_id` and `sensor_type` are used.
    pub fn parse_cdec_csv(
        body: &str,
        station_id: &str,
        sensor_type: SensorType,
    ) -> Result<Vec<Observation>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());
        let headers = rdr.headers()?.clone();
        let date_idx = column_index(&headers, "DATE TIME")
            .ok_or_else(|| CdecError::MissingColumn("DATE TIME".to_string()))?;
        let value_idx = column_index(&headers, "VALUE")
            .ok_or_else(|| CdecError::MissingColumn("VALUE".to_string()))?;
        let station_idx = column_index(&headers, "STATION_ID");
        let sensor_idx = column_index(&headers, "SENSOR_NUMBER");

        let mut observations = Vec::new();
        for row in rdr.records() {
            let record = row?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let station = station_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(station_id)
                .to_string();
            let date_raw = record.get(date_idx).unwrap_or("").trim();
            if date_raw.is_empty() {
                continue;
            }
            let timestamp = NaiveDateTime::parse_from_str(date_raw, DATE_FORMAT).map_err(|_| {
                CdecError::DateParse {
                    station: station.clone(),
                    line,
                    value: date_raw.to_string(),
                }
            })?;
            let value_raw = record.get(value_idx).unwrap_or("");
            let value = parse_value(value_raw).map_err(|_| CdecError::InvalidValue {
                station: station.clone(),
                line,
                value: value_raw.trim().to_string(),
            })?;
            let sensor = sensor_idx
                .and_then(|i| record.get(i))
                .and_then(|s| s.trim().parse::<u32>().ok())
                .map(SensorType::from)
                .unwrap_or(sensor_type);
            observations.push(Observation {
                station_id: station,
                timestamp,
                value,
                sensor_type: sensor,
            });
        }
        log::debug!(
            "Parsed {} observations for {}",
            observations.len(),
            station_id
        );
        Ok(observations)
    }
}

#[cfg(test)]
mod test {
    use super::{Observation, SensorType};
    use crate::error::CdecError;

    // https://cdec.water.ca.gov/dynamicapp/req/CSVDataServlet?Stations=VIL&SensorNums=15&dur_code=D&Start=2022-02-15&End=2022-02-20
    const STR_RESULT: &str = r#"STATION_ID,DURATION,SENSOR_NUMBER,SENSOR_TYPE,DATE TIME,OBS DATE,VALUE,DATA_FLAG,UNITS
VIL,D,15,STORAGE,20220215 0000,20220215 0000,9593, ,AF
VIL,D,15,STORAGE,20220216 0000,20220216 0000,9589, ,AF
VIL,D,15,STORAGE,20220217 0000,20220217 0000,---, ,AF
VIL,D,15,STORAGE,20220218 0000,20220218 0000,BRT, ,AF
VIL,D,15,STORAGE,20220219 0000,20220219 0000,9585.5, ,AF
"#;

    #[test]
    fn test_parse_cdec_csv() {
        let observations =
            Observation::parse_cdec_csv(STR_RESULT, "VIL", SensorType::Elevation).unwrap();
        assert_eq!(observations.len(), 5);
        assert_eq!(observations[0].station_id, "VIL");
        assert_eq!(observations[0].value, Some(9593.0));
        assert_eq!(observations[0].sensor_type, SensorType::Storage);
        assert_eq!(observations[2].value, None);
        assert_eq!(observations[3].value, None);
        assert_eq!(observations[4].value, Some(9585.5));
    }

    #[test]
    fn test_parse_minimal_columns_uses_defaults() {
        let body = "DATE TIME,VALUE\n20200131 0000,100\n20200229 0000,---\n";
        let observations = Observation::parse_cdec_csv(body, "BLB", SensorType::Storage).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].station_id, "BLB");
        assert_eq!(observations[0].sensor_type, SensorType::Storage);
        assert_eq!(observations[1].value, None);
    }

    #[test]
    fn test_invalid_value_names_station_and_line() {
        let body = "DATE TIME,VALUE\n20200131 0000,abc\n";
        let err = Observation::parse_cdec_csv(body, "BLB", SensorType::Storage).unwrap_err();
        match err {
            CdecError::InvalidValue { station, line, value } => {
                assert_eq!(station, "BLB");
                assert_eq!(line, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_value_column() {
        let body = "DATE TIME,OTHER\n20200131 0000,1\n";
        assert!(matches!(
            Observation::parse_cdec_csv(body, "BLB", SensorType::Storage),
            Err(CdecError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_sensor_type_numbers() {
        assert_eq!(SensorType::from(15), SensorType::Storage);
        assert_eq!(SensorType::from(6), SensorType::Elevation);
        assert_eq!(SensorType::from(76), SensorType::Other(76));
        assert_eq!(u32::from(SensorType::Storage), 15);
    }
}
