use crate::error::{IwfmError, Result};
use crate::schema::{parse_real, TIMESERIES_SCHEMA};
use crate::spec_file::format_real;
use cbc_utils::dates::parse_legacy_date;
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::io::Write;

/// Name of the date label column.
pub const DATE_COLUMN: &str = "ITHTS";

/// Column name of a 1-based time-series slot.
pub fn column_name(slot: u32) -> String {
    format!("HQTS({slot})")
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    /// Label as written, e.g. `10/31/1973_24:00`
    pub label: String,
    /// Values for slots 1..=N
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesTable {
    pub column_count: usize,
    pub rows: Vec<TimeSeriesRow>,
}

impl TimeSeriesTable {
    fn push_row(&mut self, file: &str, line: usize, cells: &[&str]) -> Result<()> {
        let (label, values) = match cells.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };
        let date = parse_legacy_date(label).map_err(|e| IwfmError::Parse {
            file: file.to_string(),
            line,
            column: DATE_COLUMN.to_string(),
            value: label.to_string(),
            reason: e.to_string(),
        })?;
        if self.rows.is_empty() && self.column_count == 0 {
            self.column_count = values.len();
        } else if values.len() != self.column_count {
            return Err(IwfmError::Parse {
                file: file.to_string(),
                line,
                column: column_name(values.len().min(self.column_count) as u32 + 1),
                value: label.to_string(),
                reason: format!(
                    "row has {} values, the table has {}",
                    values.len(),
                    self.column_count
                ),
            });
        }
        let values = values
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_real(file, line, &column_name(i as u32 + 1), raw))
            .collect::<Result<Vec<f64>>>()?;
        self.rows.push(TimeSeriesRow {
            date,
            label: label.to_string(),
            values,
        });
        Ok(())
    }

    /// Parse a legacy time-series file: every dated row from the first
    /// `_24:00` label on, until the end of the file.
    pub fn parse(file: &str, content: &str) -> Result<TimeSeriesTable> {
        let block = TIMESERIES_SCHEMA.locate(file, content)?;
        let mut table = TimeSeriesTable::default();
        for line in &block.lines {
            table.push_row(file, line.number, &line.tokens())?;
        }
        Ok(table)
    }

    /// Read a table previously written by [`TimeSeriesTable::write_csv`].
    pub fn from_csv(file: &str, content: &str) -> Result<TimeSeriesTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers()?.clone();
        let mut table = TimeSeriesTable {
            column_count: headers.len().saturating_sub(1),
            rows: Vec::new(),
        };
        for row in rdr.records() {
            let row = row?;
            let line = row.position().map(|p| p.line() as usize).unwrap_or_default();
            let cells: Vec<&str> = row.iter().map(str::trim).collect();
            table.push_row(file, line, &cells)?;
        }
        Ok(table)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend((1..=self.column_count as u32).map(column_name));
        wtr.write_record(&header)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.label.clone());
            record.extend(row.values.iter().map(|v| format_real(*v)));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Value of a 1-based slot on `date`, if both exist.
    pub fn value(&self, date: &NaiveDate, slot: u32) -> Option<f64> {
        let idx = (slot as usize).checked_sub(1)?;
        self.rows
            .iter()
            .find(|r| r.date == *date)
            .and_then(|r| r.values.get(idx).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS_FILE: &str = "C*******************************************************
C  Constrained head time series
C
     4                     / NCOLHTS
     1.0                   / FACTHTS
C   ITHTS              HQTS(1)   HQTS(2)   HQTS(3)   HQTS(4)
C-------------------------------------------------------
    10/31/1973_24:00   200.5     9999      0         9999
    11/30/1973_24:00   201.0     9999      0         9999
C   mid-table comment
    12/31/1973_24:00   1.5D+02   9999      0         9999
*   end of data
";

    #[test]
    fn test_parse_timeseries() {
        let table = TimeSeriesTable::parse("ts.dat", TS_FILE).unwrap();
        assert_eq!(table.column_count, 4);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].label, "10/31/1973_24:00");
        assert_eq!(
            table.first_date(),
            NaiveDate::from_ymd_opt(1973, 10, 31)
        );
        assert_eq!(table.last_date(), NaiveDate::from_ymd_opt(1973, 12, 31));
        assert_eq!(table.rows[2].values[0], 150.0);
        let nov = NaiveDate::from_ymd_opt(1973, 11, 30).unwrap();
        assert_eq!(table.value(&nov, 1), Some(201.0));
        assert_eq!(table.value(&nov, 5), None);
        assert_eq!(table.value(&nov, 0), None);
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let content = "  10/31/1973_24:00  1  2\n  11/30/1973_24:00  1\n";
        match TimeSeriesTable::parse("ts.dat", content).unwrap_err() {
            IwfmError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let content = "  10/31/1973_24:00  1\n  13/31/1973_24:00  1\n";
        match TimeSeriesTable::parse("ts.dat", content).unwrap_err() {
            IwfmError::Parse { column, line, .. } => {
                assert_eq!(column, DATE_COLUMN);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_and_reread() {
        let table = TimeSeriesTable::parse("ts.dat", TS_FILE).unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("ITHTS,HQTS(1),HQTS(2),HQTS(3),HQTS(4)\n"));
        assert!(text.contains("10/31/1973_24:00,200.5,9999,0,9999\n"));
        let reread = TimeSeriesTable::from_csv("ts.csv", &text).unwrap();
        assert_eq!(reread, table);
    }
}
