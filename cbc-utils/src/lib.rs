//! Shared utility functions for the CBC lake boundary crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, NaiveDate};
    use std::mem::replace;

    /// Date string used by the model's time-series files: "MM/DD/YYYY_24:00"
    pub const LEGACY_DATE_FORMAT: &str = "%m/%d/%Y_24:00";

    /// Date format used for CDEC API query parameters: "YYYY-MM-DD"
    pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

    /// Query parameter form of a date, as the CDEC servlet expects it.
    pub fn query_date(date: &NaiveDate) -> String {
        date.format(QUERY_DATE_FORMAT).to_string()
    }

    /// Format a date the way the legacy time-series file labels its rows.
    pub fn format_legacy_date(date: &NaiveDate) -> String {
        date.format(LEGACY_DATE_FORMAT).to_string()
    }

    /// Parse a legacy "MM/DD/YYYY_24:00" row label.
    pub fn parse_legacy_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), LEGACY_DATE_FORMAT)?)
    }

    /// Stamp appended to output file names: "YYYYMMDD"
    pub fn run_stamp(date: &NaiveDate) -> String {
        date.format("%Y%m%d").to_string()
    }

    /// Last day of the month containing `date`.
    pub fn month_end(date: &NaiveDate) -> NaiveDate {
        let (year, month) = (date.year(), date.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first| first.pred_opt())
            .unwrap_or(*date)
    }

    /// Month end of the month following the one containing `date`.
    pub fn next_month_end(date: &NaiveDate) -> NaiveDate {
        let end = month_end(date);
        match end.succ_opt() {
            Some(first) => month_end(&first),
            None => end,
        }
    }

    /// Iterator over every month end from the month of the first date through
    /// the month of the second date (inclusive).
    #[derive(Clone, Eq, PartialEq, Copy, Debug)]
    pub struct MonthEnds(pub NaiveDate, pub NaiveDate);

    impl MonthEnds {
        pub fn new(start: &NaiveDate, end: &NaiveDate) -> Self {
            MonthEnds(month_end(start), month_end(end))
        }
    }

    impl Iterator for MonthEnds {
        type Item = NaiveDate;
        fn next(&mut self) -> Option<Self::Item> {
            if self.0 <= self.1 {
                let next = next_month_end(&self.0);
                if next == self.0 {
                    // calendar exhausted
                    self.1 = self.0.pred_opt().unwrap_or(self.0);
                    return Some(self.0);
                }
                Some(replace(&mut self.0, next))
            } else {
                None
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_month_end() {
            let feb = NaiveDate::from_ymd_opt(2020, 2, 3).unwrap();
            assert_eq!(month_end(&feb), NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());

            let dec = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
            assert_eq!(month_end(&dec), dec);
            assert_eq!(
                next_month_end(&dec),
                NaiveDate::from_ymd_opt(2022, 1, 31).unwrap()
            );
        }

        #[test]
        fn test_legacy_date_round_trip() {
            let date = NaiveDate::from_ymd_opt(1973, 10, 31).unwrap();
            let label = format_legacy_date(&date);
            assert_eq!(label, "10/31/1973_24:00");
            assert_eq!(parse_legacy_date(&label).unwrap(), date);
            assert!(parse_legacy_date("1973-10-31").is_err());
        }

        #[test]
        fn test_month_ends_iteration() {
            let start = NaiveDate::from_ymd_opt(2019, 11, 15).unwrap();
            let end = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
            let ends: Vec<NaiveDate> = MonthEnds::new(&start, &end).collect();
            assert_eq!(ends.len(), 4);
            assert_eq!(ends[0], NaiveDate::from_ymd_opt(2019, 11, 30).unwrap());
            assert_eq!(ends[3], NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        }

        #[test]
        fn test_month_ends_empty() {
            let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
            let end = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
            assert_eq!(MonthEnds::new(&start, &end).count(), 0);
        }

        #[test]
        fn test_query_date_and_stamp() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 5).unwrap();
            assert_eq!(query_date(&date), "2023-06-05");
            assert_eq!(run_stamp(&date), "20230605");
        }
    }
}
