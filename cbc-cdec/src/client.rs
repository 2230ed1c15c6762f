//! CDEC `CSVDataServlet` client.
//!
//! Requests are retried with exponential backoff, first with the client's
//! default headers and then with browser-like headers (the servlet has been
//! seen rejecting bare clients). A client that accepts invalid certificates
//! is only built when the caller opts in, and is tried last.

use crate::error::{CdecError, Result};
use crate::station::StationSelection;
use cbc_utils::dates::query_date;
use chrono::NaiveDate;
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const CSV_SERVLET_URL: &str = "https://cdec.water.ca.gov/dynamicapp/req/CSVDataServlet";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq)]
enum HeaderProfile {
    Default,
    Browser,
}

impl HeaderProfile {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if *self == HeaderProfile::Browser {
            headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("text/csv,text/plain;q=0.9,*/*;q=0.8"),
            );
        }
        headers
    }
}

pub struct CdecClient {
    client: Client,
    insecure: Option<Client>,
    max_tries: u32,
    initial_backoff_ms: u64,
}

fn build_client(accept_invalid_certs: bool) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| CdecError::Network {
            station: String::new(),
            message: format!("failed to build HTTP client: {e}"),
        })
}

impl CdecClient {
    pub fn new(allow_insecure_tls: bool) -> Result<Self> {
        let insecure = if allow_insecure_tls {
            Some(build_client(true)?)
        } else {
            None
        };
        Ok(CdecClient {
            client: build_client(false)?,
            insecure,
            max_tries: 3,
            initial_backoff_ms: 1000,
        })
    }

    /// Build the servlet URL. An open `end` asks CDEC for everything up to today.
    pub fn data_url(
        station: &StationSelection,
        start_date: &NaiveDate,
        end_date: Option<&NaiveDate>,
    ) -> String {
        let end = end_date.map(query_date).unwrap_or_default();
        format!(
            "{}?Stations={}&SensorNums={}&dur_code={}&Start={}&End={}",
            CSV_SERVLET_URL,
            station.station_id,
            station.sensor_type.number(),
            station.duration.code(),
            query_date(start_date),
            end
        )
    }

    async fn try_profile(
        &self,
        client: &Client,
        profile: HeaderProfile,
        station_id: &str,
        url: &str,
    ) -> std::result::Result<String, String> {
        let mut sleep_millis = self.initial_backoff_ms;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_tries {
            match client.get(url).headers(profile.headers()).send().await {
                Ok(response) => {
                    if response.status() != StatusCode::OK {
                        last_error = format!("bad response status {}", response.status());
                    } else {
                        match response.text().await {
                            Ok(body) if body.trim().len() > 2 => return Ok(body),
                            Ok(_) => last_error = "empty response".to_string(),
                            Err(e) => last_error = format!("failed to read body: {e}"),
                        }
                    }
                }
                Err(e) => last_error = format!("request failed: {e}"),
            }
            warn!(
                "Attempt {}/{} ({:?} headers) for {}: {}",
                attempt, self.max_tries, profile, station_id, last_error
            );
            if attempt < self.max_tries {
                info!(
                    "Sleeping for {} milliseconds before retry for {}",
                    sleep_millis, station_id
                );
                tokio::time::sleep(Duration::from_millis(sleep_millis)).await;
                sleep_millis *= 2;
            }
        }
        Err(last_error)
    }

    /// Fetch the raw CSV body for one station.
    pub async fn fetch_csv(
        &self,
        station: &StationSelection,
        start_date: &NaiveDate,
        end_date: Option<&NaiveDate>,
    ) -> Result<String> {
        let url = CdecClient::data_url(station, start_date, end_date);
        let station_id = station.station_id.as_str();
        let mut last_error = String::new();

        for profile in [HeaderProfile::Default, HeaderProfile::Browser] {
            match self.try_profile(&self.client, profile, station_id, &url).await {
                Ok(body) => return Ok(body),
                Err(e) => last_error = e,
            }
        }

        if let Some(insecure) = &self.insecure {
            warn!(
                "Retrying {} without certificate verification (allow_insecure_tls is set)",
                station_id
            );
            match self
                .try_profile(insecure, HeaderProfile::Browser, station_id, &url)
                .await
            {
                Ok(body) => return Ok(body),
                Err(e) => last_error = e,
            }
        }

        Err(CdecError::Network {
            station: station_id.to_string(),
            message: last_error,
        })
    }
}
