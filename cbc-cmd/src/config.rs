//! YAML pipeline configuration.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    /// First day requested from CDEC
    pub start_date: NaiveDate,
    /// Last day requested from CDEC; open-ended when unset
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Last month written to the time-series table
    pub cutoff: NaiveDate,
    /// Fetch from CDEC; otherwise read the monthly caches
    #[serde(default = "default_download_new")]
    pub download_new: bool,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "default_layer_count")]
    pub layer_count: usize,
    /// Overlay lake names never added as new reservoirs
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Existing specification note to selected station name or id
    #[serde(default)]
    pub note_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub allow_insecure_tls: bool,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Station selection CSV (`ID,Name,Sensor_No,Duration_Code,Rating_ID`)
    pub selection: PathBuf,
    /// Node association CSV (`INODE,Name`)
    pub associations: PathBuf,
    /// Existing specification, legacy layout or a CSV written by this tool
    pub spec: PathBuf,
    /// Existing time series, legacy layout or a CSV written by this tool
    pub timeseries: PathBuf,
    pub gw_main: PathBuf,
    pub stratigraphy: PathBuf,
    pub preprocessor_output: PathBuf,
    pub rating_table: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_download_new() -> bool {
    true
}

fn default_layer_count() -> usize {
    4
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

impl PathsConfig {
    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.selection,
            &mut self.associations,
            &mut self.spec,
            &mut self.timeseries,
            &mut self.gw_main,
            &mut self.stratigraphy,
            &mut self.preprocessor_output,
            &mut self.rating_table,
            &mut self.output_dir,
            &mut self.cache_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

impl PipelineConfig {
    /// Read, resolve and validate a config file. Relative paths are taken
    /// from the config file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = PipelineConfig::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.paths.resolve(base);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.layer_count == 0 {
            bail!("layer_count must be at least 1");
        }
        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                bail!(
                    "end_date {} precedes start_date {}",
                    end_date,
                    self.start_date
                );
            }
        }
        if self.cutoff < self.start_date {
            bail!(
                "cutoff {} precedes start_date {}",
                self.cutoff,
                self.start_date
            );
        }
        if self.allow_insecure_tls {
            log::warn!("allow_insecure_tls is set; certificate checks may be skipped for CDEC");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "
paths:
  selection: stations.csv
  associations: lake_nodes.csv
  spec: CBC.dat
  timeseries: CBC_TS.dat
  gw_main: Groundwater.dat
  stratigraphy: Stratigraphy.dat
  preprocessor_output: PreProcessor.out
  rating_table: res_info.table
start_date: 1950-01-01
cutoff: 2021-09-30
note_aliases:
  Camanche: Camanche Reservoir
";

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.layer_count, 4);
        assert!(config.download_new);
        assert!(!config.overwrite);
        assert_eq!(config.request_delay_ms, 500);
        assert_eq!(config.end_date, None);
        assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2021, 9, 30).unwrap());
        assert_eq!(config.paths.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.note_aliases["Camanche"], "Camanche Reservoir");
    }

    #[test]
    fn test_cutoff_is_required() {
        let without_cutoff = CONFIG.replace("cutoff: 2021-09-30\n", "");
        assert!(PipelineConfig::from_yaml(&without_cutoff).is_err());
    }

    #[test]
    fn test_zero_layers_rejected() {
        let config = format!("{CONFIG}layer_count: 0\n");
        assert!(PipelineConfig::from_yaml(&config).is_err());
    }

    #[test]
    fn test_relative_paths_resolved() {
        let mut config = PipelineConfig::from_yaml(CONFIG).unwrap();
        config.paths.resolve(Path::new("/data/run"));
        assert_eq!(config.paths.spec, PathBuf::from("/data/run/CBC.dat"));
        assert_eq!(config.paths.output_dir, PathBuf::from("/data/run/output"));
    }
}
