use crate::error::{AnalyzerError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved run settings.
///
/// Keys missing from a config file keep the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Maximum number of URLs kept in a report
    pub report_size: usize,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
    /// File-name prefix of rotated logs (`<prefix>.log-YYYYMMDD[.gz]`)
    pub log_prefix: String,
    /// Share of unparsed lines at which a log is rejected
    pub max_error_rate: f64,
    /// Append process logs here instead of stderr
    pub logging_file: Option<PathBuf>,
    /// HTML template overriding the built-in one
    pub report_template: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            report_size: 1000,
            report_dir: PathBuf::from("./reports"),
            log_dir: PathBuf::from("./log"),
            log_prefix: "nginx-access-ui".to_string(),
            max_error_rate: 0.2,
            logging_file: None,
            report_template: None,
        }
    }
}

impl Settings {
    /// Read a TOML config file and merge it over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| AnalyzerError::ConfigNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            toml::from_str(&content).map_err(|source| AnalyzerError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.report_size == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "report_size must be greater than zero".to_string(),
            ));
        }
        if !(self.max_error_rate > 0.0 && self.max_error_rate <= 1.0) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "max_error_rate must be in (0, 1], got {}",
                self.max_error_rate
            )));
        }
        if self.log_prefix.is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "log_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
