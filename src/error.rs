use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every condition that aborts a run.
///
/// Lines that fail to parse are not represented here: they are counted by the
/// aggregator and only surface through [`AnalyzerError::ErrorRateExceeded`].
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("config file '{path}' not found: {source}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file '{path}' is not valid TOML: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot read log directory '{path}': {source}")]
    LogDirUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no log file matching '{prefix}.log-YYYYMMDD[.gz]' in '{dir}'")]
    NoLogFile { dir: PathBuf, prefix: String },

    #[error("failed to read log file '{path}': {source}")]
    LogRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "log looks corrupt or format-mismatched: {errors} of {lines} lines unparsed \
         (limit {:.1}%)",
        .limit * 100.0
    )]
    ErrorRateExceeded { errors: u64, lines: u64, limit: f64 },

    #[error("cannot load report template '{path}': {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report '{path}': {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
