use crate::error::{AnalyzerError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// A rotated log file discovered in the log directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileRef {
    pub path: PathBuf,
    /// Date embedded in the file name; `None` when the stamp is not a real calendar date
    pub observed_date: Option<NaiveDate>,
    /// The raw 8-digit stamp as it appears in the name
    pub stamp: String,
    pub compressed: bool,
}

impl LogFileRef {
    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Compiled `<prefix>.log-YYYYMMDD[.gz]` file-name convention
pub struct LogNamePattern {
    re: Regex,
}

impl LogNamePattern {
    pub fn new(prefix: &str) -> Self {
        let pattern = format!(
            r"^{}\.log-(?P<stamp>\d{{8}})(?P<gz>\.gz)?$",
            regex::escape(prefix)
        );
        Self {
            re: Regex::new(&pattern).expect("escaped prefix always yields a valid regex"),
        }
    }

    /// Turn a directory entry name into a candidate, or `None` if the name
    /// does not follow the convention.
    pub fn candidate(&self, dir: &Path, file_name: &str) -> Option<LogFileRef> {
        let caps = self.re.captures(file_name)?;
        let stamp = caps["stamp"].to_string();
        Some(LogFileRef {
            path: dir.join(file_name),
            observed_date: NaiveDate::parse_from_str(&stamp, "%Y%m%d").ok(),
            stamp,
            compressed: caps.name("gz").is_some(),
        })
    }
}

/// Pick the most recent candidate.
///
/// Dated candidates always outrank undated ones. Among undated candidates the
/// lexicographically greatest name wins so that repeated runs agree.
pub fn select_latest(candidates: Vec<LogFileRef>) -> Option<LogFileRef> {
    candidates
        .into_iter()
        .max_by(|a, b| {
            a.observed_date
                .cmp(&b.observed_date)
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
}

/// Scan `dir` and return the latest `<prefix>.log-YYYYMMDD[.gz]` file.
pub fn locate(dir: &Path, prefix: &str) -> Result<LogFileRef> {
    let unreadable = |source| AnalyzerError::LogDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let pattern = LogNamePattern::new(prefix);
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            log::debug!("Skipping non UTF-8 file name {:?}", name);
            continue;
        };
        if let Some(found) = pattern.candidate(dir, name) {
            if found.observed_date.is_none() {
                log::warn!("Log file '{}' carries an invalid date stamp", name);
            }
            candidates.push(found);
        }
    }

    log::debug!(
        "Found {} candidate log file(s) in '{}'",
        candidates.len(),
        dir.display()
    );

    select_latest(candidates).ok_or_else(|| AnalyzerError::NoLogFile {
        dir: dir.to_path_buf(),
        prefix: prefix.to_string(),
    })
}

/// Deterministic report name for a log: `report-YYYY-MM-DD.<ext>`.
///
/// Undated logs fall back to their raw stamp.
pub fn report_file_name(log: &LogFileRef, extension: &str) -> String {
    match log.observed_date {
        Some(date) => format!("report-{}.{}", date.format("%Y-%m-%d"), extension),
        None => format!("report-{}.{}", log.stamp, extension),
    }
}
