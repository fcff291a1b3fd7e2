use crate::analyzer::{build_report, Aggregation, Aggregator, ReportRecord, RunTotals};
use crate::config::Settings;
use crate::error::{AnalyzerError, Result};
use crate::locator::{self, LogFileRef};
use crate::parser::{parse_line, ParsedLine};
use crate::report::ReportRenderer;
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Written {
        path: PathBuf,
        records: Vec<ReportRecord>,
        totals: RunTotals,
    },
    /// A report for the selected log is already present
    AlreadyExists(PathBuf),
    /// The log had no lines, or none with a usable request time
    NothingToReport,
}

/// Open a log file, transparently decompressing `.gz` files.
pub fn open_log(log: &LogFileRef) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(&log.path)?;
    if log.compressed {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read every line of `reader` into an [`Aggregation`].
///
/// Lines that are not valid UTF-8 count as unparsed.
pub fn scan<R: BufRead>(mut reader: R) -> io::Result<Aggregation> {
    let mut aggregator = Aggregator::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = trim_line_end(&buf);
        match std::str::from_utf8(line) {
            Ok(line) => aggregator.observe(&parse_line(line)),
            Err(_) => aggregator.observe(&ParsedLine::Unmatched),
        }
    }
    Ok(aggregator.finish())
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Ranked records of one log plus the counters they were computed from
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub records: Vec<ReportRecord>,
    pub totals: RunTotals,
}

/// Scan a log, apply the error-rate gate and rank the result.
///
/// An empty log passes the gate and yields no records.
pub fn analyze(log: &LogFileRef, report_size: usize, max_error_rate: f64) -> Result<Analysis> {
    let read_err = |source| AnalyzerError::LogRead {
        path: log.path.clone(),
        source,
    };
    let aggregation = scan(open_log(log).map_err(read_err)?).map_err(read_err)?;
    let totals = aggregation.totals;
    log::info!(
        "Read {} lines, {} unparsed, {} distinct URLs",
        totals.total_lines,
        totals.total_errors,
        aggregation.stats.len()
    );

    aggregation.check_error_rate(max_error_rate)?;
    Ok(Analysis {
        records: build_report(&aggregation, report_size),
        totals,
    })
}

/// Locate → skip-if-done → scan → gate → rank → render
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn run(&self, renderer: &dyn ReportRenderer) -> Result<Outcome> {
        let settings = &self.settings;

        let log = locator::locate(&settings.log_dir, &settings.log_prefix)?;
        log::info!("Latest log file: {}", log.path.display());

        let report_path = settings
            .report_dir
            .join(locator::report_file_name(&log, renderer.extension()));
        let exists = report_path
            .try_exists()
            .map_err(|source| AnalyzerError::ReportWrite {
                path: report_path.clone(),
                source,
            })?;
        if exists {
            log::info!(
                "Report '{}' already exists, nothing to do",
                report_path.display()
            );
            return Ok(Outcome::AlreadyExists(report_path));
        }

        log::info!("Analyzing '{}'...", log.path.display());
        let Analysis { records, totals } =
            analyze(&log, settings.report_size, settings.max_error_rate)?;
        if records.is_empty() {
            log::info!("No request time recorded, no report written");
            return Ok(Outcome::NothingToReport);
        }

        fs::create_dir_all(&settings.report_dir).map_err(|source| {
            AnalyzerError::ReportWrite {
                path: settings.report_dir.clone(),
                source,
            }
        })?;
        renderer.render(&records, &report_path)?;
        log::info!(
            "Report with {} URLs written to '{}'",
            records.len(),
            report_path.display()
        );

        Ok(Outcome::Written {
            path: report_path,
            records,
            totals,
        })
    }
}
