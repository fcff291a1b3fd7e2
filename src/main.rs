mod analyzer;
mod config;
mod error;
mod locator;
mod logging;
mod parser;
mod pipeline;
mod report;

use clap::{Parser, ValueEnum};
use config::Settings;
use error::AnalyzerError;
use pipeline::{Outcome, Pipeline};
use report::{HtmlRenderer, JsonRenderer, ReportRenderer};
use std::path::PathBuf;

/// Ranks the URLs of the latest nginx access log by their share of total request time
#[derive(Parser, Debug)]
#[command(
    name = "url_latency_report",
    author,
    version,
    about = "Builds a per-URL latency report from the most recent rotated nginx access log"
)]
struct Args {
    /// TOML config file; keys it omits keep their defaults
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the rotated access logs
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long = "report-dir", value_name = "DIR")]
    report_dir: Option<PathBuf>,

    /// Maximum number of URLs in the report
    #[arg(short = 'n', long = "report-size", value_name = "N")]
    report_size: Option<usize>,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Number of URLs shown in the terminal summary
    #[arg(short = 't', long = "top", default_value_t = 10, value_name = "N")]
    top: usize,

    /// Skip the terminal summary
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Json,
}

impl Args {
    fn settings(&self) -> Result<Settings, AnalyzerError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(dir) = &self.log_dir {
            settings.log_dir = dir.clone();
        }
        if let Some(dir) = &self.report_dir {
            settings.report_dir = dir.clone();
        }
        if let Some(size) = self.report_size {
            settings.report_size = size;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn main() {
    let args = Args::parse();

    let settings = match args.settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(settings.logging_file.as_deref()) {
        eprintln!("error: could not open log file: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&args, settings) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, settings: Settings) -> Result<(), AnalyzerError> {
    let renderer: Box<dyn ReportRenderer> = match args.format {
        Format::Html => Box::new(HtmlRenderer::from_template_path(
            settings.report_template.as_deref(),
        )?),
        Format::Json => Box::new(JsonRenderer),
    };

    match Pipeline::new(settings).run(renderer.as_ref())? {
        Outcome::Written {
            path,
            records,
            totals,
        } => {
            if !args.quiet {
                report::print_summary(&records, &totals, args.top, &path);
            }
        }
        Outcome::AlreadyExists(path) => {
            println!("Report '{}' already exists, skipping", path.display());
        }
        Outcome::NothingToReport => {
            println!("No data to report");
        }
    }

    log::info!("Done.");
    Ok(())
}
