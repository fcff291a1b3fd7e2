use crate::analyzer::{ReportRecord, RunTotals};
use crate::error::{AnalyzerError, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR: &str =
    "════════════════════════════════════════════════════════════════════";
const THIN_SEP: &str =
    "────────────────────────────────────────────────────────────────────";

/// Placeholder in the HTML template replaced by the JSON record list
pub const TABLE_PLACEHOLDER: &str = "$table_json";

const DEFAULT_TEMPLATE: &str = include_str!("../templates/report.html");

/// Turns ranked records into a report file
pub trait ReportRenderer {
    /// File extension used when naming reports produced by this renderer
    fn extension(&self) -> &str;

    fn render(&self, records: &[ReportRecord], destination: &Path) -> Result<()>;
}

/// Renders into an HTML template containing [`TABLE_PLACEHOLDER`]
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    template: String,
}

impl HtmlRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load the template from `path`, or use the built-in one.
    pub fn from_template_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let template = fs::read_to_string(path).map_err(|source| {
                    AnalyzerError::Template {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                if !template.contains(TABLE_PLACEHOLDER) {
                    log::warn!(
                        "Template '{}' has no {} placeholder; report will carry no data",
                        path.display(),
                        TABLE_PLACEHOLDER
                    );
                }
                Ok(Self::new(template))
            }
            None => Ok(Self::default()),
        }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl ReportRenderer for HtmlRenderer {
    fn extension(&self) -> &str {
        "html"
    }

    fn render(&self, records: &[ReportRecord], destination: &Path) -> Result<()> {
        let table = escape_for_script(&serde_json::to_string(records)?);
        let page = self.template.replace(TABLE_PLACEHOLDER, &table);
        write_atomically(destination, page.as_bytes())
    }
}

/// Make JSON safe to embed in a `<script>` block.
///
/// `<`, `>` and `&` only occur inside JSON strings, where the `\uXXXX` forms
/// decode to the same text.
fn escape_for_script(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            c => out.push(c),
        }
    }
    out
}

/// Writes the record list as pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, records: &[ReportRecord], destination: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        write_atomically(destination, json.as_bytes())
    }
}

/// Write to a sibling temp file and rename it into place, so a failure never
/// leaves a half-written report under the final name.
fn write_atomically(destination: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_path(destination);
    let write_err = |source| AnalyzerError::ReportWrite {
        path: destination.to_path_buf(),
        source,
    };

    if let Err(source) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    fs::rename(&tmp, destination).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        write_err(source)
    })
}

fn temp_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    destination.with_file_name(name)
}

/// Print the top `top` records of a freshly written report to stdout
pub fn print_summary(records: &[ReportRecord], totals: &RunTotals, top: usize, report: &Path) {
    println!("\n{}", SEPARATOR.cyan().bold());
    println!("{}", "  URL LATENCY REPORT".white().bold());
    println!("{}", SEPARATOR.cyan().bold());
    println!("  Report : {}", report.display().to_string().yellow());
    println!();

    section_header("OVERVIEW");
    println!(
        "  {:<28} {}",
        "Lines scanned:",
        format!("{:>10}", totals.total_lines).green().bold()
    );
    let errors = format!("{:>10}", totals.total_errors);
    println!(
        "  {:<28} {}",
        "Unparsed lines:",
        if totals.total_errors > 0 {
            errors.yellow().bold()
        } else {
            errors.normal()
        }
    );
    println!("  {:<28} {:>10.3}", "Total request time (s):", totals.total_time);
    println!("  {:<28} {:>10}", "URLs in report:", records.len());
    println!();

    section_header(&format!("TOP {} URLS BY SHARE OF REQUEST TIME", top));
    if records.is_empty() {
        println!("  (no data)");
    } else {
        println!(
            "  {:<3}  {:<36}  {:>7}  {:>10}  {:>8}  {:>8}",
            "#", "URL", "Count", "Time sum", "Avg", "Share"
        );
        println!("  {}", "─".repeat(84));
        for (i, record) in records.iter().take(top).enumerate() {
            println!("{}", summary_row(i + 1, record));
        }
    }

    println!("\n{}\n", SEPARATOR.cyan());
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// One ranked row; text is padded before it is colored so ANSI codes never
/// count towards column width.
fn summary_row(rank: usize, record: &ReportRecord) -> String {
    let url = if record.url.chars().count() > 36 {
        let head: String = record.url.chars().take(35).collect();
        format!("{}…", head)
    } else {
        record.url.clone()
    };
    format!(
        "  {}  {}  {:>7}  {:>10.3}  {:>8.3}  {:>7.2}%  {}",
        format!("{:<3}", rank).dimmed(),
        format!("{:<36}", url).cyan(),
        record.count,
        record.time_sum,
        record.time_avg,
        record.time_perc,
        mini_bar(record.time_perc, 20)
    )
}

fn section_header(title: &str) {
    println!("  {} {}", "▶".cyan(), title.white().bold());
    println!("  {}", THIN_SEP);
}

/// Renders a compact bar of the given width
fn mini_bar(pct: f64, width: usize) -> String {
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    let empty = width - filled;
    format!(
        "{}{}",
        "█".repeat(filled).green(),
        "░".repeat(empty).dimmed()
    )
}
