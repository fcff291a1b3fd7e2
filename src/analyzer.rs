use crate::error::{AnalyzerError, Result};
use crate::parser::ParsedLine;
use serde::Serialize;
use std::collections::HashMap;

/// Request-time samples collected for one URL, in log order
#[derive(Debug, Clone, PartialEq)]
pub struct UrlStats {
    pub url: String,
    pub samples: Vec<f64>,
}

impl UrlStats {
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn sum(&self) -> f64 {
        self.samples.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(f64::MIN, f64::max)
    }

    pub fn median(&self) -> f64 {
        median(&self.samples)
    }
}

/// Whole-scan counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunTotals {
    pub total_lines: u64,
    pub total_errors: u64,
    pub total_time: f64,
}

impl RunTotals {
    pub fn error_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.total_errors as f64 / self.total_lines as f64
        }
    }
}

/// Accumulates per-URL samples while the log is being read.
///
/// Every distinct URL keeps all of its samples until the scan ends, so memory
/// grows linearly with the number of distinct URLs times their hit count.
#[derive(Debug, Default)]
pub struct Aggregator {
    index: HashMap<String, usize>,
    stats: Vec<UrlStats>,
    totals: RunTotals,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, line: &ParsedLine<'_>) {
        self.totals.total_lines += 1;

        let ParsedLine::Parsed(req) = line else {
            self.totals.total_errors += 1;
            return;
        };

        self.totals.total_time += req.request_time;
        match self.index.get(req.url) {
            Some(&slot) => self.stats[slot].samples.push(req.request_time),
            None => {
                self.index.insert(req.url.to_string(), self.stats.len());
                self.stats.push(UrlStats {
                    url: req.url.to_string(),
                    samples: vec![req.request_time],
                });
            }
        }
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            stats: self.stats,
            totals: self.totals,
        }
    }
}

/// Final state of a scan: URL statistics in first-seen order plus totals
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub stats: Vec<UrlStats>,
    pub totals: RunTotals,
}

impl Aggregation {
    /// Fail when the share of unparsed lines reaches `limit`.
    pub fn check_error_rate(&self, limit: f64) -> Result<()> {
        if self.totals.total_lines > 0 && self.totals.error_rate() >= limit {
            return Err(AnalyzerError::ErrorRateExceeded {
                errors: self.totals.total_errors,
                lines: self.totals.total_lines,
                limit,
            });
        }
        Ok(())
    }
}

/// One row of the final report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub url: String,
    pub count: usize,
    pub count_perc: f64,
    pub time_sum: f64,
    pub time_max: f64,
    pub time_perc: f64,
    pub time_avg: f64,
    pub time_med: f64,
}

/// Round to 3 decimal places, ties to even.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Median of `samples`; the mean of the two central values for even lengths.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Rank URLs by their share of total request time and keep the first `limit`.
///
/// Ties keep first-seen order. Returns an empty list when no request time was
/// recorded at all.
pub fn build_report(aggregation: &Aggregation, limit: usize) -> Vec<ReportRecord> {
    let totals = &aggregation.totals;
    if totals.total_lines == 0 || totals.total_time <= 0.0 {
        return Vec::new();
    }

    let lines = totals.total_lines as f64;
    let mut records: Vec<ReportRecord> = aggregation
        .stats
        .iter()
        .map(|stats| {
            let count = stats.count();
            let time_sum = stats.sum();
            ReportRecord {
                url: stats.url.clone(),
                count,
                count_perc: round3(100.0 * count as f64 / lines),
                time_sum: round3(time_sum),
                time_max: round3(stats.max()),
                time_perc: round3(100.0 * time_sum / totals.total_time),
                time_avg: round3(time_sum / count as f64),
                time_med: round3(stats.median()),
            }
        })
        .collect();

    // stable: equal shares stay in first-seen order
    records.sort_by(|a, b| b.time_perc.total_cmp(&a.time_perc));
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Request;

    fn hit(url: &str, request_time: f64) -> ParsedLine<'_> {
        ParsedLine::Parsed(Request { url, request_time })
    }

    fn aggregate(lines: &[ParsedLine<'_>]) -> Aggregation {
        let mut agg = Aggregator::new();
        for line in lines {
            agg.observe(line);
        }
        agg.finish()
    }

    #[test]
    fn counts_lines_errors_and_time() {
        let agg = aggregate(&[
            hit("/a", 1.5),
            ParsedLine::Unmatched,
            hit("/b", 0.5),
            hit("/a", 2.0),
        ]);
        assert_eq!(agg.totals.total_lines, 4);
        assert_eq!(agg.totals.total_errors, 1);
        assert_eq!(agg.totals.total_time, 4.0);
        assert_eq!(agg.stats.len(), 2);
        assert_eq!(agg.stats[0].url, "/a");
        assert_eq!(agg.stats[0].samples, vec![1.5, 2.0]);
        assert_eq!(agg.stats[1].url, "/b");
    }

    #[test]
    fn unmatched_lines_create_no_url_entry() {
        let agg = aggregate(&[ParsedLine::Unmatched, ParsedLine::Unmatched]);
        assert!(agg.stats.is_empty());
        assert_eq!(agg.totals.total_time, 0.0);
        assert_eq!(agg.totals.total_errors, 2);
    }

    #[test]
    fn median_of_odd_and_even_samples() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[7.0]), 7.0);
    }

    #[test]
    fn rounds_to_three_decimals() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(2.0), 2.0);
        assert_eq!(round3(0.0004), 0.0);
    }

    #[test]
    fn error_gate_trips_at_twenty_percent() {
        let mut lines = vec![hit("/ok", 0.1); 80];
        lines.extend(vec![ParsedLine::Unmatched; 20]);
        let err = aggregate(&lines).check_error_rate(0.2).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::ErrorRateExceeded { errors: 20, lines: 100, .. }
        ));
    }

    #[test]
    fn error_gate_passes_just_below_twenty_percent() {
        let mut agg = Aggregator::new();
        for _ in 0..80_001 {
            agg.observe(&hit("/ok", 0.1));
        }
        for _ in 0..19_999 {
            agg.observe(&ParsedLine::Unmatched);
        }
        let agg = agg.finish();
        assert_eq!(agg.totals.total_lines, 100_000);
        assert!(agg.check_error_rate(0.2).is_ok());
    }

    #[test]
    fn error_gate_ignores_empty_scan() {
        let agg = Aggregator::new().finish();
        assert!(agg.check_error_rate(0.2).is_ok());
        assert_eq!(agg.totals, RunTotals::default());
    }

    #[test]
    fn ranks_by_time_share() {
        let agg = aggregate(&[hit("/a", 10.0), hit("/b", 90.0)]);
        let report = build_report(&agg, 1000);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].url, "/b");
        assert_eq!(report[0].time_perc, 90.0);
        assert_eq!(report[1].url, "/a");
        assert_eq!(report[1].time_perc, 10.0);
        assert_eq!(report[0].count_perc, 50.0);
    }

    #[test]
    fn truncates_to_limit() {
        let lines: Vec<String> = (0..10).map(|i| format!("/u{i}")).collect();
        let parsed: Vec<ParsedLine<'_>> = lines
            .iter()
            .enumerate()
            .map(|(i, url)| hit(url, i as f64 + 1.0))
            .collect();
        let report = build_report(&aggregate(&parsed), 3);
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].url, "/u9");
        assert_eq!(report[2].url, "/u7");
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let agg = aggregate(&[hit("/z", 1.0), hit("/a", 1.0), hit("/m", 1.0)]);
        let urls: Vec<_> = build_report(&agg, 10).into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["/z", "/a", "/m"]);
    }

    #[test]
    fn computes_all_fields_rounded() {
        let agg = aggregate(&[hit("/x", 1.0), hit("/x", 1.23456), hit("/x", 1.46911)]);
        let record = &build_report(&agg, 10)[0];
        assert_eq!(record.count, 3);
        assert_eq!(record.count_perc, 100.0);
        assert_eq!(record.time_sum, 3.704);
        assert_eq!(record.time_max, 1.469);
        assert_eq!(record.time_perc, 100.0);
        assert_eq!(record.time_avg, 1.235);
        assert_eq!(record.time_med, 1.235);
    }

    #[test]
    fn zero_total_time_gives_empty_report() {
        let agg = aggregate(&[hit("/a", 0.0), hit("/b", 0.0)]);
        assert!(build_report(&agg, 10).is_empty());
        assert!(build_report(&Aggregation::default(), 10).is_empty());
    }

    #[test]
    fn build_report_leaves_input_untouched() {
        let agg = aggregate(&[hit("/a", 3.0), hit("/a", 1.0), hit("/a", 2.0)]);
        let _ = build_report(&agg, 10);
        assert_eq!(agg.stats[0].samples, vec![3.0, 1.0, 2.0]);
    }
}
