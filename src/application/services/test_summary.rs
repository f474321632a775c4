//! CI test report aggregation across a range of jobs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::ops::RangeInclusive;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use crate::application::ApplicationResult;
use crate::domain::JobReport;
use crate::infrastructure::traits::ReportSource;

/// Aggregated results of one test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestStats {
    pub runs: usize,
    pub durations: Vec<f64>,
    /// Error message -> jobs that failed with it
    pub errors: BTreeMap<String, Vec<u32>>,
}

impl TestStats {
    pub fn fails(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn mean(&self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        self.durations.iter().sum::<f64>() / self.durations.len() as f64
    }

    /// Population standard deviation of the durations.
    pub fn std_dev(&self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .durations
            .iter()
            .map(|d| (d - mean).powi(2))
            .sum::<f64>()
            / self.durations.len() as f64;
        variance.sqrt()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSummary {
    pub tests: BTreeMap<String, TestStats>,
    /// Jobs left out (aborted or listed invalid)
    pub skipped: Vec<u32>,
}

impl TestSummary {
    pub fn add(&mut self, job: u32, report: &JobReport) {
        for case in &report.cases {
            let stats = self.tests.entry(case.name.clone()).or_default();
            stats.runs += 1;
            stats.durations.push(case.duration);
            if let Some(error) = &case.error_details {
                stats.errors.entry(error.clone()).or_default().push(job);
            }
        }
    }

    /// Tab-separated summary table, a blank line, then the error table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut total = 0;
        let mut fails = 0;

        out.push_str("Test\tTotal\tFails\tMean\tStdDev\n");
        for (name, stats) in &self.tests {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{:.3}\t{:.3}",
                name,
                stats.runs,
                stats.fails(),
                stats.mean(),
                stats.std_dev()
            );
            total += stats.runs;
            fails += stats.fails();
        }
        let _ = writeln!(out, "TTL\t{}\t{}", total, fails);

        out.push('\n');
        out.push_str("Test\tError\tCount\tTest IDs\n");
        for (name, stats) in &self.tests {
            for (error, jobs) in &stats.errors {
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    name,
                    error,
                    jobs.len(),
                    jobs.iter().join(",")
                );
            }
        }
        out
    }
}

pub struct TestSummarizer {
    source: Arc<dyn ReportSource>,
}

impl TestSummarizer {
    pub fn new(source: Arc<dyn ReportSource>) -> Self {
        Self { source }
    }

    /// Fetch and aggregate every job in `jobs`, skipping aborted and `invalid` ones.
    ///
    /// Any fetch failure aborts the whole summary.
    pub fn collect(&self, jobs: RangeInclusive<u32>, invalid: &[u32]) -> ApplicationResult<TestSummary> {
        let invalid: BTreeSet<u32> = invalid.iter().copied().collect();
        let mut summary = TestSummary::default();

        for job in jobs {
            if invalid.contains(&job) {
                debug!("job {} marked invalid, skipping", job);
                summary.skipped.push(job);
                continue;
            }
            let report = self.source.fetch(job)?;
            if report.aborted {
                debug!("job {} aborted, skipping", job);
                summary.skipped.push(job);
                continue;
            }
            summary.add(job, &report);
        }

        info!(
            "summarized {} tests, skipped {} jobs",
            summary.tests.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}
