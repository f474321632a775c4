//! HTTP clients for CI reports and identifier lookups

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use super::traits::{FetchError, IdLookup, LookupError, ReportSource};
use crate::domain::{JobReport, TestCase};

fn build_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

// ============================================================
// Jenkins test reports
// ============================================================

/// Minimal Jenkins JSON structures.
#[derive(Deserialize)]
struct BuildInfo {
    result: Option<String>,
}

impl BuildInfo {
    fn aborted(&self) -> bool {
        self.result.as_deref() == Some("ABORTED")
    }
}

#[derive(Deserialize)]
struct TestReportJson {
    #[serde(default)]
    suites: Vec<SuiteJson>,
}

#[derive(Deserialize)]
struct SuiteJson {
    #[serde(default)]
    cases: Vec<CaseJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseJson {
    name: String,
    error_details: Option<String>,
    #[serde(default)]
    duration: f64,
}

impl TestReportJson {
    /// Flatten all suites; an empty error text counts as passed.
    fn into_job_report(self) -> JobReport {
        let cases = self
            .suites
            .into_iter()
            .flat_map(|s| s.cases)
            .map(|c| TestCase {
                name: c.name,
                error_details: c.error_details.filter(|e| !e.is_empty()),
                duration: c.duration,
            })
            .collect();
        JobReport {
            aborted: false,
            cases,
        }
    }
}

/// Reads job reports from a Jenkins server's JSON API.
pub struct JenkinsReportSource {
    client: Client,
    job_url: String,
}

impl JenkinsReportSource {
    pub fn new(base_url: &str, suite: &str, timeout: Duration) -> Result<Self, String> {
        Ok(Self {
            client: build_client(timeout)?,
            job_url: format!("{}/job/{}", base_url.trim_end_matches('/'), suite),
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, job: u32, url: &str) -> Result<T, FetchError> {
        debug!("GET {}", url);
        let err = |e: reqwest::Error| FetchError {
            job,
            message: e.to_string(),
        };
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(err)?
            .json::<T>()
            .map_err(err)
    }
}

impl ReportSource for JenkinsReportSource {
    fn fetch(&self, job: u32) -> Result<JobReport, FetchError> {
        let build: BuildInfo = self.get_json(job, &format!("{}/{}/api/json", self.job_url, job))?;
        if build.aborted() {
            return Ok(JobReport::aborted());
        }

        let report: TestReportJson =
            self.get_json(job, &format!("{}/{}/testReport/api/json", self.job_url, job))?;
        Ok(report.into_job_report())
    }
}

// ============================================================
// Identifier lookup
// ============================================================

/// Looks identifiers up by appending them to a fixed URL prefix.
pub struct HttpIdLookup {
    client: Client,
    url_prefix: String,
}

impl HttpIdLookup {
    pub fn new(url_prefix: &str, timeout: Duration) -> Result<Self, String> {
        Ok(Self {
            client: build_client(timeout)?,
            url_prefix: url_prefix.to_string(),
        })
    }
}

/// HTTP error statuses are final; everything else on the wire is worth retrying.
fn classify(e: reqwest::Error) -> LookupError {
    if e.is_status() || e.is_builder() || e.is_decode() {
        LookupError::Permanent(e.to_string())
    } else {
        LookupError::Transient(e.to_string())
    }
}

impl IdLookup for HttpIdLookup {
    fn lookup(&self, id: &str) -> Result<String, LookupError> {
        let url = format!("{}{}", self.url_prefix, id);
        debug!("GET {}", url);
        self.client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_REPORT: &str = r#"{
        "duration": 812.4,
        "failCount": 1,
        "suites": [
            {
                "name": "us.kbase.jgiintegration.test.JGIIntegrationTest",
                "cases": [
                    {"name": "pushSingleFile", "duration": 41.5, "errorDetails": null, "status": "PASSED"},
                    {"name": "pushAssembly", "duration": 12.0, "errorDetails": "timed out", "status": "FAILED"}
                ]
            },
            {
                "name": "us.kbase.jgiintegration.test.ImportTest",
                "cases": [
                    {"name": "importReads", "duration": 3.25, "errorDetails": ""}
                ]
            }
        ]
    }"#;

    #[test]
    fn given_jenkins_test_report_when_converted_then_cases_flattened_in_order() {
        let report: TestReportJson = serde_json::from_str(TEST_REPORT).unwrap();

        let job = report.into_job_report();

        assert!(!job.aborted);
        assert_eq!(
            job.cases,
            vec![
                TestCase {
                    name: "pushSingleFile".into(),
                    error_details: None,
                    duration: 41.5,
                },
                TestCase {
                    name: "pushAssembly".into(),
                    error_details: Some("timed out".into()),
                    duration: 12.0,
                },
                TestCase {
                    name: "importReads".into(),
                    error_details: None,
                    duration: 3.25,
                },
            ]
        );
    }

    #[test]
    fn given_build_results_when_checked_then_only_aborted_skipped() {
        let aborted: BuildInfo = serde_json::from_str(r#"{"result": "ABORTED", "number": 41}"#).unwrap();
        let failed: BuildInfo = serde_json::from_str(r#"{"result": "UNSTABLE"}"#).unwrap();
        let running: BuildInfo = serde_json::from_str(r#"{"result": null}"#).unwrap();

        assert!(aborted.aborted());
        assert!(!failed.aborted());
        assert!(!running.aborted());
    }

    #[test]
    fn given_report_without_suites_when_converted_then_no_cases() {
        let report: TestReportJson = serde_json::from_str("{}").unwrap();
        assert!(report.into_job_report().cases.is_empty());
    }
}
