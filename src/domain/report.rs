//! CI test report entities

/// One executed test case.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    /// Failure message, `None` when the test passed
    pub error_details: Option<String>,
    /// Duration in seconds
    pub duration: f64,
}

/// Test results of one CI job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobReport {
    /// Job was aborted; its cases are not meaningful
    pub aborted: bool,
    pub cases: Vec<TestCase>,
}

impl JobReport {
    pub fn aborted() -> Self {
        Self {
            aborted: true,
            cases: Vec::new(),
        }
    }
}
