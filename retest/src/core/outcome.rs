//! Outcome classification and the per-attempt result record.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classification of a single execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// The test ran and reported a normal failure.
    Failure,
    /// The test terminated abnormally (a fault was recorded, or it timed out).
    Error,
    /// The test neither passed nor failed. Fresh results start here.
    Inconclusive,
    Skipped,
}

impl Outcome {
    /// True only for [`Outcome::Success`].
    ///
    /// Repeat stops on anything this rejects.
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// True only for [`Outcome::Failure`].
    ///
    /// Retry keeps going only while this holds. `Error` and `Inconclusive`
    /// are not failures here.
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failure)
    }
}

/// An abnormal termination that escaped a command and was recorded on a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Rendered error including its cause chain.
    pub message: String,
}

impl From<&anyhow::Error> for Fault {
    fn from(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", err),
        }
    }
}

/// The outcome of one attempt plus its diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Name of the test this result belongs to.
    pub test_name: String,
    pub outcome: Outcome,
    /// Recorded faults, oldest first. Append-only.
    pub faults: Vec<Fault>,
    /// Captured output of the attempt, if any.
    pub output: String,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl TestResult {
    /// An empty result: `Inconclusive`, no faults, no output.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            outcome: Outcome::Inconclusive,
            faults: Vec::new(),
            output: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Set the outcome for this attempt.
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Record a fault; the outcome becomes `Error`.
    pub fn record_fault(&mut self, err: &anyhow::Error) {
        self.faults.push(Fault::from(err));
        self.outcome = Outcome::Error;
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
