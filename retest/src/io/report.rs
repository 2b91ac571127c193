//! JSON report of a single test run.

use std::path::Path;

use anyhow::{Context, Result};

use crate::run::RunOutcome;

/// Serialize `outcome` to pretty-printed JSON with trailing newline.
pub fn write_report(path: &Path, outcome: &RunOutcome) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(outcome).context("serialize report json")?;
    payload.push('\n');
    crate::io::write_atomic(path, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::TestDefinition;
    use crate::core::outcome::{Outcome, TestResult};
    use serde_json::Value;

    #[test]
    fn writes_report_with_counters() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reports/run.json");
        let outcome = RunOutcome {
            test: TestDefinition::new("net").with_property("Repeat", "2"),
            result: TestResult::new("net").with_outcome(Outcome::Failure),
            repeat_count: 1,
            attempts: 2,
        };

        write_report(&path, &outcome).expect("write");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.ends_with("}\n"));
        let value: Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["test"]["name"], "net");
        assert_eq!(value["test"]["properties"]["Repeat"], "2");
        assert_eq!(value["result"]["outcome"], "failure");
        assert_eq!(value["repeat_count"], 1);
        assert_eq!(value["attempts"], 2);
    }
}
