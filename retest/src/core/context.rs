//! Test definition and the per-run execution context.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::outcome::TestResult;

/// The test being run. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TestDefinition {
    pub name: String,
    /// Labels attached at setup time (policies may contribute some).
    pub properties: BTreeMap<String, String>,
}

impl TestDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// A brand-new empty result for this test.
    pub fn make_result(&self) -> TestResult {
        TestResult::new(self.name.clone())
    }
}

/// Mutable state shared by every command in one chain during one run.
///
/// Created by the harness per run: `current_result` unset, counter at zero.
/// After the outermost command returns `Ok(result)`, `current_result` holds
/// that same result.
#[derive(Debug)]
pub struct ExecutionContext<'t> {
    pub current_result: Option<TestResult>,
    /// Repeats or retries performed so far; see the decorators for when it moves.
    pub current_repeat_count: u32,
    pub current_test: &'t TestDefinition,
}

impl<'t> ExecutionContext<'t> {
    pub fn new(current_test: &'t TestDefinition) -> Self {
        Self {
            current_result: None,
            current_repeat_count: 0,
            current_test,
        }
    }

    /// Replace the current result with a fresh one and return it.
    pub fn reset_result(&mut self) -> &mut TestResult {
        self.current_result.insert(self.current_test.make_result())
    }

    /// Store `result` as current and hand back a copy for the caller.
    pub(crate) fn store(&mut self, result: TestResult) -> TestResult {
        self.current_result.insert(result).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::Outcome;

    #[test]
    fn new_context_is_unset() {
        let test = TestDefinition::new("t");
        let ctx = ExecutionContext::new(&test);
        assert!(ctx.current_result.is_none());
        assert_eq!(ctx.current_repeat_count, 0);
        assert_eq!(ctx.current_test.name, "t");
    }

    #[test]
    fn reset_result_replaces_rather_than_merges() {
        let test = TestDefinition::new("t");
        let mut ctx = ExecutionContext::new(&test);
        let mut stale = test.make_result().with_outcome(Outcome::Failure);
        stale.output = "stale".to_string();
        ctx.current_result = Some(stale);

        ctx.reset_result();

        let current = ctx.current_result.as_ref().expect("result");
        assert_eq!(current.outcome, Outcome::Inconclusive);
        assert!(current.output.is_empty());
        assert_eq!(current.test_name, "t");
    }
}
