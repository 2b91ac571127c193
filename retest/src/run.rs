//! Run orchestration for `retest run` and `retest exec`.
//!
//! Builds one chain per test, executes it once against a fresh context and
//! collects the final result with the counters the CLI reports.

use std::cell::Cell;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::command::{Command, TestInvocation};
use crate::core::context::{ExecutionContext, TestDefinition};
use crate::core::outcome::TestResult;
use crate::core::policy::{Policy, apply_properties, build_chain};
use crate::io::config::RetestConfig;
use crate::io::invocation::ProcessInvocation;

/// Final state of one outer execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub test: TestDefinition,
    pub result: TestResult,
    /// `current_repeat_count` when the outer command returned.
    pub repeat_count: u32,
    /// How many times the base invocation ran.
    pub attempts: u32,
}

impl RunOutcome {
    pub fn summary_line(&self) -> String {
        let outcome = format!("{:?}", self.result.outcome).to_lowercase();
        format!(
            "{} {} attempts={} repeat_count={}",
            self.test.name, outcome, self.attempts, self.repeat_count
        )
    }
}

/// Counts base invocations on behalf of the harness.
struct Counted<I> {
    inner: I,
    attempts: Rc<Cell<u32>>,
}

impl<I: TestInvocation> TestInvocation for Counted<I> {
    fn invoke(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        self.attempts.set(self.attempts.get() + 1);
        self.inner.invoke(context)
    }
}

/// Execute `command` once against a fresh context for `test`.
///
/// Returns the final result and the context's repeat count. A fault that no
/// retry absorbed comes back as `Err`.
#[instrument(skip_all, fields(test = %test.name))]
pub fn execute_chain(test: &TestDefinition, command: &Command) -> Result<(TestResult, u32)> {
    let mut context = ExecutionContext::new(test);
    let result = command.execute(&mut context)?;
    info!(outcome = ?result.outcome, repeat_count = context.current_repeat_count, "test run finished");
    Ok((result, context.current_repeat_count))
}

/// Run `invocation` wrapped in `policies` as test `name`.
pub fn run_invocation<I: TestInvocation + 'static>(
    name: &str,
    invocation: I,
    policies: &[Policy],
) -> Result<RunOutcome> {
    let test = apply_properties(TestDefinition::new(name), policies);
    run_definition(test, invocation, policies)
}

/// Run `invocation` wrapped in `policies` as the already-labelled `test`.
fn run_definition<I: TestInvocation + 'static>(
    test: TestDefinition,
    invocation: I,
    policies: &[Policy],
) -> Result<RunOutcome> {
    let attempts = Rc::new(Cell::new(0));
    let command = build_chain(
        Command::test(Counted {
            inner: invocation,
            attempts: Rc::clone(&attempts),
        }),
        policies,
    );
    let (result, repeat_count) = execute_chain(&test, &command)?;
    Ok(RunOutcome {
        test,
        result,
        repeat_count,
        attempts: attempts.get(),
    })
}

/// Run the configured test `name`.
pub fn run_configured(cfg: &RetestConfig, name: &str) -> Result<RunOutcome> {
    let test = cfg.find(name)?;
    let invocation = test.invocation(cfg)?;
    run_definition(test.definition(), invocation, &test.policies)
}

/// Options for an ad-hoc run outside any config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    pub repeat: Option<NonZeroU32>,
    pub repeat_always: bool,
    pub retry: Option<NonZeroU32>,
    pub stop_on_success: bool,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl ExecOptions {
    /// Retry (if any) innermost, repeat (if any) around it.
    pub fn policies(&self) -> Vec<Policy> {
        let retry = self.retry.map(|try_count| Policy::Retry {
            try_count,
            stop_on_success: self.stop_on_success,
        });
        let repeat = self.repeat.map(|count| Policy::Repeat {
            count,
            repeat_always: self.repeat_always,
        });
        retry.into_iter().chain(repeat).collect()
    }
}

/// Run `argv` as an ad-hoc test named after its command line.
pub fn run_adhoc(argv: Vec<String>, options: &ExecOptions) -> Result<RunOutcome> {
    let name = argv.join(" ");
    let invocation = ProcessInvocation::new(argv, options.timeout, options.output_limit_bytes);
    run_invocation(&name, invocation, &options.policies())
}
