//! Base invocation that runs an external command as the test.

use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::command::TestInvocation;
use crate::core::context::ExecutionContext;
use crate::core::outcome::{Outcome, TestResult};
use crate::io::process::run_command_with_timeout;

/// Environment variable carrying the context's repeat count into the child.
pub const REPEAT_COUNT_ENV: &str = "RETEST_REPEAT_COUNT";

/// Recorded when the child process exceeded its time budget.
#[derive(Debug, Error)]
#[error("test command timed out after {timeout:?}")]
pub struct TimeoutFault {
    pub timeout: Duration,
}

/// Runs `argv` once per invocation and classifies the exit.
///
/// - output matching `inconclusive_pattern` -> `Inconclusive`
/// - exit 0 -> `Success`, any other exit -> `Failure`
/// - timeout -> `Error` with a [`TimeoutFault`] recorded
/// - spawn failure -> `Err` escaping to the enclosing command
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub argv: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    pub inconclusive_pattern: Option<Regex>,
    /// Report `Skipped` without spawning anything.
    pub skip: bool,
}

impl ProcessInvocation {
    pub fn new(argv: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            argv,
            workdir: None,
            timeout,
            output_limit_bytes,
            inconclusive_pattern: None,
            skip: false,
        }
    }

    fn classify(&self, output_text: &str, success: bool) -> Outcome {
        if self
            .inconclusive_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(output_text))
        {
            Outcome::Inconclusive
        } else if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl TestInvocation for ProcessInvocation {
    #[instrument(skip_all, fields(test = %context.current_test.name, repeat_count = context.current_repeat_count))]
    fn invoke(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        let mut result = context.current_test.make_result();
        if self.skip {
            debug!("test marked skip");
            return Ok(result.with_outcome(Outcome::Skipped));
        }

        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| anyhow!("test command is empty"))?;
        let mut cmd = ProcessCommand::new(program);
        cmd.args(args)
            .env(REPEAT_COUNT_ENV, context.current_repeat_count.to_string());
        if let Some(workdir) = &self.workdir {
            cmd.current_dir(workdir);
        }

        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run test command `{}`", program))?;

        result.output = output.combined_text();
        result.duration = output.elapsed;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "test command timed out");
            result.record_fault(&anyhow::Error::new(TimeoutFault {
                timeout: self.timeout,
            }));
            return Ok(result);
        }

        let outcome = self.classify(&result.output, output.status.success());
        debug!(exit_code = ?output.status.code(), ?outcome, "test command finished");
        Ok(result.with_outcome(outcome))
    }
}
