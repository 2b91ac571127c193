//! Re-run the inner command while it keeps failing.

use std::fmt;
use std::num::NonZeroU32;

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::core::command::Command;
use crate::core::context::ExecutionContext;
use crate::core::outcome::TestResult;

/// Re-invokes its inner command up to `try_count` times.
///
/// With `stop_on_success`, any outcome other than `Failure` ends the loop.
/// This is the fault boundary of a chain: an `Err` escaping the inner command
/// is recorded on the current result (a fresh one if none is set yet) and
/// never propagated. Before each further attempt the current result is
/// replaced by a fresh one and `current_repeat_count` advances.
pub struct RetryCommand {
    inner: Box<Command>,
    try_count: NonZeroU32,
    stop_on_success: bool,
}

impl RetryCommand {
    pub fn new(inner: Command, try_count: NonZeroU32, stop_on_success: bool) -> Self {
        Self {
            inner: Box::new(inner),
            try_count,
            stop_on_success,
        }
    }

    pub fn inner(&self) -> &Command {
        &self.inner
    }

    #[instrument(skip_all, fields(test = %context.current_test.name, try_count = self.try_count.get(), stop_on_success = self.stop_on_success))]
    pub fn execute(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        let mut remaining = self.try_count.get();
        loop {
            remaining -= 1;
            let current = match self.inner.execute(context) {
                Ok(result) => result,
                Err(err) => {
                    warn!(err = %format!("{:#}", err), "inner command faulted, recording");
                    let mut current = context
                        .current_result
                        .take()
                        .unwrap_or_else(|| context.current_test.make_result());
                    current.record_fault(&err);
                    current
                }
            };
            debug!(outcome = ?current.outcome, remaining, "retry attempt finished");

            if (self.stop_on_success && !current.outcome.is_failure()) || remaining == 0 {
                context.current_result = Some(current.clone());
                return Ok(current);
            }

            context.reset_result();
            context.current_repeat_count += 1;
        }
    }
}

impl fmt::Display for RetryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retry(try_count={}", self.try_count)?;
        if !self.stop_on_success {
            f.write_str(", no_stop_on_success")?;
        }
        f.write_str(")")
    }
}
