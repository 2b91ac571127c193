//! Run the inner command a fixed number of times.

use std::fmt;
use std::num::NonZeroU32;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::command::Command;
use crate::core::context::ExecutionContext;
use crate::core::outcome::TestResult;

/// Re-invokes its inner command up to `count` times.
///
/// Unless `repeat_always` is set, the loop stops at the first attempt whose
/// outcome is not `Success`, and that attempt does not advance
/// `current_repeat_count`. Faults from the inner command are not caught: they
/// propagate to the caller and abort the rest of the loop.
pub struct RepeatCommand {
    inner: Box<Command>,
    count: NonZeroU32,
    repeat_always: bool,
}

impl RepeatCommand {
    pub fn new(inner: Command, count: NonZeroU32, repeat_always: bool) -> Self {
        Self {
            inner: Box::new(inner),
            count,
            repeat_always,
        }
    }

    pub fn inner(&self) -> &Command {
        &self.inner
    }

    #[instrument(skip_all, fields(test = %context.current_test.name, count = self.count.get(), repeat_always = self.repeat_always))]
    pub fn execute(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        let mut remaining = self.count.get();
        loop {
            remaining -= 1;
            let result = self.inner.execute(context)?;
            context.current_result = Some(result.clone());
            debug!(outcome = ?result.outcome, remaining, "repeat attempt finished");

            if !self.repeat_always && !result.outcome.is_success() {
                return Ok(result);
            }
            context.current_repeat_count += 1;

            if remaining == 0 {
                return Ok(result);
            }
        }
    }
}

impl fmt::Display for RepeatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repeat(count={}", self.count)?;
        if self.repeat_always {
            f.write_str(", repeat_always")?;
        }
        f.write_str(")")
    }
}
