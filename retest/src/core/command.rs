//! The command chain: a base test invocation wrapped by decorators.

use anyhow::Result;

use crate::core::context::ExecutionContext;
use crate::core::outcome::TestResult;
use crate::core::repeat::RepeatCommand;
use crate::core::retry::RetryCommand;

/// The base "run this test once" unit.
///
/// Implementations should report test failures through the returned
/// [`TestResult`], but are allowed to fail with `Err`. Such a fault escapes to
/// the enclosing command and is only absorbed by a [`RetryCommand`].
pub trait TestInvocation {
    fn invoke(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult>;
}

impl<F> TestInvocation for F
where
    F: Fn(&mut ExecutionContext<'_>) -> Result<TestResult>,
{
    fn invoke(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        self(context)
    }
}

/// A unit of work in the chain.
///
/// Decorator variants own exactly one inner command, so chains nest to any
/// depth and no variant knows its position in the chain.
pub enum Command {
    Test(Box<dyn TestInvocation>),
    Repeat(RepeatCommand),
    Retry(RetryCommand),
}

impl Command {
    pub fn test(invocation: impl TestInvocation + 'static) -> Self {
        Command::Test(Box::new(invocation))
    }

    /// Wrap a closure as the base invocation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&mut ExecutionContext<'_>) -> Result<TestResult> + 'static,
    {
        Command::Test(Box::new(f))
    }

    /// Run the command, leaving its result as the context's current result.
    pub fn execute(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        match self {
            Command::Test(invocation) => {
                let result = invocation.invoke(context)?;
                Ok(context.store(result))
            }
            Command::Repeat(repeat) => repeat.execute(context),
            Command::Retry(retry) => retry.execute(context),
        }
    }

    /// Human-readable chain, outermost first (e.g. `retry(try_count=3) > test`).
    pub fn describe(&self) -> String {
        match self {
            Command::Test(_) => "test".to_string(),
            Command::Repeat(repeat) => format!("{} > {}", repeat, repeat.inner().describe()),
            Command::Retry(retry) => format!("{} > {}", retry, retry.inner().describe()),
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
