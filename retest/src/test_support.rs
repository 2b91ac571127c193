//! Test-only helpers: scripted base invocations with call counting.

use std::cell::{Cell, RefCell};
use std::num::NonZeroU32;
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::core::command::{Command, TestInvocation};
use crate::core::context::ExecutionContext;
use crate::core::outcome::{Outcome, TestResult};

/// One scripted response of a [`ScriptedInvocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    /// Return a normal result with this outcome.
    Outcome(Outcome),
    /// Fail with an escaping fault carrying this message.
    Fault(&'static str),
}

/// Base invocation that replays a script, repeating the last entry once the
/// script runs out.
///
/// Every produced result has output `attempt <n>` (1-based call number).
/// Clones share the script position and call counter, so a test can keep one
/// handle while the chain owns another.
#[derive(Debug, Clone)]
pub struct ScriptedInvocation {
    script: Rc<RefCell<Vec<Scripted>>>,
    calls: Rc<Cell<u32>>,
}

impl ScriptedInvocation {
    pub fn new(script: Vec<Scripted>) -> Self {
        assert!(!script.is_empty(), "script must not be empty");
        Self {
            script: Rc::new(RefCell::new(script)),
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn always(outcome: Outcome) -> Self {
        Self::new(vec![Scripted::Outcome(outcome)])
    }

    /// A base command backed by this script.
    pub fn command(&self) -> Command {
        Command::test(self.clone())
    }

    /// Number of times the invocation has run.
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl TestInvocation for ScriptedInvocation {
    fn invoke(&self, context: &mut ExecutionContext<'_>) -> Result<TestResult> {
        let call = self.calls.get() + 1;
        self.calls.set(call);

        let script = self.script.borrow();
        let index = usize::try_from(call - 1).unwrap_or(usize::MAX);
        let step = script.get(index).or(script.last()).copied();
        match step {
            Some(Scripted::Outcome(outcome)) => {
                let mut result = context.current_test.make_result().with_outcome(outcome);
                result.output = format!("attempt {call}");
                Ok(result)
            }
            Some(Scripted::Fault(message)) => Err(anyhow!("{message} (attempt {call})")),
            None => Err(anyhow!("empty script")),
        }
    }
}

/// Shorthand for a non-zero count in tests.
pub fn count(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("count must be non-zero")
}
