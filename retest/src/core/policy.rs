//! Declarative execution policies that wrap a command in a decorator.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::core::command::Command;
use crate::core::context::TestDefinition;
use crate::core::repeat::RepeatCommand;
use crate::core::retry::RetryCommand;

/// Property a `Repeat` policy records on the test it applies to.
pub const REPEAT_PROPERTY: &str = "Repeat";

/// Repeat or retry configuration, as declared in `retest.toml`.
///
/// ```toml
/// policies = [
///   { kind = "retry", try_count = 3 },
///   { kind = "repeat", count = 2, repeat_always = true },
/// ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Run the test `count` times, stopping at the first non-success unless
    /// `repeat_always` is set.
    Repeat {
        count: NonZeroU32,
        #[serde(default)]
        repeat_always: bool,
    },
    /// Run the test up to `try_count` times while it fails.
    Retry {
        try_count: NonZeroU32,
        #[serde(default = "default_stop_on_success")]
        stop_on_success: bool,
    },
}

fn default_stop_on_success() -> bool {
    true
}

impl Policy {
    pub fn repeat(count: NonZeroU32) -> Self {
        Policy::Repeat {
            count,
            repeat_always: false,
        }
    }

    pub fn retry(try_count: NonZeroU32) -> Self {
        Policy::Retry {
            try_count,
            stop_on_success: default_stop_on_success(),
        }
    }

    /// Build the decorator for this policy around `inner`.
    pub fn wrap(self, inner: Command) -> Command {
        match self {
            Policy::Repeat {
                count,
                repeat_always,
            } => Command::Repeat(RepeatCommand::new(inner, count, repeat_always)),
            Policy::Retry {
                try_count,
                stop_on_success,
            } => Command::Retry(RetryCommand::new(inner, try_count, stop_on_success)),
        }
    }

    /// Test property this policy contributes at setup time, if any.
    pub fn property(&self) -> Option<(&'static str, String)> {
        match self {
            Policy::Repeat { count, .. } => Some((REPEAT_PROPERTY, count.to_string())),
            Policy::Retry { .. } => None,
        }
    }
}

/// Wrap `base` with each policy in order. The first policy is innermost.
pub fn build_chain(base: Command, policies: &[Policy]) -> Command {
    policies
        .iter()
        .fold(base, |inner, policy| policy.wrap(inner))
}

/// Attach the properties contributed by `policies` to `test`.
pub fn apply_properties(mut test: TestDefinition, policies: &[Policy]) -> TestDefinition {
    for (key, value) in policies.iter().filter_map(Policy::property) {
        test.properties.insert(key.to_string(), value);
    }
    test
}
