//! The command pipeline: results, context, commands and decorators.
//!
//! Everything here is free of I/O. A base invocation is plugged in through
//! [`command::TestInvocation`]; the process-backed one lives in `io`.

pub mod command;
pub mod context;
pub mod outcome;
pub mod policy;
pub mod repeat;
pub mod retry;
