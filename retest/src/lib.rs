//! Composable test-execution pipeline.
//!
//! A base test invocation is wrapped by execution policies (repeat a test a
//! fixed number of times, retry it while it fails) without the test knowing
//! about them. The crate is split into:
//!
//! - **[`core`]**: Pure pipeline logic (results, context, command chain,
//!   decorators, policies). No I/O.
//! - **[`io`]**: Config files, child processes and reports.
//!
//! [`run`] ties the two together for the CLI.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
