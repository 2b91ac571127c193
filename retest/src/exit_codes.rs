//! Stable exit codes for the retest CLI.

use crate::core::outcome::Outcome;

/// The test succeeded, or a non-run command completed.
pub const OK: i32 = 0;
/// Invalid config or usage, or a fault escaped the whole chain.
pub const INVALID: i32 = 1;
/// The final outcome was `Failure`.
pub const FAILURE: i32 = 2;
/// The final outcome was `Error`.
pub const ERROR: i32 = 3;
/// The final outcome was `Inconclusive` or `Skipped`.
pub const NOT_RUN: i32 = 4;

pub fn for_outcome(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Success => OK,
        Outcome::Failure => FAILURE,
        Outcome::Error => ERROR,
        Outcome::Inconclusive | Outcome::Skipped => NOT_RUN,
    }
}
