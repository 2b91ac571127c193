//! Run a test command wrapped in repeat/retry policies.
//!
//! Tests and their policies are declared in `retest.toml`; `retest exec`
//! builds an ad-hoc pipeline from flags instead.

use std::num::{NonZeroU32, NonZeroU64};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use retest::exit_codes;
use retest::io::config::{DEFAULT_CONFIG_PATH, RetestConfig, load_config};
use retest::io::report::write_report;
use retest::logging;
use retest::run::{ExecOptions, RunOutcome, run_adhoc, run_configured};

#[derive(Parser)]
#[command(
    name = "retest",
    version,
    about = "Run tests wrapped in repeat and retry policies"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print configured tests with their policy chains (outermost first).
    List {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Load the config and check it (unique names, commands, patterns).
    Validate {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Run one configured test.
    Run {
        name: String,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Write a JSON report of the final result.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run a command directly; retry (if given) wraps it first, repeat outside.
    Exec {
        /// Run up to N times, stopping at the first non-success.
        #[arg(long)]
        repeat: Option<NonZeroU32>,
        /// Keep repeating after a non-success.
        #[arg(long, requires = "repeat")]
        repeat_always: bool,
        /// Try up to N times while the command fails.
        #[arg(long)]
        retry: Option<NonZeroU32>,
        /// Use every try even after a pass.
        #[arg(long, requires = "retry")]
        no_stop_on_success: bool,
        /// Per-attempt timeout (defaults to the config default).
        #[arg(long)]
        timeout_secs: Option<NonZeroU64>,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(last = true, required = true, num_args = 1..)]
        argv: Vec<String>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::List { config } => cmd_list(&config),
        Command::Validate { config } => {
            load_config(&config)?;
            Ok(exit_codes::OK)
        }
        Command::Run {
            name,
            config,
            report,
        } => {
            let cfg = load_config(&config)?;
            let outcome = run_configured(&cfg, &name)?;
            finish(&outcome, report.as_deref())
        }
        Command::Exec {
            repeat,
            repeat_always,
            retry,
            no_stop_on_success,
            timeout_secs,
            report,
            argv,
        } => {
            let defaults = RetestConfig::default();
            let options = ExecOptions {
                repeat,
                repeat_always,
                retry,
                stop_on_success: !no_stop_on_success,
                timeout: timeout_secs.map_or_else(
                    || defaults.timeout(),
                    |secs| Duration::from_secs(secs.get()),
                ),
                output_limit_bytes: defaults.output_limit_bytes,
            };
            let outcome = run_adhoc(argv, &options)?;
            finish(&outcome, report.as_deref())
        }
    }
}

fn cmd_list(config: &Path) -> Result<i32> {
    let cfg = load_config(config)?;
    for test in &cfg.tests {
        let command = test.build_command(&cfg)?;
        println!("{}\t{}", test.name, command.describe());
    }
    Ok(exit_codes::OK)
}

fn finish(outcome: &RunOutcome, report: Option<&Path>) -> Result<i32> {
    if let Some(path) = report {
        write_report(path, outcome)?;
    }
    println!("{}", outcome.summary_line());
    for fault in &outcome.result.faults {
        eprintln!("fault: {}", fault.message);
    }
    Ok(exit_codes::for_outcome(outcome.result.outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_defaults() {
        let cli = Cli::parse_from(["retest", "run", "net"]);
        match cli.command {
            Command::Run {
                name,
                config,
                report,
            } => {
                assert_eq!(name, "net");
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_PATH));
                assert!(report.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_exec_policies_and_argv() {
        let cli = Cli::parse_from([
            "retest",
            "exec",
            "--repeat",
            "3",
            "--repeat-always",
            "--retry",
            "2",
            "--",
            "cargo",
            "test",
            "-q",
        ]);
        match cli.command {
            Command::Exec {
                repeat,
                repeat_always,
                retry,
                no_stop_on_success,
                argv,
                ..
            } => {
                assert_eq!(repeat.map(NonZeroU32::get), Some(3));
                assert!(repeat_always);
                assert_eq!(retry.map(NonZeroU32::get), Some(2));
                assert!(!no_stop_on_success);
                assert_eq!(argv, vec!["cargo", "test", "-q"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn exec_rejects_zero_repeat() {
        let parsed = Cli::try_parse_from(["retest", "exec", "--repeat", "0", "--", "true"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn exec_rejects_zero_timeout() {
        let parsed =
            Cli::try_parse_from(["retest", "exec", "--timeout-secs", "0", "--", "true"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn repeat_always_requires_repeat() {
        let parsed = Cli::try_parse_from(["retest", "exec", "--repeat-always", "--", "true"]);
        assert!(parsed.is_err());
    }
}
