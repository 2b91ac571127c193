//! Test configuration stored in `retest.toml`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::command::Command;
use crate::core::context::TestDefinition;
use crate::core::policy::{Policy, apply_properties, build_chain};
use crate::io::invocation::ProcessInvocation;

pub const DEFAULT_CONFIG_PATH: &str = "retest.toml";

/// Top-level configuration (TOML).
///
/// Edited by humans. Missing fields fall back to defaults; a missing file
/// means no tests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetestConfig {
    /// Per-invocation wall-clock budget in seconds.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of each output stream per attempt.
    pub output_limit_bytes: usize,

    pub tests: Vec<TestConfig>,
}

/// One named test and the policies wrapped around it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestConfig {
    pub name: String,
    /// Program and arguments (e.g. `["cargo","test","net"]`).
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// Regex over captured output; a match makes the attempt `Inconclusive`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inconclusive_pattern: Option<String>,
    #[serde(default)]
    pub skip: bool,
    /// Applied in order, first listed innermost.
    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl Default for RetestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
            tests: Vec::new(),
        }
    }
}

impl RetestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        let mut seen = BTreeSet::new();
        for test in &self.tests {
            if test.name.trim().is_empty() {
                return Err(anyhow!("test name must be non-empty"));
            }
            if !seen.insert(test.name.as_str()) {
                return Err(anyhow!("duplicate test name {:?}", test.name));
            }
            if test.command.is_empty() || test.command[0].trim().is_empty() {
                return Err(anyhow!(
                    "test {:?}: command must be a non-empty array",
                    test.name
                ));
            }
            if let Some(pattern) = &test.inconclusive_pattern {
                Regex::new(pattern)
                    .with_context(|| format!("test {:?}: inconclusive_pattern", test.name))?;
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<&TestConfig> {
        self.tests
            .iter()
            .find(|test| test.name == name)
            .ok_or_else(|| anyhow!("no test named {:?} in config", name))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TestConfig {
    /// The test definition, labelled with the properties its policies contribute.
    pub fn definition(&self) -> TestDefinition {
        apply_properties(TestDefinition::new(self.name.clone()), &self.policies)
    }

    /// The process-backed base invocation for this test.
    pub fn invocation(&self, cfg: &RetestConfig) -> Result<ProcessInvocation> {
        let mut invocation =
            ProcessInvocation::new(self.command.clone(), cfg.timeout(), cfg.output_limit_bytes);
        invocation.workdir = self.workdir.clone();
        invocation.skip = self.skip;
        invocation.inconclusive_pattern = self
            .inconclusive_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("test {:?}: inconclusive_pattern", self.name))?;
        Ok(invocation)
    }

    /// Build the command chain for this test.
    pub fn build_command(&self, cfg: &RetestConfig) -> Result<Command> {
        Ok(build_chain(
            Command::test(self.invocation(cfg)?),
            &self.policies,
        ))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RetestConfig::default()`.
pub fn load_config(path: &Path) -> Result<RetestConfig> {
    if !path.exists() {
        let cfg = RetestConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RetestConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RetestConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    crate::io::write_atomic(path, &buf)
}
