//! Runs the generated project's own test suite.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use superagent_core::{Architecture, Language};
use tracing::{debug, info};

use crate::error::StageError;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// pytest's exit code when no tests were collected.
const PYTEST_NO_TESTS: i32 = 5;

/// Counts parsed from a test run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    /// `pytest` or `npm test`; `None` when nothing ran.
    pub framework: Option<String>,
    pub passed: usize,
    pub failed: usize,
    /// No runnable tests were found.
    pub skipped: bool,
}

impl TestSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Shells out to the project's test framework.
pub struct TestRunner {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl TestRunner {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Run the suite if one exists. Failing tests are reported in the
    /// summary, not as an error; only a runner that cannot start or whose
    /// output has no counts is an error.
    pub async fn run(
        &self,
        project_dir: &Path,
        architecture: &Architecture,
    ) -> Result<TestSummary, StageError> {
        let names = file_names(project_dir).await?;
        let language = Language::of(&architecture.language);

        if language == Language::Python && names.iter().any(|n| is_python_test(n)) {
            let spec = CommandSpec::new("python", ["-m", "pytest", "-q"], project_dir, self.timeout);
            let output = self.runner.run(&spec).await?;
            if output.exit_code == PYTEST_NO_TESTS {
                return Ok(TestSummary::skipped());
            }
            return summarize("pytest", &spec, &output);
        }

        if language.is_node()
            && names.iter().any(|n| is_node_test(n))
            && has_test_script(project_dir).await
        {
            let spec = CommandSpec::new("npm", ["test", "--silent"], project_dir, self.timeout);
            let output = self.runner.run(&spec).await?;
            return summarize("npm test", &spec, &output);
        }

        debug!(language = language.as_str(), "no test suite found");
        Ok(TestSummary::skipped())
    }
}

fn summarize(
    framework: &str,
    spec: &CommandSpec,
    output: &CommandOutput,
) -> Result<TestSummary, StageError> {
    let (passed, failed) = parse_counts(&output.combined());
    if passed == 0 && failed == 0 && !output.success() {
        return Err(StageError::Failed(format!(
            "`{}` exited with code {}: {}",
            spec.display(),
            output.exit_code,
            output.error_tail(400)
        )));
    }
    info!(framework, passed, failed, "tests finished");
    Ok(TestSummary {
        framework: Some(framework.to_string()),
        passed,
        failed,
        skipped: false,
    })
}

struct CountPatterns {
    passed: Regex,
    failed: Regex,
}

fn patterns() -> &'static CountPatterns {
    static PATTERNS: OnceLock<CountPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| CountPatterns {
        passed: Regex::new(r"(\d+) passed").expect("passed pattern is valid"),
        failed: Regex::new(r"(\d+) failed").expect("failed pattern is valid"),
    })
}

/// Pass/fail counts from pytest or jest summary lines.
pub fn parse_counts(output: &str) -> (usize, usize) {
    let p = patterns();
    let last = |re: &Regex| {
        re.captures_iter(output)
            .last()
            .and_then(|c| c[1].parse::<usize>().ok())
            .unwrap_or(0)
    };
    (last(&p.passed), last(&p.failed))
}

async fn file_names(project_dir: &Path) -> Result<Vec<String>, StageError> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(project_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn is_python_test(name: &str) -> bool {
    name.ends_with(".py") && (name.starts_with("test_") || name.ends_with("_test.py"))
}

fn is_node_test(name: &str) -> bool {
    [".test.js", ".test.ts", ".spec.js", ".spec.ts"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

async fn has_test_script(project_dir: &Path) -> bool {
    let Ok(content) = tokio::fs::read_to_string(project_dir.join("package.json")).await else {
        return false;
    };
    serde_json::from_str::<serde_json::Value>(&content)
        .ok()
        .and_then(|v| v.pointer("/scripts/test").and_then(|t| t.as_str()).map(str::to_owned))
        .is_some_and(|script| !script.trim().is_empty())
}
