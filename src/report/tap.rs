use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::plan::Bindings;
use crate::report::diff::{DEFAULT_CONTEXT, diff_files};

/// Everything needed to explain a failing comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub query_file: String,
    pub bindings_file: String,
    pub bindings_name: String,
    pub query_parameters: Bindings,
    pub expected_result_file: String,
    pub actual_result_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestEvent {
    pub number: usize,
    pub name: String,
    pub passed: bool,
    pub diagnostic: Option<Diagnostic>,
}

/// One `(query, binding set)` comparison.
#[derive(Debug, Clone)]
pub struct Case<'a> {
    pub query_file: &'a Path,
    pub plan_file: &'a Path,
    pub name: &'a str,
    pub bindings: Option<&'a Bindings>,
    pub expected: PathBuf,
    pub actual: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub passed: usize,
    pub failed: usize,
}

impl ReportSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Streams comparison outcomes as TAP version 13.
///
/// Events are written as soon as they are recorded and never reordered; the
/// plan line `1..N` closes the stream in `finish`.
pub struct Reporter<W: Write> {
    out: W,
    out_root: PathBuf,
    context: usize,
    events: Vec<TestEvent>,
}

impl<W: Write> Reporter<W> {
    pub fn new(mut out: W, out_root: impl Into<PathBuf>) -> crate::Result<Self> {
        writeln!(out, "TAP version 13")?;

        Ok(Self {
            out,
            out_root: out_root.into(),
            context: DEFAULT_CONTEXT,
            events: Vec::new(),
        })
    }

    pub fn with_context(mut self, context: usize) -> Self {
        self.context = context;
        self
    }

    /// Diffs the actual output of `case` against its expected output and
    /// records the outcome. A comparison error fails the case; it is not
    /// returned to the caller.
    pub fn compare(&mut self, case: &Case<'_>) -> crate::Result<bool> {
        let name = self.test_name(&case.actual);

        let (passed, diagnostic) = match diff_files(&case.expected, &case.actual, self.context) {
            Ok(diff) if diff.is_empty() => (true, None),
            Ok(diff) => (false, Some(diagnose(case, Some(diff), None))),
            Err(e) => (
                false,
                Some(diagnose(
                    case,
                    None,
                    Some(format!("Failed to compare results: {}", e)),
                )),
            ),
        };

        self.record(name, passed, diagnostic)?;
        Ok(passed)
    }

    pub fn record(
        &mut self,
        name: String,
        passed: bool,
        diagnostic: Option<Diagnostic>,
    ) -> crate::Result<()> {
        let event = TestEvent {
            number: self.events.len() + 1,
            name,
            passed,
            diagnostic,
        };

        debug!("Test {} '{}' passed={}", event.number, event.name, event.passed);
        self.write_event(&event)?;
        self.events.push(event);
        Ok(())
    }

    /// A `#` line in the stream, ignored by TAP consumers.
    pub fn comment(&mut self, text: &str) -> crate::Result<()> {
        for line in text.lines() {
            writeln!(self.out, "# {}", line)?;
        }
        Ok(())
    }

    pub fn events(&self) -> &[TestEvent] {
        &self.events
    }

    pub fn finish(mut self) -> crate::Result<ReportSummary> {
        writeln!(self.out, "1..{}", self.events.len())?;
        self.out.flush()?;

        let passed = self.events.iter().filter(|e| e.passed).count();
        Ok(ReportSummary {
            passed,
            failed: self.events.len() - passed,
        })
    }

    fn test_name(&self, actual: &Path) -> String {
        actual
            .strip_prefix(&self.out_root)
            .unwrap_or(actual)
            .display()
            .to_string()
    }

    fn write_event(&mut self, event: &TestEvent) -> crate::Result<()> {
        let status = if event.passed { "ok" } else { "not ok" };
        writeln!(self.out, "{} {} - {}", status, event.number, event.name)?;

        if let Some(diagnostic) = &event.diagnostic {
            let yaml = serde_yaml::to_string(diagnostic).map_err(|e| {
                crate::RegresqlError::Serialization {
                    path: PathBuf::from(&event.name),
                    message: e.to_string(),
                }
            })?;

            writeln!(self.out, "  ---")?;
            for line in yaml.lines() {
                writeln!(self.out, "  {}", line)?;
            }
            writeln!(self.out, "  ...")?;
        }

        Ok(())
    }
}

fn diagnose(case: &Case<'_>, diff: Option<String>, error: Option<String>) -> Diagnostic {
    Diagnostic {
        query_file: case.query_file.display().to_string(),
        bindings_file: case.plan_file.display().to_string(),
        bindings_name: case.name.to_string(),
        query_parameters: case.bindings.cloned().unwrap_or_default(),
        expected_result_file: case.expected.display().to_string(),
        actual_result_file: case.actual.display().to_string(),
        diff,
        error,
    }
}
