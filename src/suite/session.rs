use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::RegresqlError;
use crate::database::{Connection, QueryExecutor};
use crate::plan::get_plan;
use crate::query::parse_query_file;
use crate::report::{Case, ReportSummary, Reporter};
use crate::suite::layout::ensure_dir;
use crate::suite::walk::{Folder, Suite};

/// A query file that could not be processed.
#[derive(Debug)]
pub struct FileError {
    pub path: PathBuf,
    pub error: RegresqlError,
}

/// Outcome of a traversal over the whole suite.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Query files visited
    pub files: usize,
    /// Result files written
    pub written: Vec<PathBuf>,
    pub errors: Vec<FileError>,
    pub tests: ReportSummary,
}

impl RunSummary {
    pub(crate) fn fail(&mut self, path: PathBuf, error: RegresqlError) {
        error!("{}: {}", path.display(), error);
        self.errors.push(FileError { path, error });
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty() && self.tests.success()
    }

    /// The first file error decides the status; failed tests alone exit 1.
    pub fn exit_code(&self) -> u8 {
        match self.errors.first() {
            Some(e) => e.error.exit_code(),
            None if !self.tests.success() => 1,
            None => 0,
        }
    }
}

/// A suite bound to an open connection.
///
/// The connection lives exactly as long as the session.
pub struct Session<C: Connection> {
    suite: Suite,
    executor: QueryExecutor<C>,
}

impl<C: Connection> Session<C> {
    /// Validates `connection` with the pre-flight query before anything runs.
    pub fn open(suite: Suite, connection: C) -> crate::Result<Self> {
        let mut executor = QueryExecutor::new(connection);

        if let Err(e) = executor.ping() {
            let uri = executor.connection_mut().uri().to_string();
            return Err(match e {
                e @ RegresqlError::Connection { .. } => e,
                other => RegresqlError::Connection {
                    uri,
                    message: other.to_string(),
                },
            });
        }

        Ok(Self { suite, executor })
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn connection_mut(&mut self) -> &mut C {
        self.executor.connection_mut()
    }

    /// Runs every plan and stores the results as the new expected output.
    pub fn update_expected(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let folders = self.suite.folders.clone();
        let expected_dir = self.suite.layout.expected_dir();

        for folder in &folders {
            let target = folder.under(&expected_dir);

            for name in &folder.files {
                summary.files += 1;
                let path = folder.under(&self.suite.layout.root).join(name);

                match self.write_results(folder, &path, &target) {
                    Ok(written) => summary.written.extend(written),
                    Err(e) => summary.fail(path, e),
                }
            }
        }

        info!(
            "Wrote {} expected result file(s) for {} query file(s)",
            summary.written.len(),
            summary.files
        );
        summary
    }

    /// Runs every plan into `out/` and reports each result file against its
    /// expected twin as TAP on `writer`.
    pub fn run_tests<W: Write>(&mut self, writer: W) -> crate::Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut reporter = Reporter::new(writer, self.suite.layout.out_dir())?;
        let folders = self.suite.folders.clone();
        let out_dir = self.suite.layout.out_dir();
        let expected_dir = self.suite.layout.expected_dir();

        for folder in &folders {
            let target = folder.under(&out_dir);
            let expected = folder.under(&expected_dir);

            for name in &folder.files {
                summary.files += 1;
                let path = folder.under(&self.suite.layout.root).join(name);

                match self.test_file(&mut reporter, folder, &path, &target, &expected) {
                    Ok(written) => summary.written.extend(written),
                    Err(e) => {
                        reporter.comment(&format!("{}: {}", path.display(), e))?;
                        summary.fail(path, e);
                    }
                }
            }
        }

        summary.tests = reporter.finish()?;
        Ok(summary)
    }

    fn write_results(
        &mut self,
        folder: &Folder,
        path: &Path,
        target: &Path,
    ) -> crate::Result<Vec<PathBuf>> {
        let query = parse_query_file(path)?;
        let plan = get_plan(&query, &folder.under(&self.suite.layout.plans_dir()))?;
        let results = self.executor.execute(&plan)?;

        ensure_dir(target)?;

        let mut written = Vec::with_capacity(results.len());
        for (i, result) in results.iter().enumerate() {
            let file = target.join(plan.output_file_name(i));
            result.write(&file, true)?;
            info!("Wrote '{}'", file.display());
            written.push(file);
        }

        Ok(written)
    }

    fn test_file<W: Write>(
        &mut self,
        reporter: &mut Reporter<W>,
        folder: &Folder,
        path: &Path,
        target: &Path,
        expected: &Path,
    ) -> crate::Result<Vec<PathBuf>> {
        let query = parse_query_file(path)?;
        let plan = get_plan(&query, &folder.under(&self.suite.layout.plans_dir()))?;
        let results = self.executor.execute(&plan)?;

        ensure_dir(target)?;

        let mut written = Vec::with_capacity(results.len());
        for (i, result) in results.iter().enumerate() {
            let file_name = plan.output_file_name(i);
            let actual = target.join(&file_name);
            result.write(&actual, true)?;

            reporter.compare(&Case {
                query_file: &query.path,
                plan_file: &plan.path,
                name: plan.names.get(i).map(String::as_str).unwrap_or(""),
                bindings: plan.bindings.get(i),
                expected: expected.join(&file_name),
                actual: actual.clone(),
            })?;
            written.push(actual);
        }

        Ok(written)
    }
}
