#![allow(clippy::uninlined_format_args)]
#![allow(dead_code)]

use indexmap::IndexMap;
use regresql::database::{Connection, ResultSet, Value};
use regresql::RegresqlError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Path to the regresql binary, overridable for CI
pub fn regresql_binary() -> PathBuf {
    if let Ok(binary_path) = std::env::var("REGRESQL_TEST_BINARY") {
        return PathBuf::from(binary_path);
    }
    PathBuf::from(env!("CARGO_BIN_EXE_regresql"))
}

/// Runs the binary in `dir` with logging silenced.
pub fn run_regresql(dir: &Path, args: &[&str]) -> Output {
    Command::new(regresql_binary())
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("RUST_LOG", "off")
        .env_remove("REGRESQL_PGURI")
        .env_remove("REGRESQL_ROOT")
        .output()
        .expect("Failed to run regresql")
}

/// A scratch directory holding query files.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.path(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
    }
}

/// An in-memory database: each query is answered with the table named
/// after its `from`, filtered on the first column when an argument is
/// given.
#[derive(Debug, Default)]
pub struct TableConnection {
    pub tables: IndexMap<String, ResultSet>,
    pub calls: Vec<(String, Vec<String>)>,
}

impl TableConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.tables.insert(
            name.to_string(),
            ResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows),
        );
        self
    }

    pub fn table_mut(&mut self, name: &str) -> &mut ResultSet {
        self.tables
            .get_mut(name)
            .unwrap_or_else(|| panic!("no table {}", name))
    }
}

impl Connection for TableConnection {
    fn query(&mut self, sql: &str, args: &[String]) -> regresql::Result<ResultSet> {
        self.calls.push((sql.to_string(), args.to_vec()));

        let table = sql
            .split_whitespace()
            .skip_while(|word| !word.eq_ignore_ascii_case("from"))
            .nth(1)
            .unwrap_or_default();

        let result = self.tables.get(table).ok_or_else(|| RegresqlError::Execution {
            message: format!("relation \"{}\" does not exist", table),
        })?;

        let rows = match args.first() {
            Some(key) => result
                .rows
                .iter()
                .filter(|row| row.first().map(|v| v.to_string()).as_deref() == Some(key.as_str()))
                .cloned()
                .collect(),
            None => result.rows.clone(),
        };

        Ok(ResultSet::new(result.columns.clone(), rows))
    }

    fn uri(&self) -> &str {
        "memory://tables"
    }

    fn ping(&mut self) -> regresql::Result<()> {
        Ok(())
    }
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
