pub mod config;
pub mod database;
pub mod plan;
pub mod query;
pub mod report;
pub mod suite;

// Make test_utils available for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::config::{Cli, RegressConfig};
pub use database::{Connection, PgConnection, ResultSet, Value};
pub use plan::{Bindings, Plan, PlanError};
pub use query::{Query, parse_query_file, parse_query_string};
pub use report::{Reporter, diff_files};
pub use suite::{Layout, RunSummary, Session, Suite};

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum RegresqlError {
    #[error("Failed to parse query file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Failed to connect to '{uri}': {message}")]
    Connection { uri: String, message: String },

    #[error("Failed to execute query: {message}")]
    Execution { message: String },

    #[error("Failed to write '{}': {message}", path.display())]
    Serialization { path: PathBuf, message: String },

    #[error("Failed to read lines from '{}': {source}", path.display())]
    Comparison {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegresqlError {
    /// Process exit status for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            RegresqlError::Io(_) => 2,
            RegresqlError::Parse { .. } => 3,
            RegresqlError::Plan(_) => 4,
            RegresqlError::Connection { .. } => 5,
            RegresqlError::Execution { .. } => 6,
            RegresqlError::Serialization { .. } => 7,
            RegresqlError::Comparison { .. } => 8,
            RegresqlError::Config(_) => 9,
        }
    }
}

impl From<postgres::Error> for RegresqlError {
    fn from(err: postgres::Error) -> Self {
        RegresqlError::Execution {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegresqlError>;
