use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::RegresqlError;

#[derive(Debug, Clone, Parser)]
#[command(name = "regresql")]
#[command(author, version, about = "Regression testing for SQL queries", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'C',
        long,
        global = true,
        default_value = ".",
        value_name = "DIR",
        help = "Run as if started in DIR"
    )]
    pub cwd: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Set log level: debug, info, warn, error"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the regresql directory, its configuration and empty plans
    Init {
        #[arg(help = "PostgreSQL connection string")]
        pguri: String,
    },
    /// Create an empty plan for every query that has none
    Plan,
    /// Run every query and store the results as expected
    Update,
    /// Run every query and compare against the expected results
    Test,
    /// List the query files of the suite
    List,
}

impl Cli {
    /// Logs go to stderr; stdout carries the TAP stream.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        let log_level = if self.verbose {
            "debug"
        } else {
            &self.log_level
        };

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(self.verbose)
            .with_line_number(self.verbose)
            .init();

        Ok(())
    }

    pub fn check_cwd(&self) -> crate::Result<()> {
        check_dir(&self.cwd)
    }
}

pub fn check_dir(dir: &Path) -> crate::Result<()> {
    let metadata = std::fs::metadata(dir).map_err(|e| {
        RegresqlError::Config(format!("Directory '{}' is not accessible: {}", dir.display(), e))
    })?;

    if !metadata.is_dir() {
        return Err(RegresqlError::Config(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    Ok(())
}

/// Contents of `regresql/regress.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressConfig {
    /// Suite root, relative to the directory holding `regresql/`
    #[serde(default = "default_root")]
    pub root: PathBuf,
    pub pguri: String,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl RegressConfig {
    pub fn new(pguri: impl Into<String>) -> Self {
        Self {
            root: default_root(),
            pguri: pguri.into(),
        }
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        info!("Creating configuration file '{}'", path.display());

        let content = serde_yaml::to_string(self)
            .map_err(|e| RegresqlError::Config(format!("Failed to render config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            RegresqlError::Config(format!("Failed to write config '{}': {}", path.display(), e))
        })
    }

    /// Reads `path`; `REGRESQL_PGURI` and `REGRESQL_ROOT` override the file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        Self::load_with_env(path, None)
    }

    /// `env` replaces the process environment as the override source.
    pub fn load_with_env(
        path: &Path,
        env: Option<config::Map<String, String>>,
    ) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            )
            .add_source(config::Environment::with_prefix("REGRESQL").source(env))
            .build()
            .map_err(|e| {
                RegresqlError::Config(format!("Failed to read config '{}': {}", path.display(), e))
            })?;

        settings.try_deserialize().map_err(|e| {
            RegresqlError::Config(format!("Failed to parse config '{}': {}", path.display(), e))
        })
    }

    /// The suite root as seen from `cwd`.
    pub fn resolve_root(&self, cwd: &Path) -> PathBuf {
        if self.root == Path::new(".") {
            cwd.to_path_buf()
        } else {
            cwd.join(&self.root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["regresql", "init", "postgres:///chinook"]).unwrap();
        assert_eq!(cli.cwd, PathBuf::from("."));
        match cli.command {
            Command::Init { pguri } => assert_eq!(pguri, "postgres:///chinook"),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["regresql", "test", "-C", "/srv/app", "-v"]).unwrap();
        assert!(matches!(cli.command, Command::Test));
        assert_eq!(cli.cwd, PathBuf::from("/srv/app"));
        assert!(cli.verbose);

        assert!(Cli::try_parse_from(["regresql", "init"]).is_err());
        assert!(Cli::try_parse_from(["regresql"]).is_err());
    }

    #[test]
    fn test_check_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_dir(dir.path()).is_ok());

        let missing = check_dir(&dir.path().join("nope")).unwrap_err();
        assert_eq!(missing.exit_code(), 9);

        let file = dir.path().join("file.sql");
        std::fs::write(&file, "select 1").unwrap();
        assert!(matches!(check_dir(&file), Err(RegresqlError::Config(_))));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regress.yaml");

        let config = RegressConfig::new("postgres://localhost/chinook");
        config.save(&path).unwrap();

        let loaded = RegressConfig::load_with_env(&path, Some(config::Map::new())).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.resolve_root(dir.path()), dir.path());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regress.yaml");
        std::fs::write(&path, "root: .\npguri: postgres:///from-file\n").unwrap();

        let mut env = config::Map::new();
        env.insert("REGRESQL_PGURI".to_string(), "postgres:///from-env".to_string());
        env.insert("REGRESQL_ROOT".to_string(), "queries".to_string());

        let loaded = RegressConfig::load_with_env(&path, Some(env)).unwrap();
        assert_eq!(loaded.pguri, "postgres:///from-env");
        assert_eq!(loaded.resolve_root(dir.path()), dir.path().join("queries"));
    }

    #[test]
    fn test_missing_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegressConfig::load(&dir.path().join("regress.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
        assert_eq!(err.exit_code(), 9);
    }
}
