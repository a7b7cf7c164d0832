use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

use regresql::config::Command;
use regresql::suite::REGRESS_DIR;
use regresql::{Cli, Layout, PgConnection, RegressConfig, RunSummary, Session, Suite};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = cli.init_logging() {
        eprintln!("regresql: failed to initialize logging: {:#}", e);
        return ExitCode::from(2);
    }

    info!("Starting regresql v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<regresql::RegresqlError>())
        .map(regresql::RegresqlError::exit_code)
        .unwrap_or(2)
}

fn run(cli: &Cli) -> anyhow::Result<u8> {
    cli.check_cwd()?;
    let cwd = cli.cwd.as_path();

    match &cli.command {
        Command::Init { pguri } => init(cwd, pguri),
        Command::Plan => {
            let suite = load_suite(cwd)?;
            Ok(report(suite.create_plans()))
        }
        Command::Update => {
            let mut session = open_session(cwd)?;
            let summary = session.update_expected();

            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "Writing expected Result Sets:")?;
            for path in &summary.written {
                writeln!(stdout, "  {}", path.display())?;
            }

            Ok(report(summary))
        }
        Command::Test => {
            let mut session = open_session(cwd)?;
            let summary = session
                .run_tests(std::io::stdout().lock())
                .context("Failed to write the test report")?;
            Ok(report(summary))
        }
        Command::List => {
            let suite = load_suite(cwd)?;
            print!("{}", suite);
            Ok(0)
        }
    }
}

fn init(cwd: &Path, pguri: &str) -> anyhow::Result<u8> {
    let layout = Layout::new(cwd);
    layout.create_regress_dir()?;

    let config = RegressConfig::new(pguri);
    config.save(&layout.config_file())?;
    println!("Created configuration file '{}'", layout.config_file().display());

    let suite = Suite::walk_with(layout)?;
    let session = Session::open(suite, PgConnection::connect(pguri)?)?;
    println!("Connected to '{}'", pguri);

    let summary = session.suite().create_plans();
    println!(
        "Empty test plans have been created in '{}'.\n\
         Edit the plans to add query binding values, then run\n\n  \
         regresql update\n\n\
         to create the expected regression files for your test plan",
        session.suite().layout.plans_dir().display()
    );

    Ok(report(summary))
}

/// The suite described by `regresql/regress.yaml` under `cwd`.
fn load_config(cwd: &Path) -> anyhow::Result<(Suite, RegressConfig)> {
    let regress_dir = cwd.join(REGRESS_DIR);
    let config = RegressConfig::load(&Layout::new(cwd).config_file())?;

    let layout = Layout::new(config.resolve_root(cwd)).with_regress_dir(regress_dir);
    let suite = Suite::walk_with(layout)?;

    Ok((suite, config))
}

fn load_suite(cwd: &Path) -> anyhow::Result<Suite> {
    // plans can be created before the suite is configured
    if Layout::new(cwd).config_file().exists() {
        return Ok(load_config(cwd)?.0);
    }
    Ok(Suite::walk(cwd)?)
}

fn open_session(cwd: &Path) -> anyhow::Result<Session<PgConnection>> {
    let (suite, config) = load_config(cwd)?;
    let connection = PgConnection::connect(&config.pguri)?;
    Ok(Session::open(suite, connection)?)
}

fn report(summary: RunSummary) -> u8 {
    if !summary.errors.is_empty() {
        error!(
            "{} of {} query file(s) failed",
            summary.errors.len(),
            summary.files
        );
    }

    summary.exit_code()
}
