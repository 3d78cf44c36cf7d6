#![forbid(unsafe_code)]

//! `acpihost` — test runner for ACPI interpreters over synthetic firmware
//! tables.
//!
//! Loads a DSDT (plus optional SSDTs) into a fabricated RSDP/XSDT chain,
//! drives the bundled interpreter through the standard boot sequence, and in
//! test mode evaluates `\MAIN` and validates the result against the expected
//! type/value pair.

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};

use acpihost_interp::mini::MiniInterpreter;
use acpihost_interp::{HostMemory, LogLevel};
use acpihost_runner::{
    resources, run, Expected, ExpectedType, RunMode, RunOptions, TableSource, TableSpace,
    DEFAULT_LOOP_TIMEOUT_SECS,
};

/// Keyword accepted in place of a DSDT path.
const RESOURCE_TESTS_KEYWORD: &str = "resource-tests";

#[derive(Debug, Parser)]
#[command(
    name = "acpihost",
    about = "ACPI interpreter test runner over synthetic firmware tables"
)]
struct Args {
    /// Path to the DSDT to run, or "resource-tests" to run the raw
    /// resource-template battery and exit.
    dsdt_path_or_keyword: String,

    /// Test mode: evaluate \MAIN and expect <TYPE> <VALUE> (`int` or `str`).
    #[arg(short = 'r', long, num_args = 2, value_names = ["TYPE", "VALUE"])]
    expect: Option<Vec<String>>,

    /// Extra SSDTs to load after the DSDT, in order.
    #[arg(short = 'x', long = "extra-tables", value_name = "PATH", num_args = 1..)]
    extra_tables: Vec<PathBuf>,

    /// Dump the entire namespace after loading it.
    #[arg(short = 'd', long)]
    enumerate_namespace: bool,

    /// Seconds to allow for interpreter-internal busy-wait loops.
    #[arg(
        short = 't',
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_LOOP_TIMEOUT_SECS
    )]
    while_loop_timeout: u32,

    /// Log level; defaults to `info` when dumping the namespace, `trace`
    /// otherwise.
    #[arg(short = 'l', long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevelArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Debug,
    Trace,
    Info,
    Warning,
    Error,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> LogLevel {
        match level {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Warning => LogLevel::Warning,
            LogLevelArg::Error => LogLevel::Error,
        }
    }
}

fn tracing_level(level: LogLevelArg) -> tracing::Level {
    match level {
        LogLevelArg::Debug => tracing::Level::DEBUG,
        LogLevelArg::Trace => tracing::Level::TRACE,
        LogLevelArg::Info => tracing::Level::INFO,
        LogLevelArg::Warning => tracing::Level::WARN,
        LogLevelArg::Error => tracing::Level::ERROR,
    }
}

fn parse_expected(tokens: &[String]) -> Result<Expected> {
    if tokens.len() != 2 {
        bail!("bad --expect format: need exactly <TYPE> <VALUE>");
    }
    let ty = ExpectedType::parse(&tokens[0])
        .ok_or_else(|| anyhow!("unsupported type for validation: {}", tokens[0]))?;
    Ok(Expected {
        ty,
        value: tokens[1].clone(),
    })
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // One failure exit code for everything, including bad arguments;
            // help and version are not failures.
            let success = matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            );
            let _ = err.print();
            return if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    match run_cli(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(args: Args) -> Result<()> {
    let expected = args
        .expect
        .as_deref()
        .map(parse_expected)
        .transpose()
        .context("invalid --expect arguments")?;

    // Don't spam the log with traces when enumeration is on.
    let log_level = args.log_level.unwrap_or(if args.enumerate_namespace {
        LogLevelArg::Info
    } else {
        LogLevelArg::Trace
    });
    tracing_subscriber::fmt()
        .with_max_level(tracing_level(log_level))
        .with_writer(std::io::stderr)
        .init();

    if args.dsdt_path_or_keyword == RESOURCE_TESTS_KEYWORD {
        resources::run_battery()?;
        return Ok(());
    }

    let opts = RunOptions {
        mode: match expected {
            Some(expected) => RunMode::Test { expected },
            None => RunMode::Emulate,
        },
        dump_namespace: args.enumerate_namespace,
        loop_timeout_secs: args.while_loop_timeout,
        log_level: log_level.into(),
    };

    let ssdts: Vec<TableSource> = args
        .extra_tables
        .iter()
        .map(|path| TableSource::Path(path.clone()))
        .collect();
    let space = Rc::new(TableSpace::build(
        TableSource::Path(PathBuf::from(&args.dsdt_path_or_keyword)),
        &ssdts,
    )?);

    let interp = MiniInterpreter::new(Rc::clone(&space) as Rc<dyn HostMemory>);
    run(interp, space, &opts)?;
    Ok(())
}
