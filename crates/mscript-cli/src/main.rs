use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod console;
mod debug;
mod repl_helper;
mod runtime;

use runtime::Settings;

/// mscript - embeddable scripting language
#[derive(Parser)]
#[command(name = "mscript")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile, inspect and run mscript programs")]
struct Cli {
    /// VM limits as a JSON file (max_calc_stack, max_task_stack, ...)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Wall clock limit in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    max_time: Option<u64>,

    /// Extra global variables as a JSON object
    #[arg(long, value_name = "FILE", global = true)]
    globals: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the token stream of a file
    Parse { file: Option<String> },
    /// Compile a file and print its disassembly
    Showcode { file: Option<String> },
    /// Compile and execute a file (30 s time limit unless set)
    Run { file: Option<String> },
    /// Execute a file one step at a time, dumping the VM state
    Debug { file: Option<String> },
    /// Interactive console; `!` clears the bindings, `@` lists them
    Console,
}

const ACTIONS: [&str; 5] = ["parse", "showcode", "run", "debug", "console"];

const DEFAULT_RUN_SECONDS: u64 = 30;

/// Why a command stopped; each maps to its own exit code
#[derive(Debug)]
enum CliError {
    MissingFile,
    Unreadable(String, std::io::Error),
    Failed(anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::MissingFile => 3,
            CliError::Unreadable(..) => 4,
            CliError::Failed(_) => 100,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::MissingFile => write!(f, "Need argument <file>"),
            CliError::Unreadable(name, err) => write!(f, "Can't open file: {} ({})", name, err),
            CliError::Failed(err) => write!(f, "Operation failed:\n{:#}", err),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Failed(err)
    }
}

fn main() -> ExitCode {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return argument_failure(err),
    };

    let Some(command) = cli.command else {
        eprintln!("Need argument action:");
        eprintln!("{}", ACTIONS.join(", "));
        return ExitCode::from(1);
    };

    let result = dispatch(command, &cli.config, cli.max_time, &cli.globals);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn dispatch(
    command: Commands,
    config: &Option<PathBuf>,
    max_time: Option<u64>,
    globals: &Option<PathBuf>,
) -> Result<(), CliError> {
    let settings = |default_time: Option<u64>| -> Result<Settings, CliError> {
        Ok(Settings::load(
            config.as_deref(),
            max_time.or(default_time),
            globals.as_deref(),
        )?)
    };

    match command {
        Commands::Parse { file } => {
            let (_, source) = read_source(file)?;
            parse_command(&source)
        }
        Commands::Showcode { file } => {
            let (name, source) = read_source(file)?;
            showcode_command(&name, &source, &settings(None)?)
        }
        Commands::Run { file } => {
            let (name, source) = read_source(file)?;
            run_command(&name, &source, &settings(Some(DEFAULT_RUN_SECONDS))?)
        }
        Commands::Debug { file } => {
            let (name, source) = read_source(file)?;
            Ok(debug::run(&name, &source, &settings(None)?)?)
        }
        Commands::Console => Ok(console::run(&settings(None)?)?),
    }
}

/// Logs go to stderr, filtered by `MSCRIPT_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_env("MSCRIPT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for a command line clap rejected
fn argument_failure(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        ErrorKind::InvalidSubcommand => {
            eprintln!("Unknown action");
            if let Some(ContextValue::String(given)) = err.get(ContextKind::InvalidSubcommand) {
                if let Some(close) = closest_action(given) {
                    eprintln!("Did you mean '{}'?", close);
                }
            }
            eprintln!("{}", ACTIONS.join(", "));
            ExitCode::from(2)
        }
        _ => {
            let _ = err.print();
            ExitCode::from(2)
        }
    }
}

fn closest_action(given: &str) -> Option<&'static str> {
    ACTIONS
        .iter()
        .map(|a| (*a, strsim::levenshtein(a, given)))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(_, d)| *d)
        .map(|(a, _)| a)
}

fn read_source(file: Option<String>) -> Result<(String, String), CliError> {
    let name = file.ok_or(CliError::MissingFile)?;
    match fs::read_to_string(&name) {
        Ok(source) => Ok((name, source)),
        Err(err) => Err(CliError::Unreadable(name, err)),
    }
}

fn parse_command(source: &str) -> Result<(), CliError> {
    let elements = mscript_parser::parse_script(source).map_err(runtime::script_error)?;
    let mut out = String::from("Elements");
    let mut sep = ':';
    for element in &elements {
        out.push(sep);
        out.push(' ');
        out.push_str(&element.to_string());
        sep = ',';
    }
    println!("{}", out);
    Ok(())
}

fn showcode_command(name: &str, source: &str, settings: &Settings) -> Result<(), CliError> {
    let block = settings.compile(name, source)?;
    let block = mscript_vm::block::get_block(&block)
        .ok_or_else(|| anyhow::anyhow!("compiler did not produce a block"))?;
    print!("{}", mscript_vm::format_listing(&block));
    Ok(())
}

fn run_command(name: &str, source: &str, settings: &Settings) -> Result<(), CliError> {
    let block = settings.compile(name, source)?;
    let mut vm = settings.machine();
    match vm.exec_block(&block) {
        Ok(value) => {
            println!();
            println!();
            println!("Result: {}", value.stringify());
            Ok(())
        }
        Err(err) => Err(runtime::exception_error(&vm, &err).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_action() {
        assert_eq!(closest_action("rnu"), Some("run"));
        assert_eq!(closest_action("showcod"), Some("showcode"));
        assert_eq!(closest_action("xyzzy"), None);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::MissingFile.exit_code(), 3);
        let failed = CliError::Failed(anyhow::anyhow!("boom"));
        assert!(failed.to_string().starts_with("Operation failed:"));
    }

    #[test]
    fn test_cli_accepts_every_action() {
        for action in ACTIONS {
            let args: Vec<&str> = if action == "console" {
                vec!["mscript", action]
            } else {
                vec!["mscript", action, "file.ms"]
            };
            assert!(Cli::try_parse_from(args).is_ok(), "{}", action);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = Cli::try_parse_from(["mscript", "frobnicate"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }
}
