//! linegrid - label every line of a command's output
//!
//! Runs a command and prefixes each line of its stdout and stderr with a
//! colored label. Progress bars and spinners are resolved to their final
//! frame instead of being smeared across the log.
//!
//! # Quick Start
//!
//! ```text
//! linegrid -p build -- cargo build      # label lines with "build"
//! linegrid -p npm -t 500 -- npm install # also flush stalled partial lines
//! ```

use std::env;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use linegrid::config::{self, Config as FileConfig};
use linegrid::{spawn_streaming, FlushTimeout, ProcessError, SpawnOptions, StdioMode};

/// Command line configuration
#[derive(Debug, Default, PartialEq)]
struct Config {
    /// Line label
    prefix: Option<String>,
    /// Partial-line flush delay, overrides the config file
    flush_timeout_ms: Option<i64>,
    /// Gather output and print it once the command finishes
    collect: bool,
    command: Option<String>,
    args: Vec<String>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("linegrid {}", VERSION);
}

fn print_help() {
    eprintln!("linegrid {} - Label every line of a command's output", VERSION);
    eprintln!();
    eprintln!("Usage: linegrid [OPTIONS] [--] COMMAND [ARGS...]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --prefix <LABEL>  Label for every line (default: from config.toml)");
    eprintln!("  -t, --timeout <MS>    Flush a partial line after MS without output");
    eprintln!("                        (0 or negative: only on newline)");
    eprintln!("  -c, --collect         Print output after the command finishes");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.linegrid/config.toml");
    eprintln!("Log file:      ~/.linegrid/linegrid.log (level from RUST_LOG)");
}

enum Parsed {
    Run(Config),
    Help,
    Version,
}

fn parse_args<I>(args: I) -> Result<Parsed, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config = Config::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-v" | "--version" => return Ok(Parsed::Version),
            "-p" | "--prefix" => {
                let label = args.next().ok_or("Missing prefix argument")?;
                config.prefix = Some(label);
            }
            "-t" | "--timeout" => {
                let value = args.next().ok_or("Missing timeout argument")?;
                let ms = value
                    .parse::<i64>()
                    .map_err(|_| format!("Invalid timeout: {}", value))?;
                config.flush_timeout_ms = Some(ms);
            }
            "-c" | "--collect" => {
                config.collect = true;
            }
            "--" => {
                config.command = args.next();
                config.args = args.collect();
                break;
            }
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", flag));
            }
            _ => {
                config.command = Some(arg);
                config.args = args.collect();
                break;
            }
        }
    }

    if config.command.is_none() {
        return Err("Missing command".to_string());
    }
    Ok(Parsed::Run(config))
}

/// Log to `~/.linegrid/linegrid.log`; never to the forwarded streams
fn init_logging() {
    let log_path = config::config_dir()
        .map(|dir| dir.join("linegrid.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("linegrid.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = match parse_args(env::args().skip(1)) {
        Ok(Parsed::Run(cli)) => cli,
        Ok(Parsed::Help) => {
            print_help();
            return Ok(ExitCode::SUCCESS);
        }
        Ok(Parsed::Version) => {
            print_version();
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            return Ok(ExitCode::FAILURE);
        }
    };

    init_logging();
    info!("linegrid {} starting...", VERSION);

    run(&cli, &FileConfig::load())
}

/// Run the command to completion and mirror its exit code
fn run(cli: &Config, file_config: &FileConfig) -> anyhow::Result<ExitCode> {
    let options = merge_options(cli, file_config);
    let mut palette = file_config.palette();

    // parse_args guarantees a command
    let command = cli.command.as_deref().unwrap_or_default();

    let (output, code) = match spawn_streaming(command, &cli.args, &options, &mut palette) {
        Ok(output) => (output, ExitCode::SUCCESS),
        Err(ProcessError::NonZeroExit { code, output }) => {
            info!("{} exited with {:?}", command, code);
            (*output, ExitCode::from(exit_status_byte(code)))
        }
        Err(e) => {
            error!("{}", e);
            return Err(e).with_context(|| format!("Failed to run {}", command));
        }
    };

    if let Some(stdout) = output.stdout {
        print!("{}", stdout);
    }
    if let Some(stderr) = output.stderr {
        eprint!("{}", stderr);
    }
    Ok(code)
}

/// Command line flags override the config file
fn merge_options(cli: &Config, file: &FileConfig) -> SpawnOptions {
    let flush_timeout = match cli.flush_timeout_ms {
        Some(ms) => FlushTimeout::from_millis(ms),
        None => file.flush_timeout(),
    };
    let stdio = if cli.collect {
        StdioMode::Collect
    } else {
        file.stdio
    };

    SpawnOptions {
        prefix: cli.prefix.clone().or_else(|| file.prefix.clone()),
        stdio,
        flush_timeout,
        ..SpawnOptions::default()
    }
}

/// Child exit code as our own; signals and out-of-range codes become 1
fn exit_status_byte(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}
