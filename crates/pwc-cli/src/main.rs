//! pwclean - scrub configured secrets from byte streams.
//!
//! The main entry point, handling:
//! - Cleaning stdin or a file into stdout or a file
//! - Listing the configured secret set
//! - Checking configuration resolution and validity

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use pwc_clean::Cleaner;
use pwc_cli::exit_codes::ExitCode;
use pwc_cli::logging::{
    clean_message, event_names, generate_run_id, init_logging, set_log_cleaner, LogConfig,
    LogFormat, LogLevel,
};
use pwc_cli::report::{CleanReport, SecretListing};
use pwc_cli::{parse_secret_arg, SecretArg};
use pwc_config::{load_config, ConfigError, ConfigOptions, PatternEncoding, ResolvedConfig};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// pwclean - remove passwords and other secrets from streams
#[derive(Parser)]
#[command(name = "pwclean")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to pwclean.json (overrides PWCLEAN_CONFIG and the search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a stream, replacing every configured secret
    Clean(CleanArgs),

    /// List the configured secrets as JSON lines
    List(ListArgs),

    /// Resolve and validate configuration
    Check,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Input file (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Additional secret as PATTERN[=SUBSTITUTE]; visible in process listings
    #[arg(short = 's', long = "secret", value_parser = parse_secret_arg)]
    secrets: Vec<SecretArg>,

    /// Bytes read per chunk (0 = 1 MiB)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Substitute for secrets that do not name one
    #[arg(long)]
    substitute: Option<String>,

    /// Print a JSON run report to stderr
    #[arg(long)]
    stats: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Include pattern text in the output
    #[arg(long)]
    reveal: bool,
}

fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::ArgsError.into()
            } else {
                ExitCode::Clean.into()
            };
        }
    };

    let cli_level = (cli.global.verbose > 0 || cli.global.quiet)
        .then(|| LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet));
    let log_config = LogConfig::from_env(cli_level, cli.global.log_format);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("pwclean: logging unavailable: {}", e);
    }

    let exit_code = match &cli.command {
        Commands::Clean(args) => run_clean(&cli.global, args),
        Commands::List(args) => run_list(&cli.global, args),
        Commands::Check => run_check(&cli.global),
    };

    exit_code.into()
}

/// Print to stderr through the log cleaner, if one is registered.
fn print_stderr(message: &str) {
    let cleaned = clean_message(message);
    let mut stderr = io::stderr();
    let _ = stderr.write_all(&cleaned);
    let _ = stderr.write_all(b"\n");
}

fn load(global: &GlobalOpts) -> Result<ResolvedConfig, ConfigError> {
    let resolved = load_config(&ConfigOptions {
        config_path: global.config.clone(),
        ..ConfigOptions::default()
    })?;
    tracing::debug!(
        event = event_names::CONFIG_LOADED,
        source = %resolved.source,
        path = ?resolved.path,
        "configuration resolved"
    );
    Ok(resolved)
}

fn config_failure(err: &ConfigError) -> ExitCode {
    tracing::error!(code = err.code(), "configuration error");
    print_stderr(&format!("pwclean: configuration error: {}", err));
    ExitCode::from(err)
}

/// Apply `clean` flags on top of the loaded configuration.
fn apply_overrides(resolved: &mut ResolvedConfig, args: &CleanArgs) -> Result<(), ConfigError> {
    if let Some(chunk_size) = args.chunk_size {
        resolved.config.chunk_size = chunk_size;
    }
    if let Some(substitute) = &args.substitute {
        resolved.config.default_substitute = substitute.clone();
    }
    for arg in &args.secrets {
        // a flag replaces a plain-text entry with the same pattern
        resolved
            .config
            .secrets
            .retain(|s| s.encoding != PatternEncoding::Utf8 || s.pattern != arg.pattern);
        resolved.config.secrets.push(arg.to_spec());
    }
    resolved.revalidate()
}

fn open_input(path: Option<&Path>) -> io::Result<Box<dyn Read + Send>> {
    Ok(match path {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    })
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "-".to_string(), |p| p.display().to_string())
}

fn run_clean(global: &GlobalOpts, args: &CleanArgs) -> ExitCode {
    let mut resolved = match load(global) {
        Ok(resolved) => resolved,
        Err(e) => return config_failure(&e),
    };
    if let Err(e) = apply_overrides(&mut resolved, args) {
        tracing::error!(code = e.code(), "invalid command line override");
        print_stderr(&format!("pwclean: {}", e));
        return ExitCode::ArgsError;
    }

    let mut cleaner = match resolved.build_cleaner() {
        Ok(cleaner) => cleaner,
        Err(e) => return config_failure(&e),
    };
    if resolved.config.scrub_logs {
        if let Err(e) = set_log_cleaner(&cleaner) {
            print_stderr(&format!("pwclean: cannot scrub logs: {}", e));
            return ExitCode::from(&e);
        }
    }

    let input = args.input.as_deref();
    let output = args.output.as_deref();
    let source = match open_input(input) {
        Ok(source) => source,
        Err(e) => {
            print_stderr(&format!(
                "pwclean: cannot open input {}: {}",
                display_path(input),
                e
            ));
            return ExitCode::IoError;
        }
    };
    let sink = match open_output(output) {
        Ok(sink) => sink,
        Err(e) => {
            print_stderr(&format!(
                "pwclean: cannot open output {}: {}",
                display_path(output),
                e
            ));
            return ExitCode::IoError;
        }
    };

    if let Err(e) = cleaner.bind_io(source, sink) {
        print_stderr(&format!("pwclean: {}", e));
        return ExitCode::from(&e);
    }

    let run_id = generate_run_id();
    let started_at = Utc::now();
    tracing::info!(
        event = event_names::RUN_STARTED,
        run_id = %run_id,
        secrets = cleaner.len(),
        chunk_size = cleaner.effective_chunk_size(),
        "cleaning stream"
    );

    let result = cleaner.run();
    let finished_at = Utc::now();
    // close files before reporting
    let _ = cleaner.unbind_io();

    match result {
        Ok(stats) => {
            tracing::info!(
                event = event_names::RUN_FINISHED,
                run_id = %run_id,
                bytes_read = stats.bytes_read,
                bytes_written = stats.bytes_written,
                replacements = stats.replacements,
                "stream cleaned"
            );
            if args.stats {
                let report = CleanReport {
                    run_id,
                    started_at,
                    finished_at,
                    duration_ms: CleanReport::duration_between(started_at, finished_at),
                    input: display_path(input),
                    output: display_path(output),
                    secret_count: cleaner.len(),
                    chunk_size: cleaner.effective_chunk_size(),
                    config: resolved.snapshot(),
                    stats,
                };
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => print_stderr(&json),
                    Err(e) => {
                        print_stderr(&format!("pwclean: cannot encode report: {}", e));
                        return ExitCode::InternalError;
                    }
                }
            }
            ExitCode::Clean
        }
        Err(e) => {
            tracing::error!(
                event = event_names::RUN_FAILED,
                run_id = %run_id,
                code = e.code(),
                error = %e,
                "cleaning aborted"
            );
            print_stderr(&format!("pwclean: {}", e));
            ExitCode::from(&e)
        }
    }
}

fn run_list(global: &GlobalOpts, args: &ListArgs) -> ExitCode {
    let cleaner: Cleaner = match load(global).and_then(|r| r.build_cleaner()) {
        Ok(cleaner) => cleaner,
        Err(e) => return config_failure(&e),
    };

    let mut lines = Vec::with_capacity(cleaner.len());
    let mut index = 0;
    cleaner.dump(|pattern, substitute| {
        lines.push(SecretListing::new(index, pattern, substitute, args.reveal));
        index += 1;
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in &lines {
        let written = serde_json::to_string(line)
            .map_err(io::Error::other)
            .and_then(|json| writeln!(out, "{}", json));
        if let Err(e) = written {
            print_stderr(&format!("pwclean: cannot write listing: {}", e));
            return ExitCode::IoError;
        }
    }
    ExitCode::Clean
}

fn run_check(global: &GlobalOpts) -> ExitCode {
    let resolved = match load(global) {
        Ok(resolved) => resolved,
        Err(e) => return config_failure(&e),
    };
    if let Err(e) = resolved.build_cleaner() {
        return config_failure(&e);
    }

    match serde_json::to_string_pretty(&resolved.snapshot()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Clean
        }
        Err(e) => {
            print_stderr(&format!("pwclean: cannot encode snapshot: {}", e));
            ExitCode::InternalError
        }
    }
}
