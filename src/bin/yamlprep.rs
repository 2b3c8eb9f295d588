use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use yamlprep::LoadError;

#[derive(Parser)]
#[command(name = "yamlprep")]
#[command(about = "Resolve an openHAB-style YAML configuration file")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the YAML file to resolve
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "yaml-ish")]
    format: OutputFormat,

    /// Only validate, printing warnings and a pass/fail summary
    #[arg(long)]
    check: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory standing in for OPENHAB_CONF for this run, without
    /// mutating the process environment
    #[arg(long, value_name = "PATH")]
    conf_root: Option<PathBuf>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    YamlIsh,
    Debug,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a global tracing subscriber was already set");
    }

    let absolute_path = match cli.file.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {e}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };
    let conf_root = cli
        .conf_root
        .clone()
        .unwrap_or_else(|| default_conf_root(&absolute_path));

    let mut included = Vec::new();
    let mut observer = |path: &Path| included.push(path.to_path_buf());

    match yamlprep::load(absolute_path.clone(), &conf_root, &mut observer) {
        Ok((value, log)) => {
            for warning in log.borrow().tracked_warnings() {
                eprintln!("warning: {warning}");
            }
            if cli.verbose > 0 {
                for path in &included {
                    info!(file = %path.display(), "included");
                }
            }

            if cli.check {
                if let Some(summary) = log.borrow().summary_line(&cli.file.display().to_string())
                {
                    println!("{summary}");
                } else {
                    println!("{}: OK", cli.file.display());
                }
                return ExitCode::SUCCESS;
            }

            print_value(&value, &cli.format);
            info!("resolved {} successfully", cli.file.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            if cli.check {
                println!("{}: FAILED: {err}", cli.file.display());
            } else {
                eprintln!("{err}");
            }
            exit_code_for(&err)
        }
    }
}

fn print_value(value: &yamlprep::TreeValue, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&value.to_json()) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize as JSON: {e}"),
        },
        OutputFormat::Debug => println!("{value:#?}"),
        OutputFormat::YamlIsh => println!("{value}"),
    }
}

/// `!include`/`!insert` targets resolve relative to the directory containing
/// the root file unless `--conf-root` overrides it; this mirrors treating
/// that directory as `OPENHAB_CONF` for a standalone run outside an actual
/// openHAB install.
fn default_conf_root(absolute_path: &Path) -> PathBuf {
    absolute_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn exit_code_for(err: &LoadError) -> ExitCode {
    match err {
        LoadError::ProcessingSkipped { .. } => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
