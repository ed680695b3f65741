//! CLI entry point for the degree grade calculator.
//!
//! Provides subcommands for evaluating module lists from CSV, importing a
//! transcript (for example OCR output of a results page), and classifying a
//! single final grade.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use degree_calc::config::CalculatorConfig;
use degree_calc::grading::cohort::{
    CompensatedCreditResolver, CompensationPolicy, PolicyResolver, PromptResolver,
    ensure_final_project, normalize_imported, resolve_compensated,
};
use degree_calc::grading::{Cohort, Level, classify, evaluate};
use degree_calc::output::{
    append_cohort, print_pretty, read_cohort_csv, read_modules_csv, render_modules,
    render_summary, to_json,
};
use degree_calc::transcript::parse_transcript;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "degree_calc")]
#[command(about = "Degree classification calculator with borderline analysis", long_about = None)]
struct Cli {
    /// JSON config file (falls back to $DEGREE_CALC_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How to treat zero-credit (compensated) modules
    #[arg(long, global = true, value_enum)]
    compensated: Option<CompensationPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate Level 5 and Level 6 modules from CSV files
    #[command(group(
        ArgGroup::new("input")
            .args(["modules", "level5"])
            .required(true)
            .multiple(false)
    ))]
    Calculate {
        /// CSV of Level 5 modules (name,mark,credits)
        #[arg(long, requires = "level6")]
        level5: Option<PathBuf>,

        /// CSV of Level 6 modules (name,mark,credits)
        #[arg(long, requires = "level5")]
        level6: Option<PathBuf>,

        /// Single CSV with a level column (level,name,mark,credits)
        #[arg(long)]
        modules: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Import modules from transcript text and evaluate them
    Import {
        /// Transcript text file, or "-" for stdin
        #[arg(value_name = "TRANSCRIPT")]
        source: PathBuf,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// CSV file to append the imported modules to
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Classify a single final grade
    Classify {
        #[arg(value_name = "FINAL_GRADE", allow_negative_numbers = true)]
        grade: f64,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/degree_calc.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("degree_calc.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = CalculatorConfig::resolve(cli.config.as_deref())?;
    if let Some(policy) = cli.compensated {
        config.compensated_policy = policy;
    }

    match cli.command {
        Commands::Calculate {
            level5,
            level6,
            modules,
            json,
        } => {
            let (level5, level6) = match (modules, level5, level6) {
                (Some(path), _, _) => read_modules_csv(&path)?,
                (None, Some(l5), Some(l6)) => (
                    read_cohort_csv(&l5, Level::Five)?,
                    read_cohort_csv(&l6, Level::Six)?,
                ),
                _ => anyhow::bail!("either --modules or both --level5 and --level6 are required"),
            };
            report(level5, level6, &config, json)?;
        }
        Commands::Import {
            source,
            json,
            export,
        } => {
            let text = read_transcript(&source)?;
            let parsed = parse_transcript(&text)?;
            if parsed.is_empty() {
                warn!(source = %source.display(), "No modules recognised in transcript");
            }

            let (level5, level6) = parsed.into_cohorts();
            let level5 = normalize_imported(level5);
            let level6 = ensure_final_project(normalize_imported(level6));

            if let Some(path) = &export {
                append_cohort(path, &level5)?;
                append_cohort(path, &level6)?;
                info!(path = %path.display(), "Imported modules exported");
            }

            report(level5, level6, &config, json)?;
        }
        Commands::Classify { grade } => {
            println!("{}", classify(grade));
        }
    }

    Ok(())
}

/// Resolves compensated modules, evaluates both cohorts and prints the result.
#[tracing::instrument(skip_all, fields(policy = ?config.compensated_policy, json = json))]
fn report(level5: Cohort, level6: Cohort, config: &CalculatorConfig, json: bool) -> Result<()> {
    let mut resolver = resolver_for(config);
    let level5 = resolve_compensated(level5, resolver.as_mut())?;
    let level6 = resolve_compensated(level6, resolver.as_mut())?;

    let result = evaluate(&level5, &level6);
    print_pretty(&result);

    if json {
        println!("{}", to_json(&level5, &level6, &result)?);
    } else {
        print!("{}", render_modules(&level5));
        print!("{}", render_modules(&level6));
        println!();
        print!("{}", render_summary(&result));
    }
    Ok(())
}

fn resolver_for(config: &CalculatorConfig) -> Box<dyn CompensatedCreditResolver> {
    match config.compensated_policy {
        CompensationPolicy::Ask => Box::new(PromptResolver::new(
            std::io::stdin().lock(),
            std::io::stderr(),
            config.compensated_credits,
        )),
        policy => Box::new(PolicyResolver::new(policy, config.compensated_credits)),
    }
}

/// Reads transcript text from a file, or from stdin when `source` is "-".
fn read_transcript(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read transcript from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source)
        .with_context(|| format!("failed to read transcript {}", source.display()))
}
