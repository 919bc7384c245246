use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chrono_tz::Tz;
use tracing::debug;

use refcheck::cleaner;
use refcheck::console;
use refcheck::loader;
use refcheck::pipeline::{self, PipelineConfig};
use refcheck::profiler;

/// Validate referral-program CSV extracts against the business rules
#[derive(Parser)]
#[command(name = "refcheck")]
#[command(about = "Referral validation pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validation pipeline and write the report
    Validate {
        /// Directory containing the extract CSV files
        #[arg(short, long)]
        input: PathBuf,

        /// Path of the report CSV to write
        #[arg(short, long, default_value = "report.csv")]
        output: PathBuf,

        /// Fallback IANA timezone when no per-referral source resolves
        #[arg(long, default_value = "Asia/Jakarta")]
        default_timezone: String,

        /// Print a preview of every loaded table
        #[arg(long)]
        show_tables: bool,
    },
    /// Profile the extract tables (null %, distinct %, types)
    Profile {
        /// Directory containing the extract CSV files
        #[arg(short, long)]
        input: PathBuf,

        /// Print a preview of every loaded table
        #[arg(long)]
        show_tables: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("refcheck started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            input,
            output,
            default_timezone,
            show_tables,
        } => run_validate(input, output, &default_timezone, show_tables),
        Commands::Profile { input, show_tables } => run_profile(input, show_tables),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_validate(
    input: PathBuf,
    output: PathBuf,
    default_timezone: &str,
    show_tables: bool,
) -> Result<()> {
    let default_timezone: Tz = default_timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone identifier: {default_timezone}"))?;

    let tables = loader::load_dir(&input)
        .with_context(|| format!("failed to load extracts from {}", input.display()))?;

    if show_tables {
        for table in tables.values() {
            println!("{}", console::format_table_preview(table));
        }
    }

    let dataset = cleaner::clean(tables).context("failed to clean extract tables")?;
    let config = PipelineConfig { default_timezone };
    let (rows, summary) = pipeline::run(&dataset, &config);

    pipeline::report::write_report(&rows, &output)
        .with_context(|| format!("failed to write report to {}", output.display()))?;

    print!("{}", console::format_run_summary(&summary));
    println!("Report written to {}", output.display());
    Ok(())
}

fn run_profile(input: PathBuf, show_tables: bool) -> Result<()> {
    let tables = loader::load_dir(&input)
        .with_context(|| format!("failed to load extracts from {}", input.display()))?;

    if tables.is_empty() {
        println!("No CSV files found in {}", input.display());
        return Ok(());
    }

    for table in tables.values() {
        if show_tables {
            println!("{}", console::format_table_preview(table));
        }
        let profiles = profiler::profile_table(table);
        println!("{}", console::format_profiles(&table.name, &profiles));
    }
    Ok(())
}
