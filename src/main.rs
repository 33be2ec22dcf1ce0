//! TPC-H Power Pipeline CLI
//!
//! Generates TPC-H load, refresh and query scripts and scores a benchmark client run.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tpch_power::{build_runtime, run_pipeline, score_log, Config, RunMode};

#[derive(Parser)]
#[command(name = "tpch-power")]
#[command(about = "Prepare a TPC-H power test and compute its metric", long_about = None)]
struct Cli {
    /// Path to configuration file (config.yaml or built-in defaults if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the scale factor
    #[arg(long, global = true)]
    scale_factor: Option<f64>,

    /// Override the output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Only run the benchmark client and compute the metric
    #[arg(short = 'r', long = "run", visible_alias = "metric-only")]
    metric_only: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline (default if no command specified)
    Run,

    /// Compute the power metric from an existing client log
    Score {
        /// Path to the captured client stdout
        #[arg(short, long)]
        log: PathBuf,
    },

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => {
            let mode = if cli.metric_only {
                RunMode::MetricOnly
            } else {
                RunMode::Full
            };
            let config = load_config(cli.config.as_deref(), cli.scale_factor, cli.output_dir)?;
            run_command(config, mode)?;
        }

        Some(Commands::Score { log }) => {
            let config = load_config(cli.config.as_deref(), cli.scale_factor, cli.output_dir)?;
            let report = score_log(&log, config.generator.scale_factor)?;
            println!("{}", report);
        }

        Some(Commands::Validate) => {
            let config = load_config(cli.config.as_deref(), cli.scale_factor, cli.output_dir)?;
            config.validate()?;
            println!("Configuration is valid");
        }

        Some(Commands::GenerateConfig { output }) => {
            generate_config_command(output)?;
        }
    }

    Ok(())
}

fn load_config(
    path: Option<&Path>,
    scale_factor: Option<f64>,
    output_dir: Option<PathBuf>,
) -> Result<Config> {
    let mut config = Config::load(path)?;

    // Apply overrides
    if let Some(sf) = scale_factor {
        config.generator.scale_factor = sf;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }

    Ok(config)
}

fn run_command(config: Config, mode: RunMode) -> Result<()> {
    if mode == RunMode::MetricOnly {
        tracing::info!(">>> Metric-only run");
    }

    let runtime = build_runtime(config.processing.worker_threads)?;
    runtime.block_on(async { run_pipeline(config, mode).await })?;

    Ok(())
}

fn generate_config_command(output: PathBuf) -> Result<()> {
    let yaml = r#"# TPC-H Power Pipeline Configuration

# === GENERATOR: dbgen/qgen and their resources ===
generator:
  # Directory with built dbgen/qgen, dists.dss, dss.ddl, dss.ri and queries/
  dir: "./tpch-dbgen"

  # Programs, run from inside the output directory after staging
  dbgen: "./dbgen"
  qgen: "./qgen"

  # Data size (dbgen -s)
  scale_factor: 1

  # Number of refresh sets (dbgen -U); set 1 feeds RF1/RF2
  update_factor: 1
  refresh_set: 1

  # Tables converted into <table>.sql load scripts
  tables: [customer, part, partsupp, region, supplier, nation, orders, lineitem]

  # Copied into the output directory before generation
  resources: ["dss.ddl", "dss.ri", "dbgen", "dists.dss", "qgen"]

  # Query templates <id>.sql, relative to dir
  query_dir: "queries"

  # Removed from the output directory once queries are generated
  transient: ["dbgen", "qgen", "dists.dss"]

# === OUTPUT: generated scripts ===
output:
  dir: "./data"

  # Emit RF2 keys as '123' instead of 123
  quote_delete_keys: false

# === CLIENT: benchmark client, run in a fresh <output>/<millis> directory ===
client:
  # Leave empty to stop after query generation
  command: []
  # command: ["java", "-Dfile.encoding=UTF-8", "-classpath", "hsqldb/lib/hsqldb.jar:hsqldb/bin", "org.hsqldb.sample.Testdb"]

  # Captured client stdout: a header line, then <label>:<elapsed-ms> per query
  log_file_name: "client_stdout.txt"

# === PROCESSING ===
processing:
  # Kill external processes after this many seconds (omit to wait forever)
  # process_timeout_secs: 7200

  # Tokio worker threads (null = num CPUs)
  # worker_threads: 2

  # Save the power report as JSON
  # metrics_output_path: "./data/power.json"
"#;

    std::fs::write(&output, yaml)?;
    println!("Generated sample configuration at: {}", output.display());

    Ok(())
}
