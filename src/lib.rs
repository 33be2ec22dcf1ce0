//! TPC-H Power Pipeline
//!
//! Prepares a TPC-H power test from `dbgen`/`qgen` output and scores a benchmark
//! client run.
//!
//! # Architecture
//!
//! The pipeline consists of:
//!
//! - **Transform**: `.tbl` files to INSERT scripts, delete keys to paired DELETE
//!   scripts, and query 15 to standalone fragments
//! - **I/O**: external process invocation and staging of generator resources
//! - **Pipeline**: strictly ordered stages plus the power metric
//!
//! # Usage
//!
//! ```no_run
//! use tpch_power::{Config, RunMode, run_pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml".as_ref())?;
//!     if let Some(report) = run_pipeline(config, RunMode::Full).await? {
//!         println!("{}", report);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod table;
pub mod transform;

pub use config::Config;
pub use error::{PipelineError, StageError};
pub use io::{Invocation, ProcessRunner, TokioProcessRunner};
pub use pipeline::{Pipeline, PowerReport, RunMode, Stage, TimingSample};
pub use table::TableName;

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

/// Run the pipeline in `mode` with the production process runner.
pub async fn run_pipeline(config: Config, mode: RunMode) -> Result<Option<PowerReport>> {
    config.validate()?;
    if mode == RunMode::MetricOnly {
        config.validate_metric_only()?;
    }

    tracing::info!("Starting TPC-H pipeline");
    tracing::info!(
        "Scale factor {}, update factor {}, output {}",
        config.generator.scale_factor,
        config.generator.update_factor,
        config.output.dir.display()
    );

    let timeout = config.processing.process_timeout_secs.map(Duration::from_secs);
    let metrics_output_path = config.processing.metrics_output_path.clone();

    let pipeline = Pipeline::new(config, TokioProcessRunner::new(timeout));
    let report = pipeline.run(mode).await?;

    match &report {
        Some(report) => {
            tracing::info!("Pipeline complete: {}", report);
            if let Some(path) = &metrics_output_path {
                report.save_to_file(path)?;
            }
        }
        None => tracing::info!("Pipeline complete: no benchmark client configured"),
    }

    Ok(report)
}

/// Score an existing benchmark client log.
pub fn score_log(log_path: &Path, scale_factor: f64) -> Result<PowerReport> {
    Ok(PowerReport::from_log(log_path, scale_factor)?)
}

/// Build a Tokio runtime with the specified configuration.
pub fn build_runtime(worker_threads: Option<usize>) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();

    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }

    builder.enable_all();

    Ok(builder.build()?)
}
