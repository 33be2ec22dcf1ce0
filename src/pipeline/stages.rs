//! Sequential pipeline stages from generator output to the power metric.
//!
//! ```text
//! Prepare → GenerateBaseData → GenerateIncrementalData → ConvertTablesToSql
//!   → ConvertIncrementalToSql (RF1) → ConvertDeletesToSql (RF2) → GenerateQueries
//!   → CleanupTransientInputs → SplitRefreshQuery → [RunBenchmarkClient → ComputeMetric]
//! ```
//!
//! Every stage consumes files produced by an earlier one and removes the transient
//! ones it consumed. Stages never overlap and the first failure stops the run.
//! Nothing is rolled back, so a failed run needs a fresh output directory.

use crate::config::Config;
use crate::error::{PipelineError, Result, StageError};
use crate::io::{self, run_checked, Invocation, ProcessRunner};
use crate::pipeline::PowerReport;
use crate::table::TableName;
use crate::transform::{self, DeleteKeyFormat, WriteMode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::metrics::QUERY_COUNT;

/// Query whose template holds several statements separated by blank lines.
pub const REFRESH_QUERY_ID: u32 = 15;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    GenerateBaseData,
    GenerateIncrementalData,
    ConvertTablesToSql,
    ConvertIncrementalToSql,
    ConvertDeletesToSql,
    GenerateQueries,
    CleanupTransientInputs,
    SplitRefreshQuery,
    RunBenchmarkClient,
    ComputeMetric,
}

impl Stage {
    /// Data and query preparation, in order.
    pub const PREPARATION: [Stage; 9] = [
        Stage::Prepare,
        Stage::GenerateBaseData,
        Stage::GenerateIncrementalData,
        Stage::ConvertTablesToSql,
        Stage::ConvertIncrementalToSql,
        Stage::ConvertDeletesToSql,
        Stage::GenerateQueries,
        Stage::CleanupTransientInputs,
        Stage::SplitRefreshQuery,
    ];

    /// Benchmark run and scoring, in order.
    pub const BENCHMARK: [Stage; 2] = [Stage::RunBenchmarkClient, Stage::ComputeMetric];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which part of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Generate everything, then benchmark if a client is configured.
    #[default]
    Full,
    /// Reuse artifacts of an earlier full run and only benchmark.
    MetricOnly,
}

/// Locations of the files handed from one stage to the next.
#[derive(Debug, Clone)]
pub struct Artifacts {
    dir: PathBuf,
}

impl Artifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<table>.tbl` from dbgen.
    pub fn table_data(&self, table: TableName) -> PathBuf {
        self.dir.join(table.data_file())
    }

    /// `<table>.tbl.u<set>` from `dbgen -U`.
    pub fn update_data(&self, table: TableName, set: u32) -> PathBuf {
        self.dir.join(table.update_file(set))
    }

    /// `delete.<set>` from `dbgen -U`.
    pub fn delete_keys(&self, set: u32) -> PathBuf {
        self.dir.join(format!("delete.{}", set))
    }

    /// `<table>.sql` load script.
    pub fn load_script(&self, table: TableName) -> PathBuf {
        self.dir.join(table.load_file())
    }

    /// Refresh function 1 (inserts).
    pub fn rf1(&self) -> PathBuf {
        self.dir.join("RF1.sql")
    }

    /// Refresh function 2 (deletes).
    pub fn rf2(&self) -> PathBuf {
        self.dir.join("RF2.sql")
    }

    /// Staged qgen template `<id>.sql`.
    pub fn query_template_name(id: u32) -> String {
        format!("{}.sql", id)
    }

    /// Generated query `q<id>.sql`.
    pub fn query(&self, id: u32) -> PathBuf {
        self.dir.join(format!("q{}.sql", id))
    }

    /// File stem shared by the refresh query fragments, `q<id>`.
    pub fn query_stem(id: u32) -> String {
        format!("q{}", id)
    }
}

/// State carried between the benchmark stages.
#[derive(Debug, Default)]
struct RunState {
    log_path: Option<PathBuf>,
    report: Option<PowerReport>,
}

/// The benchmark driver pipeline.
pub struct Pipeline<R> {
    config: Config,
    runner: R,
    artifacts: Artifacts,
}

impl<R: ProcessRunner> Pipeline<R> {
    /// Create a pipeline over the given configuration and process runner.
    pub fn new(config: Config, runner: R) -> Self {
        let artifacts = Artifacts::new(config.output.dir.clone());
        Self {
            config,
            runner,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Stages executed for `mode`, in order.
    pub fn plan(&self, mode: RunMode) -> Vec<Stage> {
        match mode {
            RunMode::Full if self.config.client.is_configured() => {
                Stage::PREPARATION.iter().chain(Stage::BENCHMARK.iter()).copied().collect()
            }
            RunMode::Full => Stage::PREPARATION.to_vec(),
            RunMode::MetricOnly => Stage::BENCHMARK.to_vec(),
        }
    }

    /// Run every stage of `mode` in order, stopping at the first failure.
    ///
    /// Returns the power report when the benchmark stages ran.
    pub async fn run(&self, mode: RunMode) -> Result<Option<PowerReport>, StageError> {
        let plan = self.plan(mode);
        tracing::info!("Running {:?} pipeline: {} stages", mode, plan.len());

        let mut state = RunState::default();
        for stage in plan {
            let started = Instant::now();
            tracing::info!("Stage {} starting", stage);

            if let Err(source) = self.execute(stage, &mut state).await {
                tracing::error!("Stage {} failed: {}", stage, source);
                return Err(StageError { stage, source });
            }

            tracing::info!(
                "Stage {} finished in {:.2}s",
                stage,
                started.elapsed().as_secs_f64()
            );
        }

        Ok(state.report)
    }

    async fn execute(&self, stage: Stage, state: &mut RunState) -> Result<()> {
        match stage {
            Stage::Prepare => self.prepare(),
            Stage::GenerateBaseData => self.generate_data(false).await,
            Stage::GenerateIncrementalData => self.generate_data(true).await,
            Stage::ConvertTablesToSql => self.convert_tables(),
            Stage::ConvertIncrementalToSql => self.convert_incremental(),
            Stage::ConvertDeletesToSql => self.convert_deletes(),
            Stage::GenerateQueries => self.generate_queries().await,
            Stage::CleanupTransientInputs => {
                io::remove_files(self.artifacts.dir(), &self.config.generator.transient)
            }
            Stage::SplitRefreshQuery => self.split_refresh_query(),
            Stage::RunBenchmarkClient => {
                state.log_path = Some(self.run_client().await?);
                Ok(())
            }
            Stage::ComputeMetric => {
                let log_path = state
                    .log_path
                    .as_deref()
                    .ok_or(PipelineError::MissingBenchmarkClient)?;
                let report = PowerReport::from_log(log_path, self.config.generator.scale_factor)?;
                tracing::info!(">>> TPC-H Power = {}", report.power);
                state.report = Some(report);
                Ok(())
            }
        }
    }

    /// Create the output directory and stage generator tools and query templates in it.
    fn prepare(&self) -> Result<()> {
        let generator = &self.config.generator;
        io::ensure_dir(self.artifacts.dir())?;

        if !generator.dir.is_dir() {
            return Err(PipelineError::SourceNotFound {
                path: generator.dir.clone(),
            });
        }

        io::copy_files(&generator.dir, self.artifacts.dir(), &generator.resources)?;

        let templates: Vec<String> = (1..=QUERY_COUNT).map(Artifacts::query_template_name).collect();
        io::copy_files(
            &generator.dir.join(&generator.query_dir),
            self.artifacts.dir(),
            &templates,
        )?;

        tracing::info!(
            "Staged {} resources and {} query templates into {}",
            generator.resources.len(),
            templates.len(),
            self.artifacts.dir().display()
        );
        Ok(())
    }

    /// Run dbgen for the base tables or, with `incremental`, for the refresh sets.
    async fn generate_data(&self, incremental: bool) -> Result<()> {
        let generator = &self.config.generator;
        let mut invocation = Invocation::new(&generator.dbgen, self.artifacts.dir())
            .args(["-v", "-s"])
            .arg(generator.scale_factor_arg());
        if incremental {
            invocation = invocation.arg("-U").arg(generator.update_factor.to_string());
        }
        run_checked(&self.runner, &invocation).await
    }

    fn convert_tables(&self) -> Result<()> {
        for &table in &self.config.generator.tables {
            let written = transform::convert_records(
                table,
                &self.artifacts.table_data(table),
                &self.artifacts.load_script(table),
                WriteMode::Overwrite,
            )?;
            tracing::info!("{}: {} rows", table, written);
        }
        Ok(())
    }

    /// RF1 holds the orders inserts followed by the lineitem inserts.
    fn convert_incremental(&self) -> Result<()> {
        let set = self.config.generator.refresh_set;
        let rf1 = self.artifacts.rf1();
        for (i, &table) in TableName::REFRESHED.iter().enumerate() {
            let mode = if i == 0 { WriteMode::Overwrite } else { WriteMode::Append };
            let written =
                transform::convert_records(table, &self.artifacts.update_data(table, set), &rf1, mode)?;
            tracing::info!("RF1 {}: {} rows", table, written);
        }
        Ok(())
    }

    fn convert_deletes(&self) -> Result<()> {
        let format = if self.config.output.quote_delete_keys {
            DeleteKeyFormat::Quoted
        } else {
            DeleteKeyFormat::Raw
        };
        let keys = transform::convert_deletes(
            &self.artifacts.delete_keys(self.config.generator.refresh_set),
            &self.artifacts.rf2(),
            WriteMode::Overwrite,
            format,
        )?;
        tracing::info!("RF2: {} keys", keys);
        Ok(())
    }

    /// Run qgen once per query, then drop the consumed template.
    async fn generate_queries(&self) -> Result<()> {
        for id in 1..=QUERY_COUNT {
            let invocation = Invocation::new(&self.config.generator.qgen, self.artifacts.dir())
                .arg(id.to_string())
                .stdout_to(self.artifacts.query(id));
            run_checked(&self.runner, &invocation).await?;
            io::remove_files(self.artifacts.dir(), &[Artifacts::query_template_name(id)])?;
        }
        Ok(())
    }

    /// Replace `q15.sql` with its numbered fragments.
    fn split_refresh_query(&self) -> Result<()> {
        let source = self.artifacts.query(REFRESH_QUERY_ID);
        let fragments = transform::split_refresh_query(
            &source,
            self.artifacts.dir(),
            &Artifacts::query_stem(REFRESH_QUERY_ID),
        )?;
        std::fs::remove_file(&source).map_err(|e| PipelineError::io(&source, e))?;
        tracing::info!("Split query {} into {} fragments", REFRESH_QUERY_ID, fragments.len());
        Ok(())
    }

    /// Run the client in a fresh directory and return the path of its captured stdout.
    async fn run_client(&self) -> Result<PathBuf> {
        let client = &self.config.client;
        let (program, args) = client
            .command
            .split_first()
            .ok_or(PipelineError::MissingBenchmarkClient)?;

        let run_dir = io::create_run_dir(self.artifacts.dir())?;
        let log_path = run_dir.join(&client.log_file_name);
        tracing::info!(">>> Benchmark client running in {}", run_dir.display());

        let invocation = Invocation::new(program, &run_dir)
            .args(args.iter().cloned())
            .stdout_to(&log_path);
        run_checked(&self.runner, &invocation).await?;
        Ok(log_path)
    }
}
