//! Configuration for the TPC-H power pipeline.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::table::TableName;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data and query generator configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Benchmark client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Generator (dbgen/qgen) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Directory holding the built dbgen/qgen tools and their resources
    #[serde(default = "default_generator_dir")]
    pub dir: PathBuf,

    /// Data generator program, resolved relative to the output directory
    #[serde(default = "default_dbgen")]
    pub dbgen: String,

    /// Query generator program, resolved relative to the output directory
    #[serde(default = "default_qgen")]
    pub qgen: String,

    /// Scale factor passed to dbgen (`-s`)
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    /// Update factor passed to dbgen (`-U`)
    #[serde(default = "default_update_factor")]
    pub update_factor: u32,

    /// Which generated refresh set feeds RF1/RF2
    #[serde(default = "default_refresh_set")]
    pub refresh_set: u32,

    /// Tables to convert into load scripts
    #[serde(default = "default_tables")]
    pub tables: Vec<TableName>,

    /// Files copied from the generator directory into the output directory
    #[serde(default = "default_resources")]
    pub resources: Vec<String>,

    /// Directory (relative to `dir`) holding the query templates `<id>.sql`
    #[serde(default = "default_query_dir")]
    pub query_dir: String,

    /// Staged files that are removed once generation is done
    #[serde(default = "default_transient")]
    pub transient: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            dir: default_generator_dir(),
            dbgen: default_dbgen(),
            qgen: default_qgen(),
            scale_factor: default_scale_factor(),
            update_factor: default_update_factor(),
            refresh_set: default_refresh_set(),
            tables: default_tables(),
            resources: default_resources(),
            query_dir: default_query_dir(),
            transient: default_transient(),
        }
    }
}

impl GeneratorConfig {
    /// Scale factor formatted the way dbgen expects it on the command line.
    pub fn scale_factor_arg(&self) -> String {
        format!("{}", self.scale_factor)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the generated scripts
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Quote each delete key in RF2 (`'123'`) instead of emitting it raw
    #[serde(default)]
    pub quote_delete_keys: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            quote_delete_keys: false,
        }
    }
}

/// Benchmark client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client command line (program followed by its arguments).
    /// When empty the benchmark run is skipped.
    #[serde(default)]
    pub command: Vec<String>,

    /// File name of the captured client stdout inside the run directory
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            log_file_name: default_log_file_name(),
        }
    }
}

impl ClientConfig {
    /// Whether a client command has been configured.
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Timeout for each external process in seconds (unset = wait forever)
    #[serde(default)]
    pub process_timeout_secs: Option<u64>,

    /// Tokio worker threads (unset = num CPUs)
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Optional path to save the power report JSON after the run completes
    #[serde(default)]
    pub metrics_output_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "json" => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        Ok(config)
    }

    /// Load the configuration named on the command line.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is read if
    /// present, otherwise built-in defaults are used.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                        .with_context(|| format!("failed to load config {}", default_path.display()))
                } else {
                    tracing::info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.generator.scale_factor.is_nan() || self.generator.scale_factor <= 0.0 {
            anyhow::bail!("Scale factor must be > 0");
        }
        if self.generator.update_factor == 0 {
            anyhow::bail!("Update factor must be > 0");
        }
        if self.generator.refresh_set == 0 || self.generator.refresh_set > self.generator.update_factor {
            anyhow::bail!(
                "Refresh set must be between 1 and the update factor ({})",
                self.generator.update_factor
            );
        }
        if self.generator.tables.is_empty() {
            anyhow::bail!("At least one table must be configured");
        }
        if self.generator.dbgen.is_empty() || self.generator.qgen.is_empty() {
            anyhow::bail!("Generator programs must not be empty");
        }
        if self.client.log_file_name.is_empty() {
            anyhow::bail!("Client log file name must not be empty");
        }
        if self.processing.process_timeout_secs == Some(0) {
            anyhow::bail!("Process timeout must be > 0 when set");
        }
        Ok(())
    }

    /// Validate that a metric-only run is possible.
    pub fn validate_metric_only(&self) -> anyhow::Result<()> {
        self.validate()?;
        if !self.client.is_configured() {
            anyhow::bail!("Metric-only mode requires client.command to be set");
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_generator_dir() -> PathBuf { PathBuf::from("./tpch-dbgen") }
fn default_output_dir() -> PathBuf { PathBuf::from("./data") }
fn default_dbgen() -> String { "./dbgen".to_string() }
fn default_qgen() -> String { "./qgen".to_string() }
fn default_scale_factor() -> f64 { 1.0 }
fn default_update_factor() -> u32 { 1 }
fn default_refresh_set() -> u32 { 1 }
fn default_tables() -> Vec<TableName> { TableName::ALL.to_vec() }
fn default_query_dir() -> String { "queries".to_string() }
fn default_log_file_name() -> String { "client_stdout.txt".to_string() }

fn default_resources() -> Vec<String> {
    ["dss.ddl", "dss.ri", "dbgen", "dists.dss", "qgen"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_transient() -> Vec<String> {
    ["dbgen", "qgen", "dists.dss"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.generator.scale_factor, 1.0);
        assert_eq!(config.generator.update_factor, 1);
        assert_eq!(config.generator.tables.len(), 8);
        assert_eq!(config.output.dir, PathBuf::from("./data"));
        assert!(!config.client.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = Config::from_yaml(
            r#"
generator:
  scale_factor: 0.1
client:
  command: ["java", "-classpath", "lib/hsqldb.jar", "org.hsqldb.sample.Testdb"]
"#,
        )
        .unwrap();

        assert_eq!(config.generator.scale_factor, 0.1);
        assert_eq!(config.generator.scale_factor_arg(), "0.1");
        assert_eq!(config.generator.dbgen, "./dbgen");
        assert_eq!(config.client.command.len(), 4);
        assert!(config.validate_metric_only().is_ok());
    }

    #[test]
    fn test_json_config() {
        let config = Config::from_json(r#"{"output": {"dir": "/tmp/out", "quote_delete_keys": true}}"#).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert!(config.output.quote_delete_keys);
    }

    #[test]
    fn test_scale_factor_arg_integral() {
        assert_eq!(GeneratorConfig::default().scale_factor_arg(), "1");
    }

    #[test]
    fn test_validation_invalid() {
        let mut config = Config::default();
        config.generator.scale_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.refresh_set = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.tables.clear();
        assert!(config.validate().is_err());

        let config = Config::default();
        assert!(config.validate_metric_only().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tpch.yaml");
        std::fs::write(&path, "generator:\n  scale_factor: 10\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.generator.scale_factor, 10.0);

        let missing = dir.path().join("typo-config.yaml");
        let err = Config::load(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("typo-config.yaml"));
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = Config::default();
        config.generator.scale_factor = 10.0;
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.generator.scale_factor, 10.0);
        assert_eq!(parsed.generator.tables, config.generator.tables);
    }
}
