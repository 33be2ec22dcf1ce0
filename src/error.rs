//! Error taxonomy for the pipeline stages.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors raised by converters, the metric calculator and external process invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source file not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to write {}: {source}", .path.display())]
    DestinationWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed timing log {} at line {line}: {reason}", .path.display())]
    MalformedTimingLog {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("degenerate timing sample '{label}' ({elapsed_ms} ms): geometric mean is zero")]
    DegenerateTiming { label: String, elapsed_ms: f64 },

    #[error("external process '{program}' exited with status {code}")]
    ExternalProcessFailure { program: String, code: i32 },

    #[error("external process '{program}' timed out after {timeout:?}")]
    ExternalProcessTimeout { program: String, timeout: Duration },

    #[error("failed to spawn external process '{program}': {source}")]
    ExternalProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no benchmark client command configured")]
    MissingBenchmarkClient,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DestinationWriteError {
            path: path.into(),
            source,
        }
    }

    /// Map an open/read error on a source file, turning `NotFound` into `SourceNotFound`.
    pub(crate) fn open_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// A pipeline failure annotated with the stage that raised it.
#[derive(Debug, Error)]
#[error("stage {stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}
