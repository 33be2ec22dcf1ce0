//! Pipeline orchestration and benchmark scoring.

mod metrics;
mod stages;


pub use metrics::{geometric_mean, parse_timing_log, power_metric, PowerReport, TimingSample, QUERY_COUNT};
pub use stages::{Artifacts, Pipeline, RunMode, Stage, REFRESH_QUERY_ID};
