//! TPC-H power metric computed from benchmark client timings.
//!
//! The client log starts with a header line, followed by one `<label>:<elapsed-ms>`
//! line per timed operation. The power metric is
//!
//! ```text
//! power = 3600 * SF / (Π elapsed_secs) ^ (1 / 22)
//! ```
//!
//! The root is always taken over [`QUERY_COUNT`], regardless of how many samples
//! the log actually holds.

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Number of queries in the power test; the fixed root of the geometric mean.
pub const QUERY_COUNT: u32 = 22;

/// Seconds in an hour, the numerator of the power formula.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// One timed operation reported by the benchmark client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSample {
    pub label: String,
    pub elapsed_ms: f64,
}

impl TimingSample {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }

    /// Elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms / 1000.0
    }
}

/// Parse a benchmark client log, skipping its header line.
///
/// A log with no sample after the header is malformed: the client aborted before
/// timing anything.
pub fn parse_timing_log(path: &Path) -> Result<Vec<TimingSample>> {
    let malformed = |line: usize, reason: String| PipelineError::MalformedTimingLog {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| malformed(0, e.to_string()))?;
    let mut lines = contents.lines().enumerate();
    if lines.next().is_none() {
        return Err(malformed(0, "log is empty".to_string()));
    }

    let mut samples = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let (label, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(line_no, format!("expected '<label>:<elapsed>', got '{}'", line)))?;
        let elapsed_ms: f64 = value
            .trim()
            .parse()
            .map_err(|e| malformed(line_no, format!("invalid elapsed time '{}': {}", value.trim(), e)))?;
        if !elapsed_ms.is_finite() {
            return Err(malformed(line_no, format!("elapsed time '{}' is not finite", value.trim())));
        }
        samples.push(TimingSample::new(label.trim(), elapsed_ms));
    }
    if samples.is_empty() {
        return Err(malformed(1, "no timing samples after the header".to_string()));
    }
    Ok(samples)
}

/// Geometric mean of the samples in seconds, rooted at [`QUERY_COUNT`].
///
/// A non-positive sample yields `DegenerateTiming`.
pub fn geometric_mean(samples: &[TimingSample]) -> Result<f64> {
    if let Some(bad) = samples.iter().find(|s| s.elapsed_ms <= 0.0) {
        return Err(PipelineError::DegenerateTiming {
            label: bad.label.clone(),
            elapsed_ms: bad.elapsed_ms,
        });
    }
    let product: f64 = samples.iter().map(TimingSample::elapsed_secs).product();
    Ok(product.powf(1.0 / f64::from(QUERY_COUNT)))
}

/// Power metric for the given samples and scale factor.
pub fn power_metric(samples: &[TimingSample], scale_factor: f64) -> Result<f64> {
    geometric_mean(samples).map(|mean| power_from_mean(mean, scale_factor))
}

fn power_from_mean(geometric_mean_secs: f64, scale_factor: f64) -> f64 {
    SECONDS_PER_HOUR * scale_factor / geometric_mean_secs
}

/// Result of one benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct PowerReport {
    pub log_path: PathBuf,
    pub scale_factor: f64,
    pub samples: Vec<TimingSample>,
    pub geometric_mean_secs: f64,
    pub power: f64,
}

impl PowerReport {
    /// Compute a report from already parsed samples.
    pub fn from_samples(log_path: PathBuf, samples: Vec<TimingSample>, scale_factor: f64) -> Result<Self> {
        if samples.len() != QUERY_COUNT as usize {
            tracing::warn!(
                "Timing log has {} samples, expected {}; metric is not comparable",
                samples.len(),
                QUERY_COUNT
            );
        }
        let geometric_mean_secs = geometric_mean(&samples)?;
        Ok(Self {
            log_path,
            scale_factor,
            samples,
            geometric_mean_secs,
            power: power_from_mean(geometric_mean_secs, scale_factor),
        })
    }

    /// Parse a client log and compute its report.
    pub fn from_log(log_path: &Path, scale_factor: f64) -> Result<Self> {
        let samples = parse_timing_log(log_path)?;
        Self::from_samples(log_path.to_path_buf(), samples, scale_factor)
    }

    /// Save the report to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Power report saved to {}", path.display());
        Ok(())
    }
}

impl std::fmt::Display for PowerReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total_secs: f64 = self.samples.iter().map(TimingSample::elapsed_secs).sum();
        write!(
            f,
            "TPC-H Power = {:.2} | SF: {} | Samples: {} | Geomean: {:.3}s | Total: {:.1}s",
            self.power,
            self.scale_factor,
            self.samples.len(),
            self.geometric_mean_secs,
            total_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn uniform(ms: f64) -> Vec<TimingSample> {
        (1..=QUERY_COUNT).map(|i| TimingSample::new(format!("Q{}", i), ms)).collect()
    }

    #[test]
    fn test_one_second_queries_give_3600() {
        let power = power_metric(&uniform(1000.0), 1.0).unwrap();
        assert!((power - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_factor_multiplies() {
        let power = power_metric(&uniform(1000.0), 10.0).unwrap();
        assert!((power - 36000.0).abs() < 1e-6);
    }

    #[test]
    fn test_doubling_samples_halves_power() {
        let samples = vec![
            TimingSample::new("Q1", 1200.0),
            TimingSample::new("Q2", 350.0),
            TimingSample::new("Q3", 9800.0),
        ];
        let doubled: Vec<TimingSample> = samples
            .iter()
            .map(|s| TimingSample::new(s.label.clone(), s.elapsed_ms * 2.0))
            .collect();
        let full_doubled: Vec<TimingSample> = uniform(700.0)
            .into_iter()
            .map(|s| TimingSample::new(s.label, s.elapsed_ms * 2.0))
            .collect();

        // With all 22 samples doubled the geometric mean doubles exactly
        let base = geometric_mean(&uniform(700.0)).unwrap();
        let twice = geometric_mean(&full_doubled).unwrap();
        assert!((twice / base - 2.0).abs() < 1e-9);
        let ratio = power_metric(&uniform(700.0), 1.0).unwrap() / power_metric(&full_doubled, 1.0).unwrap();
        assert!((ratio - 2.0).abs() < 1e-9);

        // Fewer samples still use the fixed root
        let partial = geometric_mean(&doubled).unwrap() / geometric_mean(&samples).unwrap();
        assert!((partial - 2f64.powf(3.0 / 22.0)).abs() < 1e-9);
    }

    #[test]
    fn test_divisor_is_fixed() {
        // One sample of 2^22 seconds: the 22nd root is 2, not 2^22
        let samples = vec![TimingSample::new("Q1", 1000.0 * 2f64.powi(22))];
        let mean = geometric_mean(&samples).unwrap();
        assert!((mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sample_is_degenerate() {
        let mut samples = uniform(1000.0);
        samples[4].elapsed_ms = 0.0;
        let result = power_metric(&samples, 1.0);
        assert!(matches!(
            result,
            Err(PipelineError::DegenerateTiming { ref label, .. }) if label == "Q5"
        ));
    }

    #[test]
    fn test_parse_timing_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client_stdout.txt");
        std::fs::write(&path, "Load:52311\nRF1:1200\nQ1:1500\nQ2: 250\n\n").unwrap();

        let samples = parse_timing_log(&path).unwrap();

        assert_eq!(
            samples,
            vec![
                TimingSample::new("RF1", 1200.0),
                TimingSample::new("Q1", 1500.0),
                TimingSample::new("Q2", 250.0),
            ]
        );
    }

    #[test]
    fn test_parse_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "header\nQ1:1500\nQ2 took 12ms\n").unwrap();

        let result = parse_timing_log(&path);
        assert!(matches!(result, Err(PipelineError::MalformedTimingLog { line: 3, .. })));

        std::fs::write(&path, "header\nQ1:fast\n").unwrap();
        assert!(matches!(
            parse_timing_log(&path),
            Err(PipelineError::MalformedTimingLog { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_missing_or_empty_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        assert!(matches!(parse_timing_log(&path), Err(PipelineError::MalformedTimingLog { .. })));

        std::fs::write(&path, "").unwrap();
        assert!(matches!(parse_timing_log(&path), Err(PipelineError::MalformedTimingLog { .. })));
    }

    #[test]
    fn test_header_only_log_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client_stdout.txt");
        std::fs::write(&path, "Load:\n\n").unwrap();

        assert!(matches!(
            parse_timing_log(&path),
            Err(PipelineError::MalformedTimingLog { line: 1, .. })
        ));
        assert!(PowerReport::from_log(&path, 1.0).is_err());
    }

    #[test]
    fn test_report_from_log_and_save() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log.txt");
        let mut contents = String::from("Load:100\n");
        for i in 1..=QUERY_COUNT {
            contents.push_str(&format!("Q{}:1000\n", i));
        }
        std::fs::write(&log, contents).unwrap();

        let report = PowerReport::from_log(&log, 1.0).unwrap();
        assert_eq!(report.samples.len(), 22);
        assert!((report.power - 3600.0).abs() < 1e-9);
        assert_eq!(report.power, power_metric(&report.samples, 1.0).unwrap());
        assert!(report.to_string().contains("TPC-H Power = 3600.00"));

        let json_path = dir.path().join("power.json");
        report.save_to_file(&json_path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["samples"].as_array().unwrap().len(), 22);
        assert_eq!(json["power"].as_f64().unwrap().round(), 3600.0);
    }
}
