/// Mesh parameter fit report
///
/// Output of the parameter inference script: for each target measurement,
/// how closely the fitted mesh reproduces it, plus summary statistics.
/// Shown to the user on the accuracy review step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::DocumentError;

/// Fit of a single measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFit {
    /// Requested value in cm
    pub target: f64,

    /// Value measured on the fitted mesh in cm
    pub actual: f64,

    /// Signed difference actual - target in cm
    pub error: f64,

    /// Whether the optimizer converged for this measurement
    pub converged: bool,
}

/// Aggregate statistics over all measurements in a report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub converged_count: u32,
    pub total_measurements: u32,
    pub mean_absolute_error: f64,
    pub max_absolute_error: f64,
    pub all_converged: bool,
}

/// Full parameter fit report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterReport {
    /// Per-measurement fits, keyed by measurement name
    pub measurements: BTreeMap<String, MeasurementFit>,

    pub summary: ReportSummary,
}

impl ParameterReport {
    /// Build a report from rows, computing the summary
    pub fn from_rows(rows: BTreeMap<String, MeasurementFit>) -> Self {
        let summary = summarize(&rows);
        Self {
            measurements: rows,
            summary,
        }
    }

    /// Load a report document from disk
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Compute summary statistics over a set of fits
pub fn summarize(rows: &BTreeMap<String, MeasurementFit>) -> ReportSummary {
    let total = rows.len() as u32;
    let converged = rows.values().filter(|r| r.converged).count() as u32;

    let mut mean = 0.0;
    let mut max = 0.0f64;
    if total > 0 {
        let abs_errors: Vec<f64> = rows.values().map(|r| r.error.abs()).collect();
        mean = abs_errors.iter().sum::<f64>() / total as f64;
        max = abs_errors.iter().fold(0.0, |acc, e| acc.max(*e));
    }

    ReportSummary {
        converged_count: converged,
        total_measurements: total,
        mean_absolute_error: mean,
        max_absolute_error: max,
        all_converged: total > 0 && converged == total,
    }
}

/// Human-readable label for a known measurement key
pub fn display_label(key: &str) -> Option<&'static str> {
    match key {
        "height_cm" => Some("Height"),
        "head_width_cm" => Some("Head Width"),
        "shoulder_width_cm" => Some("Shoulder Width"),
        "hip_width_cm" => Some("Hip Width"),
        "shoulder_to_waist_cm" => Some("Shoulder to Waist"),
        "upper_arm_length_cm" => Some("Upper Arm Length"),
        "forearm_length_cm" => Some("Forearm Length"),
        "upper_leg_length_cm" => Some("Upper Leg Length"),
        "lower_leg_length_cm" => Some("Lower Leg Length"),
        "hand_length_cm" => Some("Hand Length"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(target: f64, actual: f64, converged: bool) -> MeasurementFit {
        MeasurementFit {
            target,
            actual,
            error: actual - target,
            converged,
        }
    }

    fn sample_rows() -> BTreeMap<String, MeasurementFit> {
        let mut rows = BTreeMap::new();
        rows.insert("height_cm".to_string(), fit(170.0, 169.8, true));
        rows.insert("shoulder_width_cm".to_string(), fit(40.0, 40.6, true));
        rows.insert("hip_width_cm".to_string(), fit(35.0, 36.5, false));
        rows
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&sample_rows());

        assert_eq!(summary.total_measurements, 3);
        assert_eq!(summary.converged_count, 2);
        assert!(!summary.all_converged);
        assert!((summary.max_absolute_error - 1.5).abs() < 1e-9);
        // (0.2 + 0.6 + 1.5) / 3
        assert!((summary.mean_absolute_error - 0.7666666).abs() < 1e-5);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&BTreeMap::new());
        assert_eq!(summary.total_measurements, 0);
        assert!(!summary.all_converged);
        assert_eq!(summary.mean_absolute_error, 0.0);
    }

    #[test]
    fn test_all_converged() {
        let mut rows = sample_rows();
        rows.get_mut("hip_width_cm").unwrap().converged = true;
        assert!(summarize(&rows).all_converged);
    }

    #[test]
    fn test_from_rows_round_trips_json() {
        let report = ParameterReport::from_rows(sample_rows());
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: ParameterReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(display_label("height_cm"), Some("Height"));
        assert_eq!(display_label("hand_length_cm"), Some("Hand Length"));
        assert_eq!(display_label("unknown_cm"), None);
    }
}
