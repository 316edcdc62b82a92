/// Camera calibration document
///
/// Written by the calibration script; read on startup to decide whether the
/// image-input step may proceed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DocumentError;

/// Contents of calibration.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationFile {
    /// Whether the calibration solve succeeded
    pub success: bool,

    /// 3x3 intrinsic matrix, row major
    #[serde(default)]
    pub camera_matrix: Vec<Vec<f64>>,

    #[serde(default)]
    pub distortion_coefficients: Vec<f64>,

    /// Mean reprojection error in pixels
    #[serde(default)]
    pub reprojection_error: Option<f64>,

    #[serde(default)]
    pub num_successful_images: u32,

    #[serde(default)]
    pub num_failed_images: u32,

    /// Error text written by the script on failure
    #[serde(default)]
    pub error: Option<String>,
}

impl CalibrationFile {
    /// Load a calibration document from disk
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

    /// Save the document as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DocumentError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| DocumentError::Serialize {
            document: "calibration",
            source: e,
        })?;
        fs::write(path, json).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// A calibration is usable when the solve succeeded and reported an error metric
    pub fn is_usable(&self) -> bool {
        self.success && self.reprojection_error.is_some()
    }
}
