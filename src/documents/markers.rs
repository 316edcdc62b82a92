/// ArUco marker backdrop document
///
/// Physical size and corner positions of the printed markers, in
/// centimeters measured from the floor and the backdrop's left edge.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DocumentError;

/// Position of a single marker center in centimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPosition {
    pub x: f64,
    pub y: f64,
}

impl MarkerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The four marker centers of the backdrop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerCorners {
    pub top_left: MarkerPosition,
    pub top_right: MarkerPosition,
    pub bottom_left: MarkerPosition,
    pub bottom_right: MarkerPosition,
}

/// Contents of marker_details.json
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerFile {
    /// Physical size of each printed marker in cm
    pub marker_size_cm: f64,

    pub marker_positions_cm: MarkerCorners,
}

impl Default for MarkerFile {
    fn default() -> Self {
        // Measured layout of the reference backdrop print
        Self {
            marker_size_cm: 16.4,
            marker_positions_cm: MarkerCorners {
                top_left: MarkerPosition::new(0.0, 203.2),
                top_right: MarkerPosition::new(83.0, 203.2),
                bottom_left: MarkerPosition::new(0.0, 8.2),
                bottom_right: MarkerPosition::new(83.0, 8.2),
            },
        }
    }
}

impl MarkerFile {
    /// Load a marker document from disk
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
            document: "marker_details",
            source: e,
        })?;
        fs::write(path, json).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Marker size must be positive and corners must span a non-degenerate rectangle
    pub fn is_plausible(&self) -> bool {
        let c = &self.marker_positions_cm;
        self.marker_size_cm > 0.0
            && c.top_right.x > c.top_left.x
            && c.bottom_right.x > c.bottom_left.x
            && c.top_left.y > c.bottom_left.y
            && c.top_right.y > c.bottom_right.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let markers = MarkerFile::default();
        assert_eq!(markers.marker_size_cm, 16.4);
        assert_eq!(markers.marker_positions_cm.top_left.y, 203.2);
        assert_eq!(markers.marker_positions_cm.bottom_right.x, 83.0);
        assert!(markers.is_plausible());
    }

    #[test]
    fn test_degenerate_layout_is_rejected() {
        let mut markers = MarkerFile::default();
        markers.marker_positions_cm.top_right.x = 0.0;
        assert!(!markers.is_plausible());

        let mut markers = MarkerFile::default();
        markers.marker_size_cm = 0.0;
        assert!(!markers.is_plausible());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marker_details.json");

        let mut markers = MarkerFile::default();
        markers.marker_size_cm = 10.0;
        markers.save(&path).unwrap();

        let loaded = MarkerFile::load(&path).unwrap();
        assert_eq!(loaded, markers);
    }

    #[test]
    fn test_ignores_annotation_keys() {
        // Files written by older tooling carry free-form explanation keys
        let json = r#"{
            "marker_size_cm": 16.4,
            "marker_positions_cm": {
                "top_left": {"x": 0, "y": 203.2},
                "top_right": {"x": 83, "y": 203.2},
                "bottom_left": {"x": 0, "y": 8.2},
                "bottom_right": {"x": 83, "y": 8.2}
            },
            "_comment": "Marker details file for ArUco backdrop calibration"
        }"#;
        let markers: MarkerFile = serde_json::from_str(json).unwrap();
        assert!(markers.is_plausible());
    }
}
