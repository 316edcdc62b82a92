/// Extracted measurements document
///
/// Produced by the extraction script and enriched with the subject's gender
/// and race before being handed to parameter inference and generation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::DocumentError;

/// Subject gender, as understood by the inference model weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// Subject race, as understood by the inference model weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    Asian,
    Caucasian,
}

impl Race {
    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Asian => "asian",
            Race::Caucasian => "caucasian",
        }
    }
}

impl std::str::FromStr for Race {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asian" => Ok(Race::Asian),
            "caucasian" => Ok(Race::Caucasian),
            other => Err(format!("unknown race: {other}")),
        }
    }
}

/// Body measurement keys the extraction script emits, in display order
pub const BODY_MEASUREMENT_KEYS: [&str; 10] = [
    "height_cm",
    "head_width_cm",
    "shoulder_width_cm",
    "hip_width_cm",
    "shoulder_to_waist_cm",
    "upper_arm_length_cm",
    "forearm_length_cm",
    "upper_leg_length_cm",
    "lower_leg_length_cm",
    "hand_length_cm",
];

/// Hair measurement keys the extraction script emits
pub const HAIR_MEASUREMENT_KEYS: [&str; 1] = ["hair_length_cm"];

/// Contents of measurements.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementsFile {
    pub gender: Gender,
    pub race: Race,

    /// Per-body-part values in centimeters, keyed by measurement name
    #[serde(default)]
    pub body_measurements: BTreeMap<String, f64>,

    #[serde(default)]
    pub hair_measurements: BTreeMap<String, f64>,
}

impl MeasurementsFile {
    pub fn new(gender: Gender, race: Race) -> Self {
        Self {
            gender,
            race,
            body_measurements: BTreeMap::new(),
            hair_measurements: BTreeMap::new(),
        }
    }

    /// Load a measurements document from disk
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
            document: "measurements",
            source: e,
        })?;
        fs::write(path, json).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Key selecting the inference model weights for this subject
    pub fn weights_key(&self) -> String {
        format!("{}_{}", self.gender.as_str(), self.race.as_str())
    }
}
