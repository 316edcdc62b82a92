use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::DocumentError;

fn default_generation_timeout_secs() -> u64 {
    600
}

/// Application configuration.
///
/// Holds the locations of the external tooling (measurement extraction
/// module, Blender) and the directories for persisted documents. Stored as
/// pretty-printed JSON in the platform config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the measurement extraction module checkout
    pub extraction_module_dir: PathBuf,

    /// Root of the mesh generation module checkout
    pub mesh_module_dir: PathBuf,

    /// Python interpreter used to run the extraction scripts.
    /// When unset, the module's own venv interpreter is used.
    pub python_interpreter: Option<PathBuf>,

    /// Blender executable for generation and viewing.
    /// When unset, `blender` is resolved from PATH.
    pub blender_path: Option<PathBuf>,

    /// Directory holding calibration.json and marker_details.json
    pub user_configurations_dir: PathBuf,

    /// Directory for extraction/generation intermediates
    pub intermediates_dir: PathBuf,

    /// Hard limit for a single avatar generation run
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let base = Self::base_dir();
        Self {
            extraction_module_dir: base.join("measurements_extraction_module"),
            mesh_module_dir: base.join("mesh_generation_module"),
            python_interpreter: None,
            blender_path: None,
            user_configurations_dir: base.join("user_configurations"),
            intermediates_dir: base.join("intermediates"),
            generation_timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the platform-specific config directory.
    /// Creates a default config file if none exists.
    pub fn load() -> Result<Self, DocumentError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| DocumentError::Read {
                path: config_path.display().to_string(),
                source: e,
            })?;
            let config: Config =
                serde_json::from_str(&content).map_err(|e| DocumentError::Parse {
                    path: config_path.display().to_string(),
                    source: e,
                })?;

            tracing::debug!("Loaded config from: {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            tracing::info!("Created default config at: {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), DocumentError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| DocumentError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| DocumentError::Serialize {
            document: "config",
            source: e,
        })?;
        fs::write(&config_path, json).map_err(|e| DocumentError::Write {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Base directory for all application data
    fn base_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("AvatarForge"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Path of the config file itself
    fn config_path() -> PathBuf {
        Self::base_dir().join("config.json")
    }

    /// Camera calibration document location
    pub fn calibration_path(&self) -> PathBuf {
        self.user_configurations_dir.join("calibration.json")
    }

    /// ArUco marker configuration document location
    pub fn marker_details_path(&self) -> PathBuf {
        self.user_configurations_dir.join("marker_details.json")
    }

    /// Extracted measurements document location
    pub fn measurements_path(&self) -> PathBuf {
        self.intermediates_dir.join("measurements.json")
    }

    /// Marker detection visualization image written by the extraction script
    pub fn visualization_path(&self) -> PathBuf {
        self.intermediates_dir.join("aruco_backdrop_detection.jpg")
    }

    /// Mesh parameter fit report location
    pub fn report_path(&self) -> PathBuf {
        self.intermediates_dir.join("parameters_report.json")
    }

    /// Generation configuration handed to the Blender script
    pub fn generation_config_path(&self) -> PathBuf {
        self.intermediates_dir.join("generation_config.json")
    }

    /// Interpreter used for the extraction module scripts
    pub fn interpreter_path(&self) -> PathBuf {
        match &self.python_interpreter {
            Some(path) => path.clone(),
            None => {
                let venv = self.extraction_module_dir.join("venv");
                if cfg!(windows) {
                    venv.join("Scripts").join("python.exe")
                } else {
                    venv.join("bin").join("python")
                }
            }
        }
    }

    /// Create the user_configurations and intermediates directories
    pub fn ensure_directories(&self) -> Result<(), DocumentError> {
        for dir in [&self.user_configurations_dir, &self.intermediates_dir] {
            fs::create_dir_all(dir).map_err(|e| DocumentError::DirectoryCreationFailed {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}
