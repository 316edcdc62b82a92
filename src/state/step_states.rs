/// Per-step wizard state
///
/// One record per wizard step plus the two standalone feature states
/// (camera calibration, marker settings). Every record exposes
/// `is_complete()`, a pure predicate over its own fields; cross-step
/// decisions belong to the controller.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::documents::{CalibrationFile, Gender, MarkerFile, MeasurementsFile, ParameterReport, Race};
use crate::error::InputError;

/// Rig skeleton variants supported by the generation script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigType {
    Default,
    DefaultNoToes,
    GameEngine,
}

impl RigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RigType::Default => "default",
            RigType::DefaultNoToes => "default_no_toes",
            RigType::GameEngine => "game_engine",
        }
    }
}

impl std::str::FromStr for RigType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(RigType::Default),
            "default_no_toes" => Ok(RigType::DefaultNoToes),
            "game_engine" => Ok(RigType::GameEngine),
            other => Err(format!("unknown rig type: {other}")),
        }
    }
}

/// Which arm carries the IMU sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentedArm {
    Left,
    Right,
}

impl InstrumentedArm {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentedArm::Left => "left",
            InstrumentedArm::Right => "right",
        }
    }
}

/// Parse optional centimeter text: empty clears the value, anything else
/// must be a positive number. The caller keeps the old value on Err.
pub fn parse_cm_text(field: &'static str, text: &str) -> Result<Option<f64>, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: f64 = trimmed.parse().map_err(|_| InputError::NotANumber {
        text: text.to_string(),
    })?;
    if value <= 0.0 {
        return Err(InputError::NotPositive { field, value });
    }
    Ok(Some(value))
}

/// Parse an inner-corner count; a checkerboard needs at least two per side
pub fn parse_corner_count(field: &'static str, text: &str) -> Result<u32, InputError> {
    const MIN: u32 = 2;
    match text.trim().parse::<u32>() {
        Ok(value) if value >= MIN => Ok(value),
        _ => Err(InputError::TooSmall {
            field,
            min: MIN,
            text: text.to_string(),
        }),
    }
}

/// State for the image input step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageInputState {
    pub front_image_path: Option<PathBuf>,
    pub height_cm: Option<f64>,
    pub gender: Option<Gender>,
    pub race: Option<Race>,

    /// Whether a usable calibration.json exists on disk
    pub camera_calibration_valid: bool,
    /// Whether a plausible marker_details.json exists on disk
    pub aruco_settings_valid: bool,

    pub is_extracting: bool,
    pub extraction_error: Option<String>,
}

impl ImageInputState {
    /// Check if image input is ready for extraction
    pub fn is_complete(&self) -> bool {
        self.front_image_path.is_some()
            && self.height_cm.is_some()
            && self.gender.is_some()
            && self.race.is_some()
            && self.camera_calibration_valid
            && self.aruco_settings_valid
    }

    /// Check if all requirements are met and no extraction is in flight
    pub fn can_extract(&self) -> bool {
        self.is_complete() && !self.is_extracting
    }

    /// Set the subject height from entered text
    pub fn set_height_text(&mut self, text: &str) -> Result<(), InputError> {
        self.height_cm = parse_cm_text("height", text)?;
        Ok(())
    }
}

/// State for the measurements review step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementsState {
    // Body measurements from the extraction script
    pub height_cm: Option<f64>,
    pub head_width_cm: Option<f64>,
    pub shoulder_width_cm: Option<f64>,
    pub hip_width_cm: Option<f64>,
    pub shoulder_to_waist_cm: Option<f64>,
    pub upper_arm_length_cm: Option<f64>,
    pub forearm_length_cm: Option<f64>,
    pub upper_leg_length_cm: Option<f64>,
    pub lower_leg_length_cm: Option<f64>,
    pub hand_length_cm: Option<f64>,

    // Hair measurements from the extraction script
    pub hair_length_cm: Option<f64>,

    /// Marker detection visualization image, if the script produced one
    pub visualization_path: Option<PathBuf>,

    pub is_extracted: bool,
    pub is_manually_edited: bool,

    // Mesh parameter computation state
    pub is_computing_parameters: bool,
    pub parameters_computed: bool,
    pub parameters_report: Option<ParameterReport>,
    pub parameters_error: Option<String>,
}

impl MeasurementsState {
    /// Check if measurements are available
    pub fn is_complete(&self) -> bool {
        self.is_extracted || self.is_manually_edited
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<f64>> {
        match key {
            "height_cm" => Some(&mut self.height_cm),
            "head_width_cm" => Some(&mut self.head_width_cm),
            "shoulder_width_cm" => Some(&mut self.shoulder_width_cm),
            "hip_width_cm" => Some(&mut self.hip_width_cm),
            "shoulder_to_waist_cm" => Some(&mut self.shoulder_to_waist_cm),
            "upper_arm_length_cm" => Some(&mut self.upper_arm_length_cm),
            "forearm_length_cm" => Some(&mut self.forearm_length_cm),
            "upper_leg_length_cm" => Some(&mut self.upper_leg_length_cm),
            "lower_leg_length_cm" => Some(&mut self.lower_leg_length_cm),
            "hand_length_cm" => Some(&mut self.hand_length_cm),
            "hair_length_cm" => Some(&mut self.hair_length_cm),
            _ => None,
        }
    }

    /// Current value of a measurement by key
    pub fn value(&self, key: &str) -> Option<f64> {
        match key {
            "height_cm" => self.height_cm,
            "head_width_cm" => self.head_width_cm,
            "shoulder_width_cm" => self.shoulder_width_cm,
            "hip_width_cm" => self.hip_width_cm,
            "shoulder_to_waist_cm" => self.shoulder_to_waist_cm,
            "upper_arm_length_cm" => self.upper_arm_length_cm,
            "forearm_length_cm" => self.forearm_length_cm,
            "upper_leg_length_cm" => self.upper_leg_length_cm,
            "lower_leg_length_cm" => self.lower_leg_length_cm,
            "hand_length_cm" => self.hand_length_cm,
            "hair_length_cm" => self.hair_length_cm,
            _ => None,
        }
    }

    /// Manually edit a measurement from entered text.
    /// Unknown keys and unparsable text leave the state untouched.
    pub fn set_value_text(&mut self, key: &str, text: &str) -> Result<(), InputError> {
        let parsed = parse_cm_text("measurement", text)?;
        if let Some(slot) = self.field_mut(key) {
            *slot = parsed;
            self.is_manually_edited = true;
        }
        Ok(())
    }

    /// Take over values from an extraction result
    pub fn apply_extracted(&mut self, file: &MeasurementsFile, visualization: Option<PathBuf>) {
        for key in crate::documents::measurements::BODY_MEASUREMENT_KEYS {
            if let Some(slot) = self.field_mut(key) {
                *slot = file.body_measurements.get(key).copied();
            }
        }
        self.hair_length_cm = file.hair_measurements.get("hair_length_cm").copied();
        self.visualization_path = visualization;
        self.is_extracted = true;
        // A fresh extraction supersedes any prior computation
        self.parameters_computed = false;
        self.parameters_report = None;
        self.parameters_error = None;
    }

    /// Snapshot the current values as a measurements document
    pub fn to_file(&self, gender: Gender, race: Race) -> MeasurementsFile {
        let mut file = MeasurementsFile::new(gender, race);
        for key in crate::documents::measurements::BODY_MEASUREMENT_KEYS {
            if let Some(value) = self.value(key) {
                file.body_measurements.insert(key.to_string(), value);
            }
        }
        if let Some(value) = self.hair_length_cm {
            file.hair_measurements
                .insert("hair_length_cm".to_string(), value);
        }
        file
    }
}

/// State for the avatar configuration step
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureState {
    pub rig_type: RigType,
    pub fk_ik_hybrid: bool,
    pub instrumented_arm: InstrumentedArm,
    /// Name of a hair asset from the assets folder
    pub hair_asset: Option<String>,
    pub t_pose: bool,
}

impl Default for ConfigureState {
    fn default() -> Self {
        Self {
            rig_type: RigType::DefaultNoToes,
            fk_ik_hybrid: false,
            instrumented_arm: InstrumentedArm::Left,
            hair_asset: None,
            t_pose: true,
        }
    }
}

impl ConfigureState {
    /// All fields have valid defaults
    pub fn is_complete(&self) -> bool {
        true
    }
}

/// State for the output settings step
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettingsState {
    pub output_directory: Option<PathBuf>,
    pub output_filename: String,
    pub export_fbx: bool,
    pub export_obj: bool,
}

impl Default for OutputSettingsState {
    fn default() -> Self {
        Self {
            output_directory: None,
            output_filename: "avatar".to_string(),
            export_fbx: true,
            export_obj: false,
        }
    }
}

impl OutputSettingsState {
    /// Check if output settings are valid
    pub fn is_complete(&self) -> bool {
        self.output_directory.is_some()
    }
}

/// State for the generation step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateState {
    pub is_generating: bool,
    /// 0.0..=1.0
    pub progress: f32,
    pub status_message: String,
    pub output_fbx_path: Option<PathBuf>,
    pub output_obj_path: Option<PathBuf>,
    pub preview_images: Vec<PathBuf>,
    pub error_message: Option<String>,
}

impl GenerateState {
    /// Check if generation completed successfully
    pub fn is_complete(&self) -> bool {
        self.output_fbx_path.is_some() && self.error_message.is_none()
    }

    /// Clear the in-flight run state when leaving the step.
    /// Output paths and previews are kept so the user can still see them.
    pub fn reset_run(&mut self) {
        self.is_generating = false;
        self.progress = 0.0;
        self.status_message.clear();
        self.error_message = None;
    }
}

/// State for the standalone camera calibration feature
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibrationState {
    pub image_directory: Option<PathBuf>,
    /// Inner corners per checkerboard row
    pub checkerboard_cols: u32,
    /// Inner corners per checkerboard column
    pub checkerboard_rows: u32,
    pub square_size_mm: f64,

    pub is_calibrating: bool,
    pub progress_message: String,

    // Results of the current run
    pub calibration_success: Option<bool>,
    pub reprojection_error: Option<f64>,
    pub num_successful_images: u32,
    pub num_failed_images: u32,
    pub error_message: Option<String>,

    // Existing calibration found on startup
    pub existing_calibration_path: Option<PathBuf>,
    pub existing_reprojection_error: Option<f64>,
}

impl Default for CameraCalibrationState {
    fn default() -> Self {
        Self {
            image_directory: None,
            checkerboard_cols: 8,
            checkerboard_rows: 6,
            square_size_mm: 40.0,
            is_calibrating: false,
            progress_message: String::new(),
            calibration_success: None,
            reprojection_error: None,
            num_successful_images: 0,
            num_failed_images: 0,
            error_message: None,
            existing_calibration_path: None,
            existing_reprojection_error: None,
        }
    }
}

impl CameraCalibrationState {
    /// Check if a calibration run can start
    pub fn can_calibrate(&self) -> bool {
        self.image_directory.is_some() && !self.is_calibrating
    }

    /// Reset the per-run results before a new run
    pub fn reset_results(&mut self) {
        self.calibration_success = None;
        self.reprojection_error = None;
        self.num_successful_images = 0;
        self.num_failed_images = 0;
        self.error_message = None;
    }

    /// Pick up metadata of a calibration document already on disk
    pub fn load_existing(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match CalibrationFile::load(path) {
            Ok(file) if file.is_usable() => {
                self.existing_calibration_path = Some(path.to_path_buf());
                self.existing_reprojection_error = file.reprojection_error;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring unreadable calibration file: {e}"),
        }
    }

    pub fn set_cols_text(&mut self, text: &str) -> Result<(), InputError> {
        self.checkerboard_cols = parse_corner_count("checkerboard columns", text)?;
        Ok(())
    }

    pub fn set_rows_text(&mut self, text: &str) -> Result<(), InputError> {
        self.checkerboard_rows = parse_corner_count("checkerboard rows", text)?;
        Ok(())
    }

    pub fn set_square_size_text(&mut self, text: &str) -> Result<(), InputError> {
        match parse_cm_text("square size", text)? {
            Some(value) => {
                self.square_size_mm = value;
                Ok(())
            }
            None => Err(InputError::NotANumber {
                text: text.to_string(),
            }),
        }
    }
}

/// State for the ArUco marker settings feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArucoSettingsState {
    pub markers: MarkerFile,
}

impl ArucoSettingsState {
    /// Check whether the configured layout is usable for extraction
    pub fn is_valid(&self) -> bool {
        self.markers.is_plausible()
    }

    /// Set the printed marker size from entered text
    pub fn set_marker_size_text(&mut self, text: &str) -> Result<(), InputError> {
        match parse_cm_text("marker size", text)? {
            Some(value) => {
                self.markers.marker_size_cm = value;
                Ok(())
            }
            None => Err(InputError::NotANumber {
                text: text.to_string(),
            }),
        }
    }

    /// Load settings from marker_details.json, if present
    pub fn load(&mut self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        match MarkerFile::load(path) {
            Ok(file) => {
                self.markers = file;
                true
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable marker file: {e}");
                false
            }
        }
    }

    /// Save settings to marker_details.json
    pub fn save(&self, path: &Path) -> Result<(), crate::error::DocumentError> {
        self.markers.save(path)
    }
}
