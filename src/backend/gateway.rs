/// Backend gateway
///
/// The capability interface through which the wizard delegates
/// computation-heavy work (calibration, extraction, inference, generation)
/// to external processes. Every operation reports failure through one
/// channel: `Result<_, BackendError>`.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::documents::{Gender, MeasurementsFile, ParameterReport, Race};
use crate::error::BackendError;
use crate::state::{ConfigureState, InstrumentedArm, OutputSettingsState, RigType};

/// Progress sink for long-running operations: fraction 0..=1 plus status text
pub type ProgressSink<'a> = &'a (dyn Fn(f32, &str) + Send + Sync);

/// Result of a measurement extraction run
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Measurements document, already enriched with gender and race
    pub measurements: MeasurementsFile,

    /// Marker detection visualization image, if the script produced one
    pub visualization_path: Option<PathBuf>,
}

/// Result of a successful camera calibration run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    /// Mean reprojection error in pixels
    pub reprojection_error: f64,
    pub num_successful_images: u32,
    pub num_failed_images: u32,
}

/// Result of an avatar generation run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationOutcome {
    pub fbx_path: Option<PathBuf>,
    pub obj_path: Option<PathBuf>,
    pub preview_images: Vec<PathBuf>,
}

/// Everything the generation script needs besides the measurements.
/// Serialized to JSON and handed over as a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub rig_type: RigType,
    pub fk_ik_hybrid: bool,
    pub instrumented_arm: InstrumentedArm,
    pub hair_asset: Option<String>,
    pub t_pose: bool,
    pub output_directory: PathBuf,
    pub output_filename: String,
    pub export_fbx: bool,
    pub export_obj: bool,
}

impl GenerationConfig {
    /// Assemble the script configuration from the configure and output
    /// steps. Returns None until an output directory has been chosen.
    pub fn from_states(
        configure: &ConfigureState,
        output: &OutputSettingsState,
    ) -> Option<Self> {
        let output_directory = output.output_directory.clone()?;
        Some(Self {
            rig_type: configure.rig_type,
            fk_ik_hybrid: configure.fk_ik_hybrid,
            instrumented_arm: configure.instrumented_arm,
            hair_asset: configure.hair_asset.clone(),
            t_pose: configure.t_pose,
            output_directory,
            output_filename: output.output_filename.clone(),
            export_fbx: output.export_fbx,
            export_obj: output.export_obj,
        })
    }

    /// Expected FBX output location
    pub fn fbx_path(&self) -> PathBuf {
        self.output_directory
            .join(format!("{}.fbx", self.output_filename))
    }

    /// Expected OBJ output location
    pub fn obj_path(&self) -> PathBuf {
        self.output_directory
            .join(format!("{}.obj", self.output_filename))
    }
}

/// Abstract interface for backend operations.
///
/// Implementations translate between the wizard's value objects and the
/// external tools' process/file contracts.
pub trait Backend: Send + Sync {
    /// Extract body measurements from the front image using calibration data
    fn extract_measurements(
        &self,
        front_image: &Path,
        height_cm: f64,
        calibration_path: &Path,
        marker_details_path: &Path,
        gender: Gender,
        race: Race,
    ) -> Result<ExtractionOutcome, BackendError>;

    /// Calibrate the camera from checkerboard pattern images.
    /// `checkerboard` is the inner corner count as (columns, rows).
    fn calibrate_camera(
        &self,
        image_dir: &Path,
        checkerboard: (u32, u32),
        square_size_mm: f64,
        output_path: &Path,
    ) -> Result<CalibrationOutcome, BackendError>;

    /// Fit mesh parameters to a measurements document
    fn compute_mesh_parameters(
        &self,
        measurements_path: &Path,
    ) -> Result<ParameterReport, BackendError>;

    /// Generate the avatar mesh, reporting progress along the way
    fn generate_avatar(
        &self,
        measurements: &MeasurementsFile,
        config: &GenerationConfig,
        progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome, BackendError>;

    /// Open a generated file in Blender
    fn open_in_viewer(&self, path: &Path) -> Result<(), BackendError>;
}

/// Reveal a file or directory in the system file manager
pub fn reveal_in_file_manager(path: &Path) -> Result<(), BackendError> {
    open::that(path).map_err(|e| BackendError::Io {
        operation: "opening file manager",
        source: e,
    })
}
