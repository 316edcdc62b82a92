/// Mock gateway implementation
///
/// Deterministic stand-in for the external modules. Used by the wizard
/// flow tests and the `doctor` command, where running Python and Blender
/// would be unwelcome.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::gateway::{
    Backend, CalibrationOutcome, ExtractionOutcome, GenerationConfig, GenerationOutcome,
    ProgressSink,
};
use crate::documents::measurements::BODY_MEASUREMENT_KEYS;
use crate::documents::{
    CalibrationFile, Gender, MeasurementFit, MeasurementsFile, ParameterReport, Race,
};
use crate::error::{BackendError, DocumentError};

/// Proportions of total height used to fabricate plausible measurements
const BODY_RATIOS: [(&str, f64); 10] = [
    ("height_cm", 1.0),
    ("head_width_cm", 0.092),
    ("shoulder_width_cm", 0.23),
    ("hip_width_cm", 0.19),
    ("shoulder_to_waist_cm", 0.21),
    ("upper_arm_length_cm", 0.17),
    ("forearm_length_cm", 0.15),
    ("upper_leg_length_cm", 0.24),
    ("lower_leg_length_cm", 0.22),
    ("hand_length_cm", 0.11),
];

#[derive(Debug, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for MockBackend {
    fn extract_measurements(
        &self,
        _front_image: &Path,
        height_cm: f64,
        _calibration_path: &Path,
        _marker_details_path: &Path,
        gender: Gender,
        race: Race,
    ) -> Result<ExtractionOutcome, BackendError> {
        let mut measurements = MeasurementsFile::new(gender, race);
        for (key, ratio) in BODY_RATIOS {
            measurements
                .body_measurements
                .insert(key.to_string(), height_cm * ratio);
        }
        measurements
            .hair_measurements
            .insert("hair_length_cm".to_string(), 12.0);

        Ok(ExtractionOutcome {
            measurements,
            visualization_path: None,
        })
    }

    fn calibrate_camera(
        &self,
        _image_dir: &Path,
        _checkerboard: (u32, u32),
        _square_size_mm: f64,
        output_path: &Path,
    ) -> Result<CalibrationOutcome, BackendError> {
        let file = CalibrationFile {
            success: true,
            camera_matrix: vec![
                vec![1000.0, 0.0, 640.0],
                vec![0.0, 1000.0, 360.0],
                vec![0.0, 0.0, 1.0],
            ],
            distortion_coefficients: vec![0.05, -0.01, 0.0, 0.0, 0.0],
            reprojection_error: Some(0.45),
            num_successful_images: 10,
            num_failed_images: 2,
            error: None,
        };
        file.save(output_path)?;

        Ok(CalibrationOutcome {
            reprojection_error: 0.45,
            num_successful_images: 10,
            num_failed_images: 2,
        })
    }

    fn compute_mesh_parameters(
        &self,
        measurements_path: &Path,
    ) -> Result<ParameterReport, BackendError> {
        let measurements = MeasurementsFile::load(measurements_path)?;

        let mut rows = BTreeMap::new();
        for (i, key) in BODY_MEASUREMENT_KEYS.iter().enumerate() {
            let Some(target) = measurements.body_measurements.get(*key).copied() else {
                continue;
            };
            // Small alternating offsets so the report has visible errors
            let error = ((i % 3) as f64 - 1.0) * 0.15;
            rows.insert(
                (*key).to_string(),
                MeasurementFit {
                    target,
                    actual: target + error,
                    error,
                    converged: true,
                },
            );
        }

        Ok(ParameterReport::from_rows(rows))
    }

    fn generate_avatar(
        &self,
        _measurements: &MeasurementsFile,
        config: &GenerationConfig,
        progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome, BackendError> {
        fs::create_dir_all(&config.output_directory).map_err(|e| {
            DocumentError::DirectoryCreationFailed {
                path: config.output_directory.display().to_string(),
                source: e,
            }
        })?;

        let stages = [
            (0.1, "Loading base mesh"),
            (0.4, "Applying macro parameters"),
            (0.7, "Rigging skeleton"),
            (0.9, "Exporting"),
        ];
        for (fraction, status) in stages {
            progress(fraction, status);
        }

        let mut outcome = GenerationOutcome::default();
        if config.export_fbx {
            let path = config.fbx_path();
            fs::write(&path, b"mock fbx").map_err(|e| DocumentError::Write {
                path: path.display().to_string(),
                source: e,
            })?;
            outcome.fbx_path = Some(path);
        }
        if config.export_obj {
            let path = config.obj_path();
            fs::write(&path, b"mock obj").map_err(|e| DocumentError::Write {
                path: path.display().to_string(),
                source: e,
            })?;
            outcome.obj_path = Some(path);
        }

        progress(1.0, "Done");
        Ok(outcome)
    }

    fn open_in_viewer(&self, path: &Path) -> Result<(), BackendError> {
        tracing::info!("Mock viewer would open {}", path.display());
        Ok(())
    }
}
