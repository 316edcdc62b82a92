/// Script-backed gateway implementation
///
/// Connects the wizard to the real measurement extraction and mesh
/// generation modules. Each operation builds an argument list for the
/// corresponding external script, runs it through the process adapter, and
/// translates exit status plus file outputs into value objects.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use super::gateway::{
    Backend, CalibrationOutcome, ExtractionOutcome, GenerationConfig, GenerationOutcome,
    ProgressSink,
};
use super::process;
use crate::config::Config;
use crate::documents::{CalibrationFile, Gender, MeasurementsFile, ParameterReport, Race};
use crate::error::{BackendError, DocumentError};

/// Raw extraction script output, before gender and race are appended
#[derive(Debug, Deserialize)]
struct RawMeasurements {
    #[serde(default)]
    body_measurements: BTreeMap<String, f64>,
    #[serde(default)]
    hair_measurements: BTreeMap<String, f64>,
}

/// Backend implementation that shells out to the external modules
pub struct ScriptBackend {
    config: Config,
    progress_line: Option<Regex>,
}

impl ScriptBackend {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            // Lines like: PROGRESS 0.45 Applying rig
            progress_line: Regex::new(r"^PROGRESS\s+([0-9]*\.?[0-9]+)\s*(.*)$").ok(),
        }
    }

    /// Interpreter of the extraction module venv, verified to exist
    fn interpreter(&self) -> Result<PathBuf, BackendError> {
        let path = self.config.interpreter_path();
        if path.exists() {
            Ok(path)
        } else {
            Err(BackendError::InterpreterMissing { path })
        }
    }

    /// Blender executable: configured path first, then PATH probe
    fn blender(&self) -> Result<PathBuf, BackendError> {
        if let Some(path) = &self.config.blender_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(BackendError::BlenderMissing);
        }

        let name = if cfg!(windows) { "blender.exe" } else { "blender" };
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(BackendError::BlenderMissing)
    }

    /// Collect preview images the generation script left next to the outputs
    fn collect_previews(&self, config: &GenerationConfig) -> Vec<PathBuf> {
        let prefix = format!("{}_preview", config.output_filename);
        let mut previews: Vec<PathBuf> = fs::read_dir(&config.output_directory)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".png"))
            })
            .collect();
        previews.sort();
        previews
    }
}

impl Backend for ScriptBackend {
    fn extract_measurements(
        &self,
        front_image: &Path,
        height_cm: f64,
        calibration_path: &Path,
        marker_details_path: &Path,
        gender: Gender,
        race: Race,
    ) -> Result<ExtractionOutcome, BackendError> {
        const OPERATION: &str = "Measurement extraction";

        let interpreter = self.interpreter()?;
        let script = self.config.extraction_module_dir.join("complete_measurements.py");
        self.config.ensure_directories()?;
        let output_path = self.config.measurements_path();

        let mut cmd = Command::new(interpreter);
        cmd.arg(script)
            .arg(front_image)
            .arg("--marker-details")
            .arg(marker_details_path)
            .arg("--camera-calibration")
            .arg(calibration_path)
            .arg("--height")
            .arg(height_cm.to_string())
            .arg("-o")
            .arg(&output_path)
            .arg("--save-visualization")
            .arg(&self.config.intermediates_dir)
            .current_dir(&self.config.extraction_module_dir);

        let output = process::run(OPERATION, &mut cmd)?;
        if !output.success() {
            return Err(BackendError::ScriptFailed {
                operation: OPERATION,
                exit_code: output.exit_code,
                detail: output.error_detail(),
            });
        }
        if !output_path.exists() {
            return Err(BackendError::OutputMissing {
                operation: OPERATION,
                path: output_path,
            });
        }

        // The script writes bare measurement maps; append the subject's
        // identity and persist the enriched document for the later steps.
        let content = fs::read_to_string(&output_path).map_err(|e| DocumentError::Read {
            path: output_path.display().to_string(),
            source: e,
        })?;
        let raw: RawMeasurements =
            serde_json::from_str(&content).map_err(|e| DocumentError::Parse {
                path: output_path.display().to_string(),
                source: e,
            })?;

        let measurements = MeasurementsFile {
            gender,
            race,
            body_measurements: raw.body_measurements,
            hair_measurements: raw.hair_measurements,
        };
        measurements.save(&output_path)?;

        let visualization = self.config.visualization_path();
        let visualization_path = visualization.exists().then_some(visualization);

        tracing::info!(
            "Extracted {} body measurements from {}",
            measurements.body_measurements.len(),
            front_image.display()
        );
        Ok(ExtractionOutcome {
            measurements,
            visualization_path,
        })
    }

    fn calibrate_camera(
        &self,
        image_dir: &Path,
        checkerboard: (u32, u32),
        square_size_mm: f64,
        output_path: &Path,
    ) -> Result<CalibrationOutcome, BackendError> {
        const OPERATION: &str = "Camera calibration";

        let interpreter = self.interpreter()?;
        let script = self.config.extraction_module_dir.join("calibrate_camera.py");
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| DocumentError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let (cols, rows) = checkerboard;
        let mut cmd = Command::new(interpreter);
        cmd.arg(script)
            .arg("-i")
            .arg(image_dir)
            .arg("-o")
            .arg(output_path)
            .arg("--checkerboard-size")
            .arg(format!("{cols}x{rows}"))
            .arg("--square-size")
            .arg(square_size_mm.to_string())
            .current_dir(&self.config.extraction_module_dir);

        let output = process::run(OPERATION, &mut cmd)?;
        if !output.success() {
            return Err(BackendError::Calibration {
                message: output.error_detail(),
            });
        }
        if !output_path.exists() {
            return Err(BackendError::OutputMissing {
                operation: OPERATION,
                path: output_path.to_path_buf(),
            });
        }

        let file = CalibrationFile::load(output_path)?;
        if !file.success {
            return Err(BackendError::Calibration {
                message: file
                    .error
                    .unwrap_or_else(|| "calibration script reported failure".to_string()),
            });
        }
        let reprojection_error = file.reprojection_error.ok_or(BackendError::Calibration {
            message: "calibration succeeded but reported no reprojection error".to_string(),
        })?;

        tracing::info!(
            "Calibration solved from {}/{} images, reprojection error {:.3}px",
            file.num_successful_images,
            file.num_successful_images + file.num_failed_images,
            reprojection_error
        );
        Ok(CalibrationOutcome {
            reprojection_error,
            num_successful_images: file.num_successful_images,
            num_failed_images: file.num_failed_images,
        })
    }

    fn compute_mesh_parameters(
        &self,
        measurements_path: &Path,
    ) -> Result<ParameterReport, BackendError> {
        const OPERATION: &str = "Parameter computation";

        let measurements = MeasurementsFile::load(measurements_path)?;
        let key = measurements.weights_key();
        let weights_path = self
            .config
            .mesh_module_dir
            .join("models")
            .join(format!("{key}.npz"));
        if !weights_path.exists() {
            return Err(BackendError::WeightsMissing {
                key,
                path: weights_path,
            });
        }

        let interpreter = self.interpreter()?;
        let script = self.config.mesh_module_dir.join("compute_parameters.py");
        let report_path = self.config.report_path();

        let mut cmd = Command::new(interpreter);
        cmd.arg(script)
            .arg("--measurements")
            .arg(measurements_path)
            .arg("--weights")
            .arg(&weights_path)
            .arg("-o")
            .arg(&report_path)
            .current_dir(&self.config.mesh_module_dir);

        let output = process::run(OPERATION, &mut cmd)?;
        if !output.success() {
            return Err(BackendError::ScriptFailed {
                operation: OPERATION,
                exit_code: output.exit_code,
                detail: output.error_detail(),
            });
        }
        if !report_path.exists() {
            return Err(BackendError::OutputMissing {
                operation: OPERATION,
                path: report_path,
            });
        }

        let report = ParameterReport::load(&report_path)?;
        tracing::info!(
            "Parameter fit: {}/{} measurements converged",
            report.summary.converged_count,
            report.summary.total_measurements
        );
        Ok(report)
    }

    fn generate_avatar(
        &self,
        measurements: &MeasurementsFile,
        config: &GenerationConfig,
        progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome, BackendError> {
        const OPERATION: &str = "Avatar generation";

        let blender = self.blender()?;
        let script = self.config.mesh_module_dir.join("generate_avatar.py");
        self.config.ensure_directories()?;
        fs::create_dir_all(&config.output_directory).map_err(|e| {
            DocumentError::DirectoryCreationFailed {
                path: config.output_directory.display().to_string(),
                source: e,
            }
        })?;

        // Hand both documents to the script as files
        let measurements_path = self.config.measurements_path();
        measurements.save(&measurements_path)?;
        let config_path = self.config.generation_config_path();
        let config_json =
            serde_json::to_string_pretty(config).map_err(|e| DocumentError::Serialize {
                document: "generation_config",
                source: e,
            })?;
        fs::write(&config_path, config_json).map_err(|e| DocumentError::Write {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let mut cmd = Command::new(blender);
        cmd.arg("--background")
            .arg("--python")
            .arg(script)
            .arg("--")
            .arg("--measurements")
            .arg(&measurements_path)
            .arg("--config")
            .arg(&config_path)
            .current_dir(&self.config.mesh_module_dir);

        progress(0.0, "Starting Blender");
        let timeout = Duration::from_secs(self.config.generation_timeout_secs);
        let output = process::run_with_deadline(OPERATION, &mut cmd, timeout, &mut |line| {
            let Some(captures) = self.progress_line.as_ref().and_then(|re| re.captures(line))
            else {
                return;
            };
            let fraction = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<f32>().ok())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            let status = captures.get(2).map(|m| m.as_str()).unwrap_or("");
            progress(fraction, status);
        })?;

        if !output.success() {
            return Err(BackendError::ScriptFailed {
                operation: OPERATION,
                exit_code: output.exit_code,
                detail: output.error_detail(),
            });
        }

        let fbx_path = config.fbx_path();
        if config.export_fbx && !fbx_path.exists() {
            return Err(BackendError::OutputMissing {
                operation: OPERATION,
                path: fbx_path,
            });
        }
        let obj_path = config.obj_path();
        if config.export_obj && !obj_path.exists() {
            return Err(BackendError::OutputMissing {
                operation: OPERATION,
                path: obj_path,
            });
        }

        progress(1.0, "Done");
        Ok(GenerationOutcome {
            fbx_path: config.export_fbx.then_some(fbx_path),
            obj_path: config.export_obj.then_some(obj_path),
            preview_images: self.collect_previews(config),
        })
    }

    fn open_in_viewer(&self, path: &Path) -> Result<(), BackendError> {
        let blender = self.blender()?;
        Command::new(&blender)
            .arg(path)
            .spawn()
            .map_err(|e| BackendError::Spawn {
                program: blender.display().to_string(),
                source: e,
            })?;
        tracing::info!("Opened {} in Blender", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &Path) -> Config {
        Config {
            extraction_module_dir: dir.join("measure"),
            mesh_module_dir: dir.join("mesh"),
            python_interpreter: Some(dir.join("venv").join("python")),
            blender_path: Some(dir.join("blender")),
            user_configurations_dir: dir.join("user_configurations"),
            intermediates_dir: dir.join("intermediates"),
            generation_timeout_secs: 600,
        }
    }

    #[test]
    fn test_missing_interpreter_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptBackend::new(test_config(dir.path()));

        let err = backend
            .extract_measurements(
                &dir.path().join("front.jpg"),
                170.0,
                &dir.path().join("calibration.json"),
                &dir.path().join("marker_details.json"),
                Gender::Male,
                Race::Asian,
            )
            .unwrap_err();
        assert!(matches!(err, BackendError::InterpreterMissing { .. }));
    }

    #[test]
    fn test_missing_weights_is_reported_with_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptBackend::new(test_config(dir.path()));

        let measurements_path = dir.path().join("measurements.json");
        MeasurementsFile::new(Gender::Female, Race::Asian)
            .save(&measurements_path)
            .unwrap();

        let err = backend
            .compute_mesh_parameters(&measurements_path)
            .unwrap_err();
        match err {
            BackendError::WeightsMissing { key, path } => {
                assert_eq!(key, "female_asian");
                assert!(path.ends_with("models/female_asian.npz"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_blender_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptBackend::new(test_config(dir.path()));

        let err = backend
            .open_in_viewer(&dir.path().join("avatar.fbx"))
            .unwrap_err();
        assert!(matches!(err, BackendError::BlenderMissing));
    }

    #[test]
    fn test_progress_line_regex() {
        let backend = ScriptBackend::new(test_config(Path::new("/tmp")));
        let re = backend.progress_line.as_ref().unwrap();

        let captures = re.captures("PROGRESS 0.45 Applying rig").unwrap();
        assert_eq!(&captures[1], "0.45");
        assert_eq!(&captures[2], "Applying rig");

        let captures = re.captures("PROGRESS 1.0").unwrap();
        assert_eq!(&captures[1], "1.0");
        assert_eq!(&captures[2], "");

        assert!(re.captures("rendering preview").is_none());
        assert!(re.captures(" PROGRESS 0.2 x").is_none());
    }

    #[test]
    fn test_collect_previews_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        for name in ["avatar_preview_2.png", "avatar_preview_1.png", "avatar.fbx", "other.png"] {
            fs::write(out.join(name), b"").unwrap();
        }

        let backend = ScriptBackend::new(test_config(dir.path()));
        let config = GenerationConfig {
            rig_type: crate::state::RigType::Default,
            fk_ik_hybrid: false,
            instrumented_arm: crate::state::InstrumentedArm::Left,
            hair_asset: None,
            t_pose: true,
            output_directory: out.clone(),
            output_filename: "avatar".to_string(),
            export_fbx: true,
            export_obj: false,
        };

        let previews = backend.collect_previews(&config);
        assert_eq!(
            previews,
            vec![out.join("avatar_preview_1.png"), out.join("avatar_preview_2.png")]
        );
    }
}
